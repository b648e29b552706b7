//! Create, connect, and manage the eScholarship database connection.
use crate::FixerResult;
use log::debug;
use postgres as pg;
use std::env;

const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_USER: &str = "eschol";
const DEFAULT_DB_NAME: &str = "eschol";

/// For compiling a set of connection parameters.
///
/// Values are applied like so:
///
/// 1. Manually applying a value via set_* method
/// 2. Values provided via getopts::Matches struct.
/// 3. Values pulled from the environment (ESCHOL_DB_*, then the
///    standard PG* vars) where possible.
/// 4. Default values defined in this module.
pub struct DatabaseConnectionBuilder {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

impl Default for DatabaseConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseConnectionBuilder {
    pub fn new() -> Self {
        DatabaseConnectionBuilder {
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
        }
    }

    /// Set connection values via getopts matches.
    ///
    /// Values are only applied where values do not already exist,
    /// so a set_* method has higher precedence than a set of
    /// getopts matches.
    ///
    /// Supported options:
    ///     --db-host
    ///     --db-port
    ///     --db-user
    ///     --db-pass
    ///     --db-name
    pub fn set_opts(&mut self, params: &getopts::Matches) -> FixerResult<()> {
        if self.host.is_none() && params.opt_defined("db-host") {
            self.host = params.opt_str("db-host");
        }

        if self.user.is_none() && params.opt_defined("db-user") {
            self.user = params.opt_str("db-user");
        }

        if self.password.is_none() && params.opt_defined("db-pass") {
            self.password = params.opt_str("db-pass");
        }

        if self.database.is_none() && params.opt_defined("db-name") {
            self.database = params.opt_str("db-name");
        }

        if self.port.is_none() && params.opt_defined("db-port") {
            if let Some(v) = params.opt_str("db-port") {
                let port = v
                    .parse::<u16>()
                    .map_err(|e| format!("Invalid --db-port value '{v}': {e}"))?;
                self.port = Some(port);
            }
        }

        Ok(())
    }

    pub fn set_host(&mut self, host: &str) {
        self.host = Some(host.to_string())
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = Some(port);
    }

    pub fn set_user(&mut self, user: &str) {
        self.user = Some(user.to_string());
    }

    pub fn set_password(&mut self, password: &str) {
        self.password = Some(password.to_string());
    }

    pub fn set_database(&mut self, database: &str) {
        self.database = Some(database.to_string());
    }

    /// First value found among our environment variables.
    fn from_env(names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| env::var(name).ok())
    }

    /// Create the final database connection object from the collected
    /// parameters.
    pub fn build(self) -> FixerResult<DatabaseConnection> {
        let host = self
            .host
            .or_else(|| Self::from_env(&["ESCHOL_DB_HOST", "PGHOST"]))
            .unwrap_or_else(|| DEFAULT_DB_HOST.to_string());

        let user = self
            .user
            .or_else(|| Self::from_env(&["ESCHOL_DB_USER", "PGUSER"]))
            .unwrap_or_else(|| DEFAULT_DB_USER.to_string());

        let database = self
            .database
            .or_else(|| Self::from_env(&["ESCHOL_DB_NAME", "PGDATABASE"]))
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        let password = self
            .password
            .or_else(|| Self::from_env(&["ESCHOL_DB_PASSWORD", "PGPASS"]));

        let port = match self.port {
            Some(p) => p,
            None => match Self::from_env(&["ESCHOL_DB_PORT", "PGPORT"]) {
                Some(v) => v
                    .parse::<u16>()
                    .map_err(|e| format!("Invalid database port value '{v}': {e}"))?,
                None => DEFAULT_DB_PORT,
            },
        };

        let mut dsn = format!("host={host} port={port} user={user} dbname={database}");

        if let Some(ref p) = password {
            dsn += &format!(" password={p}");
        }

        Ok(DatabaseConnection {
            dsn,
            client: None,
        })
    }
}

/// Wrapper for a postgres::Client with connection metadata.
pub struct DatabaseConnection {
    client: Option<pg::Client>,
    dsn: String,
}

impl DatabaseConnection {
    /// Add options to an in-progress getopts::Options related to creating
    /// a database connection.
    pub fn append_options(options: &mut getopts::Options) {
        options.optopt("", "db-host", "Database Host", "DB_HOST");
        options.optopt("", "db-port", "Database Port", "DB_PORT");
        options.optopt("", "db-user", "Database User", "DB_USER");
        options.optopt("", "db-pass", "Database Password", "DB_PASSWORD");
        options.optopt("", "db-name", "Database Name", "DB_NAME");
    }

    pub fn builder() -> DatabaseConnectionBuilder {
        DatabaseConnectionBuilder::new()
    }

    /// Create a new DB connection from a set of getopts matches.
    pub fn new_from_options(params: &getopts::Matches) -> FixerResult<Self> {
        let mut builder = DatabaseConnectionBuilder::new();
        builder.set_opts(params)?;
        builder.build()
    }

    /// Our connection string.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Mutable client ref.
    ///
    /// Panics if the client is not yet connected / created.
    pub fn client(&mut self) -> &mut pg::Client {
        self.client
            .as_mut()
            .expect("DatabaseConnection is not connected!")
    }

    /// Connect to the database.
    ///
    /// Non-TLS connections only supported at present.
    pub fn connect(&mut self) -> FixerResult<()> {
        debug!("Connecting to DB {}", self.dsn());

        match pg::Client::connect(self.dsn(), pg::NoTls) {
            Ok(c) => {
                self.client = Some(c);
                Ok(())
            }
            Err(e) => Err(format!("Error connecting to database: {e}").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_compiles_dsn() {
        let mut builder = DatabaseConnection::builder();
        builder.set_host("db.example.org");
        builder.set_port(5433);
        builder.set_user("fixer");
        builder.set_password("sekrit");
        builder.set_database("eschol_prod");

        let db = builder.build().unwrap();

        assert_eq!(
            db.dsn(),
            "host=db.example.org port=5433 user=fixer dbname=eschol_prod password=sekrit"
        );
    }
}

