//! Run configuration, collected once at process start.
use crate::FixerResult;
use std::env;

const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Environment-sourced settings, built once in `main` and passed by
/// reference to the components that need them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Drive folder ID holding the .mrc files to correct.
    pub input_dir: String,
    /// Drive folder ID where the corrected output file lands.
    pub output_dir: String,
    /// Drive folder ID under which the per-run backup folder is created.
    pub backup_dir: String,
    /// Path to the Drive authorized-user token file.
    pub token_file: String,
}

impl Config {
    /// Collect folder identifiers and credentials from the environment.
    ///
    /// A `.env` file in the working directory is loaded first when
    /// present.
    pub fn from_env() -> FixerResult<Config> {
        dotenvy::dotenv().ok();

        Ok(Config {
            input_dir: require_env("ESCHOL_INPUT_DIR")?,
            output_dir: require_env("ESCHOL_OUTPUT_DIR")?,
            backup_dir: require_env("ESCHOL_BACKUP_DIR")?,
            token_file: env::var("ESCHOL_DRIVE_TOKEN_FILE")
                .unwrap_or_else(|_| DEFAULT_TOKEN_FILE.to_string()),
        })
    }
}

fn require_env(name: &str) -> FixerResult<String> {
    env::var(name).map_err(|_| format!("Missing required environment variable: {name}").into())
}
