use eschol_fixer::batch::BatchRunner;
use eschol_fixer::batch::RecordPolicy;
use eschol_fixer::conf::Config;
use eschol_fixer::db::DatabaseConnection;
use eschol_fixer::drive::GoogleDrive;
use eschol_fixer::lookup::EscholDb;
use eschol_fixer::FixerResult;

const HELP_TEXT: &str = r#"
Corrects the eScholarship URL in each UCLA MARC record found in the
configured Drive input folder, uploads the corrected records as one
file, and moves the processed inputs to a dated backup folder.

Options

    --skip-unresolved
        Report and drop records that cannot be corrected instead of
        aborting the batch run.

    --token-file <path>
        Drive authorized-user token file.
        Defaults to $ESCHOL_DRIVE_TOKEN_FILE, then token.json.

    --db-host <host>
    --db-port <port>
    --db-user <user>
    --db-pass <password>
    --db-name <database>
        eScholarship database connection options.  ESCHOL_DB_* and PG*
        environment vars are used as defaults when available.

    --help
        Print help message

Environment

    ESCHOL_INPUT_DIR    Drive folder ID holding the input .mrc files
    ESCHOL_OUTPUT_DIR   Drive folder ID for the corrected output file
    ESCHOL_BACKUP_DIR   Drive folder ID for per-run backup folders

    A .env file in the working directory is loaded first when present.
"#;

fn main() -> FixerResult<()> {
    env_logger::init();

    let mut opts = getopts::Options::new();

    opts.optflag("h", "help", "");
    opts.optflag("", "skip-unresolved", "");
    opts.optopt("", "token-file", "", "");

    DatabaseConnection::append_options(&mut opts);

    let args: Vec<String> = std::env::args().collect();

    let params = opts
        .parse(&args[1..])
        .map_err(|e| format!("Error parsing options: {e}"))?;

    if params.opt_present("help") {
        println!("{HELP_TEXT}");
        return Ok(());
    }

    let mut conf = Config::from_env()?;

    if let Some(path) = params.opt_str("token-file") {
        conf.token_file = path;
    }

    let policy = if params.opt_present("skip-unresolved") {
        RecordPolicy::Skip
    } else {
        RecordPolicy::Abort
    };

    let mut store = GoogleDrive::from_token_file(&conf.token_file)?;

    let mut eschol = EscholDb::new(DatabaseConnection::new_from_options(&params)?);
    eschol.connect()?;

    let summary = BatchRunner::new(&conf, policy, &mut store, &mut eschol).run()?;

    if !summary.skipped.is_empty() {
        println!("Skipped {} record(s):", summary.skipped.len());
        for (file, err) in &summary.skipped {
            println!("  {file}: {err}");
        }
    }

    println!("Program complete. Exiting.");

    Ok(())
}
