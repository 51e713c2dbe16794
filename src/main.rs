use std::{error::Error, fs::File, io, path::PathBuf, process};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use url::Url;

use dzmedia::{
    config::Config, pool::ClientPool, protocol::Format, secret, session::TrackSession,
    track::Track,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when built in release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Secrets file
    ///
    /// Ensure that this file is kept secure and not shared publicly, as it
    /// contains the master secret used to derive track decryption keys.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Base URL of the media resolution endpoint
    #[arg(short, long, value_name = "URL", value_hint = ValueHint::Url)]
    resolve_base: Url,

    /// Audio format to request
    ///
    /// `MP3` and `FLAC` are known; any other value is forwarded to the
    /// resolution endpoint as-is.
    #[arg(short, long, default_value = "MP3")]
    format: Format,

    /// Expected content length in bytes, from the track metadata
    #[arg(short, long, value_name = "BYTES")]
    length: u64,

    /// Preview clip URL
    ///
    /// When given, the unprotected preview is acquired instead of the
    /// protected variant; no resolution call and no decryption happen.
    #[arg(short, long, value_name = "URL", value_hint = ValueHint::Url)]
    preview: Option<Url>,

    /// Track identifier to acquire
    track: String,

    /// Output file for the decrypted bytes
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Acquires one track and writes the decrypted bytes to the output file.
///
/// # Errors
///
/// Returns an error when the secret cannot be loaded, the track cannot be
/// resolved, or the stream fails mid-transfer.
fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let secret = secret::load(&args.secrets_file)?;
    let config = Config::new(secret, args.format.clone(), args.resolve_base.clone());

    let pool = ClientPool::new(&config);
    let mut track = Track::new(args.track.clone(), args.length);
    if let Some(preview) = args.preview.clone() {
        track = track.with_preview(preview).preview_only(true);
    }

    let session = TrackSession::new(&pool, config)?;
    let mut audio = session.start(&track)?;

    let mut output = File::create(&args.output)?;
    let written = io::copy(&mut audio, &mut output)?;
    info!("wrote {written} bytes to {}", args.output.display());

    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and runs the acquisition.
fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args) {
        error!("{e}");
        process::exit(1);
    }
}
