use anyhow::Context;
use clap::Parser;
use elastictrack::tracking::Tracker;
use elastictrack_pipeline::{load_dotenv, run, Cli, PipelineConfig};
use log::LevelFilter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let dotenv = load_dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match dotenv {
        Ok(Some(path)) => log::debug!("loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => log::warn!("ignoring unreadable .env file: {e}"),
    }

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::try_from(cli).context("invalid arguments")?;

    let store = config
        .tracking
        .uri
        .open(config.tracking.credentials.clone())
        .with_context(|| format!("cannot open tracking store {}", config.tracking.uri))?;
    let mut tracker = Tracker::new(store, &config.tracking.experiment_name)
        .with_source_name(env!("CARGO_BIN_NAME"))
        .with_user(config.tracking.user.clone());

    let mut stdout = std::io::stdout().lock();
    let summary = run(&config, &mut tracker, &mut stdout)?;
    log::info!(
        "run {} finished ({} train / {} test rows)",
        summary.run_id,
        summary.n_train,
        summary.n_test
    );
    Ok(())
}

/// `RUST_LOG` applies unless `-v` or `-q` is given.
fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(LevelFilter::Error);
    } else if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}
