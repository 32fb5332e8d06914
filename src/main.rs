mod cli;
mod config;
mod directive;
mod engine;
mod gate;
mod paths;
mod schema;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use hostkit::SystemBackend;
use std::process::ExitCode;
use std::time::Duration;

use config::Config;
use engine::{ApplySettings, LogProgress, NoProgress};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    log::info!("starting up");

    let config = Config::load(&cli.config)
        .with_context(|| format!("can't load config {}", cli.config.display()))?;
    log::debug!(
        "loaded instance {}: {} users, {} files, {} commands",
        config.instance_id,
        config.users.len(),
        config.files.len(),
        config.runcmd.len()
    );

    let host = SystemBackend::new().with_timeout(cli.command_timeout.map(Duration::from_secs));
    let settings = ApplySettings {
        marker_dir: cli.marker_dir.clone(),
        hostname_record: cli.hostname_file.clone(),
        dry_run: cli.dry_run,
    };

    let outcome = if cli.quiet {
        engine::apply(&config, &host, &settings, &mut NoProgress)?
    } else {
        engine::apply(&config, &host, &settings, &mut LogProgress)?
    };

    if !cli.quiet {
        ui::report(&config.instance_id, &outcome);
    }
    Ok(())
}
