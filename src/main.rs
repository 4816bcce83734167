//! cache-pull - CI build cache restore
//!
//! CLI entry point; the only place that decides the process exit code.

use cache_pull::archive::{StreamExtractor, TarCommandExtractor};
use cache_pull::cli::Cli;
use cache_pull::config::{Config, ConfigManager};
use cache_pull::error::CacheResult;
use cache_pull::restore::{Outcome, RestoreSettings, Restorer};
use cache_pull::source::HttpFetcher;
use cache_pull::ui::{self, UiContext};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(outcome) => {
            debug!("Finished: {:?}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli, config: &Config) {
    // 0 = warn, 1 = info, 2+ or --debug = debug
    let level = match cli.verbose {
        _ if config.general.debug => "debug",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::new(format!("cache_pull={}", level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run() -> CacheResult<Outcome> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load()?;
    cli.apply_overrides(&mut config);

    init_logging(&cli, &config);
    debug!("Using config file {}", config_manager.path().display());

    let ctx = UiContext::detect();
    ui::section(&ctx, "Configs:");
    ui::key_value(
        &ctx,
        "cache_api_url",
        config.cache.api_url.as_deref().unwrap_or(""),
    );
    ui::key_value(
        &ctx,
        "stack_id",
        config.cache.stack_id.as_deref().unwrap_or(""),
    );
    ui::key_value(
        &ctx,
        "destination",
        &config.extract.destination.display().to_string(),
    );

    let fetcher = HttpFetcher::new(
        ctx.clone(),
        Duration::from_secs(config.cache.lookup_timeout_secs),
    );
    let streaming = StreamExtractor::new();
    let fallback = TarCommandExtractor::new(config.extract.tar_command.clone());
    let settings = RestoreSettings {
        stack_id: config.cache.stack_id.clone(),
        destination: config.extract.destination.clone(),
        staging_path: config.extract.staging_path.clone(),
    };

    let cache_uri = config.cache.api_url.clone().unwrap_or_default();
    Restorer::new(&fetcher, &streaming, &fallback, &ctx, settings).run(&cache_uri)
}
