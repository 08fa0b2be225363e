pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::cli::{Cli, Converter};
use crate::core::SystemClock;
use crate::providers::ExchangeRatesProvider;
use anyhow::Result;
use std::ffi::OsString;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builds a converter talking to the configured provider and cache file.
pub fn build_converter(config: &config::AppConfig) -> Result<Converter> {
    let provider = ExchangeRatesProvider::new(
        &config.provider.base_url,
        Duration::from_secs(config.provider.timeout_secs),
    )?;
    let cache_path = config.cache_path();
    debug!("Using cache file {}", cache_path.display());

    Ok(Converter::new(
        Arc::new(provider),
        store::open(&cache_path),
        Arc::new(SystemClock),
        i64::try_from(config.cache.lifetime_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX),
    ))
}

/// Runs the command line program and returns its exit code.
pub async fn run<I, T>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match crate::cli::args::parse_arguments(args) {
        Ok(cli) => cli,
        Err(e) => return crate::cli::args::report_parse_error(&e, out, err),
    };

    crate::core::log::init_logging(cli.verbose);

    let converter = match load_config(&cli).and_then(|config| build_converter(&config)) {
        Ok(converter) => converter,
        Err(e) => {
            let _ = writeln!(err, "{e:#}");
            return 1;
        }
    };
    converter.convert(&cli.request(), out, err).await
}

fn load_config(cli: &Cli) -> Result<config::AppConfig> {
    let config = match &cli.config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}
