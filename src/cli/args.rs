//! CLI argument definitions using clap derive

use crate::config::Config;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// cache-pull - restore a CI build cache
///
/// Downloads the cache archive saved by a previous build, checks that it was
/// made on the same stack, and extracts it.
#[derive(Parser, Debug)]
#[command(name = "cache-pull")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cache API URL, or file:// path to a local archive
    #[arg(long, env = "cache_api_url")]
    pub cache_api_url: Option<String>,

    /// Stack id of this machine; archives from other stacks are skipped
    #[arg(long, env = "BITRISEIO_STACK_ID")]
    pub stack_id: Option<String>,

    /// Enable debug logging
    #[arg(long, env = "is_debug_mode")]
    pub debug: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Configuration file path
    #[arg(short, long, env = "CACHE_PULL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory archive paths are extracted under
    #[arg(long)]
    pub destination: Option<PathBuf>,

    /// Where the fallback path downloads the archive
    #[arg(long)]
    pub staging_path: Option<PathBuf>,

    /// tar binary used by the fallback path
    #[arg(long)]
    pub tar_command: Option<String>,

    /// Timeout for the download URL lookup, in seconds
    #[arg(long)]
    pub lookup_timeout: Option<u64>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Apply command line and environment overrides on top of `config`
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref url) = self.cache_api_url {
            config.cache.api_url = Some(url.clone());
        }
        if let Some(ref stack_id) = self.stack_id {
            config.cache.stack_id = Some(stack_id.clone());
        }
        if self.debug {
            config.general.debug = true;
        }
        if let Some(format) = self.log_format {
            config.general.log_format = match format {
                LogFormat::Text => "text".to_string(),
                LogFormat::Json => "json".to_string(),
            };
        }
        if let Some(ref destination) = self.destination {
            config.extract.destination = destination.clone();
        }
        if let Some(ref staging_path) = self.staging_path {
            config.extract.staging_path = staging_path.clone();
        }
        if let Some(ref tar_command) = self.tar_command {
            config.extract.tar_command = tar_command.clone();
        }
        if let Some(secs) = self.lookup_timeout {
            config.cache.lookup_timeout_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "cache-pull",
            "--cache-api-url",
            "file:///tmp/a.tar.gz",
            "--stack-id",
            "osx-xcode",
            "--destination",
            "/tmp/out",
            "--tar-command",
            "gtar",
            "--lookup-timeout",
            "5",
            "--log-format",
            "json",
        ])
        .unwrap();

        let mut config = Config::default();
        config.cache.stack_id = Some("from-file".to_string());
        cli.apply_overrides(&mut config);

        assert_eq!(config.cache.api_url.as_deref(), Some("file:///tmp/a.tar.gz"));
        assert_eq!(config.cache.stack_id.as_deref(), Some("osx-xcode"));
        assert_eq!(config.extract.destination, PathBuf::from("/tmp/out"));
        assert_eq!(config.extract.tar_command, "gtar");
        assert_eq!(config.cache.lookup_timeout_secs, 5);
        assert_eq!(config.general.log_format, "json");
    }

    #[test]
    fn absent_flags_keep_config() {
        let cli = Cli::try_parse_from(["cache-pull"]).unwrap();
        let mut config = Config::default();
        config.cache.stack_id = Some("from-file".to_string());
        config.extract.tar_command = "bsdtar".to_string();

        cli.apply_overrides(&mut config);

        assert_eq!(config.cache.stack_id.as_deref(), Some("from-file"));
        assert_eq!(config.extract.tar_command, "bsdtar");
    }
}
