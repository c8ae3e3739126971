//! Command-line interface

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use netdoc_common::NetdocConfig;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netdoc")]
#[command(about = "Diagnose network health on a systemd-networkd host", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Show detail for every check, not only for problems
    #[arg(short, long)]
    pub verbose: bool,

    /// Read configuration from this file instead of /etc/netdoc/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Never retry failed commands with sudo
    #[arg(long)]
    pub no_escalate: bool,
}

pub fn parse_args<I, T>(args: I) -> std::result::Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Exit code for a parse outcome: help and version are not errors
pub fn exit_code_for(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

impl Cli {
    /// Effective configuration; an explicit `--config` must load
    pub fn load_config(&self) -> Result<NetdocConfig> {
        let mut config = match &self.config {
            Some(path) => NetdocConfig::load_from(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NetdocConfig::load(),
        };
        if self.no_escalate {
            config.runner.escalate = false;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cli = parse_args(["netdoc"]).unwrap();
        assert!(!cli.verbose);
        assert!(!cli.no_escalate);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = parse_args(["netdoc", "-v", "--no-escalate", "--config", "/tmp/x.toml"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.no_escalate);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn test_help_exits_zero() {
        let err = parse_args(["netdoc", "--help"]).unwrap_err();
        assert_eq!(exit_code_for(&err), 0);

        let err = parse_args(["netdoc", "-V"]).unwrap_err();
        assert_eq!(exit_code_for(&err), 0);
    }

    #[test]
    fn test_unknown_flag_exits_one() {
        let err = parse_args(["netdoc", "--bogus"]).unwrap_err();
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_no_escalate_overrides_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runner]\nescalate = true\nfast_timeout_secs = 7").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let cli = parse_args(["netdoc", "--no-escalate", "--config", path.as_str()]).unwrap();
        let config = cli.load_config().unwrap();

        assert!(!config.runner.escalate);
        assert_eq!(config.runner.fast_timeout_secs, 7);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = parse_args(["netdoc", "--config", "/nonexistent/netdoc.toml"]).unwrap();
        assert!(cli.load_config().is_err());
    }
}
