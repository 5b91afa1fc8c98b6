//! CLI argument parsing for binwarm
//!
//! One optional positional argument: the advisory polling period in
//! seconds. Bad values are recovered locally with a warning and the default
//! retained; only `--help` terminates before monitoring starts.

use clap::Parser;
use std::num::IntErrorKind;
use tracing::{info, warn};

use crate::params::DEFAULT_TIMEOUT_SECS;

#[derive(Parser, Debug)]
#[command(name = "binwarm")]
#[command(version)]
#[command(
    about = "Watches hot binaries and advises the kernel to prefetch their code sections",
    long_about = None
)]
pub struct Cli {
    /// Polling period of the advisory loop in seconds (0-65535, default 300)
    #[arg(value_name = "TIMEOUT_SECONDS")]
    pub timeout: Option<String>,
}

impl Cli {
    /// Resolve the polling period, substituting the default for invalid or
    /// out-of-range values.
    pub fn period_secs(&self) -> u16 {
        let Some(raw) = &self.timeout else {
            info!(
                "run `binwarm <timeout_in_seconds>` to override the default {} second period",
                DEFAULT_TIMEOUT_SECS
            );
            return DEFAULT_TIMEOUT_SECS;
        };

        match raw.parse::<u16>() {
            Ok(secs) => secs,
            Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow) => {
                warn!(
                    "timeout {} is out of range, keeping default {} seconds",
                    raw, DEFAULT_TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT_SECS
            }
            Err(_) => {
                warn!(
                    "timeout {} contains invalid characters, keeping default {} seconds",
                    raw, DEFAULT_TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT_SECS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(arg: Option<&str>) -> Cli {
        Cli {
            timeout: arg.map(str::to_string),
        }
    }

    #[test]
    fn test_default_period_when_absent() {
        assert_eq!(cli(None).period_secs(), 300);
    }

    #[test]
    fn test_valid_period_is_used() {
        assert_eq!(cli(Some("60")).period_secs(), 60);
        assert_eq!(cli(Some("0")).period_secs(), 0);
        assert_eq!(cli(Some("65535")).period_secs(), 65535);
    }

    #[test]
    fn test_out_of_range_falls_back_to_default() {
        assert_eq!(cli(Some("65536")).period_secs(), 300);
        assert_eq!(cli(Some("99999999")).period_secs(), 300);
    }

    #[test]
    fn test_invalid_characters_fall_back_to_default() {
        assert_eq!(cli(Some("abc")).period_secs(), 300);
        assert_eq!(cli(Some("12x")).period_secs(), 300);
        assert_eq!(cli(Some("-5")).period_secs(), 300);
    }
}
