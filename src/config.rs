//! Server configuration and command-line parsing.

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_PAYLOAD_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `certificate.html` and `report.html`.
    pub templates_dir: PathBuf,
    /// Largest accepted request body, in bytes.
    pub payload_limit: usize,
    /// Worker threads; `None` keeps the actix default (one per core).
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            templates_dir: PathBuf::from("templates"),
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
            workers: None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Run(ServerConfig),
    Help,
}

/// Parse command-line arguments (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<Command, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut config = ServerConfig::default();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        let mut value = || {
            iter.next()
                .map(|v| v.as_ref().to_string())
                .ok_or_else(|| ConfigError::MissingValue(arg.to_string()))
        };
        match arg {
            "--help" | "-h" => return Ok(Command::Help),
            "--host" => config.host = value()?,
            "--port" | "-p" => config.port = parse_number(arg, &value()?)?,
            "--templates" | "-t" => config.templates_dir = PathBuf::from(value()?),
            "--payload-limit" => config.payload_limit = parse_number(arg, &value()?)?,
            "--workers" | "-w" => {
                let workers: usize = parse_number(arg, &value()?)?;
                if workers == 0 {
                    return Err(ConfigError::InvalidValue {
                        flag: arg.to_string(),
                        value: "0".to_string(),
                    });
                }
                config.workers = Some(workers);
            }
            other => return Err(ConfigError::UnknownArgument(other.to_string())),
        }
    }
    Ok(Command::Run(config))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    })
}

pub fn usage(prog: &str) -> String {
    format!(
        "cert-forge – certificate and attendance report PDF service

Usage:
  {prog} [--host <addr>] [--port <n>] [--templates <dir>] [--payload-limit <bytes>] [--workers <n>]

Flags:
  --host             Address to bind (default: 127.0.0.1)
  --port, -p         Port to bind (default: 8000)
  --templates, -t    Template directory (default: templates)
  --payload-limit    Largest request body in bytes (default: 2097152)
  --workers, -w      Worker threads (default: one per core)
  --help, -h         Print this message

Logging is controlled by RUST_LOG (default: info)."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(
            parse_args(Vec::<String>::new()).unwrap(),
            Command::Run(ServerConfig::default())
        );
    }

    #[test]
    fn all_flags() {
        let cmd = parse_args([
            "--host", "0.0.0.0", "--port", "9000", "-t", "/srv/templates", "--payload-limit", "1024",
            "--workers", "4",
        ])
        .unwrap();
        let Command::Run(config) = cmd else {
            panic!("expected run command");
        };
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.templates_dir, PathBuf::from("/srv/templates"));
        assert_eq!(config.payload_limit, 1024);
        assert_eq!(config.workers, Some(4));
    }

    #[test]
    fn help_wins() {
        assert_eq!(parse_args(["--port", "1", "--help"]).unwrap(), Command::Help);
    }

    #[test]
    fn bad_values() {
        assert_eq!(
            parse_args(["--port", "eighty"]).unwrap_err(),
            ConfigError::InvalidValue {
                flag: "--port".into(),
                value: "eighty".into()
            }
        );
        assert_eq!(
            parse_args(["--port"]).unwrap_err(),
            ConfigError::MissingValue("--port".into())
        );
        assert_eq!(
            parse_args(["--verbose"]).unwrap_err(),
            ConfigError::UnknownArgument("--verbose".into())
        );
        assert!(parse_args(["--workers", "0"]).is_err());
    }
}
