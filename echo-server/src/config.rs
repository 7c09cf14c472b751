//! # Configuration
//!
//! Settings come from command-line arguments and an optional TOML file. Command-line values
//! take precedence over file values, which take precedence over the defaults.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8081"
//! reflection = true
//!
//! [server.tls]
//! cert = "ssl.crt"
//! key = "ssl.key"
//!
//! [schema]
//! descriptor_set = "echo.bin"
//!
//! [echo]
//! unary_prefix = "nonstreaming echo "
//! streaming_prefix = "streaming echo "
//!
//! [logging]
//! level = "debug"
//! ```
use clap::Parser;
use echo_core::EchoConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_LISTEN: &str = "127.0.0.1:8081";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "echo-server", version, about = "gRPC echo server")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 127.0.0.1:8081)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// PEM certificate, enables TLS together with --tls-key
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key, enables TLS together with --tls-cert
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Path to the descriptor set (.bin) describing the echo messages
    #[arg(long)]
    pub descriptor_set: Option<PathBuf>,

    /// Do not expose the gRPC reflection service
    #[arg(long)]
    pub no_reflection: bool,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub schema: SchemaSection,
    pub echo: EchoSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub listen: Option<String>,
    pub reflection: Option<bool>,
    pub tls: Option<TlsSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsSection {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaSection {
    pub descriptor_set: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EchoSection {
    pub unary_method: Option<String>,
    pub streaming_method: Option<String>,
    pub request_schema: Option<String>,
    pub response_schema: Option<String>,
    pub unary_prefix: Option<String>,
    pub streaming_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

/// PEM files of the server identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub tls: Option<TlsConfig>,
    pub descriptor_set: Option<PathBuf>,
    pub reflection: bool,
    pub echo: EchoConfig,
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid listen address '{address}': {source}")]
    InvalidListen {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("TLS needs both a certificate and a key")]
    IncompleteTls,
}

impl Config {
    /// Load configuration from CLI args and the optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let file = match &cli.config {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
                        path: path.clone(),
                        source,
                    })?;

                toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
                    path: path.clone(),
                    source,
                })?
            }
            None => TomlConfig::default(),
        };

        Self::resolve(cli, file)
    }

    /// Merges CLI args over the file values.
    pub fn resolve(cli: CliArgs, file: TomlConfig) -> Result<Self, ConfigError> {
        let address = cli
            .listen
            .or(file.server.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());

        let listen = address
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidListen { address, source })?;

        let tls = match (cli.tls_cert, cli.tls_key) {
            (Some(cert), Some(key)) => Some(TlsConfig { cert, key }),
            (None, None) => file
                .server
                .tls
                .map(|tls| TlsConfig { cert: tls.cert, key: tls.key }),
            _ => return Err(ConfigError::IncompleteTls),
        };

        let defaults = EchoConfig::default();
        let echo = EchoConfig {
            unary_method: file.echo.unary_method.unwrap_or(defaults.unary_method),
            streaming_method: file.echo.streaming_method.unwrap_or(defaults.streaming_method),
            request_schema: file.echo.request_schema.unwrap_or(defaults.request_schema),
            response_schema: file.echo.response_schema.unwrap_or(defaults.response_schema),
            unary_prefix: file.echo.unary_prefix.unwrap_or(defaults.unary_prefix),
            streaming_prefix: file.echo.streaming_prefix.unwrap_or(defaults.streaming_prefix),
            // Fixed by `EchoServer`'s registered service name.
            service: defaults.service,
        };

        Ok(Config {
            listen,
            tls,
            descriptor_set: cli.descriptor_set.or(file.schema.descriptor_set),
            reflection: !cli.no_reflection && file.server.reflection.unwrap_or(true),
            echo,
            log_level: cli
                .log_level
                .or(file.logging.level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        let mut argv = vec!["echo-server"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(cli(&[]), TomlConfig::default()).unwrap();

        assert_eq!(config.listen, "127.0.0.1:8081".parse::<SocketAddr>().unwrap());
        assert_eq!(config.tls, None);
        assert!(config.reflection);
        assert_eq!(config.echo, EchoConfig::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_file_values() {
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:9000"
            reflection = false

            [server.tls]
            cert = "ssl.crt"
            key = "ssl.key"

            [echo]
            unary_prefix = "unary: "

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = Config::resolve(cli(&[]), file).unwrap();

        assert_eq!(config.listen, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(
            config.tls,
            Some(TlsConfig {
                cert: PathBuf::from("ssl.crt"),
                key: PathBuf::from("ssl.key"),
            })
        );
        assert!(!config.reflection);
        assert_eq!(config.echo.unary_prefix, "unary: ");
        assert_eq!(config.echo.streaming_prefix, "streaming echo ");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_cli_takes_precedence() {
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:9000"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            cli(&["--listen", "127.0.0.1:7000", "--log-level", "warn"]),
            file,
        )
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_incomplete_tls() {
        let err = Config::resolve(cli(&["--tls-cert", "ssl.crt"]), TomlConfig::default())
            .unwrap_err();

        assert!(matches!(err, ConfigError::IncompleteTls));
    }

    #[test]
    fn test_invalid_listen() {
        let err = Config::resolve(cli(&["--listen", "localhost"]), TomlConfig::default())
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidListen { .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let parsed = toml::from_str::<TomlConfig>("[server]\nport = 1\n");

        assert!(parsed.is_err());
    }
}
