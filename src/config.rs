use std::ffi::OsString;
use std::path::PathBuf;
use clap::{App, Arg};
use crate::server::pool::MAX_WORKERS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Startup parameters of the server.
#[derive(Debug, Clone)]
pub struct Config {
    pub root_dir: PathBuf,
    pub address: String,
    pub port: u16,
    pub pool_size: usize,
    /// Stop after this many connections; `None` serves forever.
    pub max_requests: Option<usize>,
}

impl Config {
    pub fn from_args() -> Result<Config, ConfigError> {
        Config::from_arg_list(std::env::args_os())
    }

    pub fn from_arg_list<I, T>(args: I) -> Result<Config, ConfigError>
        where I: IntoIterator<Item = T>, T: Into<OsString> + Clone {
        let matches = App::new("rust-static-server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("A simple static content web server")
            .arg(Arg::with_name("address")
                .short("a")
                .value_name("BIND_ADDRESS")
                .default_value("127.0.0.1")
                .takes_value(true))
            .arg(Arg::with_name("port")
                .short("p")
                .value_name("PORT_NUMBER")
                .default_value("8080")
                .takes_value(true))
            .arg(Arg::with_name("workers")
                .short("w")
                .long("workers")
                .value_name("POOL_SIZE")
                .default_value("4")
                .takes_value(true))
            .arg(Arg::with_name("max_requests")
                .short("m")
                .long("max-requests")
                .value_name("MAX_REQUESTS")
                .takes_value(true))
            .arg(Arg::with_name("root_directory")
                .required(true)
                .value_name("ROOT_DIRECTORY"))
            .get_matches_from_safe(args)?;

        let config = Config {
            root_dir: PathBuf::from(matches.value_of_os("root_directory").unwrap_or_default()),
            address: matches.value_of("address").unwrap_or("127.0.0.1").to_string(),
            port: parse_value("port", matches.value_of("port"))?.unwrap_or(8080),
            pool_size: parse_value("workers", matches.value_of("workers"))?.unwrap_or(4),
            max_requests: parse_value("max_requests", matches.value_of("max_requests"))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 || self.pool_size > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                name: "workers",
                value: format!("{} (expected 1-{})", self.pool_size, MAX_WORKERS),
            });
        }
        if self.max_requests == Some(0) {
            return Err(ConfigError::InvalidValue { name: "max_requests", value: "0".to_string() });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: Option<&str>) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue { name, value: v.to_string() }),
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            root_dir: PathBuf::from("."),
            address: "127.0.0.1".to_string(),
            port: 8080,
            pool_size: 4,
            max_requests: None,
        }
    }
}
