//! Command line interface.
//!
//! Flags are merged over the configuration file, then the result is
//! validated as a whole.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::read_config;
use crate::config::{validate_config, ConfigError, ProxyConfig};

#[derive(Debug, Parser)]
#[command(name = "service-relay")]
#[command(about = "Relay requests to backends selected by the first path segment", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Override `listener.path_prefix`.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Add or replace a service, as `name=url`. Repeatable.
    #[arg(short, long = "service", value_name = "NAME=URL", value_parser = parse_service)]
    pub services: Vec<(String, String)>,

    /// Override `observability.log_level`.
    #[arg(long)]
    pub log_level: Option<String>,
}

fn parse_service(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => {
            Ok((name.to_string(), url.to_string()))
        }
        _ => Err(format!("expected NAME=URL, got `{arg}`")),
    }
}

impl Cli {
    /// Load the file (if any), apply overrides and validate.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(prefix) = self.prefix {
            config.listener.path_prefix = prefix;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        let mut seen = BTreeSet::new();
        for (name, url) in self.services {
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateService(name));
            }
            config.services.insert(name, url);
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
