use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use super::CassiniConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["cassini.toml", "config/cassini.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field} endpoint `{value}`: {source}")]
    Endpoint {
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
}

pub fn load_config(path: Option<PathBuf>) -> Result<CassiniConfig, ConfigError> {
    let candidate_paths = match path {
        Some(p) => vec![p],
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>(),
    };

    for candidate in candidate_paths {
        if let Some(config) = try_load_file(&candidate)? {
            validate_endpoints(&config)?;
            return Ok(config);
        }
    }

    Ok(CassiniConfig::default())
}

fn try_load_file(path: &Path) -> Result<Option<CassiniConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: CassiniConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

fn validate_endpoints(config: &CassiniConfig) -> Result<(), ConfigError> {
    let endpoints = [
        ("rpc.url", config.rpc.url.as_str()),
        ("indexer.url", config.indexer.url.as_str()),
        ("venue.quote_url", config.venue.quote_url.as_str()),
        ("venue.trade_url", config.venue.trade_url.as_str()),
    ];
    for (field, value) in endpoints {
        if value.is_empty() {
            continue;
        }
        Url::parse(value).map_err(|source| ConfigError::Endpoint {
            field,
            value: value.to_string(),
            source,
        })?;
    }
    Ok(())
}
