//! Runtime configuration.
//!
//! Values come from environment variables, falling back to the defaults declared
//! in the crate root. A missing gateway credential is allowed at startup: the chat
//! function reports it per request instead.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use url::Url;

use crate::error::ConfigError;
use crate::{
    DB_PATH, DEFAULT_BIND_ADDR, DEFAULT_GATEWAY_MODEL, DEFAULT_GATEWAY_URL, GRAPH_STORAGE_KEY,
};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: Url,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub gateway: GatewayConfig,
    pub graph_storage_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = get("STARLAB_BIND")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "STARLAB_BIND",
                message: e.to_string(),
            })?;

        let db_path = PathBuf::from(get("STARLAB_DB_PATH").unwrap_or_else(|| DB_PATH.to_string()));

        let url = Url::parse(
            &get("AI_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
        )
        .map_err(|e| ConfigError::Invalid {
            var: "AI_GATEWAY_URL",
            message: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            db_path,
            gateway: GatewayConfig {
                url,
                model: get("AI_GATEWAY_MODEL").unwrap_or_else(|| DEFAULT_GATEWAY_MODEL.to_string()),
                api_key: get("AI_GATEWAY_API_KEY"),
            },
            graph_storage_key: get("STARLAB_GRAPH_KEY")
                .unwrap_or_else(|| GRAPH_STORAGE_KEY.to_string()),
        })
    }
}
