use std::net::Ipv4Addr;
use std::path::PathBuf;
use anyhow::{anyhow, Context};

use crate::api::ApiConfig;

pub const DATA_DIR_VAR: &str = "SERVICE_DESK_DATA_DIR";
pub const HOST_VAR: &str = "SERVICE_DESK_HOST";
pub const PORT_VAR: &str = "SERVICE_DESK_PORT";
pub const ADMIN_TOKEN_VAR: &str = "SERVICE_DESK_ADMIN_TOKEN";

const DEFAULT_PORT: u16 = 7433;

/// Process configuration, read from `SERVICE_DESK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: Ipv4Addr,
    pub port: u16,
    /// Token for the admin created on first start. Generated when unset.
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = match get(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|d| d.join("service-desk"))
                .ok_or_else(|| anyhow!("no data directory available; set {}", DATA_DIR_VAR))?,
        };

        let host = match get(HOST_VAR) {
            Some(host) => host
                .parse()
                .with_context(|| format!("invalid {}: {}", HOST_VAR, host))?,
            None => Ipv4Addr::LOCALHOST,
        };

        let port = match get(PORT_VAR) {
            Some(port) => port
                .parse()
                .with_context(|| format!("invalid {}: {}", PORT_VAR, port))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            data_dir,
            host,
            port,
            admin_token: get(ADMIN_TOKEN_VAR),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("service-desk.db")
    }

    pub fn admin_token_path(&self) -> PathBuf {
        self.data_dir.join("admin_token")
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            port: self.port,
            host: self.host.octets(),
        }
    }
}
