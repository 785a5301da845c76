//! The JSON inventory of machines to scrape.
//!
//! ```json
//! [
//!   { "master": { "host": "10.0.0.7", "name": "sz-stubbe1", "id": 7,
//!                 "description": "rack 3",
//!                 "tunnels": [{ "type": "ssh", "user": "ops", "port": "22" },
//!                             { "type": "http", "user": "", "port": "9100" }] } }
//! ]
//! ```
use crate::error::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    Deserializer,
};
use std::path::Path;

/// A forwarded port of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tunnel {
    /// Protocol of the tunnel, e.g. `http` or `ssh`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user: String,
    #[serde(deserialize_with = "port_from_text_or_number")]
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Master {
    pub host: String,
    #[serde(default)]
    pub tunnels: Vec<Tunnel>,
    #[serde(default)]
    pub description: String,
    pub name: String,
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Machine {
    pub master: Master,
}

impl Master {
    /// Port of the first `http` tunnel, or of the first tunnel when none is `http`.
    pub fn http_port(&self) -> Option<&str> {
        self.tunnels
            .iter()
            .find(|tunnel| tunnel.kind == "http")
            .or_else(|| self.tunnels.first())
            .map(|tunnel| tunnel.port.as_str())
    }

    /// URL to scrape `path` on this machine. `path` includes its leading slash.
    pub fn target_url(&self, path: &str) -> Option<String> {
        self.http_port()
            .map(|port| format!("http://{}:{port}{path}", self.host))
    }
}

fn port_from_text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u16),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(port) => port,
        Port::Number(port) => port.to_string(),
    })
}

pub fn parse_inventory(content: &str) -> Result<Vec<Machine>> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_inventory(path: &Path) -> Result<Vec<Machine>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| Error::source_unavailable(path, e))?;
    parse_inventory(&content)
}
