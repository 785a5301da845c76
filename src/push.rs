//! Delivery of the relabeled exposition text: a push gateway or a file.
use crate::error::Result;
use reqwest::{
    header::CONTENT_TYPE,
    Client,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::debug;

/// Placeholder of the machine name in a file sink path.
pub const MACHINE_PLACEHOLDER: &str = "{machine}";

/// Where and how to push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// Base URL of the push endpoint, e.g. `http://gateway:9091/metrics`.
    pub base_url: String,
    /// Grouping labels, appended as `/<name>/<value>` path segments.
    pub grouping: Vec<(String, String)>,
    /// Label under which the machine name is pushed.
    pub machine_label: String,
    /// Delete the previous push of a machine before pushing again.
    pub delete_old: bool,
}

impl PushConfig {
    /// `<base>/<name>/<value>.../<machine_label>/<machine_name>`
    pub fn url_for(&self, machine_name: &str) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        for (name, value) in &self.grouping {
            url.push('/');
            url.push_str(name);
            url.push('/');
            url.push_str(value);
        }
        format!("{url}/{}/{machine_name}", self.machine_label)
    }
}

/// Destination of the exposition text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Sink {
    /// POST to the push endpoint.
    #[default]
    Push,
    /// Write to a file. `{machine}` in the path is replaced by the machine name.
    File(PathBuf),
}

impl Sink {
    /// The file of `machine_name`. A path that isn't valid UTF-8 is used unchanged.
    pub fn file_path(template: &Path, machine_name: &str) -> PathBuf {
        match template.to_str() {
            Some(text) if text.contains(MACHINE_PLACEHOLDER) => {
                PathBuf::from(text.replace(MACHINE_PLACEHOLDER, machine_name))
            }
            _ => template.to_path_buf(),
        }
    }
}

/// Remove whatever was pushed before under `url`.
pub async fn delete(client: &Client, url: &str) -> Result<()> {
    let response = client.delete(url).send().await?.error_for_status()?;
    debug!(url, status = %response.status(), "Deleted previous push");
    Ok(())
}

/// POST `body` to `url` as `application/octet-stream`.
pub async fn push(client: &Client, url: &str, body: Vec<u8>) -> Result<()> {
    let size = body.len();
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .send()
        .await?
        .error_for_status()?;
    debug!(url, size, status = %response.status(), "Pushed metrics");
    Ok(())
}

pub async fn write_file(path: &Path, body: &[u8]) -> Result<()> {
    tokio::fs::write(path, body).await?;
    debug!(path = %path.display(), size = body.len(), "Wrote metrics");
    Ok(())
}
