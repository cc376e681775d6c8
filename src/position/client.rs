use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::coach::TargetSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct PositionBody {
    position: String,
}

#[derive(Deserialize)]
struct InstructionsBody {
    instructions: String,
}

/// Blocking client for the position server.
pub struct PositionClient {
    base: Url,
    agent: ureq::Agent,
}

impl PositionClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).context("parse position server url")?;
        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported position server scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        // Endpoints join relative to the base path.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Ok(Self { base, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetch the next target position.
    pub fn get_position(&self) -> Result<String> {
        let url = self.base.join("get_position")?;
        let body: PositionBody = self.get_json(&url)?;
        Ok(body.position)
    }

    /// Fetch hold instructions for `position`.
    pub fn get_instructions(&self, position: &str) -> Result<String> {
        let mut url = self.base.join("get_instructions")?;
        url.query_pairs_mut().append_pair("position", position);
        let body: InstructionsBody = self.get_json(&url)?;
        Ok(body.instructions)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .with_context(|| format!("request to {} failed", url))?;
        let text = response
            .into_string()
            .with_context(|| format!("read response from {}", url))?;
        serde_json::from_str(&text).with_context(|| format!("invalid JSON from {}", url))
    }
}

impl TargetSource for PositionClient {
    fn target_position(&mut self) -> Result<String> {
        self.get_position()
    }

    fn instructions(&mut self, position: &str) -> Result<String> {
        self.get_instructions(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        assert!(PositionClient::new("ftp://localhost:5000").is_err());
        assert!(PositionClient::new("not a url").is_err());
    }

    #[test]
    fn joins_paths_onto_base() -> Result<()> {
        let client = PositionClient::new("http://localhost:5000")?;
        assert_eq!(
            client.base_url().join("get_position")?.as_str(),
            "http://localhost:5000/get_position"
        );
        Ok(())
    }

    #[test]
    fn keeps_base_path_without_trailing_slash() -> Result<()> {
        let client = PositionClient::new("http://coach-host:5000/api")?;
        assert_eq!(client.base_url().as_str(), "http://coach-host:5000/api/");
        assert_eq!(
            client.base_url().join("get_instructions")?.as_str(),
            "http://coach-host:5000/api/get_instructions"
        );

        let client = PositionClient::new("http://coach-host:5000/api/")?;
        assert_eq!(client.base_url().as_str(), "http://coach-host:5000/api/");
        Ok(())
    }
}
