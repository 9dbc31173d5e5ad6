//! Blocking HTTP client for a running locator server.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::location::{Location, NewLocation};

const USER_AGENT: &str = "GeohashLocator/0.3";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let message = response
                    .into_json::<MessageBody>()
                    .map(|b| b.message)
                    .unwrap_or_else(|e| format!("unreadable body: {}", e));
                Self::Status { code, message }
            }
            ureq::Error::Transport(t) => Self::Network(t.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// Server liveness as reported by `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub locations: Option<usize>,
}

pub struct LocatorClient {
    base_url: String,
    agent: ureq::Agent,
}

impl LocatorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(10))
                .user_agent(USER_AGENT)
                .build(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a new location. Returns the server's acknowledgement message.
    pub fn add_location(&self, location: &NewLocation) -> Result<String, ClientError> {
        let body: MessageBody = self
            .agent
            .post(&self.url("/api/locations"))
            .send_json(location)?
            .into_json()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(body.message)
    }

    /// All locations within `radius_km` of (lat, lon).
    pub fn find_locations(&self, lat: f64, lon: f64, radius_km: f64) -> Result<Vec<Location>, ClientError> {
        self.agent
            .get(&self.url("/api/locations"))
            .query("lat", &lat.to_string())
            .query("lon", &lon.to_string())
            .query("radius", &radius_km.to_string())
            .call()?
            .into_json()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub fn health(&self) -> Result<Health, ClientError> {
        self.agent
            .get(&self.url("/api/health"))
            .call()?
            .into_json()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = LocatorClient::new("http://127.0.0.1:8080/");
        assert_eq!(client.url("/api/health"), "http://127.0.0.1:8080/api/health");
    }

    #[test]
    fn test_connection_refused_is_network_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = LocatorClient::new(&format!("http://127.0.0.1:{}", port));
        assert!(matches!(client.health(), Err(ClientError::Network(_))));
    }
}
