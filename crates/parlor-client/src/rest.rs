//! Matchmaking REST boundary.
//!
//! Join and leave are plain authenticated POSTs, not real-time traffic: the
//! service acknowledges the request, then pushes queue progress over the
//! WebSocket. Failures are returned to the caller and never move queue
//! state.

use crate::error::RestError;

/// Join-queue endpoint path.
const JOIN_PATH: &str = "/api/queue/join";

/// Leave-queue endpoint path.
const LEAVE_PATH: &str = "/api/queue/leave";

/// Client for the matchmaking endpoints.
#[derive(Debug, Clone)]
pub struct MatchmakingApi {
    http: reqwest::Client,
    base_url: String,
}

impl MatchmakingApi {
    /// Create a client against a service base URL
    /// (e.g. `https://chat.example.com`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http: reqwest::Client::new(), base_url }
    }

    /// Ask the service to put the user in the matchmaking queue.
    pub async fn join_queue(&self, token: &str) -> Result<(), RestError> {
        self.post(JOIN_PATH, token).await
    }

    /// Ask the service to take the user out of the matchmaking queue.
    pub async fn leave_queue(&self, token: &str) -> Result<(), RestError> {
        self.post(LEAVE_PATH, token).await
    }

    /// Full URL for an endpoint path.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post(&self, path: &str, token: &str) -> Result<(), RestError> {
        let url = self.endpoint(path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RestError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            tracing::warn!(%url, status = status.as_u16(), "matchmaking request rejected");
            Err(RestError::Rejected { status: status.as_u16() })
        }
    }
}
