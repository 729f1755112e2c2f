//! Session creation against the control API
//!
//! A single `POST /api/sessions` creates a notebook session and starts its
//! kernel. The response is validated and persisted; a malformed response is
//! a misconfiguration, so there are no retries.

use kw_core::types::{SessionDescriptor, SessionRequest};
use kw_core::{SessionStore, WarmupError};

/// Creates the warm-up session and persists its artifacts
#[derive(Debug, Clone)]
pub struct SessionBootstrapper {
    client: reqwest::Client,
    sessions_url: String,
    store: SessionStore,
}

impl SessionBootstrapper {
    /// Create a bootstrapper posting to `sessions_url`
    pub fn new(
        client: reqwest::Client,
        sessions_url: impl Into<String>,
        store: SessionStore,
    ) -> Self {
        Self {
            client,
            sessions_url: sessions_url.into(),
            store,
        }
    }

    /// Store receiving the session artifacts
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Create a session and persist its kernel ID and raw response
    pub async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionDescriptor, WarmupError> {
        tracing::debug!("Creating session {:?} at {}", request.name, self.sessions_url);

        let response = self
            .client
            .post(&self.sessions_url)
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let descriptor = SessionDescriptor::from_response(status, &body)?;
        self.store.persist(descriptor.kernel_id(), &body)?;

        tracing::info!(
            "Created session {} with kernel {} ({})",
            descriptor.id(),
            descriptor.kernel_id(),
            descriptor.kernel().name
        );
        Ok(descriptor)
    }
}
