//! Client for the remote multi-agent tutor endpoint.

use std::time::Duration;

use thiserror::Error;

use super::types::{Message, TutorRequest, TutorResponse, TutorState, WireMessage};
use crate::storage::config::TutorSettings;

/// Tutor endpoint client.
pub struct TutorClient {
    /// HTTP client
    http: reqwest::Client,
    /// Multi-agent chat function URL
    endpoint_url: String,
    /// Bearer key
    api_key: String,
    /// Model forwarded with each request
    model: String,
}

impl TutorClient {
    /// Create a client from configuration.
    pub fn new(settings: &TutorSettings) -> Result<Self, TutorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| TutorError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint_url: settings.endpoint_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    /// Build the request body for a conversation.
    pub fn request_body(&self, messages: &[Message], topic: &str, state: &TutorState) -> TutorRequest {
        TutorRequest {
            messages: messages.iter().map(WireMessage::from).collect(),
            topic: topic.to_string(),
            state: state.clone(),
            model: self.model.clone(),
        }
    }

    /// Send the conversation so far and get the tutor's next turn.
    pub async fn send_message(
        &self,
        messages: &[Message],
        topic: &str,
        state: &TutorState,
    ) -> Result<TutorResponse, TutorError> {
        let body = self.request_body(messages, topic, state);

        let response = self
            .http
            .post(&self.endpoint_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error sending message to tutor: {}", e);
                TutorError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Tutor endpoint returned status {}", status);
            return Err(TutorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let reply: TutorResponse = response
            .json()
            .await
            .map_err(|e| TutorError::Serialization(e.to_string()))?;

        tracing::debug!(
            "Tutor replied as {} (hint level {})",
            reply.active_agent,
            reply.next_state.hint_level
        );
        Ok(reply)
    }
}

/// Tutor endpoint errors.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("HTTP error! status: {status}, message: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to communicate with the tutor: {0}")]
    Request(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Invalid tutor response: {0}")]
    Serialization(String),
}
