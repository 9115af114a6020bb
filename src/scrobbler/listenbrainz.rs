// ListenBrainz submitter implementation
// API Documentation: https://listenbrainz.readthedocs.io/

use super::traits::{SubmitError, Submitter};
use crate::config::Config;
use crate::payload::SubmissionPayload;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

/// Endpoint path appended to the configured base URL
pub const SUBMIT_LISTENS_PATH: &str = "/1/submit-listens";

pub struct ListenBrainzSubmitter {
    client: Client,
}

impl ListenBrainzSubmitter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ListenBrainzSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

fn submit_url(config: &Config) -> String {
    format!("{}{}", config.url.trim_end_matches('/'), SUBMIT_LISTENS_PATH)
}

impl Submitter for ListenBrainzSubmitter {
    async fn submit(&self, payload: &SubmissionPayload, config: &Config) -> Result<(), SubmitError> {
        let url = submit_url(config);

        log::debug!(
            "Submitting {:?} to {}: {}",
            payload.listen_type,
            url,
            payload.describe()
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Token {}", config.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|source| SubmitError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
