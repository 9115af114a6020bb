// Common traits for submitting to a scrobbling service

use crate::config::Config;
use crate::payload::SubmissionPayload;
use std::future::Future;

/// Why a submission did not land
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// No response: connection, TLS or timeout failure
    #[error("failed to send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status
    #[error("service rejected submission ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers payloads to a ListenBrainz-compatible service
pub trait Submitter: Send + Sync {
    /// Post one payload; no retries
    fn submit(
        &self,
        payload: &SubmissionPayload,
        config: &Config,
    ) -> impl Future<Output = Result<(), SubmitError>> + Send;
}
