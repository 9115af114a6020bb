// Scrobbler module
// Delivery of listens to ListenBrainz-compatible services

pub mod listenbrainz;
pub mod traits;

pub use listenbrainz::ListenBrainzSubmitter;
pub use traits::{SubmitError, Submitter};
