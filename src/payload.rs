// Submission payloads for the `submit-listens` endpoint

use crate::config::Config;
use crate::metadata::TrackMetadata;
use serde::Serialize;

/// Display name used as media player and submission client
pub fn client_name(config: &Config) -> &'static str {
    if config.use_apple_music_client_name {
        "Apple Music"
    } else {
        "Cider"
    }
}

/// Which kind of listen is being submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenKind {
    /// The track just started; ListenBrainz shows it as "listening now"
    PlayingNow,
    /// A finished listen, stamped with the epoch second playback started
    Single { listened_at: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenType {
    PlayingNow,
    Single,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listen {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listened_at: Option<i64>,
    pub track_metadata: TrackMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    pub listen_type: ListenType,
    pub payload: Vec<Listen>,
}

impl SubmissionPayload {
    pub fn new(track_metadata: TrackMetadata, kind: ListenKind) -> Self {
        let (listen_type, listened_at) = match kind {
            ListenKind::PlayingNow => (ListenType::PlayingNow, None),
            ListenKind::Single { listened_at } => (ListenType::Single, Some(listened_at)),
        };

        Self {
            listen_type,
            payload: vec![Listen {
                listened_at,
                track_metadata,
            }],
        }
    }

    /// Track and artist of the first listen, for log lines
    pub fn describe(&self) -> String {
        self.payload
            .first()
            .map(|listen| {
                format!(
                    "{} - {}",
                    listen.track_metadata.artist_name, listen.track_metadata.track_name
                )
            })
            .unwrap_or_default()
    }
}
