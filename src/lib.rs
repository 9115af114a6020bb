// Cider ListenBrainz
// Forwards the player's now playing and listen events to a ListenBrainz-compatible service

pub mod bridge;
pub mod config;
pub mod host;
pub mod metadata;
pub mod payload;
pub mod scrobbler;

pub use bridge::{EventBridge, Slot, TrackSnapshot};
pub use config::{Config, ConfigBridge, FileSettingsStore, MemorySettingsStore, SettingsStore, PLUGIN_IDENTIFIER};
pub use host::{HostEvent, HostNotification, HostState, MediaEngine, PlaybackItem};
pub use scrobbler::{ListenBrainzSubmitter, SubmitError, Submitter};
