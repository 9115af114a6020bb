// Host player interfaces
// The media engine's now playing item and the playback notifications it emits

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{PoisonError, RwLock};

/// Catalog identifiers arrive as either JSON strings or numbers
fn opt_string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(Option::<Raw>::deserialize(de)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    }))
}

fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string_or_number(de)?.unwrap_or_default())
}

/// Now playing item as reported by the host media engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackItem {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub attributes: ItemAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemAttributes {
    pub name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub duration_in_millis: Option<u64>,
    pub genre_names: Vec<String>,
    pub isrc: Option<String>,
    pub track_number: Option<u32>,
    /// Direct link to the track, when the catalog provides one
    pub url: Option<String>,
    pub play_params: Option<PlayParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayParams {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub kind: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub catalog_id: Option<String>,
}

/// Queries the host media engine answers for the event handlers
pub trait MediaEngine: Send + Sync {
    /// The item currently loaded in the player, if any
    fn now_playing_item(&self) -> Option<PlaybackItem>;

    /// Whether the queue still holds an item the player will advance to
    fn has_next_playable_item(&self) -> bool;
}

/// Playback lifecycle notifications the plugin subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostEvent {
    #[serde(rename = "playbackStateDidChange")]
    PlaybackStateDidChange,
    #[serde(rename = "mediaItemStateDidChange")]
    MediaItemStateDidChange,
}

/// One recorded host notification: the event plus the engine state it was fired with
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostNotification {
    pub event: HostEvent,
    #[serde(default)]
    pub now_playing_item: Option<PlaybackItem>,
    #[serde(default)]
    pub has_next_playable_item: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    now_playing: Option<PlaybackItem>,
    has_next: bool,
}

/// Media engine whose state is set from the outside, one notification at a time
#[derive(Debug, Default)]
pub struct HostState {
    state: RwLock<EngineState>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_now_playing(&self, item: Option<PlaybackItem>) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).now_playing = item;
    }

    pub fn set_has_next(&self, has_next: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).has_next = has_next;
    }

    /// Take over the engine state carried by a notification
    pub fn apply(&self, notification: &HostNotification) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.now_playing = notification.now_playing_item.clone();
        state.has_next = notification.has_next_playable_item;
    }
}

impl MediaEngine for HostState {
    fn now_playing_item(&self) -> Option<PlaybackItem> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .now_playing
            .clone()
    }

    fn has_next_playable_item(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).has_next
    }
}
