// Metadata extraction
// Turns a host playback item into ListenBrainz track metadata

use crate::host::PlaybackItem;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const CATALOG_SONG_URL: &str = "https://music.apple.com/song/";
const CATALOG_SEARCH_URL: &str = "https://music.apple.com/search?term=";

/// Music service reported with every submission
pub const MUSIC_SERVICE: &str = "music.apple.com";

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_TRACK: &str = "Unknown Track";

static NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

fn numeric(id: Option<&str>) -> Option<&str> {
    id.filter(|id| NUMERIC_ID.is_match(id))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn catalog_url(id: &str) -> String {
    format!("{}{}", CATALOG_SONG_URL, id)
}

fn search_url(term: &str) -> String {
    format!("{}{}", CATALOG_SEARCH_URL, urlencoding::encode(term))
}

/// Best-effort public link for a track, most specific identifier first
pub fn construct_song_url(item: &PlaybackItem) -> Option<String> {
    let attributes = &item.attributes;
    let play_params = attributes.play_params.as_ref();

    if let Some(url) = non_empty(attributes.url.as_deref()) {
        return Some(url.to_string());
    }

    if let Some(id) = numeric(play_params.and_then(|params| params.catalog_id.as_deref())) {
        return Some(catalog_url(id));
    }

    // Library ids may be paths; only the last segment can be a catalog id
    let song_param_id = play_params
        .filter(|params| params.kind.as_deref() == Some("song"))
        .and_then(|params| params.id.as_deref())
        .and_then(|id| id.rsplit('/').next());
    if let Some(id) = numeric(song_param_id) {
        return Some(catalog_url(id));
    }

    if let Some(id) = numeric(Some(item.id.as_str())) {
        return Some(catalog_url(id));
    }

    if let Some(isrc) = non_empty(attributes.isrc.as_deref()) {
        return Some(search_url(isrc));
    }

    match (
        non_empty(attributes.name.as_deref()),
        non_empty(attributes.artist_name.as_deref()),
    ) {
        (Some(name), Some(artist)) => Some(search_url(&format!("{} {}", name, artist))),
        _ => None,
    }
}

/// Optional enrichment sent alongside the required track fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalInfo {
    pub media_player: String,
    pub submission_client: String,
    pub submission_client_version: String,
    pub music_service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracknumber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackMetadata {
    pub artist_name: String,
    pub track_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,
    pub additional_info: AdditionalInfo,
}

/// Build the `track_metadata` block for an item; absent fields are omitted, never sent as null
pub fn build_track_metadata(item: &PlaybackItem, client_name: &str) -> TrackMetadata {
    let attributes = &item.attributes;

    let tags = (!attributes.genre_names.is_empty()).then(|| attributes.genre_names.clone());

    TrackMetadata {
        artist_name: non_empty(attributes.artist_name.as_deref())
            .unwrap_or(UNKNOWN_ARTIST)
            .to_string(),
        track_name: non_empty(attributes.name.as_deref())
            .unwrap_or(UNKNOWN_TRACK)
            .to_string(),
        release_name: non_empty(attributes.album_name.as_deref()).map(str::to_string),
        additional_info: AdditionalInfo {
            media_player: client_name.to_string(),
            submission_client: client_name.to_string(),
            submission_client_version: env!("CARGO_PKG_VERSION").to_string(),
            music_service: MUSIC_SERVICE.to_string(),
            duration_ms: attributes.duration_in_millis.filter(|&ms| ms > 0),
            origin_url: construct_song_url(item),
            tracknumber: attributes.track_number.map(|n| n.to_string()),
            isrc: non_empty(attributes.isrc.as_deref()).map(str::to_string),
            tags,
        },
    }
}
