// Event bridge
// Turns host playback notifications into now playing and listen submissions

use crate::config::{Config, ConfigBridge};
use crate::host::{HostEvent, MediaEngine, PlaybackItem};
use crate::metadata::build_track_metadata;
use crate::payload::{client_name, ListenKind, ListenType, SubmissionPayload};
use crate::scrobbler::Submitter;
use std::sync::{Arc, Mutex, PoisonError};

/// Source of epoch seconds for `listened_at`
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// The track currently considered in progress
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub item: PlaybackItem,
    /// Epoch seconds at which the track was first seen playing
    pub listened_at: i64,
}

/// Single pending-track slot
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    #[default]
    Empty,
    Pending(TrackSnapshot),
}

impl Slot {
    fn pending_id(&self) -> Option<&str> {
        match self {
            Slot::Empty => None,
            Slot::Pending(snapshot) => Some(snapshot.item.id.as_str()),
        }
    }

    /// Move the pending snapshot out, leaving the slot empty
    fn take(&mut self) -> Option<TrackSnapshot> {
        match std::mem::take(self) {
            Slot::Empty => None,
            Slot::Pending(snapshot) => Some(snapshot),
        }
    }

    /// Adopt `snapshot`, returning whatever was pending before
    fn replace(&mut self, snapshot: TrackSnapshot) -> Option<TrackSnapshot> {
        match std::mem::replace(self, Slot::Pending(snapshot)) {
            Slot::Empty => None,
            Slot::Pending(previous) => Some(previous),
        }
    }
}

pub struct EventBridge<S> {
    config: Arc<ConfigBridge>,
    engine: Arc<dyn MediaEngine>,
    submitter: S,
    slot: Mutex<Slot>,
    clock: Clock,
}

impl<S: Submitter> EventBridge<S> {
    pub fn new(config: Arc<ConfigBridge>, engine: Arc<dyn MediaEngine>, submitter: S) -> Self {
        Self {
            config,
            engine,
            submitter,
            slot: Mutex::new(Slot::Empty),
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Current slot contents
    pub fn slot(&self) -> Slot {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Route a host notification to its handler
    pub async fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::MediaItemStateDidChange => self.on_media_item_changed().await,
            HostEvent::PlaybackStateDidChange => self.on_playback_state_changed().await,
        }
    }

    /// A new item was loaded: close out the previous track, announce the new one
    pub async fn on_media_item_changed(&self) {
        let config = self.config.get();
        if !config.enabled {
            log::debug!("Submissions disabled, ignoring media item change");
            return;
        }

        let Some(item) = self.engine.now_playing_item() else {
            log::debug!("Media item changed without a current item");
            return;
        };

        // Swap under the lock so a concurrent handler can never finalize the same snapshot
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.pending_id() == Some(item.id.as_str()) {
                log::debug!("Media item {} re-reported, nothing to do", item.id);
                return;
            }
            slot.replace(TrackSnapshot {
                item: item.clone(),
                listened_at: (self.clock)(),
            })
        };

        let client = client_name(&config);

        if let Some(previous) = previous {
            let payload = SubmissionPayload::new(
                build_track_metadata(&previous.item, client),
                ListenKind::Single {
                    listened_at: previous.listened_at,
                },
            );
            self.deliver(payload, &config).await;
        }

        let payload = SubmissionPayload::new(build_track_metadata(&item, client), ListenKind::PlayingNow);
        self.deliver(payload, &config).await;
    }

    /// Playback state moved; a stop with nothing queued finalizes the pending track
    pub async fn on_playback_state_changed(&self) {
        let config = self.config.get();
        if !config.enabled {
            log::debug!("Submissions disabled, ignoring playback state change");
            return;
        }

        if self.engine.now_playing_item().is_some() || self.engine.has_next_playable_item() {
            return;
        }

        // Emptied before the await: the host fires this event several times in a row
        let taken = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.take()
        };
        let Some(snapshot) = taken else {
            return;
        };

        log::info!("Playback stopped, finalizing {}", snapshot.item.id);

        let payload = SubmissionPayload::new(
            build_track_metadata(&snapshot.item, client_name(&config)),
            ListenKind::Single {
                listened_at: snapshot.listened_at,
            },
        );
        self.deliver(payload, &config).await;
    }

    /// Submit once; failures are logged and the payload dropped
    async fn deliver(&self, payload: SubmissionPayload, config: &Config) {
        match self.submitter.submit(&payload, config).await {
            Ok(()) => match payload.listen_type {
                ListenType::PlayingNow => log::info!("ListenBrainz: Now playing updated ({})", payload.describe()),
                ListenType::Single => log::info!("ListenBrainz: Scrobbled {}", payload.describe()),
            },
            Err(e) => log::warn!(
                "ListenBrainz: Dropping {:?} submission for {}: {}",
                payload.listen_type,
                payload.describe(),
                e
            ),
        }
    }
}
