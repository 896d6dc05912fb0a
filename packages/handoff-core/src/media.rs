//! Media data model shared by every component.
//!
//! These are inert value types: a [`MediaDescriptor`] is created once when the
//! catalog is parsed and shared by reference afterwards; a [`QueueItem`] wraps
//! a descriptor with the per-entry settings the receiver needs.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Media Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Where the content of a [`MediaDescriptor`] is fetched from.
///
/// Either a plain URL or an opaque entity id understood by the receiver,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ContentLocator {
    /// Direct content URL.
    Url(String),
    /// Opaque entity identifier.
    Entity(String),
}

impl ContentLocator {
    /// Returns the raw locator string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(value) | Self::Entity(value) => value,
        }
    }

    /// A locator is only usable when it carries a non-blank value.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.as_str().trim().is_empty()
    }
}

/// Kind of an auxiliary media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
    Text,
}

/// Sub-kind of a text track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSubkind {
    #[default]
    None,
    Captions,
    Subtitles,
}

/// An auxiliary track (caption file, alternate audio, ...) of a media entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: u64,
    pub kind: TrackKind,
    #[serde(default)]
    pub subkind: TrackSubkind,
    pub locator: String,
    pub name: String,
    pub language: String,
}

/// Immutable description of one playable media entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    /// Content locator. `None` when the catalog entry had neither a URL nor
    /// an entity id; such descriptors are rejected by every play command.
    pub locator: Option<ContentLocator>,
    /// MIME / content type, e.g. `application/x-mpegurl`.
    pub content_type: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Image URLs, most preferred first.
    #[serde(default)]
    pub images: Vec<String>,
    /// Duration in milliseconds. `0` means unknown (live content).
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl MediaDescriptor {
    /// Creates a descriptor with the required fields; the rest start empty.
    pub fn new(
        locator: ContentLocator,
        content_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            locator: Some(locator),
            content_type: content_type.into(),
            title: title.into(),
            subtitle: String::new(),
            images: Vec::new(),
            duration_ms: 0,
            tracks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.images.push(url.into());
        self
    }

    #[must_use]
    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Returns the locator if it is usable for playback.
    #[must_use]
    pub fn playable_locator(&self) -> Option<&ContentLocator> {
        self.locator.as_ref().filter(|locator| locator.is_valid())
    }

    /// Returns `true` for live content (no known duration).
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.duration_ms == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Queue Item
// ─────────────────────────────────────────────────────────────────────────────

/// Receiver-assigned identifier of a queue entry.
///
/// Unique while the entry is present in a queue and stable across reorders.
/// Rebuilding and reloading a queue produces new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(pub u32);

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of a playback queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// `None` until the receiver has accepted the item into its queue.
    pub id: Option<QueueItemId>,
    pub media: Arc<MediaDescriptor>,
    /// Whether the receiver advances into this item automatically.
    pub autoplay: bool,
    /// Seconds before the predecessor ends at which the receiver should
    /// start preloading this item.
    pub preload_time_secs: f64,
}

impl QueueItem {
    /// Builds a new, not yet enqueued item with autoplay enabled.
    pub fn new(media: Arc<MediaDescriptor>, preload_time_secs: f64) -> Self {
        Self {
            id: None,
            media,
            autoplay: true,
            preload_time_secs,
        }
    }

    /// Attaches a receiver id. Used by receivers when accepting the item.
    #[must_use]
    pub fn with_id(mut self, id: QueueItemId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns a copy without its id, ready to be loaded into a new queue.
    #[must_use]
    pub fn rebuilt(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}
