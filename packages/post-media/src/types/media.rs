//! Media candidates, before and after cleaning.

use serde::{Deserialize, Serialize};

/// Kind of media a candidate points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Sort rank: videos first.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Video => 0,
            Self::Image => 1,
        }
    }
}

/// Inferred quality of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Hd,
    Standard,
    /// Lossy guess (e.g. a video URL derived from a thumbnail)
    Unknown,
}

impl Quality {
    /// Sort rank: hd, then standard, then unknown.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Hd => 0,
            Self::Standard => 1,
            Self::Unknown => 2,
        }
    }
}

/// A cleaned, validated media entry as returned to callers.
///
/// Serializes to the wire shape `{type, url, quality, width?, height?,
/// duration?, thumbnail?}`. Two candidates are the same media when their
/// normalized `url`s match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCandidate {
    #[serde(rename = "type")]
    pub kind: MediaKind,

    pub url: String,

    pub quality: Quality,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Duration in seconds (videos only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl MediaCandidate {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_hd_video(&self) -> bool {
        self.kind == MediaKind::Video && self.quality == Quality::Hd
    }
}

/// A candidate as matched in a payload, before unescaping and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub kind: MediaKind,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    /// Set for URLs guessed from another URL rather than read from the payload
    pub derived: bool,
}

impl RawCandidate {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            width: None,
            height: None,
            duration: None,
            thumbnail: None,
            derived: false,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(MediaKind::Video, url)
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(MediaKind::Image, url)
    }

    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    /// Mark as a lossy guess.
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }
}
