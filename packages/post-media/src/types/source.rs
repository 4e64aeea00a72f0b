//! Validated post addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a post, taken from its URL path shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Post,
    Reel,
    Igtv,
    Story,
}

impl PostType {
    /// Wire label (`post`, `reel`, `igtv`, `story`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Reel => "reel",
            Self::Igtv => "igtv",
            Self::Story => "story",
        }
    }

    /// Whether posts of this type are expected to carry a video.
    pub fn is_video_type(&self) -> bool {
        matches!(self, Self::Reel | Self::Igtv)
    }

    /// Title used when the payload does not provide one.
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Post => "Instagram Post",
            Self::Reel => "Instagram Reel",
            Self::Igtv => "Instagram IGTV Video",
            Self::Story => "Instagram Story",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical, validated post address.
///
/// Only [`crate::pipeline::normalize::normalize`] constructs these, so every
/// value in circulation has already been canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl {
    url: String,
    post_type: PostType,
    shortcode: Option<String>,
}

impl SourceUrl {
    pub(crate) fn new(url: String, post_type: PostType, shortcode: Option<String>) -> Self {
        Self {
            url,
            post_type,
            shortcode,
        }
    }

    /// Canonical URL string.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn post_type(&self) -> PostType {
        self.post_type
    }

    /// Opaque post identifier; stories have none.
    pub fn shortcode(&self) -> Option<&str> {
        self.shortcode.as_deref()
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl AsRef<str> for SourceUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
