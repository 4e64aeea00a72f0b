//! Post URL normalization and validation.
//!
//! Accepts `/p/`, `/reel/` (and `/reels/`), `/tv/` and `/stories/<user>/<id>/`
//! paths on the page host, optionally prefixed by a username, with or
//! without scheme, query string, fragment or trailing slash. The canonical
//! form is always `https://www.instagram.com/<kind>/<id>/`, so normalizing
//! twice yields the same string.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::error::{ExtractError, Result};
use crate::types::source::{PostType, SourceUrl};

/// Canonical page host.
pub const PAGE_HOST: &str = "www.instagram.com";

lazy_static! {
    // An explicit scheme at the very start; "://" later on belongs to the query
    static ref SCHEME_PREFIX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap();

    static ref HOST_REGEX: Regex = Regex::new(r"^(?:www\.|m\.)?instagram\.com$").unwrap();

    // /p/<code>/, /reel/<code>/, /reels/<code>/, /tv/<code>/, optionally after /<username>/
    static ref POST_PATH_REGEX: Regex =
        Regex::new(r"^/(?:[A-Za-z0-9._]{1,30}/)?(p|reels?|tv)/([A-Za-z0-9_-]+)/?$").unwrap();

    // /stories/<username>/<numeric id>/
    static ref STORY_PATH_REGEX: Regex =
        Regex::new(r"^/stories/([A-Za-z0-9._]{1,30})/(\d+)/?$").unwrap();
}

/// Normalize and validate a raw post URL.
pub fn normalize(raw: &str) -> Result<SourceUrl> {
    let invalid = || ExtractError::InvalidSourceUrl {
        url: raw.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let with_scheme = if SCHEME_PREFIX.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let host = parsed.host_str().ok_or_else(invalid)?;
    if !HOST_REGEX.is_match(host) {
        return Err(invalid());
    }

    let path = parsed.path();

    if let Some(caps) = STORY_PATH_REGEX.captures(path) {
        let username = &caps[1];
        let story_id = &caps[2];
        let canonical = format!("https://{}/stories/{}/{}/", PAGE_HOST, username, story_id);
        return Ok(SourceUrl::new(canonical, PostType::Story, None));
    }

    if let Some(caps) = POST_PATH_REGEX.captures(path) {
        let (segment, post_type) = match &caps[1] {
            "p" => ("p", PostType::Post),
            "reel" | "reels" => ("reel", PostType::Reel),
            _ => ("tv", PostType::Igtv),
        };
        let shortcode = caps[2].to_string();
        let canonical = format!("https://{}/{}/{}/", PAGE_HOST, segment, shortcode);
        return Ok(SourceUrl::new(canonical, post_type, Some(shortcode)));
    }

    Err(invalid())
}

/// Whether `raw` would be accepted by [`normalize`].
pub fn is_valid(raw: &str) -> bool {
    normalize(raw).is_ok()
}
