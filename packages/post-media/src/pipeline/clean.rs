//! Candidate URL cleaning, validation and deduplication.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;
use url::Url;

use crate::types::config::ExtractorConfig;
use crate::types::media::{MediaKind, RawCandidate};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "gif", "avif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "m3u8", "mpd"];

/// Host labels that mark a CDN host even outside the configured suffixes.
const CDN_LABEL_PREFIXES: &[&str] = &["cdn", "scontent"];

lazy_static! {
    // One or more backslashes before a slash: \/ and \\/ both become /
    static ref ESCAPED_SLASH: Regex = Regex::new(r"\\+/").unwrap();

    static ref ESCAPED_QUOTE: Regex = Regex::new(r#"\\+""#).unwrap();

    // A \uXXXX escape, optionally followed by a low surrogate escape that
    // completes a pair
    static ref UNICODE_ESCAPE: Regex =
        Regex::new(r"\\+u([0-9a-fA-F]{4})(?:\\+u([dD][c-fC-F][0-9a-fA-F]{2}))?").unwrap();

    static ref NUMERIC_ENTITY: Regex =
        Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").unwrap();
}

const HIGH_SURROGATES: std::ops::Range<u32> = 0xD800..0xDC00;
const LOW_SURROGATES: std::ops::Range<u32> = 0xDC00..0xE000;

/// Lone surrogates and other invalid code points become U+FFFD.
fn decode_unit(unit: u32) -> char {
    char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn decode_unicode_escape(caps: &Captures) -> String {
    let hex = |i: usize| caps.get(i).and_then(|m| u32::from_str_radix(m.as_str(), 16).ok());
    let Some(first) = hex(1) else {
        return caps[0].to_string();
    };

    match hex(2) {
        Some(second) if HIGH_SURROGATES.contains(&first) && LOW_SURROGATES.contains(&second) => {
            let code = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
            decode_unit(code).to_string()
        }
        Some(second) => [decode_unit(first), decode_unit(second)].iter().collect(),
        None => decode_unit(first).to_string(),
    }
}

fn decode_numeric_entity(caps: &Captures) -> String {
    let code = match (caps.get(1), caps.get(2)) {
        (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
        (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
        (None, None) => None,
    };
    match code.and_then(char::from_u32) {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    }
}

/// Undo JSON and HTML escaping found in scraped values.
///
/// Handles `\uXXXX` (including `\u0026` and surrogate pairs), `\/`, `\"`,
/// repeated backslashes from double-encoded JSON, numeric character
/// references and the common named HTML entities.
pub fn unescape(raw: &str) -> String {
    let mut text = raw.to_string();

    // Double-encoded payloads need more than one pass
    for _ in 0..3 {
        let next = UNICODE_ESCAPE
            .replace_all(&text, decode_unicode_escape)
            .to_string();
        let next = ESCAPED_SLASH.replace_all(&next, "/").to_string();
        let next = ESCAPED_QUOTE.replace_all(&next, "\"").to_string();
        let next = next
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        let next = NUMERIC_ENTITY
            .replace_all(&next, decode_numeric_entity)
            .to_string();

        if next == text {
            break;
        }
        text = next;
    }

    text
}

/// Lowercased extension of the last path segment, if any.
pub(crate) fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Cleans raw candidates into validated, deduplicated ones.
#[derive(Debug, Clone)]
pub struct UrlCleaner {
    cdn_hosts: Vec<String>,
    keep_query_params: Vec<String>,
}

impl UrlCleaner {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            cdn_hosts: config
                .cdn_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            keep_query_params: config.keep_query_params.clone(),
        }
    }

    /// Unescape, trim and strip a URL down to its essential query params.
    ///
    /// Returns `None` for anything that is not an absolute https URL.
    pub fn clean_url(&self, raw: &str) -> Option<Url> {
        let unescaped = unescape(raw);
        let trimmed = unescaped
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '\\');

        let mut url = Url::parse(trimmed).ok()?;
        if url.scheme() != "https" {
            return None;
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| self.keep_query_params.iter().any(|p| p == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        url.set_fragment(None);

        Some(url)
    }

    /// Whether the host belongs to the media CDN host space.
    pub fn is_cdn_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        let suffix_match = self
            .cdn_hosts
            .iter()
            .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)));

        suffix_match
            || host.split('.').any(|label| {
                CDN_LABEL_PREFIXES
                    .iter()
                    .any(|prefix| label.starts_with(prefix))
            })
    }

    /// Whether the URL's file type is consistent with the claimed kind.
    ///
    /// URLs without an extension are accepted for either kind.
    pub fn matches_kind(url: &Url, kind: MediaKind) -> bool {
        match path_extension(url) {
            Some(ext) => match kind {
                MediaKind::Video => !IMAGE_EXTENSIONS.contains(&ext.as_str()),
                MediaKind::Image => !VIDEO_EXTENSIONS.contains(&ext.as_str()),
            },
            None => true,
        }
    }

    /// Clean and validate a single candidate.
    pub fn clean(&self, raw: &RawCandidate) -> Option<RawCandidate> {
        let url = self.clean_url(&raw.url)?;
        let host = url.host_str()?;

        if !self.is_cdn_host(host) || !Self::matches_kind(&url, raw.kind) {
            tracing::debug!(url = %url, kind = ?raw.kind, "Discarding invalid candidate");
            return None;
        }

        let thumbnail = raw
            .thumbnail
            .as_deref()
            .and_then(|t| self.clean_url(t))
            .map(|t| t.to_string());

        Some(RawCandidate {
            url: url.to_string(),
            thumbnail,
            ..raw.clone()
        })
    }

    /// Clean every candidate, dropping invalid ones and collapsing
    /// duplicates onto the first occurrence.
    ///
    /// A later duplicate only fills in fields the first one lacked.
    pub fn clean_all(&self, raws: &[RawCandidate]) -> Vec<RawCandidate> {
        let mut cleaned: Vec<RawCandidate> = Vec::with_capacity(raws.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for raw in raws {
            let Some(candidate) = self.clean(raw) else {
                continue;
            };

            match seen.get(&candidate.url) {
                Some(&index) => {
                    let existing = &mut cleaned[index];
                    existing.width = existing.width.or(candidate.width);
                    existing.height = existing.height.or(candidate.height);
                    existing.duration = existing.duration.or(candidate.duration);
                    if existing.thumbnail.is_none() {
                        existing.thumbnail = candidate.thumbnail;
                    }
                }
                None => {
                    seen.insert(candidate.url.clone(), cleaned.len());
                    cleaned.push(candidate);
                }
            }
        }

        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> UrlCleaner {
        UrlCleaner::new(&ExtractorConfig::default())
    }

    #[test]
    fn test_unescape_variants() {
        assert_eq!(
            unescape(r"https:\/\/cdn.example\/v.mp4?a=1\u0026b=2"),
            "https://cdn.example/v.mp4?a=1&b=2"
        );
        assert_eq!(
            unescape(r"https:\\\/\\\/cdn.example\\\/v.mp4"),
            "https://cdn.example/v.mp4"
        );
        assert_eq!(unescape("a &amp; b &quot;c&quot;"), "a & b \"c\"");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
        assert_eq!(unescape(r"caf\u00e9"), "café");
    }

    #[test]
    fn test_unescape_surrogate_pairs() {
        assert_eq!(
            unescape(r"Sunset \ud83c\udf05 tonight"),
            "Sunset \u{1F305} tonight"
        );
        assert_eq!(unescape(r"double \\ud83d\\ude00"), "double \u{1F600}");
        // adjacent escapes that are not a pair decode independently
        assert_eq!(unescape(r"\u0041\u0026"), "A&");
        assert_eq!(unescape(r"\u0041\ud83c\udf05"), "A\u{1F305}");
        assert_eq!(unescape(r"lone \ud83c here"), "lone \u{FFFD} here");
        assert_eq!(unescape(r"swapped \udf05\ud83c"), "swapped \u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_unescape_numeric_entities() {
        assert_eq!(unescape("It&#039;s"), "It's");
        assert_eq!(unescape("It&#x27;s &#38; more"), "It's & more");
        assert_eq!(unescape("&#X1F305;"), "\u{1F305}");
        assert_eq!(unescape("&#8220;quoted&#8221;"), "\u{201C}quoted\u{201D}");
        // out of range references are left alone
        assert_eq!(unescape("&#x110000;"), "&#x110000;");
    }

    #[test]
    fn test_strips_non_essential_query_params() {
        let url = cleaner()
            .clean_url("https://scontent.cdninstagram.com/v/t51/x.mp4?_nc_ht=abc&utm_source=ig&oe=65F&efg=zz")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://scontent.cdninstagram.com/v/t51/x.mp4?_nc_ht=abc&oe=65F&efg=zz"
        );
    }

    #[test]
    fn test_drops_empty_query() {
        let url = cleaner()
            .clean_url("https://cdn.example/v_hd.mp4?utm=1&ref=2")
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.example/v_hd.mp4");
    }

    #[test]
    fn test_rejects_insecure_and_foreign_hosts() {
        let c = cleaner();
        assert!(c.clean(&RawCandidate::video("http://cdn.example/v.mp4")).is_none());
        assert!(c
            .clean(&RawCandidate::image("https://www.instagram.com/static/logo.png"))
            .is_none());
        assert!(c.clean(&RawCandidate::image("https://example.com/a.jpg")).is_none());
        assert!(c.clean(&RawCandidate::image("not a url")).is_none());
    }

    #[test]
    fn test_cdn_host_space() {
        let c = cleaner();
        assert!(c.is_cdn_host("instagram.fxyz1-1.fna.fbcdn.net"));
        assert!(c.is_cdn_host("scontent-lhr8-1.cdninstagram.com"));
        assert!(c.is_cdn_host("cdn.example"));
        assert!(!c.is_cdn_host("www.instagram.com"));
        assert!(!c.is_cdn_host("evilfbcdn.net"));
    }

    #[test]
    fn test_kind_must_match_extension() {
        let c = cleaner();
        assert!(c.clean(&RawCandidate::video("https://cdn.example/thumb.jpg")).is_none());
        assert!(c.clean(&RawCandidate::image("https://cdn.example/clip.mp4")).is_none());
        assert!(c.clean(&RawCandidate::video("https://cdn.example/stream")).is_some());
    }

    #[test]
    fn test_dedup_escaped_and_plain_occurrences() {
        let raws = vec![
            RawCandidate::video(r"https:\/\/cdn.example\/v.mp4?oe=1\u0026utm=x"),
            RawCandidate::video("https://cdn.example/v.mp4?oe=1")
                .with_dimensions(Some(720), Some(1280)),
        ];

        let cleaned = cleaner().clean_all(&raws);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].url, "https://cdn.example/v.mp4?oe=1");
        // first occurrence wins, later one fills gaps
        assert_eq!(cleaned[0].width, Some(720));
    }

    #[test]
    fn test_thumbnail_reference_is_cleaned() {
        let raw = RawCandidate::video("https://cdn.example/v.mp4")
            .with_thumbnail(Some(r"https:\/\/cdn.example\/v.jpg?utm=1".to_string()));
        let cleaned = cleaner().clean(&raw).unwrap();
        assert_eq!(cleaned.thumbnail.as_deref(), Some("https://cdn.example/v.jpg"));
    }
}
