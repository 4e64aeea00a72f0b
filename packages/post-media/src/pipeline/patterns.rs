//! Declarative extraction rules.
//!
//! Each rule is a (pattern, target, tier) triple. Rules run in list order;
//! the first capture group of every match is the raw value. `Document`
//! rules capture a JSON text that is parsed and walked by
//! [`crate::pipeline::structured`].

use lazy_static::lazy_static;
use regex::Regex;

/// What a rule's capture populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A JSON document yielding media and metadata
    Document,
    Video,
    Image,
    Title,
    Description,
    Author,
}

impl Target {
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Document | Self::Video | Self::Image)
    }
}

/// Confidence tier of a rule, most trusted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleTier {
    /// Parsed JSON documents
    Structured,
    /// JSON key patterns matched in raw text
    Embedded,
    /// Open-graph and meta tags
    Meta,
    /// Bare CDN URLs anywhere in the text
    Loose,
}

impl RuleTier {
    /// Whether media produced by a `producer`-tier rule makes media rules
    /// of this tier redundant.
    pub fn skipped_after(&self, producer: RuleTier) -> bool {
        matches!(
            (producer, self),
            (RuleTier::Structured, RuleTier::Embedded | RuleTier::Loose)
                | (RuleTier::Embedded, RuleTier::Loose)
                | (RuleTier::Meta, RuleTier::Loose)
        )
    }
}

/// One extraction rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub tier: RuleTier,
    pub target: Target,
    pub pattern: &'static Regex,
}

impl ExtractionRule {
    pub const fn new(
        name: &'static str,
        tier: RuleTier,
        target: Target,
        pattern: &'static Regex,
    ) -> Self {
        Self {
            name,
            tier,
            target,
            pattern,
        }
    }

    /// The value of every match of this rule in `payload`: the first
    /// capture group that took part in the match. Quoted attributes use one
    /// group per quote style, since the closing quote must match the opening
    /// one.
    pub fn captures<'p>(&self, payload: &'p str) -> Vec<&'p str> {
        self.pattern
            .captures_iter(payload)
            .filter_map(|caps| caps.iter().skip(1).flatten().next())
            .map(|m| m.as_str())
            .filter(|s| !s.trim().is_empty())
            .collect()
    }
}

// A JSON string value that is a URL, tolerating \/ and \uXXXX escapes at
// any nesting depth.
macro_rules! json_url {
    () => {
        r#"(https?:(?:[^"\\\s]|\\+/|\\+u[0-9a-fA-F]{4})+)"#
    };
}

lazy_static! {
    static ref WHOLE_JSON: Regex = Regex::new(r"(?s)\A\s*(\{.*\})\s*\z").unwrap();

    static ref SCRIPT_JSON: Regex = Regex::new(
        r#"(?is)<script[^>]*type=["']application/(?:ld\+)?json["'][^>]*>\s*(\{.*?\})\s*</script>"#
    ).unwrap();

    static ref SHARED_DATA: Regex = Regex::new(
        r"(?s)window\._sharedData\s*=\s*(\{.*?\})\s*;\s*</script>"
    ).unwrap();

    static ref ADDITIONAL_DATA: Regex = Regex::new(
        r"(?s)window\.__additionalDataLoaded\(\s*[^,]*,\s*(\{.*?\})\s*\)\s*;\s*</script>"
    ).unwrap();

    static ref KEY_VIDEO_URL: Regex = Regex::new(
        concat!(r#"\\*"video_url\\*"\s*:\s*\\*""#, json_url!())
    ).unwrap();

    static ref KEY_VIDEO_VERSIONS: Regex = Regex::new(
        concat!(r#"\\*"video_versions\\*"\s*:\s*\[\s*\{[^\]]*?\\*"url\\*"\s*:\s*\\*""#, json_url!())
    ).unwrap();

    static ref KEY_DISPLAY_URL: Regex = Regex::new(
        concat!(r#"\\*"display_url\\*"\s*:\s*\\*""#, json_url!())
    ).unwrap();

    static ref KEY_IMAGE_CANDIDATES: Regex = Regex::new(
        concat!(
            r#"\\*"image_versions2\\*"\s*:\s*\{\s*\\*"candidates\\*"\s*:\s*\[\s*\{[^\]]*?\\*"url\\*"\s*:\s*\\*""#,
            json_url!()
        )
    ).unwrap();

    static ref KEY_OWNER: Regex = Regex::new(
        r#"\\*"owner\\*"\s*:\s*\{[^{}]*?\\*"username\\*"\s*:\s*\\*"([A-Za-z0-9._]+)"#
    ).unwrap();

    static ref KEY_CAPTION: Regex = Regex::new(
        r#"(?s)\\*"edge_media_to_caption\\*"\s*:\s*\{\s*\\*"edges\\*"\s*:\s*\[\s*\{\s*\\*"node\\*"\s*:\s*\{\s*\\*"text\\*"\s*:\s*\\*"((?:[^"\\]|\\.)*)"#
    ).unwrap();

    static ref OG_VIDEO: Regex = Regex::new(
        r#"(?i)<meta[^>]+property=["']og:video(?::secure_url|:url)?["'][^>]*content=(?:"([^"]+)"|'([^']+)')"#
    ).unwrap();

    static ref OG_VIDEO_REVERSED: Regex = Regex::new(
        r#"(?i)<meta[^>]+content=(?:"([^"]+)"|'([^']+)')[^>]*property=["']og:video(?::secure_url|:url)?["']"#
    ).unwrap();

    static ref OG_IMAGE: Regex = Regex::new(
        r#"(?i)<meta[^>]+property=["']og:image(?::secure_url|:url)?["'][^>]*content=(?:"([^"]+)"|'([^']+)')"#
    ).unwrap();

    static ref OG_IMAGE_REVERSED: Regex = Regex::new(
        r#"(?i)<meta[^>]+content=(?:"([^"]+)"|'([^']+)')[^>]*property=["']og:image(?::secure_url|:url)?["']"#
    ).unwrap();

    static ref OG_TITLE: Regex = Regex::new(
        r#"(?i)<meta[^>]+property=["']og:title["'][^>]*content=(?:"([^"]*)"|'([^']*)')"#
    ).unwrap();

    static ref OG_DESCRIPTION: Regex = Regex::new(
        r#"(?i)<meta[^>]+property=["']og:description["'][^>]*content=(?:"([^"]*)"|'([^']*)')"#
    ).unwrap();

    static ref META_DESCRIPTION: Regex = Regex::new(
        r#"(?i)<meta[^>]+name=["']description["'][^>]*content=(?:"([^"]*)"|'([^']*)')"#
    ).unwrap();

    static ref TITLE_TAG: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();

    static ref LOOSE_VIDEO: Regex = Regex::new(
        r"(https:(?:\\*/){2}(?:[^\s<>\x22'\\]|\\+/|\\+u[0-9a-fA-F]{4})+?\.mp4(?:[^\s<>\x22'\\]|\\+u[0-9a-fA-F]{4})*)"
    ).unwrap();

    static ref LOOSE_IMAGE: Regex = Regex::new(
        r"(https:(?:\\*/){2}(?:[^\s<>\x22'\\]|\\+/|\\+u[0-9a-fA-F]{4})+?\.(?:jpe?g|webp|png|heic)(?:[^\s<>\x22'\\]|\\+u[0-9a-fA-F]{4})*)"
    ).unwrap();
}

/// The built-in rule list, in priority order.
pub fn default_rules() -> Vec<ExtractionRule> {
    use RuleTier::*;
    use Target::*;

    vec![
        ExtractionRule::new("json_document", Structured, Document, &WHOLE_JSON),
        ExtractionRule::new("script_json", Structured, Document, &SCRIPT_JSON),
        ExtractionRule::new("shared_data", Structured, Document, &SHARED_DATA),
        ExtractionRule::new("additional_data", Structured, Document, &ADDITIONAL_DATA),
        ExtractionRule::new("key_video_url", Embedded, Video, &KEY_VIDEO_URL),
        ExtractionRule::new("key_video_versions", Embedded, Video, &KEY_VIDEO_VERSIONS),
        ExtractionRule::new("key_display_url", Embedded, Image, &KEY_DISPLAY_URL),
        ExtractionRule::new("key_image_candidates", Embedded, Image, &KEY_IMAGE_CANDIDATES),
        ExtractionRule::new("key_owner", Embedded, Author, &KEY_OWNER),
        ExtractionRule::new("key_caption", Embedded, Description, &KEY_CAPTION),
        ExtractionRule::new("og_video", Meta, Video, &OG_VIDEO),
        ExtractionRule::new("og_video_reversed", Meta, Video, &OG_VIDEO_REVERSED),
        ExtractionRule::new("og_image", Meta, Image, &OG_IMAGE),
        ExtractionRule::new("og_image_reversed", Meta, Image, &OG_IMAGE_REVERSED),
        ExtractionRule::new("og_title", Meta, Title, &OG_TITLE),
        ExtractionRule::new("og_description", Meta, Description, &OG_DESCRIPTION),
        ExtractionRule::new("meta_description", Meta, Description, &META_DESCRIPTION),
        ExtractionRule::new("title_tag", Meta, Title, &TITLE_TAG),
        ExtractionRule::new("loose_video", Loose, Video, &LOOSE_VIDEO),
        ExtractionRule::new("loose_image", Loose, Image, &LOOSE_IMAGE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> ExtractionRule {
        default_rules()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no rule {}", name))
    }

    #[test]
    fn test_rules_are_ordered_by_tier() {
        let tiers: Vec<RuleTier> = default_rules().iter().map(|r| r.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
    }

    #[test]
    fn test_skip_matrix() {
        assert!(RuleTier::Loose.skipped_after(RuleTier::Structured));
        assert!(RuleTier::Embedded.skipped_after(RuleTier::Structured));
        assert!(RuleTier::Loose.skipped_after(RuleTier::Meta));
        assert!(!RuleTier::Meta.skipped_after(RuleTier::Structured));
        assert!(!RuleTier::Structured.skipped_after(RuleTier::Structured));
    }

    #[test]
    fn test_whole_json_only_matches_pure_documents() {
        let r = rule("json_document");
        assert_eq!(r.captures(" {\"a\": 1}\n").len(), 1);
        assert!(r.captures("<html>{\"a\": 1}</html>").is_empty());
    }

    #[test]
    fn test_script_json() {
        let html = r#"<script type="application/ld+json">{"@type":"VideoObject"}</script>"#;
        assert_eq!(rule("script_json").captures(html), vec![r#"{"@type":"VideoObject"}"#]);
    }

    #[test]
    fn test_shared_data() {
        let html = r#"<script>window._sharedData = {"entry_data":{}};</script>"#;
        assert_eq!(rule("shared_data").captures(html), vec![r#"{"entry_data":{}}"#]);
    }

    #[test]
    fn test_key_video_url_plain_and_escaped() {
        let r = rule("key_video_url");
        assert_eq!(
            r.captures(r#""video_url":"https:\/\/cdn.example\/v.mp4?a=1&b=2","x":1"#),
            vec![r"https:\/\/cdn.example\/v.mp4?a=1&b=2"]
        );
        assert_eq!(
            r.captures(r#"{\"video_url\":\"https:\\/\\/cdn.example\\/v.mp4\"}"#),
            vec![r"https:\\/\\/cdn.example\\/v.mp4"]
        );
    }

    #[test]
    fn test_key_video_versions() {
        let text = r#""video_versions":[{"type":101,"width":720,"url":"https://cdn.example/v.mp4"}]"#;
        assert_eq!(rule("key_video_versions").captures(text), vec!["https://cdn.example/v.mp4"]);
    }

    #[test]
    fn test_key_owner_and_caption() {
        let text = r#""owner":{"id":"1","username":"natgeo"},"edge_media_to_caption":{"edges":[{"node":{"text":"Hello \"world\""}}]}"#;
        assert_eq!(rule("key_owner").captures(text), vec!["natgeo"]);
        assert_eq!(rule("key_caption").captures(text), vec![r#"Hello \"world\""#]);
    }

    #[test]
    fn test_og_tags_both_attribute_orders() {
        let html = r#"
            <meta property="og:video" content="https://cdn.example/v_hd.mp4">
            <meta content="https://cdn.example/thumb.jpg" property="og:image" />
            <meta property="og:title" content="A title">
        "#;
        assert_eq!(rule("og_video").captures(html), vec!["https://cdn.example/v_hd.mp4"]);
        assert_eq!(rule("og_image_reversed").captures(html), vec!["https://cdn.example/thumb.jpg"]);
        assert!(rule("og_image").captures(html).is_empty());
        assert_eq!(rule("og_title").captures(html), vec!["A title"]);
    }

    #[test]
    fn test_quoted_content_keeps_other_quote_style() {
        let html = r#"
            <meta property="og:description" content="12 likes - someone: It's a sunny day">
            <meta property='og:title' content='Say "cheese"'>
            <meta content="https://cdn.example/it's.jpg" property="og:image">
        "#;
        assert_eq!(
            rule("og_description").captures(html),
            vec!["12 likes - someone: It's a sunny day"]
        );
        assert_eq!(rule("og_title").captures(html), vec![r#"Say "cheese""#]);
        assert_eq!(
            rule("og_image_reversed").captures(html),
            vec!["https://cdn.example/it's.jpg"]
        );
    }

    #[test]
    fn test_loose_patterns() {
        let text = r#"src=https:\/\/cdn.example\/a\/clip.mp4?oe=1 and "https://cdn.example/pic.jpg" "#;
        assert_eq!(
            rule("loose_video").captures(text),
            vec![r"https:\/\/cdn.example\/a\/clip.mp4?oe=1"]
        );
        assert_eq!(rule("loose_image").captures(text), vec!["https://cdn.example/pic.jpg"]);
    }
}
