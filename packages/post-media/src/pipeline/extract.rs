//! Pattern extractor: runs the ordered rule table over a raw payload.
//!
//! Media rules of a lower tier are skipped once a more trusted tier has
//! produced candidates (see [`RuleTier::skipped_after`]). Text rules always
//! run, and the first match for each text field wins.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::pipeline::clean::unescape;
use crate::pipeline::patterns::{default_rules, ExtractionRule, RuleTier, Target};
use crate::pipeline::structured::harvest;
use crate::types::media::RawCandidate;
use crate::types::result::UNKNOWN_AUTHOR;
use crate::types::source::PostType;

lazy_static! {
    // "1,234 likes, 56 comments - someuser on March 3, 2024: ..."
    static ref LIKES_COMMENTS_AUTHOR: Regex = Regex::new(
        r"^\s*[\d.,]+[KkMm]?\s+likes?,\s*[\d.,]+[KkMm]?\s+comments?\s*-\s*([A-Za-z0-9._]+)\s+on\s+"
    ).unwrap();

    // "someuser: caption text"
    static ref COLON_AUTHOR: Regex = Regex::new(r"^\s*([A-Za-z0-9._]+):\s").unwrap();

    // "Full Name (@someuser) on Instagram: ..."
    static ref HANDLE_ON_PLATFORM: Regex =
        Regex::new(r"@([A-Za-z0-9._]+)\)?\s+on\s+[A-Za-z]+\s*:").unwrap();
}

/// Fields pulled from one payload, before URL cleaning.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub title: String,
    pub description: String,
    pub author: String,
    pub media: Vec<RawCandidate>,
    /// Names of the rules that contributed, in rule order
    pub matched_rules: Vec<&'static str>,
}

/// Derive an author handle from caption phrasings. First phrasing wins.
pub fn derive_author(text: &str) -> Option<String> {
    [&*LIKES_COMMENTS_AUTHOR, &*COLON_AUTHOR, &*HANDLE_ON_PLATFORM]
        .iter()
        .find_map(|re| re.captures(text).map(|caps| caps[1].to_string()))
}

fn clean_text(raw: &str) -> Option<String> {
    let text = unescape(raw);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Applies an ordered list of [`ExtractionRule`]s to payloads.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    rules: Vec<ExtractionRule>,
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Use a custom rule list (order is priority).
    pub fn with_rules(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Extract raw candidates and metadata from `payload`.
    pub fn extract(&self, payload: &str, post_type: PostType) -> Extracted {
        let mut title = None;
        let mut description = None;
        let mut author = None;
        let mut media = Vec::new();
        let mut matched_rules = Vec::new();
        let mut best_tier: Option<RuleTier> = None;

        for rule in &self.rules {
            if rule.target.is_media() {
                if let Some(producer) = best_tier {
                    if rule.tier.skipped_after(producer) {
                        continue;
                    }
                }
            }

            let captures = rule.captures(payload);
            if captures.is_empty() {
                continue;
            }

            let before = media.len();
            let mut contributed = false;

            match rule.target {
                Target::Document => {
                    for text in captures {
                        let Ok(doc) = serde_json::from_str::<Value>(text) else {
                            continue;
                        };
                        let found = harvest(&doc);
                        if found.is_empty() {
                            continue;
                        }
                        contributed = true;
                        fill(&mut title, found.title);
                        fill(&mut description, found.description);
                        fill(&mut author, found.author);
                        media.extend(found.media);
                    }
                }
                Target::Video => {
                    media.extend(captures.into_iter().map(RawCandidate::video));
                }
                Target::Image => {
                    media.extend(captures.into_iter().map(RawCandidate::image));
                }
                Target::Title => {
                    contributed = title.is_none();
                    fill(&mut title, clean_text(captures[0]));
                }
                Target::Description => {
                    contributed = description.is_none();
                    fill(&mut description, clean_text(captures[0]));
                }
                Target::Author => {
                    contributed = author.is_none();
                    fill(&mut author, clean_text(captures[0]));
                }
            }

            if media.len() > before {
                contributed = true;
                best_tier = Some(best_tier.map_or(rule.tier, |t| t.min(rule.tier)));
            }

            if contributed {
                tracing::debug!(
                    rule = rule.name,
                    candidates = media.len() - before,
                    "Extraction rule matched"
                );
                matched_rules.push(rule.name);
            }
        }

        if author.is_none() {
            author = description
                .as_deref()
                .and_then(derive_author)
                .or_else(|| title.as_deref().and_then(derive_author));
        }

        Extracted {
            title: title.unwrap_or_else(|| post_type.default_title().to_string()),
            description: description.unwrap_or_default(),
            author: author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            media,
            matched_rules,
        }
    }
}
