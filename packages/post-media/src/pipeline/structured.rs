//! Harvesting media descriptors from parsed JSON documents.
//!
//! Handles the shapes the upstream serves: GraphQL `shortcode_media`
//! nodes, the `items[]` media API, oEmbed responses and JSON-LD
//! `VideoObject`/`ImageObject` entries. Carousel children are enumerated
//! in order.

use serde_json::Value;

use crate::types::media::RawCandidate;

/// Paths checked before falling back to a depth-first search.
const MEDIA_POINTERS: &[&str] = &[
    "/data/xdt_shortcode_media",
    "/data/shortcode_media",
    "/graphql/shortcode_media",
    "/entry_data/PostPage/0/graphql/shortcode_media",
    "/items/0",
];

/// Keys whose presence marks an object as a media descriptor.
const MEDIA_KEYS: &[&str] = &[
    "video_url",
    "display_url",
    "video_versions",
    "image_versions2",
    "carousel_media",
    "edge_sidecar_to_children",
];

/// Depth limit for the fallback search.
const MAX_DEPTH: usize = 12;

/// Everything one JSON document yielded.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Harvest {
    pub media: Vec<RawCandidate>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

impl Harvest {
    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
            && self.title.is_none()
            && self.description.is_none()
            && self.author.is_none()
    }
}

/// Harvest media and metadata from a parsed document.
pub fn harvest(doc: &Value) -> Harvest {
    if let Some(node) = find_media_node(doc) {
        return harvest_media_node(node);
    }

    if is_oembed(doc) {
        return harvest_oembed(doc);
    }

    harvest_json_ld(doc)
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn is_media_node(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| MEDIA_KEYS.iter().any(|k| obj.contains_key(*k)))
}

fn find_media_node(doc: &Value) -> Option<&Value> {
    MEDIA_POINTERS
        .iter()
        .filter_map(|p| doc.pointer(p))
        .find(|v| is_media_node(v))
        .or_else(|| search(doc, 0))
}

fn search(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    if is_media_node(value) {
        return Some(value);
    }
    match value {
        Value::Object(map) => map.values().find_map(|v| search(v, depth + 1)),
        Value::Array(items) => items.iter().find_map(|v| search(v, depth + 1)),
        _ => None,
    }
}

/// Widest entry of a `[{width, height, url}]` list.
fn widest(list: Option<&Value>) -> Option<(&str, Option<u32>, Option<u32>)> {
    list?
        .as_array()?
        .iter()
        .filter_map(|c| {
            let url = c.get("url")?.as_str()?;
            Some((url, u32_at(c, "/width"), u32_at(c, "/height")))
        })
        .max_by_key(|(_, w, _)| w.unwrap_or(0))
}

fn children(node: &Value) -> Vec<&Value> {
    if let Some(edges) = node
        .pointer("/edge_sidecar_to_children/edges")
        .and_then(Value::as_array)
    {
        return edges.iter().filter_map(|e| e.get("node")).collect();
    }
    node.get("carousel_media")
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Candidates for one (non-carousel) media item.
fn item_candidates(node: &Value) -> Vec<RawCandidate> {
    let image = str_at(node, "/display_url")
        .map(|u| (u, u32_at(node, "/dimensions/width"), u32_at(node, "/dimensions/height")))
        .or_else(|| widest(node.pointer("/image_versions2/candidates")));

    let thumbnail = str_at(node, "/thumbnail_src")
        .or(image.map(|(u, _, _)| u))
        .map(String::from);

    let video = str_at(node, "/video_url")
        .map(|u| (u, u32_at(node, "/dimensions/width"), u32_at(node, "/dimensions/height")))
        .or_else(|| widest(node.get("video_versions")));

    let fallback_width = u32_at(node, "/original_width");
    let fallback_height = u32_at(node, "/original_height");

    match video {
        Some((url, width, height)) => {
            let duration = node.get("video_duration").and_then(Value::as_f64);
            vec![RawCandidate::video(url)
                .with_dimensions(width.or(fallback_width), height.or(fallback_height))
                .with_duration(duration)
                .with_thumbnail(thumbnail)]
        }
        None => image
            .map(|(url, width, height)| {
                vec![RawCandidate::image(url)
                    .with_dimensions(width.or(fallback_width), height.or(fallback_height))]
            })
            .unwrap_or_default(),
    }
}

fn caption(node: &Value) -> Option<String> {
    str_at(node, "/edge_media_to_caption/edges/0/node/text")
        .or_else(|| str_at(node, "/caption/text"))
        .or_else(|| str_at(node, "/caption"))
        .map(String::from)
}

fn harvest_media_node(node: &Value) -> Harvest {
    let kids = children(node);
    let media = if kids.is_empty() {
        item_candidates(node)
    } else {
        kids.into_iter().flat_map(item_candidates).collect()
    };

    Harvest {
        media,
        title: str_at(node, "/title").map(String::from),
        description: caption(node),
        author: str_at(node, "/owner/username")
            .or_else(|| str_at(node, "/user/username"))
            .map(String::from),
    }
}

fn is_oembed(doc: &Value) -> bool {
    doc.get("thumbnail_url").is_some()
        && (doc.get("author_name").is_some() || doc.get("provider_name").is_some())
}

fn harvest_oembed(doc: &Value) -> Harvest {
    let media = str_at(doc, "/thumbnail_url")
        .map(|url| {
            vec![RawCandidate::image(url).with_dimensions(
                u32_at(doc, "/thumbnail_width"),
                u32_at(doc, "/thumbnail_height"),
            )]
        })
        .unwrap_or_default();

    Harvest {
        media,
        title: str_at(doc, "/title").map(String::from),
        description: None,
        author: str_at(doc, "/author_name").map(String::from),
    }
}

fn collect_ld_objects<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a Value>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if matches!(
                map.get("@type").and_then(Value::as_str),
                Some("VideoObject" | "ImageObject")
            ) {
                out.push(value);
            }
            for v in map.values() {
                collect_ld_objects(v, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_ld_objects(v, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn harvest_json_ld(doc: &Value) -> Harvest {
    let mut objects = Vec::new();
    collect_ld_objects(doc, 0, &mut objects);

    let media = objects
        .iter()
        .filter_map(|obj| {
            let url = str_at(obj, "/contentUrl")?;
            let width = u32_at(obj, "/width");
            let height = u32_at(obj, "/height");
            let candidate = match str_at(obj, "/@type") {
                Some("VideoObject") => RawCandidate::video(url)
                    .with_thumbnail(str_at(obj, "/thumbnailUrl").map(String::from)),
                _ => RawCandidate::image(url),
            };
            Some(candidate.with_dimensions(width, height))
        })
        .collect();

    let author = str_at(doc, "/author/alternateName")
        .or_else(|| str_at(doc, "/author/name"))
        .map(|a| a.trim_start_matches('@').to_string());

    Harvest {
        media,
        title: str_at(doc, "/headline")
            .or_else(|| str_at(doc, "/name"))
            .map(String::from),
        description: str_at(doc, "/articleBody")
            .or_else(|| str_at(doc, "/caption"))
            .or_else(|| str_at(doc, "/description"))
            .map(String::from),
        author,
    }
}
