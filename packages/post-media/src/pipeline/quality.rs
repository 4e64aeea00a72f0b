//! Quality classification and final media ordering.
//!
//! Quality comes only from tokens embedded in the URL. Without a marker,
//! videos default to hd and images to standard.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::pipeline::clean::path_extension;
use crate::types::media::{MediaCandidate, MediaKind, Quality, RawCandidate};

/// Minimum width treated as high definition in `s1080x1080`-style markers.
const HD_MIN_WIDTH: u32 = 720;

/// Stem suffixes that mark an image as a video's thumbnail.
const THUMBNAIL_SUFFIXES: &[&str] = &[
    "_thumb",
    "-thumb",
    ".thumb",
    "_thumbnail",
    "-thumbnail",
    "_poster",
    "-poster",
    "_cover",
    "-cover",
];

lazy_static! {
    // s1080x1080, p720x720, 1080x1920 style resolution markers
    static ref RESOLUTION_MARKER: Regex =
        Regex::new(r"(?:^|[^a-z0-9])[sp]?(\d{3,4})x(\d{3,4})(?:[^a-z0-9]|$)").unwrap();

    static ref HD_MARKER: Regex =
        Regex::new(r"(?:^|[^a-z0-9])(?:hd|uhd|fhd|4k|720p|1080p|1440p|2160p)(?:[^a-z0-9]|$)").unwrap();

    static ref LOW_MARKER: Regex =
        Regex::new(r"(?:^|[^a-z0-9])(?:sd|lq|240p|360p|480p|540p)(?:[^a-z0-9]|$)").unwrap();
}

/// Infer the quality of a cleaned candidate from its URL.
pub fn infer_quality(candidate: &RawCandidate) -> Quality {
    if candidate.derived {
        return Quality::Unknown;
    }

    // Only look past the host so hostnames never match tokens
    let haystack = match Url::parse(&candidate.url) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or("")).to_ascii_lowercase(),
        Err(_) => candidate.url.to_ascii_lowercase(),
    };

    if let Some(caps) = RESOLUTION_MARKER.captures(&haystack) {
        if let Ok(width) = caps[1].parse::<u32>() {
            return if width >= HD_MIN_WIDTH {
                Quality::Hd
            } else {
                Quality::Standard
            };
        }
    }

    if HD_MARKER.is_match(&haystack) {
        return Quality::Hd;
    }

    if LOW_MARKER.is_match(&haystack) {
        return Quality::Standard;
    }

    match candidate.kind {
        MediaKind::Video => Quality::Hd,
        MediaKind::Image => Quality::Standard,
    }
}

/// Attach quality to a cleaned candidate.
pub fn classify(candidate: RawCandidate) -> MediaCandidate {
    let quality = infer_quality(&candidate);
    MediaCandidate {
        kind: candidate.kind,
        url: candidate.url,
        quality,
        width: candidate.width,
        height: candidate.height,
        duration: candidate.duration,
        thumbnail: candidate.thumbnail,
    }
}

/// Directory and extension-less file stem of a URL path.
fn base_path(url: &Url) -> Option<(String, String)> {
    let path = url.path();
    let (dir, file) = path.rsplit_once('/')?;
    let stem = match path_extension(url) {
        Some(ext) => file.strip_suffix(&format!(".{}", ext)).unwrap_or(file),
        None => file,
    };
    Some((format!("{}{}", url.host_str().unwrap_or(""), dir), stem.to_string()))
}

/// Whether `image` is a thumbnail of `video`: the video names it as its
/// thumbnail, or both share a base path and differ only by a thumbnail
/// suffix (or extension).
pub fn is_thumbnail_of(image: &MediaCandidate, video: &MediaCandidate) -> bool {
    if video.thumbnail.as_deref() == Some(image.url.as_str()) {
        return true;
    }

    let (Ok(image_url), Ok(video_url)) = (Url::parse(&image.url), Url::parse(&video.url)) else {
        return false;
    };
    let (Some((image_dir, image_stem)), Some((video_dir, video_stem))) =
        (base_path(&image_url), base_path(&video_url))
    else {
        return false;
    };

    if image_dir != video_dir || video_stem.is_empty() {
        return false;
    }

    image_stem == video_stem
        || THUMBNAIL_SUFFIXES
            .iter()
            .any(|suffix| image_stem.strip_suffix(suffix) == Some(video_stem.as_str()))
}

/// Order candidates (videos first, then hd before standard before
/// unknown, first-seen order within ties) and drop video thumbnails.
///
/// Derived videos (quality unknown) never remove an image: the image is
/// the only confirmed asset.
pub fn order_media(mut media: Vec<MediaCandidate>) -> Vec<MediaCandidate> {
    // sort_by_key is stable, which keeps first-seen order within ties
    media.sort_by_key(|m| (m.kind.rank(), m.quality.rank()));

    let videos: Vec<MediaCandidate> = media
        .iter()
        .filter(|m| m.is_video() && m.quality != Quality::Unknown)
        .cloned()
        .collect();
    if videos.is_empty() {
        return media;
    }

    media
        .into_iter()
        .filter(|m| m.is_video() || !videos.iter().any(|v| is_thumbnail_of(m, v)))
        .collect()
}

/// Classify and order cleaned candidates.
pub fn finalize(cleaned: Vec<RawCandidate>) -> Vec<MediaCandidate> {
    order_media(cleaned.into_iter().map(classify).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_quality(url: &str) -> Quality {
        infer_quality(&RawCandidate::video(url))
    }

    fn image_quality(url: &str) -> Quality {
        infer_quality(&RawCandidate::image(url))
    }

    #[test]
    fn test_defaults_by_kind() {
        assert_eq!(video_quality("https://cdn.example/clip.mp4"), Quality::Hd);
        assert_eq!(image_quality("https://cdn.example/thumb.jpg"), Quality::Standard);
    }

    #[test]
    fn test_url_markers() {
        assert_eq!(video_quality("https://cdn.example/v_hd.mp4"), Quality::Hd);
        assert_eq!(image_quality("https://cdn.example/a/s1080x1080/p.jpg"), Quality::Hd);
        assert_eq!(image_quality("https://cdn.example/a/s320x320/p.jpg"), Quality::Standard);
        assert_eq!(image_quality("https://cdn.example/photo_1080p.jpg"), Quality::Hd);
        assert_eq!(video_quality("https://cdn.example/clip_480p.mp4"), Quality::Standard);
        assert_eq!(video_quality("https://cdn.example/p640x640/clip.mp4"), Quality::Standard);
        // "hd" inside a word is not a marker
        assert_eq!(image_quality("https://cdn.example/shdw.jpg"), Quality::Standard);
        // host names never count
        assert_eq!(image_quality("https://hd.cdn.example/a.jpg"), Quality::Standard);
    }

    #[test]
    fn test_derived_is_unknown() {
        let derived = RawCandidate::video("https://cdn.example/v_hd.mp4").derived();
        assert_eq!(infer_quality(&derived), Quality::Unknown);
    }

    #[test]
    fn test_video_ordered_before_image() {
        let media = finalize(vec![
            RawCandidate::image("https://cdn.example/thumb.jpg"),
            RawCandidate::video("https://cdn.example/v_hd.mp4"),
        ]);

        assert_eq!(media.len(), 2);
        assert_eq!(media[0].kind, MediaKind::Video);
        assert_eq!(media[0].quality, Quality::Hd);
        assert_eq!(media[1].kind, MediaKind::Image);
        assert_eq!(media[1].quality, Quality::Standard);
    }

    #[test]
    fn test_hd_before_standard_stable_within_ties() {
        let media = finalize(vec![
            RawCandidate::image("https://cdn.example/a.jpg"),
            RawCandidate::image("https://cdn.example/b_hd.jpg"),
            RawCandidate::image("https://cdn.example/c.jpg"),
            RawCandidate::video("https://cdn.example/d_480p.mp4"),
            RawCandidate::video("https://cdn.example/e.mp4").derived(),
            RawCandidate::video("https://cdn.example/f.mp4"),
        ]);

        let urls: Vec<&str> = media.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/f.mp4",
                "https://cdn.example/d_480p.mp4",
                "https://cdn.example/e.mp4",
                "https://cdn.example/b_hd.jpg",
                "https://cdn.example/a.jpg",
                "https://cdn.example/c.jpg",
            ]
        );
    }

    #[test]
    fn test_thumbnail_of_video_is_dropped() {
        let media = finalize(vec![
            RawCandidate::image("https://cdn.example/media/clip_thumb.jpg"),
            RawCandidate::image("https://cdn.example/media/other.jpg"),
            RawCandidate::video("https://cdn.example/media/clip.mp4"),
        ]);

        let urls: Vec<&str> = media.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/media/clip.mp4",
                "https://cdn.example/media/other.jpg",
            ]
        );
    }

    #[test]
    fn test_declared_thumbnail_is_dropped() {
        let media = finalize(vec![
            RawCandidate::video("https://cdn.example/v/abc.mp4")
                .with_thumbnail(Some("https://cdn.example/t/xyz.jpg".to_string())),
            RawCandidate::image("https://cdn.example/t/xyz.jpg"),
        ]);
        assert_eq!(media.len(), 1);
        assert!(media[0].is_video());
    }

    #[test]
    fn test_derived_video_keeps_its_source_image() {
        let media = finalize(vec![
            RawCandidate::image("https://cdn.example/media/clip.jpg"),
            RawCandidate::video("https://cdn.example/media/clip.mp4")
                .derived()
                .with_thumbnail(Some("https://cdn.example/media/clip.jpg".to_string())),
        ]);
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].quality, Quality::Unknown);
    }

    #[test]
    fn test_images_kept_without_video() {
        let media = finalize(vec![
            RawCandidate::image("https://cdn.example/media/clip_thumb.jpg"),
            RawCandidate::image("https://cdn.example/media/clip.jpg"),
        ]);
        assert_eq!(media.len(), 2);
    }

    #[test]
    fn test_different_directory_is_not_a_thumbnail() {
        let media = finalize(vec![
            RawCandidate::video("https://cdn.example/a/clip.mp4"),
            RawCandidate::image("https://cdn.example/b/clip_thumb.jpg"),
        ]);
        assert_eq!(media.len(), 2);
    }
}
