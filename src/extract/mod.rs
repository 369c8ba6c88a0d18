//! Link extraction from archive pages.
//!
//! Finds anchors pointing at recordings and pairs each with the `alt` text of
//! the thumbnail image it wraps, which the archive uses as the meeting label.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// One discovered recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Absolute URL of the remote asset.
    pub source_url: String,
    /// Free-text label attached to the asset, if any.
    pub raw_label: Option<String>,
}

impl MediaRecord {
    pub fn new(source_url: impl Into<String>, raw_label: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            raw_label,
        }
    }
}

/// An anchor on the page together with the `alt` of its first nested image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorImage {
    pub href: String,
    pub alt: Option<String>,
}

struct Selectors {
    anchor: Selector,
    image: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        anchor: Selector::parse("a[href]").expect("anchor selector"),
        image: Selector::parse("img").expect("image selector"),
    })
}

/// Every `<a href>` in document order, resolved against `page_url`.
///
/// Hrefs that cannot be resolved into an absolute URL are skipped.
pub fn anchor_images(html: &str, page_url: &Url) -> Vec<AnchorImage> {
    let document = Html::parse_document(html);
    let selectors = selectors();

    document
        .select(&selectors.anchor)
        .filter_map(|anchor| {
            let raw_href = anchor.value().attr("href")?.trim();
            if raw_href.is_empty() {
                return None;
            }
            let href = match page_url.join(raw_href) {
                Ok(url) => url.to_string(),
                Err(err) => {
                    debug!("Skipping unresolvable href {:?}: {}", raw_href, err);
                    return None;
                }
            };
            Some(AnchorImage {
                href,
                alt: image_alt(anchor, &selectors.image),
            })
        })
        .collect()
}

fn image_alt(anchor: ElementRef<'_>, image: &Selector) -> Option<String> {
    anchor
        .select(image)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
}

/// Extracts recording links whose `href` contains a fixed host marker.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    media_host: String,
}

impl LinkExtractor {
    pub fn new(media_host: impl Into<String>) -> Self {
        Self {
            media_host: media_host.into(),
        }
    }

    /// Media records on one page, in document order, one per distinct URL.
    ///
    /// When the same URL appears more than once, the first labelled occurrence
    /// provides the label.
    pub fn extract(&self, html: &str, page_url: &Url) -> Vec<MediaRecord> {
        let mut records: Vec<MediaRecord> = Vec::new();

        for anchor in anchor_images(html, page_url) {
            if !anchor.href.contains(&self.media_host) {
                continue;
            }

            match records.iter_mut().find(|r| r.source_url == anchor.href) {
                Some(existing) => {
                    if existing.raw_label.is_none() {
                        existing.raw_label = anchor.alt;
                    }
                }
                None => records.push(MediaRecord::new(anchor.href, anchor.alt)),
            }
        }

        records
    }
}
