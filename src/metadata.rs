// Extraction of the image list embedded in a finished generation

use crate::error::BlogError;
use regex::Regex;
use std::sync::LazyLock;

pub const IMAGE_OPEN: &str = "<!--IMG-->";
pub const IMAGE_CLOSE: &str = "<!--/IMG-->";

static IMAGE_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--IMG-->(.*?)<!--/IMG-->").expect("image region pattern is valid")
});

/// Result of scanning a finished stream buffer, decided once after the stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBody {
    Clean(String),
    WithImages { text: String, images: Vec<String> },
}

impl ParsedBody {
    pub fn text(&self) -> &str {
        match self {
            ParsedBody::Clean(text) => text,
            ParsedBody::WithImages { text, .. } => text,
        }
    }

    pub fn images(&self) -> &[String] {
        match self {
            ParsedBody::Clean(_) => &[],
            ParsedBody::WithImages { images, .. } => images,
        }
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        match self {
            ParsedBody::Clean(text) => (text, Vec::new()),
            ParsedBody::WithImages { text, images } => (text, images),
        }
    }
}

/// Splits the metadata region out of `buffer`.
///
/// Only the first `<!--IMG-->[...]<!--/IMG-->` region supplies images. Every
/// region, dangling opening marker and stray closing marker is removed from
/// the returned text, so scanning the result again finds nothing.
pub fn extract_metadata(buffer: &str) -> ParsedBody {
    let images = match IMAGE_REGION.captures(buffer) {
        Some(caps) => match parse_image_list(&caps[1]) {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let extra_regions = IMAGE_REGION.find_iter(buffer).count().saturating_sub(1);
    if extra_regions > 0 {
        tracing::debug!("ignoring {} additional image region(s)", extra_regions);
    }

    let mut text = IMAGE_REGION.replace_all(buffer, "").into_owned();

    // Removing a marker can splice its neighbours into a new one
    while text.contains(IMAGE_OPEN) || text.contains(IMAGE_CLOSE) {
        if let Some(pos) = text.find(IMAGE_OPEN) {
            tracing::warn!("image region was never closed, dropping trailing payload");
            text.truncate(pos);
        }
        text = text.replace(IMAGE_CLOSE, "");
    }

    let text = text.trim().to_string();

    if images.is_empty() {
        ParsedBody::Clean(text)
    } else {
        ParsedBody::WithImages { text, images }
    }
}

fn parse_image_list(payload: &str) -> Result<Vec<String>, BlogError> {
    serde_json::from_str::<Vec<String>>(payload.trim())
        .map_err(|e| BlogError::MetadataParseFailure(e.to_string()))
}
