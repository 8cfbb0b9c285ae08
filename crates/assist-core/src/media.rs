//! Media attachments carried by assistant replies.

use serde::{Deserialize, Serialize};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg"];

/// Coarse media kind, inferred from the file name suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Playable video.
    Video,
    /// Anything else, offered as a download.
    File,
}

/// A single attachment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Path relative to the media host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Absolute URL; wins over `file` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl MediaItem {
    /// Lowercased extension of `file`, or empty when there is none.
    pub fn extension(&self) -> String {
        self.file
            .as_deref()
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }

    /// Media kind inferred from the extension.
    pub fn kind(&self) -> MediaKind {
        let ext = self.extension();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::File
        }
    }

    /// Absolute URL for display.
    ///
    /// `file_url` is used verbatim; otherwise `file` is appended to `base`.
    pub fn resolve_url(&self, base: &str) -> Option<String> {
        if let Some(url) = self.file_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_owned());
        }
        let file = self.file.as_deref()?;
        Some(format!("{}{file}", base.trim_end_matches('/')))
    }
}

/// The `embedding` object of an answer: a list of attachments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEmbedding {
    /// Attachments in display order; items that do not decode are skipped.
    #[serde(default, deserialize_with = "crate::lenient::list")]
    pub data: Vec<MediaItem>,
}

impl MediaEmbedding {
    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
