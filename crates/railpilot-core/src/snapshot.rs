//! Screen snapshot capture and change detection.
//!
//! A [`ScreenSnapshot`] is a point-in-time capture of the rendered page: the
//! visible text (what a user reads) and the raw markup (enough to detect
//! controls such as a captcha input that carry no visible text).
//!
//! Snapshots are produced fresh on every poll and never mutated. The
//! `content_hash` helper lets adapters detect when a render has settled:
//!
//! ```ignore
//! if compute_content_hash(&next.text) == compute_content_hash(&prev.text) {
//!     // Two identical polls in a row, treat the render as stable
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Maximum number of characters shown by [`ScreenSnapshot::preview`].
const PREVIEW_CHARS: usize = 100;

/// Immutable capture of the current screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    /// Visible rendered text (`innerText` of the page body).
    pub text: String,
    /// Raw rendered markup (`innerHTML` of the page body).
    #[serde(default)]
    pub markup: String,
}

impl ScreenSnapshot {
    pub fn new(text: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: markup.into(),
        }
    }

    /// Snapshot with visible text only.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text, String::new())
    }

    /// Whether the visible text contains `needle`.
    pub fn has_text(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Whether the markup contains `needle`.
    pub fn has_markup(&self, needle: &str) -> bool {
        self.markup.contains(needle)
    }

    /// Hash of text and markup for stability detection.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let text = compute_content_hash(&self.text);
        text ^ compute_content_hash(&self.markup).rotate_left(1)
    }

    /// First characters of the visible text on a single line, for log output.
    pub fn preview(&self) -> String {
        let flat: String = self
            .text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if flat.chars().count() <= PREVIEW_CHARS {
            flat
        } else {
            let head: String = flat.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        }
    }
}

/// Compute a content hash from screen text.
///
/// Uses FNV-1a, a fast non-cryptographic hash suitable for change detection.
#[must_use]
pub fn compute_content_hash(text: &str) -> u64 {
    // FNV-1a parameters for 64-bit
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001B3;

    let mut hash = FNV_OFFSET;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
