//! Comment records as delivered by the catalog service.

use serde::{Deserialize, Serialize};

/// Display mode used when the catalog omits one (scrolling).
pub const DEFAULT_MODE: i32 = 1;

/// Font size used when the catalog omits one.
pub const DEFAULT_SIZE: i32 = 25;

/// Color used when the catalog omits one (white).
pub const DEFAULT_COLOR: u32 = 0xFFFFFF;

/// A single timed comment.
///
/// Optional fields carry their defaults at deserialization time so rendering
/// never has to guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Offset into the media, in seconds.
    pub time: f64,

    /// Display mode.
    #[serde(rename = "type", default = "default_mode")]
    pub mode: i32,

    /// Font size.
    #[serde(default = "default_size")]
    pub size: i32,

    /// 24-bit RGB color.
    #[serde(default = "default_color")]
    pub color: u32,

    /// Hash of the author's user id.
    #[serde(default)]
    pub user_id_hash: String,

    /// Catalog-wide comment id.
    #[serde(default)]
    pub id: i64,

    /// Comment body.
    #[serde(default)]
    pub text: String,
}

fn default_mode() -> i32 {
    DEFAULT_MODE
}

fn default_size() -> i32 {
    DEFAULT_SIZE
}

fn default_color() -> u32 {
    DEFAULT_COLOR
}

impl Comment {
    /// A comment with only time and text set; everything else defaulted.
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            mode: DEFAULT_MODE,
            size: DEFAULT_SIZE,
            color: DEFAULT_COLOR,
            user_id_hash: String::new(),
            id: 0,
            text: text.into(),
        }
    }
}
