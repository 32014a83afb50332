//! ハイライト抽出の型定義
//!
//! - Annotation: PDFから読み込んだ注釈（不変）
//! - TextItem: テキストレイヤーの1スパン
//! - ExtractedNote: 注釈1件ごとの抽出結果
//! - HighlightGroup: 読み順で連続するノートのまとまり
//! - FileRecord: ファイル単位の結果（UIへ返すペイロード）

use crate::geometry::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text-markup annotation kinds the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtype {
    Highlight,
    Underline,
    Squiggly,
}

impl Subtype {
    /// Case-insensitive match against a PDF `/Subtype` name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "highlight" => Some(Subtype::Highlight),
            "underline" => Some(Subtype::Underline),
            "squiggly" => Some(Subtype::Squiggly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::Highlight => "Highlight",
            Subtype::Underline => "Underline",
            Subtype::Squiggly => "Squiggly",
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 0–255 RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Converts a PDF `/C` array (0.0–1.0 components).
    ///
    /// 1 component is gray, 3 RGB, 4 CMYK; anything else (including the
    /// empty array, meaning transparent) has no colour.
    pub fn from_components(components: &[f64]) -> Option<Self> {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        match components {
            [g] => Some(Rgb([byte(*g); 3])),
            [r, g, b] => Some(Rgb([byte(*r), byte(*g), byte(*b)])),
            [c, m, y, k] => Some(Rgb([
                byte((1.0 - c) * (1.0 - k)),
                byte((1.0 - m) * (1.0 - k)),
                byte((1.0 - y) * (1.0 - k)),
            ])),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub page: u32,
    pub subtype: Subtype,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub quad_points: Vec<f64>,
    #[serde(default)]
    pub color: Option<Rgb>,
}

/// One span of the page's text layer, positioned in PDF user space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub str: String,
    /// Placement of the span's origin; `[2]`/`[3]` carry the font height.
    pub transform: Matrix,
    /// Advance width in user space.
    pub width: f64,
}

/// Everything the extractor needs from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// 1-based page number.
    pub page: u32,
    pub view_transform: Matrix,
    pub annotations: Vec<Annotation>,
    /// `None` when the page's text layer could not be read.
    pub text: Option<Vec<TextItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedNote {
    pub page: u32,
    pub subtype: Subtype,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "extent::unbounded_min", with = "extent::min")]
    pub min_y: f64,
    #[serde(default = "extent::unbounded_max", with = "extent::max")]
    pub max_y: f64,
    #[serde(default)]
    pub color: Option<Rgb>,
}

impl ExtractedNote {
    /// Key used to recognise the same note across re-imports.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}|{}|{}", self.page, self.subtype, self.contents, self.text)
    }

    /// True when no vertical extent could be recovered.
    pub fn is_degenerate(&self) -> bool {
        !self.min_y.is_finite() || !self.max_y.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightGroup {
    pub page: u32,
    pub count: usize,
    /// Non-empty reviewer comments, in item order.
    pub contents: Vec<String>,
    /// Non-empty recovered texts joined with a space.
    pub text: String,
    #[serde(default = "extent::unbounded_min", with = "extent::min")]
    pub min_y: f64,
    #[serde(default = "extent::unbounded_max", with = "extent::max")]
    pub max_y: f64,
    pub items: Vec<ExtractedNote>,
}

impl HighlightGroup {
    pub fn has_comments(&self) -> bool {
        !self.contents.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: Vec<ExtractedNote>,
    #[serde(default)]
    pub groups: Vec<HighlightGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileRecord {
    /// Record for a file whose extraction failed as a whole.
    pub fn failed(path: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Non-finite extents travel through JSON as `null`.
mod extent {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn unbounded_min() -> f64 {
        f64::INFINITY
    }

    pub fn unbounded_max() -> f64 {
        f64::NEG_INFINITY
    }

    fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub mod min {
        use super::*;

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            super::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(unbounded_min))
        }
    }

    pub mod max {
        use super::*;

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            super::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(unbounded_max))
        }
    }
}
