//! Declarative document descriptions.
//!
//! A declarative document is rendered straight to PDF without capturing a
//! visual tree, for forms that need exact print layout.

use super::TableGrid;
use crate::compose::Orientation;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A printable document described as a sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarativeDocument {
    /// Document title (also written to the PDF info dictionary)
    #[serde(default)]
    pub title: Option<String>,

    /// Page orientation (portrait if unset)
    #[serde(default)]
    pub orientation: Option<Orientation>,

    /// Content blocks in reading order
    #[serde(default)]
    pub blocks: Vec<DocBlock>,
}

impl DeclarativeDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Append a block.
    pub fn push(mut self, block: DocBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Parse from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

/// A block of a declarative document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocBlock {
    /// Bold heading line
    Heading {
        /// Heading text
        text: String,
    },
    /// Wrapped body text
    Paragraph {
        /// Paragraph text
        text: String,
    },
    /// Label/value pairs, one per line
    Fields {
        /// `(label, value)` pairs
        fields: Vec<(String, String)>,
    },
    /// Paginated table
    Table {
        /// Optional caption drawn above the table
        #[serde(default)]
        caption: Option<String>,
        /// Table content
        grid: TableGrid,
    },
    /// Embedded picture (base64 PNG/JPEG)
    Image {
        /// Base64 image data
        src: String,
        /// Printed width (defaults to the printable width)
        #[serde(default)]
        width_mm: Option<f32>,
    },
    /// Vertical gap
    Spacer {
        /// Gap height
        mm: f32,
    },
    /// Forced page break
    PageBreak,
}
