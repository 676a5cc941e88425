//! Visual tree nodes.
//!
//! A [`Node`] is a rendered element of a form page: a block of content, a
//! label, an input with its current value, an embedded picture, or part of a
//! table. Trees are usually loaded from JSON snapshots of a rendered form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of visual element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Generic container
    #[default]
    Block,
    /// Inline or paragraph text
    Text,
    /// Section heading
    Heading,
    /// Form input; its `value` is part of the text content
    Input,
    /// Embedded picture (`src` holds base64 PNG/JPEG data)
    Image,
    /// Tabular element
    Table,
    /// Table head section
    #[serde(rename = "thead")]
    TableHead,
    /// Table body section
    #[serde(rename = "tbody")]
    TableBody,
    /// Table foot section
    #[serde(rename = "tfoot")]
    TableFoot,
    /// Table row
    #[serde(rename = "tr")]
    Row,
    /// Data cell
    #[serde(rename = "td")]
    Cell,
    /// Header cell
    #[serde(rename = "th")]
    HeaderCell,
}

impl NodeKind {
    /// Whether this kind is a table cell.
    pub fn is_cell(self) -> bool {
        matches!(self, NodeKind::Cell | NodeKind::HeaderCell)
    }

    /// Whether this kind is a table section (head/body/foot).
    pub fn is_section(self) -> bool {
        matches!(
            self,
            NodeKind::TableHead | NodeKind::TableBody | NodeKind::TableFoot
        )
    }
}

/// CSS-like display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    /// Block layout
    Block,
    /// Inline layout
    Inline,
    /// Flex container
    Flex,
    /// Grid container
    Grid,
    /// Table layout
    Table,
    /// Not rendered
    None,
}

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// White.
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Create a colour from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    /// Channels as PDF colour operands in `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::parse_hex(&value).ok_or_else(|| format!("invalid colour: {}", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Computed style of a node, in CSS pixels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Display mode (`None` = unset)
    pub display: Option<Display>,

    /// Rendered width
    pub width: Option<f32>,

    /// Rendered height (overrides content-based measuring)
    pub height: Option<f32>,

    /// Font size
    pub font_size: Option<f32>,

    /// Bold text
    pub bold: bool,

    /// Text colour
    pub color: Option<Color>,

    /// Background fill
    pub background: Option<Color>,

    /// Border colour (1px)
    pub border: Option<Color>,

    /// Uniform padding
    pub padding: Option<f32>,

    /// Gradient-clipped text effect (`background-clip: text`)
    pub gradient_text: bool,
}

/// A node of the visual tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    /// Element identifier
    pub id: Option<String>,

    /// Element kind
    pub kind: NodeKind,

    /// Class markers (e.g. `no-print`)
    pub classes: Vec<String>,

    /// Own text
    pub text: Option<String>,

    /// Current value (inputs)
    pub value: Option<String>,

    /// Base64 image data (image nodes)
    pub src: Option<String>,

    /// Computed style
    pub style: Style,

    /// Child nodes in visual order
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node of the given kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Create a block container.
    pub fn block() -> Self {
        Self::new(NodeKind::Block)
    }

    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(NodeKind::Text)
        }
    }

    /// Create a heading node.
    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(NodeKind::Heading)
        }
    }

    /// Create an input holding a value.
    pub fn input(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(NodeKind::Input)
        }
    }

    /// Create a simple table: one header row and data rows.
    pub fn table_from_rows<S: Into<String>>(
        header: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<S>>,
    ) -> Self {
        let head_row = Node::new(NodeKind::Row).with_children(
            header
                .into_iter()
                .map(|h| Node::new(NodeKind::HeaderCell).with_text(h)),
        );
        let body_rows = rows.into_iter().map(|row| {
            Node::new(NodeKind::Row)
                .with_children(row.into_iter().map(|c| Node::new(NodeKind::Cell).with_text(c)))
        });
        Node::new(NodeKind::Table)
            .with_child(Node::new(NodeKind::TableHead).with_child(head_row))
            .with_child(Node::new(NodeKind::TableBody).with_children(body_rows))
    }

    /// Set the id and return self.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class and return self.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set own text and return self.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the style and return self.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Append a child and return self.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append children and return self.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Check whether the node carries a class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Check whether the node is a tabular element.
    pub fn is_table(&self) -> bool {
        self.kind == NodeKind::Table
    }

    /// Check whether any descendant (not self) is a table.
    pub fn contains_table(&self) -> bool {
        self.children
            .iter()
            .any(|c| c.is_table() || c.contains_table())
    }

    /// Check whether the node is hidden (`display: none`).
    pub fn is_hidden(&self) -> bool {
        self.style.display == Some(Display::None)
    }

    /// Own text, or the value for inputs.
    pub fn own_text(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Input => self.value.as_deref().or(self.text.as_deref()),
            _ => self.text.as_deref(),
        }
    }

    /// Text of this node and all descendants, whitespace-normalized.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        if let Some(text) = self.own_text() {
            parts.extend(text.split_whitespace());
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    /// Find a node by id (self included).
    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.descendants().find(|n| n.id.as_deref() == Some(id))
    }

    /// Depth-first pre-order iterator over self and all descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Depth-first pre-order iterator over a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
