//! Segmentation of an export root into raster runs and tables.
//!
//! Tables are exported as native PDF tables so they stay searchable and
//! paginate by row; everything between them is rasterized. The segmenter
//! walks the root's children in visual order and splits at every table.

use crate::model::Node;
use std::fmt;

/// A contiguous piece of exportable content.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Run of non-table nodes captured as one raster (cloned)
    Image {
        /// Nodes in visual order
        nodes: Vec<Node>,
    },
    /// A table emitted natively
    Table {
        /// The table node in the live tree
        source: &'a Node,
        /// Text of the nearest preceding labelled sibling
        caption: Option<String>,
    },
}

impl Segment<'_> {
    /// Check whether this is a table segment.
    pub fn is_table(&self) -> bool {
        matches!(self, Segment::Table { .. })
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Image { nodes } => write!(f, "image ({} nodes)", nodes.len()),
            Segment::Table { caption, .. } => match caption {
                Some(caption) => write!(f, "table \"{}\"", caption),
                None => write!(f, "table"),
            },
        }
    }
}

/// Split `root` into ordered segments.
///
/// Children carrying `no_export_class` are skipped. A table child becomes
/// its own segment; a child that merely contains a table is descended into.
/// All other children accumulate into the current image run, which is
/// flushed before every table and at the end of each level.
pub fn build_segments<'a>(root: &'a Node, no_export_class: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    walk(root, no_export_class, &mut segments);
    log::debug!(
        "segmented root into {} segments ({} tables)",
        segments.len(),
        segments.iter().filter(|s| s.is_table()).count()
    );
    segments
}

/// Whether any segment is a table.
pub fn has_table_segments(segments: &[Segment<'_>]) -> bool {
    segments.iter().any(Segment::is_table)
}

fn flush(run: &mut Vec<Node>, segments: &mut Vec<Segment<'_>>) {
    if !run.is_empty() {
        segments.push(Segment::Image {
            nodes: std::mem::take(run),
        });
    }
}

fn walk<'a>(parent: &'a Node, no_export_class: &str, segments: &mut Vec<Segment<'a>>) {
    let mut run = Vec::new();

    for (index, child) in parent.children.iter().enumerate() {
        if child.has_class(no_export_class) {
            continue;
        }

        if child.is_table() {
            flush(&mut run, segments);
            segments.push(Segment::Table {
                source: child,
                caption: caption_for(&parent.children[..index], no_export_class),
            });
        } else if child.contains_table() {
            flush(&mut run, segments);
            walk(child, no_export_class, segments);
        } else {
            run.push(child.clone());
        }
    }

    flush(&mut run, segments);
}

/// Nearest preceding sibling with text that holds no table.
fn caption_for(preceding: &[Node], no_export_class: &str) -> Option<String> {
    preceding
        .iter()
        .rev()
        .filter(|n| !n.has_class(no_export_class) && !n.is_table())
        .find_map(|n| {
            let text = n.text_content();
            let text = text.trim();
            (!text.is_empty() && !n.contains_table()).then(|| text.to_string())
        })
}
