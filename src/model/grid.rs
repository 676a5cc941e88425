//! Text grids extracted from tabular nodes.

use super::{Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Head/body text grid of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    /// Header rows
    #[serde(default)]
    pub head: Vec<Vec<String>>,

    /// Data rows
    #[serde(default)]
    pub body: Vec<Vec<String>>,
}

impl TableGrid {
    /// Create a grid from header and body rows.
    pub fn new(head: Vec<Vec<String>>, body: Vec<Vec<String>>) -> Self {
        Self { head, body }
    }

    /// Widest row across head and body.
    pub fn column_count(&self) -> usize {
        self.head
            .iter()
            .chain(&self.body)
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Check if the grid has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }
}

/// Rows belonging to `table`, grouped by section.
///
/// Nested tables are not descended into.
struct TableRows<'a> {
    head: Vec<&'a Node>,
    body: Vec<&'a Node>,
    other: Vec<&'a Node>,
}

fn collect_rows(table: &Node) -> TableRows<'_> {
    let mut rows = TableRows {
        head: Vec::new(),
        body: Vec::new(),
        other: Vec::new(),
    };
    for child in &table.children {
        match child.kind {
            NodeKind::Row => rows.other.push(child),
            NodeKind::TableHead => rows
                .head
                .extend(child.children.iter().filter(|n| n.kind == NodeKind::Row)),
            NodeKind::TableBody => rows
                .body
                .extend(child.children.iter().filter(|n| n.kind == NodeKind::Row)),
            NodeKind::TableFoot => rows
                .other
                .extend(child.children.iter().filter(|n| n.kind == NodeKind::Row)),
            _ => {}
        }
    }
    rows
}

/// Exportable cells of a row: cells without the no-export marker.
fn exportable_cells<'a>(row: &'a Node, no_export_class: &'a str) -> impl Iterator<Item = &'a Node> {
    row.children
        .iter()
        .filter(move |c| c.kind.is_cell() && !c.has_class(no_export_class))
}

fn row_text(row: &Node, no_export_class: &str) -> Option<Vec<String>> {
    let cells: Vec<String> = exportable_cells(row, no_export_class)
        .map(|c| c.text_content().trim().to_string())
        .collect();
    cells.iter().any(|c| !c.is_empty()).then_some(cells)
}

/// Extract the text grid of a table node.
///
/// Header rows come from the head section and data rows from the body
/// section. Without head/body sectioning every row is treated as data.
/// Rows whose exportable cells are all empty are dropped.
pub fn extract_table_grid(table: &Node, no_export_class: &str) -> TableGrid {
    let rows = collect_rows(table);
    let sectioned = !rows.head.is_empty() || !rows.body.is_empty();

    let to_text = |rows: &[&Node]| -> Vec<Vec<String>> {
        rows.iter()
            .filter_map(|row| row_text(row, no_export_class))
            .collect()
    };

    if sectioned {
        TableGrid::new(to_text(&rows.head), to_text(&rows.body))
    } else {
        TableGrid::new(Vec::new(), to_text(&rows.other))
    }
}

/// Maximum exportable column count over every row of every table in `root`.
pub fn max_table_columns(root: &Node, no_export_class: &str) -> usize {
    root.descendants()
        .filter(|n| n.is_table())
        .flat_map(|table| {
            let rows = collect_rows(table);
            rows.head
                .into_iter()
                .chain(rows.body)
                .chain(rows.other)
                .map(|row| exportable_cells(row, no_export_class).count())
                .collect::<Vec<_>>()
        })
        .max()
        .unwrap_or(0)
}
