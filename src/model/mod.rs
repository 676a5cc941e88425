//! Visual tree and document model types.
//!
//! The visual tree is the headless stand-in for a rendered form page: the
//! segmenter, compositor and orchestrator operate on it instead of a live
//! browser document.

mod declarative;
mod grid;
mod node;
mod page;

pub use declarative::{DeclarativeDocument, DocBlock};
pub use grid::{extract_table_grid, max_table_columns, TableGrid};
pub use node::{Color, Descendants, Display, Node, NodeKind, Style};
pub use page::{NodePath, Page};
