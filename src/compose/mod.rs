//! Page compositor: turns segments into paginated PDF pages.
//!
//! Image segments are cloned into an [`OffscreenContainer`], rasterized by a
//! [`Rasterizer`] and sliced across pages. Table segments are re-emitted as
//! native PDF tables by the paginating [`TableWriter`]. Both share one
//! running page cursor held by a [`Sheet`].

mod declarative;
mod page;
mod pdf;
mod raster;
mod sheet;
mod table;
mod text;

pub use declarative::{compose_document, render_document};
pub use page::{plan_slices, Orientation, PageCursor, PageFormat, Slice, SlicePlan, MM_TO_PT, SLICE_TOLERANCE_MM};
pub use pdf::PdfWriter;
pub use raster::{DraftRasterizer, OffscreenContainer, Rasterizer, DEFAULT_CAPTURE_WIDTH};
pub use sheet::{Sheet, CAPTION_MIN_ROOM, CAPTION_SIZE};
pub use table::{column_widths, TableStyle, TableWriter};
pub use text::{encode_win_ansi, text_width, wrap_text};

use crate::error::Result;
use crate::model::{extract_table_grid, max_table_columns, Color, Node};
use crate::segment::Segment;

/// Choose the page orientation for an export root.
///
/// Landscape when any table row under `root` has at least `threshold`
/// exportable cells, portrait otherwise.
pub fn infer_orientation(root: &Node, no_export_class: &str, threshold: usize) -> Orientation {
    let columns = max_table_columns(root, no_export_class);
    if threshold > 0 && columns >= threshold {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    }
}

/// Settings for compositing captured content.
#[derive(Debug, Clone)]
pub struct CompositorSettings {
    /// Device pixels per CSS pixel when rasterizing
    pub raster_scale: f32,

    /// Offscreen container width (CSS px)
    pub capture_width: f32,

    /// Solid colour replacing gradient-clipped text
    pub gradient_fallback: Color,

    /// Class marking nodes and cells excluded from export
    pub no_export_class: String,

    /// Table appearance
    pub table_style: TableStyle,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            raster_scale: 2.0,
            capture_width: DEFAULT_CAPTURE_WIDTH,
            gradient_fallback: Color::rgb(31, 41, 55),
            no_export_class: "no-print".to_string(),
            table_style: TableStyle::default(),
        }
    }
}

/// Places segments onto pages in order.
pub struct Compositor<'r> {
    sheet: Sheet,
    rasterizer: &'r dyn Rasterizer,
    settings: CompositorSettings,
}

impl<'r> Compositor<'r> {
    /// Create a compositor writing pages of `format`.
    pub fn new(format: PageFormat, rasterizer: &'r dyn Rasterizer, settings: CompositorSettings) -> Self {
        let sheet = Sheet::new(format).with_table_style(settings.table_style.clone());
        Self {
            sheet,
            rasterizer,
            settings,
        }
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.sheet = self.sheet.with_title(title);
        self
    }

    /// Current page cursor (mm).
    pub fn cursor(&self) -> f32 {
        self.sheet.cursor()
    }

    /// Pages so far.
    pub fn page_count(&self) -> usize {
        self.sheet.page_count()
    }

    /// Place one segment at the cursor. Image runs move into the offscreen
    /// container.
    pub async fn composite(&mut self, segment: Segment<'_>) -> Result<()> {
        match segment {
            Segment::Image { nodes } => self.place_nodes(nodes).await,
            Segment::Table { source, caption } => self.place_table(source, caption.as_deref()),
        }
    }

    /// Rasterize nodes offscreen and slice the result onto pages.
    pub async fn place_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        let mut container = OffscreenContainer::new(nodes, self.settings.capture_width, self.settings.raster_scale);
        let flattened = container.flatten_gradient_text(self.settings.gradient_fallback);
        if flattened > 0 {
            log::debug!("flattened {} gradient text nodes", flattened);
        }

        self.rasterizer.fonts_ready().await?;
        let image = self.rasterizer.rasterize(&container).await?;
        drop(container);
        self.sheet.place_raster(&image)
    }

    /// Re-emit a table node as a native table with an optional caption.
    pub fn place_table(&mut self, table: &Node, caption: Option<&str>) -> Result<()> {
        let grid = extract_table_grid(table, &self.settings.no_export_class);
        log::debug!(
            "table segment: {} header rows, {} body rows, {} columns",
            grid.head.len(),
            grid.body.len(),
            grid.column_count()
        );
        self.sheet.table(&grid, caption)
    }

    /// Serialize the composed document.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.sheet.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, Style};
    use crate::segment::build_segments;

    fn wide_table(columns: usize) -> Node {
        let header: Vec<String> = (0..columns).map(|c| format!("C{}", c)).collect();
        let row: Vec<String> = (0..columns).map(|c| c.to_string()).collect();
        Node::table_from_rows(header, vec![row])
    }

    #[test]
    fn test_infer_orientation_threshold() {
        let root = Node::block().with_child(wide_table(10));
        assert_eq!(infer_orientation(&root, "no-print", 10), Orientation::Landscape);

        let narrow = Node::block().with_child(wide_table(9));
        assert_eq!(infer_orientation(&narrow, "no-print", 10), Orientation::Portrait);
        assert_eq!(infer_orientation(&Node::block(), "no-print", 10), Orientation::Portrait);
    }

    #[test]
    fn test_infer_orientation_ignores_no_export_cells() {
        let mut table = wide_table(10);
        // Mark the last column of every row as excluded
        for section in &mut table.children {
            for row in &mut section.children {
                if let Some(last) = row.children.last_mut() {
                    last.classes.push("no-print".into());
                }
            }
        }
        let root = Node::block().with_child(table);
        assert_eq!(infer_orientation(&root, "no-print", 10), Orientation::Portrait);
    }

    #[tokio::test]
    async fn test_composite_mixed_segments() {
        let root = Node::block()
            .with_child(Node::heading("Parte diario"))
            .with_child(Node::text("Personal"))
            .with_child(Node::table_from_rows(["Nombre", "Rol"], vec![vec!["Ana", "Jefa"]]))
            .with_child(Node::block().with_style(Style {
                height: Some(120.0),
                ..Default::default()
            }));
        let segments = build_segments(&root, "no-print");
        assert_eq!(segments.len(), 3);

        let rasterizer = DraftRasterizer::new();
        let mut compositor = Compositor::new(
            PageFormat::a4(Orientation::Portrait, 10.0),
            &rasterizer,
            CompositorSettings::default(),
        );
        let mut last = compositor.cursor();
        for segment in segments {
            compositor.composite(segment).await.unwrap();
            assert!(compositor.cursor() > last);
            last = compositor.cursor();
        }
        let bytes = compositor.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_empty_table_places_caption_only() {
        let rasterizer = DraftRasterizer::new();
        let mut compositor = Compositor::new(
            PageFormat::a4(Orientation::Portrait, 10.0),
            &rasterizer,
            CompositorSettings::default(),
        );
        compositor
            .place_table(&Node::new(NodeKind::Table), Some("Vacía"))
            .unwrap();
        assert!(compositor.cursor() > 10.0);
        assert_eq!(compositor.page_count(), 1);
    }
}
