//! # fieldpdf
//!
//! Headless document export pipeline for field-operations forms.
//!
//! A rendered form page is described as a serde-loadable visual tree. The
//! pipeline segments the export root into raster runs and tables, paginates
//! them onto A4 pages, saves the PDF and emails it through a mail relay,
//! tracking delivery status along the way.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fieldpdf::{export_page, ExportOptions, Page};
//!
//! #[tokio::main]
//! async fn main() -> fieldpdf::Result<()> {
//!     let mut page = Page::open("parte_diario.json")?;
//!     let options = ExportOptions::new("parte_diario").with_recipient("ops@example.com");
//!
//!     let result = export_page(&mut page, "report", "out", &options).await?;
//!     println!("email sent: {}", result.email_success);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Segmentation**: tables become native, searchable PDF tables; the rest
//!   is rasterized
//! - **Pagination**: raster slicing and repeated table headers across pages
//! - **Orientation inference**: wide tables switch to landscape
//! - **Declarative documents**: render structured blocks straight to PDF
//! - **Mail relay delivery**: partial success keeps the saved document even
//!   when email fails

pub mod compose;
pub mod error;
pub mod export;
pub mod model;
pub mod segment;
pub mod store;

// Re-export commonly used types
pub use compose::{
    infer_orientation, render_document, Compositor, DraftRasterizer, Orientation, PageFormat,
    Rasterizer,
};
pub use error::{Error, Result};
pub use export::{
    DirectorySink, DocumentExporter, EmailStatus, ExportConfig, ExportOptions, ExportPipeline,
    ExportResult, ExportSource, HttpMailRelay, MailRelay, RelayConfig, ReportSummary,
    StatusTracker,
};
pub use model::{DeclarativeDocument, DocBlock, Node, NodeKind, Page, TableGrid};
pub use segment::{build_segments, has_table_segments, Segment};
pub use store::{CachedRecordStore, Record, RecordStore, RemoteTable};

use std::path::Path;
use std::sync::Arc;

/// Build a pipeline with the bundled rasterizer, a directory sink and the
/// HTTP relay configured from the environment.
pub fn default_pipeline<P: AsRef<Path>>(output_dir: P) -> Result<ExportPipeline> {
    let relay = HttpMailRelay::new(RelayConfig::from_env())?;
    Ok(ExportPipeline::new(
        Arc::new(DraftRasterizer::new()),
        Arc::new(DirectorySink::new(output_dir.as_ref())),
        Arc::new(relay),
    ))
}

/// Capture `element_id` of `page`, save it under `output_dir` and email it
/// when the options name a recipient.
///
/// # Example
///
/// ```no_run
/// use fieldpdf::{export_page, ExportOptions, Page};
///
/// # async fn run() -> fieldpdf::Result<()> {
/// let mut page = Page::open("permiso.json")?;
/// let result = export_page(&mut page, "form", "out", &ExportOptions::new("permiso")).await?;
/// assert!(!result.email_success);
/// # Ok(())
/// # }
/// ```
pub async fn export_page<P: AsRef<Path>>(
    page: &mut Page,
    element_id: &str,
    output_dir: P,
    options: &ExportOptions,
) -> Result<ExportResult> {
    default_pipeline(output_dir)?
        .export_capture(page, element_id, options)
        .await
}

/// Render a declarative document, save it under `output_dir` and email it
/// when the options name a recipient.
pub async fn export_document<P: AsRef<Path>>(
    doc: &DeclarativeDocument,
    output_dir: P,
    options: &ExportOptions,
) -> Result<ExportResult> {
    default_pipeline(output_dir)?
        .export_declarative(doc, options)
        .await
}

/// Render a page element to PDF bytes without saving or emailing.
///
/// # Example
///
/// ```no_run
/// use fieldpdf::{capture_to_bytes, Page};
///
/// # async fn run() -> fieldpdf::Result<()> {
/// let mut page = Page::open("parte_diario.json")?;
/// let pdf = capture_to_bytes(&mut page, "report", None).await?;
/// std::fs::write("parte_diario.pdf", pdf)?;
/// # Ok(())
/// # }
/// ```
pub async fn capture_to_bytes(page: &mut Page, element_id: &str, orientation: Option<Orientation>) -> Result<Vec<u8>> {
    let exporter = export::CaptureExporter::new(Arc::new(DraftRasterizer::new()), ExportConfig::default());
    let mut options = ExportOptions::new(element_id);
    options.orientation = orientation;
    let source = ExportSource::Capture { page, element_id };
    exporter.validate(&source)?;
    Ok(exporter.render(source, &options).await?.bytes)
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
