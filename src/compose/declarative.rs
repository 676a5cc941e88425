//! Direct rendering of declarative documents.

use super::page::{Orientation, PageFormat};
use super::raster::decode_image;
use super::sheet::Sheet;
use crate::error::Result;
use crate::model::{DeclarativeDocument, DocBlock};

/// Render a [`DeclarativeDocument`] to PDF bytes.
///
/// Orientation resolves as `orientation`, then the document's own, then
/// portrait.
pub fn render_document(doc: &DeclarativeDocument, orientation: Option<Orientation>, margin: f32) -> Result<Vec<u8>> {
    compose_document(doc, orientation, margin)?.finish()
}

/// Lay a [`DeclarativeDocument`] out on a [`Sheet`] without serializing it.
pub fn compose_document(doc: &DeclarativeDocument, orientation: Option<Orientation>, margin: f32) -> Result<Sheet> {
    let orientation = orientation.or(doc.orientation).unwrap_or(Orientation::Portrait);
    let format = PageFormat::a4(orientation, margin);
    let mut sheet = Sheet::new(format);
    if let Some(title) = &doc.title {
        sheet = sheet.with_title(title.clone());
    }

    for block in &doc.blocks {
        match block {
            DocBlock::Heading { text } => sheet.heading(text)?,
            DocBlock::Paragraph { text } => sheet.paragraph(text)?,
            DocBlock::Fields { fields } => sheet.fields(fields)?,
            DocBlock::Table { caption, grid } => sheet.table(grid, caption.as_deref())?,
            DocBlock::Image { src, width_mm } => {
                let picture = decode_image(src)?.to_rgba8();
                sheet.place_picture(&picture, width_mm.unwrap_or(format.printable_width()))?;
            }
            DocBlock::Spacer { mm } => sheet.spacer(*mm)?,
            DocBlock::PageBreak => sheet.new_page()?,
        }
    }

    log::debug!(
        "declarative document rendered: {} blocks, {} pages",
        doc.blocks.len(),
        sheet.page_count()
    );
    Ok(sheet)
}
