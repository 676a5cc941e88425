//! A PDF writer paired with its running page cursor.

use super::page::{plan_slices, PageCursor, PageFormat};
use super::pdf::PdfWriter;
use super::table::{TableStyle, TableWriter};
use super::text::{pt_to_mm, text_width, wrap_text};
use crate::error::Result;
use crate::model::{Color, TableGrid};
use image::{imageops, DynamicImage, RgbaImage};

/// Caption font size (pt).
pub const CAPTION_SIZE: f32 = 10.0;

/// Room a caption needs before it forces a page break (mm).
pub const CAPTION_MIN_ROOM: f32 = 10.0;

const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;
const LINE_SPACING: f32 = 1.35;
const BLOCK_GAP: f32 = 2.0;
const TEXT_COLOR: Color = Color::rgb(20, 20, 20);

/// Sequential page writer: every placement starts at the cursor and leaves
/// the cursor below what it drew.
pub struct Sheet {
    pdf: PdfWriter,
    cursor: PageCursor,
    table_style: TableStyle,
}

impl Sheet {
    /// Start a document with the cursor at the top margin of page one.
    pub fn new(format: PageFormat) -> Self {
        Self {
            cursor: PageCursor::top(&format),
            pdf: PdfWriter::new(format),
            table_style: TableStyle::default(),
        }
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.pdf = self.pdf.with_title(title);
        self
    }

    /// Replace the table style.
    pub fn with_table_style(mut self, style: TableStyle) -> Self {
        self.table_style = style;
        self
    }

    /// Page geometry.
    pub fn format(&self) -> PageFormat {
        *self.pdf.format()
    }

    /// Current vertical offset (mm).
    pub fn cursor(&self) -> f32 {
        self.cursor.y()
    }

    /// Pages so far.
    pub fn page_count(&self) -> usize {
        self.pdf.page_count()
    }

    /// Start a new page and move the cursor to its top.
    pub fn new_page(&mut self) -> Result<()> {
        self.pdf.add_page()?;
        self.cursor.reset(&self.format());
        Ok(())
    }

    /// Break the page unless `height` fits below the cursor. A cursor at the
    /// top of a page never breaks.
    pub fn ensure_room(&mut self, height: f32) -> Result<()> {
        let format = self.format();
        if !self.cursor.fits(height, &format) && self.cursor.y() > format.top() {
            self.new_page()?;
        }
        Ok(())
    }

    /// Place a raster across the printable width, slicing it over as many
    /// pages as needed.
    pub fn place_raster(&mut self, image: &RgbaImage) -> Result<()> {
        let format = self.format();
        let (w_px, h_px) = image.dimensions();
        if w_px == 0 || h_px == 0 {
            return Ok(());
        }

        let width = format.printable_width();
        let height = h_px as f32 * width / w_px as f32;
        let plan = plan_slices(height, h_px, self.cursor.y(), &format);
        log::debug!(
            "placing raster {}x{} px as {:.1} mm in {} slices",
            w_px,
            h_px,
            height,
            plan.slices.len()
        );

        for slice in &plan.slices {
            if slice.new_page {
                self.pdf.add_page()?;
            }
            let band = imageops::crop_imm(image, 0, slice.src_top, w_px, slice.src_height).to_image();
            let rgb = DynamicImage::ImageRgba8(band).to_rgb8();
            self.pdf
                .image(&rgb, format.margin, slice.y, width, slice.height)?;
        }
        self.cursor.set(plan.cursor, &format);
        Ok(())
    }

    /// Place a picture at a fixed printed width, keeping its aspect ratio.
    /// Pictures taller than the room left start a new page; pictures taller
    /// than a page are sliced.
    pub fn place_picture(&mut self, image: &RgbaImage, width_mm: f32) -> Result<()> {
        let format = self.format();
        let (w_px, h_px) = image.dimensions();
        if w_px == 0 || h_px == 0 {
            return Ok(());
        }
        let width = width_mm.clamp(1.0, format.printable_width());
        if width >= format.printable_width() {
            return self.place_raster(image);
        }

        let height = h_px as f32 * width / w_px as f32;
        if height > format.printable_height() {
            return self.place_raster(image);
        }
        self.ensure_room(height)?;
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        self.pdf
            .image(&rgb, format.margin, self.cursor.y(), width, height)?;
        self.cursor.advance(height + BLOCK_GAP, &format);
        Ok(())
    }

    /// Bold caption line; breaks the page when less than
    /// [`CAPTION_MIN_ROOM`] is left.
    pub fn caption(&mut self, text: &str) -> Result<()> {
        let format = self.format();
        if self.cursor.remaining(&format) < CAPTION_MIN_ROOM {
            self.new_page()?;
        }
        self.lines(text, CAPTION_SIZE, true)?;
        self.cursor.advance(1.0, &format);
        Ok(())
    }

    /// Bold heading.
    pub fn heading(&mut self, text: &str) -> Result<()> {
        self.lines(text, HEADING_SIZE, true)?;
        let format = self.format();
        self.cursor.advance(BLOCK_GAP, &format);
        Ok(())
    }

    /// Wrapped body text.
    pub fn paragraph(&mut self, text: &str) -> Result<()> {
        self.lines(text, BODY_SIZE, false)?;
        let format = self.format();
        self.cursor.advance(BLOCK_GAP, &format);
        Ok(())
    }

    /// `Label: value` lines with bold labels.
    pub fn fields(&mut self, fields: &[(String, String)]) -> Result<()> {
        let format = self.format();
        let line = pt_to_mm(BODY_SIZE) * LINE_SPACING;
        let ascent = pt_to_mm(BODY_SIZE) * 0.8;

        for (label, value) in fields {
            let label = format!("{}:", label.trim_end_matches(':'));
            let label_width = text_width(&label, BODY_SIZE, true) + 2.0;
            let value_width = (format.printable_width() - label_width).max(10.0);
            let wrapped = wrap_text(value, BODY_SIZE, false, value_width);

            for (i, part) in wrapped.iter().enumerate() {
                self.ensure_room(line)?;
                let baseline = self.cursor.y() + ascent;
                if i == 0 {
                    self.pdf
                        .text(format.margin, baseline, &label, BODY_SIZE, true, TEXT_COLOR);
                }
                self.pdf.text(
                    format.margin + label_width,
                    baseline,
                    part,
                    BODY_SIZE,
                    false,
                    TEXT_COLOR,
                );
                self.cursor.advance(line, &format);
            }
        }
        self.cursor.advance(BLOCK_GAP, &format);
        Ok(())
    }

    /// Vertical gap; breaks the page when the gap does not fit.
    pub fn spacer(&mut self, mm: f32) -> Result<()> {
        let format = self.format();
        if self.cursor.fits(mm, &format) {
            self.cursor.advance(mm, &format);
        } else {
            self.new_page()?;
        }
        Ok(())
    }

    /// Optional caption followed by a paginated table.
    pub fn table(&mut self, grid: &TableGrid, caption: Option<&str>) -> Result<()> {
        if let Some(caption) = caption.filter(|c| !c.trim().is_empty()) {
            self.caption(caption.trim())?;
        }
        if grid.is_empty() {
            return Ok(());
        }
        let y = TableWriter::new(&mut self.pdf, &self.table_style).write(grid, self.cursor.y())?;
        let format = self.format();
        self.cursor.set(y, &format);
        Ok(())
    }

    fn lines(&mut self, text: &str, size: f32, bold: bool) -> Result<()> {
        let format = self.format();
        let line = pt_to_mm(size) * LINE_SPACING;
        let ascent = pt_to_mm(size) * 0.8;
        for part in wrap_text(text, size, bold, format.printable_width()) {
            self.ensure_room(line)?;
            self.pdf.text(
                format.margin,
                self.cursor.y() + ascent,
                &part,
                size,
                bold,
                TEXT_COLOR,
            );
            self.cursor.advance(line, &format);
        }
        Ok(())
    }

    /// Serialize the document.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.pdf.finish()
    }
}
