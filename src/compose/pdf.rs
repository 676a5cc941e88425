//! In-memory PDF writer on top of the `lopdf` object model.
//!
//! Coordinates are millimetres from the top-left corner of the page; the
//! writer converts to PDF user space (points, bottom-left origin).

use super::page::{PageFormat, MM_TO_PT};
use super::text::encode_win_ansi;
use crate::error::Result;
use crate::model::Color;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// Operations and image resources of the page being written.
#[derive(Default)]
struct PageContent {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// Builds a PDF document page by page.
///
/// A first page is open as soon as the writer exists.
pub struct PdfWriter {
    document: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    page_ids: Vec<ObjectId>,
    format: PageFormat,
    current: PageContent,
    image_count: usize,
    title: Option<String>,
}

impl PdfWriter {
    /// Start a document with fixed-size pages.
    pub fn new(format: PageFormat) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();

        let regular_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let fonts_id = document.add_object(dictionary! {
            FONT_REGULAR => regular_id,
            FONT_BOLD => bold_id,
        });

        Self {
            document,
            pages_id,
            fonts_id,
            page_ids: Vec::new(),
            format,
            current: PageContent::default(),
            image_count: 0,
            title: None,
        }
    }

    /// Set the document title written to the info dictionary.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Page geometry.
    pub fn format(&self) -> &PageFormat {
        &self.format
    }

    /// Pages written so far, including the open one.
    pub fn page_count(&self) -> usize {
        self.page_ids.len() + 1
    }

    /// Close the current page and open a new one.
    pub fn add_page(&mut self) -> Result<()> {
        let content = std::mem::take(&mut self.current);
        self.flush_page(content)?;
        Ok(())
    }

    fn flush_page(&mut self, content: PageContent) -> Result<()> {
        let encoded = Content {
            operations: content.operations,
        }
        .encode()?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&encoded)?;
        let compressed = encoder.finish()?;
        let content_id = self
            .document
            .add_object(Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed));

        let resources = dictionary! {
            "Font" => self.fonts_id,
            "XObject" => content.xobjects,
        };
        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.format.width_pt().into(),
                self.format.height_pt().into(),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.current
            .operations
            .push(Operation::new(operator, operands));
    }

    fn to_pdf_y(&self, y: f32) -> f32 {
        (self.format.height - y) * MM_TO_PT
    }

    fn set_fill(&mut self, color: Color) {
        let [r, g, b] = color.to_unit();
        self.push("rg", vec![r.into(), g.into(), b.into()]);
    }

    /// Fill a rectangle whose top-left corner is at (`x`, `y`).
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.set_fill(color);
        let bottom = self.to_pdf_y(y + height);
        self.push(
            "re",
            vec![
                (x * MM_TO_PT).into(),
                bottom.into(),
                (width * MM_TO_PT).into(),
                (height * MM_TO_PT).into(),
            ],
        );
        self.push("f", vec![]);
    }

    /// Stroke a rectangle outline.
    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color, line_width: f32) {
        let [r, g, b] = color.to_unit();
        self.push("w", vec![(line_width * MM_TO_PT).into()]);
        self.push("RG", vec![r.into(), g.into(), b.into()]);
        let bottom = self.to_pdf_y(y + height);
        self.push(
            "re",
            vec![
                (x * MM_TO_PT).into(),
                bottom.into(),
                (width * MM_TO_PT).into(),
                (height * MM_TO_PT).into(),
            ],
        );
        self.push("S", vec![]);
    }

    /// Draw one line of text with its baseline at `baseline`.
    pub fn text(&mut self, x: f32, baseline: f32, text: &str, size: f32, bold: bool, color: Color) {
        if text.is_empty() {
            return;
        }
        let font = if bold { FONT_BOLD } else { FONT_REGULAR };
        let y = self.to_pdf_y(baseline);
        self.set_fill(color);
        self.push("BT", vec![]);
        self.push("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]);
        self.push("Td", vec![(x * MM_TO_PT).into(), y.into()]);
        self.push("Tj", vec![Object::string_literal(encode_win_ansi(text))]);
        self.push("ET", vec![]);
    }

    /// Place an RGB raster scaled into the given box.
    pub fn image(&mut self, image: &RgbImage, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(image.as_raw())?;
        let data = encoder.finish()?;

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            data,
        );
        let image_id = self.document.add_object(stream);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.current.xobjects.set(name.as_bytes(), image_id);

        let bottom = self.to_pdf_y(y + height);
        self.push("q", vec![]);
        self.push(
            "cm",
            vec![
                (width * MM_TO_PT).into(),
                0.into(),
                0.into(),
                (height * MM_TO_PT).into(),
                (x * MM_TO_PT).into(),
                bottom.into(),
            ],
        );
        self.push("Do", vec![Object::Name(name.into_bytes())]);
        self.push("Q", vec![]);
        Ok(())
    }

    /// Close the last page and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let content = std::mem::take(&mut self.current);
        self.flush_page(content)?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::from(*id)).collect();
        let page_count = self.page_ids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let mut info = dictionary! {
            "Producer" => Object::string_literal(concat!("fieldpdf ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(created),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(encode_win_ansi(title)));
        }
        let info_id = self.document.add_object(info);
        self.document.trailer.set("Info", info_id);

        log::debug!(
            "PDF finished: {} pages, {} images",
            self.page_ids.len(),
            self.image_count
        );

        let mut buffer = Vec::new();
        self.document.save_to(&mut buffer)?;
        Ok(buffer)
    }
}
