//! Raster backends for image segments.
//!
//! A [`Rasterizer`] turns an [`OffscreenContainer`] (cloned nodes at a fixed
//! CSS width) into pixels. Browser or WebView adapters implement the trait
//! outside this crate; [`DraftRasterizer`] is the bundled headless backend.

use super::text::{em_width, wrap_measured};
use crate::error::{Error, Result};
use crate::model::{Color, Node, NodeKind};
use async_trait::async_trait;
use base64::Engine;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

/// Default capture width (A4 at 96 dpi).
pub const DEFAULT_CAPTURE_WIDTH: f32 = 794.0;

/// Largest RGBA buffer a capture may allocate (1 GiB).
pub const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// Byte size of a `width` x `height` RGBA buffer when within [`MAX_CANVAS_BYTES`].
fn canvas_bytes(width: u32, height: u32) -> Option<u64> {
    u64::from(width)
        .checked_mul(u64::from(height))?
        .checked_mul(4)
        .filter(|bytes| *bytes <= MAX_CANVAS_BYTES)
}

/// Detached copy of nodes laid out at a fixed width.
///
/// Owned by one capture and dropped once it has been placed.
#[derive(Debug, Clone)]
pub struct OffscreenContainer {
    /// Layout width in CSS pixels
    pub width: f32,

    /// Device pixels per CSS pixel
    pub scale: f32,

    /// Cloned content, in visual order
    pub nodes: Vec<Node>,
}

impl OffscreenContainer {
    /// Wrap cloned nodes in a container of the given width.
    pub fn new(nodes: Vec<Node>, width: f32, scale: f32) -> Self {
        Self { width, scale, nodes }
    }

    /// Replace gradient-clipped text with a flat colour.
    ///
    /// Returns the number of nodes rewritten.
    pub fn flatten_gradient_text(&mut self, color: Color) -> usize {
        fn walk(node: &mut Node, color: Color) -> usize {
            let mut count = 0;
            if node.style.gradient_text {
                node.style.gradient_text = false;
                node.style.background = None;
                node.style.color = Some(color);
                count += 1;
            }
            count + node.children.iter_mut().map(|c| walk(c, color)).sum::<usize>()
        }
        self.nodes.iter_mut().map(|n| walk(n, color)).sum()
    }

    /// Pixel width of the rasterized output.
    pub fn pixel_width(&self) -> u32 {
        ((self.width * self.scale).round() as u32).max(1)
    }
}

/// Captures offscreen content as pixels.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Resolve once every font used by the page is loaded.
    async fn fonts_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Render the container to an RGBA image `container.pixel_width()` wide.
    async fn rasterize(&self, container: &OffscreenContainer) -> Result<RgbaImage>;
}

const TEXT_COLOR: Color = Color::rgb(33, 33, 33);
const INPUT_BORDER: Color = Color::rgb(190, 190, 190);
const LINE_HEIGHT: f32 = 1.3;

/// Headless block-layout rasterizer.
///
/// Nodes stack vertically; row children share the row width. Text is drawn
/// as ink bars sized from Helvetica metrics, which keeps page geometry and
/// colour right without a font rasterizer.
#[derive(Debug, Clone, Default)]
pub struct DraftRasterizer;

impl DraftRasterizer {
    /// Create the rasterizer.
    pub fn new() -> Self {
        Self
    }

    /// Render synchronously.
    pub fn render(&self, container: &OffscreenContainer) -> Result<RgbaImage> {
        let width = container.width;
        let height: f32 = container.nodes.iter().map(|n| measure(n, width)).sum();

        let px_width = container.pixel_width();
        let px_height = ((height * container.scale).round() as u32).max(1);
        if canvas_bytes(px_width, px_height).is_none() {
            return Err(Error::Rasterize(format!(
                "capture of {}x{} px exceeds the {} byte canvas limit",
                px_width, px_height, MAX_CANVAS_BYTES
            )));
        }
        let mut canvas = Canvas {
            image: RgbaImage::from_pixel(px_width, px_height, Rgba([255, 255, 255, 255])),
            scale: container.scale,
        };

        let mut y = 0.0;
        for node in &container.nodes {
            y += paint(node, &mut canvas, 0.0, y, width)?;
        }
        log::debug!(
            "rasterized {} nodes to {}x{} px",
            container.nodes.len(),
            canvas.image.width(),
            canvas.image.height()
        );
        Ok(canvas.image)
    }
}

#[async_trait]
impl Rasterizer for DraftRasterizer {
    async fn rasterize(&self, container: &OffscreenContainer) -> Result<RgbaImage> {
        self.render(container)
    }
}

fn font_size(node: &Node) -> f32 {
    node.style.font_size.unwrap_or(match node.kind {
        NodeKind::Heading => 20.0,
        NodeKind::Cell | NodeKind::HeaderCell => 13.0,
        _ => 14.0,
    })
}

fn is_bold(node: &Node) -> bool {
    node.style.bold || matches!(node.kind, NodeKind::Heading | NodeKind::HeaderCell)
}

fn padding(node: &Node) -> f32 {
    node.style.padding.unwrap_or(match node.kind {
        NodeKind::Input | NodeKind::Cell | NodeKind::HeaderCell => 4.0,
        _ => 0.0,
    })
}

fn border(node: &Node) -> Option<Color> {
    node.style.border.or(match node.kind {
        NodeKind::Input => Some(INPUT_BORDER),
        _ => None,
    })
}

fn text_lines(node: &Node, width: f32) -> Vec<String> {
    match node.own_text() {
        Some(text) if !text.trim().is_empty() => {
            let size = font_size(node);
            let bold = is_bold(node);
            wrap_measured(text, width, |s| em_width(s, bold) * size)
        }
        _ => Vec::new(),
    }
}

pub(crate) fn decode_image(src: &str) -> Result<DynamicImage> {
    let data = src.split_once("base64,").map(|(_, d)| d).unwrap_or(src);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| Error::Rasterize(format!("invalid image data: {}", e)))?;
    Ok(image::load_from_memory(&bytes)?)
}

fn image_height(node: &Node, width: f32) -> f32 {
    let Some(src) = node.src.as_deref() else {
        return 0.0;
    };
    match decode_image(src) {
        Ok(img) if img.width() > 0 => width * img.height() as f32 / img.width() as f32,
        Ok(_) => 0.0,
        Err(e) => {
            log::warn!("skipping undecodable image: {}", e);
            0.0
        }
    }
}

fn is_row(node: &Node) -> bool {
    node.kind == NodeKind::Row
}

/// Layout height of a node in CSS pixels.
fn measure(node: &Node, width: f32) -> f32 {
    if node.is_hidden() {
        return 0.0;
    }
    if let Some(height) = node.style.height {
        return height;
    }

    let width = node.style.width.map_or(width, |w| w.min(width));
    let pad = padding(node);
    let inner = (width - 2.0 * pad).max(1.0);

    let own = if node.kind == NodeKind::Image {
        image_height(node, inner)
    } else {
        text_lines(node, inner).len() as f32 * font_size(node) * LINE_HEIGHT
    };

    let children = if is_row(node) {
        let visible: Vec<&Node> = node.children.iter().filter(|c| !c.is_hidden()).collect();
        let cell_width = inner / visible.len().max(1) as f32;
        visible
            .iter()
            .map(|c| measure(c, cell_width))
            .fold(0.0, f32::max)
    } else {
        node.children.iter().map(|c| measure(c, inner)).sum()
    };

    own + children + 2.0 * pad
}

struct Canvas {
    image: RgbaImage,
    scale: f32,
}

impl Canvas {
    fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let x0 = (x * self.scale).round().max(0.0) as u32;
        let y0 = (y * self.scale).round().max(0.0) as u32;
        let x1 = (((x + width) * self.scale).round().max(0.0) as u32).min(self.image.width());
        let y1 = (((y + height) * self.scale).round().max(0.0) as u32).min(self.image.height());
        let pixel = Rgba([color.r, color.g, color.b, 255]);
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px, py, pixel);
            }
        }
    }

    fn outline(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.fill(x, y, width, 1.0, color);
        self.fill(x, y + height - 1.0, width, 1.0, color);
        self.fill(x, y, 1.0, height, color);
        self.fill(x + width - 1.0, y, 1.0, height, color);
    }

    fn picture(&mut self, picture: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
        let w = (width * self.scale).round() as u32;
        let h = (height * self.scale).round() as u32;
        if w == 0 || h == 0 || canvas_bytes(w, h).is_none() {
            return;
        }
        let scaled = imageops::resize(&picture.to_rgba8(), w, h, FilterType::Triangle);
        imageops::overlay(
            &mut self.image,
            &scaled,
            (x * self.scale).round() as i64,
            (y * self.scale).round() as i64,
        );
    }
}

/// Paint a node at (`x`, `y`) and return its height.
fn paint(node: &Node, canvas: &mut Canvas, x: f32, y: f32, width: f32) -> Result<f32> {
    let height = measure(node, width);
    if height <= 0.0 {
        return Ok(0.0);
    }

    let width = node.style.width.map_or(width, |w| w.min(width));
    if let Some(background) = node.style.background {
        canvas.fill(x, y, width, height, background);
    }
    if let Some(color) = border(node) {
        canvas.outline(x, y, width, height, color);
    }

    let pad = padding(node);
    let inner = (width - 2.0 * pad).max(1.0);
    let mut cursor = y + pad;

    if node.kind == NodeKind::Image {
        if let Some(src) = node.src.as_deref() {
            let picture_height = image_height(node, inner);
            if picture_height > 0.0 {
                let picture = decode_image(src)?;
                canvas.picture(&picture, x + pad, cursor, inner, picture_height);
            }
            cursor += picture_height;
        }
    } else {
        let size = font_size(node);
        let bold = is_bold(node);
        // Gradient-clipped text that was not flattened renders as its background box
        let ink = if node.style.gradient_text {
            node.style.background.unwrap_or(Color::WHITE)
        } else {
            node.style.color.unwrap_or(TEXT_COLOR)
        };
        for line in text_lines(node, inner) {
            let line_width = em_width(&line, bold) * size;
            let bar = size * if bold { 0.62 } else { 0.5 };
            canvas.fill(x + pad, cursor + (size * LINE_HEIGHT - bar) / 2.0, line_width, bar, ink);
            cursor += size * LINE_HEIGHT;
        }
    }

    if is_row(node) {
        let visible: Vec<&Node> = node.children.iter().filter(|c| !c.is_hidden()).collect();
        let cell_width = inner / visible.len().max(1) as f32;
        for (i, child) in visible.iter().enumerate() {
            paint(child, canvas, x + pad + i as f32 * cell_width, cursor, cell_width)?;
        }
    } else {
        for child in &node.children {
            cursor += paint(child, canvas, x + pad, cursor, inner)?;
        }
    }

    Ok(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Display, Style};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_output_width_follows_scale() {
        let container = OffscreenContainer::new(vec![Node::text("Pozo YPF-101")], 400.0, 2.0);
        let image = DraftRasterizer::new().render(&container).unwrap();
        assert_eq!(image.width(), 800);
        assert!(image.height() > 0);
    }

    #[test]
    fn test_empty_container_is_one_pixel_tall() {
        let container = OffscreenContainer::new(Vec::new(), 100.0, 2.0);
        let image = DraftRasterizer::new().render(&container).unwrap();
        assert_eq!(image.dimensions(), (200, 1));
    }

    #[test]
    fn test_hidden_nodes_take_no_space() {
        let hidden = Node::text("oculto").with_style(Style {
            display: Some(Display::None),
            ..Default::default()
        });
        let visible = Node::text("visible");
        assert_eq!(measure(&hidden, 300.0), 0.0);

        let one = OffscreenContainer::new(vec![visible.clone()], 300.0, 1.0);
        let two = OffscreenContainer::new(vec![visible, hidden], 300.0, 1.0);
        let r = DraftRasterizer::new();
        assert_eq!(r.render(&one).unwrap().height(), r.render(&two).unwrap().height());
    }

    #[test]
    fn test_fixed_height_and_background() {
        let node = Node::block().with_style(Style {
            height: Some(50.0),
            background: Some(Color::rgb(255, 0, 0)),
            ..Default::default()
        });
        let image = DraftRasterizer::new()
            .render(&OffscreenContainer::new(vec![node], 100.0, 1.0))
            .unwrap();
        assert_eq!(image.height(), 50);
        assert_eq!(image.get_pixel(50, 25), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_oversized_capture_is_an_error() {
        let node = Node::block().with_style(Style {
            height: Some(1.0e9),
            ..Default::default()
        });
        let err = DraftRasterizer::new()
            .render(&OffscreenContainer::new(vec![node], 794.0, 2.0))
            .unwrap_err();
        assert!(matches!(err, Error::Rasterize(_)));
    }

    #[test]
    fn test_canvas_budget() {
        assert_eq!(canvas_bytes(1588, 1000), Some(6_352_000));
        assert_eq!(canvas_bytes(u32::MAX, u32::MAX), None);
        assert_eq!(canvas_bytes(1588, 200_000), None);
    }

    #[test]
    fn test_embedded_image_keeps_aspect() {
        let mut node = Node::new(NodeKind::Image);
        node.src = Some(format!("data:image/png;base64,{}", png_base64(20, 10)));
        let image = DraftRasterizer::new()
            .render(&OffscreenContainer::new(vec![node], 200.0, 1.0))
            .unwrap();
        assert_eq!(image.height(), 100);
        assert_eq!(image.get_pixel(100, 50), &Rgba([0, 128, 255, 255]));
    }

    #[test]
    fn test_flatten_gradient_text() {
        let gradient = Style {
            gradient_text: true,
            background: Some(Color::rgb(10, 200, 10)),
            ..Default::default()
        };
        let mut container = OffscreenContainer::new(
            vec![Node::block()
                .with_child(Node::heading("Parte diario").with_style(gradient.clone()))
                .with_child(Node::text("x").with_style(gradient))],
            300.0,
            2.0,
        );
        assert_eq!(container.flatten_gradient_text(Color::rgb(40, 40, 40)), 2);
        let heading = &container.nodes[0].children[0];
        assert!(!heading.style.gradient_text);
        assert_eq!(heading.style.color, Some(Color::rgb(40, 40, 40)));
        assert_eq!(container.flatten_gradient_text(Color::BLACK), 0);
    }

    #[test]
    fn test_row_height_is_tallest_cell() {
        let row = Node::new(NodeKind::Row)
            .with_child(Node::block().with_style(Style {
                height: Some(30.0),
                ..Default::default()
            }))
            .with_child(Node::block().with_style(Style {
                height: Some(70.0),
                ..Default::default()
            }));
        assert_eq!(measure(&row, 400.0), 70.0);
    }
}
