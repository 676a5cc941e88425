//! Page geometry, the running cursor and raster slice planning.

use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// Leftover image height below which no further slice is emitted.
pub const SLICE_TOLERANCE_MM: f32 = 0.5;

/// Page orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Tall pages
    #[default]
    Portrait,
    /// Wide pages
    Landscape,
}

impl Orientation {
    /// Parse `portrait`/`p` or `landscape`/`l`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" | "p" => Some(Orientation::Portrait),
            "landscape" | "l" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

/// Fixed page size with uniform margins, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFormat {
    /// Page width
    pub width: f32,
    /// Page height
    pub height: f32,
    /// Uniform margin
    pub margin: f32,
}

impl PageFormat {
    /// A4 short edge.
    pub const A4_SHORT: f32 = 210.0;
    /// A4 long edge.
    pub const A4_LONG: f32 = 297.0;

    /// A4 page in the given orientation.
    pub fn a4(orientation: Orientation, margin: f32) -> Self {
        let (width, height) = match orientation {
            Orientation::Portrait => (Self::A4_SHORT, Self::A4_LONG),
            Orientation::Landscape => (Self::A4_LONG, Self::A4_SHORT),
        };
        Self {
            width,
            height,
            margin,
        }
    }

    /// Orientation implied by the page dimensions.
    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Top of the printable area.
    pub fn top(&self) -> f32 {
        self.margin
    }

    /// Bottom of the printable area.
    pub fn bottom(&self) -> f32 {
        self.height - self.margin
    }

    /// Width between the side margins.
    pub fn printable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Height between the top and bottom margins.
    pub fn printable_height(&self) -> f32 {
        self.bottom() - self.top()
    }

    /// Page width in points.
    pub fn width_pt(&self) -> f32 {
        self.width * MM_TO_PT
    }

    /// Page height in points.
    pub fn height_pt(&self) -> f32 {
        self.height * MM_TO_PT
    }
}

/// Vertical write position on the current page.
///
/// Never exceeds [`PageFormat::bottom`]; callers start a new page and
/// [`reset`](Self::reset) when content would overflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    y: f32,
}

impl PageCursor {
    /// Cursor at the top margin.
    pub fn top(format: &PageFormat) -> Self {
        Self { y: format.top() }
    }

    /// Current offset from the top edge.
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Room left above the bottom margin.
    pub fn remaining(&self, format: &PageFormat) -> f32 {
        (format.bottom() - self.y).max(0.0)
    }

    /// Whether `height` fits on the current page.
    pub fn fits(&self, height: f32, format: &PageFormat) -> bool {
        self.y + height <= format.bottom()
    }

    /// Move down, clamped to the bottom margin.
    pub fn advance(&mut self, dy: f32, format: &PageFormat) {
        self.y = (self.y + dy).min(format.bottom());
    }

    /// Jump to an absolute offset, clamped to the printable area.
    pub fn set(&mut self, y: f32, format: &PageFormat) {
        self.y = y.clamp(format.top(), format.bottom());
    }

    /// Back to the top margin (after a page break).
    pub fn reset(&mut self, format: &PageFormat) {
        self.y = format.top();
    }
}

/// One horizontal band of a raster placed on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    /// Start a new page before placing this slice
    pub new_page: bool,
    /// Placement offset from the page top
    pub y: f32,
    /// Printed height
    pub height: f32,
    /// First source pixel row
    pub src_top: u32,
    /// Source pixel rows
    pub src_height: u32,
}

/// Slices for one raster and the cursor position after the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePlan {
    /// Slices in placement order
    pub slices: Vec<Slice>,
    /// Cursor after placement
    pub cursor: f32,
}

impl SlicePlan {
    /// Total printed height.
    pub fn total_height(&self) -> f32 {
        self.slices.iter().map(|s| s.height).sum()
    }

    /// Number of page breaks the plan introduces.
    pub fn page_breaks(&self) -> usize {
        self.slices.iter().filter(|s| s.new_page).count()
    }
}

/// Plan how a raster `image_height` mm tall (`px_height` source rows) is cut
/// across pages, starting at cursor `start`.
///
/// Each slice takes the smaller of the room left on the page and the image
/// left to place. Image left over after a slice goes to a fresh page.
pub fn plan_slices(image_height: f32, px_height: u32, start: f32, format: &PageFormat) -> SlicePlan {
    let mut cursor = PageCursor::top(format);
    cursor.set(start, format);
    let mut slices = Vec::new();

    if image_height <= 0.0 || px_height == 0 || format.printable_height() <= 0.0 {
        return SlicePlan {
            slices,
            cursor: cursor.y(),
        };
    }

    let px_per_mm = px_height as f32 / image_height;
    let mut placed = 0.0_f32;

    while image_height - placed > SLICE_TOLERANCE_MM {
        let mut new_page = false;
        if cursor.remaining(format) <= SLICE_TOLERANCE_MM {
            cursor.reset(format);
            new_page = true;
        }

        let height = cursor.remaining(format).min(image_height - placed);
        let src_top = ((placed * px_per_mm).round() as u32).min(px_height - 1);
        let src_end = (((placed + height) * px_per_mm).round() as u32).min(px_height);
        let src_height = src_end.saturating_sub(src_top).max(1);

        slices.push(Slice {
            new_page,
            y: cursor.y(),
            height,
            src_top,
            src_height,
        });

        cursor.advance(height, format);
        placed += height;
    }

    SlicePlan {
        slices,
        cursor: cursor.y(),
    }
}
