//! Paginating auto-layout table writer.

use super::page::PageCursor;
use super::pdf::PdfWriter;
use super::text::{pt_to_mm, text_width, wrap_text};
use crate::error::Result;
use crate::model::{Color, TableGrid};

/// Visual settings for tables.
#[derive(Debug, Clone)]
pub struct TableStyle {
    /// Cell font size in points
    pub font_size: f32,

    /// Inner cell padding (mm)
    pub cell_padding: f32,

    /// Line height as a multiple of the font size
    pub line_height: f32,

    /// Header background
    pub header_fill: Color,

    /// Header text colour
    pub header_text: Color,

    /// Body text colour
    pub body_text: Color,

    /// Background of every other body row
    pub stripe_fill: Color,

    /// Cell border colour
    pub border: Color,

    /// Gap left below the table (mm)
    pub gap_after: f32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_size: 8.0,
            cell_padding: 1.5,
            line_height: 1.15,
            header_fill: Color::rgb(41, 41, 41),
            header_text: Color::WHITE,
            body_text: Color::rgb(20, 20, 20),
            stripe_fill: Color::rgb(245, 245, 245),
            border: Color::rgb(200, 200, 200),
            gap_after: 4.0,
        }
    }
}

impl TableStyle {
    fn line_mm(&self) -> f32 {
        pt_to_mm(self.font_size) * self.line_height
    }
}

/// Column widths that fill `available` mm.
///
/// Columns start at their longest unbreakable word; leftover room goes to
/// columns in proportion to how much wider their content wants to be.
pub fn column_widths(grid: &TableGrid, style: &TableStyle, available: f32) -> Vec<f32> {
    let columns = grid.column_count();
    if columns == 0 {
        return Vec::new();
    }

    let pad = 2.0 * style.cell_padding;
    let mut natural = vec![pad; columns];
    let mut minimum = vec![pad; columns];

    let rows = grid
        .head
        .iter()
        .map(|r| (r, true))
        .chain(grid.body.iter().map(|r| (r, false)));
    for (row, bold) in rows {
        for (i, cell) in row.iter().enumerate() {
            let full = text_width(cell, style.font_size, bold) + pad;
            let word = cell
                .split_whitespace()
                .map(|w| text_width(w, style.font_size, bold))
                .fold(0.0_f32, f32::max)
                + pad;
            natural[i] = natural[i].max(full);
            minimum[i] = minimum[i].max(word);
        }
    }

    let natural_total: f32 = natural.iter().sum();
    let minimum_total: f32 = minimum.iter().sum();

    if natural_total <= available {
        let scale = available / natural_total;
        return natural.iter().map(|w| w * scale).collect();
    }
    if minimum_total >= available {
        let scale = available / minimum_total;
        return minimum.iter().map(|w| w * scale).collect();
    }

    let extra = available - minimum_total;
    let wanted: f32 = natural.iter().zip(&minimum).map(|(n, m)| n - m).sum();
    minimum
        .iter()
        .zip(&natural)
        .map(|(m, n)| m + extra * (n - m) / wanted)
        .collect()
}

struct LaidOutRow {
    lines: Vec<Vec<String>>,
    height: f32,
}

fn lay_out_row(row: &[String], widths: &[f32], style: &TableStyle, bold: bool) -> LaidOutRow {
    let lines: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let text = row.get(i).map(String::as_str).unwrap_or("");
            wrap_text(text, style.font_size, bold, width - 2.0 * style.cell_padding)
        })
        .collect();
    let max_lines = lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
    LaidOutRow {
        lines,
        height: max_lines as f32 * style.line_mm() + 2.0 * style.cell_padding,
    }
}

/// Writes a [`TableGrid`] across as many pages as it needs.
pub struct TableWriter<'a> {
    pdf: &'a mut PdfWriter,
    style: &'a TableStyle,
}

impl<'a> TableWriter<'a> {
    /// Create a writer drawing into `pdf`.
    pub fn new(pdf: &'a mut PdfWriter, style: &'a TableStyle) -> Self {
        Self { pdf, style }
    }

    /// Draw the grid starting at `start_y` and return the cursor below it
    /// (gap included). The header is repeated on every page the table spans.
    pub fn write(mut self, grid: &TableGrid, start_y: f32) -> Result<f32> {
        let format = *self.pdf.format();
        let mut cursor = PageCursor::top(&format);
        cursor.set(start_y, &format);

        if grid.is_empty() {
            return Ok(cursor.y());
        }

        let widths = column_widths(grid, self.style, format.printable_width());
        let header: Vec<LaidOutRow> = grid
            .head
            .iter()
            .map(|row| lay_out_row(row, &widths, self.style, true))
            .collect();
        let header_height: f32 = header.iter().map(|r| r.height).sum();
        let body: Vec<LaidOutRow> = grid
            .body
            .iter()
            .map(|row| lay_out_row(row, &widths, self.style, false))
            .collect();

        // Keep the header together with at least the first body row
        let first_block = header_height + body.first().map(|r| r.height).unwrap_or(0.0);
        if !cursor.fits(first_block, &format) && cursor.y() > format.top() {
            self.pdf.add_page()?;
            cursor.reset(&format);
        }
        self.draw_header(&header, &widths, &mut cursor)?;

        for (index, row) in body.iter().enumerate() {
            if !cursor.fits(row.height, &format) && cursor.y() > format.top() + header_height {
                self.pdf.add_page()?;
                cursor.reset(&format);
                self.draw_header(&header, &widths, &mut cursor)?;
            }
            if !cursor.fits(row.height, &format) {
                log::warn!("table row {} taller than a page, clipping", index);
            }
            let fill = (index % 2 == 1).then_some(self.style.stripe_fill);
            self.draw_row(row, &widths, cursor.y(), fill, self.style.body_text, false);
            cursor.advance(row.height, &format);
        }

        cursor.advance(self.style.gap_after, &format);
        Ok(cursor.y())
    }

    fn draw_header(&mut self, header: &[LaidOutRow], widths: &[f32], cursor: &mut PageCursor) -> Result<()> {
        let format = *self.pdf.format();
        for row in header {
            self.draw_row(
                row,
                widths,
                cursor.y(),
                Some(self.style.header_fill),
                self.style.header_text,
                true,
            );
            cursor.advance(row.height, &format);
        }
        Ok(())
    }

    fn draw_row(&mut self, row: &LaidOutRow, widths: &[f32], y: f32, fill: Option<Color>, text: Color, bold: bool) {
        let style = self.style;
        let mut x = self.pdf.format().margin;
        let line = style.line_mm();
        let ascent = pt_to_mm(style.font_size) * 0.8;

        for (lines, width) in row.lines.iter().zip(widths) {
            if let Some(fill) = fill {
                self.pdf.fill_rect(x, y, *width, row.height, fill);
            }
            self.pdf.stroke_rect(x, y, *width, row.height, style.border, 0.1);
            for (i, content) in lines.iter().enumerate() {
                let baseline = y + style.cell_padding + ascent + i as f32 * line;
                self.pdf
                    .text(x + style.cell_padding, baseline, content, style.font_size, bold, text);
            }
            x += width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{Orientation, PageFormat};

    fn grid(rows: usize, columns: usize) -> TableGrid {
        let head = vec![(0..columns).map(|c| format!("Col {}", c)).collect()];
        let body = (0..rows)
            .map(|r| (0..columns).map(|c| format!("r{} c{}", r, c)).collect())
            .collect();
        TableGrid::new(head, body)
    }

    #[test]
    fn test_column_widths_fill_page() {
        let style = TableStyle::default();
        let widths = column_widths(&grid(2, 3), &style, 190.0);
        assert_eq!(widths.len(), 3);
        let total: f32 = widths.iter().sum();
        assert!((total - 190.0).abs() < 0.01);
    }

    #[test]
    fn test_column_widths_long_text_gets_more_room() {
        let style = TableStyle::default();
        let long = "observaciones muy largas sobre la operación del equipo ".repeat(6);
        let grid = TableGrid::new(
            vec![vec!["N".into(), "Detalle".into()]],
            vec![vec!["1".into(), long]],
        );
        let widths = column_widths(&grid, &style, 190.0);
        assert!(widths[1] > widths[0] * 3.0);
        assert!((widths.iter().sum::<f32>() - 190.0).abs() < 0.01);
    }

    #[test]
    fn test_short_table_stays_on_page() {
        let style = TableStyle::default();
        let mut pdf = PdfWriter::new(PageFormat::a4(Orientation::Portrait, 10.0));
        let end = TableWriter::new(&mut pdf, &style).write(&grid(2, 3), 10.0).unwrap();
        assert_eq!(pdf.page_count(), 1);
        assert!(end > 10.0 && end < 40.0);
    }

    #[test]
    fn test_long_table_paginates() {
        let style = TableStyle::default();
        let format = PageFormat::a4(Orientation::Portrait, 10.0);
        let mut pdf = PdfWriter::new(format);
        let end = TableWriter::new(&mut pdf, &style).write(&grid(200, 4), 10.0).unwrap();
        assert!(pdf.page_count() > 1);
        assert!(end <= format.bottom());
    }

    #[test]
    fn test_empty_grid_is_noop() {
        let style = TableStyle::default();
        let mut pdf = PdfWriter::new(PageFormat::a4(Orientation::Portrait, 10.0));
        let end = TableWriter::new(&mut pdf, &style).write(&TableGrid::default(), 42.0).unwrap();
        assert_eq!(end, 42.0);
    }
}
