//! Text measuring, wrapping and WinAnsi encoding for the standard fonts.

use super::page::MM_TO_PT;
use unicode_normalization::UnicodeNormalization;

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica-Bold runs roughly this much wider than the regular face.
const BOLD_FACTOR: f32 = 1.06;

fn char_width(c: char) -> u16 {
    let code = c as u32;
    if (32..=126).contains(&code) {
        HELVETICA_WIDTHS[(code - 32) as usize]
    } else {
        556
    }
}

/// Convert a font size in points to millimetres.
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / MM_TO_PT
}

/// Advance width of `text` in ems.
pub fn em_width(text: &str, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c) as u32).sum();
    let factor = if bold { BOLD_FACTOR } else { 1.0 };
    units as f32 / 1000.0 * factor
}

/// Width of `text` set in Helvetica at `size` pt, in millimetres.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    pt_to_mm(em_width(text, bold) * size)
}

/// Greedy word wrap to `max_width` mm.
///
/// Words wider than a whole line are broken between characters. Always
/// returns at least one (possibly empty) line.
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    wrap_measured(text, max_width, |s| text_width(s, size, bold))
}

/// Greedy word wrap with a caller-supplied measure, in any unit.
pub fn wrap_measured(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };

            if measure(&candidate) <= max_width {
                line = candidate;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }

            if measure(word) <= max_width {
                line = word.to_string();
            } else {
                for c in word.chars() {
                    let mut next = line.clone();
                    next.push(c);
                    if !line.is_empty() && measure(&next) > max_width {
                        lines.push(std::mem::take(&mut line));
                        line.push(c);
                    } else {
                        line = next;
                    }
                }
            }
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encode text for a WinAnsiEncoding standard font.
///
/// Input is NFC-normalized first so decomposed accents map onto Latin-1.
/// Characters outside WinAnsi become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}
