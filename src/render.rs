use std::cmp::Ordering;

use lanegraph::{ColorIdx, LayoutRow, Segment};

/// Terminal color codes for lane lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Default,
    Blue,
    Green,
    Red,
    Yellow,
    Magenta,
    Cyan,
}

impl Color {
    /// Palette aligned with the engine's color indexes.
    const LANES: [Color; 6] = [
        Color::Blue,
        Color::Green,
        Color::Red,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
    ];

    fn for_lane(color: ColorIdx) -> Self {
        Self::LANES[color % Self::LANES.len()]
    }

    pub fn to_ansi(&self) -> &str {
        match self {
            Color::Default => "\x1b[0m",
            Color::Blue => "\x1b[34m",
            Color::Green => "\x1b[32m",
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
        }
    }
}

/// Two-characters-per-lane ASCII rendering of layout rows: a node line
/// with the commit marker and pass-through lanes, plus an optional bend
/// line when lanes shift between rows.
pub struct AsciiGraph {
    color: bool,
}

impl AsciiGraph {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn push_cell(&self, glyph: char, color: ColorIdx, out: &mut String) {
        if self.color {
            out.push_str(Color::for_lane(color).to_ansi());
            out.push(glyph);
            out.push_str(Color::Default.to_ansi());
        } else {
            out.push(glyph);
        }
    }

    /// Line carrying the commit marker, `width` lanes wide.
    pub fn node_line(&self, row: &LayoutRow, width: usize) -> String {
        let width = width.max(row.width());
        let mut out = String::new();
        for lane in 0..width {
            if lane == row.lane {
                self.push_cell('*', row.color, &mut out);
            } else if let Some(seg) = row.segments.iter().find(|seg| seg.from == lane) {
                self.push_cell('|', seg.color, &mut out);
            } else {
                out.push(' ');
            }
            out.push(' ');
        }
        out.pop();
        out
    }

    /// Transition line under the node, or None when every lane runs
    /// straight down.
    pub fn bend_line(&self, row: &LayoutRow, width: usize) -> Option<String> {
        if row.segments.iter().all(Segment::is_straight) {
            return None;
        }
        let width = width.max(row.width());
        let mut cells: Vec<Option<(char, ColorIdx)>> = vec![None; width];
        for seg in &row.segments {
            let (slot, glyph) = match seg.to.cmp(&seg.from) {
                Ordering::Equal => (seg.from, '|'),
                Ordering::Less => (seg.to, '/'),
                Ordering::Greater => (seg.to, '\\'),
            };
            // Bends win over pass-through lines sharing the column.
            let replace = match cells[slot] {
                None => true,
                Some(('|', _)) => glyph != '|',
                Some(_) => false,
            };
            if replace {
                cells[slot] = Some((glyph, seg.color));
            }
        }

        let mut out = String::new();
        for cell in cells {
            match cell {
                Some((glyph, color)) => self.push_cell(glyph, color, &mut out),
                None => out.push(' '),
            }
            out.push(' ');
        }
        out.pop();
        Some(out)
    }
}
