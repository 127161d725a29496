//! Greedy page layout.
//!
//! Sections are placed top to bottom; a section that does not fit in the
//! space left on the current page moves to a fresh page. Only tables may
//! split: their rows flow across pages and every continuation repeats the
//! header row. All measures are millimetres.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::section::{FreeText, Section, Table};

/// Page geometry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Vertical gap left after each section
    pub section_spacing: f64,
}

impl Default for LayoutOptions {
    /// A4 portrait with 15 mm margins
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 15.0,
            section_spacing: 6.0,
        }
    }
}

impl LayoutOptions {
    pub fn content_width(&self) -> f64 {
        (self.page_width - 2.0 * self.margin).max(0.0)
    }

    pub fn usable_height(&self) -> f64 {
        (self.page_height - 2.0 * self.margin).max(0.0)
    }

    fn bottom(&self) -> f64 {
        self.page_height - self.margin
    }
}

pub const TITLE_HEIGHT: f64 = 8.0;
pub const HEADING_HEIGHT: f64 = 12.0;
pub const TEXT_LINE_HEIGHT: f64 = 5.0;
pub const KPI_ROW_HEIGHT: f64 = 25.0;
pub const KPI_COLUMNS: usize = 4;
pub const CHART_HEIGHT: f64 = 60.0;
pub const TABLE_HEADER_HEIGHT: f64 = 8.0;
pub const TABLE_ROW_HEIGHT: f64 = 7.0;
/// Average glyph width of body text, used to wrap free text
pub const CHAR_WIDTH: f64 = 2.0;

const EPSILON: f64 = 1e-6;

/// One section (or a slice of a table's rows) placed on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    /// Index into `ReportDocument::sections`
    pub section: usize,
    pub y: f64,
    pub height: f64,
    /// Table rows drawn here; `None` for other section kinds
    pub rows: Option<Range<usize>>,
    /// Set on table fragments after the first
    pub continued: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based
    pub number: usize,
    pub total: usize,
    pub placements: Vec<Placement>,
}

/// Height a non-table section occupies
pub fn section_height(section: &Section, layout: &LayoutOptions) -> f64 {
    match section {
        Section::Kpis(block) => {
            let rows = block.tiles.len().div_ceil(KPI_COLUMNS).max(1);
            TITLE_HEIGHT + rows as f64 * KPI_ROW_HEIGHT
        }
        Section::Bar(_) | Section::Pie(_) => TITLE_HEIGHT + CHART_HEIGHT,
        Section::Text(text) => text_height(text, layout),
        Section::Table(table) => {
            let rows = table.visible_rows().len().max(1);
            TITLE_HEIGHT + TABLE_HEADER_HEIGHT + rows as f64 * TABLE_ROW_HEIGHT
        }
    }
}

fn text_height(text: &FreeText, layout: &LayoutOptions) -> f64 {
    let title = if text.title.is_some() { TITLE_HEIGHT } else { 0.0 };
    let line = if text.heading { HEADING_HEIGHT } else { TEXT_LINE_HEIGHT };
    title + wrap_text(&text.body, chars_per_line(layout)).len().max(1) as f64 * line
}

pub fn chars_per_line(layout: &LayoutOptions) -> usize {
    ((layout.content_width() / CHAR_WIDTH).floor() as usize).max(1)
}

/// Word-wrap `body` to lines of at most `width` characters.
/// Words longer than a line are cut.
pub fn wrap_text(body: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in body.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}

struct Paginator<'a> {
    layout: &'a LayoutOptions,
    pages: Vec<Vec<Placement>>,
    y: f64,
}

impl<'a> Paginator<'a> {
    fn new(layout: &'a LayoutOptions) -> Self {
        Self {
            layout,
            pages: vec![Vec::new()],
            y: layout.margin,
        }
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().map_or(true, |p| p.is_empty())
    }

    fn remaining(&self) -> f64 {
        self.layout.bottom() - self.y
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.layout.margin;
    }

    fn push(&mut self, placement: Placement) {
        self.y += placement.height;
        if let Some(page) = self.pages.last_mut() {
            page.push(placement);
        }
    }

    fn gap(&mut self) {
        self.y += self.layout.section_spacing;
    }

    fn place_block(&mut self, section: usize, height: f64) {
        if height > self.remaining() + EPSILON && !self.page_is_empty() {
            self.new_page();
        }
        if height > self.remaining() + EPSILON {
            tracing::warn!(section, height, "section taller than a page; it will overflow");
        }
        let y = self.y;
        self.push(Placement {
            section,
            y,
            height,
            rows: None,
            continued: false,
        });
        self.gap();
    }

    fn place_table(&mut self, section: usize, table: &Table) {
        let total = table.visible_rows().len();
        if total == 0 {
            // Header plus one placeholder row
            let height = TITLE_HEIGHT + TABLE_HEADER_HEIGHT + TABLE_ROW_HEIGHT;
            if height > self.remaining() + EPSILON && !self.page_is_empty() {
                self.new_page();
            }
            let y = self.y;
            self.push(Placement {
                section,
                y,
                height,
                rows: Some(0..0),
                continued: false,
            });
            self.gap();
            return;
        }

        let mut start = 0;
        let mut continued = false;
        while start < total {
            let chrome = if continued { 0.0 } else { TITLE_HEIGHT } + TABLE_HEADER_HEIGHT;
            let fit = ((self.remaining() - chrome + EPSILON) / TABLE_ROW_HEIGHT).floor();
            let fit = if fit >= 1.0 { fit as usize } else { 0 };

            if fit == 0 {
                if !self.page_is_empty() {
                    self.new_page();
                    continue;
                }
                tracing::warn!(section, "page too short for a single table row");
            }

            let take = fit.max(1).min(total - start);
            let y = self.y;
            self.push(Placement {
                section,
                y,
                height: chrome + take as f64 * TABLE_ROW_HEIGHT,
                rows: Some(start..start + take),
                continued,
            });
            start += take;

            if start < total {
                self.new_page();
                continued = true;
            }
        }
        self.gap();
    }

    /// Number pages once the total is known
    fn finish(self) -> Vec<Page> {
        let total = self.pages.len();
        self.pages
            .into_iter()
            .enumerate()
            .map(|(i, placements)| Page {
                number: i + 1,
                total,
                placements,
            })
            .collect()
    }
}

/// Lay `sections` out on pages
pub fn paginate(sections: &[Section], layout: &LayoutOptions) -> Vec<Page> {
    let mut paginator = Paginator::new(layout);
    for (index, section) in sections.iter().enumerate() {
        match section {
            Section::Table(table) => paginator.place_table(index, table),
            other => paginator.place_block(index, section_height(other, layout)),
        }
    }
    paginator.finish()
}
