use tui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::Spans,
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// Small centered box with a title and a few lines of centered text.
pub struct Dialog<'a> {
    title: &'a str,
    lines: Vec<Spans<'a>>,
}

impl<'a> Dialog<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<Spans<'a>>) -> Self {
        self.lines.push(line.into());
        self
    }
}

impl<'a> Widget for Dialog<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = self
            .lines
            .iter()
            .map(Spans::width)
            .chain([self.title.len()])
            .max()
            .unwrap_or_default() as u16
            + 6;

        let area = {
            let mut draw_area = area;
            draw_area.width = width.max(20).min(area.width);
            draw_area.height = (self.lines.len() as u16 + 4).min(area.height);
            draw_area.y = area.y + (area.height - draw_area.height) / 2;
            draw_area.x = area.x + (area.width - draw_area.width) / 2;
            draw_area
        };

        Clear.render(area, buf);

        let b = Block::default().borders(Borders::ALL).title(self.title);
        let mut text_area = b.inner(area);
        b.render(area, buf);

        text_area.y += 1;
        text_area.height = text_area.height.saturating_sub(1);

        Paragraph::new(self.lines)
            .alignment(Alignment::Center)
            .render(text_area, buf);
    }
}
