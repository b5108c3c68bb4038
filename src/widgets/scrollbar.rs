use tui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

pub struct ScrollBar {
    value: usize,
    max: usize,
}

impl Default for ScrollBar {
    fn default() -> Self {
        Self { value: 0, max: 1 }
    }
}

impl ScrollBar {
    /// Position the handle at `value` of `max`. A `max` of zero keeps the handle at the top.
    pub fn data(mut self, value: usize, max: usize) -> Self {
        self.value = value.min(max);
        self.max = max.max(1);
        self
    }
}

impl Widget for ScrollBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bar_height = 2.max(area.height / 8).min(area.height);
        let offset = self.value * usize::from(area.height - bar_height) / self.max;
        let start = area.y + offset as u16;
        let end = start + bar_height;

        for x in area.left()..area.right() {
            for y in area.top()..area.bottom() {
                buf.get_mut(x, y).set_bg(if (start..end).contains(&y) {
                    Color::White
                } else {
                    Color::DarkGray
                });
            }
        }
    }
}
