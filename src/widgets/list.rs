use keyfob_core::Token;
use tui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Block, Paragraph, StatefulWidget, Widget},
};

use super::ScrollBar;

const LIST_ITEM_HEIGHT: usize = 4;

pub struct List<'a> {
    block: Option<Block<'a>>,
    scrollbar: Option<(ScrollBar, u16)>,
    items: &'a [Token],
    moving: bool,
}

impl<'a> List<'a> {
    pub fn new(items: &'a [Token]) -> Self {
        Self {
            block: None,
            scrollbar: None,
            items,
            moving: false,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn scrollbar(mut self, scrollbar: ScrollBar, width: u16) -> Self {
        self.scrollbar = Some((scrollbar, width));
        self
    }

    /// Highlight the selection differently, while it's being moved.
    pub fn moving(mut self, moving: bool) -> Self {
        self.moving = moving;
        self
    }
}

impl<'a> StatefulWidget for List<'a> {
    type State = State;

    fn render(mut self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let list_area = match self.block.take() {
            Some(b) => {
                let inner_area = b.inner(area);
                b.render(area, buf);
                inner_area
            }
            None => area,
        };

        let (scrollbar, scrollbar_width) = match self.scrollbar {
            Some((scrollbar, width)) => (Some(scrollbar), width),
            None => (None, 0),
        };

        state.update_scroll_pos(list_area);

        let highlight = if self.moving {
            Color::Yellow
        } else {
            Color::Blue
        };

        for (i, item) in self.items.iter().skip(state.scroll_pos).enumerate() {
            let mut area = list_area;
            area.y += (i * LIST_ITEM_HEIGHT) as u16;
            area.height = 1;
            area.width = area.width.saturating_sub(scrollbar_width);

            if area.y >= list_area.bottom() {
                break;
            }

            // Draw current selection indicator
            if state.position() == i {
                for y in area.y..list_area.bottom().min(area.y + 3) {
                    for x in area.left()..area.right() {
                        buf.get_mut(x, y).set_bg(highlight);
                    }
                }
            }

            area.x += 2;
            area.width = area.width.saturating_sub(2);

            // Draw the account name
            area.y += 1;
            if area.y >= list_area.bottom() {
                break;
            }
            Paragraph::new(item.name.as_str()).render(area, buf);

            // Draw the issuer
            area.y += 1;
            if area.y >= list_area.bottom() {
                break;
            }
            Paragraph::new(item.issuer.as_str()).render(area, buf);

            // Draw the separator
            area.y += 1;
            if area.y >= list_area.bottom() {
                break;
            }

            for x in list_area.left()..list_area.right().saturating_sub(scrollbar_width) {
                buf.get_mut(x, area.y).set_char('─');
            }
        }

        // Draw scroll bar, if set
        if let Some(scrollbar) = scrollbar {
            let mut area = list_area;
            area.x += area.width.saturating_sub(scrollbar_width);
            area.width = scrollbar_width.min(list_area.width);

            scrollbar
                .data(state.selection, self.items.len().saturating_sub(1))
                .render(area, buf);
        }
    }
}

#[derive(Default)]
pub struct State {
    selection: usize,
    scroll_pos: usize,
}

impl State {
    pub fn up(&mut self) {
        self.selection = self.selection.saturating_sub(1);
    }

    pub fn down(&mut self, len: usize) {
        if self.selection + 1 < len {
            self.selection += 1;
        }
    }

    /// Keep the selection inside a list of `len` items, after items were removed.
    pub fn clamp(&mut self, len: usize) {
        self.selection = self.selection.min(len.saturating_sub(1));
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    fn update_scroll_pos(&mut self, area: Rect) {
        while (self.selection + 1).saturating_sub(self.scroll_pos) * LIST_ITEM_HEIGHT
            > usize::from(area.height)
            && self.scroll_pos < self.selection
        {
            self.scroll_pos += 1;
        }

        while self.selection < self.scroll_pos {
            self.scroll_pos -= 1;
        }
    }

    fn position(&self) -> usize {
        self.selection - self.scroll_pos
    }
}
