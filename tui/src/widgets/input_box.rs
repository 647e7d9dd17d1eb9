//! InputBox Widget
//!
//! Multi-line prompt editor that grows with its content, from one row up to
//! [`MAX_ROWS`], then scrolls to keep the end of the text in view.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;
use textwrap::{wrap, Options};

use crate::theme::{BUBBLE_BG, DIM_GRAY, USER_GREEN};

/// Fewest text rows the box ever shows
pub const MIN_ROWS: u16 = 1;

/// Most text rows before the box starts scrolling
pub const MAX_ROWS: u16 = 6;

const PROMPT: &str = "> ";
const PLACEHOLDER: &str = "Send a message";
const CURSOR: char = '_';

/// Columns taken by the prompt
fn prompt_width() -> u16 {
    u16::try_from(PROMPT.len()).unwrap_or(u16::MAX)
}

/// Text being composed by the user
#[derive(Clone, Debug, Default)]
pub struct InputBox {
    text: String,
}

impl InputBox {
    /// Create an empty input box
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether nothing has been typed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append a character
    pub fn insert(&mut self, c: char) {
        self.text.push(c);
    }

    /// Append a line break
    pub fn newline(&mut self) {
        self.text.push('\n');
    }

    /// Remove the last character
    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Clear the box
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Lines as laid out in a box `width` columns wide, cursor included
    #[must_use]
    pub fn wrapped_lines(&self, width: u16) -> Vec<String> {
        let text_width = usize::from(width.saturating_sub(prompt_width())).max(1);
        let content = format!("{}{CURSOR}", self.text);

        content
            .split('\n')
            .flat_map(|line| {
                if line.is_empty() {
                    vec![String::new()]
                } else {
                    wrap(line, Options::new(text_width).break_words(true))
                        .into_iter()
                        .map(|cow| cow.into_owned())
                        .collect()
                }
            })
            .collect()
    }

    /// Rows needed to show the text at `width`, clamped to the box limits
    #[must_use]
    pub fn rows(&self, width: u16) -> u16 {
        let lines = u16::try_from(self.wrapped_lines(width).len()).unwrap_or(MAX_ROWS);
        lines.clamp(MIN_ROWS, MAX_ROWS)
    }
}

impl Widget for &InputBox {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width <= prompt_width() || area.height == 0 {
            return;
        }

        let background = Style::default().bg(BUBBLE_BG);
        buf.set_style(area, background);

        if self.text.is_empty() {
            buf.set_string(area.x, area.y, PROMPT, background.fg(USER_GREEN));
            buf.set_string(
                area.x + prompt_width(),
                area.y,
                PLACEHOLDER,
                background.fg(DIM_GRAY),
            );
            return;
        }

        let lines = self.wrapped_lines(area.width);
        let visible = usize::from(area.height);
        let skip = lines.len().saturating_sub(visible);

        for (y, (i, line)) in (area.y..area.bottom()).zip(lines.iter().skip(skip).enumerate()) {
            let lead = if i == 0 && skip == 0 { PROMPT } else { "  " };
            buf.set_string(area.x, y, lead, background.fg(USER_GREEN));
            buf.set_string(
                area.x + prompt_width(),
                y,
                line,
                background.fg(USER_GREEN),
            );
        }
    }
}
