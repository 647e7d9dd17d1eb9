//! Theme and Colors
//!
//! Gigi's dark palette: slate borders, a charcoal bubble for the user's
//! messages and a one-dark flavored code block.

use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Gigi Palette
// ============================================================================

/// Gigi's accent (title, assistant label)
pub const GIGI_CYAN: Color = Color::Rgb(120, 200, 255);

/// User input green
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// User bubble / input background
pub const BUBBLE_BG: Color = Color::Rgb(0x33, 0x35, 0x3a);

/// Header and separator lines
pub const SLATE_BORDER: Color = Color::Rgb(0x33, 0x41, 0x55);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(156, 163, 175);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Warning amber (reconnecting)
pub const WARN_AMBER: Color = Color::Rgb(255, 196, 100);

/// Success green
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);

// ============================================================================
// Code Blocks
// ============================================================================

/// Code block background
pub const CODE_BG: Color = Color::Rgb(0x28, 0x2c, 0x34);

/// Code block foreground
pub const CODE_FG: Color = Color::Rgb(0xab, 0xb2, 0xbf);

/// Language label above a code block
pub const CODE_LABEL: Color = Color::Rgb(0x98, 0xc3, 0x79);

/// Inline code spans
pub const INLINE_CODE: Color = Color::Rgb(0xe5, 0xc0, 0x7b);

// ============================================================================
// Styles
// ============================================================================

/// Style for a heading line
#[must_use]
pub fn heading() -> Style {
    Style::default().fg(GIGI_CYAN).add_modifier(Modifier::BOLD)
}

/// Style for fenced code
#[must_use]
pub fn code_block() -> Style {
    Style::default().fg(CODE_FG).bg(CODE_BG)
}

/// Style for inline code spans
#[must_use]
pub fn inline_code() -> Style {
    Style::default().fg(INLINE_CODE)
}

/// Style for the loading indicator
#[must_use]
pub fn loading() -> Style {
    Style::default().fg(DIM_GRAY).add_modifier(Modifier::ITALIC)
}
