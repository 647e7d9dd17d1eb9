//! Markdown Rendering
//!
//! Assistant replies are parsed with pulldown-cmark (GFM tables,
//! strikethrough and task lists enabled) into a flat list of [`Block`]s,
//! which are then laid out into styled lines for a given width.
//!
//! Content arrives a fragment at a time, so half-written input is normal.
//! An unterminated fence runs to the end of the content and is rendered as
//! code; an unclosed `**` just prints as written.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::theme;

/// Inline formatting in effect for a run of text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InlineStyle {
    /// `code` span
    pub code: bool,
    /// `**strong**`
    pub strong: bool,
    /// `_emphasis_`
    pub emphasis: bool,
    /// `~~strikethrough~~`
    pub strikethrough: bool,
    /// Link text
    pub link: bool,
}

impl InlineStyle {
    fn apply(self, base: Style) -> Style {
        let mut style = if self.code { theme::inline_code() } else { base };
        if self.link {
            style = style.fg(theme::GIGI_CYAN).add_modifier(Modifier::UNDERLINED);
        }
        if self.strong {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.emphasis {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strikethrough {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }
}

/// A run of text with one inline style
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inline {
    /// The text (`\n` marks a hard break)
    pub text: String,
    /// Formatting
    pub style: InlineStyle,
}

/// A block-level markdown element
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Running text
    Paragraph(Vec<Inline>),
    /// `#` heading
    Heading {
        /// 1 to 6
        level: u8,
        /// Heading text
        content: Vec<Inline>,
    },
    /// One list entry
    ListItem {
        /// Nesting depth
        depth: usize,
        /// `-` for bullets, `N.` for ordered items
        marker: String,
        /// Item text
        content: Vec<Inline>,
    },
    /// Fenced or indented code
    Code {
        /// Language tag after the opening fence
        language: Option<String>,
        /// Code with the trailing newline removed
        code: String,
    },
    /// GFM table
    Table {
        /// Header cells
        header: Vec<String>,
        /// Body rows
        rows: Vec<Vec<String>>,
    },
    /// `---`
    Rule,
}

impl Block {
    /// Plain text of a text block, without formatting
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Paragraph(content)
            | Self::Heading { content, .. }
            | Self::ListItem { content, .. } => plain(content),
            Self::Code { code, .. } => code.clone(),
            Self::Table { header, .. } => header.join(" | "),
            Self::Rule => String::new(),
        }
    }
}

fn plain(content: &[Inline]) -> String {
    content.iter().map(|inline| inline.text.as_str()).collect()
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Split `content` into blocks
#[must_use]
pub fn parse(content: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(content, parser_options()) {
        builder.event(event);
    }
    builder.finish()
}

/// List item being collected
struct OpenItem {
    depth: usize,
    marker: String,
    emitted: bool,
}

#[derive(Default)]
struct TableBuilder {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Option<String>,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    style: InlineStyle,
    /// Nesting counts for inline tags, so `**a _b_ c**` unwinds correctly
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    links: Vec<String>,
    /// Next number for each open list (`None` = bulleted)
    lists: Vec<Option<u64>>,
    items: Vec<OpenItem>,
    heading: Option<u8>,
    code: Option<(Option<String>, String)>,
    table: Option<TableBuilder>,
}

impl BlockBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text, self.style),
            Event::Code(code) => {
                let style = InlineStyle {
                    code: true,
                    ..self.style
                };
                self.text(&code, style);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html, self.style),
            Event::SoftBreak => self.text(" ", self.style),
            Event::HardBreak => self.text("\n", self.style),
            Event::TaskListMarker(done) => {
                self.text(if done { "[x] " } else { "[ ] " }, self.style);
            }
            Event::Rule => {
                self.flush_item();
                self.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // Second paragraph of a loose list item
                if !self.items.is_empty() && !self.inlines.is_empty() {
                    self.text(" ", InlineStyle::default());
                }
            }
            Tag::Heading { level, .. } => {
                self.flush_item();
                self.heading = Some(level as u8);
            }
            Tag::CodeBlock(kind) => {
                self.flush_item();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split(|c: char| c.is_whitespace() || c == ',')
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                self.flush_item();
                self.lists.push(start);
            }
            Tag::Item => {
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{next}.");
                        *next += 1;
                        marker
                    }
                    _ => "-".to_string(),
                };
                self.items.push(OpenItem {
                    depth,
                    marker,
                    emitted: false,
                });
            }
            Tag::Table(_) => {
                self.flush_item();
                self.table = Some(TableBuilder::default());
            }
            Tag::TableCell => {
                if let Some(table) = &mut self.table {
                    table.cell = Some(String::new());
                }
            }
            Tag::Emphasis => {
                self.emphasis += 1;
                self.style.emphasis = true;
            }
            Tag::Strong => {
                self.strong += 1;
                self.style.strong = true;
            }
            Tag::Strikethrough => {
                self.strikethrough += 1;
                self.style.strikethrough = true;
            }
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.style.link = true;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.items.is_empty() {
                    self.push_text_block(Block::Paragraph);
                }
            }
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                self.push_text_block(|content| Block::Heading { level, content });
            }
            TagEnd::CodeBlock => {
                if let Some((language, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    self.blocks.push(Block::Code { language, code });
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::Item => {
                self.flush_item();
                self.items.pop();
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    let cell = table.cell.take().unwrap_or_default();
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.blocks.push(Block::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            TagEnd::Emphasis => {
                self.emphasis = self.emphasis.saturating_sub(1);
                self.style.emphasis = self.emphasis > 0;
            }
            TagEnd::Strong => {
                self.strong = self.strong.saturating_sub(1);
                self.style.strong = self.strong > 0;
            }
            TagEnd::Strikethrough => {
                self.strikethrough = self.strikethrough.saturating_sub(1);
                self.style.strikethrough = self.strikethrough > 0;
            }
            TagEnd::Link => {
                let url = self.links.pop().unwrap_or_default();
                self.style.link = !self.links.is_empty();
                let shown = self.inlines.last().map(|inline| inline.text.as_str());
                if !url.is_empty() && shown != Some(url.as_str()) {
                    self.text(&format!(" ({url})"), self.style);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str, style: InlineStyle) {
        if let Some((_, code)) = &mut self.code {
            code.push_str(text);
            return;
        }
        if let Some(cell) = self.table.as_mut().and_then(|t| t.cell.as_mut()) {
            cell.push_str(text);
            return;
        }

        match self.inlines.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.inlines.push(Inline {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn push_text_block(&mut self, make: impl FnOnce(Vec<Inline>) -> Block) {
        let content = std::mem::take(&mut self.inlines);
        if !content.is_empty() {
            self.blocks.push(make(content));
        }
    }

    /// Emit the innermost open list item with the text gathered so far
    fn flush_item(&mut self) {
        let Some(item) = self.items.last_mut() else {
            return;
        };
        if item.emitted && self.inlines.is_empty() {
            return;
        }

        let marker = if item.emitted {
            String::new()
        } else {
            item.marker.clone()
        };
        item.emitted = true;
        let depth = item.depth;
        let content = std::mem::take(&mut self.inlines);
        self.blocks.push(Block::ListItem {
            depth,
            marker,
            content,
        });
    }

    fn finish(mut self) -> Vec<Block> {
        // Input cut off mid-block
        if let Some((language, code)) = self.code.take() {
            self.blocks.push(Block::Code { language, code });
        }
        self.flush_item();
        self.push_text_block(Block::Paragraph);
        self.blocks
    }
}

/// Render `content` into lines no wider than `width` columns
#[must_use]
pub fn render(content: &str, width: usize, base: Style) -> Vec<Line<'static>> {
    let width = width.max(1);
    let blocks = parse(content);
    let mut lines = Vec::new();
    let mut previous: Option<&Block> = None;

    for block in &blocks {
        let tight = matches!(
            (previous, block),
            (Some(Block::ListItem { .. }), Block::ListItem { .. })
        );
        if previous.is_some() && !tight {
            lines.push(Line::default());
        }

        match block {
            Block::Paragraph(content) => {
                lines.extend(wrap_styled(content, width, base, ""));
            }
            Block::Heading { content, .. } => {
                lines.extend(wrap_styled(content, width, theme::heading(), ""));
            }
            Block::ListItem {
                depth,
                marker,
                content,
            } => {
                let bullet = if marker.ends_with('.') {
                    marker.as_str()
                } else if marker.is_empty() {
                    " "
                } else {
                    "•"
                };
                let prefix = format!("{}{} ", "  ".repeat(*depth), bullet);
                lines.extend(wrap_styled(content, width, base, &prefix));
            }
            Block::Code { language, code } => {
                if let Some(language) = language {
                    lines.push(Line::from(Span::styled(
                        language.clone(),
                        Style::default().fg(theme::CODE_LABEL),
                    )));
                }
                lines.extend(code_lines(code, width));
            }
            Block::Table { header, rows } => {
                lines.extend(table_lines(header, rows, width, base));
            }
            Block::Rule => {
                lines.push(Line::from(Span::styled(
                    "─".repeat(width),
                    Style::default().fg(theme::SLATE_BORDER),
                )));
            }
        }

        previous = Some(block);
    }

    lines
}

/// Lay out code verbatim, hard-wrapping long lines and padding to `width`
fn code_lines(code: &str, width: usize) -> Vec<Line<'static>> {
    let style = theme::code_block();
    let mut lines = Vec::new();

    for source_line in code.split('\n') {
        let expanded = source_line.replace('\t', "    ");
        for chunk in split_at_width(&expanded, width) {
            let pad = width.saturating_sub(chunk.width());
            lines.push(Line::from(Span::styled(
                format!("{chunk}{}", " ".repeat(pad)),
                style,
            )));
        }
    }

    lines
}

const COLUMN_SEPARATOR: &str = " │ ";

/// Table with padded columns and a rule under the header
fn table_lines(
    header: &[String],
    rows: &[Vec<String>],
    width: usize,
    base: Style,
) -> Vec<Line<'static>> {
    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let format_row = |row: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = row.get(i).map_or("", String::as_str);
                format!("{cell}{}", " ".repeat(w.saturating_sub(cell.width())))
            })
            .collect::<Vec<_>>()
            .join(COLUMN_SEPARATOR)
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::new();
    let mut push = |text: String, style: Style| {
        for chunk in split_at_width(&text, width) {
            lines.push(Line::from(Span::styled(chunk, style)));
        }
    };

    if !header.is_empty() {
        push(format_row(header), base.add_modifier(Modifier::BOLD));
        let rule = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        push(rule, Style::default().fg(theme::SLATE_BORDER));
    }
    for row in rows {
        push(format_row(row), base);
    }

    lines
}

/// Break a string into pieces of at most `width` display columns
fn split_at_width(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if current_width + w > width && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push(c);
        current_width += w;
    }
    pieces.push(current);
    pieces
}

/// One word of running text with its style
struct Word {
    text: String,
    style: Style,
    space_before: bool,
    break_before: bool,
}

fn words(content: &[Inline], base: Style) -> Vec<Word> {
    let mut out = Vec::new();
    let mut pending_space = false;
    let mut pending_break = false;

    for inline in content {
        let style = inline.style.apply(base);
        let mut current = String::new();

        let mut flush = |current: &mut String, space: &mut bool, brk: &mut bool| {
            if !current.is_empty() {
                out.push(Word {
                    text: std::mem::take(current),
                    style,
                    space_before: *space,
                    break_before: *brk,
                });
                *space = false;
                *brk = false;
            }
        };

        for c in inline.text.chars() {
            match c {
                ' ' => {
                    flush(&mut current, &mut pending_space, &mut pending_break);
                    pending_space = true;
                }
                '\n' => {
                    flush(&mut current, &mut pending_space, &mut pending_break);
                    pending_break = true;
                    pending_space = false;
                }
                _ => current.push(c),
            }
        }
        flush(&mut current, &mut pending_space, &mut pending_break);
    }

    out
}

/// Greedy word wrap that keeps inline styling
///
/// Continuation lines are indented by the width of `prefix`.
fn wrap_styled(content: &[Inline], width: usize, base: Style, prefix: &str) -> Vec<Line<'static>> {
    let indent = " ".repeat(prefix.width());
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix.to_string(), base));
        used = prefix.width();
    }
    let line_start = used;

    for word in words(content, base) {
        let space = usize::from(word.space_before && used > line_start);
        let word_width = word.text.width();

        if word.break_before || (used + space + word_width > width && used > line_start) {
            lines.push(Line::from(std::mem::take(&mut spans)));
            spans.push(Span::raw(indent.clone()));
            used = indent.width();
        } else if space == 1 {
            spans.push(Span::styled(" ", base));
            used += 1;
        }

        let available = width.saturating_sub(used).max(1);
        if word_width > available {
            let mut pieces = split_at_width(&word.text, available).into_iter().peekable();
            while let Some(piece) = pieces.next() {
                used += piece.width();
                spans.push(Span::styled(piece, word.style));
                if pieces.peek().is_some() {
                    lines.push(Line::from(std::mem::take(&mut spans)));
                    spans.push(Span::raw(indent.clone()));
                    used = indent.width();
                }
            }
        } else {
            used += word_width;
            spans.push(Span::styled(word.text, word.style));
        }
    }

    if !spans.is_empty() {
        lines.push(Line::from(spans));
    }
    lines
}

/// Plain text of a rendered line
#[must_use]
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}
