//! Custom widgets for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use super::shimmer::{shimmer_spans, AnimatedDots};
use super::theme::Theme;
use crate::lab::view::{Comparison, ComparisonColumn, TranscriptEntry};
use crate::lab::{TurnRole, VariantId};

/// Parse simple Markdown formatting and return styled spans
/// Supports: **bold**, *italic*, `code`, ***bold italic***
fn parse_markdown(text: &str, base_style: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut remaining = text.to_string();

    let bold_italic = Regex::new(r"\*\*\*(.+?)\*\*\*").unwrap();
    let bold = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    let italic = Regex::new(r"\*([^*]+?)\*").unwrap();
    let code = Regex::new(r"`([^`]+?)`").unwrap();

    // Process patterns in order of priority
    let patterns: Vec<(&Regex, Style)> = vec![
        (&bold_italic, base_style.add_modifier(Modifier::BOLD | Modifier::ITALIC)),
        (&bold, base_style.add_modifier(Modifier::BOLD)),
        (&code, Style::default().fg(Color::Yellow)),
        (&italic, base_style.add_modifier(Modifier::ITALIC)),
    ];

    fn find_first_match(
        text: &str,
        patterns: &[(&Regex, Style)],
    ) -> Option<(usize, usize, String, Style)> {
        let mut best: Option<(usize, usize, String, Style)> = None;
        for (regex, style) in patterns {
            if let Some(caps) = regex.captures(text) {
                let (Some(m), Some(inner)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if best.as_ref().is_none_or(|b| m.start() < b.0) {
                    best = Some((m.start(), m.end(), inner.as_str().to_string(), *style));
                }
            }
        }
        best
    }

    while !remaining.is_empty() {
        if let Some((start, end, inner, style)) = find_first_match(&remaining, &patterns) {
            if start > 0 {
                spans.push(Span::styled(remaining[..start].to_string(), base_style));
            }
            spans.push(Span::styled(inner, style));
            remaining = remaining[end..].to_string();
        } else {
            spans.push(Span::styled(remaining.clone(), base_style));
            break;
        }
    }

    if spans.is_empty() {
        spans.push(Span::styled(text.to_string(), base_style));
    }

    spans
}

/// Wrap a long string into multiple lines, respecting unicode width
fn wrap_text(text: &str, max_width: usize, indent: &str) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let indent_width = indent.width();
    let content_width = max_width.saturating_sub(indent_width);

    if content_width == 0 || text.width() <= content_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for c in text.chars() {
        let char_width = unicode_width::UnicodeWidthChar::width(c).unwrap_or(1);

        if current_width + char_width > content_width && !current_line.is_empty() {
            lines.push(current_line);
            current_line = String::new();
            current_width = 0;
        }

        current_line.push(c);
        current_width += char_width;
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// A message in the transcript pane
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Model,
    System,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

impl From<TranscriptEntry> for Message {
    fn from(entry: TranscriptEntry) -> Self {
        Self {
            role: match entry.role {
                TurnRole::User => MessageRole::User,
                TurnRole::Model => MessageRole::Model,
            },
            content: entry.text,
        }
    }
}

/// Header bar with title and model info
pub struct HeaderBar<'a> {
    pub title: &'a str,
    pub model: &'a str,
    pub is_processing: bool,
}

impl Widget for HeaderBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        // Logo/title with shimmer effect when processing
        let title_spans = if self.is_processing {
            let mut spans = vec![Span::styled("◆ ", Theme::accent())];
            spans.extend(shimmer_spans(self.title));
            spans
        } else {
            vec![
                Span::styled("◆ ", Theme::accent()),
                Span::styled(self.title, Theme::title()),
            ]
        };

        let title_line = Line::from(title_spans);
        buf.set_line(area.x + 1, area.y, &title_line, area.width.saturating_sub(2));

        // Model name on the right
        let model_str = format!("{} ", self.model);
        let model_len = model_str.width() as u16;
        let model_x = area.x + area.width.saturating_sub(model_len + 1);
        let model_span = Span::styled(model_str, Theme::muted());
        buf.set_span(model_x, area.y, &model_span, model_len + 1);
    }
}

/// Tab strip for the two variants
pub struct VariantTabs {
    pub active: VariantId,
    /// Completed exchanges per variant
    pub exchanges: [usize; 2],
}

impl Widget for VariantTabs {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![Span::raw(" ")];
        for id in VariantId::ALL {
            let label = format!(" {} ({}) ", id.label(), self.exchanges[id.index()]);
            let style = if id == self.active {
                Theme::tab_active(id)
            } else {
                Theme::variant(id)
            };
            spans.push(Span::styled(label, style));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled("Ctrl+T to switch", Theme::muted()));
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

/// Status bar showing current state
pub struct StatusBar {
    pub is_processing: bool,
    pub spinner_frame: usize,
    pub status_text: String,
    pub is_error: bool,
}

impl Widget for StatusBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = if self.is_processing {
            let spinner = AnimatedDots::new(self.spinner_frame);
            Line::from(vec![
                Span::styled(format!("{} ", spinner.current()), Theme::accent()),
                Span::styled(self.status_text, Theme::accent()),
            ])
        } else if self.is_error {
            Line::from(vec![
                Span::styled("✗ ", Theme::error()),
                Span::styled(self.status_text, Theme::error()),
            ])
        } else if self.status_text.is_empty() {
            Line::from(vec![
                Span::styled("● ", Theme::success()),
                Span::styled("Ready", Theme::dim()),
            ])
        } else {
            Line::from(vec![
                Span::styled("● ", Theme::success()),
                Span::styled(self.status_text, Theme::info()),
            ])
        };

        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));
    }
}

/// Editable text field
pub struct InputBox<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub placeholder: &'a str,
    pub focused: bool,
    /// (lines, columns) scrolled off the top and left, see [`input_viewport`]
    pub scroll: (u16, u16),
}

/// Scroll offset that keeps the cursor inside an input box drawn in `area`,
/// plus the cursor's screen position. `cursor` is (line, display column).
pub fn input_viewport(area: Rect, cursor: (usize, usize)) -> ((u16, u16), (u16, u16)) {
    let (line, col) = cursor;
    let inner_height = usize::from(area.height.saturating_sub(2).max(1));
    let inner_width = usize::from(area.width.saturating_sub(2).max(1));
    let top = line.saturating_sub(inner_height - 1);
    let left = col.saturating_sub(inner_width - 1);

    let to_u16 = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(1).saturating_add(to_u16(col - left));
    let y = area.y.saturating_add(1).saturating_add(to_u16(line - top));
    ((to_u16(top), to_u16(left)), (x, y))
}

impl Widget for InputBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (border_style, title_style) = if self.focused {
            (Theme::border_focused(), Theme::accent())
        } else {
            (Theme::border(), Theme::muted())
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(format!(" {} ", self.title), title_style));

        let inner = block.inner(area);
        block.render(area, buf);

        let (display_text, style) = if self.content.is_empty() {
            (self.placeholder, Theme::muted())
        } else {
            (self.content, Theme::text())
        };

        Paragraph::new(display_text)
            .style(style)
            .scroll(self.scroll)
            .render(inner, buf);
    }
}

/// Boxed, wrapped text with a title
pub struct TextPanel<'a> {
    pub title: String,
    pub body: &'a str,
    pub body_style: Style,
    pub border_style: Style,
}

impl Widget for TextPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.border_style)
            .title(Span::styled(self.title, Theme::subtitle()));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = self
            .body
            .lines()
            .map(|l| Line::from(parse_markdown(l, self.body_style)))
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

/// Latest replies and action items of both variants, in two columns
pub struct ComparisonPanel<'a> {
    pub comparison: &'a Comparison,
}

impl ComparisonPanel<'_> {
    fn render_column(col: &ComparisonColumn, area: Rect, buf: &mut Buffer) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let reply = if col.last_reply.is_empty() {
            "(no reply yet)"
        } else {
            col.last_reply.as_str()
        };
        TextPanel {
            title: format!(" {} ", col.id),
            body: reply,
            body_style: if col.last_reply.is_empty() {
                Theme::muted()
            } else {
                Theme::text()
            },
            border_style: Theme::variant(col.id),
        }
        .render(rows[0], buf);

        TextPanel {
            title: format!(" {} - Action Items ", col.id),
            body: &col.action_items,
            body_style: if col.has_action_items {
                Theme::warning()
            } else {
                Theme::muted()
            },
            border_style: Theme::border(),
        }
        .render(rows[1], buf);
    }
}

impl Widget for ComparisonPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Theme::border())
            .title(Span::styled(" Latest replies comparison ", Theme::title()));
        let inner = block.inner(area);
        block.render(area, buf);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);

        for (col, rect) in self.comparison.columns.iter().zip(cols.iter()) {
            Self::render_column(col, *rect, buf);
        }
    }
}

/// Help bar showing key bindings
pub struct HelpBar;

impl Widget for HelpBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bindings = [
            ("Tab", "Field"),
            ("Enter", "Send"),
            ("Ctrl+T", "Variant"),
            ("Ctrl+O", "Action items"),
            ("Ctrl+Y", "Copy reply"),
            ("Ctrl+S", "Save template"),
            ("Ctrl+R", "Reset"),
            ("PgUp/PgDn", "Scroll"),
            ("Ctrl+C", "Quit"),
        ];

        let mut spans = vec![Span::raw(" ")];
        for (i, (key, desc)) in bindings.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", Theme::muted()));
            }
            spans.push(Span::styled(*key, Theme::key()));
            spans.push(Span::styled(format!(" {}", desc), Theme::key_desc()));
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

/// Render a single message to lines for display
/// max_width: terminal width for text wrapping (0 = no wrapping)
pub fn render_message_lines(msg: &Message, max_width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = max_width.saturating_sub(4); // Account for "  " indent and some margin

    if msg.role == MessageRole::System {
        let style = Theme::dim().add_modifier(Modifier::ITALIC);
        for content_line in msg.content.lines() {
            for wrapped_line in wrap_text(content_line, content_width, "  ") {
                lines.push(Line::from(vec![
                    Span::styled("  ", Theme::dim()),
                    Span::styled(wrapped_line, style),
                ]));
            }
        }
        lines.push(Line::from(""));
        return lines;
    }

    let (badge_text, badge_style) = match msg.role {
        MessageRole::User => (" User ", Theme::user_badge()),
        _ => (" Model ", Theme::model_badge()),
    };
    lines.push(Line::from(Span::styled(badge_text, badge_style)));

    // Model replies are usually markdown; user text is shown as typed
    let use_markdown = msg.role == MessageRole::Model;
    for content_line in msg.content.lines() {
        let wrapped = wrap_text(content_line, content_width, "  ");
        for (i, wrapped_line) in wrapped.into_iter().enumerate() {
            let indent = if i == 0 { "  " } else { "    " };
            let mut spans = vec![Span::raw(indent.to_string())];
            if use_markdown {
                spans.extend(parse_markdown(&wrapped_line, Theme::text()));
            } else {
                spans.push(Span::styled(wrapped_line, Theme::text()));
            }
            lines.push(Line::from(spans));
        }
    }

    // Add empty line for spacing
    lines.push(Line::from(""));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("abcdefghij", 6, "  ");
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("short", 80, "  "), vec!["short"]);
    }

    #[test]
    fn test_markdown_strips_markers() {
        let spans = parse_markdown("Try **deep** breathing and `box` counts", Style::default());
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "Try deep breathing and box counts");
    }

    #[test]
    fn test_render_model_message() {
        let msg = Message::from(TranscriptEntry {
            role: TurnRole::Model,
            text: "Hi there\nDrink *water*".to_string(),
        });
        let lines = render_message_lines(&msg, 40);
        assert_eq!(plain(&lines[0]), " Model ");
        assert_eq!(plain(&lines[1]), "  Hi there");
        assert_eq!(plain(&lines[2]), "  Drink water");
        assert_eq!(plain(lines.last().unwrap()), "");
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn test_input_box_follows_cursor_past_right_edge() {
        let line =
            "You are a friendly coach who always answers in at most fifty words and ENDMARK";
        let area = Rect::new(0, 0, 40, 6);
        let (scroll, cursor) = input_viewport(area, (0, line.width()));

        let mut buf = Buffer::empty(area);
        InputBox {
            title: "Prompt-A template",
            content: line,
            placeholder: "",
            focused: true,
            scroll,
        }
        .render(area, &mut buf);

        let all: String = (0..area.height).map(|y| row_text(&buf, y)).collect();
        assert!(all.contains("ENDMARK"));
        assert!(!all.contains("You are"));
        assert_eq!(cursor, (39 - 1, 1));
    }

    #[test]
    fn test_input_viewport_short_text_and_overflow() {
        let area = Rect::new(2, 3, 20, 5);
        assert_eq!(input_viewport(area, (1, 4)), ((0, 0), (7, 5)));

        // Lower lines scroll the view down; huge columns must not overflow
        let ((top, left), (x, y)) = input_viewport(area, (10, 200_000));
        assert_eq!(top, 8);
        assert_eq!(left, u16::MAX);
        assert_eq!(y, 3 + 1 + 2);
        assert_eq!(x, 2 + 1 + 17);
    }

    #[test]
    fn test_render_system_message() {
        let lines = render_message_lines(&Message::system("No messages yet"), 40);
        assert_eq!(plain(&lines[0]), "  No messages yet");
    }
}
