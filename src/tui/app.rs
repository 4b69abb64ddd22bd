//! Main TUI application

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame, Terminal,
};
use tracing::warn;

use super::input::{InputAction, InputState};
use super::theme::Theme;
use super::widgets::{
    input_viewport, render_message_lines, ComparisonPanel, HeaderBar, HelpBar, InputBox, Message,
    StatusBar, TextPanel, VariantTabs,
};
use crate::config;
use crate::gemini::ChatProvider;
use crate::lab::view::{self, ActionItemsReveal};
use crate::lab::{Lab, VariantId};

/// Lines moved per PageUp/PageDown
const PAGE_SCROLL: usize = 5;

/// Editable field with keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Name,
    Minutes,
    Summaries,
    Template,
    Message,
}

impl Focus {
    const ORDER: [Focus; 5] = [
        Focus::Name,
        Focus::Minutes,
        Focus::Summaries,
        Focus::Template,
        Focus::Message,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Focus {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    fn prev(self) -> Focus {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Last status message shown in the status bar
#[derive(Debug, Clone)]
struct StatusLine {
    text: String,
    is_error: bool,
    at: DateTime<Local>,
}

/// Application state
pub struct App<C: ChatProvider> {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    lab: Lab,
    provider: C,
    model: String,
    config_file: PathBuf,
    active: VariantId,
    focus: Focus,
    name_input: InputState,
    minutes_input: InputState,
    summaries_input: InputState,
    template_inputs: [InputState; 2],
    message_inputs: [InputState; 2],
    show_action_items: [bool; 2],
    scroll_offset: usize,
    spinner_frame: usize,
    is_processing: bool,
    status: Option<StatusLine>,
    should_quit: bool,
}

impl<C: ChatProvider> App<C> {
    /// Take over the terminal and seed every field from `lab`.
    pub fn new(lab: Lab, provider: C, model: String, config_file: PathBuf) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, crossterm::event::EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let template_inputs =
            VariantId::ALL.map(|id| InputState::multiline(&lab.variant(id).template));

        Ok(Self {
            terminal,
            name_input: InputState::with_content(&lab.user.name),
            minutes_input: InputState::numeric(&lab.user.session_minutes().to_string()),
            summaries_input: InputState::multiline(&lab.user.summaries),
            template_inputs,
            message_inputs: [InputState::new(), InputState::new()],
            lab,
            provider,
            model,
            config_file,
            active: VariantId::A,
            focus: Focus::Message,
            show_action_items: [false, false],
            scroll_offset: 0,
            spinner_frame: 0,
            is_processing: false,
            status: None,
            should_quit: false,
        })
    }

    /// Run the main event loop
    pub async fn run(&mut self) -> io::Result<()> {
        let poll_timeout = Duration::from_millis(80);
        let spinner_interval = Duration::from_millis(80);
        let mut last_spinner_update = Instant::now();

        while !self.should_quit {
            if last_spinner_update.elapsed() >= spinner_interval {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                last_spinner_update = Instant::now();
            }

            self.draw()?;

            if event::poll(poll_timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_input(key).await;
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollUp => {
                            self.scroll_offset = self.scroll_offset.saturating_add(1);
                        }
                        MouseEventKind::ScrollDown => {
                            self.scroll_offset = self.scroll_offset.saturating_sub(1);
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn focused_input_mut(&mut self) -> &mut InputState {
        let i = self.active.index();
        match self.focus {
            Focus::Name => &mut self.name_input,
            Focus::Minutes => &mut self.minutes_input,
            Focus::Summaries => &mut self.summaries_input,
            Focus::Template => &mut self.template_inputs[i],
            Focus::Message => &mut self.message_inputs[i],
        }
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusLine {
            text: text.into(),
            is_error,
            at: Local::now(),
        });
    }

    fn set_focus(&mut self, focus: Focus) {
        if self.focus == Focus::Minutes {
            // Show the clamped value once the user is done typing
            self.minutes_input
                .set_buffer(&self.lab.user.session_minutes().to_string());
        }
        self.focus = focus;
    }

    async fn handle_input(&mut self, key: KeyEvent) {
        let action = self.focused_input_mut().handle_key(key);

        match action {
            InputAction::Quit => self.should_quit = true,
            InputAction::NextField => self.set_focus(self.focus.next()),
            InputAction::PrevField => self.set_focus(self.focus.prev()),
            InputAction::SwitchVariant => {
                self.active = self.active.other();
                self.scroll_offset = 0;
            }
            InputAction::ToggleActionItems => {
                let i = self.active.index();
                self.show_action_items[i] = !self.show_action_items[i];
            }
            InputAction::CopyReply => self.copy_reply(),
            InputAction::SaveTemplate => self.save_template(),
            InputAction::ResetSession => self.reset_session(),
            InputAction::Edited => self.sync_focused_field(),
            InputAction::Submit(text) => self.handle_submit(text).await,
            InputAction::Up => self.handle_vertical(true),
            InputAction::Down => self.handle_vertical(false),
            InputAction::ScrollUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(PAGE_SCROLL);
            }
            InputAction::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(PAGE_SCROLL);
            }
            InputAction::None | InputAction::CursorMoved => {}
        }
    }

    /// Push the focused field's buffer into the lab
    fn sync_focused_field(&mut self) {
        match self.focus {
            Focus::Name => self.lab.user.name = self.name_input.buffer.clone(),
            Focus::Minutes => {
                if let Ok(minutes) = self.minutes_input.buffer.parse::<u32>() {
                    self.lab.user.set_session_minutes(minutes);
                }
            }
            Focus::Summaries => self.lab.user.summaries = self.summaries_input.buffer.clone(),
            Focus::Template => {
                let template = self.template_inputs[self.active.index()].buffer.clone();
                self.lab.set_template(self.active, template);
            }
            Focus::Message => {}
        }
    }

    async fn handle_submit(&mut self, text: String) {
        match self.focus {
            Focus::Message => self.send_message(text).await,
            // Single-line fields clear on Enter; keep their value and move on
            Focus::Name => {
                self.name_input.set_buffer(&text);
                self.set_focus(self.focus.next());
            }
            Focus::Minutes => {
                self.minutes_input.set_buffer(&text);
                self.sync_focused_field();
                self.set_focus(self.focus.next());
            }
            Focus::Summaries | Focus::Template => {}
        }
    }

    /// Up/Down: adjust minutes, recall sent messages, or scroll the transcript
    fn handle_vertical(&mut self, up: bool) {
        match self.focus {
            Focus::Minutes => {
                let current = self.lab.user.session_minutes();
                let minutes = if up {
                    current.saturating_add(1)
                } else {
                    current.saturating_sub(1)
                };
                self.lab.user.set_session_minutes(minutes);
                self.minutes_input
                    .set_buffer(&self.lab.user.session_minutes().to_string());
            }
            Focus::Message => {
                let input = &mut self.message_inputs[self.active.index()];
                if up {
                    input.history_prev();
                } else {
                    input.history_next();
                }
            }
            _ => {
                self.scroll_offset = if up {
                    self.scroll_offset.saturating_add(1)
                } else {
                    self.scroll_offset.saturating_sub(1)
                };
            }
        }
    }

    async fn send_message(&mut self, message: String) {
        let id = self.active;
        self.is_processing = true;
        self.set_status(format!("Waiting for {id}..."), false);
        if let Err(e) = self.draw() {
            warn!("draw failed before send: {e}");
        }

        let result = self.lab.send(id, &message, &self.provider).await;
        self.is_processing = false;

        match result {
            Ok(()) => {
                self.scroll_offset = 0;
                self.set_status(format!("{id} replied"), false);
            }
            Err(e) => {
                // Hand the message back so it can be retried
                self.message_inputs[id.index()].set_buffer(&message);
                self.set_status(e.to_string(), true);
            }
        }
    }

    fn copy_reply(&mut self) {
        let id = self.active;
        let reply = self.lab.variant(id).last_reply.clone();
        if reply.is_empty() {
            self.set_status(format!("{id} has no reply to copy"), true);
            return;
        }

        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(reply)) {
            Ok(()) => self.set_status(format!("Copied {id} reply to clipboard"), false),
            Err(e) => self.set_status(format!("Clipboard unavailable: {e}"), true),
        }
    }

    fn save_template(&mut self) {
        let id = self.active;
        let template = self.lab.variant(id).template.clone();
        match config::save_template(&self.config_file, id, &template) {
            Ok(()) => self.set_status(
                format!("Saved {id} template to {}", self.config_file.display()),
                false,
            ),
            Err(e) => self.set_status(e.to_string(), true),
        }
    }

    fn reset_session(&mut self) {
        self.lab.reset();
        for id in VariantId::ALL {
            self.template_inputs[id.index()].set_buffer(&self.lab.variant(id).template);
        }
        self.show_action_items = [false, false];
        self.scroll_offset = 0;
        self.set_status("Session discarded", false);
    }

    fn draw(&mut self) -> io::Result<()> {
        let lab = &self.lab;
        let active = self.active;
        let focus = self.focus;
        let i = active.index();
        let show_items = self.show_action_items[i];
        let model = self.model.as_str();
        let is_processing = self.is_processing;
        let spinner_frame = self.spinner_frame;
        let scroll_offset = self.scroll_offset;
        let status = &self.status;
        let name_input = &self.name_input;
        let minutes_input = &self.minutes_input;
        let summaries_input = &self.summaries_input;
        let template_input = &self.template_inputs[i];
        let message_input = &self.message_inputs[i];

        self.terminal.draw(|f| {
            let size = f.area();

            let main_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),  // Header
                    Constraint::Length(1),  // Tabs
                    Constraint::Min(12),    // Workspace
                    Constraint::Length(12), // Comparison
                    Constraint::Length(1),  // Status
                    Constraint::Length(1),  // Help
                ])
                .split(size);

            f.render_widget(
                HeaderBar {
                    title: "Prompt A/B Lab",
                    model,
                    is_processing,
                },
                main_chunks[0],
            );

            f.render_widget(
                VariantTabs {
                    active,
                    exchanges: VariantId::ALL.map(|id| lab.variant(id).exchange_count()),
                },
                main_chunks[1],
            );

            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(34), Constraint::Min(40)])
                .split(main_chunks[2]);

            // Sidebar: user info
            let sidebar = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(4),
                ])
                .split(body[0]);

            render_field(f, sidebar[0], "User name", "", name_input, focus == Focus::Name);
            render_field(
                f,
                sidebar[1],
                "Session minutes (1-120, ↑/↓)",
                "",
                minutes_input,
                focus == Focus::Minutes,
            );
            render_field(
                f,
                sidebar[2],
                "Previous session summaries",
                "Most recent first",
                summaries_input,
                focus == Focus::Summaries,
            );

            // Main column for the active variant
            let mut constraints = vec![Constraint::Length(7), Constraint::Min(5)];
            if show_items {
                constraints.push(Constraint::Length(5));
            }
            constraints.push(Constraint::Length(3));
            let main = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints)
                .split(body[1]);

            let template_title = format!("{} template", active.label());
            render_field(
                f,
                main[0],
                &template_title,
                "<>Userinfo</> marks where the context block goes",
                template_input,
                focus == Focus::Template,
            );

            let variant = lab.variant(active);
            let mut messages: Vec<Message> =
                view::transcript(variant).into_iter().map(Message::from).collect();
            if messages.is_empty() {
                messages.push(Message::system(format!(
                    "No messages yet. Type below and press Enter to talk to {active}."
                )));
            }
            render_messages(f, main[1], &messages, scroll_offset);

            if show_items {
                let reveal = ActionItemsReveal::of(variant);
                let body_style = match &reveal {
                    ActionItemsReveal::Items(_) => Theme::warning(),
                    ActionItemsReveal::NoneFound => Theme::muted(),
                };
                f.render_widget(
                    TextPanel {
                        title: " Action Items ".to_string(),
                        body: reveal.text(),
                        body_style,
                        border_style: Theme::variant(active),
                    },
                    main[2],
                );
            }

            let message_area = main[main.len() - 1];
            let message_title = format!("Message to {active}");
            render_field(
                f,
                message_area,
                &message_title,
                "Type your message and press Enter",
                message_input,
                focus == Focus::Message,
            );

            let comparison = view::comparison(lab);
            f.render_widget(ComparisonPanel { comparison: &comparison }, main_chunks[3]);

            let (status_text, is_error) = match status {
                Some(s) if is_processing => (s.text.clone(), false),
                Some(s) => (format!("[{}] {}", s.at.format("%H:%M:%S"), s.text), s.is_error),
                None => (String::new(), false),
            };
            f.render_widget(
                StatusBar {
                    is_processing,
                    spinner_frame,
                    status_text,
                    is_error,
                },
                main_chunks[4],
            );

            f.render_widget(HelpBar, main_chunks[5]);
        })?;

        Ok(())
    }
}

/// Render an input box and, when focused, place the terminal cursor in it
fn render_field(
    f: &mut Frame,
    area: Rect,
    title: &str,
    placeholder: &str,
    input: &InputState,
    focused: bool,
) {
    let (scroll, cursor) = input_viewport(area, input.cursor_line_col());

    f.render_widget(
        InputBox {
            title,
            content: &input.buffer,
            placeholder,
            focused,
            scroll,
        },
        area,
    );

    if focused {
        f.set_cursor_position(cursor);
    }
}

fn render_messages(f: &mut Frame, area: Rect, messages: &[Message], scroll_offset: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .title_top(Line::styled(" Conversation ", Theme::muted()));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let content_width = inner.width as usize;
    let mut all_lines: Vec<Line> = Vec::new();
    for msg in messages {
        all_lines.extend(render_message_lines(msg, content_width));
    }

    // Offset counts lines up from the bottom
    let total_lines = all_lines.len();
    let visible_height = inner.height as usize;
    let max_scroll = total_lines.saturating_sub(visible_height);
    let actual_scroll = scroll_offset.min(max_scroll);

    let start = total_lines
        .saturating_sub(visible_height)
        .saturating_sub(actual_scroll);
    let visible: Vec<Line> = all_lines
        .into_iter()
        .skip(start)
        .take(visible_height)
        .collect();

    f.render_widget(Paragraph::new(visible).wrap(Wrap { trim: false }), inner);

    if total_lines > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        let mut scrollbar_state =
            ScrollbarState::new(max_scroll).position(max_scroll.saturating_sub(actual_scroll));

        f.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

impl<C: ChatProvider> Drop for App<C> {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            crossterm::event::DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_cycles_both_ways() {
        let mut focus = Focus::Message;
        for _ in 0..Focus::ORDER.len() {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Message);
        assert_eq!(Focus::Name.prev(), Focus::Message);
        assert_eq!(Focus::Message.next(), Focus::Name);
    }
}
