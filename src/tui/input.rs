//! Input handling for the TUI

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Result of handling an input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// No action needed
    None,
    /// Buffer content changed
    Edited,
    /// Submit the current input (single-line fields only)
    Submit(String),
    /// Quit the application
    Quit,
    /// Scroll up in the transcript
    ScrollUp,
    /// Scroll down in the transcript
    ScrollDown,
    /// Move focus to the next field
    NextField,
    /// Move focus to the previous field
    PrevField,
    /// Switch to the other variant tab
    SwitchVariant,
    /// Show/hide the action items of the active variant
    ToggleActionItems,
    /// Copy the active variant's last reply
    CopyReply,
    /// Save the active template to the config file
    SaveTemplate,
    /// Discard both conversations
    ResetSession,
    /// Up arrow (history, increment or scroll depending on field)
    Up,
    /// Down arrow
    Down,
    /// Cursor moved without editing
    CursorMoved,
}

/// Input state manager
///
/// Note: `cursor` is a CHARACTER index, not a byte index.
/// This is important for proper handling of multi-byte characters (e.g., Chinese).
#[derive(Debug, Clone)]
pub struct InputState {
    /// Current input buffer
    pub buffer: String,
    /// Cursor position in buffer (character index, not byte index!)
    pub cursor: usize,
    /// Enter inserts a newline instead of submitting
    pub multiline: bool,
    /// Only ASCII digits are accepted
    pub digits_only: bool,
    /// Submitted entries
    pub history: Vec<String>,
    /// Current history index (-1 means current input)
    pub history_index: isize,
    /// Saved current input when browsing history
    pub saved_input: String,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            multiline: false,
            digits_only: false,
            history: Vec::new(),
            history_index: -1,
            saved_input: String::new(),
        }
    }

    /// Multi-line editor seeded with `content`, cursor at the end
    pub fn multiline(content: &str) -> Self {
        let mut state = Self::new();
        state.multiline = true;
        state.set_buffer(content);
        state
    }

    /// Single-line field seeded with `content`
    pub fn with_content(content: &str) -> Self {
        let mut state = Self::new();
        state.set_buffer(content);
        state
    }

    /// Digits-only field seeded with `content`
    pub fn numeric(content: &str) -> Self {
        let mut state = Self::with_content(content);
        state.digits_only = true;
        state
    }

    /// Get the number of characters in the buffer
    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Convert character index to byte index
    fn char_to_byte_index(&self, char_idx: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }

    /// Insert a character at the current cursor position (character index)
    fn insert_char(&mut self, c: char) {
        let byte_idx = self.char_to_byte_index(self.cursor);
        self.buffer.insert(byte_idx, c);
        self.cursor += 1;
    }

    /// Remove the character before the cursor
    fn remove_char_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_idx = self.char_to_byte_index(self.cursor);
            if let Some((_, ch)) = self.buffer.char_indices().nth(self.cursor) {
                self.buffer.replace_range(byte_idx..byte_idx + ch.len_utf8(), "");
            }
        }
    }

    /// Remove the character at the cursor position
    fn remove_char_at_cursor(&mut self) {
        let char_count = self.char_count();
        if self.cursor < char_count {
            let byte_idx = self.char_to_byte_index(self.cursor);
            if let Some((_, ch)) = self.buffer.char_indices().nth(self.cursor) {
                self.buffer.replace_range(byte_idx..byte_idx + ch.len_utf8(), "");
            }
        }
    }

    /// Handle a key event and return the action
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Quit
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => InputAction::Quit,

            // Lab commands
            KeyCode::Char('t') if ctrl => InputAction::SwitchVariant,
            KeyCode::Char('o') if ctrl => InputAction::ToggleActionItems,
            KeyCode::Char('y') if ctrl => InputAction::CopyReply,
            KeyCode::Char('s') if ctrl => InputAction::SaveTemplate,
            KeyCode::Char('r') if ctrl => InputAction::ResetSession,

            // Focus
            KeyCode::Tab => InputAction::NextField,
            KeyCode::BackTab => InputAction::PrevField,

            // Submit or newline
            KeyCode::Enter if self.multiline => {
                self.insert_char('\n');
                InputAction::Edited
            }
            KeyCode::Enter => {
                if !self.buffer.is_empty() {
                    let input = self.buffer.clone();
                    self.history.push(input.clone());
                    self.buffer.clear();
                    self.cursor = 0;
                    self.history_index = -1;
                    InputAction::Submit(input)
                } else {
                    InputAction::None
                }
            }

            // Editing
            KeyCode::Backspace => {
                self.remove_char_before_cursor();
                InputAction::Edited
            }
            KeyCode::Delete => {
                self.remove_char_at_cursor();
                InputAction::Edited
            }

            // Clear
            KeyCode::Char('u') if ctrl => {
                self.buffer.clear();
                self.cursor = 0;
                InputAction::Edited
            }

            // Delete word
            KeyCode::Char('w') if ctrl => {
                self.delete_word();
                InputAction::Edited
            }

            // Cursor movement
            KeyCode::Left => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                }
                InputAction::CursorMoved
            }
            KeyCode::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                }
                InputAction::CursorMoved
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::CursorMoved
            }
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                InputAction::CursorMoved
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                InputAction::CursorMoved
            }
            KeyCode::Char('e') if ctrl => {
                self.cursor = self.char_count();
                InputAction::CursorMoved
            }

            KeyCode::Up => InputAction::Up,
            KeyCode::Down => InputAction::Down,

            // PageUp/PageDown for transcript scrolling
            KeyCode::PageUp => InputAction::ScrollUp,
            KeyCode::PageDown => InputAction::ScrollDown,

            // Regular input
            KeyCode::Char(c) if !ctrl => {
                if self.digits_only && !c.is_ascii_digit() {
                    return InputAction::None;
                }
                self.insert_char(c);
                InputAction::Edited
            }

            _ => InputAction::None,
        }
    }

    /// Replace buffer content with a new string
    pub fn set_buffer(&mut self, content: &str) {
        self.buffer = content.to_string();
        self.cursor = self.char_count();
    }

    fn delete_word(&mut self) {
        if self.cursor == 0 {
            return;
        }

        let chars: Vec<char> = self.buffer.chars().collect();

        // Skip trailing whitespace
        while self.cursor > 0 && chars.get(self.cursor - 1).is_some_and(|c| c.is_whitespace()) {
            self.remove_char_before_cursor();
        }

        // Delete until whitespace or start
        while self.cursor > 0 {
            let chars: Vec<char> = self.buffer.chars().collect();
            if chars.get(self.cursor - 1).is_some_and(|c| c.is_whitespace()) {
                break;
            }
            self.remove_char_before_cursor();
        }
    }

    /// Recall the previous submitted entry
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }

        if self.history_index == -1 {
            self.saved_input = self.buffer.clone();
        }

        if self.history_index < self.history.len() as isize - 1 {
            self.history_index += 1;
            let idx = self.history.len() - 1 - self.history_index as usize;
            self.buffer = self.history[idx].clone();
            self.cursor = self.char_count();
        }
    }

    /// Step forward through submitted entries, back to the saved input
    pub fn history_next(&mut self) {
        if self.history_index > 0 {
            self.history_index -= 1;
            let idx = self.history.len() - 1 - self.history_index as usize;
            self.buffer = self.history[idx].clone();
            self.cursor = self.char_count();
        } else if self.history_index == 0 {
            self.history_index = -1;
            self.buffer = self.saved_input.clone();
            self.cursor = self.char_count();
        }
    }

    /// Cursor position as (line, display column), for placing the terminal
    /// cursor. Wide characters (like CJK) take 2 columns.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.buffer.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += c.width().unwrap_or(1);
            }
        }
        (line, col)
    }
}
