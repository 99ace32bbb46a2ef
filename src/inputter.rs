use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single line text input used for the filter value.
/// The cursor counts characters, not bytes.
#[derive(Debug, Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.finished = true,
            (KeyCode::Esc, _) => {
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            (KeyCode::Right, _) => self.cursor_pos = (self.cursor_pos + 1).min(self.len()),
            (KeyCode::Home, _) => self.cursor_pos = 0,
            (KeyCode::End, _) => self.cursor_pos = self.len(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.clear(),
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => self.insert(chr),
            (code, modifiers) => trace!("Ignoring input key {code:?} {modifiers:?}"),
        }
        self.get()
    }

    /// Start editing from `s` with the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.cursor_pos = self.len();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn len(&self) -> usize {
        self.current_input.chars().count()
    }

    fn insert(&mut self, chr: char) {
        let at = self.byte_pos(self.cursor_pos);
        self.current_input.insert(at, chr);
        self.cursor_pos += 1;
    }

    fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let at = self.byte_pos(self.cursor_pos);
            self.current_input.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor_pos < self.len() {
            let at = self.byte_pos(self.cursor_pos);
            self.current_input.remove(at);
        }
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}
