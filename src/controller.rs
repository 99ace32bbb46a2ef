use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::domain::{Message, TvConfig};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TvConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Read terminal events on a dedicated thread and forward them to `sender`.
    pub fn spawn_input_reader(&self, sender: mpsc::Sender<Event>) {
        let poll_time = Duration::from_millis(self.event_poll_time);
        std::thread::spawn(move || {
            loop {
                match event::poll(poll_time) {
                    Ok(true) => match event::read() {
                        Ok(evt) => {
                            if sender.blocking_send(evt).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!("Failed to read terminal event: {err}"),
                    },
                    Ok(false) => {
                        if sender.is_closed() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Failed to poll terminal events: {err}");
                        break;
                    }
                }
            }
        });
    }

    /// Map a terminal event to a message. With `raw_keys` set every key press
    /// is passed through untouched for the line editor.
    pub fn handle_event(&self, event: Event, raw_keys: bool) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if raw_keys {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width, height)),
            _ => None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                KeyCode::Char('r') => Some(Message::Refresh),
                _ => None,
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc | KeyCode::Backspace => Some(Message::Exit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Char('s') => Some(Message::ToggleSort),
            KeyCode::Char('f') => Some(Message::CycleFilterField),
            KeyCode::Char('/') => Some(Message::EditFilter),
            KeyCode::Char('x') => Some(Message::ClearFilter),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('z') => Some(Message::CyclePageSize),
            KeyCode::Char('r') => Some(Message::Refresh),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
