use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use shelfscan_ingest::CancelSignal;

/// Cancels continuous capture on `q`, Esc or Ctrl-C. Holds the terminal in
/// raw mode for its lifetime.
pub struct KeyCancel {
    _raw: RawModeGuard,
}

impl KeyCancel {
    pub fn new() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { _raw: RawModeGuard })
    }
}

impl CancelSignal for KeyCancel {
    fn is_cancelled(&self) -> bool {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(false) => return false,
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if is_quit(&key) => return true,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!("terminal read failed, stopping capture: {err}");
                        return true;
                    }
                },
                Err(err) => {
                    tracing::warn!("terminal poll failed, stopping capture: {err}");
                    return true;
                }
            }
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit(&press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&press(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&press(KeyCode::Enter, KeyModifiers::NONE)));
    }
}
