use std::time::{Duration, Instant};

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudMode {
    Normal,
    Error,
}

/// Transient one-line message shown at the bottom of the frame
#[derive(Debug, Clone)]
pub struct HudMessage {
    pub message: String,
    pub expires_at: Instant,
    pub mode: HudMode,
}

impl HudMessage {
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

    pub fn new(message: impl Into<String>, duration: Duration, mode: HudMode) -> Self {
        Self {
            message: message.into(),
            expires_at: Instant::now() + duration,
            mode,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Self::DEFAULT_DURATION, HudMode::Normal)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Self::DEFAULT_DURATION, HudMode::Error)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn styled_line(&self) -> Line<'static> {
        let style = match self.mode {
            HudMode::Normal => Style::default()
                .fg(Color::Rgb(0xCD, 0xD3, 0xDE))
                .bg(Color::Rgb(0x4F, 0x5B, 0x66))
                .add_modifier(Modifier::BOLD),
            HudMode::Error => Style::default()
                .fg(Color::Rgb(0xF0, 0xF4, 0xF8))
                .bg(Color::Rgb(0xEC, 0x5F, 0x67))
                .add_modifier(Modifier::BOLD),
        };

        Line::from(vec![Span::styled(format!(" {} ", self.message), style)]).centered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_message_expires_immediately() {
        let hud = HudMessage::new("saved", Duration::ZERO, HudMode::Normal);
        assert!(hud.is_expired());
        assert!(!HudMessage::info("saved").is_expired());
    }

    #[test]
    fn styled_line_pads_message() {
        let line = HudMessage::error("boom").styled_line();
        assert_eq!(line.spans[0].content, " boom ");
    }
}
