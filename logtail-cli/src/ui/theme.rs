//! UI Theme Module - color palette and style helpers
//!
//! Palette tokens instead of hard-coded colors, plus helpers for host health
//! and stream phase.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};

use logtail_core::host::HostStatus;
use logtail_core::state::SessionPhase;

use crate::view::ThemeKind;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (line numbers, disabled)
    pub text_muted: Color,
    /// Accent color (highlights, focus)
    pub accent: Color,
    /// Online, streaming
    pub success: Color,
    /// Connecting
    pub warn: Color,
    /// Offline, errored
    pub error: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Palette {
    /// VS Code-esque dark theme
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255), // Light blue
            success: Color::Rgb(78, 201, 176), // Teal green
            warn: Color::Rgb(220, 180, 100),   // Amber
            error: Color::Rgb(244, 135, 113),  // Coral red
            selection_bg: Color::Rgb(38, 79, 120),
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120), // Soft orange
        }
    }

    pub fn high_contrast() -> Self {
        Self {
            panel_border: Color::White,
            text: Color::White,
            text_dim: Color::Rgb(200, 200, 200),
            text_muted: Color::Rgb(150, 150, 150),
            accent: Color::Cyan,
            success: Color::Green,
            warn: Color::Yellow,
            error: Color::Red,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            key_hint: Color::Yellow,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn health_style(&self, status: HostStatus) -> Style {
        let color = match status {
            HostStatus::Online => self.palette.success,
            HostStatus::Offline => self.palette.error,
        };
        Style::default().fg(color)
    }

    pub fn health_icon(&self, status: HostStatus) -> &'static str {
        match status {
            HostStatus::Online => "●",
            HostStatus::Offline => "○",
        }
    }

    pub fn phase_style(&self, phase: SessionPhase) -> Style {
        let color = match phase {
            SessionPhase::Idle => self.palette.text_muted,
            SessionPhase::Connecting => self.palette.warn,
            SessionPhase::Streaming => self.palette.success,
            SessionPhase::Errored => self.palette.error,
        };
        Style::default().fg(color)
    }

    pub fn phase_icon(&self, phase: SessionPhase) -> &'static str {
        match phase {
            SessionPhase::Idle => "○",
            SessionPhase::Connecting => "◐",
            SessionPhase::Streaming => "●",
            SessionPhase::Errored => "✗",
        }
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn subtle_border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.palette.error)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }
}

static DARK: OnceLock<Theme> = OnceLock::new();
static HIGH_CONTRAST: OnceLock<Theme> = OnceLock::new();

pub fn theme(kind: ThemeKind) -> &'static Theme {
    match kind {
        ThemeKind::Dark => DARK.get_or_init(|| Theme::new(Palette::dark())),
        ThemeKind::HighContrast => HIGH_CONTRAST.get_or_init(|| Theme::new(Palette::high_contrast())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_themes_are_distinct() {
        assert_ne!(
            theme(ThemeKind::Dark).palette.error,
            theme(ThemeKind::HighContrast).palette.error
        );
    }

    #[test]
    fn test_health_icons() {
        let t = theme(ThemeKind::Dark);
        assert_eq!(t.health_icon(HostStatus::Online), "●");
        assert_eq!(t.health_icon(HostStatus::Offline), "○");
        assert_eq!(t.health_style(HostStatus::Offline).fg, Some(t.palette.error));
    }
}
