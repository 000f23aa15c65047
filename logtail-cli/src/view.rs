//! Display preferences for the log pane
//!
//! `ViewPrefs` is a plain value; every change goes through `apply`, which
//! returns the next value and leaves the old one untouched.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeKind {
    #[default]
    Dark,
    HighContrast,
}

impl ThemeKind {
    pub fn toggled(self) -> Self {
        match self {
            ThemeKind::Dark => ThemeKind::HighContrast,
            ThemeKind::HighContrast => ThemeKind::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeKind::Dark => "dark",
            ThemeKind::HighContrast => "high contrast",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewPrefs {
    pub line_numbers: bool,
    pub theme: ThemeKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewAction {
    ToggleLineNumbers,
    ToggleTheme,
    SetLineNumbers(bool),
}

impl ViewPrefs {
    pub fn apply(self, action: ViewAction) -> Self {
        match action {
            ViewAction::ToggleLineNumbers => Self {
                line_numbers: !self.line_numbers,
                ..self
            },
            ViewAction::ToggleTheme => Self {
                theme: self.theme.toggled(),
                ..self
            },
            ViewAction::SetLineNumbers(line_numbers) => Self {
                line_numbers,
                ..self
            },
        }
    }
}

/// Prefix a line with its 1-based number, right-aligned to `width`
pub fn numbered(number: usize, width: usize, text: &str) -> String {
    format!("{:>width$} │ {}", number, text, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_returns_new_value() {
        let prefs = ViewPrefs::default();
        let next = prefs.apply(ViewAction::ToggleLineNumbers);
        assert!(!prefs.line_numbers);
        assert!(next.line_numbers);
        assert_eq!(next.theme, ThemeKind::Dark);

        let back = next.apply(ViewAction::ToggleLineNumbers);
        assert_eq!(back, prefs);
    }

    #[test]
    fn test_theme_toggle() {
        let prefs = ViewPrefs::default().apply(ViewAction::ToggleTheme);
        assert_eq!(prefs.theme, ThemeKind::HighContrast);
        assert_eq!(prefs.apply(ViewAction::ToggleTheme).theme, ThemeKind::Dark);
    }

    #[test]
    fn test_set_line_numbers_is_absolute() {
        let prefs = ViewPrefs::default()
            .apply(ViewAction::SetLineNumbers(true))
            .apply(ViewAction::SetLineNumbers(true));
        assert!(prefs.line_numbers);
    }

    #[test]
    fn test_numbered_alignment() {
        assert_eq!(numbered(7, 3, "hello"), "  7 │ hello");
        assert_eq!(numbered(120, 3, ""), "120 │ ");
    }
}
