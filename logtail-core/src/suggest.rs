//! Filename suggestions for the file input
//!
//! Case-insensitive substring match over the active host's file list, in
//! list order, plus a cursor for keyboard navigation.

#[derive(Clone, Debug, Default)]
pub struct SuggestionIndex {
    input: String,
    matches: Vec<String>,
    cursor: Option<usize>,
    /// Pick armed by a pointer press, committed on blur before closing
    armed: Option<usize>,
}

/// True when `name` contains `pattern`, ignoring case
pub fn matches(name: &str, pattern: &str) -> bool {
    pattern.is_empty() || name.to_lowercase().contains(&pattern.to_lowercase())
}

impl SuggestionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute suggestions for `input`; the cursor goes back to none
    pub fn update(&mut self, files: &[String], input: &str) -> &[String] {
        self.input = input.to_string();
        self.matches = files
            .iter()
            .filter(|f| matches(f, input))
            .cloned()
            .collect();
        self.cursor = None;
        self.armed = None;
        &self.matches
    }

    /// Replace the input text without offering suggestions
    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
        self.close();
    }

    /// Input gained focus: populate from the current input text
    pub fn focus(&mut self, files: &[String]) -> &[String] {
        let input = std::mem::take(&mut self.input);
        self.update(files, &input)
    }

    /// Input lost focus. An armed pick is committed first, then the list
    /// closes. Returns the committed value, if any.
    pub fn blur(&mut self) -> Option<String> {
        let committed = self.armed.take().and_then(|index| self.select(index));
        self.close();
        committed
    }

    /// Pointer pressed on a suggestion; committed on release or blur
    pub fn press(&mut self, index: usize) {
        if index < self.matches.len() {
            self.armed = Some(index);
            self.cursor = Some(index);
        }
    }

    pub fn move_next(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.cursor = Some(match self.cursor {
            Some(i) if i + 1 < self.matches.len() => i + 1,
            _ => 0,
        });
    }

    pub fn move_previous(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        let last = self.matches.len() - 1;
        self.cursor = Some(match self.cursor {
            Some(0) | None => last,
            Some(i) => (i - 1).min(last),
        });
    }

    /// Commit suggestion `index` as the input text and close the list
    pub fn select(&mut self, index: usize) -> Option<String> {
        let value = self.matches.get(index)?.clone();
        self.input = value.clone();
        self.close();
        Some(value)
    }

    /// Commit the suggestion under the cursor
    pub fn select_current(&mut self) -> Option<String> {
        self.cursor.and_then(|index| self.select(index))
    }

    /// Drop suggestions and the cursor; input text stays
    pub fn close(&mut self) {
        self.matches.clear();
        self.cursor = None;
        self.armed = None;
    }

    /// Forget everything, including the input text
    pub fn reset(&mut self) {
        self.close();
        self.input.clear();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.matches
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_open(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<String> {
        vec![
            "system.log".to_string(),
            "application.log".to_string(),
            "another.log".to_string(),
        ]
    }

    #[test]
    fn test_filter_preserves_order() {
        let mut index = SuggestionIndex::new();
        assert_eq!(index.update(&files(), "app"), ["application.log"]);
        assert_eq!(
            index.update(&files(), ""),
            ["system.log", "application.log", "another.log"]
        );
        assert_eq!(index.update(&files(), "AN"), ["another.log"]);
        assert_eq!(index.update(&files(), ".LOG").len(), 3);
        assert!(index.update(&files(), "nope").is_empty());
    }

    #[test]
    fn test_cursor_wraps_forward() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "");
        assert_eq!(index.cursor(), None);
        index.move_next();
        assert_eq!(index.cursor(), Some(0));
        index.move_next();
        assert_eq!(index.cursor(), Some(1));
        index.move_next();
        assert_eq!(index.cursor(), Some(2));
        index.move_next();
        assert_eq!(index.cursor(), Some(0));
    }

    #[test]
    fn test_cursor_wraps_backward() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "");
        index.move_previous();
        assert_eq!(index.cursor(), Some(2));
        index.move_previous();
        index.move_previous();
        assert_eq!(index.cursor(), Some(0));
        index.move_previous();
        assert_eq!(index.cursor(), Some(2));
    }

    #[test]
    fn test_navigation_noop_when_empty() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "zzz");
        index.move_next();
        index.move_previous();
        assert_eq!(index.cursor(), None);
        assert_eq!(index.select_current(), None);
    }

    #[test]
    fn test_update_resets_cursor() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "");
        index.move_next();
        index.update(&files(), "s");
        assert_eq!(index.cursor(), None);
    }

    #[test]
    fn test_select_commits_and_closes() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "log");
        index.move_next();
        index.move_next();
        assert_eq!(index.select_current().as_deref(), Some("application.log"));
        assert_eq!(index.input(), "application.log");
        assert!(!index.is_open());
        assert_eq!(index.cursor(), None);
    }

    #[test]
    fn test_blur_commits_armed_pick_before_closing() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "a");
        index.press(1);
        assert_eq!(index.blur().as_deref(), Some("another.log"));
        assert_eq!(index.input(), "another.log");
        assert!(!index.is_open());
    }

    #[test]
    fn test_blur_without_pick_keeps_input() {
        let mut index = SuggestionIndex::new();
        index.update(&files(), "sys");
        assert_eq!(index.blur(), None);
        assert_eq!(index.input(), "sys");
        assert!(index.suggestions().is_empty());

        assert_eq!(index.focus(&files()), ["system.log"]);
    }
}
