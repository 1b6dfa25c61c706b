//! User prompts raised by the session.
//!
//! The session never talks to a toolkit directly. Whenever it needs an
//! answer (the category of a freshly drawn shape, whether unsaved work may
//! be thrown away) it asks its [`Prompter`].

/// Answers the questions the session asks while annotating.
pub trait Prompter {
    /// Pick the category of a new shape from `categories`.
    ///
    /// `suggested` is the category chosen last, if any. Returning `None`
    /// cancels and the shape is discarded.
    fn choose_category(&mut self, categories: &[String], suggested: Option<&str>)
    -> Option<String>;

    /// Whether unsaved annotations may be discarded to move on.
    fn confirm_discard(&mut self) -> bool;
}

/// Prompter for headless use: cancels every category prompt and keeps
/// unsaved work.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn choose_category(&mut self, categories: &[String], _suggested: Option<&str>) -> Option<String> {
        log::debug!(
            "Category prompt with {} choices cancelled (non-interactive)",
            categories.len()
        );
        None
    }

    fn confirm_discard(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_interactive_cancels_and_keeps() {
        let mut prompter = NonInteractive;
        let names = vec!["car".to_string()];
        assert_eq!(prompter.choose_category(&names, Some("car")), None);
        assert!(!prompter.confirm_discard());
    }
}
