use std::sync::Arc;

use crate::domain::ProfanityLexicon;

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 1000;
/// Consecutive repeats of one character at which text counts as spam.
pub const SPAM_REPEAT_THRESHOLD: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContentViolation {
    #[error("message has {chars} characters, limit is {max}")]
    TooLong { chars: usize, max: usize },
    #[error("message repeats one character too many times in a row")]
    RepeatedCharacters,
    #[error("message contains blocked words")]
    Profanity,
}

/// Gate applied to outbound user text, identically on the widget and the server.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    lexicon: Arc<ProfanityLexicon>,
    max_chars: usize,
}

impl ContentValidator {
    pub fn new(lexicon: Arc<ProfanityLexicon>, max_chars: usize) -> Self {
        Self { lexicon, max_chars }
    }

    pub fn validate(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }

    pub fn check(&self, text: &str) -> Result<(), ContentViolation> {
        let chars = text.chars().count();
        if chars > self.max_chars {
            return Err(ContentViolation::TooLong {
                chars,
                max: self.max_chars,
            });
        }

        if longest_repeat_run(text) >= SPAM_REPEAT_THRESHOLD {
            return Err(ContentViolation::RepeatedCharacters);
        }

        if self.lexicon.contains_profanity(text) {
            return Err(ContentViolation::Profanity);
        }

        Ok(())
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn lexicon(&self) -> &Arc<ProfanityLexicon> {
        &self.lexicon
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(Arc::new(ProfanityLexicon::default()), DEFAULT_MAX_MESSAGE_CHARS)
    }
}

/// Length of the longest case-insensitive run of one character. Line
/// terminators break runs and never count towards one.
fn longest_repeat_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;

    for ch in text.chars() {
        if is_line_terminator(ch) {
            previous = None;
            current = 0;
            continue;
        }

        match previous {
            Some(prev) if same_ignoring_case(prev, ch) => current += 1,
            _ => current = 1,
        }
        previous = Some(ch);
        longest = longest.max(current);
    }

    longest
}

fn same_ignoring_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}
