use std::collections::BTreeSet;

use regex::Regex;

/// Baseline list of blocked words, matched as whole words regardless of case.
pub const DEFAULT_PROFANE_WORDS: &[&str] = &[
    "anal", "anus", "arse", "arsehole", "ass", "asshole", "bastard", "bitch", "bitches",
    "blowjob", "bollocks", "boner", "boob", "boobs", "bullshit", "clit", "cock", "cocks",
    "coon", "crap", "cum", "cunt", "cunts", "damn", "dick", "dickhead", "dildo", "douche",
    "douchebag", "dyke", "fag", "faggot", "fuck", "fucked", "fucker", "fucking", "fucks",
    "goddamn", "handjob", "horny", "jackass", "jerkoff", "jizz", "kike", "milf", "motherfucker",
    "nigga", "nigger", "nude", "orgasm", "penis", "piss", "pissed", "porn", "porno", "prick",
    "pussy", "rape", "rapist", "retard", "scrotum", "semen", "sex", "shit", "shits", "shitty",
    "skank", "slut", "spic", "tits", "titties", "twat", "vagina", "wank", "wanker", "whore",
];

/// Entries the widget blocks on top of the baseline list.
pub const DEFAULT_EXTRA_WORDS: &[&str] = &["casino", "gambling", "poker", "bet"];

/// Immutable word set compiled into a single matcher at construction.
#[derive(Debug, Clone)]
pub struct ProfanityLexicon {
    words: BTreeSet<String>,
    matcher: Option<Regex>,
}

impl ProfanityLexicon {
    pub fn new<A, R>(base: &[&str], add: A, remove: R) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut words: BTreeSet<String> = base
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        for word in add {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() {
                words.insert(word);
            }
        }
        for word in remove {
            words.remove(&word.as_ref().trim().to_lowercase());
        }

        let matcher = build_matcher(&words);
        Self { words, matcher }
    }

    /// Baseline list plus [`DEFAULT_EXTRA_WORDS`], adjusted by configured lists.
    pub fn with_overrides(add: &[String], remove: &[String]) -> Self {
        let add = DEFAULT_EXTRA_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(add.iter().cloned());
        Self::new(DEFAULT_PROFANE_WORDS, add, remove)
    }

    pub fn contains_profanity(&self, text: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for ProfanityLexicon {
    fn default() -> Self {
        Self::with_overrides(&[], &[])
    }
}

fn build_matcher(words: &BTreeSet<String>) -> Option<Regex> {
    if words.is_empty() {
        return None;
    }

    // Longest first so alternation prefers "fucking" over "fuck".
    let mut ordered: Vec<&String> = words.iter().collect();
    ordered.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

    let alternation = ordered
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = format!(r"(?i)(?:^|\W)(?:{})(?:\W|$)", alternation);
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compile profanity matcher");
            None
        }
    }
}
