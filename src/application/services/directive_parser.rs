use regex::Regex;
use std::sync::LazyLock;

use crate::domain::{Directive, LinkButton, ParsedReply};

/// `{{choice:LABEL}}` or `{{link:URL|LABEL}}`.
static DIRECTIVE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?:choice:(?P<choice>[^}]+)|link:(?P<url>[^|}]+)\|(?P<label>[^}]+))\}\}")
        .unwrap()
});

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").unwrap());

/// Splits assistant text into prose and button directives, in order of appearance.
pub fn parse_directives(text: &str) -> ParsedReply {
    let mut directives = Vec::new();
    let mut remaining = text.to_string();

    // Stripping a token can join its neighbours into a new one; repeat until
    // nothing matches so re-parsing the clean text finds no directives.
    while DIRECTIVE_TOKEN.is_match(&remaining) {
        directives.extend(
            DIRECTIVE_TOKEN
                .captures_iter(&remaining)
                .filter_map(|caps| directive_from_captures(&caps)),
        );
        remaining = DIRECTIVE_TOKEN.replace_all(&remaining, "").into_owned();
    }

    let clean_text = EXCESS_BLANK_LINES
        .replace_all(&remaining, "\n\n")
        .trim()
        .to_string();

    let choices = directives
        .iter()
        .filter_map(|d| match d {
            Directive::Choice { label } => Some(label.clone()),
            Directive::Link { .. } => None,
        })
        .collect();

    let links = directives
        .iter()
        .filter_map(|d| match d {
            Directive::Link { url, label } => Some(LinkButton {
                url: url.clone(),
                label: label.clone(),
            }),
            Directive::Choice { .. } => None,
        })
        .collect();

    ParsedReply {
        clean_text,
        choices,
        links,
        directives,
    }
}

/// Parses a reply that is still arriving. A token whose closing braces have
/// not arrived yet is hidden instead of being shown as prose.
pub fn parse_streaming(buffer: &str) -> ParsedReply {
    parse_directives(without_open_token(buffer))
}

fn without_open_token(buffer: &str) -> &str {
    if let Some(start) = buffer.rfind("{{") {
        if !buffer[start..].contains("}}") {
            return &buffer[..start];
        }
    }
    buffer.strip_suffix('{').unwrap_or(buffer)
}

fn directive_from_captures(caps: &regex::Captures<'_>) -> Option<Directive> {
    if let Some(choice) = caps.name("choice") {
        let label = choice.as_str().trim();
        return (!label.is_empty()).then(|| Directive::Choice {
            label: label.to_string(),
        });
    }

    let url = caps.name("url")?.as_str().trim();
    let label = caps.name("label")?.as_str().trim();
    if url.is_empty() || label.is_empty() {
        return None;
    }
    Some(Directive::Link {
        url: url.to_string(),
        label: label.to_string(),
    })
}
