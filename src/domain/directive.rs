use serde::Serialize;

/// Interactive element requested inline by assistant text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Directive {
    Choice { label: String },
    Link { url: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    pub url: String,
    pub label: String,
}

/// Assistant text split into renderable prose and the buttons it asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedReply {
    pub clean_text: String,
    pub choices: Vec<String>,
    pub links: Vec<LinkButton>,
    pub directives: Vec<Directive>,
}

impl ParsedReply {
    pub fn has_buttons(&self) -> bool {
        !self.directives.is_empty()
    }
}
