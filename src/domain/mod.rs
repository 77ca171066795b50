mod content_part;
mod conversation_turn;
mod directive;
mod profanity_lexicon;
mod rate_limit;
mod turn_id;
mod turn_role;

pub use content_part::ContentPart;
pub use conversation_turn::ConversationTurn;
pub use directive::{Directive, LinkButton, ParsedReply};
pub use profanity_lexicon::{DEFAULT_EXTRA_WORDS, DEFAULT_PROFANE_WORDS, ProfanityLexicon};
pub use rate_limit::{RateLimitInfo, RateLimitState};
pub use turn_id::TurnId;
pub use turn_role::TurnRole;
