mod chat;
mod health;
mod ui_stream;

pub use chat::{ErrorResponse, chat_handler};
pub use health::health_handler;
pub use ui_stream::ui_message_events;
