mod sse_decoder;
mod ui_message_chunk;

pub use sse_decoder::SseDecoder;
pub use ui_message_chunk::{
    STREAM_DONE, UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION, UiMessageChunk,
};
