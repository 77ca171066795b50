mod scripted_llm_client;
mod streaming_client;

pub use scripted_llm_client::{SCAFFOLD_REPLY, ScriptedLlmClient};
pub use streaming_client::{ProviderKind, StreamingLlmClient, create_streaming_llm_client};
