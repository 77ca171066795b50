pub mod admission;
pub mod llm;
pub mod observability;
pub mod storage;
pub mod streaming;
pub mod transport;
