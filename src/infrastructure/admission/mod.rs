mod window_guard;

pub use window_guard::{FixedWindowGuard, is_automated_client};
