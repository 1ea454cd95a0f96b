use std::time::Duration;

/// Default per-operation deadline, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Shared knobs for channels and server sessions.
#[derive(Clone)]
pub struct RpcConfig {
    /// Deadline applied to every network operation except the server's
    /// idle wait for the next call. `Duration::ZERO` disables deadlines.
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS) }
    }
}
