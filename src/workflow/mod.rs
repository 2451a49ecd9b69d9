pub mod chain_flow;
pub mod session_ctx;

pub use chain_flow::{ChainFlow, SENTINEL_ANSWER};
pub use session_ctx::SessionCtx;
