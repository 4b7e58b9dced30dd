pub mod record_ctx;
pub mod screen_flow;

pub use record_ctx::RecordCtx;
pub use screen_flow::{RecordFlow, ScreenFlow};
