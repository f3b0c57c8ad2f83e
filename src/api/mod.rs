pub mod handlers;
pub mod server;

pub use handlers::{ApiError, AppState};
pub use server::{build_channel, build_control_plane, build_router, build_state, run_server};
