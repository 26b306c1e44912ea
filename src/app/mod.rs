pub mod session_service;
pub mod sweeper;

pub use session_service::{Authenticated, SessionPolicy, SessionService};
pub use sweeper::SessionSweeper;
