//! Workflow orchestration: the one owner of the node list, selection, stitch
//! tracks and agent context, with every async action the front end runs
//! against the backend.
//!
//! Actions catch their own failures: the status line and an alert report
//! them, the error is returned, and state is left as it was.
mod agent;
mod dispatch;
mod error;
pub use error::*;
mod notify;
pub use notify::*;
mod state;
pub use state::*;
mod stitch;
mod studio;
pub use studio::*;
