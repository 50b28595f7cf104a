//! Domain types and pure logic for Taskdeck.
//!
//! Nothing in this crate touches the database or the network; route handlers
//! fetch rows and hand them to these functions.

#[macro_use]
mod labels;

pub mod attendance;
pub mod bug;
pub mod error;
pub mod import;
pub mod invitation;
pub mod notification;
pub mod report;
pub mod role;
pub mod task;
pub mod time;
pub mod weekly;

pub use error::CoreError;
pub use labels::normalize_label;
