//! Command and query interface for the rack layout editor.
//!
//! Every editor operation has a serializable command. Commands describe
//! user intent and are:
//! - Serializable (for recording, scripting and end-to-end tests)
//! - Intent-based (a drop at a point, not the resulting parent and slot)
//! - Checked by the canvas (a rejected drop reports why it sprang back)
//!
//! # Example
//! ```ignore
//! use api::{execute_command, Command};
//!
//! let cmd = Command::DragEnd {
//!     id: "d1".into(),
//!     position: Vec2::new(20.0, 1120.0),
//! };
//! let result = execute_command(&mut canvas, cmd);
//! ```

mod command;
mod executor;
mod query;
mod target;

pub use command::*;
pub use executor::{execute_command, execute_query};
pub use query::*;
pub use target::*;
