//! Operator console: commands, application state and output

mod command;
mod output;
mod state;

pub use command::Command;
pub use state::{App, Flow};
