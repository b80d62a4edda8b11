//! Command-line front end: JSON results on stdout, status lines on stderr.

pub mod args;
pub mod handlers;
pub mod output;

pub use args::{Cli, Command, ConfigCommand, WindowArgs};
pub use handlers::run;
