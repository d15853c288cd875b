mod cli;
mod completer;
mod env;
mod error;
mod log;
mod model;
mod render;
mod ui;

pub use cli::Cli;
pub use env::Environment;
pub use error::{Error, Result};
pub use ui::UI;
