mod registry;
mod web_search;

pub use registry::*;
pub use web_search::*;
