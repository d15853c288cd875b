pub mod markdown;
pub mod title;

pub use markdown::MarkdownFormat;
pub use title::{Category, TitleFormat};
