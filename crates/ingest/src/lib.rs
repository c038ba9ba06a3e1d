pub mod document;
pub mod reader;

pub use document::{Document, ID_KEY, SOURCE_KEY};
pub use reader::{DocumentLoader, LoaderOptions};
