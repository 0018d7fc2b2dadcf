mod catalog;
mod selection;

pub use catalog::{ImageStyle, StyleCatalog, DEFAULT_STYLE_ID};
pub use selection::StyleSelection;
