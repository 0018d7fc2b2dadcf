pub mod collection;
pub mod commands;
pub mod events;
pub mod images;
pub mod styles;
