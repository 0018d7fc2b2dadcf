mod parser;
mod registry;

pub use parser::{parse_command, StudioCommand};
pub use registry::STUDIO_HELP_COMMANDS;
