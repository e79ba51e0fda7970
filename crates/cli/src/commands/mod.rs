pub mod broadcaster;
pub mod config;
pub mod probe;
pub mod utils;

pub use broadcaster::find_broadcaster;
pub use config::{handle_config_command, ConfigCommands};
pub use probe::probe_chain;
