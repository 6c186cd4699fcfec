pub mod config;
pub mod logger;
pub mod sweeper_toml;
pub mod token;

pub use config::*;
pub use logger::setup_logging;
pub use token::get_token;
