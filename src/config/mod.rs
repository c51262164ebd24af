pub mod config_base;
pub mod connection;
pub mod settings;

pub use config_base::{parse_field_number, parse_separator, Config, RosterSection};
pub use connection::Connection;
pub use settings::{Mode, Settings};
