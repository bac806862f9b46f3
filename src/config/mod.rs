//! Configuration module for live-vision-chat.
//!
//! - `config_struct`: Config struct definition
//! - `defaults`: Config Default implementation and per-field defaults
//! - `io`: Config loading and saving

mod config_struct;
mod defaults;
mod io;

pub use config_struct::Config;
pub use io::{get_config_path, load_config, save_config};
