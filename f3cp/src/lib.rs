pub mod cli;
pub mod commands;
pub mod fedora;
pub mod load_config;

pub use cli::{run, Cli, Commands};
