pub mod action;
pub mod config;
pub mod interactive;
pub mod serdable;
pub mod str_interp;
pub mod style;
pub mod testing;
pub mod workspace;

pub use crate::config::Config;
