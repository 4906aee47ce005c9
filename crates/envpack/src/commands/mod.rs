//! CLI commands

pub mod create;
pub mod list;
pub mod scale;
pub mod serve;
pub mod uninstall;
pub mod upgrade;
