//! CLI command handlers

pub mod commands;

pub use commands::{
    add_procedure, attach, clear, detach, export, import, number, procedures, projects, summary,
};
