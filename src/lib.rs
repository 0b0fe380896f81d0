pub mod cli;
pub mod commands;
pub mod comparator;
pub mod fs_context;
pub mod manifest;
pub mod path;
pub mod runner;
pub mod runtime;
