pub mod config;
mod link;

pub use config::Config;
pub use link::link;
