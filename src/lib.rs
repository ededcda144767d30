pub mod backend;
pub mod config;
pub mod console;
pub mod filter;
pub mod host;
pub mod job;
pub mod manifest;
pub mod package;
pub mod resolver;
pub mod runtime;
pub mod store;
