// Infrastructure module - External dependencies and adapters
pub mod channel;
pub mod config;
pub mod logging;
pub mod memory;
pub mod serial;
pub mod tcp;
