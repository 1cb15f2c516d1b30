// Core module - Protocol and relay logic
pub mod communication;
pub mod relay;
