// Shared infrastructure for the template service: configuration, resources, telemetry

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod errors;
pub mod telemetry;

/// Identifier reported by the health endpoint and attached to exported traces
pub const SERVICE_NAME: &str = "template-service";
