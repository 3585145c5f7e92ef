//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod fetch;
pub mod genai;
pub mod http;
pub mod memory;
pub mod telemetry;
