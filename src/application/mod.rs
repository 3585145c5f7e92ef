//! Application services: intake, generation pipeline, tracking, quality reports and job
//! orchestration.

pub mod docs;
pub mod error;
pub mod fetch;
pub mod genai;
pub mod jobs;
pub mod quality_report;
pub mod repos;
pub mod retry;
pub mod service;
pub mod spec;
pub mod tracker;
