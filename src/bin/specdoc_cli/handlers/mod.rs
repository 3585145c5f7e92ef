#![deny(clippy::all, clippy::pedantic)]

pub mod jobs;
pub mod reports;
pub mod system;
