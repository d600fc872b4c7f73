//! Business logic behind the HTTP handlers.

pub mod jobs;
pub mod output;
