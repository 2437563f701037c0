//! Core data models for the video upload service.
//!
//! `VideoRecord` maps to the `videos` table via `sqlx::FromRow` and serializes
//! as the JSON returned by the API. The remaining types are transient values
//! that only live for the duration of one request.

pub mod aspect;
pub mod location;
pub mod upload;
pub mod video;
