//! # Persistence
//!
//! Project files are JSON, with layer pixels embedded as base64 RGBA8. See [`project`].

pub mod project;

pub use project::{load, load_path, save, save_path, ProjectError, PROJECT_VERSION};
