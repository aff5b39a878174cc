//! # Moodlens Common Library
//!
//! Shared code for the moodlens services:
//! - Error types
//! - Event types (AnalysisEvent enum) and EventBus
//! - Configuration loading and root folder resolution
//! - Database bootstrap
//! - The 6-axis emotion profile type

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod platform;
pub mod profile;

pub use error::{Error, Result};
pub use platform::Platform;
pub use profile::AxisProfile;
