//! `pandaura-control` - transport-agnostic command surface.
//!
//! Translates external commands (set variable, inject fault, push logic,
//! promote) into core operations on the runtime, vault and deployment
//! engines, and defines the JSON event message model subscribers receive.
//! No transport framing lives here; callers bring their own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Configuration from the environment surface.
pub mod config;
/// Control errors.
pub mod error;
/// JSON event message model.
pub mod events;
/// The sync/command surface over a running engine.
pub mod surface;

pub use config::Settings;
pub use error::ControlError;
pub use events::Event;
pub use surface::SyncSurface;
