//! Python binding for the web-delivery harness
//!
//! - **session**: the `Session` class wrapping one participant's sequencer
//! - **types**: dict extraction and error conversion at the boundary

pub mod session;
pub mod types;
