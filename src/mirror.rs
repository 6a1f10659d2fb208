//! Volume mirror - the public access point to the cached audio state
//!
//! [`VolumeMirror`] binds a control surface and a change source, owns the
//! state cache, and runs the relay task that turns change events into
//! cache updates.

mod facade;
mod relay;

pub use facade::VolumeMirror;
