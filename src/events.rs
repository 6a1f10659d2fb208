//! Change notifications - the asynchronous feed that keeps the cache fresh
//!
//! A [`ChangeSource`] pushes [`ChangeEvent`]s into an unbounded channel owned
//! by the facade's relay task. [`LocalChangeSource`] is the in-process
//! implementation; [`broadcast`] decodes platform-style broadcasts.

pub mod broadcast;
mod source;
mod types;

pub use source::{ChangeSource, EventSender, LocalChangeSource};
pub use types::ChangeEvent;
