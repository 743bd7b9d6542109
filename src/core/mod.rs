//! Core scene module
//!
//! Contains the [`Scene`], its configuration, events and on-disk document

mod config;
mod document;
mod events;
mod scene;

pub use config::{DestroyPolicy, SceneConfig};
pub use document::{DocumentError, SceneDocument, SerializedEntity};
pub use events::{EventQueue, SceneEvent};
pub use scene::{DrawItem, Scene, SceneError};
