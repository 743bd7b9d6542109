//! A hierarchical 3D scene model built in Rust
//!
//! This crate provides:
//! - Entity storage with generational handles via hecs
//! - Parent/child transform hierarchy with world-pose preserving re-parenting
//! - Scene documents saved as RON or JSON
//! - A headless scene hierarchy and inspector panel for editors

pub mod core;
pub mod ecs;
pub mod editor;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{
        DestroyPolicy, DrawItem, Scene, SceneConfig, SceneDocument, SceneError, SceneEvent,
    };
    pub use crate::ecs::{
        ComponentData, ComponentKind, GlobalTransform, HierarchyError, Light, LightKind,
        MeshInstance, Tag, Transform, TransformMut,
    };
    pub use crate::editor::{InspectorEdit, PanelAction, SceneHierarchyPanel};
    pub use glam::{Mat4, Quat, Vec3, Vec4};
    pub use hecs::Entity;
}
