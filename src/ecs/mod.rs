//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod cached;
mod components;
pub mod hierarchy;
mod world;

pub use cached::ChangeTracker;
pub use components::{
    ComponentData, ComponentKind, Light, LightKind, MeshInstance, Tag, Transform, TransformMut,
    euler_degrees, quat_from_euler_degrees,
};
pub use hierarchy::{Children, GlobalTransform, HierarchyError};
pub use world::World;
