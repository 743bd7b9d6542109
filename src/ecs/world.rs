//! World wrapper around hecs
//!
//! hecs entities are generational: a handle to a despawned entity never
//! resolves to whatever later reuses its slot.

use hecs::Entity;

use super::components::Transform;
use super::hierarchy::HierarchyError;

/// Entity store holding every component of a scene
pub struct World {
    /// The underlying hecs world
    inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Reserve a handle to spawn with components that need to know it
    pub fn reserve_entity(&self) -> Entity {
        self.inner.reserve_entity()
    }

    /// Spawn components at a previously reserved handle
    pub fn spawn_at(&mut self, handle: Entity, components: impl hecs::DynamicBundle) {
        self.inner.spawn_at(handle, components);
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Add or replace a single component
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Remove a single component, returning it
    pub fn remove_one<T: hecs::Component>(&mut self, entity: Entity) -> Result<T, hecs::ComponentError> {
        self.inner.remove_one::<T>(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Check whether a live entity carries a component of type `T`
    pub fn has<T: hecs::Component>(&self, entity: Entity) -> Result<bool, hecs::NoSuchEntity> {
        Ok(self.inner.entity(entity)?.has::<T>())
    }

    /// Get the transform of an entity
    pub fn transform(&self, entity: Entity) -> Result<hecs::Ref<'_, Transform>, HierarchyError> {
        self.get::<Transform>(entity)
            .map_err(|e| HierarchyError::lookup(entity, e))
    }

    /// Get the transform of an entity mutably
    pub fn transform_mut(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, Transform>, HierarchyError> {
        self.get_mut::<Transform>(entity)
            .map_err(|e| HierarchyError::lookup(entity, e))
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Tag;

    #[test]
    fn test_transform_lookup_errors() {
        let mut world = World::new();
        let bare = world.spawn((Tag::new("bare"),));
        assert!(matches!(
            world.transform(bare),
            Err(HierarchyError::MissingTransform(e)) if e == bare
        ));

        world.despawn(bare).unwrap();
        assert!(matches!(
            world.transform(bare),
            Err(HierarchyError::StaleEntity(e)) if e == bare
        ));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut world = World::new();
        let old = world.spawn((Tag::new("old"),));
        world.despawn(old).unwrap();
        let new = world.spawn((Tag::new("new"),));

        assert_ne!(old, new);
        assert!(!world.contains(old));
        assert!(world.get::<Tag>(old).is_err());
        assert_eq!(world.get::<Tag>(new).unwrap().as_str(), "new");
    }

    #[test]
    fn test_has_component() {
        let mut world = World::new();
        let entity = world.spawn((Tag::new("e"),));
        assert!(world.has::<Tag>(entity).unwrap());
        assert!(!world.has::<Transform>(entity).unwrap());
        assert_eq!(world.len(), 1);
    }
}
