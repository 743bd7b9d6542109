//! Scene container
//!
//! A [`Scene`] owns the entity store, a root entity that every other entity
//! descends from, the editor selection and a frame counter. It is the only
//! place entities are created, re-parented and destroyed.

use std::any::TypeId;

use glam::{Mat4, Vec3, Vec4};
use hecs::Entity;

use super::config::{DestroyPolicy, SceneConfig};
use super::events::{EventQueue, SceneEvent};
use crate::ecs::hierarchy::{self, GlobalTransform, HierarchyError};
use crate::ecs::{
    ComponentData, ComponentKind, Light, MeshInstance, Tag, Transform, TransformMut, World,
};

/// One mesh to draw, in traversal order
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub entity: Entity,
    /// World matrix
    pub matrix: Mat4,
    pub mesh: String,
    pub has_textures: bool,
    pub color: Vec4,
}

/// Errors that can occur during scene operations
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Hierarchy query or mutation failed
    Hierarchy(HierarchyError),
    /// Tag and Transform cannot be added or removed
    ComponentLocked(ComponentKind),
    /// The entity already has a component of this kind
    ComponentExists {
        entity: Entity,
        kind: ComponentKind,
    },
    /// The entity has no such component
    ComponentMissing {
        entity: Entity,
        component: &'static str,
    },
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hierarchy(e) => write!(f, "Hierarchy error: {e}"),
            Self::ComponentLocked(kind) => write!(f, "{kind} cannot be added or removed"),
            Self::ComponentExists { entity, kind } => {
                write!(f, "{entity:?} already has a {kind} component")
            }
            Self::ComponentMissing { entity, component } => {
                write!(f, "{entity:?} has no {component} component")
            }
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Hierarchy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HierarchyError> for SceneError {
    fn from(error: HierarchyError) -> Self {
        Self::Hierarchy(error)
    }
}

/// Hierarchical scene of entities
pub struct Scene {
    world: World,
    root: Entity,
    selected: Option<Entity>,
    frame: u64,
    config: SceneConfig,
    events: EventQueue,
}

impl Scene {
    /// Create a scene holding only the root entity
    pub fn new(config: SceneConfig) -> Self {
        let mut world = World::new();
        let root = world.reserve_entity();
        world.spawn_at(
            root,
            (Tag::new(config.root_name.clone()), Transform::new(root, None)),
        );
        log::debug!("created scene root {root:?}");

        Self {
            world,
            root,
            selected: None,
            frame: 0,
            config,
            events: EventQueue::new(),
        }
    }

    /// Root entity; its children are the top level of the hierarchy
    #[must_use]
    pub fn root(&self) -> Entity {
        self.root
    }

    /// Whether `entity` is still alive in this scene
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Number of entities, not counting the root
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.world.len().saturating_sub(1) as usize
    }

    /// Create an entity directly under the root.
    ///
    /// An empty `name` falls back to the configured default.
    pub fn create_entity(&mut self, name: &str) -> Entity {
        let root = self.root;
        self.spawn_under(name, root)
            .expect("scene root always has a transform")
    }

    /// Create an entity under `parent`.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is stale or has no transform.
    pub fn create_child(&mut self, name: &str, parent: Entity) -> Result<Entity, SceneError> {
        self.spawn_under(name, parent)
    }

    fn spawn_under(&mut self, name: &str, parent: Entity) -> Result<Entity, SceneError> {
        self.world.transform(parent)?;

        let name = if name.is_empty() {
            self.config.default_entity_name.as_str()
        } else {
            name
        };
        let entity = self.world.reserve_entity();
        self.world.spawn_at(
            entity,
            (Tag::new(name), Transform::new(entity, Some(parent))),
        );
        self.world.transform_mut(parent)?.children.add(entity);

        log::trace!("created {entity:?} '{name}' under {parent:?}");
        self.events
            .push(SceneEvent::EntityCreated { entity, parent });
        Ok(entity)
    }

    /// Destroy `entity` according to the configured [`DestroyPolicy`].
    ///
    /// Selection pointing at a destroyed entity is cleared.
    ///
    /// # Errors
    ///
    /// The root cannot be destroyed. Under `ReparentToParent`, a child whose
    /// pose cannot be carried over (degenerate matrices) aborts the whole
    /// operation before anything changes.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), SceneError> {
        let parent = self
            .world
            .transform(entity)?
            .parent()
            .ok_or(HierarchyError::RootImmutable(entity))?;
        if !self.world.transform(parent)?.children().contains(entity) {
            log::error!("{entity:?} missing from the children of its parent {parent:?}");
            return Err(HierarchyError::Corrupted {
                parent,
                child: entity,
            }
            .into());
        }

        let doomed = match self.config.destroy_policy {
            DestroyPolicy::Cascade => {
                let mut doomed = vec![entity];
                doomed.extend(
                    hierarchy::descendants(&self.world, entity)?
                        .into_iter()
                        .map(|(e, _)| e),
                );
                doomed
            }
            DestroyPolicy::ReparentToParent => {
                let children = self.world.transform(entity)?.children().as_slice().to_vec();
                let plans = children
                    .iter()
                    .map(|&child| hierarchy::plan_reparent(&self.world, child, parent))
                    .collect::<Result<Vec<_>, _>>()?;
                for plan in &plans {
                    hierarchy::apply_reparent(&mut self.world, plan)?;
                    self.events.push(SceneEvent::Reparented {
                        entity: plan.dragged,
                        old_parent: entity,
                        new_parent: parent,
                    });
                }
                vec![entity]
            }
        };

        hierarchy::detach(&mut self.world, entity)?;
        // deepest first
        for &doomed_entity in doomed.iter().rev() {
            self.world
                .despawn(doomed_entity)
                .map_err(|_| HierarchyError::StaleEntity(doomed_entity))?;
            self.events.push(SceneEvent::EntityDestroyed {
                entity: doomed_entity,
            });
        }
        log::debug!(
            "destroyed {entity:?} ({} entities, {:?})",
            doomed.len(),
            self.config.destroy_policy
        );

        if self.selected.is_some_and(|s| !self.world.contains(s)) {
            self.clear_selection();
        }
        Ok(())
    }

    /// Move `dragged` under `new_parent`, preserving its world pose.
    ///
    /// # Errors
    ///
    /// See [`hierarchy::plan_reparent`]; nothing changes on error.
    pub fn reparent(&mut self, dragged: Entity, new_parent: Entity) -> Result<(), SceneError> {
        let plan = hierarchy::plan_reparent(&self.world, dragged, new_parent).inspect_err(|e| {
            log::warn!("rejected reparent of {dragged:?} to {new_parent:?}: {e}");
        })?;
        hierarchy::apply_reparent(&mut self.world, &plan)?;
        self.events.push(SceneEvent::Reparented {
            entity: dragged,
            old_parent: plan.old_parent,
            new_parent,
        });
        Ok(())
    }

    /// Parent of `entity`, `None` for the root
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>, SceneError> {
        Ok(self.world.transform(entity)?.parent())
    }

    /// Children of `entity` in display order
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn children(&self, entity: Entity) -> Result<Vec<Entity>, SceneError> {
        Ok(self.world.transform(entity)?.children().as_slice().to_vec())
    }

    /// Transform of `entity`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn transform(&self, entity: Entity) -> Result<hecs::Ref<'_, Transform>, SceneError> {
        Ok(self.world.transform(entity)?)
    }

    /// Transform of `entity` for pose edits.
    ///
    /// Parent and children are not writable through the returned guard.
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn transform_mut(&mut self, entity: Entity) -> Result<TransformMut<'_>, SceneError> {
        Ok(TransformMut::new(self.world.transform_mut(entity)?))
    }

    /// Any component of `entity`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle or a missing component.
    pub fn component<T: hecs::Component>(&self, entity: Entity) -> Result<hecs::Ref<'_, T>, SceneError> {
        self.world
            .get::<T>(entity)
            .map_err(|e| Self::component_error::<T>(entity, e))
    }

    /// Any component of `entity` except [`Transform`], mutably
    ///
    /// # Errors
    ///
    /// Fails on a stale handle or a missing component. `Transform` is locked;
    /// use [`Scene::transform_mut`] for pose edits.
    pub fn component_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, SceneError> {
        if TypeId::of::<T>() == TypeId::of::<Transform>() {
            return Err(SceneError::ComponentLocked(ComponentKind::Transform));
        }
        self.world
            .get_mut::<T>(entity)
            .map_err(|e| Self::component_error::<T>(entity, e))
    }

    fn component_error<T>(entity: Entity, error: hecs::ComponentError) -> SceneError {
        match error {
            hecs::ComponentError::NoSuchEntity => {
                SceneError::Hierarchy(HierarchyError::StaleEntity(entity))
            }
            hecs::ComponentError::MissingComponent(_) => SceneError::ComponentMissing {
                entity,
                component: std::any::type_name::<T>(),
            },
        }
    }

    /// Display name of `entity`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn tag(&self, entity: Entity) -> Result<String, SceneError> {
        Ok(self.component::<Tag>(entity)?.0.clone())
    }

    /// Rename `entity`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn set_tag(&mut self, entity: Entity, name: impl Into<String>) -> Result<(), SceneError> {
        self.component_mut::<Tag>(entity)?.0 = name.into();
        Ok(())
    }

    /// World matrix of `entity`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle or a broken parent chain.
    pub fn world_transform(&self, entity: Entity) -> Result<Mat4, SceneError> {
        Ok(hierarchy::world_matrix(&self.world, entity)?)
    }

    /// Local matrix of `entity`, ignoring ancestry
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn local_transform(&self, entity: Entity) -> Result<Mat4, SceneError> {
        Ok(self.world.transform(entity)?.local_matrix())
    }

    /// World matrix of the parent of `entity`, identity for the root
    ///
    /// # Errors
    ///
    /// Fails on a stale handle or a broken parent chain.
    pub fn parent_transform(&self, entity: Entity) -> Result<Mat4, SceneError> {
        Ok(hierarchy::parent_matrix(&self.world, entity)?)
    }

    /// Rotate `entity` by `angle` degrees around `axis` through a world-space `point`
    ///
    /// # Errors
    ///
    /// Fails for a zero axis or a singular parent matrix.
    pub fn rotate_around_point(
        &mut self,
        entity: Entity,
        point: Vec3,
        angle: f32,
        axis: Vec3,
    ) -> Result<(), SceneError> {
        Ok(hierarchy::rotate_around_world_point(
            &mut self.world,
            entity,
            point,
            angle,
            axis,
        )?)
    }

    /// Currently selected entity
    #[must_use]
    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    /// Select `entity`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn select(&mut self, entity: Entity) -> Result<(), SceneError> {
        self.world.transform(entity)?;
        if self.selected != Some(entity) {
            self.selected = Some(entity);
            self.events.push(SceneEvent::SelectionChanged {
                selected: self.selected,
            });
        }
        Ok(())
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.events
                .push(SceneEvent::SelectionChanged { selected: None });
        }
    }

    /// Current frame number
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Start a new frame: advance the frame counter and publish last frame's events
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.events.swap();
        self.frame
    }

    /// Events published by the previous frame
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Events published by the previous frame, for draining
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Whether the world matrix of `entity` changed since the last frame it was checked.
    ///
    /// The answer is fixed by the first call in each frame.
    ///
    /// # Errors
    ///
    /// Fails on a stale handle or a broken parent chain.
    pub fn updated_last_frame(&mut self, entity: Entity) -> Result<bool, SceneError> {
        let matrix = hierarchy::world_matrix(&self.world, entity)?;
        let frame = self.frame;
        Ok(self.world.transform_mut(entity)?.tracker.updated(frame, matrix))
    }

    /// Every entity below the root in pre-order, with depth (top level is 0).
    ///
    /// This is the order used for drawing and for the editor tree.
    ///
    /// # Errors
    ///
    /// Fails if the tree is corrupted.
    pub fn traverse(&self) -> Result<Vec<(Entity, usize)>, SceneError> {
        Ok(hierarchy::descendants(&self.world, self.root)?)
    }

    /// Visit every entity below the root in pre-order with its world matrix.
    fn walk(&self, mut visit: impl FnMut(Entity, usize, Mat4)) -> Result<(), SceneError> {
        let limit = self.world.len() as usize;
        let root = self.world.transform(self.root)?;
        let root_matrix = root.local_matrix();
        let mut stack: Vec<(Entity, Entity, usize, Mat4)> = root
            .children()
            .iter()
            .rev()
            .map(|&child| (self.root, child, 0, root_matrix))
            .collect();
        drop(root);

        let mut visited = 0;
        while let Some((parent, entity, depth, parent_matrix)) = stack.pop() {
            visited += 1;
            if visited > limit {
                return Err(HierarchyError::Corrupted {
                    parent,
                    child: entity,
                }
                .into());
            }

            let transform = self.world.transform(entity)?;
            let matrix = parent_matrix * transform.local_matrix();
            visit(entity, depth, matrix);
            stack.extend(
                transform
                    .children()
                    .iter()
                    .rev()
                    .map(|&child| (entity, child, depth + 1, matrix)),
            );
        }
        Ok(())
    }

    /// Write a [`GlobalTransform`] for every entity, root included.
    ///
    /// Returns the number of entities updated.
    ///
    /// # Errors
    ///
    /// Fails if the tree is corrupted.
    pub fn propagate_transforms(&mut self) -> Result<usize, SceneError> {
        let mut updates = vec![(self.root, self.world.transform(self.root)?.local_matrix())];
        self.walk(|entity, _, matrix| updates.push((entity, matrix)))?;

        for &(entity, matrix) in &updates {
            self.world
                .insert_one(entity, GlobalTransform::new(matrix))
                .map_err(|_| HierarchyError::StaleEntity(entity))?;
        }
        log::trace!("propagated {} transforms", updates.len());
        Ok(updates.len())
    }

    /// Meshes to draw this frame, in traversal order.
    ///
    /// # Errors
    ///
    /// Fails if the tree is corrupted.
    pub fn draw_list(&self) -> Result<Vec<DrawItem>, SceneError> {
        let mut items = Vec::new();
        self.walk(|entity, _, matrix| {
            if let Ok(mesh) = self.world.get::<MeshInstance>(entity) {
                items.push(DrawItem {
                    entity,
                    matrix,
                    mesh: mesh.mesh.clone(),
                    has_textures: mesh.has_textures,
                    color: mesh.color,
                });
            }
        })?;
        Ok(items)
    }

    /// Whether `entity` carries a component of `kind`
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn has_component(&self, entity: Entity, kind: ComponentKind) -> Result<bool, SceneError> {
        let has = match kind {
            ComponentKind::Tag => self.world.has::<Tag>(entity),
            ComponentKind::Transform => self.world.has::<Transform>(entity),
            ComponentKind::MeshInstance => self.world.has::<MeshInstance>(entity),
            ComponentKind::Light => self.world.has::<Light>(entity),
        };
        has.map_err(|_| SceneError::Hierarchy(HierarchyError::StaleEntity(entity)))
    }

    /// Attach a default component of `kind`
    ///
    /// # Errors
    ///
    /// Structural kinds are locked, and a component already present is not replaced.
    pub fn add_component(&mut self, entity: Entity, kind: ComponentKind) -> Result<(), SceneError> {
        let data = ComponentData::default_for(kind).ok_or(SceneError::ComponentLocked(kind))?;
        if self.has_component(entity, kind)? {
            return Err(SceneError::ComponentExists { entity, kind });
        }
        self.insert_component(entity, data)
    }

    /// Attach or replace a component
    ///
    /// # Errors
    ///
    /// Fails on a stale handle.
    pub fn insert_component(&mut self, entity: Entity, data: ComponentData) -> Result<(), SceneError> {
        let kind = data.kind();
        let inserted = match data {
            ComponentData::MeshInstance(mesh) => self.world.insert_one(entity, mesh),
            ComponentData::Light(light) => self.world.insert_one(entity, light),
        };
        inserted.map_err(|_| HierarchyError::StaleEntity(entity))?;
        self.events
            .push(SceneEvent::ComponentAdded { entity, kind });
        Ok(())
    }

    /// Detach the component of `kind`, returning its data
    ///
    /// # Errors
    ///
    /// Structural kinds are locked; fails if the component is absent.
    pub fn remove_component(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
    ) -> Result<ComponentData, SceneError> {
        let removed = match kind {
            ComponentKind::Tag | ComponentKind::Transform => {
                return Err(SceneError::ComponentLocked(kind));
            }
            ComponentKind::MeshInstance => self
                .world
                .remove_one::<MeshInstance>(entity)
                .map(ComponentData::MeshInstance),
            ComponentKind::Light => self
                .world
                .remove_one::<Light>(entity)
                .map(ComponentData::Light),
        };
        let data = removed.map_err(|e| match e {
            hecs::ComponentError::NoSuchEntity => {
                SceneError::Hierarchy(HierarchyError::StaleEntity(entity))
            }
            hecs::ComponentError::MissingComponent(_) => SceneError::ComponentMissing {
                entity,
                component: kind.name(),
            },
        })?;
        self.events
            .push(SceneEvent::ComponentRemoved { entity, kind });
        Ok(data)
    }

    /// Check the tree invariant over the whole scene
    ///
    /// # Errors
    ///
    /// The first violation found.
    pub fn validate(&self) -> Result<(), SceneError> {
        Ok(hierarchy::validate(&self.world, self.root)?)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn assert_mat_eq(a: Mat4, b: Mat4) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < EPS, "{a:?} != {b:?}");
        }
    }

    fn world_position(scene: &Scene, entity: Entity) -> Vec3 {
        scene.world_transform(entity).unwrap().col(3).truncate()
    }

    #[test]
    fn test_create_entity_under_root() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let unnamed = scene.create_entity("");

        assert_eq!(scene.children(scene.root()).unwrap(), vec![a, unnamed]);
        assert_eq!(scene.parent(a).unwrap(), Some(scene.root()));
        assert_eq!(scene.tag(a).unwrap(), "A");
        assert_eq!(scene.tag(unnamed).unwrap(), "Entity");
        assert_eq!(scene.tag(scene.root()).unwrap(), "Root");
        assert_eq!(scene.entity_count(), 2);
        scene.validate().unwrap();
    }

    #[test]
    fn test_reparent_scenario_keeps_world_position() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");
        scene.transform_mut(b).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));

        scene.reparent(a, b).unwrap();

        assert_eq!(scene.parent(a).unwrap(), Some(b));
        assert!(world_position(&scene, a).length() < EPS);
        assert!((scene.transform(a).unwrap().position - Vec3::new(-10.0, 0.0, 0.0)).length() < EPS);
        scene.validate().unwrap();
    }

    #[test]
    fn test_scaled_chain_and_cycle_rejection() {
        let mut scene = Scene::default();
        let p = scene.create_entity("P");
        let c = scene.create_child("C", p).unwrap();
        scene.transform_mut(p).unwrap().scale_uniform(2.0);
        scene.transform_mut(c).unwrap().set_position(Vec3::X);

        assert!((world_position(&scene, c) - Vec3::new(2.0, 0.0, 0.0)).length() < EPS);

        let err = scene.reparent(p, c).unwrap_err();
        assert!(matches!(
            err,
            SceneError::Hierarchy(HierarchyError::CycleDetected { .. })
        ));
        assert_eq!(scene.parent(p).unwrap(), Some(scene.root()));
        assert_eq!(scene.parent(c).unwrap(), Some(p));
        scene.validate().unwrap();
    }

    #[test]
    fn test_reparent_world_pose_randomized() {
        // deterministic pseudo-random poses
        let mut seed = 0x2545_f491_u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % 2000) as f32 / 100.0 - 10.0
        };

        let mut scene = Scene::default();
        let mut entities = Vec::new();
        for i in 0..8 {
            let parent = if i < 2 { scene.root() } else { entities[i / 2] };
            let e = scene.create_child(&format!("E{i}"), parent).unwrap();
            let mut tr = scene.transform_mut(e).unwrap();
            tr.set_position(Vec3::new(next(), next(), next()) * 0.5);
            tr.rotate_to_euler(Vec3::new(next() * 9.0, next() * 4.0, next() * 9.0));
            tr.scale_uniform(1.0 + next().abs() / 40.0);
            drop(tr);
            entities.push(e);
        }

        for (dragged, target) in [(7, 1), (4, 5), (2, 0), (6, 3)] {
            let (dragged, target) = (entities[dragged], entities[target]);
            let before = scene.world_transform(dragged).unwrap();
            match scene.reparent(dragged, target) {
                Ok(()) => assert_mat_eq(scene.world_transform(dragged).unwrap(), before),
                Err(SceneError::Hierarchy(HierarchyError::CycleDetected { .. })) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
            scene.validate().unwrap();
        }
    }

    #[test]
    fn test_reparent_needing_shear_rejected() {
        let mut scene = Scene::default();
        let floor = scene.create_entity("Floor");
        let a = scene.create_entity("A");
        scene
            .transform_mut(floor)
            .unwrap()
            .set_scale(Vec3::new(10.0, 0.1, 10.0));
        scene
            .transform_mut(a)
            .unwrap()
            .rotate_to_axis_angle(45.0, Vec3::Z)
            .unwrap();
        let before = scene.world_transform(a).unwrap();

        assert_eq!(
            scene.reparent(a, floor),
            Err(SceneError::Hierarchy(HierarchyError::ShearRequired(a)))
        );
        assert_eq!(scene.parent(a).unwrap(), Some(scene.root()));
        assert_eq!(scene.world_transform(a).unwrap(), before);
        scene.validate().unwrap();
    }

    #[test]
    fn test_transform_links_not_writable() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");

        assert!(matches!(
            scene.component_mut::<Transform>(a),
            Err(SceneError::ComponentLocked(ComponentKind::Transform))
        ));
        scene.component_mut::<Tag>(a).unwrap().0 = "renamed".into();
        assert_eq!(scene.tag(a).unwrap(), "renamed");

        let root = scene.root();
        {
            let mut pose = scene.transform_mut(a).unwrap();
            pose.set_position(Vec3::X);
            pose.set_scale(Vec3::splat(3.0));
            assert_eq!(pose.parent(), Some(root));
            assert_eq!(pose.position, Vec3::X);
        }
        assert_eq!(scene.parent(a).unwrap(), Some(root));
        assert_eq!(scene.children(scene.root()).unwrap(), vec![a, b]);
        scene.validate().unwrap();
    }

    #[test]
    fn test_destroy_cascade_removes_subtree() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let child = scene.create_child("child", a).unwrap();
        let grandchild = scene.create_child("grandchild", child).unwrap();
        let b = scene.create_entity("B");
        scene.select(grandchild).unwrap();

        scene.destroy_entity(a).unwrap();

        assert_eq!(scene.children(scene.root()).unwrap(), vec![b]);
        for gone in [a, child, grandchild] {
            assert!(!scene.contains(gone));
            assert!(matches!(
                scene.transform(gone),
                Err(SceneError::Hierarchy(HierarchyError::StaleEntity(_)))
            ));
        }
        assert_eq!(scene.selected(), None);
        assert_eq!(scene.entity_count(), 1);
        scene.validate().unwrap();
    }

    #[test]
    fn test_destroy_reparent_policy_keeps_children_pose() {
        let config = SceneConfig::default().with_destroy_policy(DestroyPolicy::ReparentToParent);
        let mut scene = Scene::new(config);
        let holder = scene.create_entity("holder");
        let a = scene.create_child("A", holder).unwrap();
        let c1 = scene.create_child("c1", a).unwrap();
        let c2 = scene.create_child("c2", a).unwrap();
        {
            let mut tr = scene.transform_mut(a).unwrap();
            tr.set_position(Vec3::new(1.0, 2.0, 3.0));
            tr.rotate_to_axis_angle(30.0, Vec3::Z).unwrap();
            tr.scale_uniform(2.0);
        }
        scene.transform_mut(c1).unwrap().set_position(Vec3::X);
        scene.transform_mut(c2).unwrap().set_position(Vec3::Y);
        let before = [
            scene.world_transform(c1).unwrap(),
            scene.world_transform(c2).unwrap(),
        ];

        scene.destroy_entity(a).unwrap();

        assert!(!scene.contains(a));
        assert_eq!(scene.children(holder).unwrap(), vec![c1, c2]);
        assert_mat_eq(scene.world_transform(c1).unwrap(), before[0]);
        assert_mat_eq(scene.world_transform(c2).unwrap(), before[1]);
        scene.validate().unwrap();
    }

    #[test]
    fn test_destroy_reparent_policy_degenerate_aborts() {
        let config = SceneConfig::default().with_destroy_policy(DestroyPolicy::ReparentToParent);
        let mut scene = Scene::new(config);
        let a = scene.create_entity("A");
        let child = scene.create_child("child", a).unwrap();
        scene.transform_mut(a).unwrap().scale_uniform(0.0);

        assert!(matches!(
            scene.destroy_entity(a),
            Err(SceneError::Hierarchy(HierarchyError::DegenerateTransform(e))) if e == child
        ));
        assert!(scene.contains(a));
        assert_eq!(scene.children(a).unwrap(), vec![child]);
    }

    #[test]
    fn test_destroy_root_rejected() {
        let mut scene = Scene::default();
        let root = scene.root();
        assert_eq!(
            scene.destroy_entity(root),
            Err(SceneError::Hierarchy(HierarchyError::RootImmutable(root)))
        );
    }

    #[test]
    fn test_selection() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");

        scene.select(a).unwrap();
        assert_eq!(scene.selected(), Some(a));

        // destroying something else keeps the selection
        scene.destroy_entity(b).unwrap();
        assert_eq!(scene.selected(), Some(a));

        scene.clear_selection();
        assert_eq!(scene.selected(), None);

        scene.destroy_entity(a).unwrap();
        assert!(scene.select(a).is_err());
    }

    #[test]
    fn test_updated_last_frame_is_stable_within_frame() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");

        scene.begin_frame();
        assert!(scene.updated_last_frame(a).unwrap());
        assert!(scene.updated_last_frame(a).unwrap());

        scene.begin_frame();
        assert!(!scene.updated_last_frame(a).unwrap());

        // moving an ancestor changes the child's world matrix
        let b = scene.create_entity("B");
        scene.reparent(a, b).unwrap();
        scene.transform_mut(b).unwrap().set_position(Vec3::Z);
        scene.begin_frame();
        assert!(scene.updated_last_frame(a).unwrap());
        assert!(scene.updated_last_frame(a).unwrap());

        scene.begin_frame();
        assert!(!scene.updated_last_frame(a).unwrap());
    }

    #[test]
    fn test_rotate_around_point_world_space() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        scene.transform_mut(a).unwrap().set_position(Vec3::new(2.0, 0.0, 0.0));

        scene
            .rotate_around_point(a, Vec3::ZERO, 90.0, Vec3::Y)
            .unwrap();

        assert!((world_position(&scene, a) - Vec3::new(0.0, 0.0, -2.0)).length() < EPS);
        let facing = scene.transform(a).unwrap().rotation() * Vec3::X;
        assert!((facing - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn test_matrix_accessors() {
        let mut scene = Scene::default();
        let p = scene.create_entity("P");
        let c = scene.create_child("C", p).unwrap();
        scene.transform_mut(p).unwrap().set_position(Vec3::Y);
        scene.transform_mut(c).unwrap().set_position(Vec3::X);

        assert_mat_eq(
            scene.local_transform(c).unwrap(),
            Mat4::from_translation(Vec3::X),
        );
        assert_mat_eq(
            scene.parent_transform(c).unwrap(),
            Mat4::from_translation(Vec3::Y),
        );
        assert_mat_eq(
            scene.world_transform(c).unwrap(),
            Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0)),
        );
    }

    #[test]
    fn test_traverse_and_draw_list_order() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let a1 = scene.create_child("A1", a).unwrap();
        let b = scene.create_entity("B");
        scene.transform_mut(a).unwrap().set_position(Vec3::X);
        scene.transform_mut(a1).unwrap().set_position(Vec3::X);
        scene
            .insert_component(a1, ComponentData::MeshInstance(MeshInstance::new("cube")))
            .unwrap();
        scene.add_component(b, ComponentKind::MeshInstance).unwrap();

        assert_eq!(scene.traverse().unwrap(), vec![(a, 0), (a1, 1), (b, 0)]);

        let draws = scene.draw_list().unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].entity, a1);
        assert_eq!(draws[0].mesh, "cube");
        assert!((draws[0].matrix.col(3).truncate() - Vec3::new(2.0, 0.0, 0.0)).length() < EPS);
        assert_eq!(draws[1].entity, b);
    }

    #[test]
    fn test_propagate_transforms() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let a1 = scene.create_child("A1", a).unwrap();
        scene.transform_mut(a).unwrap().set_position(Vec3::new(0.0, 3.0, 0.0));

        assert_eq!(scene.propagate_transforms().unwrap(), 3);
        let global = *scene.component::<GlobalTransform>(a1).unwrap();
        assert!((global.position() - Vec3::new(0.0, 3.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_component_dispatch() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");

        assert!(scene.has_component(a, ComponentKind::Tag).unwrap());
        assert!(scene.has_component(a, ComponentKind::Transform).unwrap());
        assert!(!scene.has_component(a, ComponentKind::Light).unwrap());

        scene.add_component(a, ComponentKind::Light).unwrap();
        assert!(scene.has_component(a, ComponentKind::Light).unwrap());
        assert_eq!(
            scene.add_component(a, ComponentKind::Light),
            Err(SceneError::ComponentExists {
                entity: a,
                kind: ComponentKind::Light
            })
        );
        assert_eq!(
            scene.add_component(a, ComponentKind::Transform),
            Err(SceneError::ComponentLocked(ComponentKind::Transform))
        );
        assert_eq!(
            scene.remove_component(a, ComponentKind::Tag),
            Err(SceneError::ComponentLocked(ComponentKind::Tag))
        );

        let removed = scene.remove_component(a, ComponentKind::Light).unwrap();
        assert_eq!(removed, ComponentData::Light(Light::default()));
        assert!(matches!(
            scene.remove_component(a, ComponentKind::Light),
            Err(SceneError::ComponentMissing { .. })
        ));
    }

    #[test]
    fn test_events_published_next_frame() {
        let mut scene = Scene::default();
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");
        scene.reparent(a, b).unwrap();
        assert!(scene.events().is_empty());

        scene.begin_frame();
        let events: Vec<_> = scene.events().iter().cloned().collect();
        assert_eq!(
            events,
            vec![
                SceneEvent::EntityCreated {
                    entity: a,
                    parent: scene.root()
                },
                SceneEvent::EntityCreated {
                    entity: b,
                    parent: scene.root()
                },
                SceneEvent::Reparented {
                    entity: a,
                    old_parent: scene.root(),
                    new_parent: b
                },
            ]
        );

        scene.begin_frame();
        assert!(scene.events().is_empty());
    }
}
