//! Entity hierarchy
//!
//! Every entity's [`Transform`] holds a parent link and an ordered child list.
//! The links form a tree under the scene root; world matrices are composed
//! top-down as `parent_world * local`.
//!
//! All functions here read or write only `Transform` components and check
//! their preconditions before touching anything, so a rejected operation
//! leaves the tree exactly as it was.

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::components::Transform;
use super::world::World;

/// Smallest absolute determinant treated as invertible
pub const MIN_DETERMINANT: f32 = 1e-12;

/// Children component data - ordered list of child entities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub SmallVec<[Entity; 8]>);

impl Children {
    /// Create an empty children list
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Append a child; an entity already listed is left where it is
    pub fn add(&mut self, child: Entity) {
        if !self.0.contains(&child) {
            self.0.push(child);
        }
    }

    /// Remove a child
    pub fn remove(&mut self, child: Entity) -> bool {
        if let Some(pos) = self.0.iter().position(|&e| e == child) {
            self.0.remove(pos);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, child: Entity) -> bool {
        self.0.contains(&child)
    }

    /// Check if this entity has children
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of children
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }

    /// Iterate over children
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.0.iter()
    }
}

/// Global transform - computed world-space transform
///
/// Written by [`crate::core::Scene::propagate_transforms`] once per frame for
/// read-only consumers such as a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform {
    /// World-space transformation matrix
    pub matrix: Mat4,
}

impl GlobalTransform {
    /// Create from a transformation matrix
    #[must_use]
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// Create identity transform
    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }

    /// Get world position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.matrix.col(3).truncate()
    }

}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Errors raised by hierarchy queries and mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyError {
    /// Handle refers to a despawned entity
    StaleEntity(Entity),
    /// Entity exists but carries no transform
    MissingTransform(Entity),
    /// An entity cannot become its own parent
    SelfParent(Entity),
    /// The root has no parent and cannot be moved or destroyed
    RootImmutable(Entity),
    /// The new parent lies inside the subtree being moved
    CycleDetected { dragged: Entity, new_parent: Entity },
    /// A world matrix involved in the operation cannot be inverted
    DegenerateTransform(Entity),
    /// Rotation axis has zero length
    DegenerateAxis,
    /// The entity's new local pose would need shear, which a transform cannot hold
    ShearRequired(Entity),
    /// Parent and child links disagree; the tree was already broken
    Corrupted { parent: Entity, child: Entity },
    /// Entity has a transform but is not reachable from the root
    Unreachable(Entity),
}

impl HierarchyError {
    pub(crate) fn lookup(entity: Entity, error: hecs::ComponentError) -> Self {
        match error {
            hecs::ComponentError::NoSuchEntity => Self::StaleEntity(entity),
            hecs::ComponentError::MissingComponent(_) => Self::MissingTransform(entity),
        }
    }
}

impl std::fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaleEntity(e) => write!(f, "entity {e:?} no longer exists"),
            Self::MissingTransform(e) => write!(f, "entity {e:?} has no transform"),
            Self::SelfParent(e) => write!(f, "entity {e:?} cannot be its own parent"),
            Self::RootImmutable(e) => write!(f, "root entity {e:?} cannot be moved or destroyed"),
            Self::CycleDetected {
                dragged,
                new_parent,
            } => write!(
                f,
                "cannot parent {dragged:?} under its own descendant {new_parent:?}"
            ),
            Self::DegenerateTransform(e) => {
                write!(f, "world transform of {e:?} is not invertible")
            }
            Self::DegenerateAxis => write!(f, "rotation axis has zero length"),
            Self::ShearRequired(e) => write!(
                f,
                "local pose of {e:?} would need shear under its new parent"
            ),
            Self::Corrupted { parent, child } => write!(
                f,
                "hierarchy corrupted: {child:?} and {parent:?} disagree about their link"
            ),
            Self::Unreachable(e) => write!(f, "entity {e:?} is not reachable from the root"),
        }
    }
}

impl std::error::Error for HierarchyError {}

/// Largest per-component error accepted when a decomposed pose is recomposed
pub const DECOMPOSE_TOLERANCE: f32 = 1e-4;

/// True if `matrix` can be inverted without producing non-finite values
#[must_use]
pub fn is_invertible(matrix: Mat4) -> bool {
    let det = matrix.determinant();
    det.is_finite() && det.abs() > MIN_DETERMINANT
}

/// Split `matrix` into scale, rotation and translation.
///
/// Returns `None` when translate * rotate * scale cannot reproduce `matrix`,
/// which happens when a rotated child sits under a non-uniformly scaled
/// parent. The tolerance grows with the largest matrix entry.
#[must_use]
pub fn decompose(matrix: Mat4) -> Option<(Vec3, Quat, Vec3)> {
    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
    let recomposed = Mat4::from_scale_rotation_translation(scale, rotation, translation);
    let magnitude = matrix
        .to_cols_array()
        .iter()
        .fold(1.0_f32, |max, v| max.max(v.abs()));

    recomposed
        .abs_diff_eq(matrix, DECOMPOSE_TOLERANCE * magnitude)
        .then_some((scale, rotation, translation))
}

/// World matrix of `entity`: the local matrices from the root down to it.
///
/// # Errors
///
/// Fails on a stale handle, a missing transform, or a parent chain that loops.
pub fn world_matrix(world: &World, entity: Entity) -> Result<Mat4, HierarchyError> {
    let limit = world.len() as usize;
    let mut matrix = Mat4::IDENTITY;
    let mut current = entity;
    let mut steps = 0;

    loop {
        let transform = world.transform(current)?;
        matrix = transform.local_matrix() * matrix;
        let Some(parent) = transform.parent else {
            return Ok(matrix);
        };

        steps += 1;
        if steps > limit {
            return Err(HierarchyError::Corrupted {
                parent,
                child: current,
            });
        }
        current = parent;
    }
}

/// World matrix of the parent of `entity`, identity for the root.
///
/// # Errors
///
/// Same as [`world_matrix`].
pub fn parent_matrix(world: &World, entity: Entity) -> Result<Mat4, HierarchyError> {
    match world.transform(entity)?.parent {
        Some(parent) => world_matrix(world, parent),
        None => Ok(Mat4::IDENTITY),
    }
}

/// True if `ancestor` appears on the parent chain of `entity` (strictly above it).
///
/// # Errors
///
/// Fails on a stale handle, a missing transform, or a parent chain that loops.
pub fn is_descendant(world: &World, entity: Entity, ancestor: Entity) -> Result<bool, HierarchyError> {
    let limit = world.len() as usize;
    let mut current = world.transform(entity)?.parent;
    let mut steps = 0;

    while let Some(parent) = current {
        if parent == ancestor {
            return Ok(true);
        }
        steps += 1;
        if steps > limit {
            return Err(HierarchyError::Corrupted {
                parent,
                child: entity,
            });
        }
        current = world.transform(parent)?.parent;
    }
    Ok(false)
}

/// Link a freshly inserted transform into its parent's child list.
///
/// # Errors
///
/// Fails if `entity` or `parent` has no transform.
pub fn attach(world: &mut World, entity: Entity, parent: Entity) -> Result<(), HierarchyError> {
    world.transform(parent)?;
    world.transform_mut(entity)?.parent = Some(parent);
    world.transform_mut(parent)?.children.add(entity);
    Ok(())
}

/// Unlink `entity` from its parent's child list and clear its parent link.
///
/// # Errors
///
/// [`HierarchyError::RootImmutable`] for the root, and
/// [`HierarchyError::Corrupted`] if the parent does not list `entity`.
pub fn detach(world: &mut World, entity: Entity) -> Result<Entity, HierarchyError> {
    let parent = world
        .transform(entity)?
        .parent
        .ok_or(HierarchyError::RootImmutable(entity))?;

    if !world.transform_mut(parent)?.children.remove(entity) {
        log::error!("{entity:?} missing from the children of its parent {parent:?}");
        return Err(HierarchyError::Corrupted {
            parent,
            child: entity,
        });
    }
    world.transform_mut(entity)?.parent = None;
    Ok(parent)
}

/// A validated re-parent, ready to apply.
///
/// Holds the new local pose that keeps the entity's world pose unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReparentPlan {
    pub dragged: Entity,
    pub old_parent: Entity,
    pub new_parent: Entity,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// Validate moving `dragged` under `new_parent` and compute its new local pose.
///
/// The new local matrix is `inverse(parent_world) * dragged_world`, read while
/// the old parent chain is still in place, decomposed into scale, rotation and
/// translation.
///
/// # Errors
///
/// - [`HierarchyError::SelfParent`] if `dragged == new_parent`
/// - [`HierarchyError::RootImmutable`] if `dragged` is the root
/// - [`HierarchyError::CycleDetected`] if `new_parent` descends from `dragged`
/// - [`HierarchyError::Corrupted`] if the old parent does not list `dragged`
/// - [`HierarchyError::DegenerateTransform`] if either world matrix is singular
/// - [`HierarchyError::ShearRequired`] if the new local pose is not translate * rotate * scale
pub fn plan_reparent(
    world: &World,
    dragged: Entity,
    new_parent: Entity,
) -> Result<ReparentPlan, HierarchyError> {
    if dragged == new_parent {
        return Err(HierarchyError::SelfParent(dragged));
    }

    let old_parent = world
        .transform(dragged)?
        .parent
        .ok_or(HierarchyError::RootImmutable(dragged))?;

    if is_descendant(world, new_parent, dragged)? {
        return Err(HierarchyError::CycleDetected {
            dragged,
            new_parent,
        });
    }

    if !world.transform(old_parent)?.children.contains(dragged) {
        log::error!("{dragged:?} missing from the children of its parent {old_parent:?}");
        return Err(HierarchyError::Corrupted {
            parent: old_parent,
            child: dragged,
        });
    }

    let parent_world = world_matrix(world, new_parent)?;
    if !is_invertible(parent_world) {
        return Err(HierarchyError::DegenerateTransform(new_parent));
    }
    let dragged_world = world_matrix(world, dragged)?;
    if !is_invertible(dragged_world) {
        return Err(HierarchyError::DegenerateTransform(dragged));
    }

    let local = parent_world.inverse() * dragged_world;
    let (scale, rotation, translation) =
        decompose(local).ok_or(HierarchyError::ShearRequired(dragged))?;

    Ok(ReparentPlan {
        dragged,
        old_parent,
        new_parent,
        translation,
        rotation,
        scale,
    })
}

/// Apply a plan from [`plan_reparent`].
///
/// The entity is appended as the last child of the new parent; its parent
/// link is switched only after the pose has been rewritten.
///
/// # Errors
///
/// Fails only if an entity in the plan was despawned after planning.
pub fn apply_reparent(world: &mut World, plan: &ReparentPlan) -> Result<(), HierarchyError> {
    if !world.transform_mut(plan.old_parent)?.children.remove(plan.dragged) {
        return Err(HierarchyError::Corrupted {
            parent: plan.old_parent,
            child: plan.dragged,
        });
    }
    world.transform_mut(plan.new_parent)?.children.add(plan.dragged);

    let mut transform = world.transform_mut(plan.dragged)?;
    transform.set_local_pose(plan.scale, plan.rotation, plan.translation);
    transform.parent = Some(plan.new_parent);

    log::debug!(
        "reparented {:?} from {:?} to {:?}",
        plan.dragged,
        plan.old_parent,
        plan.new_parent
    );
    Ok(())
}

/// Move `dragged` under `new_parent`, preserving its world pose.
///
/// # Errors
///
/// See [`plan_reparent`]. Nothing is modified when an error is returned.
pub fn reparent(world: &mut World, dragged: Entity, new_parent: Entity) -> Result<(), HierarchyError> {
    let plan = plan_reparent(world, dragged, new_parent)?;
    apply_reparent(world, &plan)
}

/// Rotate `entity` around a world-space `point`.
///
/// The pivot rotation is applied to the entity's world matrix and the result
/// is brought back into parent space, so position and rotation both change.
///
/// # Errors
///
/// [`HierarchyError::DegenerateAxis`] for a zero axis,
/// [`HierarchyError::DegenerateTransform`] if the parent's world matrix is singular, and
/// [`HierarchyError::ShearRequired`] if the rotated pose cannot be expressed under the parent.
pub fn rotate_around_world_point(
    world: &mut World,
    entity: Entity,
    point: Vec3,
    angle: f32,
    axis: Vec3,
) -> Result<(), HierarchyError> {
    let axis = axis.try_normalize().ok_or(HierarchyError::DegenerateAxis)?;
    let parent_world = parent_matrix(world, entity)?;
    if !is_invertible(parent_world) {
        return Err(HierarchyError::DegenerateTransform(entity));
    }
    let current = world_matrix(world, entity)?;

    let pivot = Mat4::from_translation(point)
        * Mat4::from_axis_angle(axis, angle.to_radians())
        * Mat4::from_translation(-point);
    let local = parent_world.inverse() * pivot * current;
    let (scale, rotation, translation) =
        decompose(local).ok_or(HierarchyError::ShearRequired(entity))?;

    world
        .transform_mut(entity)?
        .set_local_pose(scale, rotation, translation);
    Ok(())
}

/// Entities under `entity` in pre-order, with depth relative to it (children are depth 0).
///
/// # Errors
///
/// Fails on a stale child link or a child listed twice.
pub fn descendants(world: &World, entity: Entity) -> Result<Vec<(Entity, usize)>, HierarchyError> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let mut stack: Vec<(Entity, Entity, usize)> = world
        .transform(entity)?
        .children
        .iter()
        .rev()
        .map(|&child| (entity, child, 0))
        .collect();

    while let Some((parent, current, depth)) = stack.pop() {
        if !seen.insert(current) {
            return Err(HierarchyError::Corrupted {
                parent,
                child: current,
            });
        }
        out.push((current, depth));
        let transform = world.transform(current)?;
        stack.extend(
            transform
                .children
                .iter()
                .rev()
                .map(|&child| (current, child, depth + 1)),
        );
    }
    Ok(out)
}

/// Check the tree invariant for everything under `root`.
///
/// Every child must point back at the parent listing it, no entity may be
/// listed twice, and every entity with a transform must be reachable.
///
/// # Errors
///
/// The first violation found.
pub fn validate(world: &World, root: Entity) -> Result<(), HierarchyError> {
    if let Some(parent) = world.transform(root)?.parent {
        return Err(HierarchyError::Corrupted {
            parent,
            child: root,
        });
    }

    let mut reachable = FxHashSet::default();
    reachable.insert(root);
    let mut stack = vec![root];

    while let Some(parent) = stack.pop() {
        let children = world.transform(parent)?.children.clone();
        for &child in children.iter() {
            let child_parent = world.transform(child)?.parent;
            if child_parent != Some(parent) || !reachable.insert(child) {
                return Err(HierarchyError::Corrupted { parent, child });
            }
            stack.push(child);
        }
    }

    for (entity, _) in world.query::<&Transform>().iter() {
        if !reachable.contains(&entity) {
            return Err(HierarchyError::Unreachable(entity));
        }
    }
    Ok(())
}
