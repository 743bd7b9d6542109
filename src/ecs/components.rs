//! Scene components
//!
//! The component set is closed: every kind an entity can carry is listed in
//! [`ComponentKind`], and editor dispatch matches on it instead of on types.

use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::cached::ChangeTracker;
use super::hierarchy::{Children, HierarchyError};

/// Euler order used for the human-editable rotation view
pub const EULER_ORDER: EulerRot = EulerRot::XYZ;

/// Convert a rotation to Euler angles in degrees
#[must_use]
pub fn euler_degrees(rotation: Quat) -> Vec3 {
    let (x, y, z) = rotation.to_euler(EULER_ORDER);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Build a rotation from Euler angles in degrees
#[must_use]
pub fn quat_from_euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EULER_ORDER,
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    )
}

/// Hierarchy node and local pose of an entity.
///
/// `position`, `rotation` and `scale` are expressed in the parent's space.
/// The parent link and the child list are only changed by the hierarchy
/// operations, which keep both sides of every link in agreement.
#[derive(Debug, Clone)]
pub struct Transform {
    /// Entity this transform belongs to
    pub owner: Entity,
    pub(crate) parent: Option<Entity>,
    pub(crate) children: Children,
    /// Position in parent space
    pub position: Vec3,
    quaternion: Quat,
    /// Degrees, kept in step with `quaternion`
    euler_angles: Vec3,
    /// Scale in parent space
    pub scale: Vec3,
    pub(crate) tracker: ChangeTracker,
}

impl Transform {
    /// Create an identity transform for `owner` under `parent`.
    ///
    /// The caller is responsible for listing `owner` in the parent's children;
    /// [`crate::ecs::hierarchy::attach`] does both.
    #[must_use]
    pub(crate) fn new(owner: Entity, parent: Option<Entity>) -> Self {
        Self {
            owner,
            parent,
            children: Children::new(),
            position: Vec3::ZERO,
            quaternion: Quat::IDENTITY,
            euler_angles: Vec3::ZERO,
            scale: Vec3::ONE,
            tracker: ChangeTracker::new(),
        }
    }

    /// Set the position, builder style
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Parent entity, `None` for the scene root
    #[must_use]
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Ordered child list
    #[must_use]
    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Rotation as a quaternion
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.quaternion
    }

    /// Rotation as Euler angles in degrees
    #[must_use]
    pub fn euler_angles(&self) -> Vec3 {
        self.euler_angles
    }

    /// Replace the rotation and refresh the Euler view.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.quaternion = rotation.normalize();
        self.euler_angles = euler_degrees(self.quaternion);
    }

    /// Rotate to `angle` degrees around `axis`.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DegenerateAxis`] if `axis` has no direction.
    pub fn rotate_to_axis_angle(&mut self, angle: f32, axis: Vec3) -> Result<(), HierarchyError> {
        let axis = axis.try_normalize().ok_or(HierarchyError::DegenerateAxis)?;
        self.set_rotation(Quat::from_axis_angle(axis, angle.to_radians()));
        Ok(())
    }

    /// Rotate to the given Euler angles (degrees).
    pub fn rotate_to_euler(&mut self, degrees: Vec3) {
        self.quaternion = quat_from_euler_degrees(degrees);
        self.euler_angles = degrees;
    }

    /// Edit the Euler angles in place.
    ///
    /// `edit` returns whether it changed anything (the way an inspector
    /// widget reports interaction); when it did, the quaternion is rebuilt
    /// from the edited angles. Returns the closure's result.
    pub fn edit_euler_angles(&mut self, edit: impl FnOnce(&mut Vec3) -> bool) -> bool {
        let mut degrees = self.euler_angles;
        let changed = edit(&mut degrees);
        if changed {
            self.rotate_to_euler(degrees);
        }
        changed
    }

    /// Rotate `angle` degrees around `axis` through `point`, all in parent space.
    ///
    /// Moves the position along the arc and composes the rotation onto the
    /// current one. Scale is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DegenerateAxis`] if `axis` has no direction.
    pub fn rotate_around_point(
        &mut self,
        point: Vec3,
        angle: f32,
        axis: Vec3,
    ) -> Result<(), HierarchyError> {
        let axis = axis.try_normalize().ok_or(HierarchyError::DegenerateAxis)?;
        let rotation = Quat::from_axis_angle(axis, angle.to_radians());
        self.position = point + rotation * (self.position - point);
        self.set_rotation(rotation * self.quaternion);
        Ok(())
    }

    /// Set a uniform scale. Repeated calls with the same value are no-ops.
    pub fn scale_uniform(&mut self, units: f32) {
        self.scale = Vec3::splat(units);
    }

    /// Local matrix: translate * rotate * scale, ignoring ancestry
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quaternion, self.position)
    }

    /// Overwrite the local pose from a decomposed matrix.
    pub(crate) fn set_local_pose(&mut self, scale: Vec3, rotation: Quat, translation: Vec3) {
        self.position = translation;
        self.scale = scale;
        self.set_rotation(rotation);
    }

    /// Get the forward direction (negative Z in local space)
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.quaternion * Vec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.quaternion * Vec3::X
    }

    /// Get the up direction (positive Y in local space)
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.quaternion * Vec3::Y
    }
}

/// Pose-only write access to a [`Transform`] stored in a scene.
///
/// Reads go through `Deref`. The parent link and child list cannot be
/// reached, so the tree only changes through re-parenting and destruction.
pub struct TransformMut<'a>(hecs::RefMut<'a, Transform>);

impl<'a> TransformMut<'a> {
    pub(crate) fn new(inner: hecs::RefMut<'a, Transform>) -> Self {
        Self(inner)
    }

    /// Set the position in parent space
    pub fn set_position(&mut self, position: Vec3) {
        self.0.position = position;
    }

    /// Set the scale in parent space
    pub fn set_scale(&mut self, scale: Vec3) {
        self.0.scale = scale;
    }

    /// See [`Transform::scale_uniform`]
    pub fn scale_uniform(&mut self, units: f32) {
        self.0.scale_uniform(units);
    }

    /// See [`Transform::set_rotation`]
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.0.set_rotation(rotation);
    }

    /// See [`Transform::rotate_to_euler`]
    pub fn rotate_to_euler(&mut self, degrees: Vec3) {
        self.0.rotate_to_euler(degrees);
    }

    /// See [`Transform::rotate_to_axis_angle`]
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DegenerateAxis`] if `axis` has no direction.
    pub fn rotate_to_axis_angle(&mut self, angle: f32, axis: Vec3) -> Result<(), HierarchyError> {
        self.0.rotate_to_axis_angle(angle, axis)
    }

    /// See [`Transform::edit_euler_angles`]
    pub fn edit_euler_angles(&mut self, edit: impl FnOnce(&mut Vec3) -> bool) -> bool {
        self.0.edit_euler_angles(edit)
    }

    /// See [`Transform::rotate_around_point`]
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DegenerateAxis`] if `axis` has no direction.
    pub fn rotate_around_point(
        &mut self,
        point: Vec3,
        angle: f32,
        axis: Vec3,
    ) -> Result<(), HierarchyError> {
        self.0.rotate_around_point(point, angle, axis)
    }
}

impl std::ops::Deref for TransformMut<'_> {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.0
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.parent == other.parent
            && self.children.as_slice() == other.children.as_slice()
            && self.position == other.position
            && self.quaternion == other.quaternion
            && self.euler_angles == other.euler_angles
            && self.scale == other.scale
    }
}

/// Display name of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mesh reference drawn at the entity's world transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshInstance {
    /// Asset name of the mesh
    pub mesh: String,
    pub has_textures: bool,
    /// Flat color used when the mesh has no textures
    pub color: Vec4,
}

impl MeshInstance {
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            ..Default::default()
        }
    }
}

impl Default for MeshInstance {
    fn default() -> Self {
        Self {
            mesh: String::new(),
            has_textures: true,
            // magenta
            color: Vec4::new(1.0, 0.0, 1.0, 1.0),
        }
    }
}

/// Kind of light source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    #[default]
    Point,
    Spot,
}

/// Light source placed by the entity's world transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub enabled: bool,
    /// Dynamic lights follow their transform every frame
    pub is_dynamic: bool,
}

impl Light {
    pub fn new(kind: LightKind, is_dynamic: bool) -> Self {
        Self {
            kind,
            enabled: true,
            is_dynamic,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(LightKind::Point, true)
    }
}

/// Every component kind an entity can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Tag,
    Transform,
    MeshInstance,
    Light,
}

impl ComponentKind {
    /// All kinds, in inspector order
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Tag,
        ComponentKind::Transform,
        ComponentKind::MeshInstance,
        ComponentKind::Light,
    ];

    /// Display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tag => "Tag",
            Self::Transform => "Transform",
            Self::MeshInstance => "MeshInstance",
            Self::Light => "Light",
        }
    }

    /// Tag and Transform are part of every entity and cannot be added or removed
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Tag | Self::Transform)
    }
}

/// Payload of an optional component, one variant per non-structural kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentData {
    MeshInstance(MeshInstance),
    Light(Light),
}

impl ComponentData {
    /// Default payload for `kind`, `None` for structural kinds
    #[must_use]
    pub fn default_for(kind: ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::MeshInstance => Some(Self::MeshInstance(MeshInstance::default())),
            ComponentKind::Light => Some(Self::Light(Light::default())),
            ComponentKind::Tag | ComponentKind::Transform => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::MeshInstance(_) => ComponentKind::MeshInstance,
            Self::Light(_) => ComponentKind::Light,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn owner() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    fn assert_mat_eq(a: Mat4, b: Mat4) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < EPS, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_local_matrix_composition_order() {
        let mut tr = Transform::new(owner(), None).with_position(Vec3::new(1.0, 2.0, 3.0));
        tr.scale = Vec3::splat(2.0);
        tr.rotate_to_axis_angle(90.0, Vec3::Y).unwrap();

        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
            * Mat4::from_scale(Vec3::splat(2.0));
        assert_mat_eq(tr.local_matrix(), expected);
    }

    #[test]
    fn test_rotate_to_euler_keeps_quaternion_consistent() {
        let mut tr = Transform::new(owner(), None);
        tr.rotate_to_euler(Vec3::new(30.0, -45.0, 60.0));

        let from_quat = Mat4::from_quat(tr.rotation());
        let from_euler = Mat4::from_quat(quat_from_euler_degrees(tr.euler_angles()));
        assert_mat_eq(from_quat, from_euler);
    }

    #[test]
    fn test_rotate_to_axis_angle_updates_euler() {
        let mut tr = Transform::new(owner(), None);
        tr.rotate_to_axis_angle(90.0, Vec3::new(0.0, 0.0, 5.0)).unwrap();

        // degrees
        let euler = tr.euler_angles();
        assert!((euler.z - 90.0).abs() < 1e-2);
        assert!(euler.x.abs() < 1e-2);
        assert!(euler.y.abs() < 1e-2);
    }

    #[test]
    fn test_rotate_to_zero_axis_rejected() {
        let mut tr = Transform::new(owner(), None);
        let before = tr.clone();
        assert_eq!(
            tr.rotate_to_axis_angle(45.0, Vec3::ZERO),
            Err(HierarchyError::DegenerateAxis)
        );
        assert_eq!(tr, before);
    }

    #[test]
    fn test_edit_euler_angles_rebuilds_quaternion_only_on_change() {
        let mut tr = Transform::new(owner(), None);

        assert!(!tr.edit_euler_angles(|e| {
            e.y = 90.0;
            false
        }));
        assert_eq!(tr.rotation(), Quat::IDENTITY);

        assert!(tr.edit_euler_angles(|e| {
            e.y = 90.0;
            true
        }));
        let right = tr.rotation() * Vec3::X;
        assert!((right - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn test_scale_uniform_is_idempotent() {
        let mut tr = Transform::new(owner(), None);
        tr.scale_uniform(2.0);
        tr.scale_uniform(2.0);
        assert_eq!(tr.scale, Vec3::splat(2.0));
    }

    #[test]
    fn test_rotate_around_point_moves_along_arc() {
        let mut tr = Transform::new(owner(), None).with_position(Vec3::new(2.0, 0.0, 0.0));
        tr.rotate_around_point(Vec3::new(1.0, 0.0, 0.0), 180.0, Vec3::Y)
            .unwrap();

        assert!((tr.position - Vec3::ZERO).length() < EPS);
        let facing = tr.rotation() * Vec3::X;
        assert!((facing - Vec3::NEG_X).length() < EPS);
    }

    #[test]
    fn test_structural_equality() {
        let e = owner();
        let a = Transform::new(e, None).with_position(Vec3::X);
        let mut b = a.clone();
        assert_eq!(a, b);

        b.scale_uniform(3.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_component_kinds() {
        assert_eq!(ComponentKind::ALL.len(), 4);
        assert!(ComponentKind::Transform.is_structural());
        assert!(!ComponentKind::Light.is_structural());
        assert_eq!(ComponentKind::MeshInstance.to_string(), "MeshInstance");
    }

    #[test]
    fn test_component_data_defaults() {
        for kind in ComponentKind::ALL {
            match ComponentData::default_for(kind) {
                Some(data) => assert_eq!(data.kind(), kind),
                None => assert!(kind.is_structural()),
            }
        }
    }
}
