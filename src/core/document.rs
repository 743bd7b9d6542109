//! Scene serialization and deserialization
//!
//! Supports saving and loading whole hierarchies in RON (Rusty Object
//! Notation) or JSON. Entities are stored in traversal order with the root at
//! index 0; links are indices into that list.

use std::fs;
use std::path::Path;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::config::SceneConfig;
use super::scene::{Scene, SceneError};
use crate::ecs::{ComponentData, Light, MeshInstance};

/// A serializable entity with its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEntity {
    /// Entity tag
    pub name: String,
    /// Local position
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local scale
    pub scale: Vec3,
    /// Parent entity index, `None` only for the root
    pub parent_index: Option<usize>,
    /// Child entity indices, in display order
    pub children_indices: Vec<usize>,
    #[serde(default)]
    pub mesh: Option<MeshInstance>,
    #[serde(default)]
    pub light: Option<Light>,
}

impl SerializedEntity {
    /// Shortest quaternion accepted as a rotation
    const MIN_ROTATION_LENGTH: f32 = 1e-6;

    /// Normalized rotation, after checking the pose holds only finite numbers
    fn pose_rotation(&self) -> Result<Quat, DocumentError> {
        if !self.position.is_finite() || !self.scale.is_finite() {
            return Err(DocumentError::InvalidTransform(format!(
                "'{}' has a non-finite position or scale",
                self.name
            )));
        }
        let length = self.rotation.length();
        if !self.rotation.is_finite() || length < Self::MIN_ROTATION_LENGTH {
            return Err(DocumentError::InvalidTransform(format!(
                "'{}' has no usable rotation",
                self.name
            )));
        }
        Ok(self.rotation / length)
    }
}

impl Default for SerializedEntity {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent_index: None,
            children_indices: Vec::new(),
            mesh: None,
            light: None,
        }
    }
}

/// A serializable scene containing the whole hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    pub version: u32,
    /// All entities, root first
    pub entities: Vec<SerializedEntity>,
}

impl SceneDocument {
    /// Current document version
    pub const VERSION: u32 = 1;

    /// Capture `scene` into a document
    ///
    /// # Errors
    ///
    /// Fails if the scene's tree is corrupted.
    pub fn capture(scene: &Scene, name: impl Into<String>) -> Result<Self, SceneError> {
        let root = scene.root();
        let mut order = vec![root];
        order.extend(scene.traverse()?.into_iter().map(|(e, _)| e));

        let index: FxHashMap<_, _> = order.iter().enumerate().map(|(i, &e)| (e, i)).collect();

        let mut entities = Vec::with_capacity(order.len());
        for &entity in &order {
            let transform = scene.transform(entity)?;
            entities.push(SerializedEntity {
                name: scene.tag(entity)?,
                position: transform.position,
                rotation: transform.rotation(),
                scale: transform.scale,
                parent_index: transform.parent().and_then(|p| index.get(&p).copied()),
                children_indices: transform
                    .children()
                    .iter()
                    .filter_map(|c| index.get(c).copied())
                    .collect(),
                mesh: scene
                    .component::<MeshInstance>(entity)
                    .ok()
                    .map(|m| (*m).clone()),
                light: scene.component::<Light>(entity).ok().map(|l| *l),
            });
        }

        Ok(Self {
            name: name.into(),
            version: Self::VERSION,
            entities,
        })
    }

    /// Build a new scene from this document.
    ///
    /// The root's tag in the document overrides `config.root_name`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidHierarchy`] if the links do not describe
    /// a single tree rooted at index 0, and [`DocumentError::InvalidTransform`]
    /// if a pose holds NaN, infinity or a zero rotation.
    pub fn instantiate(&self, config: SceneConfig) -> Result<Scene, DocumentError> {
        let Some(root_entry) = self.entities.first() else {
            return Err(DocumentError::InvalidHierarchy(
                "document has no root entity".into(),
            ));
        };
        if root_entry.parent_index.is_some() {
            return Err(DocumentError::InvalidHierarchy(
                "root entity has a parent".into(),
            ));
        }

        let mut scene = Scene::new(config.with_root_name(root_entry.name.clone()));
        let root = scene.root();
        let mut created = vec![None; self.entities.len()];
        created[0] = Some(root);
        Self::apply_entry(&mut scene, root, root_entry)?;

        // each child list is walked once, in order, so siblings keep their order
        let mut stack = vec![(0, root)];
        while let Some((parent_index, parent)) = stack.pop() {
            for &child_index in &self.entities[parent_index].children_indices {
                let Some(entry) = self.entities.get(child_index) else {
                    return Err(DocumentError::InvalidHierarchy(format!(
                        "entity {parent_index} lists missing child {child_index}"
                    )));
                };
                if entry.parent_index != Some(parent_index) || created[child_index].is_some() {
                    return Err(DocumentError::InvalidHierarchy(format!(
                        "entity {child_index} is not a child of {parent_index}"
                    )));
                }

                let child = scene.create_child(&entry.name, parent)?;
                Self::apply_entry(&mut scene, child, entry)?;
                created[child_index] = Some(child);
                stack.push((child_index, child));
            }
        }

        if let Some(orphan) = created.iter().position(Option::is_none) {
            return Err(DocumentError::InvalidHierarchy(format!(
                "entity {orphan} is not reachable from the root"
            )));
        }

        log::debug!(
            "instantiated scene '{}' with {} entities",
            self.name,
            self.entities.len()
        );
        Ok(scene)
    }

    fn apply_entry(
        scene: &mut Scene,
        entity: hecs::Entity,
        entry: &SerializedEntity,
    ) -> Result<(), DocumentError> {
        let rotation = entry.pose_rotation()?;
        {
            let mut transform = scene.transform_mut(entity)?;
            transform.set_position(entry.position);
            transform.set_rotation(rotation);
            transform.set_scale(entry.scale);
        }
        if let Some(mesh) = &entry.mesh {
            scene.insert_component(entity, ComponentData::MeshInstance(mesh.clone()))?;
        }
        if let Some(light) = entry.light {
            scene.insert_component(entity, ComponentData::Light(light))?;
        }
        Ok(())
    }

    /// Get the number of entities, root included
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Check if the document holds no entities
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Save the document to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| DocumentError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| DocumentError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a document from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let content =
            fs::read_to_string(path).map_err(|e| DocumentError::IoError(e.to_string()))?;
        let document: SceneDocument =
            ron::from_str(&content).map_err(|e| DocumentError::DeserializeError(e.to_string()))?;
        Ok(document)
    }

    /// Save the document to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| DocumentError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| DocumentError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a document from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let content =
            fs::read_to_string(path).map_err(|e| DocumentError::IoError(e.to_string()))?;
        let document: SceneDocument = serde_json::from_str(&content)
            .map_err(|e| DocumentError::DeserializeError(e.to_string()))?;
        Ok(document)
    }
}

/// Errors that can occur while saving or loading documents
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// Links do not form a tree rooted at index 0
    InvalidHierarchy(String),
    /// An entity's pose holds non-finite values or a zero rotation
    InvalidTransform(String),
    /// Building the scene failed
    Scene(SceneError),
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::InvalidHierarchy(e) => write!(f, "Invalid hierarchy: {e}"),
            Self::InvalidTransform(e) => write!(f, "Invalid transform: {e}"),
            Self::Scene(e) => write!(f, "Scene error: {e}"),
        }
    }
}

impl std::error::Error for DocumentError {}

impl From<SceneError> for DocumentError {
    fn from(error: SceneError) -> Self {
        Self::Scene(error)
    }
}
