//! Scene configuration

use serde::{Deserialize, Serialize};

/// What happens to the children of a destroyed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DestroyPolicy {
    /// Destroy the whole subtree
    #[default]
    Cascade,
    /// Move the children to the destroyed entity's parent, keeping their world pose
    ReparentToParent,
}

/// Scene configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Tag given to the root entity
    pub root_name: String,
    /// Tag used when an entity is created with an empty name
    pub default_entity_name: String,
    /// Policy applied by `Scene::destroy_entity`
    pub destroy_policy: DestroyPolicy,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            root_name: String::from("Root"),
            default_entity_name: String::from("Entity"),
            destroy_policy: DestroyPolicy::Cascade,
        }
    }
}

impl SceneConfig {
    /// Set the root entity's tag
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// Set the fallback tag for unnamed entities
    pub fn with_default_entity_name(mut self, name: impl Into<String>) -> Self {
        self.default_entity_name = name.into();
        self
    }

    /// Set the child policy for destruction
    pub fn with_destroy_policy(mut self, policy: DestroyPolicy) -> Self {
        self.destroy_policy = policy;
        self
    }
}
