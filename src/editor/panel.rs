//! Scene hierarchy and inspector panels
//!
//! User gestures are decoupled from scene mutation: the UI turns clicks,
//! drags and menu picks into [`PanelAction`] values, and
//! [`SceneHierarchyPanel::handle`] is the only place they touch the scene.
//!
//! # Example
//!
//! ```ignore
//! let mut panel = SceneHierarchyPanel::new();
//!
//! for row in panel.rows(&scene)? {
//!     draw_tree_node(row.depth, &row.label, row.is_leaf, row.selected);
//! }
//!
//! // the user dragged `lamp` onto `table`
//! if let Err(e) = panel.handle(&mut scene, PanelAction::DropOnEntity { dragged: lamp, target: table }) {
//!     show_toast(&e.to_string());
//! }
//! ```

use glam::Vec3;
use hecs::Entity;
use rustc_hash::FxHashSet;

use crate::core::{Scene, SceneError};
use crate::ecs::ComponentKind;

/// Name given to entities made from the "Create Empty" menu
pub const EMPTY_ENTITY_NAME: &str = "Empty Entity";

// ============================================================================
// Actions
// ============================================================================

/// A user gesture in the hierarchy or inspector panel.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PanelAction {
    /// Click on a tree node
    Select(Entity),
    /// Click on blank space
    ClearSelection,
    /// Drag `dragged` and drop it on the node of `target`
    DropOnEntity { dragged: Entity, target: Entity },
    /// Drag `dragged` and drop it on blank space, making it top level
    DropOnBlank { dragged: Entity },
    /// "Delete Entity" from a node's context menu
    Delete(Entity),
    /// "Create Empty Entity" from the blank-space context menu
    CreateEmpty,
    /// Inspector edit of the selected entity
    Edit(InspectorEdit),
}

/// An inspector widget interaction on the selected entity.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectorEdit {
    SetPosition(Vec3),
    /// Degrees
    SetEulerAngles(Vec3),
    SetScale(Vec3),
    Rename(String),
    AddComponent(ComponentKind),
    RemoveComponent(ComponentKind),
}

// ============================================================================
// Views
// ============================================================================

/// One visible line of the hierarchy tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub entity: Entity,
    /// Nesting level, top-level entities are 0
    pub depth: usize,
    pub label: String,
    pub is_leaf: bool,
    pub expanded: bool,
    pub selected: bool,
}

/// Snapshot of the selected entity for the inspector
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorView {
    pub entity: Entity,
    pub tag: String,
    pub position: Vec3,
    /// Degrees
    pub euler_angles: Vec3,
    pub scale: Vec3,
    /// `None` when the root itself is selected
    pub parent_tag: Option<String>,
    pub child_count: usize,
    /// Every component kind present, structural ones included
    pub components: Vec<ComponentKind>,
}

// ============================================================================
// Panel
// ============================================================================

/// Headless scene hierarchy panel.
///
/// Holds only view state; the scene is passed in on every call.
#[derive(Debug, Clone, Default)]
pub struct SceneHierarchyPanel {
    /// Nodes the user folded
    collapsed: FxHashSet<Entity>,
}

impl SceneHierarchyPanel {
    /// Create a panel with every node expanded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold or unfold a node.
    pub fn set_expanded(&mut self, entity: Entity, expanded: bool) {
        if expanded {
            self.collapsed.remove(&entity);
        } else {
            self.collapsed.insert(entity);
        }
    }

    #[must_use]
    pub fn is_expanded(&self, entity: Entity) -> bool {
        !self.collapsed.contains(&entity)
    }

    /// Unfold every node.
    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    /// Visible rows in draw order.
    ///
    /// Children of a folded node are skipped; the folded node itself is shown.
    ///
    /// # Errors
    ///
    /// Fails if the hierarchy is corrupted.
    pub fn rows(&self, scene: &Scene) -> Result<Vec<TreeRow>, SceneError> {
        let selected = scene.selected();
        let mut rows = Vec::new();
        let mut folded_at: Option<usize> = None;

        for (entity, depth) in scene.traverse()? {
            if let Some(level) = folded_at {
                if depth > level {
                    continue;
                }
                folded_at = None;
            }

            let is_leaf = scene.transform(entity)?.children().is_empty();
            let expanded = self.is_expanded(entity);
            if !is_leaf && !expanded {
                folded_at = Some(depth);
            }

            rows.push(TreeRow {
                entity,
                depth,
                label: scene.tag(entity)?,
                is_leaf,
                expanded,
                selected: selected == Some(entity),
            });
        }
        Ok(rows)
    }

    /// Apply a user gesture to the scene.
    ///
    /// A rejected drop leaves the tree untouched and is returned as an error.
    /// Edits with nothing selected are ignored.
    ///
    /// # Errors
    ///
    /// Whatever the underlying scene operation reports.
    pub fn handle(&mut self, scene: &mut Scene, action: PanelAction) -> Result<(), SceneError> {
        match action {
            PanelAction::Select(entity) => scene.select(entity),
            PanelAction::ClearSelection => {
                scene.clear_selection();
                Ok(())
            }
            PanelAction::DropOnEntity { dragged, target } => scene.reparent(dragged, target),
            PanelAction::DropOnBlank { dragged } => {
                let root = scene.root();
                scene.reparent(dragged, root)
            }
            PanelAction::Delete(entity) => {
                scene.destroy_entity(entity)?;
                self.forget_dead(scene);
                Ok(())
            }
            PanelAction::CreateEmpty => {
                let entity = scene.create_entity(EMPTY_ENTITY_NAME);
                log::debug!("panel created {entity:?}");
                Ok(())
            }
            PanelAction::Edit(edit) => match scene.selected() {
                Some(entity) => Self::apply_edit(scene, entity, edit),
                None => {
                    log::debug!("ignoring {edit:?}: nothing selected");
                    Ok(())
                }
            },
        }
    }

    fn apply_edit(scene: &mut Scene, entity: Entity, edit: InspectorEdit) -> Result<(), SceneError> {
        match edit {
            InspectorEdit::SetPosition(position) => {
                scene.transform_mut(entity)?.set_position(position);
            }
            InspectorEdit::SetEulerAngles(degrees) => {
                scene.transform_mut(entity)?.edit_euler_angles(|angles| {
                    let changed = *angles != degrees;
                    *angles = degrees;
                    changed
                });
            }
            InspectorEdit::SetScale(scale) => {
                scene.transform_mut(entity)?.set_scale(scale);
            }
            InspectorEdit::Rename(name) => scene.set_tag(entity, name)?,
            InspectorEdit::AddComponent(kind) => scene.add_component(entity, kind)?,
            InspectorEdit::RemoveComponent(kind) => {
                scene.remove_component(entity, kind)?;
            }
        }
        Ok(())
    }

    /// Snapshot of the selected entity, `None` when nothing is selected.
    ///
    /// # Errors
    ///
    /// Fails if the selection or its parent no longer resolves.
    pub fn inspector(&self, scene: &Scene) -> Result<Option<InspectorView>, SceneError> {
        let Some(entity) = scene.selected() else {
            return Ok(None);
        };

        let (position, euler_angles, scale, parent, child_count) = {
            let transform = scene.transform(entity)?;
            (
                transform.position,
                transform.euler_angles(),
                transform.scale,
                transform.parent(),
                transform.children().len(),
            )
        };
        let parent_tag = parent.map(|p| scene.tag(p)).transpose()?;

        let mut components = Vec::new();
        for kind in ComponentKind::ALL {
            if scene.has_component(entity, kind)? {
                components.push(kind);
            }
        }

        Ok(Some(InspectorView {
            entity,
            tag: scene.tag(entity)?,
            position,
            euler_angles,
            scale,
            parent_tag,
            child_count,
            components,
        }))
    }

    /// Drop fold state of entities that no longer exist.
    fn forget_dead(&mut self, scene: &Scene) {
        self.collapsed.retain(|&entity| scene.contains(entity));
    }
}

// ============================================================================
// Tests
// ============================================================================
