//! Editor front end
//!
//! Headless model of the scene hierarchy and inspector panels. A UI layer
//! draws [`TreeRow`]s and feeds user gestures back as [`PanelAction`]s.

mod panel;

pub use panel::{InspectorEdit, InspectorView, PanelAction, SceneHierarchyPanel, TreeRow};
