//! Scene event queue
//!
//! Hierarchy mutations publish [`SceneEvent`]s into a double-buffered queue.
//! Events pushed during frame N become readable after the swap performed by
//! `Scene::begin_frame` for frame N+1, so every consumer sees the same batch.
//!
//! # Example
//!
//! ```ignore
//! scene.reparent(lamp, table)?;
//!
//! scene.begin_frame();
//! for event in scene.events().iter() {
//!     if let SceneEvent::Reparented { entity, .. } = event {
//!         refresh_outline(*entity);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use hecs::Entity;

use crate::ecs::ComponentKind;

/// Something that happened to the scene hierarchy.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SceneEvent {
    /// A new entity was added under `parent`.
    EntityCreated { entity: Entity, parent: Entity },

    /// An entity was despawned.
    EntityDestroyed { entity: Entity },

    /// An entity moved to a new parent.
    Reparented {
        entity: Entity,
        old_parent: Entity,
        new_parent: Entity,
    },

    /// The editor selection changed.
    SelectionChanged { selected: Option<Entity> },

    /// A component was attached.
    ComponentAdded { entity: Entity, kind: ComponentKind },

    /// A component was detached.
    ComponentRemoved { entity: Entity, kind: ComponentKind },
}

/// Double-buffered event queue for frame-consistent event processing.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this frame
    pending: VecDeque<SceneEvent>,
    /// Events from previous frame, ready for processing
    processing: VecDeque<SceneEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next frame.
    #[inline]
    pub fn push(&mut self, event: SceneEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// Events left unread from the previous frame are dropped.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous frame.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SceneEvent> {
        self.processing.iter()
    }

    /// Drain all events from the previous frame.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SceneEvent> + '_ {
        self.processing.drain(..)
    }

    /// Check if there are any events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events pending for next frame.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
