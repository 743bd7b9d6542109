//! Per-frame change detection for world matrices
//!
//! A transform is "updated" in a frame when its world matrix differs from the
//! one observed in the last frame it was checked. The result is latched per
//! frame number, so any number of queries within one frame agree.
//!
//! # Example
//!
//! ```ignore
//! let mut tracker = ChangeTracker::new();
//!
//! assert!(tracker.updated(1, matrix));   // first observation
//! assert!(tracker.updated(1, matrix));   // same frame, same answer
//! assert!(!tracker.updated(2, matrix));  // unchanged since frame 1
//! ```

use glam::Mat4;

/// Latched world-matrix comparison keyed by frame number.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    /// World matrix seen at the last evaluated frame
    previous: Option<Mat4>,
    /// Frame the latched result belongs to
    frame: Option<u64>,
    /// Latched result for `frame`
    changed: bool,
}

impl ChangeTracker {
    /// Create a tracker that has never observed a matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report whether `matrix` differs from the one seen in the previous
    /// evaluated frame.
    ///
    /// The first call for a given `frame` compares and records; later calls
    /// for the same frame return the recorded answer and ignore `matrix`.
    /// The first observation ever counts as a change.
    pub fn updated(&mut self, frame: u64, matrix: Mat4) -> bool {
        if self.frame == Some(frame) {
            return self.changed;
        }

        self.changed = self.previous != Some(matrix);
        self.previous = Some(matrix);
        self.frame = Some(frame);
        self.changed
    }

    /// Matrix recorded at the last evaluated frame
    #[must_use]
    #[inline]
    pub fn previous(&self) -> Option<Mat4> {
        self.previous
    }

    /// Last frame this tracker was evaluated in
    #[must_use]
    #[inline]
    pub fn last_frame(&self) -> Option<u64> {
        self.frame
    }

    /// Forget everything; the next evaluation reports a change.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_first_observation_is_a_change() {
        let mut tracker = ChangeTracker::new();
        assert!(tracker.updated(0, Mat4::IDENTITY));
        assert_eq!(tracker.previous(), Some(Mat4::IDENTITY));
        assert_eq!(tracker.last_frame(), Some(0));
    }

    #[test]
    fn test_repeated_queries_in_one_frame_agree() {
        let mut tracker = ChangeTracker::new();
        tracker.updated(1, Mat4::IDENTITY);

        let moved = Mat4::from_translation(Vec3::X);
        assert!(tracker.updated(2, moved));
        assert!(tracker.updated(2, moved));
        assert!(tracker.updated(2, moved));

        assert!(!tracker.updated(3, moved));
        assert!(!tracker.updated(3, moved));
    }

    #[test]
    fn test_same_frame_ignores_later_matrices() {
        let mut tracker = ChangeTracker::new();
        tracker.updated(1, Mat4::IDENTITY);

        assert!(!tracker.updated(2, Mat4::IDENTITY));
        // mutation after the frame's first query shows up next frame
        let moved = Mat4::from_translation(Vec3::Y);
        assert!(!tracker.updated(2, moved));
        assert!(tracker.updated(3, moved));
    }

    #[test]
    fn test_reset() {
        let mut tracker = ChangeTracker::new();
        tracker.updated(5, Mat4::IDENTITY);
        tracker.reset();

        assert_eq!(tracker.last_frame(), None);
        assert!(tracker.updated(5, Mat4::IDENTITY));
    }
}
