//! Drag-to-reorder over a clip track.
//!
//! `idle -> dragging -> (dropped on item | dropped on container | cancelled)`.
//! Drops never touch the caller's list: they hand back a new ordering for
//! the owner to adopt. A clip dragged out of the buffer onto a stitched
//! track is a [`Transfer`] instead.
use tracing::warn;

use crate::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSource {
    pub track: Track,
    pub index: usize,
}

/// What the pointer is over while dragging. Item and container hover are
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropHover {
    #[default]
    None,
    Item { track: Track, index: usize },
    Container(Track),
}

/// Buffer clip at `from` dropped onto `to`, before index `at` or at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: usize,
    pub to: Track,
    pub at: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReorderDrag {
    source: Option<DragSource>,
    hover: DropHover,
}

impl ReorderDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, track: Track, index: usize) {
        self.source = Some(DragSource { track, index });
        self.hover = DropHover::None;
    }

    pub fn is_dragging(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<DragSource> {
        self.source
    }

    pub fn hover(&self) -> DropHover {
        self.hover
    }

    pub fn hover_item(&mut self, track: Track, index: usize) {
        self.hover = DropHover::Item { track, index };
    }

    pub fn leave_item(&mut self) {
        if matches!(self.hover, DropHover::Item { .. }) {
            self.hover = DropHover::None;
        }
    }

    /// The buffer has no container drop target.
    pub fn hover_container(&mut self, track: Track) {
        if track != Track::Buffer {
            self.hover = DropHover::Container(track);
        }
    }

    pub fn leave_container(&mut self) {
        if matches!(self.hover, DropHover::Container(_)) {
            self.hover = DropHover::None;
        }
    }

    /// Drop onto the clip at `target`. The dragged clip ends up at index
    /// `target`. Returns `None` when there is nothing to reorder.
    pub fn drop_on_item<T: Clone>(&mut self, track: Track, target: usize, items: &[T]) -> Option<Vec<T>> {
        let source = self.source?;
        self.hover = DropHover::None;
        if source.track != track {
            warn!(from = %source.track, to = %track, "cross-track drop ignored");
            return None;
        }
        if source.index == target {
            return None;
        }
        move_item(items, source.index, target)
    }

    /// Drop onto empty space in the track: the dragged clip moves to the end.
    pub fn drop_on_container<T: Clone>(&mut self, track: Track, items: &[T]) -> Option<Vec<T>> {
        let source = self.source?;
        self.hover = DropHover::None;
        if track == Track::Buffer {
            return None;
        }
        if source.track != track {
            warn!(from = %source.track, to = %track, "cross-track drop ignored");
            return None;
        }
        move_item(items, source.index, items.len().saturating_sub(1))
    }

    /// Takes the drop as a buffer-to-track transfer when it is one. `target`
    /// is the clip dropped on, `None` for empty track space.
    pub fn take_transfer(&mut self, track: Track, target: Option<usize>) -> Option<Transfer> {
        let source = self.source?;
        if source.track != Track::Buffer || track == Track::Buffer {
            return None;
        }
        self.source = None;
        self.hover = DropHover::None;
        Some(Transfer {
            from: source.index,
            to: track,
            at: target,
        })
    }

    /// Ends the gesture whatever happened to it.
    pub fn end(&mut self) {
        self.source = None;
        self.hover = DropHover::None;
    }
}

/// Removes the element at `from` and reinserts it so that it sits at `to`.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Option<Vec<T>> {
    if from >= items.len() {
        return None;
    }
    let mut next = items.to_vec();
    let moved = next.remove(from);
    let to = to.min(next.len());
    next.insert(to, moved);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_on_item_forward_and_backward() {
        let items = vec!["a", "b", "c", "d"];
        let mut drag = ReorderDrag::new();

        drag.start(Track::Video, 0);
        drag.hover_item(Track::Video, 2);
        assert_eq!(drag.drop_on_item(Track::Video, 2, &items), Some(vec!["b", "c", "a", "d"]));
        drag.end();

        drag.start(Track::Video, 3);
        assert_eq!(drag.drop_on_item(Track::Video, 1, &items), Some(vec!["a", "d", "b", "c"]));
        drag.end();
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_drop_on_self_is_noop() {
        let items = vec![1, 2, 3];
        let mut drag = ReorderDrag::new();
        drag.start(Track::Video, 1);
        assert_eq!(drag.drop_on_item(Track::Video, 1, &items), None);
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_on_container_appends() {
        let items = vec!["a", "b", "c"];
        let mut drag = ReorderDrag::new();
        drag.start(Track::Audio, 0);
        drag.hover_container(Track::Audio);
        assert_eq!(drag.hover(), DropHover::Container(Track::Audio));
        assert_eq!(drag.drop_on_container(Track::Audio, &items), Some(vec!["b", "c", "a"]));
        assert_eq!(drag.hover(), DropHover::None);
    }

    #[test]
    fn test_hover_states_are_exclusive() {
        let mut drag = ReorderDrag::new();
        drag.start(Track::Video, 0);
        drag.hover_container(Track::Video);
        drag.hover_item(Track::Video, 1);
        assert_eq!(drag.hover(), DropHover::Item { track: Track::Video, index: 1 });
        drag.leave_container();
        assert_eq!(drag.hover(), DropHover::Item { track: Track::Video, index: 1 });
        drag.leave_item();
        assert_eq!(drag.hover(), DropHover::None);
    }

    #[test]
    fn test_cross_track_and_idle_drops() {
        let items = vec![1, 2];
        let mut drag = ReorderDrag::new();
        assert_eq!(drag.drop_on_item(Track::Video, 0, &items), None);
        drag.start(Track::Audio, 0);
        assert_eq!(drag.drop_on_item(Track::Video, 1, &items), None);
        drag.end();
        assert_eq!(drag.source(), None);
    }

    #[test]
    fn test_buffer_drops_become_transfers() {
        let mut drag = ReorderDrag::new();
        drag.start(Track::Buffer, 2);
        assert_eq!(drag.take_transfer(Track::Buffer, Some(0)), None);
        drag.hover_item(Track::Audio, 1);
        assert_eq!(
            drag.take_transfer(Track::Audio, Some(1)),
            Some(Transfer {
                from: 2,
                to: Track::Audio,
                at: Some(1)
            })
        );
        assert!(!drag.is_dragging());
        assert_eq!(drag.hover(), DropHover::None);

        drag.start(Track::Video, 0);
        assert_eq!(drag.take_transfer(Track::Audio, None), None);
        assert!(drag.is_dragging());
    }

    #[test]
    fn test_buffer_reorders_but_has_no_container() {
        let items = vec!["a", "b", "c"];
        let mut drag = ReorderDrag::new();
        drag.start(Track::Buffer, 0);
        drag.hover_container(Track::Buffer);
        assert_eq!(drag.hover(), DropHover::None);
        assert_eq!(drag.drop_on_container(Track::Buffer, &items), None);
        assert_eq!(drag.drop_on_item(Track::Buffer, 2, &items), Some(vec!["b", "c", "a"]));
    }

    #[test]
    fn test_move_item_preserves_relative_order() {
        let items: Vec<u32> = (0..6).collect();
        for from in 0..items.len() {
            for to in 0..items.len() {
                let moved = move_item(&items, from, to).unwrap();
                assert_eq!(moved[to], items[from]);
                let rest: Vec<u32> = moved.iter().copied().filter(|v| *v != items[from]).collect();
                let expected: Vec<u32> = items.iter().copied().filter(|v| *v != items[from]).collect();
                assert_eq!(rest, expected);
            }
        }
    }
}
