//! Interactive repositioning of a single panel.
//!
//! A [`DragSession`] lives for one pointer gesture. Each move places the
//! grabbed panel under the pointer and then pushes it out of every panel it
//! lands on, one neighbor at a time in index order. Overlaps with several
//! panels at once are not solved jointly: the last correction wins.

use crate::bounds::hit_test;
use crate::model::{Panel, Rect};
use crate::overlap::{overlap_depth, rects_overlap, separation_axis, Axis};
use glam::Vec2;
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        index: usize,
        /// Pointer position relative to the panel's top-left corner.
        grab_offset: Vec2,
    },
}

#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged_index(&self) -> Option<usize> {
        match self.state {
            DragState::Dragging { index, .. } => Some(index),
            DragState::Idle => None,
        }
    }

    /// Starts a drag if editing is enabled and `point` lands on a panel.
    /// Returns true when a panel was grabbed.
    pub fn pointer_down(&mut self, panels: &[Panel], point: Vec2, edit_enabled: bool) -> bool {
        if !edit_enabled {
            return false;
        }
        let Some(index) = hit_test(panels, point) else {
            return false;
        };
        let grab_offset = point - panels[index].position;
        debug!("[DRAG] grabbed {} at offset {:?}", panels[index].id, grab_offset);
        self.state = DragState::Dragging { index, grab_offset };
        true
    }

    /// Moves the grabbed panel toward `point`. Returns true when the panel
    /// was updated and the canvas needs a redraw.
    pub fn pointer_move(&mut self, panels: &mut [Panel], point: Vec2) -> bool {
        let DragState::Dragging { index, grab_offset } = self.state else {
            return false;
        };
        if index >= panels.len() {
            self.state = DragState::Idle;
            return false;
        }

        let candidate = place_candidate(panels, index, point - grab_offset);
        panels[index].set_position(candidate);
        true
    }

    pub fn pointer_up(&mut self) {
        if let DragState::Dragging { index, .. } = self.state {
            debug!("[DRAG] released panel #{}", index);
        }
        self.state = DragState::Idle;
    }

    pub fn pointer_left(&mut self) {
        self.pointer_up();
    }

    /// Drops the gesture without touching any panel, e.g. when the layout is reloaded.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

/// Clamped candidate position for panel `index`, pushed out of each
/// overlapping neighbor along the shallower axis.
pub fn place_candidate(panels: &[Panel], index: usize, wanted: Vec2) -> Vec2 {
    let size = panels[index].effective_size();
    let mut candidate = wanted.max(Vec2::ZERO);

    for (j, other) in panels.iter().enumerate() {
        if j == index {
            continue;
        }
        let rect = Rect::from_min_size(candidate, size);
        let obstacle = other.rect();
        if !rects_overlap(&rect, &obstacle) {
            continue;
        }

        let depth = overlap_depth(&rect, &obstacle);
        let center = rect.center();
        let obstacle_center = obstacle.center();
        match separation_axis(depth) {
            Axis::X => {
                if center.x < obstacle_center.x {
                    candidate.x = obstacle.left() - size.x;
                } else {
                    candidate.x = obstacle.right();
                }
            }
            Axis::Y => {
                if center.y < obstacle_center.y {
                    candidate.y = obstacle.top() - size.y;
                } else {
                    candidate.y = obstacle.bottom();
                }
            }
        }
        candidate = candidate.max(Vec2::ZERO);
    }

    candidate
}
