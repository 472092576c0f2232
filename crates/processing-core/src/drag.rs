//! Pointer-driven repositioning of layers.
//!
//! A press inside a layer's box (top-most layer wins) starts a drag and
//! records where inside the layer the pointer grabbed it. Every subsequent
//! move writes the new position straight into the model, clamped so the
//! layer stays inside the surface. Release and leaving the surface both end
//! the drag.

use weever_layer_model::{clamp, LayerId, LayerModel, LayerPatch, Position, Size};

/// Drag state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        layer: LayerId,
        /// Press point minus layer position at press time.
        grab_offset: (f64, f64),
    },
}

/// Translates pointer input into layer position updates.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

/// Position for a layer dragged to `pointer`, kept within
/// `[0, surface - layer_size]` on both axes.
pub fn drag_target(pointer: Position, grab_offset: (f64, f64), layer_size: Size, surface: Size) -> Position {
    Position::new(
        clamp(pointer.x - grab_offset.0, 0.0, surface.width - layer_size.width),
        clamp(pointer.y - grab_offset.1, 0.0, surface.height - layer_size.height),
    )
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Layer currently being dragged.
    pub fn active_layer(&self) -> Option<LayerId> {
        match self.state {
            DragState::Dragging { layer, .. } => Some(layer),
            DragState::Idle => None,
        }
    }

    /// Press at `point`. Starts dragging the top-most layer under the
    /// pointer, if any, and returns it.
    pub fn pointer_down(&mut self, point: Position, model: &LayerModel) -> Option<LayerId> {
        let Some(id) = model.hit_test(point.x, point.y) else {
            self.state = DragState::Idle;
            return None;
        };
        let layer = model.get(id)?;
        let grab_offset = point.offset_from(&layer.position);
        tracing::debug!(layer_id = %id, dx = grab_offset.0, dy = grab_offset.1, "Drag started");
        self.state = DragState::Dragging {
            layer: id,
            grab_offset,
        };
        Some(id)
    }

    /// Pointer moved to `point` within a surface of size `surface`.
    ///
    /// While dragging, updates the layer's position in `model` and returns
    /// the applied position. Idle moves, and moves whose layer has since
    /// been removed, return `None` (the latter also ends the drag).
    pub fn pointer_move(
        &mut self,
        point: Position,
        surface: Size,
        model: &mut LayerModel,
    ) -> Option<Position> {
        let DragState::Dragging { layer, grab_offset } = self.state else {
            return None;
        };
        let Some(size) = model.get(layer).map(|l| l.size) else {
            tracing::debug!(layer_id = %layer, "Dragged layer disappeared; ending drag");
            self.state = DragState::Idle;
            return None;
        };

        let target = drag_target(point, grab_offset, size, surface);
        model.update_layer(layer, LayerPatch::position(target));
        Some(target)
    }

    /// Pointer released.
    pub fn pointer_up(&mut self) {
        if let DragState::Dragging { layer, .. } = self.state {
            tracing::debug!(layer_id = %layer, "Drag ended");
        }
        self.state = DragState::Idle;
    }

    /// Pointer left the interactive surface; same as a release.
    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weever_layer_model::{ContentHandle, LayerKind, LayerPlacement};

    fn logo_at(model: &mut LayerModel, x: f64, y: f64, w: f64, h: f64) -> LayerId {
        model.add_layer(
            LayerKind::Logo {
                content: ContentHandle(1),
                opacity: 100,
            },
            LayerPlacement::new(x, y, w, h),
        )
    }

    #[test]
    fn press_outside_stays_idle() {
        let mut model = LayerModel::new();
        logo_at(&mut model, 20.0, 20.0, 120.0, 120.0);
        let mut drag = DragController::new();
        assert!(drag.pointer_down(Position::new(500.0, 500.0), &model).is_none());
        assert_eq!(drag.state(), DragState::Idle);
        assert!(drag
            .pointer_move(Position::new(10.0, 10.0), Size::new(960.0, 540.0), &mut model)
            .is_none());
    }

    #[test]
    fn move_keeps_grab_offset() {
        let mut model = LayerModel::new();
        let id = logo_at(&mut model, 20.0, 20.0, 120.0, 120.0);
        let mut drag = DragController::new();
        drag.pointer_down(Position::new(50.0, 60.0), &model);
        let pos = drag
            .pointer_move(Position::new(250.0, 160.0), Size::new(960.0, 540.0), &mut model)
            .unwrap();
        assert_eq!(pos, Position::new(220.0, 120.0));
        assert_eq!(model.get(id).unwrap().position, pos);
    }

    #[test]
    fn move_clamps_to_surface() {
        let mut model = LayerModel::new();
        let id = logo_at(&mut model, 20.0, 20.0, 120.0, 120.0);
        let mut drag = DragController::new();
        drag.pointer_down(Position::new(30.0, 30.0), &model);
        let surface = Size::new(960.0, 540.0);
        drag.pointer_move(Position::new(5000.0, -300.0), surface, &mut model);
        assert_eq!(model.get(id).unwrap().position, Position::new(840.0, 0.0));
    }

    #[test]
    fn leave_ends_drag() {
        let mut model = LayerModel::new();
        let id = logo_at(&mut model, 0.0, 0.0, 50.0, 50.0);
        let mut drag = DragController::new();
        drag.pointer_down(Position::new(10.0, 10.0), &model);
        drag.pointer_leave();
        assert!(!drag.is_dragging());
        drag.pointer_move(Position::new(300.0, 300.0), Size::new(960.0, 540.0), &mut model);
        assert_eq!(model.get(id).unwrap().position, Position::new(0.0, 0.0));
    }

    #[test]
    fn removed_layer_ends_drag() {
        let mut model = LayerModel::new();
        let id = logo_at(&mut model, 0.0, 0.0, 50.0, 50.0);
        let mut drag = DragController::new();
        drag.pointer_down(Position::new(10.0, 10.0), &model);
        model.remove_layer(id);
        assert!(drag
            .pointer_move(Position::new(30.0, 30.0), Size::new(960.0, 540.0), &mut model)
            .is_none());
        assert!(!drag.is_dragging());
    }

    #[test]
    fn oversized_layer_pins_to_origin() {
        let target = drag_target(
            Position::new(400.0, 400.0),
            (0.0, 0.0),
            Size::new(2000.0, 2000.0),
            Size::new(960.0, 540.0),
        );
        assert_eq!(target, Position::new(0.0, 0.0));
    }
}
