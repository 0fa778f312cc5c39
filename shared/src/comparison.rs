//! Before/after reveal slider.

/// Horizontal extent of the comparison container, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBounds {
    pub left: f64,
    pub width: f64,
}

/// Mouse and touch input folded into one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down { x: f64 },
    Move { x: f64 },
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderState {
    position: f64,
    dragging: bool,
}

impl Default for SliderState {
    fn default() -> Self {
        Self {
            position: Self::INITIAL_POSITION,
            dragging: false,
        }
    }
}

impl SliderState {
    pub const INITIAL_POSITION: f64 = 50.0;

    /// Percentage of the container, always within `[0, 100]`.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Applies one input event. Returns whether anything changed.
    pub fn handle(&mut self, input: PointerInput, bounds: ContainerBounds) -> bool {
        let before = *self;
        match input {
            PointerInput::Down { x } => {
                self.dragging = true;
                self.position = Self::position_for(x, bounds);
            }
            PointerInput::Move { x } if self.dragging => {
                self.position = Self::position_for(x, bounds);
            }
            PointerInput::Move { .. } => {}
            PointerInput::Up => self.dragging = false,
        }
        *self != before
    }

    pub fn position_for(client_x: f64, bounds: ContainerBounds) -> f64 {
        if !(bounds.width > 0.0) || client_x.is_nan() || bounds.left.is_nan() {
            return 0.0;
        }

        let x = (client_x - bounds.left).clamp(0.0, bounds.width);
        (x / bounds.width * 100.0).clamp(0.0, 100.0)
    }

    /// CSS `clip-path` showing the "before" image left of the boundary.
    pub fn clip_path(&self) -> String {
        let p = self.position;
        format!("polygon(0 0, {p}% 0, {p}% 100%, 0 100%)")
    }

    /// CSS `left` for the 4px-wide divider centred on the boundary.
    pub fn handle_offset(&self) -> String {
        format!("calc({}% - 2px)", self.position)
    }
}
