// Input state tracking for keyboard shortcuts and canvas clicks
// Abstracts winit events into per-frame engine commands

use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::traversal::{Command, SearchMode};

pub struct InputState {
    // Mouse, in logical pixels
    pub mouse_position: (f32, f32),
    scale_factor: f64,

    /// Commands gathered since the last `take_commands()`.
    pending: Vec<Command>,

    // Canvas placement, used to map clicks to cells
    canvas_top: f32,
    cell_size: f32,
}

impl InputState {
    pub fn new(scale_factor: f64, canvas_top: f32, cell_size: f32) -> Self {
        Self {
            mouse_position: (0.0, 0.0),
            scale_factor,
            pending: Vec::new(),
            canvas_top,
            cell_size,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// `ui_captured` is true when the toolbar already consumed the event.
    pub fn process_event(&mut self, event: &WindowEvent, ui_captured: bool) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if ui_captured || event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    if let Some(command) = key_command(key) {
                        self.pending.push(command);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(self.scale_factor);
                self.mouse_position = (logical.x, logical.y);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !ui_captured => {
                let (i, j) = cell_at(self.mouse_position, self.canvas_top, self.cell_size);
                self.pending.push(Command::ToggleObstacle { i, j });
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
            }
            _ => {}
        }
    }

    /// Queue a command from another source (the toolbar buttons).
    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Drain commands in the order they arrived.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }
}

/// Keyboard shortcuts mirroring the toolbar buttons.
pub fn key_command(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::KeyD => Some(Command::SetMode(SearchMode::Dfs)),
        KeyCode::KeyB => Some(Command::SetMode(SearchMode::Bfs)),
        KeyCode::KeyR => Some(Command::Reset),
        _ => None,
    }
}

/// Grid coordinate under a logical-pixel position. May be off-grid
/// (negative or too large); the engine ignores those.
pub fn cell_at(pos: (f32, f32), canvas_top: f32, cell_size: f32) -> (i32, i32) {
    let i = (pos.0 / cell_size).floor() as i32;
    let j = ((pos.1 - canvas_top) / cell_size).floor() as i32;
    (i, j)
}
