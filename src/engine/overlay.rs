use egui::epaint::Shadow;

use super::config::TOOLBAR_HEIGHT;
use super::traversal::{Command, RunState, SearchMode};

const BUTTON_SIZE: egui::Vec2 = egui::vec2(160.0, 56.0);
const BUTTON_GAP: f32 = 12.0;

pub struct StatusLine {
    pub mode: SearchMode,
    pub run_state: RunState,
    pub steps: u32,
    pub visited: usize,
    /// Final path length in cells; `None` until the target is found.
    pub path_len: Option<usize>,
    pub ticks_per_second: u32,
}

impl StatusLine {
    pub fn state_text(&self) -> &'static str {
        match (self.run_state, self.path_len) {
            (RunState::Running, _) => "searching",
            (RunState::Found, Some(0)) => "found (start cut off)",
            (RunState::Found, _) => "found",
            (RunState::Exhausted, _) => "no path",
        }
    }
}

/// Toolbar (DFS / BFS / Reset) plus an optional F3 status panel, drawn with egui
/// on top of the grid pass.
pub struct Controls {
    pub status_visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Controls {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::light();
        visuals.window_shadow = Shadow::NONE;
        visuals.panel_fill = egui::Color32::from_gray(51);
        egui_ctx.set_visuals(visuals);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            status_visible: true,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_status(&mut self) {
        self.status_visible = !self.status_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Run one egui frame and record it into `encoder`. Returns the commands
    /// for any button pressed this frame.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        status: &StatusLine,
    ) -> Vec<Command> {
        let raw_input = self.egui_state.take_egui_input(window);
        let mut commands = Vec::new();
        let status_visible = self.status_visible;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::TopBottomPanel::top(egui::Id::new("toolbar"))
                .exact_height(TOOLBAR_HEIGHT as f32)
                .show(ctx, |ui| {
                    ui.horizontal_centered(|ui| {
                        ui.spacing_mut().item_spacing.x = BUTTON_GAP;
                        let total = BUTTON_SIZE.x * 3.0 + BUTTON_GAP * 2.0;
                        ui.add_space(((ui.available_width() - total) / 2.0).max(0.0));

                        for mode in [SearchMode::Dfs, SearchMode::Bfs] {
                            if toolbar_button(ui, &mode.to_string(), status.mode == mode) {
                                commands.push(Command::SetMode(mode));
                            }
                        }
                        if toolbar_button(ui, "Reset", false) {
                            commands.push(Command::Reset);
                        }
                    });
                });

            // ── F3: status panel over the bottom-left of the canvas ──────────
            if status_visible {
                egui::Area::new(egui::Id::new("status"))
                    .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                let text = |s: String| {
                                    egui::RichText::new(s)
                                        .monospace()
                                        .color(egui::Color32::WHITE)
                                };
                                ui.label(text(format!(
                                    "{}  {}",
                                    status.mode,
                                    status.state_text()
                                )));
                                ui.label(text(format!(
                                    "Steps: {}  Visited: {}",
                                    status.steps, status.visited
                                )));
                                if let Some(len) = status.path_len.filter(|&l| l > 0) {
                                    ui.label(text(format!("Path: {len} cells")));
                                }
                                ui.label(text(format!("Ticks/s: {}", status.ticks_per_second)));
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        commands
    }
}

fn toolbar_button(ui: &mut egui::Ui, label: &str, selected: bool) -> bool {
    let button = egui::Button::new(egui::RichText::new(label).size(20.0))
        .rounding(8.0)
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_gray(0x77)))
        .fill(egui::Color32::from_gray(0xf4))
        .selected(selected);
    ui.add_sized(BUTTON_SIZE, button).clicked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(run_state: RunState, path_len: Option<usize>) -> StatusLine {
        StatusLine {
            mode: SearchMode::Bfs,
            run_state,
            steps: 0,
            visited: 1,
            path_len,
            ticks_per_second: 20,
        }
    }

    #[test]
    fn test_state_text() {
        assert_eq!(status(RunState::Running, None).state_text(), "searching");
        assert_eq!(status(RunState::Found, Some(9)).state_text(), "found");
        assert_eq!(status(RunState::Found, Some(0)).state_text(), "found (start cut off)");
        assert_eq!(status(RunState::Exhausted, None).state_text(), "no path");
    }
}
