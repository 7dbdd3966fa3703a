// Cell view: turns engine state into coloured quads for the instanced pipeline.
//
// Layering, bottom to top:
//   grid line → background → persistent marks → run marks → roles
// An obstacle occludes everything except the grid line.

use glam::Vec2;
use rand::Rng;

use super::grid::Cell;
use super::traversal::TraversalEngine;

// ============================================================================
// INSTANCE DATA (per quad)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    /// Quad centre in canvas pixels.
    pub center: [f32; 2],
    /// Side length in canvas pixels.
    pub size: f32,
    _padding: f32, // Align color to 16 bytes
    /// Linear RGBA, straight alpha.
    pub color: [f32; 4],
}

impl InstanceData {
    pub fn new(center: Vec2, size: f32, color: Rgba8) -> Self {
        Self {
            center: center.to_array(),
            size,
            _padding: 0.0,
            color: color.to_linear(),
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Center (location 1)
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // Size (location 2)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
                // Color (location 3)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// ============================================================================
// COLOURS
// ============================================================================

/// sRGB colour with straight alpha, as authored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgba8(pub u8, pub u8, pub u8, pub u8);

impl Rgba8 {
    /// Linear RGB for an sRGB surface; alpha stays linear.
    pub fn to_linear(self) -> [f32; 4] {
        fn channel(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
        }
        [channel(self.0), channel(self.1), channel(self.2), self.3 as f32 / 255.0]
    }
}

pub const BACKGROUND: Rgba8 = Rgba8(51, 51, 51, 255);
pub const GRID_LINE: Rgba8 = Rgba8(70, 70, 70, 255);
pub const WALL: Rgba8 = Rgba8(150, 75, 45, 255);

pub const VISITED_MARK: Rgba8 = Rgba8(0, 128, 128, 160);
pub const BACKTRACK_MARK: Rgba8 = Rgba8(255, 255, 255, 90);
pub const PATH_MARK: Rgba8 = Rgba8(255, 255, 255, 180);

pub const VISITED: Rgba8 = Rgba8(0, 128, 128, 255);
pub const BACKTRACK: Rgba8 = Rgba8(255, 255, 255, 120);
pub const FINAL_PATH: Rgba8 = Rgba8(255, 255, 255, 230);

pub const TARGET: Rgba8 = Rgba8(220, 30, 60, 255);
pub const START: Rgba8 = Rgba8(0, 200, 0, 255);
pub const CAT: Rgba8 = Rgba8(255, 170, 40, 255);

/// Fraction of a cell the search-head marker covers.
const CAT_SCALE: f32 = 0.9;
/// Fraction of a cell the target marker covers.
const TARGET_SCALE: f32 = 0.8;

// ============================================================================
// CELL VIEW
// ============================================================================

/// Everything the renderer needs to know about one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellView {
    pub obstacle: bool,
    pub is_start: bool,
    pub is_target: bool,
    /// Search head, only shown while the run has not found the target.
    pub is_current: bool,
    pub visited: bool,
    pub backtrack: bool,
    pub on_final_path: bool,
    pub visited_mark: bool,
    pub backtrack_mark: bool,
    pub path_mark: bool,
}

impl CellView {
    pub fn new(cell: &Cell, is_current: bool) -> Self {
        Self {
            obstacle: cell.obstacle,
            is_start: cell.is_start,
            is_target: cell.is_target,
            is_current,
            visited: cell.visited,
            backtrack: cell.backtrack,
            on_final_path: cell.on_final_path,
            visited_mark: cell.visited_mark,
            backtrack_mark: cell.backtrack_mark,
            path_mark: cell.path_mark,
        }
    }
}

/// One colour layer of a cell, as a fraction of the cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub color: Rgba8,
    pub scale: f32,
}

impl Layer {
    fn full(color: Rgba8) -> Self {
        Self { color, scale: 1.0 }
    }
}

/// Colour layers for one cell above its background, bottom first.
pub fn cell_layers(view: &CellView) -> Vec<Layer> {
    if view.obstacle {
        return vec![Layer::full(WALL)];
    }

    let mut layers = Vec::new();
    let marks = [
        (view.visited_mark, VISITED_MARK),
        (view.backtrack_mark, BACKTRACK_MARK),
        (view.path_mark, PATH_MARK),
        (view.visited, VISITED),
        (view.backtrack, BACKTRACK),
        (view.on_final_path, FINAL_PATH),
    ];
    layers.extend(marks.into_iter().filter(|(on, _)| *on).map(|(_, c)| Layer::full(c)));

    if view.is_target {
        layers.push(Layer { color: TARGET, scale: TARGET_SCALE });
    }
    if view.is_start {
        layers.push(Layer::full(START));
    }
    if view.is_current {
        layers.push(Layer { color: CAT, scale: CAT_SCALE });
    }
    layers
}

/// Render state of every cell, in grid order.
pub fn cell_views<R: Rng>(engine: &TraversalEngine<R>) -> impl Iterator<Item = CellView> + '_ {
    let current = (!engine.found()).then_some(engine.current());
    engine
        .grid()
        .cells()
        .iter()
        .enumerate()
        .map(move |(idx, cell)| CellView::new(cell, current == Some(idx)))
}

/// Build the instance list for the whole canvas. `origin` is the canvas
/// top-left in window pixels.
pub fn build_instances<R: Rng>(
    engine: &TraversalEngine<R>,
    cell_size: f32,
    origin: Vec2,
) -> Vec<InstanceData> {
    let grid = engine.grid();
    let mut instances = Vec::with_capacity(grid.len() * 4);

    for (idx, view) in cell_views(engine).enumerate() {
        let xy = grid.coords(idx).as_vec2();
        let center = origin + (xy + Vec2::splat(0.5)) * cell_size;

        instances.push(InstanceData::new(center, cell_size, GRID_LINE));
        // One-pixel inset leaves the grid line visible around the cell.
        let inner = cell_size - 2.0;
        instances.push(InstanceData::new(center, inner, BACKGROUND));

        for layer in cell_layers(&view) {
            instances.push(InstanceData::new(center, inner * layer.scale, layer.color));
        }
    }
    instances
}
