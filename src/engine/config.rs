// Demo constants and the small amount of runtime configuration we accept.
//
// Everything tunable at runtime comes from environment variables so the
// demo stays a zero-argument binary:
//   MAZE_SEED  u64 seed for target placement and DFS tie-breaks
//   MAZE_MODE  initial search mode, "dfs" or "bfs"

use log::warn;

use super::traversal::SearchMode;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Canvas width in logical pixels.
pub const CANVAS_WIDTH: u32 = 1000;
/// Canvas height in logical pixels.
pub const CANVAS_HEIGHT: u32 = 1000;
/// Side length of one grid cell in logical pixels (25x25 grid on the default canvas).
pub const CELL_SIZE: u32 = 40;
/// Height reserved above the canvas for the button bar.
pub const TOOLBAR_HEIGHT: u32 = 76;

/// Engine steps per second. The search advances exactly one step per tick.
pub const TICKS_PER_SECOND: u32 = 20;

pub const WINDOW_TITLE: &str = "Cat Maze Search (DFS / BFS)";

pub const SEED_ENV: &str = "MAZE_SEED";
pub const MODE_ENV: &str = "MAZE_MODE";

// ============================================================================
// RUNTIME CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub cols: u32,
    pub rows: u32,
    /// `None` = seed from OS entropy.
    pub seed: Option<u64>,
    pub initial_mode: SearchMode,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cols: CANVAS_WIDTH / CELL_SIZE,
            rows: CANVAS_HEIGHT / CELL_SIZE,
            seed: None,
            initial_mode: SearchMode::Dfs,
        }
    }
}

impl DemoConfig {
    /// Defaults overridden by `MAZE_SEED` / `MAZE_MODE`. Bad values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(SEED_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.seed = Some(seed),
                Err(e) => warn!("Ignoring {SEED_ENV}={raw:?}: {e}"),
            }
        }

        if let Some(raw) = lookup(MODE_ENV) {
            match raw.parse::<SearchMode>() {
                Ok(mode) => config.initial_mode = mode,
                Err(e) => warn!("Ignoring {MODE_ENV}={raw:?}: {e}"),
            }
        }

        config
    }

    /// Window inner size: the canvas plus the toolbar strip on top.
    pub fn window_size(&self) -> (u32, u32) {
        (
            self.cols * CELL_SIZE,
            self.rows * CELL_SIZE + TOOLBAR_HEIGHT,
        )
    }
}
