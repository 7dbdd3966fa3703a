// Grid model: the fixed cols x rows matrix of cells the searches run over.
//
// Cells are addressed by their flat index `i + j * cols`. The grid owns every
// cell; the traversal engine and the renderer only ever hold indices.

use glam::UVec2;
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// A grid needs room for a start and a distinct target.
    #[error("grid {cols}x{rows} is too small: need at least two cells")]
    TooSmall { cols: u32, rows: u32 },
}

// ============================================================================
// CELL
// ============================================================================

/// One grid position and all of its flags.
///
/// Transient flags (`visited`, `backtrack`, `on_final_path`) belong to the
/// current run. The `*_mark` flags accumulate earlier runs' footprints and are
/// only cleared by a full reset.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub i: u32,
    pub j: u32,

    pub obstacle: bool,
    pub is_start: bool,
    pub is_target: bool,

    pub visited: bool,
    pub backtrack: bool,
    pub on_final_path: bool,

    pub visited_mark: bool,
    pub backtrack_mark: bool,
    pub path_mark: bool,
}

impl Cell {
    fn new(i: u32, j: u32) -> Self {
        Self { i, j, ..Default::default() }
    }

    /// OR the run flags into the persistent marks, then clear the run flags.
    fn fold_run_flags(&mut self) {
        self.visited_mark |= self.visited;
        self.backtrack_mark |= self.backtrack;
        self.path_mark |= self.on_final_path;

        self.visited = false;
        self.backtrack = false;
        self.on_final_path = false;
    }

    fn clear_footprints(&mut self) {
        self.visited = false;
        self.backtrack = false;
        self.on_final_path = false;
        self.visited_mark = false;
        self.backtrack_mark = false;
        self.path_mark = false;
    }
}

// ============================================================================
// GRID MODEL
// ============================================================================

pub struct GridModel {
    cells: Vec<Cell>,
    cols: u32,
    rows: u32,
    start: usize,
    target: usize,
}

impl GridModel {
    /// Build the grid with the start fixed at (0, 0) and a random target.
    pub fn new(cols: u32, rows: u32, rng: &mut impl Rng) -> Result<Self, GridError> {
        let len = (cols as usize) * (rows as usize);
        if len < 2 {
            return Err(GridError::TooSmall { cols, rows });
        }

        let mut cells = Vec::with_capacity(len);
        for j in 0..rows {
            for i in 0..cols {
                cells.push(Cell::new(i, j));
            }
        }

        let mut grid = Self { cells, cols, rows, start: 0, target: 0 };
        grid.cells[grid.start].is_start = true;

        // Two or more cells and no obstacles yet, so a free cell always exists.
        let target = grid
            .pick_random_free_cell(&[grid.start], rng)
            .ok_or(GridError::TooSmall { cols, rows })?;
        grid.set_target(target);

        Ok(grid)
    }

    pub fn len(&self) -> usize { self.cells.len() }
    pub fn start(&self) -> usize { self.start }
    pub fn target(&self) -> usize { self.target }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    pub(crate) fn cell_mut(&mut self, idx: usize) -> &mut Cell {
        &mut self.cells[idx]
    }

    /// Flat index of `(i, j)`, or `None` when the coordinate is off the grid.
    pub fn index(&self, i: i32, j: i32) -> Option<usize> {
        if i < 0 || j < 0 || i as u32 >= self.cols || j as u32 >= self.rows {
            return None;
        }
        Some(i as usize + j as usize * self.cols as usize)
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> UVec2 {
        let c = &self.cells[idx];
        UVec2::new(c.i, c.j)
    }

    #[inline]
    pub fn is_walkable(&self, idx: usize) -> bool {
        !self.cells[idx].obstacle
    }

    /// Orthogonal in-bounds neighbours in the fixed order up, right, down, left.
    ///
    /// The order is the tie-break source for BFS expansion and for the DFS
    /// candidate list; it never affects which cells are reachable.
    pub fn neighbors_of(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let (i, j) = (self.cells[idx].i as i32, self.cells[idx].j as i32);
        [(i, j - 1), (i + 1, j), (i, j + 1), (i - 1, j)]
            .into_iter()
            .filter_map(move |(ni, nj)| self.index(ni, nj))
    }

    /// Flip the obstacle flag on `idx`.
    ///
    /// Start, target and the engine's current cell are edit-protected: the
    /// call is a silent no-op for them. Returns whether anything changed.
    pub fn toggle_obstacle(&mut self, idx: usize, current: usize) -> bool {
        if idx == self.start || idx == self.target || idx == current {
            debug!("Edit rejected: cell {} is protected", self.coords(idx));
            return false;
        }
        let cell = &mut self.cells[idx];
        cell.obstacle = !cell.obstacle;
        true
    }

    /// Uniform choice among non-obstacle cells not listed in `excluding`.
    ///
    /// Collects the eligible set first, so this always terminates; `None`
    /// means every cell is walled or excluded.
    pub fn pick_random_free_cell(&self, excluding: &[usize], rng: &mut impl Rng) -> Option<usize> {
        let eligible: Vec<usize> = (0..self.cells.len())
            .filter(|idx| !self.cells[*idx].obstacle && !excluding.contains(idx))
            .collect();
        eligible.choose(rng).copied()
    }

    /// Move the target role to `idx`. Callers guarantee `idx` is free and not the start.
    pub fn set_target(&mut self, idx: usize) {
        debug_assert!(idx != self.start && !self.cells[idx].obstacle);
        self.cells[self.target].is_target = false;
        self.target = idx;
        self.cells[idx].is_target = true;
    }

    /// Fold every cell's run flags into its persistent marks and clear the run flags.
    pub fn fold_run_flags(&mut self) {
        for cell in &mut self.cells {
            cell.fold_run_flags();
        }
    }

    /// Clear run flags and persistent marks everywhere. Obstacles stay.
    pub fn clear_footprints(&mut self) {
        for cell in &mut self.cells {
            cell.clear_footprints();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn grid(cols: u32, rows: u32) -> GridModel {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        GridModel::new(cols, rows, &mut rng).unwrap()
    }

    #[test]
    fn test_too_small_grid_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            GridModel::new(1, 1, &mut rng).err(),
            Some(GridError::TooSmall { cols: 1, rows: 1 })
        );
        assert!(GridModel::new(2, 1, &mut rng).is_ok());
    }

    #[test]
    fn test_start_is_origin_and_target_differs() {
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let g = GridModel::new(5, 5, &mut rng).unwrap();
            assert_eq!(g.start(), 0);
            assert_eq!(g.coords(g.start()), UVec2::ZERO);
            assert_ne!(g.target(), g.start());
            assert!(g.cell(g.target()).is_target);
            assert_eq!(g.cells().iter().filter(|c| c.is_target).count(), 1);
            assert_eq!(g.cells().iter().filter(|c| c.is_start).count(), 1);
        }
    }

    #[test]
    fn test_index_out_of_bounds() {
        let g = grid(4, 3);
        assert_eq!(g.index(0, 0), Some(0));
        assert_eq!(g.index(3, 2), Some(11));
        assert_eq!(g.index(-1, 0), None);
        assert_eq!(g.index(0, -1), None);
        assert_eq!(g.index(4, 0), None);
        assert_eq!(g.index(0, 3), None);
    }

    #[test]
    fn test_neighbor_order_and_bounds() {
        let g = grid(3, 3);
        let centre = g.index(1, 1).unwrap();
        let n: Vec<UVec2> = g.neighbors_of(centre).map(|idx| g.coords(idx)).collect();
        // up, right, down, left
        assert_eq!(
            n,
            vec![UVec2::new(1, 0), UVec2::new(2, 1), UVec2::new(1, 2), UVec2::new(0, 1)]
        );

        // Corner: only right and down exist.
        let n: Vec<UVec2> = g.neighbors_of(0).map(|idx| g.coords(idx)).collect();
        assert_eq!(n, vec![UVec2::new(1, 0), UVec2::new(0, 1)]);
    }

    #[test]
    fn test_toggle_protects_roles() {
        let mut g = grid(4, 4);
        let start = g.start();
        let target = g.target();
        let current = (0..g.len()).find(|&i| i != start && i != target).unwrap();

        assert!(!g.toggle_obstacle(start, current));
        assert!(!g.toggle_obstacle(target, current));
        assert!(!g.toggle_obstacle(current, current));
        assert!(g.cells().iter().all(|c| !c.obstacle));

        let free = (0..g.len())
            .find(|&i| i != start && i != target && i != current)
            .unwrap();
        assert!(g.toggle_obstacle(free, current));
        assert!(g.cell(free).obstacle);
        assert!(g.toggle_obstacle(free, current));
        assert!(!g.cell(free).obstacle);
    }

    #[test]
    fn test_pick_random_free_cell_respects_exclusions() {
        let mut g = grid(3, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        g.cell_mut(1).obstacle = true;
        for _ in 0..20 {
            assert_eq!(g.pick_random_free_cell(&[0], &mut rng), Some(2));
        }
        assert_eq!(g.pick_random_free_cell(&[0, 2], &mut rng), None);
    }

    #[test]
    fn test_pick_random_free_cell_reaches_every_eligible_cell() {
        let mut g = grid(4, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        g.cell_mut(5).obstacle = true;

        let mut counts = [0usize; 8];
        for _ in 0..800 {
            let idx = g.pick_random_free_cell(&[0, 3], &mut rng).unwrap();
            counts[idx] += 1;
        }

        for (idx, &count) in counts.iter().enumerate() {
            if matches!(idx, 0 | 3 | 5) {
                assert_eq!(count, 0, "cell {idx} is not eligible");
            } else {
                // Five eligible cells, ~160 picks each.
                assert!(count > 80, "cell {idx} picked only {count} times");
            }
        }
    }

    #[test]
    fn test_fold_is_monotonic_and_clears_run_flags() {
        let mut g = grid(3, 3);
        g.cell_mut(4).visited = true;
        g.cell_mut(5).backtrack = true;
        g.fold_run_flags();
        assert!(g.cell(4).visited_mark && !g.cell(4).visited);
        assert!(g.cell(5).backtrack_mark && !g.cell(5).backtrack);

        // A second fold with nothing set keeps the marks.
        g.fold_run_flags();
        assert!(g.cell(4).visited_mark);
        assert!(g.cell(5).backtrack_mark);

        g.cell_mut(3).obstacle = true;
        g.clear_footprints();
        assert!(!g.cell(4).visited_mark);
        assert!(!g.cell(5).backtrack_mark);
        assert!(g.cell(3).obstacle);
    }
}
