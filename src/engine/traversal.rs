// Steppable DFS / BFS over the grid model.
//
// One `advance_one_step` per tick moves the search head ("the cat") by at most
// one cell. Every user action (mode switch, obstacle edit, reset) restarts the
// run through `init_search`; the previous run's footprints survive as the
// grid's persistent marks unless the action is a full reset.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use super::grid::{GridError, GridModel};
use super::navigation::{self, FinalPath};

// ============================================================================
// MODES, STATES, COMMANDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Randomized backtracking depth-first search.
    Dfs,
    /// Breadth-first search, expanding neighbours up, right, down, left.
    Bfs,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Dfs => f.write_str("DFS"),
            SearchMode::Bfs => f.write_str("BFS"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown search mode {0:?} (expected \"dfs\" or \"bfs\")")]
pub struct UnknownMode(pub String);

impl FromStr for SearchMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dfs" => Ok(SearchMode::Dfs),
            "bfs" => Ok(SearchMode::Bfs),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Where the current run stands. `Found` and `Exhausted` are terminal until
/// the next `init_search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Found,
    Exhausted,
}

/// Discrete user actions relayed by the UI between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetMode(SearchMode),
    /// Grid coordinates; off-grid values are ignored.
    ToggleObstacle { i: i32, j: i32 },
    Reset,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct TraversalEngine<R: Rng = ChaCha8Rng> {
    grid: GridModel,
    /// Target placement and DFS tie-breaks.
    rng: R,

    mode: SearchMode,
    current: usize,
    found: bool,

    // Frontier: only the one matching `mode` is in use during a run.
    stack: Vec<usize>,
    queue: VecDeque<usize>,
    /// BFS search tree for the current run. `None` marks the run's root.
    parents: HashMap<usize, Option<usize>>,

    /// Steps that changed state in the current run.
    steps: u32,
    final_path: Option<FinalPath>,
}

impl<R: Rng> TraversalEngine<R> {
    /// Build a `cols x rows` grid and start the first run from the start cell.
    pub fn new(cols: u32, rows: u32, mode: SearchMode, mut rng: R) -> Result<Self, GridError> {
        let grid = GridModel::new(cols, rows, &mut rng)?;
        let start = grid.start();
        info!(
            "Grid {}x{} ready: start {}, target {}",
            cols,
            rows,
            grid.coords(start),
            grid.coords(grid.target())
        );

        let mut engine = Self {
            grid,
            rng,
            mode,
            current: start,
            found: false,
            stack: Vec::new(),
            queue: VecDeque::new(),
            parents: HashMap::new(),
            steps: 0,
            final_path: None,
        };
        engine.init_search(mode, false);
        Ok(engine)
    }

    pub fn grid(&self) -> &GridModel { &self.grid }
    pub fn mode(&self) -> SearchMode { self.mode }
    pub fn current(&self) -> usize { self.current }
    pub fn found(&self) -> bool { self.found }
    pub fn steps(&self) -> u32 { self.steps }

    /// Final path of the current run; `None` until the target has been found.
    pub fn final_path(&self) -> Option<&FinalPath> {
        self.final_path.as_ref()
    }

    pub fn visited_count(&self) -> usize {
        self.grid.cells().iter().filter(|c| c.visited).count()
    }

    pub fn run_state(&self) -> RunState {
        if self.found {
            return RunState::Found;
        }
        let exhausted = match self.mode {
            SearchMode::Bfs => self.queue.is_empty(),
            SearchMode::Dfs => self.stack.is_empty() && self.dfs_candidates().is_empty(),
        };
        if exhausted { RunState::Exhausted } else { RunState::Running }
    }

    /// End the current run and start a new one.
    ///
    /// Run flags are folded into persistent marks, the frontier is cleared,
    /// and the head either stays where it is (`continue_from_current`) or
    /// returns to the start cell.
    pub fn init_search(&mut self, mode: SearchMode, continue_from_current: bool) {
        self.grid.fold_run_flags();

        self.stack.clear();
        self.queue.clear();
        self.parents.clear();
        self.found = false;
        self.steps = 0;
        self.final_path = None;
        self.mode = mode;

        if !continue_from_current {
            self.current = self.grid.start();
        }
        self.grid.cell_mut(self.current).visited = true;

        // DFS fills its stack lazily while stepping.
        if mode == SearchMode::Bfs {
            self.queue.push_back(self.current);
            self.parents.insert(self.current, None);
        }

        debug!(
            "{} run started at {} (continue: {})",
            mode,
            self.grid.coords(self.current),
            continue_from_current
        );
    }

    /// Advance the search by one step. Returns whether anything changed.
    ///
    /// A no-op once the target is found or the frontier is exhausted.
    pub fn advance_one_step(&mut self) -> bool {
        if self.found {
            return false;
        }

        let moved = match self.mode {
            SearchMode::Dfs => self.step_dfs(),
            SearchMode::Bfs => self.step_bfs(),
        };
        if moved {
            self.steps += 1;
        }

        // Checked even when the head could not move: a run may start on the target.
        if self.current == self.grid.target() {
            self.found = true;
            info!("Target found ({}) after {} steps", self.mode, self.steps);
            self.compute_final_path();
            return true;
        }
        moved
    }

    /// Unvisited, walkable neighbours of the head, in neighbour order.
    fn dfs_candidates(&self) -> Vec<usize> {
        self.grid
            .neighbors_of(self.current)
            .filter(|&nb| {
                let cell = self.grid.cell(nb);
                !cell.visited && !cell.obstacle
            })
            .collect()
    }

    fn step_dfs(&mut self) -> bool {
        let candidates = self.dfs_candidates();
        if let Some(&next) = candidates.choose(&mut self.rng) {
            self.grid.cell_mut(next).visited = true;
            self.stack.push(self.current);
            self.current = next;
            true
        } else if let Some(prev) = self.stack.pop() {
            self.grid.cell_mut(self.current).backtrack = true;
            self.current = prev;
            true
        } else {
            false
        }
    }

    fn step_bfs(&mut self) -> bool {
        let Some(node) = self.queue.pop_front() else {
            return false;
        };
        self.current = node;

        // The target is never expanded; the caller ends the run on it.
        if node == self.grid.target() {
            return true;
        }

        let neighbors: Vec<usize> = self.grid.neighbors_of(node).collect();
        for nb in neighbors {
            let cell = self.grid.cell_mut(nb);
            if !cell.visited && !cell.obstacle {
                cell.visited = true;
                self.parents.insert(nb, Some(node));
                self.queue.push_back(nb);
            }
        }
        true
    }

    /// Mark the shortest start → target route under the current obstacles.
    ///
    /// Runs a fresh BFS that ignores the run's own frontier and flags, so the
    /// highlighted route is optimal whichever mode reached the target.
    pub fn compute_final_path(&mut self) -> &FinalPath {
        let (start, target) = (self.grid.start(), self.grid.target());
        let path = navigation::shortest_path(&self.grid, start, target);

        match &path {
            FinalPath::Route(cells) => {
                for &idx in cells {
                    let cell = self.grid.cell_mut(idx);
                    cell.on_final_path = true;
                    cell.path_mark = true;
                }
                info!("Final path: {} cells", cells.len());
            }
            FinalPath::Unreachable => {
                warn!("No path from start to target (blocked by walls)");
            }
        }

        self.final_path.insert(path)
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetMode(mode) => self.set_mode(mode),
            Command::ToggleObstacle { i, j } => {
                self.toggle_obstacle_at(i, j);
            }
            Command::Reset => self.reset(),
        }
    }

    /// Switch algorithm and continue from the head's current cell.
    pub fn set_mode(&mut self, mode: SearchMode) {
        info!("Switching to {} at {}", mode, self.grid.coords(self.current));
        self.init_search(mode, true);
    }

    /// Flip the obstacle at `(i, j)` and restart the run from the head.
    ///
    /// Off-grid coordinates and the start, target and current cells are
    /// ignored. Returns whether the layout changed.
    pub fn toggle_obstacle_at(&mut self, i: i32, j: i32) -> bool {
        let Some(idx) = self.grid.index(i, j) else {
            return false;
        };
        if !self.grid.toggle_obstacle(idx, self.current) {
            return false;
        }
        self.init_search(self.mode, true);
        true
    }

    /// Clear all footprints, re-roll the target and restart from the start cell.
    /// Obstacles are kept.
    pub fn reset(&mut self) {
        self.grid.clear_footprints();

        let start = self.grid.start();
        match self.grid.pick_random_free_cell(&[start], &mut self.rng) {
            Some(target) => self.grid.set_target(target),
            None => warn!("No free cell for a new target; keeping the old one"),
        }
        info!("Reset: new target {}", self.grid.coords(self.grid.target()));

        self.init_search(self.mode, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn engine(cols: u32, rows: u32, mode: SearchMode, seed: u64) -> TraversalEngine {
        TraversalEngine::new(cols, rows, mode, ChaCha8Rng::seed_from_u64(seed)).unwrap()
    }

    /// Put the target at `(i, j)` and restart from the start cell.
    fn retarget(e: &mut TraversalEngine, i: i32, j: i32) {
        let idx = e.grid.index(i, j).unwrap();
        e.grid.set_target(idx);
        e.init_search(e.mode, false);
    }

    fn wall(e: &mut TraversalEngine, i: i32, j: i32) {
        let idx = e.grid.index(i, j).unwrap();
        e.grid.cell_mut(idx).obstacle = true;
    }

    fn run_to_end(e: &mut TraversalEngine, limit: usize) {
        for _ in 0..limit {
            if !e.advance_one_step() {
                return;
            }
        }
        panic!("search did not settle within {limit} steps");
    }

    fn path_cells(e: &TraversalEngine) -> usize {
        e.grid.cells().iter().filter(|c| c.on_final_path).count()
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("dfs".parse::<SearchMode>(), Ok(SearchMode::Dfs));
        assert_eq!(" BFS ".parse::<SearchMode>(), Ok(SearchMode::Bfs));
        assert!("dijkstra".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::Dfs.to_string(), "DFS");
    }

    #[test]
    fn test_init_seeds_frontier_per_mode() {
        let e = engine(5, 5, SearchMode::Bfs, 3);
        assert_eq!(e.current(), 0);
        assert!(e.grid.cell(0).visited);
        assert_eq!(e.queue.len(), 1);
        assert_eq!(e.parents.get(&0), Some(&None));

        let e = engine(5, 5, SearchMode::Dfs, 3);
        assert!(e.grid.cell(0).visited);
        assert!(e.stack.is_empty());
        assert!(e.parents.is_empty());
        assert_eq!(e.run_state(), RunState::Running);
    }

    #[test]
    fn test_bfs_5x5_corner_path_has_9_cells() {
        let mut e = engine(5, 5, SearchMode::Bfs, 11);
        retarget(&mut e, 4, 4);
        run_to_end(&mut e, 100);

        assert!(e.found());
        assert_eq!(e.run_state(), RunState::Found);
        assert_eq!(e.current(), e.grid.target());
        assert_eq!(path_cells(&e), 9);
        assert_eq!(e.final_path().map(FinalPath::len), Some(9));
        assert!(e.grid.cell(0).on_final_path);
        assert!(e.grid.cell(e.grid.target()).on_final_path);
    }

    #[test]
    fn test_bfs_expands_in_neighbor_order() {
        let mut e = engine(3, 3, SearchMode::Bfs, 5);
        retarget(&mut e, 2, 2);

        // Dequeue the start: right (1,0) then down (0,1) are discovered.
        assert!(e.advance_one_step());
        assert_eq!(e.current(), 0);
        let right = e.grid.index(1, 0).unwrap();
        let down = e.grid.index(0, 1).unwrap();
        assert_eq!(e.queue.iter().copied().collect::<Vec<_>>(), vec![right, down]);
        assert_eq!(e.parents.get(&right), Some(&Some(0)));

        assert!(e.advance_one_step());
        assert_eq!(e.current(), right);
    }

    #[test]
    fn test_dfs_path_is_shortest_regardless_of_route() {
        for seed in 0..20 {
            let mut e = engine(6, 6, SearchMode::Dfs, seed);
            wall(&mut e, 1, 0);
            wall(&mut e, 1, 1);
            wall(&mut e, 3, 5);
            wall(&mut e, 3, 4);
            retarget(&mut e, 5, 5);
            run_to_end(&mut e, 500);

            assert!(e.found(), "seed {seed}");
            let expected = match navigation::shortest_path(&e.grid, 0, e.grid.target()) {
                FinalPath::Route(cells) => cells.len(),
                FinalPath::Unreachable => panic!("layout is connected"),
            };
            assert_eq!(path_cells(&e), expected, "seed {seed}");
        }
    }

    #[test]
    fn test_dfs_is_deterministic_for_a_seed() {
        let trace = |seed| {
            let mut e = engine(7, 7, SearchMode::Dfs, seed);
            let mut cells = Vec::new();
            while e.advance_one_step() {
                cells.push(e.current());
            }
            cells
        };
        assert_eq!(trace(42), trace(42));
    }

    #[test]
    fn test_dfs_backtracks_out_of_dead_end() {
        // With (1, 1) walled, (0, 1) is a dead end below the start.
        let mut e = engine(3, 2, SearchMode::Dfs, 9);
        retarget(&mut e, 2, 1);
        wall(&mut e, 1, 1);
        run_to_end(&mut e, 50);
        assert!(e.found());
        // Any backtracked cell must have been visited in this run.
        for cell in e.grid.cells() {
            if cell.backtrack {
                assert!(cell.visited);
            }
        }
    }

    #[test]
    fn test_steps_never_enter_obstacles() {
        for mode in [SearchMode::Dfs, SearchMode::Bfs] {
            let mut e = engine(8, 8, mode, 21);
            let mut rng = ChaCha8Rng::seed_from_u64(77);
            for tick in 0..400 {
                if tick % 7 == 0 {
                    let i = rng.gen_range(0..8);
                    let j = rng.gen_range(0..8);
                    e.toggle_obstacle_at(i, j);
                }
                e.advance_one_step();
                assert!(!e.grid.cell(e.current()).obstacle);
                for cell in e.grid.cells() {
                    assert!(!(cell.obstacle && cell.visited), "{mode}: visited a wall");
                }
            }
        }
    }

    #[test]
    fn test_dfs_reports_target_when_head_is_walled_in_on_it() {
        let mut e = engine(5, 5, SearchMode::Bfs, 6);
        retarget(&mut e, 2, 2);
        run_to_end(&mut e, 100);
        assert!(e.found());
        assert_eq!(e.current(), e.grid.target());

        for (i, j) in [(2, 1), (3, 2), (2, 3), (1, 2)] {
            assert!(e.toggle_obstacle_at(i, j));
        }
        e.set_mode(SearchMode::Dfs);
        assert!(!e.found());

        // No candidates and an empty stack: the head stays put on the target.
        assert!(e.advance_one_step());
        assert!(e.found());
        assert_eq!(e.run_state(), RunState::Found);
        assert_eq!(e.steps(), 0);

        // The start is cut off from the target, so nothing is marked.
        assert_eq!(e.final_path(), Some(&FinalPath::Unreachable));
        assert_eq!(path_cells(&e), 0);
        assert!(!e.advance_one_step());
    }

    #[test]
    fn test_enclosed_target_is_never_found() {
        for mode in [SearchMode::Dfs, SearchMode::Bfs] {
            let mut e = engine(5, 5, mode, 4);
            retarget(&mut e, 2, 2);
            for (i, j) in [(2, 1), (3, 2), (2, 3), (1, 2)] {
                assert!(e.toggle_obstacle_at(i, j));
            }
            for _ in 0..200 {
                e.advance_one_step();
            }
            assert!(!e.found());
            assert_eq!(e.run_state(), RunState::Exhausted);
            assert!(!e.advance_one_step());

            assert_eq!(e.compute_final_path(), &FinalPath::Unreachable);
            assert_eq!(path_cells(&e), 0);
        }
    }

    #[test]
    fn test_no_effect_after_found() {
        let mut e = engine(4, 4, SearchMode::Bfs, 8);
        run_to_end(&mut e, 100);
        assert!(e.found());

        let snapshot: Vec<_> = e.grid.cells().iter().map(|c| (c.visited, c.on_final_path)).collect();
        let (current, steps) = (e.current(), e.steps());
        for _ in 0..5 {
            assert!(!e.advance_one_step());
        }
        let after: Vec<_> = e.grid.cells().iter().map(|c| (c.visited, c.on_final_path)).collect();
        assert_eq!(snapshot, after);
        assert_eq!((e.current(), e.steps()), (current, steps));
    }

    #[test]
    fn test_no_effect_after_exhausted() {
        let mut e = engine(3, 3, SearchMode::Dfs, 2);
        retarget(&mut e, 2, 2);
        wall(&mut e, 2, 1);
        wall(&mut e, 1, 2);
        run_to_end(&mut e, 100);
        assert_eq!(e.run_state(), RunState::Exhausted);

        let current = e.current();
        let visited = e.visited_count();
        for _ in 0..5 {
            assert!(!e.advance_one_step());
        }
        assert_eq!(e.current(), current);
        assert_eq!(e.visited_count(), visited);
    }

    #[test]
    fn test_mode_switch_folds_flags_and_keeps_head() {
        let mut e = engine(6, 6, SearchMode::Dfs, 13);
        retarget(&mut e, 5, 5);
        for _ in 0..10 {
            e.advance_one_step();
        }
        let visited_before: Vec<bool> = e.grid.cells().iter().map(|c| c.visited).collect();
        let backtrack_before: Vec<bool> = e.grid.cells().iter().map(|c| c.backtrack).collect();
        let head = e.current();

        e.set_mode(SearchMode::Bfs);

        assert_eq!(e.mode(), SearchMode::Bfs);
        assert_eq!(e.current(), head);
        for (idx, cell) in e.grid.cells().iter().enumerate() {
            if visited_before[idx] {
                assert!(cell.visited_mark);
            }
            if backtrack_before[idx] {
                assert!(cell.backtrack_mark);
            }
            assert!(!cell.backtrack);
            assert_eq!(cell.visited, idx == head);
        }
        assert_eq!(e.parents.get(&head), Some(&None));
        assert_eq!(e.steps(), 0);
    }

    #[test]
    fn test_toggle_restarts_from_current_and_protects_roles() {
        let mut e = engine(5, 5, SearchMode::Dfs, 17);
        retarget(&mut e, 4, 4);
        for _ in 0..3 {
            e.advance_one_step();
        }
        let head = e.current();
        let head_xy = e.grid.coords(head);

        // Protected: current, start, target, off-grid.
        assert!(!e.toggle_obstacle_at(head_xy.x as i32, head_xy.y as i32));
        assert!(!e.grid.cell(head).obstacle);
        assert!(!e.toggle_obstacle_at(0, 0));
        assert!(!e.toggle_obstacle_at(4, 4));
        assert!(!e.toggle_obstacle_at(-1, 2));
        assert!(!e.toggle_obstacle_at(5, 0));
        assert_eq!(e.steps(), 3);

        let free = (0..e.grid.len())
            .find(|&i| i != head && i != 0 && i != e.grid.target())
            .unwrap();
        let xy = e.grid.coords(free);
        assert!(e.toggle_obstacle_at(xy.x as i32, xy.y as i32));
        assert!(e.grid.cell(free).obstacle);
        assert_eq!(e.current(), head);
        assert_eq!(e.steps(), 0);
        assert_eq!(e.visited_count(), 1);
    }

    #[test]
    fn test_reset_clears_marks_keeps_walls_and_rerolls_target() {
        for seed in 0..30 {
            let mut e = engine(5, 5, SearchMode::Bfs, seed);
            let placed: Vec<(i32, i32)> = [(1, 1), (2, 2), (3, 3)]
                .into_iter()
                .filter(|&(i, j)| e.toggle_obstacle_at(i, j))
                .collect();
            let walls: Vec<usize> = placed
                .iter()
                .map(|&(i, j)| e.grid.index(i, j).unwrap())
                .collect();
            for _ in 0..15 {
                e.advance_one_step();
            }
            e.set_mode(SearchMode::Dfs);
            for _ in 0..5 {
                e.advance_one_step();
            }

            e.reset();

            let target = e.grid.target();
            assert_ne!(target, e.grid.start());
            assert!(!e.grid.cell(target).obstacle);
            assert_eq!(e.grid.cells().iter().filter(|c| c.is_target).count(), 1);
            assert_eq!(e.current(), e.grid.start());
            assert!(!e.found());
            assert_eq!(e.mode(), SearchMode::Dfs);

            for (idx, cell) in e.grid.cells().iter().enumerate() {
                assert!(!cell.visited_mark && !cell.backtrack_mark && !cell.path_mark);
                assert!(!cell.backtrack && !cell.on_final_path);
                assert_eq!(cell.visited, idx == e.grid.start());
            }
            for &idx in &walls {
                assert!(e.grid.cell(idx).obstacle, "seed {seed}: wall {idx} lost");
            }
        }
    }

    #[test]
    fn test_apply_routes_commands() {
        let mut e = engine(4, 4, SearchMode::Dfs, 1);
        e.apply(Command::SetMode(SearchMode::Bfs));
        assert_eq!(e.mode(), SearchMode::Bfs);

        e.apply(Command::ToggleObstacle { i: 99, j: 99 });
        assert!(e.grid.cells().iter().all(|c| !c.obstacle));

        e.advance_one_step();
        e.apply(Command::Reset);
        assert_eq!(e.current(), e.grid.start());
        assert_eq!(e.steps(), 0);
    }
}
