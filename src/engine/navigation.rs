// Shortest-path search used to draw the final route once a run finds the target.
//
// Independent of whatever the animated run did: a fresh 4-connected BFS over
// the current obstacle layout, so the highlighted route is always a true
// shortest path in grid steps, whichever mode found the target.

use std::collections::VecDeque;

use super::grid::GridModel;

/// Sentinel in the parent table for cells the BFS has not reached.
const UNREACHED: usize = usize::MAX;

/// Outcome of a final-path reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalPath {
    /// Cells from start to goal, both inclusive.
    Route(Vec<usize>),
    /// Obstacles separate start from goal. Not an error.
    Unreachable,
}

impl FinalPath {
    pub fn len(&self) -> usize {
        match self {
            FinalPath::Route(cells) => cells.len(),
            FinalPath::Unreachable => 0,
        }
    }
}

/// BFS from `from` to `to`, ignoring run flags. Returns the path `from..=to`.
///
/// Expansion follows the grid's fixed neighbour order, so the returned route
/// is deterministic for a given layout.
pub fn shortest_path(grid: &GridModel, from: usize, to: usize) -> FinalPath {
    let mut parent = vec![UNREACHED; grid.len()];
    let mut queue = VecDeque::new();

    if !grid.is_walkable(from) {
        return FinalPath::Unreachable;
    }
    parent[from] = from;
    queue.push_back(from);

    let mut reached = false;
    while let Some(node) = queue.pop_front() {
        if node == to {
            reached = true;
            break;
        }
        for nb in grid.neighbors_of(node) {
            if grid.is_walkable(nb) && parent[nb] == UNREACHED {
                parent[nb] = node;
                queue.push_back(nb);
            }
        }
    }

    if !reached {
        return FinalPath::Unreachable;
    }

    // Walk parents back from the goal; the root points at itself.
    let mut route = vec![to];
    let mut node = to;
    while node != from {
        node = parent[node];
        route.push(node);
    }
    route.reverse();
    FinalPath::Route(route)
}
