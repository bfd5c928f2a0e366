//! Group module - connectivity search over the board
//!
//! A group is a maximal set of same-color, group-participating tiles under
//! 4-directional adjacency. After every occupancy change the engine rebuilds
//! all groups in one pass; lookups between rebuilds hit the cache. The
//! visited buffer is stamp-based and the flood stack is reused, so a rebuild
//! allocates nothing once the buffers are warm.

use crate::core::board::BoardModel;
use crate::core::grid::GridManager;
use crate::core::pool::InstancePool;
use crate::types::ColorId;

/// One cached group: color plus a slice into the flat member buffer
#[derive(Debug, Clone, Copy)]
pub struct GroupInfo {
    pub color: ColorId,
    start: u32,
    len: u32,
}

impl GroupInfo {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Cache of every group on the current board snapshot
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    /// Per-cell group id, -1 for empty or non-participating cells
    group_of: Vec<i32>,
    /// Flat member buffer; each group owns one contiguous run
    members: Vec<usize>,
    groups: Vec<GroupInfo>,
    visited: Vec<u32>,
    stamp: u32,
    stack: Vec<usize>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the per-cell buffers for a board of `cell_count` cells
    pub fn configure(&mut self, cell_count: usize) {
        self.group_of.clear();
        self.group_of.resize(cell_count, -1);
        self.visited.clear();
        self.visited.resize(cell_count, 0);
        self.stamp = 0;
        self.groups.clear();
        self.members.clear();
    }

    fn advance_stamp(&mut self) {
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.visited.iter_mut().for_each(|v| *v = 0);
            self.stamp = 1;
        }
    }

    /// Recompute every group on the board in a single pass.
    ///
    /// Traversal only crosses edges between occupied cells of equal color
    /// whose tiles both participate in groups.
    pub fn rebuild(&mut self, board: &BoardModel, grid: &GridManager, pool: &InstancePool) {
        let count = board.cell_count();
        if self.group_of.len() != count {
            self.configure(count);
        }
        self.groups.clear();
        self.members.clear();
        self.group_of.iter_mut().for_each(|g| *g = -1);
        self.advance_stamp();

        let participates = |idx: usize| {
            grid.occupant(idx)
                .and_then(|tid| pool.get(tid))
                .map_or(false, |tile| tile.archetype.participates_in_group())
        };

        for start in 0..count {
            if self.visited[start] == self.stamp {
                continue;
            }
            let Some(color) = board.color_at(start) else {
                continue;
            };
            if !participates(start) {
                continue;
            }

            let gid = self.groups.len();
            let first = self.members.len();
            self.visited[start] = self.stamp;
            self.stack.push(start);
            while let Some(idx) = self.stack.pop() {
                self.group_of[idx] = gid as i32;
                self.members.push(idx);
                for n in grid.neighbors4(idx) {
                    if self.visited[n] == self.stamp {
                        continue;
                    }
                    if board.color_at(n) != Some(color) {
                        continue;
                    }
                    if !participates(n) {
                        continue;
                    }
                    self.visited[n] = self.stamp;
                    self.stack.push(n);
                }
            }
            self.groups.push(GroupInfo {
                color,
                start: first as u32,
                len: (self.members.len() - first) as u32,
            });
        }
    }

    /// One-off flood fill from a single start cell, bypassing the cache.
    /// Writes members into `out` (cleared first) and returns the count.
    pub fn collect_group(
        &mut self,
        start: usize,
        board: &BoardModel,
        grid: &GridManager,
        pool: &InstancePool,
        out: &mut Vec<usize>,
    ) -> usize {
        out.clear();
        let count = board.cell_count();
        if self.visited.len() != count {
            self.configure(count);
        }
        let Some(color) = board.color_at(start) else {
            return 0;
        };
        let participates = |idx: usize| {
            grid.occupant(idx)
                .and_then(|tid| pool.get(tid))
                .map_or(false, |tile| tile.archetype.participates_in_group())
        };
        if !participates(start) {
            return 0;
        }

        self.advance_stamp();
        self.visited[start] = self.stamp;
        self.stack.push(start);
        while let Some(idx) = self.stack.pop() {
            out.push(idx);
            for n in grid.neighbors4(idx) {
                if self.visited[n] == self.stamp {
                    continue;
                }
                if board.color_at(n) != Some(color) {
                    continue;
                }
                if !participates(n) {
                    continue;
                }
                self.visited[n] = self.stamp;
                self.stack.push(n);
            }
        }
        out.len()
    }

    /// Cached group id of a cell
    pub fn group_id_at(&self, index: usize) -> Option<usize> {
        self.group_of
            .get(index)
            .copied()
            .filter(|&g| g >= 0)
            .map(|g| g as usize)
    }

    pub fn info(&self, gid: usize) -> Option<GroupInfo> {
        self.groups.get(gid).copied()
    }

    /// Member cells of a group
    pub fn cells_of(&self, gid: usize) -> &[usize] {
        match self.groups.get(gid) {
            Some(g) => {
                let start = g.start as usize;
                &self.members[start..start + g.len as usize]
            }
            None => &[],
        }
    }

    /// Member cells of the group containing `index` (empty when none).
    /// Members of the same group share the same cached run.
    pub fn cells_at(&self, index: usize) -> &[usize] {
        match self.group_id_at(index) {
            Some(gid) => self.cells_of(gid),
            None => &[],
        }
    }

    /// Size of the group containing `index`, 0 when none
    pub fn size_at(&self, index: usize) -> usize {
        self.cells_at(index).len()
    }

    /// Number of cached groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// At least one group is selectable (size >= 2)
    pub fn has_move(&self) -> bool {
        self.groups.iter().any(|g| g.len >= 2)
    }

    /// Deadlock: every group on the board has size 1 (or there are none)
    pub fn is_deadlocked(&self) -> bool {
        !self.has_move()
    }
}
