//! Grid module - the node lattice tiles live on
//!
//! One `Node` per board slot. A node's identity is stable for the life of a
//! board; only its occupant changes. The lattice is owned exclusively by
//! `GridManager`; tiles refer back to their node by flat index, never by
//! reference, so ownership stays single-direction.

use arrayvec::ArrayVec;

use crate::core::pool::TileId;

/// One grid slot holding at most one tile
#[derive(Debug, Clone)]
pub struct Node {
    pub x: u8,
    pub y: u8,
    pub index: usize,
    occupant: Option<TileId>,
}

impl Node {
    pub fn occupant(&self) -> Option<TileId> {
        self.occupant
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Owner of the node lattice with neighbor queries and free-slot bookkeeping
#[derive(Debug, Clone, Default)]
pub struct GridManager {
    nodes: Vec<Node>,
    columns: usize,
    rows: usize,
}

impl GridManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the lattice for a new board. Existing occupants are dropped;
    /// the caller is responsible for releasing their tiles first.
    pub fn configure(&mut self, columns: usize, rows: usize) {
        self.columns = columns;
        self.rows = rows;
        self.nodes.clear();
        self.nodes.reserve(columns * rows);
        for y in 0..rows {
            for x in 0..columns {
                self.nodes.push(Node {
                    x: x as u8,
                    y: y as u8,
                    index: y * columns + x,
                    occupant: None,
                });
            }
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn occupant(&self, index: usize) -> Option<TileId> {
        self.nodes.get(index).and_then(|n| n.occupant)
    }

    /// Place a tile on a free node. Fails on an occupied or invalid node
    /// rather than silently evicting.
    pub fn set_occupant(&mut self, index: usize, tile: TileId) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) if node.occupant.is_none() => {
                node.occupant = Some(tile);
                true
            }
            _ => false,
        }
    }

    /// Remove and return a node's occupant
    pub fn take_occupant(&mut self, index: usize) -> Option<TileId> {
        self.nodes.get_mut(index).and_then(|n| n.occupant.take())
    }

    pub fn is_free(&self, index: usize) -> bool {
        self.nodes.get(index).map_or(false, |n| n.is_free())
    }

    /// 4-directional neighbor indices of a node
    pub fn neighbors4(&self, index: usize) -> ArrayVec<usize, 4> {
        let mut out = ArrayVec::new();
        if index >= self.nodes.len() || self.columns == 0 {
            return out;
        }
        let x = index % self.columns;
        let y = index / self.columns;
        if x > 0 {
            out.push(index - 1);
        }
        if x + 1 < self.columns {
            out.push(index + 1);
        }
        if y > 0 {
            out.push(index - self.columns);
        }
        if y + 1 < self.rows {
            out.push(index + self.columns);
        }
        out
    }

    /// Number of free nodes across the whole lattice
    pub fn free_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_free()).count()
    }

    /// Number of free nodes in one column
    pub fn free_in_column(&self, x: usize) -> usize {
        if x >= self.columns {
            return 0;
        }
        (0..self.rows)
            .filter(|y| self.is_free(y * self.columns + x))
            .count()
    }

    /// Collect every free node index into `out` (reused buffer, cleared first)
    pub fn free_indices(&self, out: &mut Vec<usize>) {
        out.clear();
        out.extend(
            self.nodes
                .iter()
                .filter(|n| n.is_free())
                .map(|n| n.index),
        );
    }
}
