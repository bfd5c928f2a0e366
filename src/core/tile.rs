//! Tile module - archetypes, blast searches and the group snapshot
//!
//! A tile's rule variant is a tagged enum rather than an inheritance chain:
//! one `gather_affected_cells` dispatch covers every archetype. Searches
//! write into a caller-supplied reusable buffer and return a count, so the
//! hot path allocates nothing once buffers are warm.

use serde::{Deserialize, Serialize};

use crate::core::board::BoardModel;
use crate::core::group::GroupIndex;
use crate::types::ColorId;

/// Parameter-free discriminant of an archetype, used as a pool key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    Regular,
    Bomb,
    RowClear,
    ColumnClear,
    ColorClear,
    Static,
}

/// Rule variant of a tile, with per-variant parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Archetype {
    /// Ordinary colored tile, cleared as part of a same-color group
    Regular,
    /// Clears a square of Chebyshev radius `radius` around itself
    Bomb { radius: u8 },
    /// Clears its whole row
    RowClear,
    /// Clears its whole column
    ColumnClear,
    /// Clears every tile of a target color (its own color when unset)
    ColorClear {
        #[serde(default)]
        target: Option<ColorId>,
    },
    /// Obstacle: unselectable, cleared only by an adjacent blast
    Static,
}

impl Archetype {
    pub fn kind(&self) -> ArchetypeKind {
        match self {
            Archetype::Regular => ArchetypeKind::Regular,
            Archetype::Bomb { .. } => ArchetypeKind::Bomb,
            Archetype::RowClear => ArchetypeKind::RowClear,
            Archetype::ColumnClear => ArchetypeKind::ColumnClear,
            Archetype::ColorClear { .. } => ArchetypeKind::ColorClear,
            Archetype::Static => ArchetypeKind::Static,
        }
    }

    /// Whether this tile joins same-color connectivity groups.
    /// Only regular tiles do; specials detonate on tap and statics are
    /// cleared by blasts alone.
    pub fn participates_in_group(&self) -> bool {
        matches!(self, Archetype::Regular)
    }

    /// Tappable archetypes with an area effect
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            Archetype::Bomb { .. }
                | Archetype::RowClear
                | Archetype::ColumnClear
                | Archetype::ColorClear { .. }
        )
    }
}

/// A placed game piece
#[derive(Debug, Clone)]
pub struct Tile {
    pub color: ColorId,
    pub archetype: Archetype,
    pub tier: u8,
    /// Flat index of the owning node; None while pooled
    pub node: Option<usize>,
}

impl Tile {
    pub fn new(color: ColorId, archetype: Archetype) -> Self {
        Self {
            color,
            archetype,
            tier: 0,
            node: None,
        }
    }

    /// Drop transient state on release back to the pool
    pub fn reset(&mut self) {
        self.tier = 0;
        self.node = None;
    }
}

/// Immutable snapshot of a resolved blast, handed to tiles that react to a
/// clear without being part of the connectivity search (static obstacles).
#[derive(Debug, Clone, Copy)]
pub struct GroupContext<'a> {
    pub origin: usize,
    pub color: ColorId,
    pub cells: &'a [usize],
}

impl GroupContext<'_> {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Whether `index` sits at Manhattan distance 1 of any affected cell
    pub fn is_adjacent(&self, board: &BoardModel, index: usize) -> bool {
        let x = board.x_of(index) as i32;
        let y = board.y_of(index) as i32;
        self.cells.iter().any(|&c| {
            let dx = (board.x_of(c) as i32 - x).abs();
            let dy = (board.y_of(c) as i32 - y).abs();
            dx + dy == 1
        })
    }
}

/// Compute the cells a selection of `archetype` at `origin` would affect.
///
/// Writes into `out` (cleared first) and returns the count. Every returned
/// index is in range and occupied; the one exception is ColorClear, whose
/// own origin is always included even when its color misses the target.
pub fn gather_affected_cells(
    archetype: Archetype,
    origin: usize,
    origin_color: ColorId,
    board: &BoardModel,
    groups: &GroupIndex,
    out: &mut Vec<usize>,
) -> usize {
    out.clear();
    if !board.is_occupied(origin) {
        return 0;
    }

    match archetype {
        Archetype::Regular => {
            out.extend_from_slice(groups.cells_at(origin));
        }
        Archetype::RowClear => {
            let y = board.y_of(origin) as i32;
            for x in 0..board.columns() as i32 {
                if let Some(idx) = board.index_of(x, y) {
                    if board.is_occupied(idx) {
                        out.push(idx);
                    }
                }
            }
        }
        Archetype::ColumnClear => {
            let x = board.x_of(origin) as i32;
            for y in 0..board.rows() as i32 {
                if let Some(idx) = board.index_of(x, y) {
                    if board.is_occupied(idx) {
                        out.push(idx);
                    }
                }
            }
        }
        Archetype::ColorClear { target } => {
            let target = target.unwrap_or(origin_color);
            // the origin is consumed regardless of whether it matches
            out.push(origin);
            for idx in 0..board.cell_count() {
                if idx == origin {
                    continue;
                }
                if board.color_at(idx) == Some(target) {
                    out.push(idx);
                }
            }
        }
        Archetype::Bomb { radius } => {
            let ox = board.x_of(origin) as i32;
            let oy = board.y_of(origin) as i32;
            let r = radius.max(1) as i32;
            for dy in -r..=r {
                for dx in -r..=r {
                    if let Some(idx) = board.index_of(ox + dx, oy + dy) {
                        if board.is_occupied(idx) {
                            out.push(idx);
                        }
                    }
                }
            }
        }
        Archetype::Static => {}
    }
    out.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::Cell;

    fn board_5x5_full() -> BoardModel {
        let mut board = BoardModel::new();
        board.configure(5, 5);
        for idx in 0..25 {
            board.set(idx, Cell::filled((idx % 3) as ColorId));
        }
        board
    }

    #[test]
    fn test_participation() {
        assert!(Archetype::Regular.participates_in_group());
        assert!(!Archetype::Bomb { radius: 1 }.participates_in_group());
        assert!(!Archetype::Static.participates_in_group());
        assert!(!Archetype::Static.is_special());
        assert!(Archetype::RowClear.is_special());
    }

    #[test]
    fn test_row_clear_gathers_row() {
        let board = board_5x5_full();
        let groups = GroupIndex::new();
        let mut out = Vec::new();

        let origin = board.index_of(2, 1).unwrap();
        let n = gather_affected_cells(Archetype::RowClear, origin, 0, &board, &groups, &mut out);
        assert_eq!(n, 5);
        assert!(out.iter().all(|&idx| board.y_of(idx) == 1));
    }

    #[test]
    fn test_column_clear_skips_holes() {
        let mut board = board_5x5_full();
        let hole = board.index_of(3, 2).unwrap();
        board.clear(hole);

        let groups = GroupIndex::new();
        let mut out = Vec::new();
        let origin = board.index_of(3, 0).unwrap();
        let n =
            gather_affected_cells(Archetype::ColumnClear, origin, 0, &board, &groups, &mut out);
        assert_eq!(n, 4);
        assert!(!out.contains(&hole));
    }

    #[test]
    fn test_bomb_is_chebyshev_and_clipped() {
        let board = board_5x5_full();
        let groups = GroupIndex::new();
        let mut out = Vec::new();

        // corner bomb of radius 1 covers a 2x2 patch
        let origin = board.index_of(0, 0).unwrap();
        let n = gather_affected_cells(
            Archetype::Bomb { radius: 1 },
            origin,
            0,
            &board,
            &groups,
            &mut out,
        );
        assert_eq!(n, 4);

        // center bomb of radius 1 covers 3x3, diagonals included
        let origin = board.index_of(2, 2).unwrap();
        let n = gather_affected_cells(
            Archetype::Bomb { radius: 1 },
            origin,
            0,
            &board,
            &groups,
            &mut out,
        );
        assert_eq!(n, 9);
        assert!(out.contains(&board.index_of(1, 1).unwrap()));
    }

    #[test]
    fn test_color_clear_includes_mismatched_origin() {
        let mut board = BoardModel::new();
        board.configure(3, 1);
        board.set(0, Cell::filled(0));
        board.set(1, Cell::filled(1));
        board.set(2, Cell::filled(1));

        let groups = GroupIndex::new();
        let mut out = Vec::new();
        let n = gather_affected_cells(
            Archetype::ColorClear { target: Some(1) },
            0,
            0,
            &board,
            &groups,
            &mut out,
        );
        assert_eq!(n, 3);
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_static_gathers_nothing() {
        let board = board_5x5_full();
        let groups = GroupIndex::new();
        let mut out = vec![99];
        let n = gather_affected_cells(Archetype::Static, 0, 0, &board, &groups, &mut out);
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_group_context_adjacency() {
        let board = board_5x5_full();
        let cells = [board.index_of(1, 1).unwrap(), board.index_of(2, 1).unwrap()];
        let ctx = GroupContext {
            origin: cells[0],
            color: 0,
            cells: &cells,
        };

        // orthogonal neighbor of a member
        assert!(ctx.is_adjacent(&board, board.index_of(1, 0).unwrap()));
        // diagonal is not Manhattan distance 1
        assert!(!ctx.is_adjacent(&board, board.index_of(0, 0).unwrap()));
        // a member itself is distance 0, not adjacent
        assert!(!ctx.is_adjacent(&board, cells[0]));
    }
}
