//! Shuffle module - deadlock recovery by permutation or regeneration
//!
//! The shuffle plants a guaranteed adjacent same-color pair in locked cells
//! and Fisher-Yates-permutes everything else, so "at least one valid move
//! exists" holds by construction with no verification loop. When the board
//! has no color with two tiles (or no adjacent pair of occupied cells at
//! all), permutation cannot help and the caller falls back to regeneration,
//! which rebuilds the board from scratch around a planted pair and cannot
//! fail.
//!
//! Only group-participating tiles are permuted; static obstacles keep their
//! cells, since forcing a pair of them could never produce a move.

use crate::core::board::{BoardModel, Cell};
use crate::core::grid::GridManager;
use crate::core::pool::{InstancePool, TileId};
use crate::core::rng::SimpleRng;
use crate::core::tile::Archetype;
use crate::types::{ColorId, MAX_COLORS};

/// Reusable buffers for the shuffle; owned by the engine so repeated
/// deadlocks allocate nothing new
#[derive(Debug, Default)]
pub struct Reshuffle {
    /// Cell indices holding participating tiles
    sites: Vec<usize>,
    /// Tile at each site; permuted, then written back
    tiles: Vec<TileId>,
    /// Cell index -> position in `sites`, -1 when absent
    site_pos: Vec<i32>,
    /// Positions excluded from the permutation (forced pairs)
    locked: Vec<bool>,
    unlocked: Vec<usize>,
}

impl Reshuffle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permute participating tiles, forcing one adjacent same-color pair
    /// (and a second pair of another color when available) into locked
    /// cells. Returns false when no permutation can produce a valid move.
    pub fn shuffle(
        &mut self,
        board: &mut BoardModel,
        grid: &mut GridManager,
        pool: &mut InstancePool,
        rng: &mut SimpleRng,
    ) -> bool {
        self.collect_sites(board, grid, pool);

        let mut counts = [0usize; MAX_COLORS as usize];
        for &tid in &self.tiles {
            if let Some(tile) = pool.get(tid) {
                if (tile.color as usize) < counts.len() {
                    counts[tile.color as usize] += 1;
                }
            }
        }

        // the two most plentiful colors with at least a pair each
        let mut first: Option<(ColorId, usize)> = None;
        let mut second: Option<(ColorId, usize)> = None;
        for (color, &count) in counts.iter().enumerate() {
            if count < 2 {
                continue;
            }
            match first {
                Some((_, best)) if count <= best => {
                    if second.map_or(true, |(_, snd)| count > snd) {
                        second = Some((color as ColorId, count));
                    }
                }
                Some(prev) => {
                    second = Some(prev);
                    first = Some((color as ColorId, count));
                }
                None => first = Some((color as ColorId, count)),
            }
        }
        let Some((dominant, _)) = first else {
            return false;
        };

        self.locked.clear();
        self.locked.resize(self.sites.len(), false);

        // anchor pair near the bottom-left corner
        let Some(anchor) = self.find_anchor_pair(board, false) else {
            return false;
        };
        self.locked[anchor.0] = true;
        self.locked[anchor.1] = true;
        self.force_color(dominant, anchor, pool);

        // optional second pair scanned from the opposite side
        if let Some((other, _)) = second {
            if let Some(anchor2) = self.find_anchor_pair(board, true) {
                self.locked[anchor2.0] = true;
                self.locked[anchor2.1] = true;
                self.force_color(other, anchor2, pool);
            }
        }

        // uniform permutation of everything unlocked
        self.unlocked.clear();
        self.unlocked
            .extend((0..self.sites.len()).filter(|&p| !self.locked[p]));
        for i in (1..self.unlocked.len()).rev() {
            let j = rng.next_range((i + 1) as u32) as usize;
            self.tiles.swap(self.unlocked[i], self.unlocked[j]);
        }

        self.write_back(board, grid, pool);
        true
    }

    /// Clear the board and rebuild it: one planted adjacent pair of a random
    /// color, `statics` static obstacles at random cells, independent random
    /// colors everywhere else.
    pub fn regenerate(
        &mut self,
        board: &mut BoardModel,
        grid: &mut GridManager,
        pool: &mut InstancePool,
        rng: &mut SimpleRng,
        colors: u8,
        statics: usize,
    ) {
        for idx in 0..board.cell_count() {
            if let Some(tid) = grid.take_occupant(idx) {
                pool.release(tid);
            }
        }
        board.clear_all();

        // planted pair at the two bottom-left cells; dimensions are
        // validated to at least 2x2 so both indices exist
        let bottom = board.rows() as i32 - 1;
        let pair_color = rng.next_color(colors);
        for x in [0, 1] {
            if let Some(idx) = board.index_of(x, bottom) {
                spawn_at(board, grid, pool, idx, pair_color, Archetype::Regular);
            }
        }

        // outstanding static targets keep their presence on the fresh board
        let count = board.cell_count();
        let mut placed = 0;
        while placed < statics && placed + 2 < count {
            let start = rng.next_range(count as u32) as usize;
            let Some(idx) = (0..count)
                .map(|offset| (start + offset) % count)
                .find(|&i| !board.is_occupied(i))
            else {
                break;
            };
            spawn_at(board, grid, pool, idx, rng.next_color(colors), Archetype::Static);
            placed += 1;
        }

        for idx in 0..count {
            if !board.is_occupied(idx) {
                spawn_at(board, grid, pool, idx, rng.next_color(colors), Archetype::Regular);
            }
        }
    }

    fn collect_sites(&mut self, board: &BoardModel, grid: &GridManager, pool: &InstancePool) {
        let count = board.cell_count();
        self.site_pos.clear();
        self.site_pos.resize(count, -1);
        self.sites.clear();
        self.tiles.clear();

        for idx in 0..count {
            let Some(tid) = grid.occupant(idx) else {
                continue;
            };
            let participates = pool
                .get(tid)
                .map_or(false, |tile| tile.archetype.participates_in_group());
            if !participates {
                continue;
            }
            self.site_pos[idx] = self.sites.len() as i32;
            self.sites.push(idx);
            self.tiles.push(tid);
        }
    }

    /// First 4-adjacent pair of sites in scan order, as positions into
    /// `sites`. `from_top` scans from the opposite corner so a second pair
    /// lands away from the first; already-locked positions are skipped.
    fn find_anchor_pair(&self, board: &BoardModel, from_top: bool) -> Option<(usize, usize)> {
        let columns = board.columns() as i32;
        let rows = board.rows() as i32;

        let scan = |x: i32, y: i32| -> Option<(usize, usize)> {
            let idx = board.index_of(x, y)?;
            let p = *self.site_pos.get(idx)?;
            if p < 0 || self.locked.get(p as usize).copied().unwrap_or(false) {
                return None;
            }
            // right and down neighbors cover every adjacency once
            for (nx, ny) in [(x + 1, y), (x, y + 1)] {
                let Some(nidx) = board.index_of(nx, ny) else {
                    continue;
                };
                let q = *self.site_pos.get(nidx)?;
                if q >= 0 && !self.locked.get(q as usize).copied().unwrap_or(false) {
                    return Some((p as usize, q as usize));
                }
            }
            None
        };

        if from_top {
            for y in 0..rows {
                for x in (0..columns).rev() {
                    if let Some(pair) = scan(x, y) {
                        return Some(pair);
                    }
                }
            }
        } else {
            for y in (0..rows).rev() {
                for x in 0..columns {
                    if let Some(pair) = scan(x, y) {
                        return Some(pair);
                    }
                }
            }
        }
        None
    }

    /// Swap tiles of `color` into both slots of an anchor pair. Donors come
    /// from unlocked positions only, so a previously forced pair is never
    /// broken up.
    fn force_color(&mut self, color: ColorId, pair: (usize, usize), pool: &InstancePool) {
        for slot in [pair.0, pair.1] {
            let already = pool
                .get(self.tiles[slot])
                .map_or(false, |tile| tile.color == color);
            if already {
                continue;
            }
            let donor = (0..self.tiles.len()).find(|&p| {
                !self.locked[p]
                    && pool
                        .get(self.tiles[p])
                        .map_or(false, |tile| tile.color == color)
            });
            if let Some(donor) = donor {
                self.tiles.swap(slot, donor);
            }
        }
    }

    fn write_back(&self, board: &mut BoardModel, grid: &mut GridManager, pool: &mut InstancePool) {
        for &site in &self.sites {
            let _ = grid.take_occupant(site);
        }
        for (pos, &site) in self.sites.iter().enumerate() {
            let tid = self.tiles[pos];
            grid.set_occupant(site, tid);
            if let Some(tile) = pool.get_mut(tid) {
                tile.node = Some(site);
                board.set(site, Cell::filled(tile.color));
            }
        }
    }
}

/// Place a fresh tile from the pool onto a free node
fn spawn_at(
    board: &mut BoardModel,
    grid: &mut GridManager,
    pool: &mut InstancePool,
    index: usize,
    color: ColorId,
    archetype: Archetype,
) {
    let id = pool.acquire(color, archetype);
    if let Some(tile) = pool.get_mut(id) {
        tile.node = Some(index);
    }
    grid.set_occupant(index, id);
    board.set(index, Cell::filled(color));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::group::GroupIndex;

    struct Fixture {
        board: BoardModel,
        grid: GridManager,
        pool: InstancePool,
        rng: SimpleRng,
    }

    fn fixture(columns: usize, rows: usize, seed: u32) -> Fixture {
        let mut board = BoardModel::new();
        board.configure(columns, rows);
        let mut grid = GridManager::new();
        grid.configure(columns, rows);
        Fixture {
            board,
            grid,
            pool: InstancePool::new(),
            rng: SimpleRng::new(seed),
        }
    }

    fn place(f: &mut Fixture, x: i32, y: i32, color: ColorId, archetype: Archetype) {
        let idx = f.board.index_of(x, y).unwrap();
        spawn_at(&mut f.board, &mut f.grid, &mut f.pool, idx, color, archetype);
    }

    fn has_move(f: &Fixture) -> bool {
        let mut groups = GroupIndex::new();
        groups.rebuild(&f.board, &f.grid, &f.pool);
        groups.has_move()
    }

    /// 3-color full board with no two equal orthogonal neighbors
    fn fill_checkerboard(f: &mut Fixture) {
        for y in 0..f.board.rows() {
            for x in 0..f.board.columns() {
                let color = ((x + 2 * y) % 3) as ColorId;
                place(f, x as i32, y as i32, color, Archetype::Regular);
            }
        }
    }

    #[test]
    fn test_shuffle_guarantees_a_move() {
        for seed in [1, 7, 42, 1234, 99999] {
            let mut f = fixture(5, 5, seed);
            fill_checkerboard(&mut f);
            assert!(!has_move(&f), "checkerboard must start deadlocked");

            let mut shuffle = Reshuffle::new();
            assert!(shuffle.shuffle(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng));
            assert!(has_move(&f), "seed {} left no valid move", seed);
        }
    }

    #[test]
    fn test_shuffle_preserves_color_multiset() {
        let mut f = fixture(5, 5, 7);
        fill_checkerboard(&mut f);

        let count_colors = |board: &BoardModel| {
            let mut counts = [0usize; 3];
            for idx in 0..board.cell_count() {
                if let Some(c) = board.color_at(idx) {
                    counts[c as usize] += 1;
                }
            }
            counts
        };
        let before = count_colors(&f.board);

        let mut shuffle = Reshuffle::new();
        assert!(shuffle.shuffle(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng));
        assert_eq!(count_colors(&f.board), before);
        assert_eq!(f.pool.live_count(), 25);
    }

    #[test]
    fn test_shuffle_fails_without_a_pair() {
        // four occupied cells, four distinct colors: permutation cannot help
        let mut f = fixture(4, 4, 3);
        for (i, (x, y)) in [(0, 0), (1, 0), (2, 1), (3, 3)].iter().enumerate() {
            place(&mut f, *x, *y, i as ColorId, Archetype::Regular);
        }

        let mut shuffle = Reshuffle::new();
        assert!(!shuffle.shuffle(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng));
    }

    #[test]
    fn test_shuffle_fails_without_adjacency() {
        // two tiles of one color but no two occupied cells touch
        let mut f = fixture(5, 5, 3);
        place(&mut f, 0, 0, 0, Archetype::Regular);
        place(&mut f, 2, 2, 0, Archetype::Regular);
        place(&mut f, 4, 4, 1, Archetype::Regular);

        let mut shuffle = Reshuffle::new();
        assert!(!shuffle.shuffle(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng));
    }

    #[test]
    fn test_shuffle_leaves_statics_in_place() {
        let mut f = fixture(5, 5, 11);
        fill_checkerboard(&mut f);
        // swap one corner for a static
        let idx = f.board.index_of(4, 0).unwrap();
        let tid = f.grid.take_occupant(idx).unwrap();
        f.pool.release(tid);
        spawn_at(&mut f.board, &mut f.grid, &mut f.pool, idx, 2, Archetype::Static);

        let mut shuffle = Reshuffle::new();
        assert!(shuffle.shuffle(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng));

        let occupant = f.grid.occupant(idx).unwrap();
        let tile = f.pool.get(occupant).unwrap();
        assert_eq!(tile.archetype, Archetype::Static);
        assert_eq!(tile.node, Some(idx));
    }

    #[test]
    fn test_regenerate_always_yields_a_move() {
        for (columns, rows) in [(2, 2), (5, 5), (10, 10), (2, 10)] {
            for seed in [1, 99, 31337] {
                let mut f = fixture(columns, rows, seed);
                let mut shuffle = Reshuffle::new();
                shuffle.regenerate(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng, 6, 0);

                assert_eq!(f.pool.live_count(), columns * rows);
                assert!(
                    has_move(&f),
                    "{}x{} seed {} regenerated without a move",
                    columns,
                    rows,
                    seed
                );
            }
        }
    }

    #[test]
    fn test_regenerate_replaces_statics() {
        let mut f = fixture(5, 5, 5);
        let mut shuffle = Reshuffle::new();
        shuffle.regenerate(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng, 3, 4);

        let mut statics = 0;
        for idx in 0..f.board.cell_count() {
            if let Some(tid) = f.grid.occupant(idx) {
                if f.pool.get(tid).unwrap().archetype == Archetype::Static {
                    statics += 1;
                }
            }
        }
        assert_eq!(statics, 4);
        // the planted pair still guarantees a move even around obstacles
        assert!(has_move(&f));
    }

    #[test]
    fn test_regenerate_releases_previous_tiles() {
        let mut f = fixture(4, 4, 9);
        fill_checkerboard_partial(&mut f);
        let before_live = f.pool.live_count();
        assert!(before_live > 0);

        let mut shuffle = Reshuffle::new();
        shuffle.regenerate(&mut f.board, &mut f.grid, &mut f.pool, &mut f.rng, 3, 0);

        // exactly one live tile per cell; old ones went back to the pool
        assert_eq!(f.pool.live_count(), 16);
    }

    fn fill_checkerboard_partial(f: &mut Fixture) {
        for y in 0..f.board.rows() {
            for x in 0..f.board.columns() {
                if (x + y) % 2 == 0 {
                    let color = ((x + 2 * y) % 3) as ColorId;
                    place(f, x as i32, y as i32, color, Archetype::Regular);
                }
            }
        }
    }
}
