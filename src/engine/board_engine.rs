//! Board engine - orchestrates selection, blasts, falling and refills
//!
//! Owns the board, the node lattice, the instance pool, the group cache and
//! the RNG for the lifetime of one level session. Mutations are transactional
//! at the operation level: a selection either clears its whole group (plus at
//! most one special spawn) or changes nothing. Degraded conditions never
//! raise past this boundary; they log and resolve to a fallback value so the
//! state machine can react deterministically.

use log::warn;

use crate::config::{ConfigError, LevelConfig, SpawnRule};
use crate::core::board::{BoardModel, Cell};
use crate::core::grid::GridManager;
use crate::core::group::GroupIndex;
use crate::core::pool::{EffectId, InstancePool, TileId};
use crate::core::rng::SimpleRng;
use crate::core::tile::{gather_affected_cells, Archetype, ArchetypeKind, GroupContext};
use crate::engine::events::BoardEvents;
use crate::engine::shuffle::Reshuffle;
use crate::types::ColorId;

/// Effect instance kinds the engine requests from the pool
pub const EFFECT_GROUP_POP: u16 = 0;
pub const EFFECT_BLAST: u16 = 1;

const EFFECT_KINDS: [u16; 2] = [EFFECT_GROUP_POP, EFFECT_BLAST];

/// Result of resolving a player selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Empty cell, static tile, or group below the minimum size; the board
    /// is untouched
    Invalid,
    /// A color group was cleared, possibly leaving one special tile behind
    GroupCleared {
        color: ColorId,
        size: usize,
        spawned: Option<ArchetypeKind>,
    },
    /// A special tile detonated
    Blast {
        archetype: ArchetypeKind,
        cleared: usize,
    },
}

impl SelectOutcome {
    /// Whether the selection consumed a move
    pub fn is_valid_move(&self) -> bool {
        !matches!(self, SelectOutcome::Invalid)
    }
}

/// One level session's board state and rules
pub struct BoardEngine {
    config: LevelConfig,
    board: BoardModel,
    grid: GridManager,
    pool: InstancePool,
    groups: GroupIndex,
    rng: SimpleRng,
    reshuffle: Reshuffle,
    /// Shared output buffer for blast searches, sized to the cell count
    blast: Vec<usize>,
    /// Effect instances held until the current resolution finishes
    active_effects: Vec<EffectId>,
    statics_total: usize,
    statics_collected: usize,
}

impl BoardEngine {
    /// Validate the configuration and build an empty, prewarmed session
    pub fn new(config: LevelConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut board = BoardModel::new();
        board.configure(config.columns, config.rows);
        let mut grid = GridManager::new();
        grid.configure(config.columns, config.rows);
        let mut groups = GroupIndex::new();
        groups.configure(board.cell_count());

        let mut pool = InstancePool::new();
        let per_color = board.cell_count() / config.colors.max(1) as usize + 1;
        pool.prewarm(config.colors, per_color, &EFFECT_KINDS, 4);

        let rng = SimpleRng::new(config.seed);
        let cell_count = board.cell_count();

        Ok(Self {
            config,
            board,
            grid,
            pool,
            groups,
            rng,
            reshuffle: Reshuffle::new(),
            blast: Vec::with_capacity(cell_count),
            active_effects: Vec::with_capacity(4),
            statics_total: 0,
            statics_collected: 0,
        })
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    pub fn grid(&self) -> &GridManager {
        &self.grid
    }

    pub fn pool(&self) -> &InstancePool {
        &self.pool
    }

    pub fn groups(&self) -> &GroupIndex {
        &self.groups
    }

    pub fn statics_total(&self) -> usize {
        self.statics_total
    }

    pub fn statics_collected(&self) -> usize {
        self.statics_collected
    }

    /// Effect instances alive for the current resolution (for render sinks)
    pub fn active_effects(&self) -> &[EffectId] {
        &self.active_effects
    }

    /// Whether any selectable group exists on the current board
    pub fn has_valid_move(&self) -> bool {
        self.groups.has_move()
    }

    /// Reset the session for a fresh level: empty board, static obstacles
    /// placed per quota. Regular tiles arrive through [`refill`](Self::refill)
    /// so the host can animate them dropping in.
    pub fn generate_level(&mut self) {
        self.clear_board();

        let quota = self.config.static_quota;
        let mut target = quota.min;
        for _ in quota.min..quota.max {
            if self.rng.chance(quota.weight) {
                target += 1;
            }
        }

        let mut placed = 0;
        while placed < target {
            let start = self.rng.next_range(self.board.cell_count() as u32) as usize;
            let Some(idx) = self.find_free_from(start) else {
                break;
            };
            let color = self.rng.next_color(self.config.colors);
            if self.spawn_tile_at(idx, color, Archetype::Static).is_none() {
                break;
            }
            placed += 1;
        }
        self.statics_total = placed;
        self.statics_collected = 0;
        self.rebuild_groups();
    }

    /// Spawn a tile into every free node, rolling colors from the palette.
    /// Returns the number of tiles spawned.
    pub fn refill(&mut self) -> usize {
        let mut spawned = 0;
        for idx in 0..self.board.cell_count() {
            if !self.grid.is_free(idx) {
                continue;
            }
            let color = self.rng.next_color(self.config.colors);
            if self.spawn_tile_at(idx, color, Archetype::Regular).is_some() {
                spawned += 1;
            }
        }
        if spawned > 0 {
            self.rebuild_groups();
        }
        spawned
    }

    /// Resolve a player activation of the tile at `index`.
    ///
    /// Regular tiles clear their group when it has at least 2 members;
    /// special tiles always detonate; statics and empty cells are invalid.
    pub fn select(&mut self, index: usize, events: &mut dyn BoardEvents) -> SelectOutcome {
        let Some(cell) = self.board.get(index) else {
            events.invalid_selection(index);
            return SelectOutcome::Invalid;
        };
        if !cell.occupied {
            events.invalid_selection(index);
            return SelectOutcome::Invalid;
        }
        let Some(tid) = self.grid.occupant(index) else {
            warn!("engine: occupied cell {} has no tile on its node", index);
            events.invalid_selection(index);
            return SelectOutcome::Invalid;
        };
        let Some(tile) = self.pool.get(tid) else {
            warn!("engine: node {} refers to a dead tile", index);
            events.invalid_selection(index);
            return SelectOutcome::Invalid;
        };
        let (color, archetype) = (tile.color, tile.archetype);

        match archetype {
            Archetype::Static => {
                events.invalid_selection(index);
                SelectOutcome::Invalid
            }
            Archetype::Regular => self.clear_group(index, color, events),
            _ => self.detonate(index, color, archetype, events),
        }
    }

    fn clear_group(
        &mut self,
        origin: usize,
        color: ColorId,
        events: &mut dyn BoardEvents,
    ) -> SelectOutcome {
        let size = self.groups.size_at(origin);
        if size < 2 {
            events.invalid_selection(origin);
            return SelectOutcome::Invalid;
        }

        let mut blast = std::mem::take(&mut self.blast);
        blast.clear();
        blast.extend_from_slice(self.groups.cells_at(origin));

        for &idx in &blast {
            let _ = self.release_at(idx);
        }

        let spawned = self.spawn_rule_for(size).map(|rule| {
            let spawn_color = rule.color_override.unwrap_or(color);
            let _ = self.spawn_tile_at(origin, spawn_color, rule.archetype);
            rule.archetype.kind()
        });

        self.collect_adjacent_statics(origin, color, &blast, events);
        self.blast = blast;

        self.spawn_effect(EFFECT_GROUP_POP, origin, color);
        events.group_cleared(color, size);
        self.rebuild_groups();

        SelectOutcome::GroupCleared {
            color,
            size,
            spawned,
        }
    }

    fn detonate(
        &mut self,
        origin: usize,
        color: ColorId,
        archetype: Archetype,
        events: &mut dyn BoardEvents,
    ) -> SelectOutcome {
        let mut blast = std::mem::take(&mut self.blast);
        let count = gather_affected_cells(
            archetype,
            origin,
            color,
            &self.board,
            &self.groups,
            &mut blast,
        );
        if count == 0 {
            self.blast = blast;
            events.invalid_selection(origin);
            return SelectOutcome::Invalid;
        }

        let mut cleared = 0;
        for &idx in &blast {
            if let Some((tile_color, kind)) = self.release_at(idx) {
                cleared += 1;
                if kind == ArchetypeKind::Static {
                    self.note_static_collected(tile_color, events);
                }
            }
        }

        self.collect_adjacent_statics(origin, color, &blast, events);
        self.blast = blast;

        self.spawn_effect(EFFECT_BLAST, origin, color);
        events.blast_at(color, self.board.x_of(origin), self.board.y_of(origin));
        self.rebuild_groups();

        SelectOutcome::Blast {
            archetype: archetype.kind(),
            cleared,
        }
    }

    /// Compact every column downward, preserving relative vertical order.
    /// Idempotent: a second pass with no changes in between moves nothing.
    /// Returns the number of tiles moved.
    pub fn apply_gravity(&mut self) -> usize {
        let mut moved = 0;
        for x in 0..self.board.columns() {
            let mut write_y = self.board.rows();
            for y in (0..self.board.rows()).rev() {
                let Some(idx) = self.board.index_of(x as i32, y as i32) else {
                    continue;
                };
                if !self.board.is_occupied(idx) {
                    continue;
                }
                write_y -= 1;
                if write_y == y {
                    continue;
                }
                let Some(dst) = self.board.index_of(x as i32, write_y as i32) else {
                    continue;
                };
                self.board.copy(idx, dst);
                self.board.clear(idx);
                if let Some(tid) = self.grid.take_occupant(idx) {
                    self.grid.set_occupant(dst, tid);
                    if let Some(tile) = self.pool.get_mut(tid) {
                        tile.node = Some(dst);
                    }
                }
                moved += 1;
            }
        }
        if moved > 0 {
            self.rebuild_groups();
        }
        moved
    }

    /// Permute participating tiles so at least one valid move exists.
    /// Returns false when the board cannot be fixed by permutation alone;
    /// the caller falls back to [`regenerate_board`](Self::regenerate_board).
    pub fn shuffle_board(&mut self) -> bool {
        let ok = self.reshuffle.shuffle(
            &mut self.board,
            &mut self.grid,
            &mut self.pool,
            &mut self.rng,
        );
        if ok {
            self.rebuild_groups();
        }
        ok
    }

    /// Clear and refill the whole board with a planted adjacent same-color
    /// pair, which guarantees a valid move unconditionally. Outstanding
    /// static targets are re-placed so the collection goal survives.
    pub fn regenerate_board(&mut self) {
        let outstanding = self.statics_total.saturating_sub(self.statics_collected);
        self.reshuffle.regenerate(
            &mut self.board,
            &mut self.grid,
            &mut self.pool,
            &mut self.rng,
            self.config.colors,
            outstanding,
        );
        self.rebuild_groups();
    }

    /// Release every tile and empty the board
    pub fn clear_board(&mut self) {
        for idx in 0..self.board.cell_count() {
            let _ = self.release_at(idx);
        }
    }

    /// Place a tile at grid coordinates; used by level scripts and tests.
    /// The group cache is stale until [`rebuild_groups`](Self::rebuild_groups)
    /// runs.
    pub fn place_tile(
        &mut self,
        x: i32,
        y: i32,
        color: ColorId,
        archetype: Archetype,
    ) -> Option<TileId> {
        let index = self.board.index_of(x, y)?;
        let id = self.spawn_tile_at(index, color, archetype)?;
        if archetype.kind() == ArchetypeKind::Static {
            self.statics_total += 1;
        }
        Some(id)
    }

    /// Recompute the group cache and refresh every cell's icon tier
    pub fn rebuild_groups(&mut self) {
        self.groups.rebuild(&self.board, &self.grid, &self.pool);
        for gid in 0..self.groups.len() {
            let Some(info) = self.groups.info(gid) else {
                continue;
            };
            let tier = self.config.tier_thresholds.tier_for(info.len());
            for &idx in self.groups.cells_of(gid) {
                self.board.set_tier(idx, tier);
                if let Some(tid) = self.grid.occupant(idx) {
                    if let Some(tile) = self.pool.get_mut(tid) {
                        tile.tier = tier;
                    }
                }
            }
        }
    }

    /// Return held effect instances to the pool once the host has played them
    pub fn release_effects(&mut self) {
        for id in self.active_effects.drain(..) {
            self.pool.release_effect(id);
        }
    }

    fn spawn_effect(&mut self, kind: u16, cell: usize, color: ColorId) {
        let id = self.pool.acquire_effect(kind);
        if let Some(fx) = self.pool.effect_mut(id) {
            fx.cell = Some(cell);
            fx.color = color;
        }
        self.active_effects.push(id);
    }

    fn spawn_tile_at(
        &mut self,
        index: usize,
        color: ColorId,
        archetype: Archetype,
    ) -> Option<TileId> {
        if !self.grid.is_free(index) {
            warn!("engine: spawn onto occupied or invalid node {} skipped", index);
            return None;
        }
        let id = self.pool.acquire(color, archetype);
        if let Some(tile) = self.pool.get_mut(id) {
            tile.node = Some(index);
        }
        self.grid.set_occupant(index, id);
        self.board.set(index, Cell::filled(color));
        Some(id)
    }

    /// Free a node, release its tile and empty the cell.
    /// Returns the released tile's color and kind.
    fn release_at(&mut self, index: usize) -> Option<(ColorId, ArchetypeKind)> {
        let tid = self.grid.take_occupant(index)?;
        let info = self
            .pool
            .get(tid)
            .map(|tile| (tile.color, tile.archetype.kind()));
        self.pool.release(tid);
        self.board.clear(index);
        info
    }

    /// Highest-threshold spawn rule satisfied by a group of `size`
    fn spawn_rule_for(&self, size: usize) -> Option<SpawnRule> {
        self.config
            .spawn_rules
            .iter()
            .filter(|rule| size >= rule.min_group)
            .max_by_key(|rule| rule.min_group)
            .copied()
    }

    /// Collect every static obstacle at Manhattan distance 1 of the blast
    fn collect_adjacent_statics(
        &mut self,
        origin: usize,
        color: ColorId,
        affected: &[usize],
        events: &mut dyn BoardEvents,
    ) {
        let ctx = GroupContext {
            origin,
            color,
            cells: affected,
        };
        for idx in 0..self.board.cell_count() {
            let Some(tid) = self.grid.occupant(idx) else {
                continue;
            };
            let is_static = self
                .pool
                .get(tid)
                .map_or(false, |tile| tile.archetype.kind() == ArchetypeKind::Static);
            if !is_static {
                continue;
            }
            if !ctx.is_adjacent(&self.board, idx) {
                continue;
            }
            if let Some((tile_color, _)) = self.release_at(idx) {
                self.note_static_collected(tile_color, events);
            }
        }
    }

    fn note_static_collected(&mut self, color: ColorId, events: &mut dyn BoardEvents) {
        self.statics_collected += 1;
        events.static_collected(color, self.statics_collected, self.statics_total);
    }

    fn find_free_from(&self, start: usize) -> Option<usize> {
        let count = self.board.cell_count();
        (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&idx| self.grid.is_free(idx))
    }
}
