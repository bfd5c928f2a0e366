//! Pool module - instance reuse for tiles and transient effects
//!
//! Tiles live in a slot arena and are handed out by id. Released slots go
//! onto a free list keyed by (color, archetype kind) so a re-acquire of the
//! same key touches no allocator. Transient visual-effect instances get the
//! same treatment keyed by a single effect id. Pre-warming at board
//! initialization moves the allocation spike out of play.

use std::collections::HashMap;

use log::warn;

use crate::core::tile::{Archetype, ArchetypeKind, Tile};
use crate::types::ColorId;

/// Handle to a pooled tile slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(u32);

impl TileId {
    pub fn from_raw(raw: u32) -> Self {
        TileId(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a pooled effect slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u32);

impl EffectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A transient visual-effect instance (blast flash, pop burst)
#[derive(Debug, Clone)]
pub struct Effect {
    pub kind: u16,
    pub cell: Option<usize>,
    pub color: ColorId,
}

impl Effect {
    fn new(kind: u16) -> Self {
        Self {
            kind,
            cell: None,
            color: 0,
        }
    }

    fn reset(&mut self) {
        self.cell = None;
        self.color = 0;
    }
}

type TileKey = (ColorId, ArchetypeKind);

/// Reuse pool for tile and effect instances
#[derive(Debug, Default)]
pub struct InstancePool {
    tiles: Vec<Tile>,
    tile_live: Vec<bool>,
    free_tiles: HashMap<TileKey, Vec<TileId>>,
    effects: Vec<Effect>,
    effect_live: Vec<bool>,
    free_effects: HashMap<u16, Vec<EffectId>>,
}

impl InstancePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the free lists up front: `per_color` regular tiles for each
    /// palette color and `per_effect` instances for each effect kind.
    pub fn prewarm(&mut self, colors: u8, per_color: usize, effect_kinds: &[u16], per_effect: usize) {
        let mut scratch: Vec<TileId> = Vec::with_capacity(per_color);
        for color in 0..colors {
            scratch.clear();
            for _ in 0..per_color {
                scratch.push(self.acquire(color, Archetype::Regular));
            }
            for &id in &scratch {
                self.release(id);
            }
        }

        let mut scratch: Vec<EffectId> = Vec::with_capacity(per_effect);
        for &kind in effect_kinds {
            scratch.clear();
            for _ in 0..per_effect {
                scratch.push(self.acquire_effect(kind));
            }
            for &id in &scratch {
                self.release_effect(id);
            }
        }
    }

    /// Hand out a tile for (color, archetype), reusing a released slot of
    /// the same key when one is available.
    pub fn acquire(&mut self, color: ColorId, archetype: Archetype) -> TileId {
        let key = (color, archetype.kind());
        if let Some(id) = self.free_tiles.get_mut(&key).and_then(|list| list.pop()) {
            let slot = &mut self.tiles[id.index()];
            slot.color = color;
            slot.archetype = archetype;
            slot.tier = 0;
            slot.node = None;
            self.tile_live[id.index()] = true;
            return id;
        }

        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(Tile::new(color, archetype));
        self.tile_live.push(true);
        id
    }

    /// Reset a tile's transient state and return it to its key's free list.
    /// Double release is a caller bug; it is logged and skipped.
    pub fn release(&mut self, id: TileId) {
        match self.tile_live.get(id.index()).copied() {
            None => {
                warn!("pool: release of unknown tile id {:?}", id);
            }
            Some(false) => {
                warn!("pool: double release of tile id {:?}", id);
            }
            Some(true) => {
                let idx = id.index();
                self.tiles[idx].reset();
                let key = (self.tiles[idx].color, self.tiles[idx].archetype.kind());
                self.tile_live[idx] = false;
                self.free_tiles.entry(key).or_default().push(id);
            }
        }
    }

    /// Borrow a live tile
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        if self.tile_live.get(id.index()).copied() == Some(true) {
            self.tiles.get(id.index())
        } else {
            None
        }
    }

    /// Mutably borrow a live tile
    pub fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        if self.tile_live.get(id.index()).copied() == Some(true) {
            self.tiles.get_mut(id.index())
        } else {
            None
        }
    }

    /// Number of tiles currently handed out
    pub fn live_count(&self) -> usize {
        self.tile_live.iter().filter(|&&l| l).count()
    }

    /// Total tile slots ever constructed (live + pooled)
    pub fn capacity(&self) -> usize {
        self.tiles.len()
    }

    /// Hand out an effect instance for `kind`
    pub fn acquire_effect(&mut self, kind: u16) -> EffectId {
        if let Some(id) = self.free_effects.get_mut(&kind).and_then(|list| list.pop()) {
            let slot = &mut self.effects[id.index()];
            slot.kind = kind;
            slot.reset();
            self.effect_live[id.index()] = true;
            return id;
        }

        let id = EffectId(self.effects.len() as u32);
        self.effects.push(Effect::new(kind));
        self.effect_live.push(true);
        id
    }

    /// Return an effect instance to its kind's free list
    pub fn release_effect(&mut self, id: EffectId) {
        match self.effect_live.get(id.index()).copied() {
            None => {
                warn!("pool: release of unknown effect id {:?}", id);
            }
            Some(false) => {
                warn!("pool: double release of effect id {:?}", id);
            }
            Some(true) => {
                let idx = id.index();
                self.effects[idx].reset();
                let kind = self.effects[idx].kind;
                self.effect_live[idx] = false;
                self.free_effects.entry(kind).or_default().push(id);
            }
        }
    }

    /// Borrow a live effect
    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        if self.effect_live.get(id.index()).copied() == Some(true) {
            self.effects.get(id.index())
        } else {
            None
        }
    }

    /// Mutably borrow a live effect
    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        if self.effect_live.get(id.index()).copied() == Some(true) {
            self.effects.get_mut(id.index())
        } else {
            None
        }
    }

    /// Total effect slots ever constructed
    pub fn effect_capacity(&self) -> usize {
        self.effects.len()
    }
}
