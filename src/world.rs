//! Voxel World - Block grid, landmarks, and the read-only view handed to tasks
//!
//! Cells are unit cubes addressed by `IVec3`; cell (x, y, z) spans [x, x+1) on each axis.
//! Everything below y=0 is implicit bedrock, so an empty world is a flat floor.

use bevy::math::IVec3;
use bevy::prelude::Resource;
use hashbrown::HashMap;

use crate::constants::*;
use crate::operable::OperableSet;

// ============================================================================
// BLOCKS
// ============================================================================

/// Non-empty cell contents. Air is the absence of a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Block {
    /// Terrain or finished construction. Supports walkers.
    Solid { diggable: bool, hardness: f32 },
    /// Designated construction not yet built. Blocks movement but supports nothing.
    Blueprint { work_left: f32 },
}

/// Kinds of points of interest tasks can look up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LandmarkKind {
    HealingStation,
}

#[derive(Clone, Copy, Debug)]
struct Landmark {
    kind: LandmarkKind,
    cell: IVec3,
}

// ============================================================================
// WORLD RESOURCE
// ============================================================================

/// Bounded sparse voxel grid. Mutations bump `revision` so cached searches can tell
/// the world changed under them.
#[derive(Resource, Clone, Debug)]
pub struct VoxelWorld {
    size: IVec3,
    blocks: HashMap<IVec3, Block>,
    landmarks: Vec<Landmark>,
    revision: u64,
}

impl Default for VoxelWorld {
    fn default() -> Self {
        Self::new(IVec3::new(32, 8, 32))
    }
}

impl VoxelWorld {
    pub fn new(size: IVec3) -> Self {
        Self {
            size,
            blocks: HashMap::new(),
            landmarks: Vec::new(),
            revision: 0,
        }
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_bounds(&self, cell: IVec3) -> bool {
        cell.cmpge(IVec3::ZERO).all() && cell.cmplt(self.size).all()
    }

    pub fn block(&self, cell: IVec3) -> Option<Block> {
        self.blocks.get(&cell).copied()
    }

    /// Solid blocks and bedrock (y < 0).
    pub fn is_solid(&self, cell: IVec3) -> bool {
        cell.y < 0 || matches!(self.blocks.get(&cell), Some(Block::Solid { .. }))
    }

    /// In bounds and free of any block.
    pub fn is_empty(&self, cell: IVec3) -> bool {
        self.in_bounds(cell) && !self.blocks.contains_key(&cell)
    }

    /// Empty and standing on something solid.
    pub fn is_walkable(&self, cell: IVec3) -> bool {
        self.is_empty(cell) && self.is_solid(cell - IVec3::Y)
    }

    /// Height of the first supporting surface at or below `from_y` in column (x, z).
    pub fn ground_height(&self, x: i32, z: i32, from_y: i32) -> f32 {
        let mut y = from_y;
        while y >= 0 {
            if self.is_solid(IVec3::new(x, y - 1, z)) {
                return y as f32;
            }
            y -= 1;
        }
        0.0
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Place a block. Returns false when out of bounds.
    pub fn set_block(&mut self, cell: IVec3, block: Block) -> bool {
        if !self.in_bounds(cell) {
            return false;
        }
        self.blocks.insert(cell, block);
        self.revision += 1;
        true
    }

    pub fn clear_block(&mut self, cell: IVec3) -> Option<Block> {
        let removed = self.blocks.remove(&cell);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Undiggable wall.
    pub fn place_wall(&mut self, cell: IVec3) -> bool {
        self.set_block(cell, Block::Solid { diggable: false, hardness: f32::INFINITY })
    }

    pub fn place_rubble(&mut self, cell: IVec3, hardness: f32) -> bool {
        self.set_block(cell, Block::Solid { diggable: true, hardness })
    }

    /// Blueprints only go into empty cells.
    pub fn place_blueprint(&mut self, cell: IVec3, work: f32) -> bool {
        if !self.is_empty(cell) {
            return false;
        }
        self.set_block(cell, Block::Blueprint { work_left: work })
    }

    /// Fill the inclusive box [min, max] with walls.
    pub fn fill_walls(&mut self, min: IVec3, max: IVec3) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.place_wall(IVec3::new(x, y, z));
                }
            }
        }
    }

    /// Apply construction work. None if the cell is not a blueprint,
    /// Some(true) when this work finished it (the cell is now solid).
    pub fn apply_build_work(&mut self, cell: IVec3, amount: f32) -> Option<bool> {
        let Some(Block::Blueprint { work_left }) = self.blocks.get_mut(&cell) else {
            return None;
        };
        *work_left -= amount;
        if *work_left > 0.0 {
            return Some(false);
        }
        self.blocks.insert(cell, Block::Solid { diggable: true, hardness: RUBBLE_HARDNESS });
        self.revision += 1;
        Some(true)
    }

    /// Apply digging work. None if the cell is not a diggable solid,
    /// Some(true) when this work cleared it.
    pub fn apply_dig_work(&mut self, cell: IVec3, amount: f32) -> Option<bool> {
        let Some(Block::Solid { diggable: true, hardness }) = self.blocks.get_mut(&cell) else {
            return None;
        };
        *hardness -= amount;
        if *hardness > 0.0 {
            return Some(false);
        }
        self.blocks.remove(&cell);
        self.revision += 1;
        Some(true)
    }

    // ------------------------------------------------------------------------
    // Landmarks
    // ------------------------------------------------------------------------

    pub fn add_landmark(&mut self, kind: LandmarkKind, cell: IVec3) {
        self.landmarks.push(Landmark { kind, cell });
        self.revision += 1;
    }

    pub fn remove_landmark(&mut self, kind: LandmarkKind, cell: IVec3) -> bool {
        let before = self.landmarks.len();
        self.landmarks.retain(|l| !(l.kind == kind && l.cell == cell));
        let removed = self.landmarks.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn landmarks(&self, kind: LandmarkKind) -> impl Iterator<Item = IVec3> + '_ {
        self.landmarks.iter().filter(move |l| l.kind == kind).map(|l| l.cell)
    }

    /// Walkable cells from which `target` is within reach.
    pub fn stations_around(&self, target: IVec3) -> Vec<IVec3> {
        let mut stations = Vec::new();
        for dy in [0, 1, -1] {
            for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let cell = target + IVec3::new(dx, dy, dz);
                if self.is_walkable(cell) {
                    stations.push(cell);
                }
            }
        }
        let above = target + IVec3::Y;
        if self.is_walkable(above) {
            stations.push(above);
        }
        stations
    }
}

/// Close enough to work on: a different cell at Chebyshev distance 1.
pub fn within_reach(from: IVec3, target: IVec3) -> bool {
    from != target && (from - target).abs().max_element() <= 1
}

// ============================================================================
// READ-ONLY CONTEXT
// ============================================================================

/// Read-only handle into game state, used by cost estimation and impossibility checks.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub world: &'a VoxelWorld,
    pub operables: &'a OperableSet,
}

impl<'a> WorldView<'a> {
    pub fn new(world: &'a VoxelWorld, operables: &'a OperableSet) -> Self {
        Self { world, operables }
    }
}
