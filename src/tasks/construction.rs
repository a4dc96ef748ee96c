use bevy::math::IVec3;

use crate::action::ActionResult;
use crate::agent::Agent;
use crate::path::PathCache;
use crate::scheduler::TaskControl;
use crate::task::{TaskBehavior, TaskEnv};
use crate::world::{Block, WorldView};

use super::{station_cost, walk_to_station};

// ============================================================================
// BUILD
// ============================================================================

/// Walk next to a blueprint and build it.
pub struct BuildTask {
    cell: IVec3,
    cache: PathCache,
}

impl BuildTask {
    pub fn new(cell: IVec3) -> Self {
        Self { cell, cache: PathCache::default() }
    }
}

impl TaskBehavior for BuildTask {
    fn label(&self) -> &'static str {
        "build"
    }

    fn estimate_cost(&self, agent: &Agent, view: WorldView<'_>) -> f32 {
        if agent.work_rate() <= 0.0 {
            return f32::INFINITY;
        }
        station_cost(agent, view, &view.world.stations_around(self.cell))
    }

    fn execute(&mut self, agent: &mut Agent, ctl: &mut TaskControl<'_>, env: &mut TaskEnv<'_>) -> ActionResult {
        match env.world.block(self.cell) {
            Some(Block::Blueprint { .. }) => {}
            Some(Block::Solid { .. }) => {
                ctl.end();
                return ActionResult::Done;
            }
            None => {
                ctl.end();
                return ActionResult::Impossible;
            }
        }
        let stations = env.world.stations_around(self.cell);
        if let Some(walking) = walk_to_station(&mut self.cache, agent, env, &stations) {
            return walking;
        }

        let result = agent.work_buildable(env.world, self.cell, env.dt);
        if result.is_final() {
            ctl.end();
        } else if result == ActionResult::Stopped {
            self.cache.invalidate();
        }
        result
    }

    /// Nothing left to build, or nowhere to stand while building.
    fn is_strictly_impossible(&self, view: WorldView<'_>) -> bool {
        !matches!(view.world.block(self.cell), Some(Block::Blueprint { .. }))
            || view.world.stations_around(self.cell).is_empty()
    }
}

// ============================================================================
// DIG
// ============================================================================

/// Walk next to a diggable block and dig it out.
pub struct DigTask {
    cell: IVec3,
    cache: PathCache,
}

impl DigTask {
    pub fn new(cell: IVec3) -> Self {
        Self { cell, cache: PathCache::default() }
    }
}

impl TaskBehavior for DigTask {
    fn label(&self) -> &'static str {
        "dig"
    }

    fn estimate_cost(&self, agent: &Agent, view: WorldView<'_>) -> f32 {
        if agent.work_rate() <= 0.0 {
            return f32::INFINITY;
        }
        station_cost(agent, view, &view.world.stations_around(self.cell))
    }

    fn execute(&mut self, agent: &mut Agent, ctl: &mut TaskControl<'_>, env: &mut TaskEnv<'_>) -> ActionResult {
        match env.world.block(self.cell) {
            Some(Block::Solid { diggable: true, .. }) => {}
            None => {
                ctl.end();
                return ActionResult::Done;
            }
            Some(_) => {
                ctl.end();
                return ActionResult::Impossible;
            }
        }
        let stations = env.world.stations_around(self.cell);
        if let Some(walking) = walk_to_station(&mut self.cache, agent, env, &stations) {
            return walking;
        }

        let result = agent.work_diggable(env.world, self.cell, env.dt);
        if result.is_final() {
            ctl.end();
        } else if result == ActionResult::Stopped {
            self.cache.invalidate();
        }
        result
    }

    fn is_strictly_impossible(&self, view: WorldView<'_>) -> bool {
        !matches!(view.world.block(self.cell), Some(Block::Solid { diggable: true, .. }))
            || view.world.stations_around(self.cell).is_empty()
    }
}
