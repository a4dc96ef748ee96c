use bevy::math::IVec3;

use crate::action::ActionResult;
use crate::agent::{Agent, AgentId};
use crate::constants::HEAL_RATE;
use crate::path::PathCache;
use crate::scheduler::TaskControl;
use crate::task::{TaskBehavior, TaskEnv};
use crate::world::{LandmarkKind, WorldView};

use super::{station_cost, walk_to_station};

/// Get `patient` onto a healing station and keep it there until health is full.
/// Arriving is not the end: the task holds position and heals every tick.
pub struct HealTask {
    patient: AgentId,
    cache: PathCache,
}

impl HealTask {
    pub fn new(patient: AgentId) -> Self {
        Self { patient, cache: PathCache::default() }
    }
}

impl TaskBehavior for HealTask {
    fn label(&self) -> &'static str {
        "heal"
    }

    fn estimate_cost(&self, agent: &Agent, view: WorldView<'_>) -> f32 {
        if agent.id() != self.patient {
            return f32::INFINITY;
        }
        let stations: Vec<IVec3> = view.world.landmarks(LandmarkKind::HealingStation).collect();
        station_cost(agent, view, &stations)
    }

    fn execute(&mut self, agent: &mut Agent, ctl: &mut TaskControl<'_>, env: &mut TaskEnv<'_>) -> ActionResult {
        let stations: Vec<IVec3> = env.world.landmarks(LandmarkKind::HealingStation).collect();
        if stations.is_empty() {
            ctl.end();
            return ActionResult::Impossible;
        }
        if let Some(walking) = walk_to_station(&mut self.cache, agent, env, &stations) {
            return walking;
        }

        agent.health.heal(HEAL_RATE * env.dt);
        if agent.health.is_full() {
            ctl.end();
        }
        ActionResult::Done
    }

    fn is_strictly_impossible(&self, view: WorldView<'_>) -> bool {
        view.world.landmarks(LandmarkKind::HealingStation).next().is_none()
    }
}
