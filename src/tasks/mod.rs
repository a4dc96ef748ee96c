//! Concrete tasks - The kinds of work the colony registers with the task manager

mod construction;
mod goto;
mod heal;
mod man;

pub use construction::*;
pub use goto::*;
pub use heal::*;
pub use man::*;

use bevy::math::IVec3;

use crate::action::ActionResult;
use crate::agent::Agent;
use crate::path::PathCache;
use crate::task::TaskEnv;
use crate::world::WorldView;

/// Walk toward any of `stations`. None once the agent stands on one,
/// otherwise the walking result for the task to return.
fn walk_to_station(
    cache: &mut PathCache,
    agent: &mut Agent,
    env: &TaskEnv<'_>,
    stations: &[IVec3],
) -> Option<ActionResult> {
    if stations.contains(&agent.occupied_cell()) {
        agent.move_target = None;
        return None;
    }
    match cache.step(agent, env, stations) {
        ActionResult::Done => None,
        walking => Some(walking),
    }
}

/// Matching cost to reach any station. No stations = can't.
fn station_cost(agent: &Agent, view: WorldView<'_>, stations: &[IVec3]) -> f32 {
    if stations.is_empty() {
        return f32::INFINITY;
    }
    agent.estimate_path_cost(view.world, stations)
}
