use bevy::math::IVec3;

use crate::action::ActionResult;
use crate::agent::{Agent, AgentId};
use crate::path::PathCache;
use crate::scheduler::TaskControl;
use crate::task::{TaskBehavior, TaskEnv};
use crate::world::WorldView;

/// Walk to any one of several cells. Ends on arrival.
pub struct GoToTask {
    destinations: Vec<IVec3>,
    /// Restrict to one agent (move orders).
    only: Option<AgentId>,
    cache: PathCache,
}

impl GoToTask {
    pub fn new(destinations: Vec<IVec3>) -> Self {
        Self { destinations, only: None, cache: PathCache::default() }
    }

    pub fn for_agent(agent: AgentId, destinations: Vec<IVec3>) -> Self {
        Self { destinations, only: Some(agent), cache: PathCache::default() }
    }
}

impl TaskBehavior for GoToTask {
    fn label(&self) -> &'static str {
        "go-to"
    }

    fn estimate_cost(&self, agent: &Agent, view: WorldView<'_>) -> f32 {
        if self.only.is_some_and(|only| only != agent.id()) {
            return f32::INFINITY;
        }
        agent.estimate_path_cost(view.world, &self.destinations)
    }

    fn execute(&mut self, agent: &mut Agent, ctl: &mut TaskControl<'_>, env: &mut TaskEnv<'_>) -> ActionResult {
        let result = self.cache.step(agent, env, &self.destinations);
        match result {
            ActionResult::Done => {
                ctl.end();
            }
            // the one agent allowed has no route at all
            ActionResult::Stopped if self.only.is_some() && self.cache.search_failed() => {
                ctl.end();
                return ActionResult::Impossible;
            }
            _ => {}
        }
        result
    }

    fn is_strictly_impossible(&self, view: WorldView<'_>) -> bool {
        !self.destinations.iter().any(|cell| view.world.in_bounds(*cell))
    }
}
