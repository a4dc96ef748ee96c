use crate::action::ActionResult;
use crate::agent::{Agent, AgentId};
use crate::operable::OperableId;
use crate::path::PathCache;
use crate::scheduler::TaskControl;
use crate::task::{TaskBehavior, TaskEnv};
use crate::world::WorldView;

use super::{station_cost, walk_to_station};

/// Crew an operable: walk next to it, start operating, keep operating until it no
/// longer wants an operator. `end_operation` runs from the release hook, so it
/// fires exactly once per manning session however the task loses its agent.
pub struct ManTask {
    operable: OperableId,
    cache: PathCache,
    /// Agent currently registered with the operable through this task.
    manning: Option<AgentId>,
}

impl ManTask {
    pub fn new(operable: OperableId) -> Self {
        Self { operable, cache: PathCache::default(), manning: None }
    }
}

impl TaskBehavior for ManTask {
    fn label(&self) -> &'static str {
        "man"
    }

    fn estimate_cost(&self, agent: &Agent, view: WorldView<'_>) -> f32 {
        let Some(operable) = view.operables.get(self.operable) else {
            return f32::INFINITY;
        };
        if operable.is_destroyed() || operable.operator().is_some_and(|crew| crew != agent.id()) {
            return f32::INFINITY;
        }
        station_cost(agent, view, &view.world.stations_around(operable.position()))
    }

    fn execute(&mut self, agent: &mut Agent, ctl: &mut TaskControl<'_>, env: &mut TaskEnv<'_>) -> ActionResult {
        let Some(operable) = env.operables.get(self.operable) else {
            ctl.end();
            return ActionResult::Impossible;
        };
        if operable.is_destroyed() {
            ctl.end();
            return ActionResult::Impossible;
        }
        if operable.should_operate().is_none() {
            ctl.end();
            return ActionResult::Done;
        }
        let stations = env.world.stations_around(operable.position());
        if let Some(walking) = walk_to_station(&mut self.cache, agent, env, &stations) {
            return walking;
        }

        let Some(operable) = env.operables.get_mut(self.operable) else {
            ctl.end();
            return ActionResult::Impossible;
        };
        if self.manning.is_none() {
            operable.start_operation(agent.id());
            if operable.operator() != Some(agent.id()) {
                // somebody else got there first
                return ActionResult::Stopped;
            }
            self.manning = Some(agent.id());
        }

        let result = agent.operate_operable(operable, env.dt);
        if result.is_final() {
            ctl.end();
        } else if result == ActionResult::Stopped {
            self.cache.invalidate();
        }
        result
    }

    fn is_strictly_impossible(&self, view: WorldView<'_>) -> bool {
        match view.operables.get(self.operable) {
            None => true,
            Some(operable) => operable.is_destroyed() || view.world.stations_around(operable.position()).is_empty(),
        }
    }

    fn on_release(&mut self, _agent: AgentId, env: &mut TaskEnv<'_>) {
        if self.manning.take().is_none() {
            return;
        }
        if let Some(operable) = env.operables.get_mut(self.operable) {
            operable.end_operation();
        }
    }
}
