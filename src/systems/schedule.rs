//! Scheduling systems - Matching pass, then task execution

use bevy::prelude::*;

use crate::agent::AgentPool;
use crate::operable::OperableSet;
use crate::resources::SimClock;
use crate::scheduler::TaskManager;
use crate::settings::SchedulerSettings;
use crate::task::TaskEnv;
use crate::world::{VoxelWorld, WorldView};

pub fn assign_tasks_system(
    clock: Res<SimClock>,
    agents: Res<AgentPool>,
    world: Res<VoxelWorld>,
    operables: Res<OperableSet>,
    mut manager: ResMut<TaskManager>,
) {
    manager.assign(clock.tick, &agents, WorldView::new(&world, &operables));
}

/// Agent bookkeeping for everyone, then one step of every bound task.
pub fn execute_tasks_system(
    clock: Res<SimClock>,
    settings: Res<SchedulerSettings>,
    mut agents: ResMut<AgentPool>,
    mut world: ResMut<VoxelWorld>,
    mut operables: ResMut<OperableSet>,
    mut manager: ResMut<TaskManager>,
) {
    for agent in agents.iter_mut() {
        agent.core_update(clock.dt);
        agent.update(manager.task_of(agent.id()).is_some());
    }
    let mut env = TaskEnv::new(
        &mut world,
        &mut operables,
        clock.dt,
        clock.tick,
        settings.replan_backoff_ticks,
    );
    manager.execute(&mut agents, &mut env);
}
