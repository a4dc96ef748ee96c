//! Drain systems - Advance the clock and turn incoming commands into state

use bevy::prelude::*;

use crate::agent::AgentPool;
use crate::constants::DEFAULT_BLUEPRINT_WORK;
use crate::messages::*;
use crate::resources::*;
use crate::scheduler::TaskManager;
use crate::task::{Priority, Task};
use crate::tasks::{BuildTask, DigTask, GoToTask};
use crate::world::{Block, VoxelWorld};

pub fn advance_clock_system(mut clock: ResMut<SimClock>) {
    clock.tick += 1;
}

pub fn spawn_agents_system(mut events: MessageReader<SpawnAgentMsg>, mut agents: ResMut<AgentPool>) {
    for event in events.read() {
        let id = agents.spawn(event.kind, event.cell);
        debug!("spawned {} {:?} at {:?}", event.kind.name(), id, event.cell);
    }
}

/// Mark cells for construction or digging. One live task per cell.
pub fn designate_work_system(
    mut events: MessageReader<DesignateMsg>,
    mut world: ResMut<VoxelWorld>,
    mut manager: ResMut<TaskManager>,
    mut designations: ResMut<Designations>,
) {
    designations.0.retain(|_, task| !manager.is_ended(*task));

    for event in events.read() {
        if designations.0.contains_key(&event.cell) {
            continue;
        }
        let task = match event.work {
            WorkKind::Build => {
                let placed = world.place_blueprint(event.cell, DEFAULT_BLUEPRINT_WORK)
                    || matches!(world.block(event.cell), Some(Block::Blueprint { .. }));
                if !placed {
                    warn!("can't build at {:?}: cell is occupied or out of bounds", event.cell);
                    continue;
                }
                Task::new(BuildTask::new(event.cell))
            }
            WorkKind::Dig => {
                if !matches!(world.block(event.cell), Some(Block::Solid { diggable: true, .. })) {
                    warn!("can't dig at {:?}: nothing diggable there", event.cell);
                    continue;
                }
                Task::new(DigTask::new(event.cell))
            }
        };
        let id = manager.register_task(task.with_priority(event.priority));
        designations.0.insert(event.cell, id);
    }
}

/// Player move orders take the agent off its current task and pin it to the walk.
/// The latest order wins: an agent's earlier order still on the board is ended.
pub fn move_order_system(
    mut events: MessageReader<MoveOrderMsg>,
    agents: Res<AgentPool>,
    mut manager: ResMut<TaskManager>,
    mut orders: ResMut<MoveOrders>,
) {
    orders.0.retain(|agent, task| agents.contains(*agent) && !manager.is_ended(*task));

    for event in events.read() {
        if !agents.contains(event.agent) {
            continue;
        }
        if let Some(stale) = orders.0.remove(&event.agent) {
            manager.remove_task(stale);
            debug!("{:?} order {:?} replaced", event.agent, stale);
        }
        if let Some(previous) = manager.unassign_agent(event.agent) {
            info!("{:?} ordered off {:?}", event.agent, previous);
        }
        let order = GoToTask::for_agent(event.agent, vec![event.cell]);
        let id = manager.register_task(Task::new(order).with_priority(Priority::High).not_reassignable());
        orders.0.insert(event.agent, id);
    }
}
