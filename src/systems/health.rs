//! Health systems - Damage, death, healing requests

use bevy::prelude::*;

use crate::agent::AgentPool;
use crate::messages::*;
use crate::resources::*;
use crate::scheduler::TaskManager;
use crate::settings::SchedulerSettings;
use crate::task::{Priority, Task};
use crate::tasks::HealTask;
use crate::world::{LandmarkKind, VoxelWorld};

pub fn damage_system(mut events: MessageReader<DamageMsg>, mut agents: ResMut<AgentPool>) {
    for event in events.read() {
        if let Some(agent) = agents.get_mut(event.agent) {
            agent.health.damage(event.amount);
        }
    }
}

/// Unbind and remove dead agents.
pub fn death_system(
    mut agents: ResMut<AgentPool>,
    mut manager: ResMut<TaskManager>,
    mut died: MessageWriter<AgentDiedMsg>,
) {
    let dead: Vec<_> = agents.iter().filter(|(_, a)| !a.is_alive()).map(|(id, _)| id).collect();
    for id in dead {
        manager.unassign_agent(id);
        let Some(agent) = agents.despawn(id) else { continue };
        info!("{} {:?} died at {:?}", agent.kind().name(), id, agent.occupied_cell());
        died.write(AgentDiedMsg { agent: id, kind: agent.kind(), cell: agent.occupied_cell() });
    }
}

/// Register a healing task for every agent below the health threshold,
/// as long as there is somewhere to heal.
pub fn request_healing_system(
    agents: Res<AgentPool>,
    world: Res<VoxelWorld>,
    settings: Res<SchedulerSettings>,
    mut manager: ResMut<TaskManager>,
    mut requests: ResMut<HealRequests>,
) {
    requests.0.retain(|patient, task| {
        if manager.is_ended(*task) {
            return false;
        }
        if agents.contains(*patient) {
            return true;
        }
        manager.remove_task(*task);
        false
    });

    if world.landmarks(LandmarkKind::HealingStation).next().is_none() {
        return;
    }
    for (id, agent) in agents.iter() {
        if requests.0.contains_key(&id) || agent.health.fraction() >= settings.heal_threshold {
            continue;
        }
        let task = manager.register_task(Task::new(HealTask::new(id)).with_priority(Priority::High));
        requests.0.insert(id, task);
        debug!("{:?} asked for healing ({:.0}%)", id, agent.health.fraction() * 100.0);
    }
}
