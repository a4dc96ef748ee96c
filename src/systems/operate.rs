//! Operable polling - Keep one manning task per operable that wants an operator

use bevy::prelude::*;

use crate::operable::OperableSet;
use crate::resources::ManningRequests;
use crate::scheduler::TaskManager;
use crate::task::Task;
use crate::tasks::ManTask;

pub fn poll_operables_system(
    operables: Res<OperableSet>,
    mut manager: ResMut<TaskManager>,
    mut requests: ResMut<ManningRequests>,
) {
    // forget ended tasks and withdraw requests for removed operables
    requests.0.retain(|id, (task, _)| {
        if manager.is_ended(*task) {
            return false;
        }
        if operables.contains(*id) {
            return true;
        }
        manager.remove_task(*task);
        false
    });

    for (id, operable) in operables.iter() {
        let wanted = operable.should_operate().filter(|_| !operable.is_destroyed());
        let current = requests.0.get(&id).copied();
        match (wanted, current) {
            (Some(priority), None) => {
                let task = manager.register_task(Task::new(ManTask::new(id)).with_priority(priority));
                requests.0.insert(id, (task, priority));
                debug!("{} {:?} wants an operator ({})", operable.label(), id, priority.name());
            }
            // re-post at the new priority, unless someone is already on it
            (Some(priority), Some((task, registered))) if priority != registered => {
                if manager.agent_of(task).is_none() {
                    manager.remove_task(task);
                    let task = manager.register_task(Task::new(ManTask::new(id)).with_priority(priority));
                    requests.0.insert(id, (task, priority));
                }
            }
            // no longer needed; manned tasks notice and end themselves
            (None, Some((task, _))) => {
                if manager.agent_of(task).is_none() {
                    manager.remove_task(task);
                    requests.0.remove(&id);
                }
            }
            _ => {}
        }
    }
}
