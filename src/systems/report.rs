//! Report system - Publish scheduler events as messages

use bevy::prelude::*;

use crate::messages::TaskEventMsg;
use crate::scheduler::{TaskEventKind, TaskManager};

pub fn publish_task_events_system(mut manager: ResMut<TaskManager>, mut out: MessageWriter<TaskEventMsg>) {
    for event in manager.drain_events() {
        match event.kind {
            TaskEventKind::Preempted | TaskEventKind::Pruned => {
                info!("[tick {}] {} {:?} {:?} (agent {:?})", event.tick, event.label, event.task, event.kind, event.agent)
            }
            _ => debug!("[tick {}] {} {:?} {:?} (agent {:?})", event.tick, event.label, event.task, event.kind, event.agent),
        }
        out.write(TaskEventMsg(event));
    }
}
