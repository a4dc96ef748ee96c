//! Scheduling Tests
//! Validates the matching pass inside the full app: preemption, pruning, agent kinds, determinism.

use bevy::prelude::*;

use super::{TestColony, flat_world};
use crate::components::AgentKind;
use crate::messages::{DesignateMsg, WorkKind};
use crate::scheduler::{TaskEvent, TaskEventKind};
use crate::settings::SchedulerSettings;
use crate::task::{Priority, Task};
use crate::tasks::GoToTask;

fn go_to(cell: IVec3, priority: Priority) -> Task {
    Task::new(GoToTask::new(vec![cell])).with_priority(priority)
}

#[test]
fn urgent_task_preempts_once_after_dwell() {
    let settings = SchedulerSettings { min_dwell_ticks: 20, ..SchedulerSettings::default() };
    let mut t = TestColony::with_settings("scheduling-preempt", flat_world(), settings);
    let worker = t.spawn(AgentKind::Colonist, IVec3::new(0, 0, 0));
    let chore = t.register(go_to(IVec3::new(15, 0, 15), Priority::Low));
    t.expect_phase(2, "chore bound", |t| t.manager().agent_of(chore) == Some(worker));
    t.tick();

    let urgent = t.register(go_to(IVec3::new(0, 0, 3), Priority::High));
    t.tick();
    assert_eq!(t.manager().agent_of(chore), Some(worker));
    assert_eq!(t.manager().agent_of(urgent), None);

    // Phase 2: taken only once the chore has held the worker long enough
    t.expect_phase(25, "urgent task took the worker", |t| t.manager().agent_of(urgent) == Some(worker));
    let bound = t.events().iter().find(|e| e.task == chore && e.kind == TaskEventKind::Assigned).unwrap().tick;
    let stolen = t.events().iter().find(|e| e.task == chore && e.kind == TaskEventKind::Preempted).unwrap().tick;
    assert!(stolen - bound >= 20);

    // Phase 3: urgent done, chore back, no ping-pong on the way
    t.expect_phase(300, "urgent done", |t| t.manager().is_ended(urgent));
    t.expect_phase(3, "chore resumed", |t| t.manager().agent_of(chore) == Some(worker));
    t.run(50);
    assert_eq!(t.count_events(chore, TaskEventKind::Preempted), 1);
    assert_eq!(t.manager().stats().preemptions, 1);
}

#[test]
fn equal_priority_never_steals() {
    let settings = SchedulerSettings { min_dwell_ticks: 1, ..SchedulerSettings::default() };
    let mut t = TestColony::with_settings("scheduling-no-steal", flat_world(), settings);
    let worker = t.spawn(AgentKind::Colonist, IVec3::new(0, 0, 0));
    let first = t.register(go_to(IVec3::new(15, 0, 0), Priority::Medium));
    t.tick();
    let second = t.register(go_to(IVec3::new(0, 0, 1), Priority::Medium));
    t.run(20);
    assert_eq!(t.manager().agent_of(first), Some(worker));
    assert_eq!(t.manager().agent_of(second), None);
    assert_eq!(t.manager().stats().preemptions, 0);
}

#[test]
fn impossible_task_is_pruned_then_ended() {
    let mut t = TestColony::new("scheduling-prune", flat_world());
    t.spawn(AgentKind::Colonist, IVec3::new(1, 0, 1));
    let lost = t.register(go_to(IVec3::new(40, 0, 40), Priority::High));

    t.expect_phase(2, "pruned", |t| t.count_events(lost, TaskEventKind::Pruned) == 1);
    assert!(t.manager().agent_of(lost).is_none());
    t.expect_phase(2, "ended", |t| t.manager().is_ended(lost));
    t.run(3);
    assert_eq!(t.count_events(lost, TaskEventKind::Assigned), 0);
    assert_eq!(t.count_events(lost, TaskEventKind::Ended), 1);
    assert_eq!(t.manager().live_count(), 0);
}

#[test]
fn sentry_only_takes_work_where_it_stands() {
    let post = IVec3::new(6, 0, 6);
    let mut t = TestColony::new("scheduling-sentry", flat_world());
    let sentry = t.spawn(AgentKind::Sentry, post);
    let colonist = t.spawn(AgentKind::Colonist, IVec3::new(14, 0, 14));
    let away = t.register(go_to(IVec3::new(7, 0, 6), Priority::Medium));
    let here = t.register(go_to(post, Priority::Low));

    t.tick();
    assert_eq!(t.manager().agent_of(away), Some(colonist));
    assert!(t.manager().is_ended(here));
    assert_eq!(
        t.events().iter().find(|e| e.task == here && e.kind == TaskEventKind::Assigned).and_then(|e| e.agent),
        Some(sentry)
    );
    t.expect_phase(200, "colonist arrived", |t| t.manager().is_ended(away));
    assert_eq!(t.agent(sentry).occupied_cell(), post);
}

fn busy_colony() -> Vec<TaskEvent> {
    let mut world = flat_world();
    for cell in [IVec3::new(3, 0, 12), IVec3::new(12, 0, 3), IVec3::new(9, 0, 9)] {
        world.place_rubble(cell, 1.5);
    }
    world.fill_walls(IVec3::new(6, 0, 0), IVec3::new(6, 0, 10));
    let mut t = TestColony::new("scheduling-replay", world);
    for cell in [IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(15, 0, 15)] {
        t.spawn(AgentKind::Colonist, cell);
    }
    t.spawn(AgentKind::Drone, IVec3::new(8, 0, 1));
    for cell in [IVec3::new(3, 0, 12), IVec3::new(12, 0, 3), IVec3::new(9, 0, 9)] {
        t.send(DesignateMsg { cell, work: WorkKind::Dig, priority: Priority::Low });
    }
    for cell in [IVec3::new(2, 0, 5), IVec3::new(10, 0, 13)] {
        t.send(DesignateMsg { cell, work: WorkKind::Build, priority: Priority::Medium });
    }
    t.register(go_to(IVec3::new(14, 0, 1), Priority::High));
    t.run(400);
    t.events().to_vec()
}

#[test]
fn identical_runs_replay_identically() {
    let first = busy_colony();
    let second = busy_colony();
    assert!(first.iter().any(|e| e.kind == TaskEventKind::Ended));
    assert_eq!(first, second);
}
