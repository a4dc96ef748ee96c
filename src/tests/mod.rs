//! Scenario Tests - Headless colony runs checked tick by tick.
//!
//! Each file in src/tests/ drives a `TestColony` through numbered phases. Every tick
//! the harness re-checks the binding invariants, so a scenario only states what its
//! phases are waiting for.

mod scheduling;

use bevy::app::TaskPoolPlugin;
use bevy::prelude::*;
use hashbrown::HashMap;

use crate::agent::{Agent, AgentId, AgentPool};
use crate::components::AgentKind;
use crate::messages::TaskEventMsg;
use crate::operable::OperableSet;
use crate::scheduler::{TaskEvent, TaskEventKind, TaskManager};
use crate::settings::SchedulerSettings;
use crate::task::{Task, TaskId};
use crate::world::VoxelWorld;
use crate::{Step, build_app};

// ============================================================================
// EVENT LOG
// ============================================================================

/// Every task event published so far.
#[derive(Resource, Default)]
pub struct EventLog(pub Vec<TaskEvent>);

fn record_events_system(mut events: MessageReader<TaskEventMsg>, mut log: ResMut<EventLog>) {
    log.0.extend(events.read().map(|msg| msg.0));
}

// ============================================================================
// TEST COLONY
// ============================================================================

/// A headless app plus phase bookkeeping.
pub struct TestColony {
    pub app: App,
    pub name: &'static str,
    pub phase: u32,
    pub ticks: u64,
    pub counters: HashMap<&'static str, u32>,
}

impl TestColony {
    pub fn new(name: &'static str, world: VoxelWorld) -> Self {
        Self::with_settings(name, world, SchedulerSettings::default())
    }

    pub fn with_settings(name: &'static str, world: VoxelWorld, settings: SchedulerSettings) -> Self {
        let mut app = App::new();
        app.add_plugins(TaskPoolPlugin::default());
        app.insert_resource(settings);
        app.insert_resource(world);
        build_app(&mut app);
        app.init_resource::<EventLog>();
        app.add_systems(Update, record_events_system.after(Step::Report));
        Self { app, name, phase: 1, ticks: 0, counters: HashMap::new() }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    pub fn spawn(&mut self, kind: AgentKind, cell: IVec3) -> AgentId {
        self.app.world_mut().resource_mut::<AgentPool>().spawn(kind, cell)
    }

    pub fn register(&mut self, task: Task) -> TaskId {
        self.app.world_mut().resource_mut::<TaskManager>().register_task(task)
    }

    pub fn send<M: Message>(&mut self, msg: M) {
        self.app.world_mut().write_message(msg);
    }

    // ------------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------------

    pub fn manager(&self) -> &TaskManager {
        self.app.world().resource::<TaskManager>()
    }

    pub fn manager_mut(&mut self) -> Mut<'_, TaskManager> {
        self.app.world_mut().resource_mut::<TaskManager>()
    }

    pub fn agents(&self) -> &AgentPool {
        self.app.world().resource::<AgentPool>()
    }

    pub fn agent(&self, id: AgentId) -> &Agent {
        self.agents().get(id).expect("agent should exist")
    }

    pub fn world(&self) -> &VoxelWorld {
        self.app.world().resource::<VoxelWorld>()
    }

    pub fn world_mut(&mut self) -> Mut<'_, VoxelWorld> {
        self.app.world_mut().resource_mut::<VoxelWorld>()
    }

    pub fn operables_mut(&mut self) -> Mut<'_, OperableSet> {
        self.app.world_mut().resource_mut::<OperableSet>()
    }

    pub fn events(&self) -> &[TaskEvent] {
        &self.app.world().resource::<EventLog>().0
    }

    pub fn count_events(&self, task: TaskId, kind: TaskEventKind) -> usize {
        self.events().iter().filter(|e| e.task == task && e.kind == kind).count()
    }

    pub fn inc(&mut self, key: &'static str) {
        *self.counters.entry(key).or_insert(0) += 1;
    }

    pub fn count(&self, key: &'static str) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Running
    // ------------------------------------------------------------------------

    pub fn tick(&mut self) {
        self.app.update();
        self.ticks += 1;
        self.check_invariants();
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Tick until `reached` holds, failing the phase after `max_ticks`.
    pub fn expect_phase(&mut self, max_ticks: u64, message: &str, mut reached: impl FnMut(&Self) -> bool) {
        for _ in 0..max_ticks {
            if reached(self) {
                self.pass_phase(message);
                return;
            }
            self.tick();
        }
        if reached(self) {
            self.pass_phase(message);
            return;
        }
        self.fail_phase(message);
    }

    pub fn pass_phase(&mut self, message: &str) {
        info!("{}: Phase {} PASS at tick {} - {}", self.name, self.phase, self.ticks, message);
        self.phase += 1;
    }

    pub fn fail_phase(&self, message: &str) -> ! {
        panic!("{}: Phase {} FAIL at tick {} - {}", self.name, self.phase, self.ticks, message);
    }

    /// Bindings mirror each other, no ended task holds an agent, every bound agent exists.
    fn check_invariants(&self) {
        let manager = self.manager();
        if !manager.bindings_consistent() {
            self.fail_phase("binding maps disagree");
        }
        for (task, agent) in manager.bindings() {
            if !self.agents().contains(agent) {
                self.fail_phase(&format!("{task:?} bound to missing {agent:?}"));
            }
            if manager.is_ended(task) {
                self.fail_phase(&format!("ended {task:?} still bound"));
            }
        }
    }
}

/// Flat floor, 16 x 4 x 16.
pub fn flat_world() -> VoxelWorld {
    VoxelWorld::new(IVec3::new(16, 4, 16))
}
