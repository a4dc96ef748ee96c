//! Tasks - Priority, the behaviour contract, and the handles a task sees while running

use serde::{Deserialize, Serialize};

use crate::action::ActionResult;
use crate::agent::{Agent, AgentId};
use crate::operable::OperableSet;
use crate::scheduler::TaskControl;
use crate::world::{VoxelWorld, WorldView};

slotmap::new_key_type! {
    /// Generational handle to a registered task.
    pub struct TaskId;
}

/// Task urgency. Higher strictly dominates lower during matching, whatever the cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
}

impl Priority {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

// ============================================================================
// BEHAVIOUR CONTRACT
// ============================================================================

/// What a kind of task does. Private task memory lives in the implementing struct.
pub trait TaskBehavior: Send + Sync {
    fn label(&self) -> &'static str;

    /// Cost for `agent` to take this task. `f32::INFINITY` means this agent can't.
    /// Must not mutate anything: it runs for every idle agent during matching.
    fn estimate_cost(&self, agent: &Agent, view: WorldView<'_>) -> f32;

    /// One tick of work. `ctl` ends or unassigns the task; once either is called the
    /// body must return without touching the world again.
    fn execute(&mut self, agent: &mut Agent, ctl: &mut TaskControl<'_>, env: &mut TaskEnv<'_>) -> ActionResult;

    /// True when no agent could ever perform this task. Must not depend on any agent.
    fn is_strictly_impossible(&self, _view: WorldView<'_>) -> bool {
        false
    }

    /// Called once each time the task loses its agent (unassign, preemption, end).
    fn on_release(&mut self, _agent: AgentId, _env: &mut TaskEnv<'_>) {}
}

/// Registration bundle: a behaviour plus the scheduling attributes fixed at creation.
pub struct Task {
    pub(crate) behavior: Box<dyn TaskBehavior>,
    pub(crate) priority: Priority,
    pub(crate) reassignable: bool,
}

impl Task {
    pub fn new(behavior: impl TaskBehavior + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
            priority: Priority::Medium,
            reassignable: true,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Keep the agent once assigned, even when higher-priority work shows up.
    pub fn not_reassignable(mut self) -> Self {
        self.reassignable = false;
        self
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn label(&self) -> &'static str {
        self.behavior.label()
    }
}

// ============================================================================
// EXECUTION ENVIRONMENT
// ============================================================================

/// Mutable game state a running task may touch.
pub struct TaskEnv<'a> {
    pub world: &'a mut VoxelWorld,
    pub operables: &'a mut OperableSet,
    pub dt: f32,
    pub tick: u64,
    /// Ticks to wait before repeating a path search that found nothing.
    pub replan_backoff_ticks: u64,
}

impl<'a> TaskEnv<'a> {
    pub fn new(
        world: &'a mut VoxelWorld,
        operables: &'a mut OperableSet,
        dt: f32,
        tick: u64,
        replan_backoff_ticks: u64,
    ) -> Self {
        Self { world, operables, dt, tick, replan_backoff_ticks }
    }

    pub fn view(&self) -> WorldView<'_> {
        WorldView::new(self.world, self.operables)
    }
}
