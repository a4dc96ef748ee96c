//! Task Manager - Job board, agent/task bindings, and the per-tick matching pass
//!
//! The binding between a task and its agent lives only here, in two maps kept
//! mirror-consistent by `bind`/`sever`. Nothing else writes it.
//!
//! Per tick:
//! 1. `assign`: retire pruned tasks, drop garbage, prune impossible tasks, greedy
//!    matching of idle agents, then preemption for still-waiting tasks.
//! 2. `execute`: release hooks, then one `TaskBehavior::execute` per bound agent
//!    in spawn order, interpreting each result.

use std::collections::VecDeque;

use bevy::prelude::{FromWorld, Resource, World};
use hashbrown::{HashMap, HashSet};
use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::action::ActionResult;
use crate::agent::{Agent, AgentId, AgentPool};
use crate::settings::SchedulerSettings;
use crate::task::{Priority, Task, TaskBehavior, TaskEnv, TaskId};
use crate::world::WorldView;

/// Oldest events are dropped past this when nobody drains the buffer.
const MAX_BUFFERED_EVENTS: usize = 4096;

// ============================================================================
// RECORDS AND EVENTS
// ============================================================================

struct TaskRecord {
    label: &'static str,
    priority: Priority,
    reassignable: bool,
    seq: u64,
    assigned_at: u64,
    ended: bool,
    pruned_at: Option<u64>,
    /// (agent, until tick) per agent that stopped on this task; not offered it again until then.
    cooldowns: Vec<(AgentId, u64)>,
    /// Taken out while the task executes.
    behavior: Option<Box<dyn TaskBehavior>>,
}

impl TaskRecord {
    fn cooling_down(&self, agent: AgentId, tick: u64) -> bool {
        self.cooldowns.iter().any(|&(who, until)| who == agent && tick < until)
    }

    fn cool_down(&mut self, agent: AgentId, tick: u64, until: u64) {
        self.cooldowns.retain(|&(who, expires)| who != agent && tick < expires);
        self.cooldowns.push((agent, until));
    }

    fn is_open(&self) -> bool {
        !self.ended && self.pruned_at.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskEventKind {
    Registered,
    Assigned,
    Unassigned,
    Preempted,
    Pruned,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskEvent {
    pub tick: u64,
    pub task: TaskId,
    pub agent: Option<AgentId>,
    pub kind: TaskEventKind,
    pub label: &'static str,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub passes: u64,
    pub registered: u64,
    pub assignments: u64,
    pub preemptions: u64,
    pub pruned: u64,
    pub ended: u64,
}

#[derive(Clone, Copy, Debug)]
struct Release {
    task: TaskId,
    agent: AgentId,
}

#[derive(Clone, Copy, Debug)]
struct Offer {
    task: TaskId,
    agent: AgentId,
    priority: Priority,
    cost: f32,
    seq: u64,
    rank: usize,
}

/// NaN means "can't", negative costs are clamped to free.
fn sanitize_cost(cost: f32) -> f32 {
    if cost.is_nan() { f32::INFINITY } else { cost.max(0.0) }
}

// ============================================================================
// TASK MANAGER
// ============================================================================

#[derive(Resource)]
pub struct TaskManager {
    tasks: SlotMap<TaskId, TaskRecord>,
    /// Registration order. Compacted at the start of each pass.
    order: Vec<TaskId>,
    task_agent: HashMap<TaskId, AgentId>,
    agent_task: HashMap<AgentId, TaskId>,
    released: Vec<Release>,
    events: VecDeque<TaskEvent>,
    stats: SchedulerStats,
    next_seq: u64,
    tick: u64,
    min_dwell_ticks: u64,
    stopped_retry_ticks: u64,
    allow_preemption: bool,
}

impl FromWorld for TaskManager {
    fn from_world(world: &mut World) -> Self {
        let settings = world.get_resource::<SchedulerSettings>().cloned().unwrap_or_default();
        Self::new(&settings)
    }
}

impl TaskManager {
    pub fn new(settings: &SchedulerSettings) -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: Vec::new(),
            task_agent: HashMap::new(),
            agent_task: HashMap::new(),
            released: Vec::new(),
            events: VecDeque::new(),
            stats: SchedulerStats::default(),
            next_seq: 0,
            tick: 0,
            min_dwell_ticks: settings.min_dwell_ticks,
            stopped_retry_ticks: settings.stopped_retry_ticks,
            allow_preemption: settings.allow_preemption,
        }
    }

    // ------------------------------------------------------------------------
    // Binding operations
    // ------------------------------------------------------------------------

    /// Add a task to the board, unassigned.
    pub fn register_task(&mut self, task: Task) -> TaskId {
        let Task { behavior, priority, reassignable } = task;
        let label = behavior.label();
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.tasks.insert(TaskRecord {
            label,
            priority,
            reassignable,
            seq,
            assigned_at: 0,
            ended: false,
            pruned_at: None,
            cooldowns: Vec::new(),
            behavior: Some(behavior),
        });
        self.order.push(id);
        self.stats.registered += 1;
        self.emit(id, None, TaskEventKind::Registered);
        debug!("registered {} {:?} ({})", label, id, priority.name());
        id
    }

    /// Free the agent. Its task stays on the board, open for matching.
    pub fn unassign_agent(&mut self, agent: AgentId) -> Option<TaskId> {
        let task = *self.agent_task.get(&agent)?;
        self.sever(task, TaskEventKind::Unassigned);
        Some(task)
    }

    /// Free the task's agent, if any. The task stays on the board.
    pub fn unassign_task(&mut self, task: TaskId) -> Option<AgentId> {
        self.sever(task, TaskEventKind::Unassigned)
    }

    /// End a task for good. Returns false if it was already ended or unknown.
    pub fn remove_task(&mut self, task: TaskId) -> bool {
        let Some(record) = self.tasks.get_mut(task) else {
            return false;
        };
        if record.ended {
            return false;
        }
        record.ended = true;
        let label = record.label;
        let agent = self.sever(task, TaskEventKind::Unassigned);
        self.stats.ended += 1;
        self.emit(task, agent, TaskEventKind::Ended);
        info!("{} {:?} ended", label, task);
        true
    }

    fn bind(&mut self, task: TaskId, agent: AgentId) {
        debug_assert!(!self.task_agent.contains_key(&task), "{task:?} already bound");
        debug_assert!(!self.agent_task.contains_key(&agent), "{agent:?} already bound");
        let Some(record) = self.tasks.get_mut(task) else {
            return;
        };
        debug_assert!(!record.ended, "binding ended task {task:?}");
        record.assigned_at = self.tick;
        self.task_agent.insert(task, agent);
        self.agent_task.insert(agent, task);
        self.stats.assignments += 1;
        self.emit(task, Some(agent), TaskEventKind::Assigned);
        debug!("bound {:?} -> {:?}", task, agent);
    }

    /// Remove a binding from both maps and queue its release hook.
    fn sever(&mut self, task: TaskId, kind: TaskEventKind) -> Option<AgentId> {
        let agent = self.task_agent.remove(&task)?;
        let mirrored = self.agent_task.remove(&agent);
        debug_assert_eq!(mirrored, Some(task), "binding maps disagree for {task:?}");
        self.released.push(Release { task, agent });
        self.emit(task, Some(agent), kind);
        debug!("unbound {:?} from {:?}", task, agent);
        Some(agent)
    }

    /// Stop offering a task. The manager ends it at the start of the next pass.
    fn prune(&mut self, task: TaskId) {
        let Some(record) = self.tasks.get_mut(task) else {
            return;
        };
        if !record.is_open() {
            return;
        }
        record.pruned_at = Some(self.tick);
        let label = record.label;
        self.stats.pruned += 1;
        let agent = self.sever(task, TaskEventKind::Unassigned);
        self.emit(task, agent, TaskEventKind::Pruned);
        info!("{} {:?} is impossible, pruned", label, task);
    }

    fn emit(&mut self, task: TaskId, agent: Option<AgentId>, kind: TaskEventKind) {
        let label = self.tasks.get(task).map_or("?", |r| r.label);
        if self.events.len() >= MAX_BUFFERED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(TaskEvent { tick: self.tick, task, agent, kind, label });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn task_of(&self, agent: AgentId) -> Option<TaskId> {
        self.agent_task.get(&agent).copied()
    }

    pub fn agent_of(&self, task: TaskId) -> Option<AgentId> {
        self.task_agent.get(&task).copied()
    }

    /// Unknown (already collected) tasks count as ended.
    pub fn is_ended(&self, task: TaskId) -> bool {
        self.tasks.get(task).is_none_or(|r| r.ended)
    }

    /// Not ended and bound to an agent.
    pub fn is_active(&self, task: TaskId) -> bool {
        !self.is_ended(task) && self.task_agent.contains_key(&task)
    }

    pub fn is_pruned(&self, task: TaskId) -> bool {
        self.tasks.get(task).is_some_and(|r| r.pruned_at.is_some())
    }

    pub fn priority(&self, task: TaskId) -> Option<Priority> {
        self.tasks.get(task).map(|r| r.priority)
    }

    pub fn label(&self, task: TaskId) -> Option<&'static str> {
        self.tasks.get(task).map(|r| r.label)
    }

    /// Tasks not yet ended.
    pub fn live_count(&self) -> usize {
        self.tasks.values().filter(|r| !r.ended).count()
    }

    pub fn assigned_count(&self) -> usize {
        self.task_agent.len()
    }

    /// Unbound, unended, unpruned tasks in registration order.
    pub fn open_tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.order.iter().copied().filter(|id| {
            !self.task_agent.contains_key(id) && self.tasks.get(*id).is_some_and(TaskRecord::is_open)
        })
    }

    pub fn bindings(&self) -> impl Iterator<Item = (TaskId, AgentId)> + '_ {
        self.task_agent.iter().map(|(t, a)| (*t, *a))
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn drain_events(&mut self) -> Vec<TaskEvent> {
        self.events.drain(..).collect()
    }

    /// Both maps mirror each other and no ended task holds an agent.
    pub fn bindings_consistent(&self) -> bool {
        self.task_agent.len() == self.agent_task.len()
            && self.task_agent.iter().all(|(task, agent)| {
                self.agent_task.get(agent) == Some(task) && !self.is_ended(*task)
            })
    }

    // ------------------------------------------------------------------------
    // Matching pass
    // ------------------------------------------------------------------------

    /// Match idle agents to open tasks. All binding changes for the tick happen here.
    pub fn assign(&mut self, tick: u64, agents: &AgentPool, view: WorldView<'_>) {
        self.tick = tick;
        self.stats.passes += 1;
        self.drop_missing_agents(agents);
        self.retire_pruned();
        self.collect_garbage();

        // global pruning first, so impossible tasks never reach any agent
        let mut candidates = Vec::new();
        let open: Vec<TaskId> = self.open_tasks().collect();
        for task in open {
            let impossible = self
                .tasks
                .get(task)
                .and_then(|r| r.behavior.as_deref())
                .is_some_and(|b| b.is_strictly_impossible(view));
            if impossible {
                self.prune(task);
            } else {
                candidates.push(task);
            }
        }

        let idle: Vec<AgentId> = agents
            .iter()
            .filter(|(id, agent)| agent.is_alive() && !self.agent_task.contains_key(id))
            .map(|(id, _)| id)
            .collect();
        let mut offers = self.collect_offers(&candidates, &idle, agents, view);
        offers.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.cost.total_cmp(&b.cost))
                .then(a.seq.cmp(&b.seq))
                .then(a.rank.cmp(&b.rank))
        });
        for offer in offers {
            if self.task_agent.contains_key(&offer.task) || self.agent_task.contains_key(&offer.agent) {
                continue;
            }
            self.bind(offer.task, offer.agent);
        }

        if self.allow_preemption {
            self.preempt(&candidates, agents, view);
        }
    }

    fn collect_offers(&self, tasks: &[TaskId], idle: &[AgentId], agents: &AgentPool, view: WorldView<'_>) -> Vec<Offer> {
        let mut offers = Vec::new();
        for &task in tasks {
            let Some(record) = self.tasks.get(task) else { continue };
            let Some(behavior) = record.behavior.as_deref() else { continue };
            for (rank, &agent_id) in idle.iter().enumerate() {
                if record.cooling_down(agent_id, self.tick) {
                    continue;
                }
                let Some(agent) = agents.get(agent_id) else { continue };
                let cost = sanitize_cost(behavior.estimate_cost(agent, view));
                if cost.is_finite() {
                    offers.push(Offer { task, agent: agent_id, priority: record.priority, cost, seq: record.seq, rank });
                }
            }
        }
        offers
    }

    /// Let still-waiting tasks take agents from strictly lower-priority work that
    /// has been bound for at least the dwell time.
    fn preempt(&mut self, candidates: &[TaskId], agents: &AgentPool, view: WorldView<'_>) {
        let mut waiting: Vec<(Priority, u64, TaskId)> = candidates
            .iter()
            .filter(|task| !self.task_agent.contains_key(*task))
            .filter_map(|task| self.tasks.get(*task).map(|r| (r.priority, r.seq, *task)))
            .filter(|(priority, _, _)| *priority > Priority::Low)
            .collect();
        waiting.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (_, _, task) in waiting {
            let Some((victim, agent)) = self.pick_victim(task, agents, view) else {
                continue;
            };
            self.sever(victim, TaskEventKind::Preempted);
            self.stats.preemptions += 1;
            self.bind(task, agent);
            info!("{:?} preempted {:?} on {:?}", task, victim, agent);
        }
    }

    fn pick_victim(&self, task: TaskId, agents: &AgentPool, view: WorldView<'_>) -> Option<(TaskId, AgentId)> {
        let record = self.tasks.get(task)?;
        let behavior = record.behavior.as_deref()?;
        let mut best: Option<(Priority, f32, usize, TaskId, AgentId)> = None;
        for (rank, (agent_id, agent)) in agents.iter().enumerate() {
            let Some(&current) = self.agent_task.get(&agent_id) else { continue };
            let Some(held) = self.tasks.get(current) else { continue };
            if !held.reassignable || held.priority >= record.priority {
                continue;
            }
            if self.tick.saturating_sub(held.assigned_at) < self.min_dwell_ticks {
                continue;
            }
            if record.cooling_down(agent_id, self.tick) {
                continue;
            }
            let cost = sanitize_cost(behavior.estimate_cost(agent, view));
            if !cost.is_finite() {
                continue;
            }
            let better = match best {
                None => true,
                Some((p, c, r, _, _)) => (held.priority, cost, rank) < (p, c, r),
            };
            if better {
                best = Some((held.priority, cost, rank, current, agent_id));
            }
        }
        best.map(|(_, _, _, victim, agent)| (victim, agent))
    }

    /// Bindings to agents that left the pool are released.
    fn drop_missing_agents(&mut self, agents: &AgentPool) {
        let missing: Vec<AgentId> = self.agent_task.keys().filter(|a| !agents.contains(**a)).copied().collect();
        for agent in missing {
            warn!("{:?} vanished while holding a task, unassigning", agent);
            self.unassign_agent(agent);
        }
    }

    /// End tasks pruned in an earlier pass that did not end themselves.
    fn retire_pruned(&mut self) {
        let stale: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, r)| !r.ended && r.pruned_at.is_some_and(|at| at < self.tick))
            .map(|(id, _)| id)
            .collect();
        for task in stale {
            self.remove_task(task);
        }
    }

    /// Drop ended records whose release hook has already run.
    fn collect_garbage(&mut self) {
        let pending: HashSet<TaskId> = self.released.iter().map(|r| r.task).collect();
        let dead: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(id, r)| r.ended && !pending.contains(id))
            .map(|(id, _)| id)
            .collect();
        for task in dead {
            self.tasks.remove(task);
        }
        self.order.retain(|id| self.tasks.contains_key(*id));
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Run one tick of every bound task, agents in spawn order.
    pub fn execute(&mut self, agents: &mut AgentPool, env: &mut TaskEnv<'_>) {
        self.tick = env.tick;
        self.flush_released(env);

        let bound: Vec<(AgentId, TaskId)> = agents
            .ids()
            .filter_map(|agent| self.agent_task.get(&agent).map(|task| (agent, *task)))
            .collect();
        for (agent_id, task) in bound {
            // an earlier task this tick may have changed the binding
            if self.task_of(agent_id) != Some(task) {
                continue;
            }
            let Some(agent) = agents.get_mut(agent_id) else { continue };
            let Some(result) = self.execute_one(task, agent, env) else { continue };
            self.settle(task, agent_id, result);
            self.flush_released(env);
        }
    }

    fn execute_one(&mut self, task: TaskId, agent: &mut Agent, env: &mut TaskEnv<'_>) -> Option<ActionResult> {
        let record = self.tasks.get_mut(task)?;
        if record.ended {
            debug_assert!(false, "ended task {task:?} still bound");
            return None;
        }
        let mut behavior = record.behavior.take()?;
        let result = {
            let mut ctl = TaskControl { manager: self, task, agent: agent.id() };
            behavior.execute(agent, &mut ctl, env)
        };
        if let Some(record) = self.tasks.get_mut(task) {
            record.behavior = Some(behavior);
        }
        Some(result)
    }

    /// Scheduler side of an execute result. A task that already ended or
    /// unassigned itself is left alone.
    fn settle(&mut self, task: TaskId, agent: AgentId, result: ActionResult) {
        if self.is_ended(task) || self.agent_of(task) != Some(agent) {
            return;
        }
        match result {
            ActionResult::Impossible => self.prune(task),
            ActionResult::Stopped => {
                self.sever(task, TaskEventKind::Unassigned);
                let until = self.tick + self.stopped_retry_ticks;
                if let Some(record) = self.tasks.get_mut(task) {
                    record.cool_down(agent, self.tick, until);
                }
            }
            ActionResult::Ongoing | ActionResult::Done => {}
        }
    }

    /// Run queued release hooks with mutable world access.
    pub fn flush_released(&mut self, env: &mut TaskEnv<'_>) {
        for Release { task, agent } in std::mem::take(&mut self.released) {
            if let Some(behavior) = self.tasks.get_mut(task).and_then(|r| r.behavior.as_mut()) {
                behavior.on_release(agent, env);
            }
        }
    }
}

// ============================================================================
// TASK CONTROL
// ============================================================================

/// What a running task may do to its own scheduling state.
pub struct TaskControl<'a> {
    manager: &'a mut TaskManager,
    task: TaskId,
    agent: AgentId,
}

impl TaskControl<'_> {
    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn tick(&self) -> u64 {
        self.manager.tick
    }

    pub fn priority(&self) -> Priority {
        self.manager.priority(self.task).unwrap_or_default()
    }

    /// Still running: not ended and still bound to this agent.
    pub fn is_active(&self) -> bool {
        !self.manager.is_ended(self.task) && self.manager.agent_of(self.task) == Some(self.agent)
    }

    /// End this task. The agent is idle for the next pass.
    pub fn end(&mut self) -> bool {
        self.manager.remove_task(self.task)
    }

    /// Give the agent back but keep the task on the board.
    pub fn unassign(&mut self) -> bool {
        self.manager.unassign_task(self.task).is_some()
    }

    /// Put a follow-up task on the board.
    pub fn register(&mut self, task: Task) -> TaskId {
        self.manager.register_task(task)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use bevy::math::IVec3;

    use super::*;
    use crate::components::AgentKind;
    use crate::operable::OperableSet;
    use crate::world::VoxelWorld;

    /// Scriptable task for exercising the manager.
    struct Scripted {
        cost: f32,
        only: Option<AgentId>,
        impossible: bool,
        result: ActionResult,
        end_on_execute: bool,
        runs: Arc<AtomicU32>,
        releases: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(cost: f32) -> Self {
            Self {
                cost,
                only: None,
                impossible: false,
                result: ActionResult::Ongoing,
                end_on_execute: false,
                runs: Arc::default(),
                releases: Arc::default(),
            }
        }
    }

    impl TaskBehavior for Scripted {
        fn label(&self) -> &'static str {
            "scripted"
        }

        fn estimate_cost(&self, agent: &Agent, _view: WorldView<'_>) -> f32 {
            match self.only {
                Some(only) if only != agent.id() => f32::INFINITY,
                _ => self.cost,
            }
        }

        fn execute(&mut self, _agent: &mut Agent, ctl: &mut TaskControl<'_>, _env: &mut TaskEnv<'_>) -> ActionResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.end_on_execute {
                ctl.end();
                assert!(!ctl.is_active());
                return ActionResult::Done;
            }
            self.result
        }

        fn is_strictly_impossible(&self, _view: WorldView<'_>) -> bool {
            self.impossible
        }

        fn on_release(&mut self, _agent: AgentId, _env: &mut TaskEnv<'_>) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        manager: TaskManager,
        agents: AgentPool,
        world: VoxelWorld,
        operables: OperableSet,
        tick: u64,
    }

    impl Harness {
        fn new(colonists: usize) -> Self {
            Self::with_settings(colonists, SchedulerSettings::default())
        }

        fn with_settings(colonists: usize, settings: SchedulerSettings) -> Self {
            let mut agents = AgentPool::default();
            for i in 0..colonists {
                agents.spawn(AgentKind::Colonist, IVec3::new(i as i32, 0, 0));
            }
            Self {
                manager: TaskManager::new(&settings),
                agents,
                world: VoxelWorld::new(IVec3::new(16, 4, 16)),
                operables: OperableSet::default(),
                tick: 0,
            }
        }

        fn agent(&self, n: usize) -> AgentId {
            self.agents.ids().nth(n).unwrap()
        }

        fn assign(&mut self) {
            self.tick += 1;
            let view = WorldView::new(&self.world, &self.operables);
            self.manager.assign(self.tick, &self.agents, view);
            assert!(self.manager.bindings_consistent());
        }

        fn execute(&mut self) {
            let mut env = TaskEnv::new(&mut self.world, &mut self.operables, 0.05, self.tick, 10);
            self.manager.execute(&mut self.agents, &mut env);
            assert!(self.manager.bindings_consistent());
        }

        fn tick(&mut self) {
            self.assign();
            self.execute();
        }
    }

    #[test]
    fn priority_beats_cost() {
        let mut h = Harness::new(1);
        let cheap = h.manager.register_task(Task::new(Scripted::new(1.0)).with_priority(Priority::Low));
        let urgent = h.manager.register_task(Task::new(Scripted::new(50.0)).with_priority(Priority::High));
        h.assign();
        assert_eq!(h.manager.agent_of(urgent), Some(h.agent(0)));
        assert_eq!(h.manager.agent_of(cheap), None);
    }

    #[test]
    fn cheaper_task_wins_within_priority() {
        let mut h = Harness::new(1);
        let far = h.manager.register_task(Task::new(Scripted::new(9.0)));
        let near = h.manager.register_task(Task::new(Scripted::new(2.0)));
        h.assign();
        assert_eq!(h.manager.task_of(h.agent(0)), Some(near));
        assert!(!h.manager.is_active(far));
    }

    #[test]
    fn equal_offers_resolve_by_registration_then_spawn_order() {
        for _ in 0..5 {
            let mut h = Harness::new(2);
            let first = h.manager.register_task(Task::new(Scripted::new(3.0)));
            let second = h.manager.register_task(Task::new(Scripted::new(3.0)));
            let third = h.manager.register_task(Task::new(Scripted::new(3.0)));
            h.assign();
            assert_eq!(h.manager.agent_of(first), Some(h.agent(0)));
            assert_eq!(h.manager.agent_of(second), Some(h.agent(1)));
            assert_eq!(h.manager.agent_of(third), None);
        }
    }

    #[test]
    fn infinite_and_nan_costs_are_never_matched() {
        let mut h = Harness::new(1);
        let nope = h.manager.register_task(Task::new(Scripted::new(f32::INFINITY)));
        let nan = h.manager.register_task(Task::new(Scripted::new(f32::NAN)));
        h.assign();
        assert_eq!(h.manager.agent_of(nope), None);
        assert_eq!(h.manager.agent_of(nan), None);
        assert!(!h.manager.is_ended(nope));
    }

    #[test]
    fn strictly_impossible_task_is_pruned_then_ended() {
        let mut h = Harness::new(3);
        let mut script = Scripted::new(1.0);
        script.impossible = true;
        let doomed = h.manager.register_task(Task::new(script).with_priority(Priority::High));
        h.tick();
        assert_eq!(h.manager.agent_of(doomed), None);
        assert!(h.manager.is_pruned(doomed));
        assert!(!h.manager.is_ended(doomed));

        h.tick();
        assert!(h.manager.is_ended(doomed));
        assert_eq!(h.manager.stats().pruned, 1);
    }

    #[test]
    fn impossible_result_frees_agent_for_other_work() {
        let mut h = Harness::new(1);
        let mut script = Scripted::new(1.0);
        script.result = ActionResult::Impossible;
        let doomed = h.manager.register_task(Task::new(script).with_priority(Priority::High));
        let other = h.manager.register_task(Task::new(Scripted::new(5.0)).with_priority(Priority::Low));

        h.tick();
        assert!(h.manager.is_pruned(doomed));
        assert_eq!(h.manager.task_of(h.agent(0)), None);

        h.tick();
        assert!(h.manager.is_ended(doomed));
        assert_eq!(h.manager.task_of(h.agent(0)), Some(other));
    }

    #[test]
    fn self_end_leaves_agent_idle_and_never_runs_again() {
        let mut h = Harness::new(1);
        let mut script = Scripted::new(1.0);
        script.end_on_execute = true;
        let runs = script.runs.clone();
        let releases = script.releases.clone();
        let task = h.manager.register_task(Task::new(script));

        h.tick();
        assert!(h.manager.is_ended(task));
        assert_eq!(h.manager.task_of(h.agent(0)), None);
        for _ in 0..5 {
            h.tick();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_task_cools_down_for_that_agent() {
        let settings = SchedulerSettings { stopped_retry_ticks: 3, ..SchedulerSettings::default() };
        let mut h = Harness::with_settings(1, settings);
        let mut script = Scripted::new(1.0);
        script.result = ActionResult::Stopped;
        let runs = script.runs.clone();
        let task = h.manager.register_task(Task::new(script));

        h.tick();
        assert_eq!(h.manager.agent_of(task), None);
        h.tick();
        h.tick();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        h.tick();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!h.manager.is_ended(task));
    }

    #[test]
    fn stopped_cooldown_is_kept_per_agent() {
        let settings = SchedulerSettings { stopped_retry_ticks: 100, min_dwell_ticks: 1000, ..SchedulerSettings::default() };
        let mut h = Harness::with_settings(2, settings);
        let mut script = Scripted::new(1.0);
        script.result = ActionResult::Stopped;
        let runs = script.runs.clone();
        let task = h.manager.register_task(Task::new(script));

        for _ in 0..10 {
            h.tick();
        }
        // each agent tried once, then both sit out their own cooldown
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(h.manager.agent_of(task), None);
        assert_eq!(h.manager.stats().assignments, 2);
        assert!(!h.manager.is_ended(task));
    }

    #[test]
    fn negative_estimates_count_as_free() {
        assert_eq!(sanitize_cost(-5.0), 0.0);
        let mut h = Harness::new(2);
        let free = h.manager.register_task(Task::new(Scripted::new(0.0)));
        let negative = h.manager.register_task(Task::new(Scripted::new(-5.0)));
        let paid = h.manager.register_task(Task::new(Scripted::new(1.0)));
        h.assign();
        // ties with the free task on cost, loses on registration order, still beats cost 1
        assert_eq!(h.manager.agent_of(free), Some(h.agent(0)));
        assert_eq!(h.manager.agent_of(negative), Some(h.agent(1)));
        assert_eq!(h.manager.agent_of(paid), None);
    }

    #[test]
    fn unassign_agent_keeps_task_open() {
        let mut h = Harness::new(1);
        let task = h.manager.register_task(Task::new(Scripted::new(1.0)));
        h.assign();
        let agent = h.agent(0);
        assert_eq!(h.manager.unassign_agent(agent), Some(task));
        assert_eq!(h.manager.unassign_agent(agent), None);
        assert!(!h.manager.is_ended(task));
        assert_eq!(h.manager.open_tasks().collect::<Vec<_>>(), vec![task]);
        h.assign();
        assert_eq!(h.manager.agent_of(task), Some(agent));
    }

    #[test]
    fn remove_task_is_idempotent() {
        let mut h = Harness::new(1);
        let task = h.manager.register_task(Task::new(Scripted::new(1.0)));
        h.assign();
        assert!(h.manager.remove_task(task));
        assert!(!h.manager.remove_task(task));
        assert_eq!(h.manager.task_of(h.agent(0)), None);
        assert!(h.manager.bindings_consistent());
        assert_eq!(h.manager.stats().ended, 1);

        // collected, and stale handles stay harmless
        h.tick();
        h.tick();
        assert!(h.manager.is_ended(task));
        assert!(!h.manager.remove_task(task));
        assert_eq!(h.manager.unassign_task(task), None);
    }

    #[test]
    fn preemption_waits_for_dwell_time() {
        let settings = SchedulerSettings { min_dwell_ticks: 5, ..SchedulerSettings::default() };
        let mut h = Harness::with_settings(1, settings);
        let chore = h.manager.register_task(Task::new(Scripted::new(1.0)).with_priority(Priority::Low));
        h.tick();
        assert_eq!(h.manager.agent_of(chore), Some(h.agent(0)));

        let alarm = h.manager.register_task(Task::new(Scripted::new(10.0)).with_priority(Priority::High));
        for _ in 0..3 {
            h.tick();
            assert_eq!(h.manager.agent_of(chore), Some(h.agent(0)));
        }
        h.tick();
        h.tick();
        assert_eq!(h.manager.agent_of(alarm), Some(h.agent(0)));
        assert_eq!(h.manager.agent_of(chore), None);
        assert_eq!(h.manager.stats().preemptions, 1);
    }

    #[test]
    fn pinned_tasks_are_never_preempted() {
        let settings = SchedulerSettings { min_dwell_ticks: 0, ..SchedulerSettings::default() };
        let mut h = Harness::with_settings(1, settings);
        let pinned = h.manager.register_task(Task::new(Scripted::new(1.0)).with_priority(Priority::Low).not_reassignable());
        h.tick();
        let alarm = h.manager.register_task(Task::new(Scripted::new(1.0)).with_priority(Priority::High));
        for _ in 0..5 {
            h.tick();
        }
        assert_eq!(h.manager.agent_of(pinned), Some(h.agent(0)));
        assert_eq!(h.manager.agent_of(alarm), None);
    }

    #[test]
    fn equal_priority_never_steals() {
        let settings = SchedulerSettings { min_dwell_ticks: 0, ..SchedulerSettings::default() };
        let mut h = Harness::with_settings(1, settings);
        let a = h.manager.register_task(Task::new(Scripted::new(8.0)));
        h.tick();
        let b = h.manager.register_task(Task::new(Scripted::new(1.0)));
        let mut holders = Vec::new();
        for _ in 0..10 {
            h.tick();
            holders.push(h.manager.agent_of(a).is_some());
        }
        assert!(holders.iter().all(|held| *held));
        assert_eq!(h.manager.agent_of(b), None);
    }

    #[test]
    fn preemption_runs_release_hook_of_victim() {
        let settings = SchedulerSettings { min_dwell_ticks: 1, ..SchedulerSettings::default() };
        let mut h = Harness::with_settings(1, settings);
        let chore = Scripted::new(1.0);
        let releases = chore.releases.clone();
        h.manager.register_task(Task::new(chore).with_priority(Priority::Low));
        h.tick();
        h.manager.register_task(Task::new(Scripted::new(1.0)).with_priority(Priority::Medium));
        h.tick();
        h.tick();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn vanished_agent_is_unbound() {
        let mut h = Harness::new(2);
        let task = h.manager.register_task(Task::new(Scripted::new(1.0)));
        h.assign();
        let holder = h.manager.agent_of(task).unwrap();
        h.agents.despawn(holder);
        h.assign();
        assert_ne!(h.manager.agent_of(task), Some(holder));
        assert_eq!(h.manager.agent_of(task), h.agents.ids().next());
    }

    #[test]
    fn events_record_lifecycle() {
        let mut h = Harness::new(1);
        let mut script = Scripted::new(1.0);
        script.end_on_execute = true;
        let task = h.manager.register_task(Task::new(script));
        h.tick();
        let kinds: Vec<TaskEventKind> = h.manager.drain_events().into_iter().filter(|e| e.task == task).map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TaskEventKind::Registered, TaskEventKind::Assigned, TaskEventKind::Unassigned, TaskEventKind::Ended]
        );
        assert!(h.manager.drain_events().is_empty());
    }
}
