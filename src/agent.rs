//! Agents - Worker state, primitive actions, and the agent arena

use bevy::math::IVec3;
use bevy::prelude::Resource;
use slotmap::SlotMap;

use crate::action::ActionResult;
use crate::components::{AgentKind, Body, CollisionInfo, Health, cell_foot_point};
use crate::locomotion::{Locomotion, sample_collision};
use crate::operable::Operable;
use crate::path::{GridPathfinder, Path, Pathfinder};
use crate::world::{Block, VoxelWorld, within_reach};

slotmap::new_key_type! {
    /// Generational handle to an agent. Stale handles simply fail to resolve.
    pub struct AgentId;
}

// ============================================================================
// AGENT
// ============================================================================

/// A worker. Kind, locomotion and pathfinder are fixed at spawn.
pub struct Agent {
    id: AgentId,
    kind: AgentKind,
    locomotion: Locomotion,
    pathfinder: Box<dyn Pathfinder>,
    work_rate: f32,
    pub body: Body,
    pub health: Health,
    /// Cell locomotion steers toward this tick. None = hold still.
    pub move_target: Option<IVec3>,
    pub collision: CollisionInfo,
    pub prev_collision: CollisionInfo,
    pub age: f32,
    pub busy_ticks: u64,
    pub idle_ticks: u64,
}

impl Agent {
    pub fn new(id: AgentId, kind: AgentKind, cell: IVec3) -> Self {
        let locomotion = Locomotion::for_kind(kind);
        Self::with_parts(id, kind, cell, locomotion, Box::new(GridPathfinder::new(locomotion)))
    }

    /// Agent with a custom movement strategy and pathfinder.
    pub fn with_parts(
        id: AgentId,
        kind: AgentKind,
        cell: IVec3,
        locomotion: Locomotion,
        pathfinder: Box<dyn Pathfinder>,
    ) -> Self {
        Self {
            id,
            kind,
            locomotion,
            pathfinder,
            work_rate: kind.work_rate(),
            body: Body::standing_in(cell),
            health: Health::full(kind.max_health()),
            move_target: None,
            collision: CollisionInfo::default(),
            prev_collision: CollisionInfo::default(),
            age: 0.0,
            busy_ticks: 0,
            idle_ticks: 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn pathfinder(&self) -> &dyn Pathfinder {
        self.pathfinder.as_ref()
    }

    pub fn work_rate(&self) -> f32 {
        self.work_rate
    }

    /// Grid cell the body currently occupies.
    pub fn occupied_cell(&self) -> IVec3 {
        self.body.occupied_cell()
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Route from the occupied cell to any of `destinations`.
    pub fn find_path(&self, world: &VoxelWorld, destinations: &[IVec3]) -> Path {
        self.pathfinder.find_any_path(world, self.occupied_cell(), destinations)
    }

    /// Matching-cost estimate from the occupied cell.
    pub fn estimate_path_cost(&self, world: &VoxelWorld, destinations: &[IVec3]) -> f32 {
        self.pathfinder.estimate_cost(world, self.occupied_cell(), destinations)
    }

    // ------------------------------------------------------------------------
    // Primitive actions
    // ------------------------------------------------------------------------

    /// Put construction work into a blueprint next to the agent.
    pub fn work_buildable(&mut self, world: &mut VoxelWorld, cell: IVec3, dt: f32) -> ActionResult {
        match world.block(cell) {
            Some(Block::Solid { .. }) => return ActionResult::Done,
            Some(Block::Blueprint { .. }) => {}
            None => return ActionResult::Impossible,
        }
        // this agent can't, others may
        if self.work_rate <= 0.0 {
            return ActionResult::Stopped;
        }
        if !within_reach(self.occupied_cell(), cell) {
            return ActionResult::Stopped;
        }
        self.move_target = None;
        match world.apply_build_work(cell, self.work_rate * dt) {
            Some(true) => ActionResult::Done,
            Some(false) => ActionResult::Ongoing,
            None => ActionResult::Impossible,
        }
    }

    /// Dig out a diggable block next to the agent.
    pub fn work_diggable(&mut self, world: &mut VoxelWorld, cell: IVec3, dt: f32) -> ActionResult {
        match world.block(cell) {
            None => return ActionResult::Done,
            Some(Block::Solid { diggable: true, .. }) => {}
            Some(_) => return ActionResult::Impossible,
        }
        if self.work_rate <= 0.0 {
            return ActionResult::Stopped;
        }
        if !within_reach(self.occupied_cell(), cell) {
            return ActionResult::Stopped;
        }
        self.move_target = None;
        match world.apply_dig_work(cell, self.work_rate * dt) {
            Some(true) => ActionResult::Done,
            Some(false) => ActionResult::Ongoing,
            None => ActionResult::Impossible,
        }
    }

    /// Run an operable the agent has already started operating.
    pub fn operate_operable(&mut self, operable: &mut dyn Operable, dt: f32) -> ActionResult {
        if operable.is_destroyed() {
            return ActionResult::Impossible;
        }
        if !within_reach(self.occupied_cell(), operable.position()) {
            return ActionResult::Stopped;
        }
        self.move_target = None;
        operable.operate(self.id, dt)
    }

    /// Vitals bookkeeping, run every tick before any task executes.
    pub fn core_update(&mut self, dt: f32) {
        self.age += dt;
        if !self.health.current.is_finite() {
            self.health.current = 0.0;
        }
        self.health.current = self.health.current.clamp(0.0, self.health.max);
    }

    /// Idle agents drop any stale movement target left by a task they no longer hold.
    pub fn update(&mut self, has_task: bool) {
        if has_task {
            self.busy_ticks += 1;
        } else {
            self.idle_ticks += 1;
            self.move_target = None;
        }
    }

    /// Sample contacts and move the body one tick toward `move_target`.
    pub fn step_motion(&mut self, dt: f32, world: &VoxelWorld) {
        self.prev_collision = self.collision;
        self.collision = sample_collision(world, &self.body);
        let target = self.move_target.map(cell_foot_point);
        self.locomotion
            .update(dt, &mut self.body, world, &self.collision, &self.prev_collision, target);
    }
}

// ============================================================================
// AGENT POOL
// ============================================================================

/// All live agents. Iteration via `ids` follows spawn order, which is the
/// tie-break order for task matching.
#[derive(Resource, Default)]
pub struct AgentPool {
    agents: SlotMap<AgentId, Agent>,
    order: Vec<AgentId>,
}

impl AgentPool {
    pub fn spawn(&mut self, kind: AgentKind, cell: IVec3) -> AgentId {
        let id = self.agents.insert_with_key(|id| Agent::new(id, kind, cell));
        self.order.push(id);
        id
    }

    pub fn spawn_with(
        &mut self,
        kind: AgentKind,
        cell: IVec3,
        locomotion: Locomotion,
        pathfinder: Box<dyn Pathfinder>,
    ) -> AgentId {
        let id = self
            .agents
            .insert_with_key(|id| Agent::with_parts(id, kind, cell, locomotion, pathfinder));
        self.order.push(id);
        id
    }

    /// Remove an agent. Callers unbind it from its task first.
    pub fn despawn(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.agents.remove(id)?;
        self.order.retain(|other| *other != id);
        Some(agent)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Ids in spawn order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.order.iter().copied()
    }

    /// Agents in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.order.iter().filter_map(|id| self.agents.get(*id).map(|a| (*id, a)))
    }

    /// Agents in arena order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> + '_ {
        self.agents.values_mut()
    }
}
