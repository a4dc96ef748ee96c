//! Paths - Routes, the pathfinder contract, and the per-tick path-following step
//!
//! A `Path` is planned once and then re-validated cheaply every tick by `follow_path`:
//! only the next step's move cost is checked, so routes that get blocked after
//! planning are noticed without searching again.

use bevy::math::IVec3;
use hashbrown::HashSet;
use pathfinding::prelude::astar;

use crate::action::ActionResult;
use crate::agent::{Agent, AgentId};
use crate::constants::*;
use crate::locomotion::Locomotion;
use crate::task::TaskEnv;
use crate::world::VoxelWorld;

// ============================================================================
// PATH
// ============================================================================

/// Ordered waypoints plus a cursor. The first waypoint is the origin the search started from.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    cells: Vec<IVec3>,
    cursor: usize,
    found: bool,
    cost: f32,
}

impl Path {
    /// No route exists.
    pub fn not_found() -> Self {
        Self { cells: Vec::new(), cursor: 0, found: false, cost: BLOCKED }
    }

    pub fn new(cells: Vec<IVec3>, cost: f32) -> Self {
        Self { cells, cursor: 0, found: true, cost: cost.max(0.0) }
    }

    /// False means the search found no route (not "not searched yet").
    pub fn exists(&self) -> bool {
        self.found
    }

    /// Waypoint the cursor points at.
    pub fn next_waypoint(&self) -> Option<IVec3> {
        self.cells.get(self.cursor).copied()
    }

    /// Is there a waypoint after the current one?
    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.cells.len()
    }

    /// Move the cursor forward. Returns the new current waypoint.
    pub fn advance(&mut self) -> Option<IVec3> {
        if !self.has_next() {
            return None;
        }
        self.cursor += 1;
        self.next_waypoint()
    }

    pub fn destination(&self) -> Option<IVec3> {
        self.cells.last().copied()
    }

    pub fn remaining(&self) -> &[IVec3] {
        &self.cells[self.cursor.min(self.cells.len())..]
    }

    /// Total route cost, infinite when there is no route. Empty routes cost 0.
    pub fn estimate_cost(&self) -> f32 {
        if self.found { self.cost } else { BLOCKED }
    }
}

// ============================================================================
// PATHFINDER CONTRACT
// ============================================================================

/// Produces routes from an origin to any one of several acceptable destinations.
pub trait Pathfinder: Send + Sync {
    /// Route to whichever destination is cheapest to reach. Empty `destinations` yields no route.
    fn find_any_path(&self, world: &VoxelWorld, origin: IVec3, destinations: &[IVec3]) -> Path;

    /// Scalar cost estimate used for task matching. Infinite only when no destination is reachable.
    fn estimate_cost(&self, world: &VoxelWorld, origin: IVec3, destinations: &[IVec3]) -> f32 {
        self.find_any_path(world, origin, destinations).estimate_cost()
    }
}

/// A* over the voxel grid, with a locomotion's step rules as the edge set.
#[derive(Clone, Copy, Debug)]
pub struct GridPathfinder {
    locomotion: Locomotion,
}

impl GridPathfinder {
    pub fn new(locomotion: Locomotion) -> Self {
        Self { locomotion }
    }

    /// Lower bound on steps between two cells for any locomotion.
    fn step_bound(a: IVec3, b: IVec3) -> i32 {
        let d = (a - b).abs();
        (d.x + d.z).max(d.y)
    }

    fn goals(&self, world: &VoxelWorld, destinations: &[IVec3]) -> Vec<IVec3> {
        destinations
            .iter()
            .copied()
            .filter(|cell| self.locomotion.can_occupy(world, *cell))
            .collect()
    }
}

impl Pathfinder for GridPathfinder {
    fn find_any_path(&self, world: &VoxelWorld, origin: IVec3, destinations: &[IVec3]) -> Path {
        if destinations.contains(&origin) {
            return Path::new(vec![origin], 0.0);
        }
        let goals: HashSet<IVec3> = self.goals(world, destinations).into_iter().collect();
        if goals.is_empty() {
            return Path::not_found();
        }

        let min_step = self.locomotion.min_step_cost();
        let unit = if min_step.is_finite() { (min_step * COST_SCALE) as u32 } else { 0 };
        let result = astar(
            &origin,
            |cell| {
                self.locomotion
                    .neighbors(world, *cell)
                    .into_iter()
                    .map(|(next, cost)| (next, (cost * COST_SCALE).round() as u32))
            },
            |cell| {
                goals
                    .iter()
                    .map(|goal| Self::step_bound(*cell, *goal) as u32 * unit)
                    .min()
                    .unwrap_or(0)
            },
            |cell| goals.contains(cell),
        );

        match result {
            Some((cells, units)) => Path::new(cells, units as f32 / COST_SCALE),
            None => Path::not_found(),
        }
    }

    /// Cheap admissible bound instead of a full search: matching asks this for every
    /// (task, idle agent) pair each tick.
    fn estimate_cost(&self, world: &VoxelWorld, origin: IVec3, destinations: &[IVec3]) -> f32 {
        if destinations.contains(&origin) {
            return 0.0;
        }
        let min_step = self.locomotion.min_step_cost();
        self.goals(world, destinations)
            .into_iter()
            .map(|goal| Self::step_bound(origin, goal) as f32 * min_step)
            .fold(BLOCKED, f32::min)
    }
}

// ============================================================================
// PATH FOLLOWING
// ============================================================================

/// One tick of walking `path`. Sets or clears the agent's movement target.
/// - no route: Stopped
/// - standing on the current waypoint: advance (Ongoing) or arrive (Done)
/// - next step traversable: target it (Ongoing)
/// - next step blocked: Stopped
pub fn follow_path(path: &mut Path, agent: &mut Agent, world: &VoxelWorld) -> ActionResult {
    if !path.exists() {
        return ActionResult::Stopped;
    }
    let here = agent.occupied_cell();
    match path.next_waypoint() {
        Some(next) if next != here => {
            if agent.locomotion().move_cost(world, next, here).is_finite() {
                agent.move_target = Some(next);
                ActionResult::Ongoing
            } else {
                agent.move_target = None;
                ActionResult::Stopped
            }
        }
        _ => {
            if path.has_next() {
                path.advance();
                ActionResult::Ongoing
            } else {
                agent.move_target = None;
                ActionResult::Done
            }
        }
    }
}

/// Task-side path memory: keeps a route to the current destination set and re-plans
/// when the destinations, the agent, or the route's validity change.
#[derive(Clone, Debug, Default)]
pub struct PathCache {
    path: Option<Path>,
    destinations: Vec<IVec3>,
    agent: Option<AgentId>,
    /// (tick, world revision) of the last search that found nothing.
    failed_at: Option<(u64, u64)>,
}

impl PathCache {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Has a usable route right now.
    pub fn has_route(&self) -> bool {
        self.path.as_ref().is_some_and(Path::exists)
    }

    /// The last search ran and found nothing.
    pub fn search_failed(&self) -> bool {
        self.path.as_ref().is_some_and(|path| !path.exists())
    }

    /// Drop the route; the next step plans again.
    pub fn invalidate(&mut self) {
        self.path = None;
    }

    /// Make sure a route exists for `destinations`. Failed searches are not repeated for
    /// `replan_backoff_ticks` unless the world changed since.
    pub fn ensure(&mut self, agent: &Agent, env: &TaskEnv<'_>, destinations: &[IVec3]) -> bool {
        let same_goal = self.destinations == destinations && self.agent == Some(agent.id());
        if same_goal && self.has_route() {
            return true;
        }
        if !same_goal {
            self.failed_at = None;
        } else if let Some((tick, revision)) = self.failed_at {
            if revision == env.world.revision() && env.tick < tick + env.replan_backoff_ticks {
                return false;
            }
        }

        let path = agent.find_path(env.world, destinations);
        let found = path.exists();
        self.failed_at = if found { None } else { Some((env.tick, env.world.revision())) };
        if !found {
            tracing::debug!("no path for {:?} from {:?} to {} destinations", agent.id(), agent.occupied_cell(), destinations.len());
        }
        self.path = Some(path);
        self.destinations = destinations.to_vec();
        self.agent = Some(agent.id());
        found
    }

    /// Plan if needed, then follow one step. A blocked step (or an agent knocked off
    /// its route) gets one fresh plan from where the agent stands before giving up.
    pub fn step(&mut self, agent: &mut Agent, env: &TaskEnv<'_>, destinations: &[IVec3]) -> ActionResult {
        if !self.ensure(agent, env, destinations) {
            return ActionResult::Stopped;
        }
        let result = self.follow(agent, env);
        if result != ActionResult::Stopped {
            return result;
        }
        self.invalidate();
        if !self.ensure(agent, env, destinations) {
            return ActionResult::Stopped;
        }
        let result = self.follow(agent, env);
        if result == ActionResult::Stopped {
            self.invalidate();
        }
        result
    }

    fn follow(&mut self, agent: &mut Agent, env: &TaskEnv<'_>) -> ActionResult {
        match self.path.as_mut() {
            Some(path) => follow_path(path, agent, env.world),
            None => ActionResult::Stopped,
        }
    }
}
