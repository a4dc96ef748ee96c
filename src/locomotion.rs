//! Locomotion - Per-kind movement strategy: step costs for planning, motion for bodies

use bevy::math::{IVec3, Vec3};

use crate::components::{AgentKind, Body, CollisionInfo};
use crate::constants::*;
use crate::world::VoxelWorld;

const HORIZONTAL: [IVec3; 4] = [IVec3::X, IVec3::NEG_X, IVec3::Z, IVec3::NEG_Z];
const AXES: [IVec3; 6] = [IVec3::X, IVec3::NEG_X, IVec3::Y, IVec3::NEG_Y, IVec3::Z, IVec3::NEG_Z];

/// How an agent turns a target cell into motion.
/// - Ballistic: no steering, only gravity (can never change cell on purpose)
/// - Wheeled: walks on supported cells, climbs or drops one level
/// - Homing: flies through any empty cell, steering toward the target
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Locomotion {
    Ballistic,
    Wheeled { speed: f32 },
    Homing { speed: f32, turn_rate: f32 },
}

impl Locomotion {
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Colonist => Self::Wheeled { speed: COLONIST_SPEED },
            AgentKind::Drone => Self::Homing { speed: DRONE_SPEED, turn_rate: DRONE_TURN_RATE },
            AgentKind::Sentry => Self::Ballistic,
        }
    }

    /// Cost of stepping from `from` into `target`. Finite = traversable, `BLOCKED` = not.
    /// Staying in place is always free.
    pub fn move_cost(&self, world: &VoxelWorld, target: IVec3, from: IVec3) -> f32 {
        if target == from {
            return 0.0;
        }
        let d = target - from;
        match *self {
            Self::Ballistic => BLOCKED,
            Self::Wheeled { .. } => {
                if !world.is_walkable(target) {
                    return BLOCKED;
                }
                match (d.x.abs() + d.z.abs(), d.y) {
                    (1, 0) => FLAT_STEP_COST,
                    // rise first, so the cell above us must be free
                    (1, 1) if world.is_empty(from + IVec3::Y) => CLIMB_STEP_COST,
                    // move over first, then drop
                    (1, -1) if world.is_empty(target + IVec3::Y) => DROP_STEP_COST,
                    (0, -1) => DROP_STEP_COST,
                    _ => BLOCKED,
                }
            }
            Self::Homing { .. } => {
                if d.abs().element_sum() == 1 && world.is_empty(target) {
                    FLIGHT_STEP_COST
                } else {
                    BLOCKED
                }
            }
        }
    }

    /// Traversable single steps out of `from`, with their costs.
    pub fn neighbors(&self, world: &VoxelWorld, from: IVec3) -> Vec<(IVec3, f32)> {
        let mut out = Vec::new();
        match self {
            Self::Ballistic => {}
            Self::Wheeled { .. } => {
                for dir in HORIZONTAL {
                    for dy in [0, 1, -1] {
                        out.push(from + dir + IVec3::new(0, dy, 0));
                    }
                }
                out.push(from - IVec3::Y);
            }
            Self::Homing { .. } => out.extend(AXES.iter().map(|dir| from + *dir)),
        }
        out.into_iter()
            .map(|cell| (cell, self.move_cost(world, cell, from)))
            .filter(|(_, cost)| cost.is_finite())
            .collect()
    }

    /// Can a body with this locomotion come to rest in `cell`?
    pub fn can_occupy(&self, world: &VoxelWorld, cell: IVec3) -> bool {
        match self {
            Self::Ballistic | Self::Wheeled { .. } => world.is_walkable(cell),
            Self::Homing { .. } => world.is_empty(cell),
        }
    }

    /// Cheapest possible single step, for admissible heuristics.
    pub fn min_step_cost(&self) -> f32 {
        match self {
            Self::Ballistic => BLOCKED,
            Self::Wheeled { .. } => FLAT_STEP_COST,
            Self::Homing { .. } => FLIGHT_STEP_COST,
        }
    }

    /// Apply one tick of motion toward `target` (a foot point), or settle when there is none.
    pub fn update(
        &self,
        dt: f32,
        body: &mut Body,
        world: &VoxelWorld,
        collision: &CollisionInfo,
        prev_collision: &CollisionInfo,
        target: Option<Vec3>,
    ) {
        match (*self, target) {
            (Self::Wheeled { speed }, Some(goal)) => {
                body.velocity = Vec3::ZERO;
                drive(body, goal, speed * dt);
            }
            (Self::Homing { speed, turn_rate }, Some(goal)) => {
                let delta = goal - body.position;
                let dist = delta.length();
                if dist <= speed * dt {
                    body.position = goal;
                    body.velocity = Vec3::ZERO;
                } else {
                    let desired = delta / dist * speed;
                    body.velocity = body.velocity.lerp(desired, (turn_rate * dt).min(1.0));
                    body.position += body.velocity * dt;
                }
            }
            // flyers hover when idle
            (Self::Homing { .. }, None) => body.velocity = Vec3::ZERO,
            _ => fall(dt, body, world, collision, prev_collision),
        }
    }
}

/// Kinematic walk: rise before moving over, move over before dropping.
fn drive(body: &mut Body, goal: Vec3, budget: f32) {
    let pos = body.position;
    let first_leg = if goal.y > pos.y {
        Vec3::new(pos.x, goal.y, pos.z)
    } else {
        Vec3::new(goal.x, pos.y, goal.z)
    };
    let (pos, left) = approach(pos, first_leg, budget);
    let (pos, _) = approach(pos, goal, left);
    body.position = pos;
}

/// Move toward `goal` by at most `budget`. Returns the new point and unused budget.
fn approach(from: Vec3, goal: Vec3, budget: f32) -> (Vec3, f32) {
    let delta = goal - from;
    let dist = delta.length();
    if dist <= budget {
        (goal, budget - dist)
    } else {
        (from + delta / dist * budget, 0.0)
    }
}

/// Gravity and landing for unsteered bodies.
fn fall(dt: f32, body: &mut Body, world: &VoxelWorld, collision: &CollisionInfo, prev_collision: &CollisionInfo) {
    if collision.on_ground && body.velocity.y <= 0.0 {
        if !prev_collision.on_ground {
            tracing::trace!("body landed at {:?}", body.position);
        }
        body.velocity = Vec3::ZERO;
        return;
    }
    body.velocity.y = (body.velocity.y - GRAVITY * dt).max(-MAX_FALL_SPEED);
    body.position += body.velocity * dt;

    let cell = body.occupied_cell();
    let ground = world.ground_height(cell.x, cell.z, cell.y.max(0));
    if body.position.y <= ground {
        body.position.y = ground;
        body.velocity = Vec3::ZERO;
    }
}

/// Sample contact state for a body.
pub fn sample_collision(world: &VoxelWorld, body: &Body) -> CollisionInfo {
    let cell = body.occupied_cell();
    let rest_height = body.position.y - cell.y as f32;
    CollisionInfo {
        on_ground: world.is_solid(cell - IVec3::Y) && rest_height.abs() <= VERTICAL_EPSILON,
        embedded: world.is_solid(cell),
    }
}
