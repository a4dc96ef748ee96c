//! Constants - Tuning parameters for agents, movement and work

// ============================================================================
// GRID / PHYSICS
// ============================================================================

/// Vertical slack when mapping a body onto the voxel grid.
/// Absorbs rest-contact jitter so a body resting at y=-0.001 still counts as cell y=0.
pub const VERTICAL_EPSILON: f32 = 0.01;

/// Downward acceleration in cells per second squared.
pub const GRAVITY: f32 = 20.0;

/// Terminal fall speed in cells per second.
pub const MAX_FALL_SPEED: f32 = 30.0;

// ============================================================================
// MOVE COSTS (per step, in cells)
// ============================================================================

/// Cost of an impassable step.
pub const BLOCKED: f32 = f32::INFINITY;

pub const FLAT_STEP_COST: f32 = 1.0;
pub const CLIMB_STEP_COST: f32 = 1.5;
pub const DROP_STEP_COST: f32 = 1.2;
pub const FLIGHT_STEP_COST: f32 = 1.0;

/// A* works in integer cost units. 1.0 cell = 100 units.
pub const COST_SCALE: f32 = 100.0;

// ============================================================================
// AGENT KINDS
// ============================================================================

pub const COLONIST_SPEED: f32 = 4.0;
pub const COLONIST_MAX_HEALTH: f32 = 100.0;
pub const COLONIST_WORK_RATE: f32 = 1.0;

pub const DRONE_SPEED: f32 = 6.0;
pub const DRONE_TURN_RATE: f32 = 8.0;
pub const DRONE_MAX_HEALTH: f32 = 40.0;
pub const DRONE_WORK_RATE: f32 = 0.5;

pub const SENTRY_MAX_HEALTH: f32 = 250.0;

/// Body half-width on x/z. Bodies are 0.8 wide so they fit inside one cell.
pub const BODY_HALF_WIDTH: f32 = 0.4;
pub const BODY_HEIGHT: f32 = 0.9;

// ============================================================================
// WORK
// ============================================================================

/// Health restored per second while standing on a healing station.
pub const HEAL_RATE: f32 = 25.0;

/// Work units a blueprint needs by default.
pub const DEFAULT_BLUEPRINT_WORK: f32 = 2.0;

/// Hardness of rubble placed by designations and the demo.
pub const RUBBLE_HARDNESS: f32 = 1.5;

// ============================================================================
// TURRETS
// ============================================================================

pub const TURRET_AMMO: u32 = 40;

/// Seconds between shots while manned and alerted.
pub const TURRET_FIRE_INTERVAL: f32 = 0.5;
