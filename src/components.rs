//! Agent Components - Plain data every agent carries

use bevy::math::{IVec3, Vec3};

use crate::constants::*;

// ============================================================================
// BODY
// ============================================================================

/// Physical body. `position` is the bottom centre of an axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub half_width: f32,
    pub height: f32,
}

impl Body {
    /// Body standing in the middle of `cell`.
    pub fn standing_in(cell: IVec3) -> Self {
        Self {
            position: cell_foot_point(cell),
            velocity: Vec3::ZERO,
            half_width: BODY_HALF_WIDTH,
            height: BODY_HEIGHT,
        }
    }

    /// (min, max) corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let half = Vec3::new(self.half_width, 0.0, self.half_width);
        let min = self.position - half;
        let max = self.position + half + Vec3::new(0.0, self.height, 0.0);
        (min, max)
    }

    /// Cell the body occupies: box centre on x/z, box bottom (plus epsilon) on y.
    pub fn occupied_cell(&self) -> IVec3 {
        let (min, max) = self.bounds();
        let centre = (min + max) * 0.5;
        IVec3::new(
            centre.x.floor() as i32,
            (min.y + VERTICAL_EPSILON).floor() as i32,
            centre.z.floor() as i32,
        )
    }
}

/// Where a body stands when it is "in" a cell: centre of the floor face.
pub fn cell_foot_point(cell: IVec3) -> Vec3 {
    Vec3::new(cell.x as f32 + 0.5, cell.y as f32, cell.z as f32 + 0.5)
}

// ============================================================================
// HEALTH
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 { 0.0 } else { self.current / self.max }
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }
}

// ============================================================================
// COLLISION
// ============================================================================

/// Contact state sampled once per tick before locomotion runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionInfo {
    /// Feet rest on a solid surface.
    pub on_ground: bool,
    /// Body overlaps a solid cell.
    pub embedded: bool,
}

// ============================================================================
// AGENT KINDS
// ============================================================================

/// Concrete agent kind. Fixes locomotion, pathfinder and stats for the agent's lifetime.
/// - Colonist: wheeled walker, full worker
/// - Drone: flyer, half-speed worker
/// - Sentry: immobile, only takes work at its own cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Colonist,
    Drone,
    Sentry,
}

impl AgentKind {
    pub fn max_health(&self) -> f32 {
        match self {
            Self::Colonist => COLONIST_MAX_HEALTH,
            Self::Drone => DRONE_MAX_HEALTH,
            Self::Sentry => SENTRY_MAX_HEALTH,
        }
    }

    /// Work units per second on buildables/diggables.
    pub fn work_rate(&self) -> f32 {
        match self {
            Self::Colonist => COLONIST_WORK_RATE,
            Self::Drone => DRONE_WORK_RATE,
            Self::Sentry => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Colonist => "Colonist",
            Self::Drone => "Drone",
            Self::Sentry => "Sentry",
        }
    }
}
