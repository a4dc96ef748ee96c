//! ECS Resources - Shared state accessible by all systems

use bevy::math::IVec3;
use bevy::prelude::*;
use hashbrown::HashMap;

use crate::agent::AgentId;
use crate::operable::OperableId;
use crate::settings::SchedulerSettings;
use crate::task::{Priority, TaskId};

/// Fixed-step simulation clock. `tick` advances once per update.
#[derive(Resource, Clone, Copy, Debug)]
pub struct SimClock {
    pub tick: u64,
    pub dt: f32,
}

impl FromWorld for SimClock {
    fn from_world(world: &mut World) -> Self {
        let dt = world
            .get_resource::<SchedulerSettings>()
            .map_or(SchedulerSettings::default().tick_seconds, |s| s.tick_seconds);
        Self { tick: 0, dt }
    }
}

/// Live healing task per wounded agent.
#[derive(Resource, Default)]
pub struct HealRequests(pub HashMap<AgentId, TaskId>);

/// Live manning task per operable, with the priority it was registered at.
#[derive(Resource, Default)]
pub struct ManningRequests(pub HashMap<OperableId, (TaskId, Priority)>);

/// Live move order per agent. A newer order replaces the older one.
#[derive(Resource, Default)]
pub struct MoveOrders(pub HashMap<AgentId, TaskId>);

/// Live build/dig task per designated cell.
#[derive(Resource, Default)]
pub struct Designations(pub HashMap<IVec3, TaskId>);
