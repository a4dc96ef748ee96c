//! Movement system - Locomotion toward each agent's movement target

use bevy::prelude::*;

use crate::agent::AgentPool;
use crate::resources::SimClock;
use crate::world::VoxelWorld;

pub fn locomotion_system(clock: Res<SimClock>, world: Res<VoxelWorld>, mut agents: ResMut<AgentPool>) {
    for agent in agents.iter_mut() {
        agent.step_motion(clock.dt, &world);
    }
}
