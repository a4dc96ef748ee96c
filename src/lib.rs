//! Colony Jobs - Task allocation for colony agents, driven by a Bevy ECS tick loop.
//! The scheduling core is plain Rust held in resources; systems only move data in and out.

// ============================================================================
// MODULES
// ============================================================================

pub mod action;
pub mod agent;
pub mod components;
pub mod constants;
pub mod locomotion;
pub mod messages;
pub mod operable;
pub mod path;
pub mod resources;
pub mod scheduler;
pub mod settings;
pub mod systems;
pub mod task;
pub mod tasks;
pub mod world;

#[cfg(test)]
mod tests;

// ============================================================================
// IMPORTS
// ============================================================================

use bevy::prelude::*;

use agent::AgentPool;
use messages::*;
use operable::OperableSet;
use resources::*;
use scheduler::TaskManager;
use settings::SchedulerSettings;
use systems::*;
use world::VoxelWorld;

// ============================================================================
// BEVY APP
// ============================================================================

/// Tick phases. Chained, so every binding change of a tick lands before any task executes.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Drain,   // Clock, commands, deaths, requests
    Assign,  // Matching pass
    Execute, // Agent bookkeeping + task execution
    Move,    // Locomotion
    Report,  // Publish scheduler events
}

/// Wire resources, messages and systems. Resources inserted beforehand
/// (settings, a prepared world) are kept.
pub fn build_app(app: &mut App) {
    app.add_message::<SpawnAgentMsg>()
       .add_message::<DamageMsg>()
       .add_message::<DesignateMsg>()
       .add_message::<MoveOrderMsg>()
       .add_message::<TaskEventMsg>()
       .add_message::<AgentDiedMsg>()
       .init_resource::<SchedulerSettings>()
       .init_resource::<SimClock>()
       .init_resource::<VoxelWorld>()
       .init_resource::<OperableSet>()
       .init_resource::<AgentPool>()
       .init_resource::<TaskManager>()
       .init_resource::<HealRequests>()
       .init_resource::<ManningRequests>()
       .init_resource::<Designations>()
       .init_resource::<MoveOrders>()
       .configure_sets(Update, (Step::Drain, Step::Assign, Step::Execute, Step::Move, Step::Report).chain())
       // Drain: commands in, requests raised
       .add_systems(Update, (
           advance_clock_system,
           spawn_agents_system,
           damage_system,
           death_system,
           request_healing_system,
           poll_operables_system,
           designate_work_system,
           move_order_system,
       ).chain().in_set(Step::Drain))
       .add_systems(Update, assign_tasks_system.in_set(Step::Assign))
       .add_systems(Update, execute_tasks_system.in_set(Step::Execute))
       .add_systems(Update, locomotion_system.in_set(Step::Move))
       .add_systems(Update, publish_task_events_system.in_set(Step::Report));
}
