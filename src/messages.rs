//! ECS Messages - Commands into the colony and reports out of it.

use bevy::math::IVec3;
use bevy::prelude::Message;

use crate::agent::AgentId;
use crate::components::AgentKind;
use crate::scheduler::TaskEvent;
use crate::task::Priority;

// ============================================================================
// COMMANDS (drained in the Drain step)
// ============================================================================

#[derive(Message, Clone, Debug)]
pub struct SpawnAgentMsg {
    pub kind: AgentKind,
    pub cell: IVec3,
}

#[derive(Message, Clone, Debug)]
pub struct DamageMsg {
    pub agent: AgentId,
    pub amount: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkKind {
    Build,
    Dig,
}

/// Mark a cell for construction or digging.
#[derive(Message, Clone, Debug)]
pub struct DesignateMsg {
    pub cell: IVec3,
    pub work: WorkKind,
    pub priority: Priority,
}

/// Player override: send `agent` to `cell`, dropping whatever it was doing.
#[derive(Message, Clone, Debug)]
pub struct MoveOrderMsg {
    pub agent: AgentId,
    pub cell: IVec3,
}

// ============================================================================
// REPORTS (written by the colony)
// ============================================================================

#[derive(Message, Clone, Debug)]
pub struct TaskEventMsg(pub TaskEvent);

#[derive(Message, Clone, Debug)]
pub struct AgentDiedMsg {
    pub agent: AgentId,
    pub kind: AgentKind,
    pub cell: IVec3,
}
