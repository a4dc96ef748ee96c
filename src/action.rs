//! Action outcomes - Shared result type for every action-performing step

/// Outcome of one action step (follow a path, work a block, run a task).
/// - Ongoing: still progressing, call again next tick
/// - Done: finished this tick
/// - Stopped: not possible for this agent right now (may change later)
/// - Impossible: not achievable by any agent, ever
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionResult {
    Ongoing,
    Done,
    Stopped,
    Impossible,
}

impl ActionResult {
    /// Done or Impossible: no point calling the same action again.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Done | Self::Impossible)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ongoing => "Ongoing",
            Self::Done => "Done",
            Self::Stopped => "Stopped",
            Self::Impossible => "Impossible",
        }
    }
}
