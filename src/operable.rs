//! Operables - World objects that ask to be manned by an agent

use bevy::math::IVec3;
use bevy::prelude::Resource;
use slotmap::SlotMap;

use crate::action::ActionResult;
use crate::agent::AgentId;
use crate::constants::*;
use crate::task::Priority;

slotmap::new_key_type! {
    pub struct OperableId;
}

/// A positioned machine that can request an operator.
///
/// `start_operation`/`end_operation` are called by the manning task when an agent
/// begins and stops manning. Both must tolerate being called twice.
pub trait Operable: Send + Sync {
    fn label(&self) -> &'static str;

    fn position(&self) -> IVec3;

    /// Current need for an operator. None = no need right now.
    fn should_operate(&self) -> Option<Priority>;

    fn start_operation(&mut self, agent: AgentId);

    fn end_operation(&mut self);

    /// One tick of operation by `agent`. Done when the machine has nothing left to do.
    fn operate(&mut self, agent: AgentId, dt: f32) -> ActionResult;

    fn operator(&self) -> Option<AgentId>;

    fn is_destroyed(&self) -> bool {
        false
    }
}

// ============================================================================
// TURRET
// ============================================================================

/// Defensive gun. Wants an operator at High priority while alerted and loaded.
#[derive(Clone, Debug)]
pub struct Turret {
    position: IVec3,
    ammo: u32,
    alert: bool,
    operator: Option<AgentId>,
    cooldown: f32,
    shots_fired: u32,
    destroyed: bool,
}

impl Turret {
    pub fn new(position: IVec3) -> Self {
        Self {
            position,
            ammo: TURRET_AMMO,
            alert: false,
            operator: None,
            cooldown: 0.0,
            shots_fired: 0,
            destroyed: false,
        }
    }

    pub fn set_alert(&mut self, alert: bool) {
        self.alert = alert;
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
    }
}

impl Operable for Turret {
    fn label(&self) -> &'static str {
        "turret"
    }

    fn position(&self) -> IVec3 {
        self.position
    }

    fn should_operate(&self) -> Option<Priority> {
        if self.destroyed || self.ammo == 0 || !self.alert {
            return None;
        }
        Some(Priority::High)
    }

    fn start_operation(&mut self, agent: AgentId) {
        if self.operator.is_none() {
            self.operator = Some(agent);
            self.cooldown = 0.0;
        }
    }

    fn end_operation(&mut self) {
        self.operator = None;
    }

    fn operate(&mut self, agent: AgentId, dt: f32) -> ActionResult {
        if self.destroyed {
            return ActionResult::Impossible;
        }
        if self.operator != Some(agent) {
            return ActionResult::Stopped;
        }
        if self.ammo == 0 {
            return ActionResult::Done;
        }
        self.cooldown -= dt;
        if self.alert && self.cooldown <= 0.0 {
            self.ammo -= 1;
            self.shots_fired += 1;
            self.cooldown = TURRET_FIRE_INTERVAL;
        }
        if self.ammo == 0 { ActionResult::Done } else { ActionResult::Ongoing }
    }

    fn operator(&self) -> Option<AgentId> {
        self.operator
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

// ============================================================================
// OPERABLE SET
// ============================================================================

#[derive(Resource, Default)]
pub struct OperableSet {
    items: SlotMap<OperableId, Box<dyn Operable>>,
}

impl OperableSet {
    pub fn insert(&mut self, operable: impl Operable + 'static) -> OperableId {
        self.items.insert(Box::new(operable))
    }

    pub fn remove(&mut self, id: OperableId) -> Option<Box<dyn Operable>> {
        self.items.remove(id)
    }

    pub fn get(&self, id: OperableId) -> Option<&dyn Operable> {
        self.items.get(id).map(|op| &**op)
    }

    pub fn get_mut(&mut self, id: OperableId) -> Option<&mut (dyn Operable + 'static)> {
        self.items.get_mut(id).map(|op| &mut **op)
    }

    pub fn contains(&self, id: OperableId) -> bool {
        self.items.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperableId, &dyn Operable)> + '_ {
        self.items.iter().map(|(id, op)| (id, &**op))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn agent(n: u64) -> AgentId {
        AgentId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn turret_asks_for_crew_only_when_alerted_and_loaded() {
        let mut turret = Turret::new(IVec3::new(4, 0, 4));
        assert_eq!(turret.should_operate(), None);
        turret.set_alert(true);
        assert_eq!(turret.should_operate(), Some(Priority::High));
        turret.destroy();
        assert_eq!(turret.should_operate(), None);
    }

    #[test]
    fn start_and_end_are_idempotent() {
        let mut turret = Turret::new(IVec3::ZERO);
        let first = agent(1);
        turret.start_operation(first);
        turret.start_operation(agent(2));
        assert_eq!(turret.operator(), Some(first));

        turret.end_operation();
        turret.end_operation();
        assert_eq!(turret.operator(), None);
    }

    #[test]
    fn manned_turret_fires_until_empty() {
        let mut turret = Turret::new(IVec3::ZERO);
        let crew = agent(1);
        turret.set_alert(true);
        assert_eq!(turret.operate(crew, 0.1), ActionResult::Stopped);

        turret.start_operation(crew);
        let mut result = ActionResult::Ongoing;
        for _ in 0..10_000 {
            result = turret.operate(crew, TURRET_FIRE_INTERVAL);
            if result != ActionResult::Ongoing {
                break;
            }
        }
        assert_eq!(result, ActionResult::Done);
        assert_eq!(turret.shots_fired(), TURRET_AMMO);
        assert_eq!(turret.should_operate(), None);
    }

    #[test]
    fn set_resolves_handles() {
        let mut set = OperableSet::default();
        let id = set.insert(Turret::new(IVec3::new(1, 0, 1)));
        assert_eq!(set.get(id).map(|op| op.position()), Some(IVec3::new(1, 0, 1)));
        assert!(set.remove(id).is_some());
        assert!(set.get(id).is_none());
        assert!(set.is_empty());
    }
}
