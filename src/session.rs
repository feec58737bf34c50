//! Per-rig smoothing state, created when a rig binds and detached when it unbinds.

use bevy::prelude::*;
use bevy::utils::HashMap;
use thiserror::Error;

use crate::face::ExpressionState;
use crate::humanoid::HumanoidBone;
use crate::rig::{HumanoidRig, RigHandle, RigId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneState {
    pub rotation: Quat,
    pub position: Option<Vec3>,
}

/// Smoothing history of one rig.
///
/// A session only ever drives the rig it was attached to. Once detached it
/// refuses every further frame.
#[derive(Component, Debug, Clone)]
pub struct RigSession {
    rig: RigId,
    attached: bool,
    bones: HashMap<HumanoidBone, BoneState>,
    expression: ExpressionState,
}

impl RigSession {
    pub fn attach(rig: RigId) -> Self {
        Self {
            rig,
            attached: true,
            bones: HashMap::default(),
            expression: ExpressionState::default(),
        }
    }

    pub fn rig(&self) -> RigId {
        self.rig
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Drop all history and refuse further frames.
    pub fn detach(&mut self) {
        self.attached = false;
        self.bones.clear();
        self.expression = ExpressionState::default();
    }

    pub fn validate(&self, rig: &impl RigHandle) -> Result<(), RigError> {
        if !self.attached {
            return Err(RigError::Detached(self.rig));
        }
        if self.rig != rig.rig_id() {
            return Err(RigError::SessionMismatch {
                session: self.rig,
                rig: rig.rig_id(),
            });
        }
        Ok(())
    }

    pub fn bone_state(&self, bone: HumanoidBone) -> Option<&BoneState> {
        self.bones.get(&bone)
    }

    pub(crate) fn record_rotation(&mut self, bone: HumanoidBone, rotation: Quat) {
        self.bones
            .entry(bone)
            .and_modify(|state| state.rotation = rotation)
            .or_insert(BoneState {
                rotation,
                position: None,
            });
    }

    pub(crate) fn record_position(&mut self, bone: HumanoidBone, rotation: Quat, position: Vec3) {
        self.bones
            .entry(bone)
            .and_modify(|state| state.position = Some(position))
            .or_insert(BoneState {
                rotation,
                position: Some(position),
            });
    }

    pub fn expression(&self) -> &ExpressionState {
        &self.expression
    }

    pub(crate) fn expression_mut(&mut self) -> &mut ExpressionState {
        &mut self.expression
    }
}

#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RigError {
    #[error("Session of rig {0:?} is detached.")]
    Detached(RigId),
    #[error("Session of rig {session:?} cannot drive rig {rig:?}.")]
    SessionMismatch { session: RigId, rig: RigId },
    #[error("Entity {0:?} has no bound rig.")]
    Unbound(Entity),
}

/// Keep one attached [`RigSession`] next to every [`HumanoidRig`].
///
/// A session whose rig goes away stays on the entity, detached, so frames
/// still sent to it are rejected instead of vanishing.
pub(crate) fn sync_rig_sessions(
    mut commands: Commands,
    mut q_rigs: Query<(Entity, &HumanoidRig, Option<&mut RigSession>), Changed<HumanoidRig>>,
    mut q_orphans: Query<&mut RigSession, Without<HumanoidRig>>,
) {
    for (entity, rig, session) in q_rigs.iter_mut() {
        match session {
            Some(session) if session.rig() == rig.id() && session.is_attached() => {}
            Some(mut session) => {
                info!("Rig {:?} rebound as {:?}.", session.rig(), rig.id());
                *session = RigSession::attach(rig.id());
            }
            None => {
                debug!("Attaching session to rig {:?}.", rig.id());
                commands.entity(entity).insert(RigSession::attach(rig.id()));
            }
        }
    }

    for mut session in q_orphans.iter_mut() {
        if session.is_attached() {
            info!("Rig {:?} unbound, detaching its session.", session.rig());
            session.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;
    use crate::rig::VrmVersion;
    use crate::testing::MockRig;

    fn empty_rig() -> HumanoidRig {
        HumanoidRig::new(VrmVersion::V0, HashMap::default(), HashMap::default())
    }

    #[test]
    fn validate_rejects_other_rigs() {
        let rig = MockRig::default();
        let other = MockRig::default();
        let session = RigSession::attach(rig.id);

        assert_eq!(session.validate(&rig), Ok(()));
        assert_eq!(
            session.validate(&other),
            Err(RigError::SessionMismatch {
                session: rig.id,
                rig: other.id
            })
        );
    }

    #[test]
    fn detach_clears_history() {
        let rig = MockRig::default();
        let mut session = RigSession::attach(rig.id);
        session.record_rotation(HumanoidBone::Hips, Quat::from_rotation_x(0.5));

        session.detach();

        assert!(!session.is_attached());
        assert!(session.bone_state(HumanoidBone::Hips).is_none());
        assert_eq!(session.validate(&rig), Err(RigError::Detached(rig.id)));
    }

    #[test]
    fn position_keeps_recorded_rotation() {
        let mut session = RigSession::attach(RigId::next());
        let rotation = Quat::from_rotation_y(0.3);
        session.record_rotation(HumanoidBone::Hips, rotation);
        session.record_position(HumanoidBone::Hips, Quat::IDENTITY, Vec3::Y);

        let state = session.bone_state(HumanoidBone::Hips).unwrap();
        assert_eq!(state.rotation, rotation);
        assert_eq!(state.position, Some(Vec3::Y));
    }

    #[test]
    fn sessions_follow_rig_lifecycle() {
        let mut world = World::new();
        let rig = empty_rig();
        let first_id = rig.id();
        let entity = world.spawn(rig).id();

        world.run_system_once(sync_rig_sessions);
        let session = world.entity(entity).get::<RigSession>().unwrap();
        assert_eq!(session.rig(), first_id);

        // Rebinding replaces the session.
        let rebound = empty_rig();
        let second_id = rebound.id();
        world.entity_mut(entity).insert(rebound);
        world.run_system_once(sync_rig_sessions);
        let session = world.entity(entity).get::<RigSession>().unwrap();
        assert_eq!(session.rig(), second_id);
        assert!(session.is_attached());

        // Unbinding detaches it in place.
        world.entity_mut(entity).remove::<HumanoidRig>();
        world.run_system_once(sync_rig_sessions);
        let session = world.entity(entity).get::<RigSession>().unwrap();
        assert_eq!(session.rig(), second_id);
        assert!(!session.is_attached());

        // Binding again attaches a fresh session.
        let third = empty_rig();
        let third_id = third.id();
        world.entity_mut(entity).insert(third);
        world.run_system_once(sync_rig_sessions);
        let session = world.entity(entity).get::<RigSession>().unwrap();
        assert_eq!(session.rig(), third_id);
        assert!(session.is_attached());
    }
}
