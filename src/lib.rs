use bevy::prelude::*;
use bevy_clip_retarget::ClipRetargetPlugin;

pub mod clip_player;
pub mod config;
pub mod face;
pub mod humanoid;
pub mod pose_rigger;
pub mod pose_score;
pub mod rig;
pub mod session;
pub mod solver;

#[cfg(test)]
mod testing;

pub use bevy_clip_retarget;

pub mod prelude {
    pub use crate::clip_player::{ClipPlayer, RetargetClip};
    pub use crate::config::{RigConfig, RigConfigHandle};
    pub use crate::face::{apply_face, ExpressionPreset, ExpressionWeights, LookAt, RiggedFace};
    pub use crate::humanoid::HumanoidBone;
    pub use crate::pose_rigger::{apply_frame, rig_position, rig_rotation};
    pub use crate::pose_rigger::{LiveRigConfig, PositionParams, RigParams, RiggedFrame};
    pub use crate::pose_rigger::{RejectedFrame, SolvedFrame};
    pub use crate::pose_score::{score_pose, PoseScore, ScoreAgainst, ScoreConfig};
    pub use crate::rig::{HumanoidRig, PendingRig, RigHandle, RigId, VrmVersion};
    pub use crate::session::{RigError, RigSession};
    pub use crate::solver::SolverOutput;
    pub use crate::{RigPlugin, RigSet, VrmRetargetPlugin};
    pub use bevy_clip_retarget::prelude::*;
}

/// Everything: clip retargeting assets, config assets, playback and the live rig.
pub struct VrmRetargetPlugin;

impl Plugin for VrmRetargetPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ClipRetargetPlugin,
            config::RigConfigPlugin,
            RigPlugin,
            clip_player::ClipPlayerPlugin,
        ));
    }
}

/// Rig binding, sessions, live frame application and scoring. Needs no asset server.
pub struct RigPlugin;

impl Plugin for RigPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                RigSet::Bind,
                RigSet::Session,
                RigSet::ApplyFrame,
                RigSet::PlayClip,
            )
                .chain(),
        );

        app.init_resource::<config::RigConfig>()
            .add_event::<pose_rigger::SolvedFrame>()
            .add_event::<pose_rigger::RejectedFrame>()
            .add_systems(
                Update,
                (
                    rig::bind_humanoid_rigs.in_set(RigSet::Bind),
                    session::sync_rig_sessions.in_set(RigSet::Session),
                    pose_rigger::apply_solved_frames.in_set(RigSet::ApplyFrame),
                ),
            )
            .add_systems(
                PostUpdate,
                pose_score::score_rigs
                    .in_set(RigSet::Score)
                    .after(TransformSystem::TransformPropagate),
            );
    }
}

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum RigSet {
    Bind,
    Session,
    ApplyFrame,
    PlayClip,
    Score,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::tests::spawn_vroid_scene;
    use crate::prelude::*;

    fn app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>().add_plugins(RigPlugin);
        app
    }

    fn bound_scene(app: &mut App) -> Entity {
        let root = spawn_vroid_scene(app.world_mut(), VrmVersion::V0);
        app.update();
        app.update();
        root
    }

    fn spine(app: &App, root: Entity) -> Quat {
        let rig = app.world().get::<HumanoidRig>(root).unwrap();
        let spine = rig.bone(HumanoidBone::Spine).unwrap();
        app.world().get::<Transform>(spine).unwrap().rotation
    }

    #[test]
    fn solved_frames_drive_bound_rig() {
        let mut app = app();
        let root = bound_scene(&mut app);

        let session = app.world().get::<RigSession>(root).unwrap();
        let rig = app.world().get::<HumanoidRig>(root).unwrap();
        assert_eq!(session.rig(), rig.id());

        app.world_mut().send_event(SolvedFrame {
            rig: root,
            frame: RiggedFrame::new().with_rotation(HumanoidBone::Spine, Vec3::new(0.2, 0.0, 0.0)),
        });
        app.update();

        let expected = Quat::IDENTITY.slerp(Quat::from_rotation_x(0.2 * 0.45), 0.3);
        assert!(spine(&app, root).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn face_frames_reach_expressions() {
        let mut app = app();
        let root = bound_scene(&mut app);

        app.world_mut().send_event(SolvedFrame {
            rig: root,
            frame: RiggedFrame::new().with_face(RiggedFace {
                eye_left: 0.0,
                eye_right: 1.0,
                pupil: Vec2::new(0.5, 0.0),
                ..default()
            }),
        });
        app.update();

        let weights = app.world().get::<ExpressionWeights>(root).unwrap();
        assert!((weights.get(ExpressionPreset::BlinkLeft) - 0.75).abs() < 1e-6);
        assert_eq!(weights.get(ExpressionPreset::BlinkRight), 0.0);
        let look_at = app.world().get::<LookAt>(root).unwrap();
        assert!((look_at.yaw - 0.2).abs() < 1e-6);
    }

    #[test]
    fn rebinding_replaces_session() {
        let mut app = app();
        let root = bound_scene(&mut app);
        let first = app.world().get::<HumanoidRig>(root).unwrap().id();

        app.world_mut().entity_mut(root).insert(PendingRig::default());
        app.update();
        app.update();

        let rig = app.world().get::<HumanoidRig>(root).unwrap().id();
        let session = app.world().get::<RigSession>(root).unwrap();
        assert_ne!(rig, first);
        assert_eq!(session.rig(), rig);
        assert!(session.is_attached());
    }

    fn rejected(app: &App) -> Vec<RejectedFrame> {
        let events = app.world().resource::<Events<RejectedFrame>>();
        events.get_reader().read(events).copied().collect()
    }

    #[test]
    fn frames_for_unbound_rig_are_rejected() {
        let mut app = app();
        let root = bound_scene(&mut app);
        let before = spine(&app, root);
        let rig = app.world().get::<HumanoidRig>(root).unwrap().clone();
        let spine_entity = rig.bone(HumanoidBone::Spine).unwrap();

        app.world_mut().entity_mut(root).remove::<HumanoidRig>();
        app.update();
        let session = app.world().get::<RigSession>(root).unwrap();
        assert!(!session.is_attached());

        app.world_mut().send_event(SolvedFrame {
            rig: root,
            frame: RiggedFrame::new().with_rotation(HumanoidBone::Spine, Vec3::X),
        });
        app.update();

        assert_eq!(
            rejected(&app),
            vec![RejectedFrame {
                rig: root,
                error: RigError::Detached(rig.id()),
            }]
        );
        let after = app.world().get::<Transform>(spine_entity).unwrap().rotation;
        assert_eq!(before, after);
    }

    #[test]
    fn frames_for_plain_entities_are_rejected() {
        let mut app = app();
        let entity = app.world_mut().spawn_empty().id();

        app.world_mut().send_event(SolvedFrame {
            rig: entity,
            frame: RiggedFrame::new().with_rotation(HumanoidBone::Spine, Vec3::X),
        });
        app.update();

        assert_eq!(
            rejected(&app),
            vec![RejectedFrame {
                rig: entity,
                error: RigError::Unbound(entity),
            }]
        );
    }
}
