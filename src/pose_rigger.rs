//! Damped, smoothed application of solved euler rotations and hip position to a rig.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy_clip_retarget::prelude::euler_xyz_to_quat;
use serde::{Deserialize, Serialize};

use crate::config::RigConfig;
use crate::face::{apply_face, ExpressionWeights, LookAt, RiggedFace};
use crate::humanoid::HumanoidBone;
use crate::rig::{EcsRig, HumanoidRig, RigHandle, VrmVersion};
use crate::session::{RigError, RigSession};

/// Rotation smoothing of one bone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RigParams {
    /// Scale applied to the solved angles.
    pub dampener: f32,
    /// Slerp factor toward the damped target each frame.
    pub lerp_amount: f32,
    /// Whether `dampener` also scales the y axis.
    pub damp_yaw: bool,
}

impl RigParams {
    pub fn new(dampener: f32, lerp_amount: f32) -> Self {
        Self {
            dampener,
            lerp_amount,
            ..default()
        }
    }
}

impl Default for RigParams {
    fn default() -> Self {
        Self {
            dampener: 1.0,
            lerp_amount: 0.3,
            damp_yaw: true,
        }
    }
}

/// Position smoothing of the hips.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PositionParams {
    pub dampener: f32,
    pub lerp_amount: f32,
    /// Added after `axis_signs`, before `dampener`.
    pub offset: Vec3,
    pub axis_signs: Vec3,
}

impl Default for PositionParams {
    fn default() -> Self {
        Self {
            dampener: 1.0,
            lerp_amount: 0.07,
            offset: Vec3::Y,
            axis_signs: Vec3::new(1.0, 1.0, -1.0),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LiveRigConfig {
    /// Used by every bone without an entry in `bone_params`.
    pub default_params: RigParams,
    pub bone_params: HashMap<HumanoidBone, RigParams>,
    pub hips_position: PositionParams,
    /// Added to the solved hip euler before damping.
    pub hip_rotation_offset: Vec3,
    /// Drive the left side from the right hand and vice versa.
    pub mirror_hands: bool,
    /// Copy the solved spine onto the chest when no chest was solved.
    pub spine_drives_chest: bool,
}

impl LiveRigConfig {
    pub fn params(&self, bone: HumanoidBone) -> RigParams {
        self.bone_params
            .get(&bone)
            .copied()
            .unwrap_or(self.default_params)
    }
}

impl Default for LiveRigConfig {
    fn default() -> Self {
        Self {
            default_params: RigParams::default(),
            bone_params: HashMap::from([
                (HumanoidBone::Hips, RigParams::new(0.7, 0.3)),
                (HumanoidBone::Neck, RigParams::new(0.7, 0.3)),
                (HumanoidBone::Chest, RigParams::new(0.25, 0.3)),
                (HumanoidBone::Spine, RigParams::new(0.45, 0.3)),
            ]),
            hips_position: PositionParams::default(),
            hip_rotation_offset: Vec3::ZERO,
            mirror_hands: true,
            spine_drives_chest: true,
        }
    }
}

/// Solved euler rotations (radians, XYZ order) and hip position of one frame.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RiggedFrame {
    rotations: Vec<(HumanoidBone, Vec3)>,
    hips_position: Option<Vec3>,
    face: Option<RiggedFace>,
}

impl RiggedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rotation(mut self, bone: HumanoidBone, euler: Vec3) -> Self {
        self.set_rotation(bone, euler);
        self
    }

    pub fn with_hips_position(mut self, position: Vec3) -> Self {
        self.hips_position = Some(position);
        self
    }

    pub fn with_face(mut self, face: RiggedFace) -> Self {
        self.face = Some(face);
        self
    }

    /// Later rotations of the same bone replace earlier ones.
    pub fn set_rotation(&mut self, bone: HumanoidBone, euler: Vec3) {
        match self.rotations.iter_mut().find(|(b, _)| *b == bone) {
            Some((_, existing)) => *existing = euler,
            None => self.rotations.push((bone, euler)),
        }
    }

    pub fn rotation(&self, bone: HumanoidBone) -> Option<Vec3> {
        self.rotations
            .iter()
            .find(|(b, _)| *b == bone)
            .map(|(_, euler)| *euler)
    }

    pub fn rotations(&self) -> impl Iterator<Item = (HumanoidBone, Vec3)> + '_ {
        self.rotations.iter().copied()
    }

    pub fn hips_position(&self) -> Option<Vec3> {
        self.hips_position
    }

    pub fn face(&self) -> Option<&RiggedFace> {
        self.face.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty() && self.hips_position.is_none() && self.face.is_none()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub rotated: usize,
    pub positioned: bool,
    /// Bones in the frame that the rig does not have.
    pub missing: Vec<HumanoidBone>,
}

/// Target rotation of `euler` after damping and the version's axis mirroring.
pub fn damped_rotation(euler: Vec3, version: VrmVersion, params: &RigParams) -> Quat {
    let sign = version.axis_sign();
    let yaw_dampener = match params.damp_yaw {
        true => params.dampener,
        false => 1.0,
    };

    euler_xyz_to_quat(Vec3::new(
        euler.x * params.dampener * sign,
        euler.y * yaw_dampener,
        euler.z * params.dampener * sign,
    ))
}

/// Slerp `bone` toward the damped `euler` target.
///
/// Returns `false` without touching anything when the rig lacks the bone.
pub fn rig_rotation(
    rig: &mut impl RigHandle,
    session: &mut RigSession,
    bone: HumanoidBone,
    euler: Vec3,
    params: &RigParams,
) -> bool {
    let Some(current) = rig.bone_rotation(bone) else {
        return false;
    };
    let from = session
        .bone_state(bone)
        .map(|state| state.rotation)
        .unwrap_or(current);

    let target = damped_rotation(euler, rig.version(), params);
    let rotation = from.slerp(target, params.lerp_amount);

    rig.set_bone_rotation(bone, rotation);
    session.record_rotation(bone, rotation);
    true
}

/// Lerp `bone` toward `position` mapped through `params`.
pub fn rig_position(
    rig: &mut impl RigHandle,
    session: &mut RigSession,
    bone: HumanoidBone,
    position: Vec3,
    params: &PositionParams,
) -> bool {
    let (Some(current), Some(rotation)) = (rig.bone_position(bone), rig.bone_rotation(bone)) else {
        return false;
    };
    let from = session
        .bone_state(bone)
        .and_then(|state| state.position)
        .unwrap_or(current);

    let target = (position * params.axis_signs + params.offset) * params.dampener;
    let position = from.lerp(target, params.lerp_amount);

    rig.set_bone_position(bone, position);
    session.record_position(bone, rotation, position);
    true
}

/// Apply every rotation of `frame` and the hip position to `rig`.
///
/// Fails before touching the rig when `session` cannot drive it. Face data is
/// left to [`apply_face`].
pub fn apply_frame(
    frame: &RiggedFrame,
    rig: &mut impl RigHandle,
    session: &mut RigSession,
    config: &LiveRigConfig,
) -> Result<FrameReport, RigError> {
    session.validate(&*rig)?;

    let mut report = FrameReport::default();
    for (bone, mut euler) in frame.rotations() {
        if bone == HumanoidBone::Hips {
            euler += config.hip_rotation_offset;
        }

        match rig_rotation(rig, session, bone, euler, &config.params(bone)) {
            true => report.rotated += 1,
            false => report.missing.push(bone),
        }
    }

    if let Some(position) = frame.hips_position() {
        report.positioned = rig_position(
            rig,
            session,
            HumanoidBone::Hips,
            position,
            &config.hips_position,
        );
    }

    Ok(report)
}

/// A solved frame to apply to the rig on `rig`.
#[derive(Event, Debug, Clone)]
pub struct SolvedFrame {
    pub rig: Entity,
    pub frame: RiggedFrame,
}

/// A [`SolvedFrame`] that could not be applied.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedFrame {
    pub rig: Entity,
    pub error: RigError,
}

pub(crate) fn apply_solved_frames(
    mut frame_evr: EventReader<SolvedFrame>,
    mut rejected_evw: EventWriter<RejectedFrame>,
    mut q_rigs: Query<(
        &HumanoidRig,
        &mut RigSession,
        &mut ExpressionWeights,
        &mut LookAt,
    )>,
    q_unbound: Query<&RigSession, Without<HumanoidRig>>,
    mut q_transforms: Query<&mut Transform>,
    config: Res<RigConfig>,
) {
    for SolvedFrame { rig: entity, frame } in frame_evr.read() {
        let mut reject = |error: RigError| {
            warn!("Rejecting solved frame for {entity:?}: {error}");
            rejected_evw.send(RejectedFrame {
                rig: *entity,
                error,
            });
        };

        let Ok((rig, mut session, mut expressions, mut look_at)) = q_rigs.get_mut(*entity) else {
            match q_unbound.get(*entity) {
                Ok(session) => reject(RigError::Detached(session.rig())),
                Err(_) => reject(RigError::Unbound(*entity)),
            }
            continue;
        };

        let mut handle = EcsRig {
            rig,
            transforms: &mut q_transforms,
            expressions: &mut expressions,
            look_at: &mut look_at,
        };

        match apply_frame(frame, &mut handle, &mut session, &config.live) {
            Ok(report) if !report.missing.is_empty() => {
                trace!("Rig {:?} has no {:?}.", rig.id(), report.missing);
            }
            Ok(_) => {}
            Err(err) => {
                reject(err);
                continue;
            }
        }

        if let Some(face) = frame.face() {
            if let Err(err) = apply_face(face, &mut handle, &mut session, &config.face) {
                reject(err);
            }
        }
    }
}
