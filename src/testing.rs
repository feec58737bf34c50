//! In-memory [`RigHandle`] for tests.

use bevy::prelude::*;
use bevy::utils::HashMap;

use crate::face::{ExpressionPreset, ExpressionWeights, LookAt};
use crate::humanoid::HumanoidBone;
use crate::rig::{RigHandle, RigId, VrmVersion};

pub struct MockRig {
    pub id: RigId,
    pub version: VrmVersion,
    pub bones: HashMap<HumanoidBone, Transform>,
    pub expressions: ExpressionWeights,
    pub look_at: LookAt,
}

impl MockRig {
    pub fn with_bones(version: VrmVersion, bones: &[HumanoidBone]) -> Self {
        Self {
            version,
            bones: bones
                .iter()
                .map(|bone| (*bone, Transform::default()))
                .collect(),
            ..default()
        }
    }
}

impl Default for MockRig {
    fn default() -> Self {
        Self {
            id: RigId::next(),
            version: VrmVersion::V0,
            bones: HashMap::default(),
            expressions: ExpressionWeights::default(),
            look_at: LookAt::default(),
        }
    }
}

impl RigHandle for MockRig {
    fn rig_id(&self) -> RigId {
        self.id
    }

    fn version(&self) -> VrmVersion {
        self.version
    }

    fn bone_rotation(&self, bone: HumanoidBone) -> Option<Quat> {
        self.bones.get(&bone).map(|t| t.rotation)
    }

    fn set_bone_rotation(&mut self, bone: HumanoidBone, rotation: Quat) {
        if let Some(transform) = self.bones.get_mut(&bone) {
            transform.rotation = rotation;
        }
    }

    fn bone_position(&self, bone: HumanoidBone) -> Option<Vec3> {
        self.bones.get(&bone).map(|t| t.translation)
    }

    fn set_bone_position(&mut self, bone: HumanoidBone, position: Vec3) {
        if let Some(transform) = self.bones.get_mut(&bone) {
            transform.translation = position;
        }
    }

    fn expression(&self, preset: ExpressionPreset) -> f32 {
        self.expressions.get(preset)
    }

    fn set_expression(&mut self, preset: ExpressionPreset, weight: f32) {
        self.expressions.set(preset, weight);
    }

    fn apply_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        self.look_at = LookAt { yaw, pitch };
    }
}
