//! Choreography scoring: compares a user's bone positions against a reference rig.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::RigConfig;
use crate::humanoid::HumanoidBone;
use crate::rig::HumanoidRig;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ScoreTier {
    /// Exclusive upper bound of the distance.
    pub max_distance: f32,
    pub points: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScoreConfig {
    /// Checked in order, the first matching tier wins.
    pub tiers: Vec<ScoreTier>,
    /// Points for a distance beyond every tier.
    pub miss_points: u32,
    pub bones: Vec<HumanoidBone>,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        use HumanoidBone as B;

        Self {
            tiers: vec![
                ScoreTier {
                    max_distance: 0.1,
                    points: 100,
                },
                ScoreTier {
                    max_distance: 0.3,
                    points: 70,
                },
                ScoreTier {
                    max_distance: 0.5,
                    points: 40,
                },
            ],
            miss_points: 0,
            bones: vec![
                B::Hips,
                B::Spine,
                B::Chest,
                B::Neck,
                B::Head,
                B::LeftShoulder,
                B::LeftUpperArm,
                B::LeftLowerArm,
                B::LeftHand,
                B::RightShoulder,
                B::RightUpperArm,
                B::RightLowerArm,
                B::RightHand,
                B::LeftUpperLeg,
                B::LeftLowerLeg,
                B::LeftFoot,
                B::RightUpperLeg,
                B::RightLowerLeg,
                B::RightFoot,
            ],
        }
    }
}

impl ScoreConfig {
    pub fn award_points(&self, distance: f32) -> u32 {
        self.tiers
            .iter()
            .find(|tier| distance < tier.max_distance)
            .map(|tier| tier.points)
            .unwrap_or(self.miss_points)
    }
}

/// World space bone positions of one rig.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct BonePositions(pub HashMap<HumanoidBone, Vec3>);

impl BonePositions {
    pub fn get(&self, bone: HumanoidBone) -> Option<Vec3> {
        self.0.get(&bone).copied()
    }
}

impl FromIterator<(HumanoidBone, Vec3)> for BonePositions {
    fn from_iter<T: IntoIterator<Item = (HumanoidBone, Vec3)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneScore {
    pub bone: HumanoidBone,
    /// `None` when either side lacks the bone.
    pub distance: Option<f32>,
    pub points: u32,
}

#[derive(Component, Default, Debug, Clone, PartialEq)]
pub struct PoseScore {
    pub bones: Vec<BoneScore>,
    pub total: u32,
}

pub fn score_pose(user: &BonePositions, reference: &BonePositions, config: &ScoreConfig) -> PoseScore {
    let bones = config
        .bones
        .iter()
        .map(|&bone| match (user.get(bone), reference.get(bone)) {
            (Some(user), Some(reference)) => {
                let distance = user.distance(reference);
                BoneScore {
                    bone,
                    distance: Some(distance),
                    points: config.award_points(distance),
                }
            }
            _ => BoneScore {
                bone,
                distance: None,
                points: 0,
            },
        })
        .collect::<Vec<_>>();

    let total = bones.iter().map(|score| score.points).sum();
    PoseScore { bones, total }
}

pub fn capture_bone_positions(
    rig: &HumanoidRig,
    q_globals: &Query<&GlobalTransform>,
) -> BonePositions {
    rig.bones()
        .filter_map(|(bone, entity)| {
            q_globals
                .get(entity)
                .ok()
                .map(|global| (bone, global.translation()))
        })
        .collect()
}

/// Scores this rig against the reference rig entity every frame into [`PoseScore`].
#[derive(Component, Debug, Clone, Copy)]
pub struct ScoreAgainst(pub Entity);

pub(crate) fn score_rigs(
    mut commands: Commands,
    q_scored: Query<(Entity, &HumanoidRig, &ScoreAgainst)>,
    q_rigs: Query<&HumanoidRig>,
    q_globals: Query<&GlobalTransform>,
    config: Res<RigConfig>,
) {
    for (entity, rig, ScoreAgainst(reference)) in q_scored.iter() {
        let Ok(reference_rig) = q_rigs.get(*reference) else {
            debug!("Score reference {reference:?} is not a bound rig.");
            continue;
        };

        let user = capture_bone_positions(rig, &q_globals);
        let reference = capture_bone_positions(reference_rig, &q_globals);
        let score = score_pose(&user, &reference, &config.score);

        commands.entity(entity).insert(score);
    }
}
