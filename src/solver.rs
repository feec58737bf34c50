//! Landmark solver output, parsed once into a [`RiggedFrame`].

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::face::{MouthShape, RiggedFace};
use crate::humanoid::HumanoidBone;
use crate::pose_rigger::{LiveRigConfig, RiggedFrame};

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Euler {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Euler> for Vec3 {
    fn from(euler: Euler) -> Self {
        Vec3::new(euler.x, euler.y, euler.z)
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolvedHips {
    pub rotation: Euler,
    pub position: Option<Euler>,
}

/// Body regions keyed by PascalCase name (`RightUpperArm`).
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct SolvedPose {
    pub hips: SolvedHips,
    #[serde(flatten)]
    pub regions: BTreeMap<String, Euler>,
}

/// Hand segments keyed by name, with or without a side prefix (`LeftIndexProximal`, `Wrist`).
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct SolvedHand(pub BTreeMap<String, Euler>);

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EyeOpenness {
    pub l: f32,
    pub r: f32,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SolvedMouth {
    pub shape: MouthShape,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Pupil {
    pub x: f32,
    pub y: f32,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SolvedFace {
    pub head: Euler,
    pub eye: EyeOpenness,
    pub mouth: SolvedMouth,
    pub pupil: Pupil,
}

impl From<SolvedFace> for RiggedFace {
    fn from(face: SolvedFace) -> Self {
        RiggedFace {
            head: face.head.into(),
            eye_left: face.eye.l,
            eye_right: face.eye.r,
            mouth: face.mouth.shape,
            pupil: Vec2::new(face.pupil.x, face.pupil.y),
        }
    }
}

/// One frame of solver results. Hands are labelled as the landmark detector saw them.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverOutput {
    pub pose: Option<SolvedPose>,
    pub left_hand: Option<SolvedHand>,
    pub right_hand: Option<SolvedHand>,
    pub face: Option<SolvedFace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn prefix(self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }

    fn hand_bone(self) -> HumanoidBone {
        match self {
            Side::Left => HumanoidBone::LeftHand,
            Side::Right => HumanoidBone::RightHand,
        }
    }
}

impl SolverOutput {
    pub fn into_frame(self, config: &LiveRigConfig) -> RiggedFrame {
        let mut frame = RiggedFrame::new();
        let mut wrist_roll = [None, None];

        if let Some(pose) = self.pose {
            frame.set_rotation(HumanoidBone::Hips, pose.hips.rotation.into());
            if let Some(position) = pose.hips.position {
                frame = frame.with_hips_position(position.into());
            }

            for (region, euler) in pose.regions {
                match region.as_str() {
                    // Hand roll only feeds the wrist composition below.
                    "LeftHand" => wrist_roll[0] = Some(euler.z),
                    "RightHand" => wrist_roll[1] = Some(euler.z),
                    _ => match HumanoidBone::from_region_name(&region) {
                        Some(bone) => frame.set_rotation(bone, euler.into()),
                        None => debug!("Skipping unknown pose region {region}."),
                    },
                }
            }

            if config.spine_drives_chest && frame.rotation(HumanoidBone::Chest).is_none() {
                if let Some(spine) = frame.rotation(HumanoidBone::Spine) {
                    frame.set_rotation(HumanoidBone::Chest, spine);
                }
            }
        }

        let (left, right) = match config.mirror_hands {
            true => (self.right_hand, self.left_hand),
            false => (self.left_hand, self.right_hand),
        };
        for (side, hand, roll) in [
            (Side::Left, left, wrist_roll[0]),
            (Side::Right, right, wrist_roll[1]),
        ] {
            if let Some(hand) = hand {
                rig_hand(&mut frame, side, hand, roll);
            }
        }

        if let Some(face) = self.face {
            frame.set_rotation(HumanoidBone::Neck, face.head.into());
            frame = frame.with_face(face.into());
        }

        frame
    }
}

fn rig_hand(frame: &mut RiggedFrame, side: Side, hand: SolvedHand, roll: Option<f32>) {
    for (segment, euler) in hand.0 {
        let segment = segment
            .strip_prefix("Left")
            .or_else(|| segment.strip_prefix("Right"))
            .unwrap_or(&segment);

        if segment == "Wrist" {
            // Without a solved pose the wrist has no roll.
            let z = roll.unwrap_or(0.0);
            frame.set_rotation(side.hand_bone(), Vec3::new(euler.x, euler.y, z));
            continue;
        }

        let name = format!("{}{segment}", side.prefix());
        match HumanoidBone::from_region_name(&name) {
            Some(bone) => frame.set_rotation(bone, euler.into()),
            None => debug!("Skipping unknown hand segment {name}."),
        }
    }
}
