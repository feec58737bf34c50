use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Bones of a normalized humanoid rig.
///
/// Serialized with the camelCase names used by normalized humanoid rigs (`leftUpperArm`).
#[derive(
    Serialize, Deserialize, Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub enum HumanoidBone {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
    LeftThumbMetacarpal,
    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,
    RightThumbMetacarpal,
    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
}

use HumanoidBone as B;

/// (bone, normalized name, VRoid node name)
const BONE_NAMES: [(HumanoidBone, &str, Option<&str>); 54] = [
    (B::Hips, "hips", Some("J_Bip_C_Hips")),
    (B::Spine, "spine", Some("J_Bip_C_Spine")),
    (B::Chest, "chest", Some("J_Bip_C_Chest")),
    (B::UpperChest, "upperChest", Some("J_Bip_C_UpperChest")),
    (B::Neck, "neck", Some("J_Bip_C_Neck")),
    (B::Head, "head", Some("J_Bip_C_Head")),
    (B::LeftShoulder, "leftShoulder", Some("J_Bip_L_Shoulder")),
    (B::LeftUpperArm, "leftUpperArm", Some("J_Bip_L_UpperArm")),
    (B::LeftLowerArm, "leftLowerArm", Some("J_Bip_L_LowerArm")),
    (B::LeftHand, "leftHand", Some("J_Bip_L_Hand")),
    (B::RightShoulder, "rightShoulder", Some("J_Bip_R_Shoulder")),
    (B::RightUpperArm, "rightUpperArm", Some("J_Bip_R_UpperArm")),
    (B::RightLowerArm, "rightLowerArm", Some("J_Bip_R_LowerArm")),
    (B::RightHand, "rightHand", Some("J_Bip_R_Hand")),
    (B::LeftUpperLeg, "leftUpperLeg", Some("J_Bip_L_UpperLeg")),
    (B::LeftLowerLeg, "leftLowerLeg", Some("J_Bip_L_LowerLeg")),
    (B::LeftFoot, "leftFoot", Some("J_Bip_L_Foot")),
    (B::LeftToes, "leftToes", Some("J_Bip_L_ToeBase")),
    (B::RightUpperLeg, "rightUpperLeg", Some("J_Bip_R_UpperLeg")),
    (B::RightLowerLeg, "rightLowerLeg", Some("J_Bip_R_LowerLeg")),
    (B::RightFoot, "rightFoot", Some("J_Bip_R_Foot")),
    (B::RightToes, "rightToes", Some("J_Bip_R_ToeBase")),
    (B::LeftThumbMetacarpal, "leftThumbMetacarpal", None),
    (B::LeftThumbProximal, "leftThumbProximal", Some("J_Bip_L_Thumb1")),
    (B::LeftThumbIntermediate, "leftThumbIntermediate", Some("J_Bip_L_Thumb2")),
    (B::LeftThumbDistal, "leftThumbDistal", Some("J_Bip_L_Thumb3")),
    (B::LeftIndexProximal, "leftIndexProximal", Some("J_Bip_L_Index1")),
    (B::LeftIndexIntermediate, "leftIndexIntermediate", Some("J_Bip_L_Index2")),
    (B::LeftIndexDistal, "leftIndexDistal", Some("J_Bip_L_Index3")),
    (B::LeftMiddleProximal, "leftMiddleProximal", Some("J_Bip_L_Middle1")),
    (B::LeftMiddleIntermediate, "leftMiddleIntermediate", Some("J_Bip_L_Middle2")),
    (B::LeftMiddleDistal, "leftMiddleDistal", Some("J_Bip_L_Middle3")),
    (B::LeftRingProximal, "leftRingProximal", Some("J_Bip_L_Ring1")),
    (B::LeftRingIntermediate, "leftRingIntermediate", Some("J_Bip_L_Ring2")),
    (B::LeftRingDistal, "leftRingDistal", Some("J_Bip_L_Ring3")),
    (B::LeftLittleProximal, "leftLittleProximal", Some("J_Bip_L_Little1")),
    (B::LeftLittleIntermediate, "leftLittleIntermediate", Some("J_Bip_L_Little2")),
    (B::LeftLittleDistal, "leftLittleDistal", Some("J_Bip_L_Little3")),
    (B::RightThumbMetacarpal, "rightThumbMetacarpal", None),
    (B::RightThumbProximal, "rightThumbProximal", Some("J_Bip_R_Thumb1")),
    (B::RightThumbIntermediate, "rightThumbIntermediate", Some("J_Bip_R_Thumb2")),
    (B::RightThumbDistal, "rightThumbDistal", Some("J_Bip_R_Thumb3")),
    (B::RightIndexProximal, "rightIndexProximal", Some("J_Bip_R_Index1")),
    (B::RightIndexIntermediate, "rightIndexIntermediate", Some("J_Bip_R_Index2")),
    (B::RightIndexDistal, "rightIndexDistal", Some("J_Bip_R_Index3")),
    (B::RightMiddleProximal, "rightMiddleProximal", Some("J_Bip_R_Middle1")),
    (B::RightMiddleIntermediate, "rightMiddleIntermediate", Some("J_Bip_R_Middle2")),
    (B::RightMiddleDistal, "rightMiddleDistal", Some("J_Bip_R_Middle3")),
    (B::RightRingProximal, "rightRingProximal", Some("J_Bip_R_Ring1")),
    (B::RightRingIntermediate, "rightRingIntermediate", Some("J_Bip_R_Ring2")),
    (B::RightRingDistal, "rightRingDistal", Some("J_Bip_R_Ring3")),
    (B::RightLittleProximal, "rightLittleProximal", Some("J_Bip_R_Little1")),
    (B::RightLittleIntermediate, "rightLittleIntermediate", Some("J_Bip_R_Little2")),
    (B::RightLittleDistal, "rightLittleDistal", Some("J_Bip_R_Little3")),
];

/// How a scene node name matched a [`HumanoidBone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMatch {
    /// Normalized humanoid name, e.g. `leftUpperArm`.
    Normalized(HumanoidBone),
    /// Raw VRoid skeleton name, e.g. `J_Bip_L_UpperArm`.
    Vroid(HumanoidBone),
}

impl HumanoidBone {
    pub fn iter() -> impl Iterator<Item = HumanoidBone> {
        BONE_NAMES.iter().map(|(bone, ..)| *bone)
    }

    /// Normalized camelCase name.
    pub fn name(self) -> &'static str {
        BONE_NAMES[self as usize].1
    }

    pub fn vroid_name(self) -> Option<&'static str> {
        BONE_NAMES[self as usize].2
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BONE_NAMES
            .iter()
            .find(|(_, normalized, _)| *normalized == name)
            .map(|(bone, ..)| *bone)
    }

    /// Parse a pose solver region name (`RightUpperArm`) into a bone.
    ///
    /// Only the first character is lowercased, nothing else is normalized.
    pub fn from_region_name(region: &str) -> Option<Self> {
        Self::from_name(&lowercase_first(region))
    }

    pub fn from_node_name(node: &str) -> Option<NodeMatch> {
        if let Some(bone) = Self::from_name(node) {
            return Some(NodeMatch::Normalized(bone));
        }

        BONE_NAMES
            .iter()
            .find(|(.., vroid)| *vroid == Some(node))
            .map(|(bone, ..)| NodeMatch::Vroid(*bone))
    }
}

impl std::fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn lowercase_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_discriminants() {
        for (i, bone) in HumanoidBone::iter().enumerate() {
            assert_eq!(bone as usize, i, "{bone:?} is out of place");
        }
    }

    #[test]
    fn region_names_lowercase_first_character_only() {
        assert_eq!(
            HumanoidBone::from_region_name("RightUpperArm"),
            Some(HumanoidBone::RightUpperArm)
        );
        assert_eq!(HumanoidBone::from_region_name("Hips"), Some(HumanoidBone::Hips));
        assert_eq!(HumanoidBone::from_region_name("RIGHTUPPERARM"), None);
        assert_eq!(HumanoidBone::from_region_name("Tail"), None);
        assert_eq!(HumanoidBone::from_region_name(""), None);
    }

    #[test]
    fn node_names_prefer_normalized_form() {
        assert_eq!(
            HumanoidBone::from_node_name("leftLowerLeg"),
            Some(NodeMatch::Normalized(HumanoidBone::LeftLowerLeg))
        );
        assert_eq!(
            HumanoidBone::from_node_name("J_Bip_L_LowerLeg"),
            Some(NodeMatch::Vroid(HumanoidBone::LeftLowerLeg))
        );
        assert_eq!(HumanoidBone::from_node_name("J_Sec_Hair1_01"), None);
    }

    #[test]
    fn serde_uses_normalized_names() {
        let json = serde_json::to_string(&HumanoidBone::LeftIndexDistal).unwrap();
        assert_eq!(json, "\"leftIndexDistal\"");
        assert_eq!(HumanoidBone::LeftIndexDistal.to_string(), "leftIndexDistal");
    }
}
