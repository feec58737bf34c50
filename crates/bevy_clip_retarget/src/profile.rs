use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, AsyncReadExt, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bone_map::{BoneMapping, InversionSet};
use crate::error::JsonAssetLoaderError;

pub struct RetargetProfilePlugin;

impl Plugin for RetargetProfilePlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<RetargetProfile>()
            .init_asset_loader::<RetargetProfileLoader>();
    }
}

/// Everything needed to move motion from one skeleton convention onto another.
///
/// A profile describes one source/target rig pairing. The inversion list in particular
/// is tuned per pairing and should not be assumed to hold for other skeletons.
#[derive(Asset, TypePath, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RetargetProfile {
    /// Bumped whenever the mapping data changes in an incompatible way.
    pub version: u32,
    pub name: String,
    pub mapping: BoneMapping,
    #[serde(default)]
    pub inversion: InversionSet,
}

impl RetargetProfile {
    pub fn new(name: impl Into<String>, mapping: BoneMapping, inversion: InversionSet) -> Self {
        Self {
            version: 1,
            name: name.into(),
            mapping,
            inversion,
        }
    }

    /// SMPL (`m_avg_*`) capture skeleton onto a VRoid (`J_Bip_*`) humanoid.
    ///
    /// Legs are crossed over on purpose, the capture data is mirrored.
    pub fn smpl_to_vroid() -> Self {
        let mapping = BoneMapping::from_iter([
            ("m_avg_Pelvis", "J_Bip_C_Hips"),
            ("m_avg_Spine1", "J_Bip_C_Spine"),
            ("m_avg_Spine2", "J_Bip_C_Chest"),
            ("m_avg_Spine3", "J_Bip_C_UpperChest"),
            ("m_avg_Neck", "J_Bip_C_Neck"),
            ("m_avg_Head", "J_Bip_C_Head"),
            // Left leg
            ("m_avg_L_Hip", "J_Bip_R_UpperLeg"),
            ("m_avg_L_Knee", "J_Bip_R_LowerLeg"),
            ("m_avg_L_Ankle", "J_Bip_R_Foot"),
            ("m_avg_L_Foot", "J_Bip_R_ToeBase"),
            // Right leg
            ("m_avg_R_Hip", "J_Bip_L_UpperLeg"),
            ("m_avg_R_Knee", "J_Bip_L_LowerLeg"),
            ("m_avg_R_Ankle", "J_Bip_L_Foot"),
            ("m_avg_R_Foot", "J_Bip_L_ToeBase"),
            // Left arm
            ("m_avg_L_Collar", "J_Bip_L_Shoulder"),
            ("m_avg_L_Shoulder", "J_Bip_L_UpperArm"),
            ("m_avg_L_Elbow", "J_Bip_L_LowerArm"),
            ("m_avg_L_Wrist", "J_Bip_L_Hand"),
            // Right arm
            ("m_avg_R_Collar", "J_Bip_R_Shoulder"),
            ("m_avg_R_Shoulder", "J_Bip_R_UpperArm"),
            ("m_avg_R_Elbow", "J_Bip_R_LowerArm"),
            ("m_avg_R_Wrist", "J_Bip_R_Hand"),
        ]);

        let inversion = InversionSet::from_iter([
            "J_Bip_L_LowerLeg",
            "J_Bip_R_LowerLeg",
            "J_Bip_L_LowerArm",
            "J_Bip_R_LowerArm",
            "J_Bip_L_Shoulder",
            "J_Bip_R_Shoulder",
            "J_Bip_C_Neck",
            "J_Bip_C_Head",
            "J_Bip_L_UpperLeg",
            "J_Bip_R_UpperLeg",
        ]);

        Self::new("smpl_to_vroid", mapping, inversion)
    }
}

#[derive(Default)]
pub struct RetargetProfileLoader;

impl AssetLoader for RetargetProfileLoader {
    type Asset = RetargetProfile;
    type Settings = ();
    type Error = JsonAssetLoaderError;

    async fn load<'a>(
        &'a self,
        reader: &'a mut Reader<'_>,
        _settings: &'a (),
        load_context: &'a mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let profile = serde_json::from_slice::<RetargetProfile>(&bytes)?;
        info!(
            "Loaded retarget profile `{}` v{} ({} mapped bones) from {}",
            profile.name,
            profile.version,
            profile.mapping.len(),
            load_context.path().display()
        );

        Ok(profile)
    }

    fn extensions(&self) -> &[&str] {
        &["retarget.json"]
    }
}
