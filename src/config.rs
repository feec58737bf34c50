use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, AsyncReadExt, LoadContext};
use bevy::prelude::*;
use bevy_clip_retarget::error::JsonAssetLoaderError;
use bevy_clip_retarget::prelude::RetargetProfile;
use serde::{Deserialize, Serialize};

use crate::face::FaceConfig;
use crate::pose_rigger::LiveRigConfig;
use crate::pose_score::ScoreConfig;

/// Loads `*.rig.json` files and copies the one in [`RigConfigHandle`] into [`RigConfig`].
pub struct RigConfigPlugin;

impl Plugin for RigConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RigConfig>()
            .init_asset::<RigConfigAsset>()
            .init_asset_loader::<RigConfigLoader>()
            .add_systems(PreUpdate, apply_rig_config);
    }
}

/// Tuning of every retargeting path.
#[derive(Resource, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RigConfig {
    /// Profile used when retargeting clips onto bound rigs.
    pub profile: RetargetProfile,
    pub live: LiveRigConfig,
    pub face: FaceConfig,
    pub score: ScoreConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            profile: RetargetProfile::smpl_to_vroid(),
            live: LiveRigConfig::default(),
            face: FaceConfig::default(),
            score: ScoreConfig::default(),
        }
    }
}

#[derive(Asset, TypePath, Deserialize, Debug, Clone)]
#[serde(transparent)]
pub struct RigConfigAsset(pub RigConfig);

/// The config asset currently driving [`RigConfig`].
#[derive(Resource, Debug, Clone)]
pub struct RigConfigHandle(pub Handle<RigConfigAsset>);

fn apply_rig_config(
    mut asset_evr: EventReader<AssetEvent<RigConfigAsset>>,
    handle: Option<Res<RigConfigHandle>>,
    assets: Res<Assets<RigConfigAsset>>,
    mut config: ResMut<RigConfig>,
) {
    let Some(handle) = handle else {
        asset_evr.clear();
        return;
    };

    for event in asset_evr.read() {
        match event {
            AssetEvent::LoadedWithDependencies { id } | AssetEvent::Modified { id }
                if *id == handle.0.id() =>
            {
                if let Some(asset) = assets.get(*id) {
                    info!("Applying rig config with profile {}.", asset.0.profile.name);
                    *config = asset.0.clone();
                }
            }
            _ => {}
        }
    }
}

#[derive(Default)]
pub struct RigConfigLoader;

impl AssetLoader for RigConfigLoader {
    type Asset = RigConfigAsset;
    type Settings = ();
    type Error = JsonAssetLoaderError;

    async fn load<'a>(
        &'a self,
        reader: &'a mut Reader<'_>,
        _settings: &'a (),
        _load_context: &'a mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let config = serde_json::from_slice::<RigConfigAsset>(&bytes)?;

        Ok(config)
    }

    fn extensions(&self) -> &[&str] {
        &["rig.json"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanoid::HumanoidBone;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RigConfig = serde_json::from_str(
            r#"{
                "live": {
                    "mirror_hands": false,
                    "hips_position": { "lerp_amount": 0.5 }
                },
                "face": { "blink_gain": 1.0 }
            }"#,
        )
        .unwrap();

        assert!(!config.live.mirror_hands);
        assert_eq!(config.live.hips_position.lerp_amount, 0.5);
        assert_eq!(config.live.hips_position.offset, Vec3::Y);
        assert_eq!(config.live.params(HumanoidBone::Chest).dampener, 0.25);
        assert_eq!(config.face.blink_gain, 1.0);
        assert_eq!(config.face.blink_smoothing, 0.4);
        assert_eq!(config.profile, RetargetProfile::smpl_to_vroid());
    }

    #[test]
    fn bone_params_are_keyed_by_bone_name() {
        let config: RigConfig = serde_json::from_str(
            r#"{ "live": { "bone_params": { "leftUpperArm": { "dampener": 0.5 } } } }"#,
        )
        .unwrap();

        let params = config.live.params(HumanoidBone::LeftUpperArm);
        assert_eq!(params.dampener, 0.5);
        assert_eq!(params.lerp_amount, 0.3);
        // Replacing the map drops the built in entries.
        assert_eq!(config.live.params(HumanoidBone::Hips).dampener, 1.0);
    }
}
