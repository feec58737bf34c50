use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, AsyncReadExt, LoadContext};
use bevy::prelude::*;

use crate::error::JsonAssetLoaderError;
use crate::track::{SourceClip, TargetClip};

pub struct ClipAssetPlugin;

impl Plugin for ClipAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<SourceClip>()
            .init_asset::<TargetClip>()
            .init_asset_loader::<SourceClipLoader>();
    }
}

/// Loads exported keyframe clips (`*.clip.json`).
#[derive(Default)]
pub struct SourceClipLoader;

impl AssetLoader for SourceClipLoader {
    type Asset = SourceClip;
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

        let clip = serde_json::from_slice::<SourceClip>(&bytes)?;

        Ok(clip)
    }

    fn extensions(&self) -> &[&str] {
        &["clip.json"]
    }
}
