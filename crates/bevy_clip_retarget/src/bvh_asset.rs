use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, AsyncReadExt, LoadContext};
use bevy::prelude::*;
use bvh_anim::{Bvh, ChannelType, JointData};
use thiserror::Error;

use crate::adjust::{QUAT_STRIDE, VEC3_STRIDE};
use crate::track::{SourceClip, SourceTrack};

pub struct BvhAssetPlugin;

impl Plugin for BvhAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<BvhAsset>()
            .init_asset_loader::<BvhAssetLoader>();
    }
}

/// Motion capture data usable as a retargeting source.
#[derive(Asset, TypePath)]
pub struct BvhAsset {
    name: String,
    bvh: Bvh,
}

impl BvhAsset {
    pub fn new(name: impl Into<String>, bvh: Bvh) -> Self {
        Self {
            name: name.into(),
            bvh,
        }
    }

    pub fn get(&self) -> &Bvh {
        &self.bvh
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flatten the motion into a [`SourceClip`] keyed by the bvh joint names.
    ///
    /// Every joint with rotation channels gets a `quaternion` track, composed in the
    /// joint's own channel order. Joints with position channels also get a `position` track.
    pub fn to_source_clip(&self) -> SourceClip {
        let bvh = &self.bvh;
        let frame_time = bvh.frame_time().as_secs_f32();
        let num_frames = bvh.num_frames();

        let times = (0..num_frames)
            .map(|i| i as f32 * frame_time)
            .collect::<Vec<_>>();

        let mut tracks = Vec::new();
        for joint in bvh.joints() {
            let joint_data = joint.data();
            let name = joint_data.name().to_string();

            let (has_rotation, has_position) = channel_presence(joint_data);

            if has_rotation {
                let mut values = Vec::with_capacity(num_frames * QUAT_STRIDE);
                for frame in bvh.frames() {
                    let rotation = joint_data
                        .channels()
                        .iter()
                        .fold(Quat::IDENTITY, |rotation, channel| {
                            let angle = frame[channel].to_radians();
                            match channel.channel_type() {
                                ChannelType::RotationX => rotation * Quat::from_rotation_x(angle),
                                ChannelType::RotationY => rotation * Quat::from_rotation_y(angle),
                                ChannelType::RotationZ => rotation * Quat::from_rotation_z(angle),
                                _ => rotation,
                            }
                        });
                    values.extend(rotation.normalize().to_array());
                }
                tracks.push(SourceTrack::new(
                    format!("{name}.quaternion"),
                    times.clone(),
                    values,
                ));
            }

            if has_position {
                let offset = joint_data.offset();
                let mut values = Vec::with_capacity(num_frames * VEC3_STRIDE);
                for frame in bvh.frames() {
                    let mut translation = Vec3::new(offset.x, offset.y, offset.z);
                    for channel in joint_data.channels() {
                        let data = frame[channel];
                        match channel.channel_type() {
                            ChannelType::PositionX => translation.x = data,
                            ChannelType::PositionY => translation.y = data,
                            ChannelType::PositionZ => translation.z = data,
                            _ => {}
                        }
                    }
                    values.extend(translation.to_array());
                }
                tracks.push(SourceTrack::new(
                    format!("{name}.position"),
                    times.clone(),
                    values,
                ));
            }
        }

        SourceClip {
            name: self.name.clone(),
            duration: num_frames.saturating_sub(1) as f32 * frame_time,
            tracks,
        }
    }
}

fn channel_presence(joint_data: &JointData) -> (bool, bool) {
    joint_data
        .channels()
        .iter()
        .fold((false, false), |(rotation, position), channel| {
            match channel.channel_type() {
                ChannelType::RotationX | ChannelType::RotationY | ChannelType::RotationZ => {
                    (true, position)
                }
                ChannelType::PositionX | ChannelType::PositionY | ChannelType::PositionZ => {
                    (rotation, true)
                }
            }
        })
}

#[derive(Default)]
pub struct BvhAssetLoader;

impl AssetLoader for BvhAssetLoader {
    type Asset = BvhAsset;
    type Settings = ();
    type Error = BvhAssetLoaderError;

    async fn load<'a>(
        &'a self,
        reader: &'a mut Reader<'_>,
        _settings: &'a (),
        load_context: &'a mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let bvh = bvh_anim::from_bytes(bytes)?;

        let name = load_context
            .path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(BvhAsset::new(name, bvh))
    }

    fn extensions(&self) -> &[&str] {
        &["bvh"]
    }
}

/// Possible errors that can be produced by [`BvhAssetLoader`]
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BvhAssetLoaderError {
    /// An [Io](std::io) Error
    #[error("Could not load bvh file: {0}")]
    Io(#[from] std::io::Error),
    /// A [Bvh](bvh_anim::errors::LoadError) Error
    #[error("Could not load bvh: {0}")]
    BvhLoadError(#[from] bvh_anim::errors::LoadError),
}
