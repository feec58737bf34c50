pub use bvh_anim;

use bevy::prelude::*;

pub mod adjust;
pub mod bone_map;
pub mod bvh_asset;
pub mod clip_asset;
pub mod error;
pub mod profile;
pub mod retarget;
pub mod track;

pub mod prelude {
    pub use crate::adjust::{adjust_quaternion_track, euler_xyz_to_quat, invert_quaternion_x};
    pub use crate::bone_map::{BoneMapping, InversionSet};
    pub use crate::bvh_asset::{BvhAsset, BvhAssetPlugin};
    pub use crate::clip_asset::ClipAssetPlugin;
    pub use crate::error::MalformedTrackError;
    pub use crate::profile::{RetargetProfile, RetargetProfilePlugin};
    pub use crate::retarget::{retarget, DropReason, RetargetOutcome, Retargeter, TargetSkeleton};
    pub use crate::track::{ChannelKind, SourceClip, SourceTrack};
    pub use crate::track::{TargetChannel, TargetClip, TargetTrack, TrackSample};
    pub use crate::ClipRetargetPlugin;
}

/// Registers every retargeting asset and loader.
pub struct ClipRetargetPlugin;

impl Plugin for ClipRetargetPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            bvh_asset::BvhAssetPlugin,
            clip_asset::ClipAssetPlugin,
            profile::RetargetProfilePlugin,
        ));
    }
}
