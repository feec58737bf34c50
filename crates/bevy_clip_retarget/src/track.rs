use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::adjust::{QUAT_STRIDE, VEC3_STRIDE};
use crate::error::MalformedTrackError;

/// Animated property of a bone, parsed from the part after the last `.` of a track name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Unit quaternions, `x, y, z, w` per keyframe.
    Quaternion,
    /// Euler angles in radians, `XYZ` order.
    Rotation,
    Position,
    /// Any other property (e.g. `scale`), never retargeted.
    Unsupported(String),
}

impl ChannelKind {
    pub fn parse(property: &str) -> Self {
        match property {
            "quaternion" => Self::Quaternion,
            "rotation" => Self::Rotation,
            "position" => Self::Position,
            other => Self::Unsupported(other.to_owned()),
        }
    }
}

/// Split `bone.channel` into its bone name and channel kind.
///
/// Bone names may contain dots themselves, so the split happens at the last one.
pub fn parse_channel_name(name: &str) -> Result<(&str, ChannelKind), MalformedTrackError> {
    match name.rsplit_once('.') {
        Some((bone, property)) if bone.is_empty() == false && property.is_empty() == false => {
            Ok((bone, ChannelKind::parse(property)))
        }
        _ => Err(MalformedTrackError::ChannelName(name.to_owned())),
    }
}

/// A keyframe track in the source skeleton's convention.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceTrack {
    /// `bone.channel`
    pub name: String,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl SourceTrack {
    pub fn new(name: impl Into<String>, times: Vec<f32>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            times,
            values,
        }
    }
}

#[derive(Asset, TypePath, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceClip {
    pub name: String,
    /// Duration in seconds.
    pub duration: f32,
    pub tracks: Vec<SourceTrack>,
}

/// Channels a target rig accepts. Euler rotations never make it this far.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetChannel {
    Rotation,
    Position,
}

impl TargetChannel {
    pub fn stride(&self) -> usize {
        match self {
            TargetChannel::Rotation => QUAT_STRIDE,
            TargetChannel::Position => VEC3_STRIDE,
        }
    }

    pub fn property(&self) -> &'static str {
        match self {
            TargetChannel::Rotation => "quaternion",
            TargetChannel::Position => "position",
        }
    }
}

/// A single value sampled out of a [`TargetTrack`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackSample {
    Rotation(Quat),
    Position(Vec3),
}

/// A keyframe track keyed to a bone of the target rig.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TargetTrack {
    pub bone: String,
    pub channel: TargetChannel,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl TargetTrack {
    /// Track name in `bone.channel` form.
    pub fn name(&self) -> String {
        format!("{}.{}", self.bone, self.channel.property())
    }

    pub fn num_keyframes(&self) -> usize {
        usize::min(self.times.len(), self.values.len() / self.channel.stride())
    }

    fn keyframe(&self, index: usize) -> TrackSample {
        let stride = self.channel.stride();
        let v = &self.values[index * stride..(index + 1) * stride];
        match self.channel {
            TargetChannel::Rotation => TrackSample::Rotation(Quat::from_xyzw(v[0], v[1], v[2], v[3])),
            TargetChannel::Position => TrackSample::Position(Vec3::new(v[0], v[1], v[2])),
        }
    }

    /// Sample the track at `time`, interpolating between the two surrounding keyframes.
    ///
    /// Time outside of the keyed range holds the first or last keyframe.
    /// Returns [`None`] for a track without any keyframe.
    pub fn sample(&self, time: f32) -> Option<TrackSample> {
        let count = self.num_keyframes();
        if count == 0 {
            return None;
        }

        let times = &self.times[..count];
        // Index of the first keyframe strictly after `time`.
        let next = times.partition_point(|&t| t <= time);
        if next == 0 {
            return Some(self.keyframe(0));
        }
        if next == count {
            return Some(self.keyframe(count - 1));
        }

        let prev = next - 1;
        let span = times[next] - times[prev];
        let factor = match span > f32::EPSILON {
            true => (time - times[prev]) / span,
            false => 0.0,
        };

        Some(match (self.keyframe(prev), self.keyframe(next)) {
            (TrackSample::Rotation(a), TrackSample::Rotation(b)) => {
                TrackSample::Rotation(Quat::slerp(a.normalize(), b.normalize(), factor))
            }
            (TrackSample::Position(a), TrackSample::Position(b)) => {
                TrackSample::Position(Vec3::lerp(a, b, factor))
            }
            // Both keyframes come from the track's single channel.
            _ => unreachable!(),
        })
    }
}

/// A clip keyed to target rig bone names, only quaternion and position channels.
#[derive(Asset, TypePath, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TargetClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<TargetTrack>,
}

impl TargetClip {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, bone: &str, channel: TargetChannel) -> Option<&TargetTrack> {
        self.tracks
            .iter()
            .find(|track| track.bone == bone && track.channel == channel)
    }
}
