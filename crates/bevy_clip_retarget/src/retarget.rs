//! One-shot conversion of a source keyframe clip onto a target humanoid skeleton.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::adjust::{adjust_quaternion_track, check_arity, euler_xyz_to_quat, invert_quaternion_x};
use crate::adjust::{QUAT_STRIDE, VEC3_STRIDE};
use crate::bone_map::{BoneMapping, InversionSet};
use crate::error::MalformedTrackError;
use crate::profile::RetargetProfile;
use crate::track::{parse_channel_name, ChannelKind, SourceClip, SourceTrack};
use crate::track::{TargetChannel, TargetClip, TargetTrack};

/// Bone lookup on a concrete rig instance, rig variants may lack some bones.
pub trait TargetSkeleton {
    fn contains_bone(&self, name: &str) -> bool;
}

impl TargetSkeleton for HashSet<String> {
    fn contains_bone(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<V> TargetSkeleton for HashMap<String, V> {
    fn contains_bone(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl<V> TargetSkeleton for bevy::utils::HashMap<String, V> {
    fn contains_bone(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl TargetSkeleton for [&str] {
    fn contains_bone(&self, name: &str) -> bool {
        self.iter().any(|bone| *bone == name)
    }
}

impl<T: TargetSkeleton + ?Sized> TargetSkeleton for &T {
    fn contains_bone(&self, name: &str) -> bool {
        T::contains_bone(self, name)
    }
}

/// Why a source track did not make it into the target clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The source bone has no entry in the mapping, e.g. end effector markers.
    Unmapped,
    /// Mapped, but this rig instance has no such bone.
    MissingOnRig { target: String },
    /// Channel the target rig cannot take (e.g. scale).
    UnsupportedChannel(String),
    Malformed(MalformedTrackError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedTrack {
    pub name: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone)]
pub struct RetargetOutcome {
    pub clip: TargetClip,
    pub dropped: Vec<DroppedTrack>,
}

/// Retargets clips using the mapping and inversion policy of one [`RetargetProfile`].
pub struct Retargeter<'a> {
    mapping: &'a BoneMapping,
    inversion: &'a InversionSet,
}

impl<'a> Retargeter<'a> {
    pub fn new(profile: &'a RetargetProfile) -> Self {
        Self::from_parts(&profile.mapping, &profile.inversion)
    }

    pub fn from_parts(mapping: &'a BoneMapping, inversion: &'a InversionSet) -> Self {
        Self { mapping, inversion }
    }

    pub fn retarget(&self, clip: &SourceClip, skeleton: &impl TargetSkeleton) -> RetargetOutcome {
        let mut tracks = Vec::with_capacity(clip.tracks.len());
        let mut dropped = Vec::new();

        for source_track in clip.tracks.iter() {
            match self.retarget_track(source_track, skeleton) {
                Ok(track) => tracks.push(track),
                Err(reason) => {
                    match &reason {
                        DropReason::Malformed(err) => {
                            warn!("Dropping track `{}`: {}", source_track.name, err)
                        }
                        reason => debug!("Dropping track `{}`: {:?}", source_track.name, reason),
                    }
                    dropped.push(DroppedTrack {
                        name: source_track.name.clone(),
                        reason,
                    });
                }
            }
        }

        if tracks.is_empty() {
            warn!(
                "Retargeted clip `{}` has no tracks ({} dropped).",
                clip.name,
                dropped.len()
            );
        } else {
            info!(
                "Retargeted clip `{}`: {} tracks kept, {} dropped.",
                clip.name,
                tracks.len(),
                dropped.len()
            );
        }

        RetargetOutcome {
            clip: TargetClip {
                name: clip.name.clone(),
                duration: clip.duration,
                tracks,
            },
            dropped,
        }
    }

    fn retarget_track(
        &self,
        track: &SourceTrack,
        skeleton: &impl TargetSkeleton,
    ) -> Result<TargetTrack, DropReason> {
        let (source_bone, kind) = parse_channel_name(&track.name).map_err(DropReason::Malformed)?;

        let target_bone = self
            .mapping
            .resolve(source_bone)
            .ok_or(DropReason::Unmapped)?;

        if skeleton.contains_bone(target_bone) == false {
            return Err(DropReason::MissingOnRig {
                target: target_bone.to_owned(),
            });
        }

        let invert = self.inversion.requires_inversion(target_bone);
        let (channel, values) = match kind {
            ChannelKind::Quaternion => (
                TargetChannel::Rotation,
                adjust_quaternion_track(&track.values, invert).map_err(DropReason::Malformed)?,
            ),
            ChannelKind::Rotation => (
                TargetChannel::Rotation,
                euler_track_to_quaternions(&track.values, invert)
                    .map_err(DropReason::Malformed)?,
            ),
            ChannelKind::Position => {
                check_arity(&track.values, VEC3_STRIDE).map_err(DropReason::Malformed)?;
                (TargetChannel::Position, track.values.clone())
            }
            ChannelKind::Unsupported(property) => {
                return Err(DropReason::UnsupportedChannel(property))
            }
        };

        Ok(TargetTrack {
            bone: target_bone.to_owned(),
            channel,
            times: track.times.clone(),
            values,
        })
    }
}

/// Retarget `clip` with a bare mapping and inversion set.
pub fn retarget(
    clip: &SourceClip,
    mapping: &BoneMapping,
    inversion: &InversionSet,
    skeleton: &impl TargetSkeleton,
) -> TargetClip {
    Retargeter::from_parts(mapping, inversion)
        .retarget(clip, skeleton)
        .clip
}

/// Convert flat `XYZ` Euler triples into flat quaternions, inverting x when asked to.
fn euler_track_to_quaternions(values: &[f32], invert: bool) -> Result<Vec<f32>, MalformedTrackError> {
    check_arity(values, VEC3_STRIDE)?;

    let mut quaternions = Vec::with_capacity(values.len() / VEC3_STRIDE * QUAT_STRIDE);
    for euler in values.chunks_exact(VEC3_STRIDE) {
        let mut rotation = euler_xyz_to_quat(Vec3::from_slice(euler));
        if invert {
            rotation = invert_quaternion_x(rotation);
        }
        quaternions.extend(rotation.to_array());
    }

    Ok(quaternions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(tracks: Vec<SourceTrack>) -> SourceClip {
        SourceClip {
            name: "dance".to_owned(),
            duration: 2.0,
            tracks,
        }
    }

    fn skeleton(bones: &[&str]) -> HashSet<String> {
        bones.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn identity_quaternion_track_is_renamed() {
        let mapping = BoneMapping::from_iter([("srcHip", "tgtHips")]);
        let inversion = InversionSet::new();
        let source = clip(vec![SourceTrack::new(
            "srcHip.quaternion",
            vec![0.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        )]);

        let target = retarget(&source, &mapping, &inversion, &skeleton(&["tgtHips"]));

        assert_eq!(target.tracks.len(), 1);
        let track = &target.tracks[0];
        assert_eq!(track.name(), "tgtHips.quaternion");
        assert_eq!(track.times, vec![0.0, 1.0]);
        assert_eq!(track.values, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(target.name, "dance");
        assert_eq!(target.duration, 2.0);
    }

    #[test]
    fn inverted_knee_quaternion() {
        let mapping = BoneMapping::from_iter([("srcKnee", "tgtKnee")]);
        let inversion = InversionSet::from_iter(["tgtKnee"]);
        let source = clip(vec![SourceTrack::new(
            "srcKnee.quaternion",
            vec![0.0],
            vec![0.5, 0.0, 0.0, 0.866],
        )]);

        let target = retarget(&source, &mapping, &inversion, &skeleton(&["tgtKnee"]));

        assert_eq!(target.tracks[0].values, vec![-0.5, 0.0, 0.0, 0.866]);
    }

    #[test]
    fn unmapped_and_missing_bones_are_dropped() {
        let mapping = BoneMapping::from_iter([("srcHip", "tgtHips"), ("srcChest", "tgtChest")]);
        let source = clip(vec![
            SourceTrack::new("srcHead_end.quaternion", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]),
            SourceTrack::new("srcChest.quaternion", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]),
            SourceTrack::new("srcHip.position", vec![0.0], vec![0.0, 1.0, 0.0]),
        ]);

        let outcome = Retargeter::from_parts(&mapping, &InversionSet::new())
            .retarget(&source, &skeleton(&["tgtHips"]));

        assert_eq!(outcome.clip.tracks.len(), 1);
        assert_eq!(outcome.clip.tracks[0].name(), "tgtHips.position");
        assert_eq!(
            outcome.dropped,
            vec![
                DroppedTrack {
                    name: "srcHead_end.quaternion".to_owned(),
                    reason: DropReason::Unmapped,
                },
                DroppedTrack {
                    name: "srcChest.quaternion".to_owned(),
                    reason: DropReason::MissingOnRig {
                        target: "tgtChest".to_owned()
                    },
                },
            ]
        );
    }

    #[test]
    fn euler_track_becomes_inverted_quaternions() {
        let mapping = BoneMapping::from_iter([("srcElbow", "tgtElbow")]);
        let inversion = InversionSet::from_iter(["tgtElbow"]);
        let source = clip(vec![SourceTrack::new(
            "srcElbow.rotation",
            vec![0.0, 0.5],
            vec![0.2, 0.0, 0.0, 0.1, 0.4, -0.3],
        )]);

        let target = retarget(&source, &mapping, &inversion, &skeleton(&["tgtElbow"]));

        let track = &target.tracks[0];
        assert_eq!(track.channel, TargetChannel::Rotation);
        assert_eq!(track.values.len(), 8);

        let first = invert_quaternion_x(euler_xyz_to_quat(Vec3::new(0.2, 0.0, 0.0)));
        let second = invert_quaternion_x(euler_xyz_to_quat(Vec3::new(0.1, 0.4, -0.3)));
        assert_eq!(&track.values[..4], &first.to_array());
        assert_eq!(&track.values[4..], &second.to_array());
    }

    #[test]
    fn position_is_passed_through_without_inversion() {
        let mapping = BoneMapping::from_iter([("srcKnee", "tgtKnee")]);
        let inversion = InversionSet::from_iter(["tgtKnee"]);
        let values = vec![0.3, -1.0, 2.5, 0.0, 0.0, 0.0];
        let source = clip(vec![SourceTrack::new("srcKnee.position", vec![0.0, 1.0], values.clone())]);

        let target = retarget(&source, &mapping, &inversion, &skeleton(&["tgtKnee"]));

        assert_eq!(target.tracks[0].channel, TargetChannel::Position);
        assert_eq!(target.tracks[0].values, values);
    }

    #[test]
    fn unsupported_and_malformed_tracks_do_not_abort() {
        let mapping = BoneMapping::from_iter([("srcHip", "tgtHips")]);
        let source = clip(vec![
            SourceTrack::new("srcHip.scale", vec![0.0], vec![1.0, 1.0, 1.0]),
            SourceTrack::new("srcHip.quaternion", vec![0.0], vec![0.0, 0.0, 1.0]),
            SourceTrack::new("srcHip", vec![0.0], vec![0.0, 0.0, 0.0]),
            SourceTrack::new("srcHip.position", vec![0.0], vec![0.0, 0.0, 0.0]),
        ]);

        let outcome = Retargeter::from_parts(&mapping, &InversionSet::new())
            .retarget(&source, &skeleton(&["tgtHips"]));

        assert_eq!(outcome.clip.tracks.len(), 1);
        let reasons: Vec<_> = outcome.dropped.into_iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![
                DropReason::UnsupportedChannel("scale".to_owned()),
                DropReason::Malformed(MalformedTrackError::Arity { len: 3, arity: 4 }),
                DropReason::Malformed(MalformedTrackError::ChannelName("srcHip".to_owned())),
            ]
        );
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let source = clip(vec![SourceTrack::new(
            "unknown.quaternion",
            vec![0.0],
            vec![0.0, 0.0, 0.0, 1.0],
        )]);

        let target = retarget(
            &source,
            &BoneMapping::new(),
            &InversionSet::new(),
            &skeleton(&[]),
        );

        assert!(target.is_empty());
        assert_eq!(target.name, "dance");
    }

    #[test]
    fn smpl_clip_onto_vroid_rig() {
        let profile = RetargetProfile::smpl_to_vroid();
        let rig: &[&str] = &["J_Bip_C_Hips", "J_Bip_R_LowerLeg"];
        let source = clip(vec![
            SourceTrack::new("m_avg_Pelvis.quaternion", vec![0.0], vec![0.1, 0.2, 0.3, 0.9]),
            SourceTrack::new("m_avg_L_Knee.quaternion", vec![0.0], vec![0.1, 0.2, 0.3, 0.9]),
            // No upper chest on this rig variant.
            SourceTrack::new("m_avg_Spine3.quaternion", vec![0.0], vec![0.1, 0.2, 0.3, 0.9]),
        ]);

        let outcome = Retargeter::new(&profile).retarget(&source, &rig);

        let hips = outcome.clip.track("J_Bip_C_Hips", TargetChannel::Rotation).unwrap();
        let knee = outcome.clip.track("J_Bip_R_LowerLeg", TargetChannel::Rotation).unwrap();
        assert_eq!(hips.values, vec![0.1, 0.2, 0.3, 0.9]);
        assert_eq!(knee.values, vec![-0.1, 0.2, 0.3, 0.9]);
        assert_eq!(outcome.dropped.len(), 1);
    }
}
