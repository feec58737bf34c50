//! Retargets requested clips onto bound rigs and plays them back.

use bevy::prelude::*;
use bevy_clip_retarget::prelude::*;

use crate::config::RigConfig;
use crate::rig::HumanoidRig;
use crate::RigSet;

pub struct ClipPlayerPlugin;

impl Plugin for ClipPlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (retarget_requested_clips, play_clips)
                .chain()
                .in_set(RigSet::PlayClip),
        );
    }
}

/// Retarget `source` onto this entity's rig once both are ready, then play it.
#[derive(Component, Debug, Clone)]
pub struct RetargetClip {
    pub source: Handle<SourceClip>,
    pub looping: bool,
}

#[derive(Component, Debug, Clone)]
pub struct ClipPlayer {
    pub clip: Handle<TargetClip>,
    pub time: f32,
    pub speed: f32,
    pub looping: bool,
    pub playing: bool,
}

impl ClipPlayer {
    pub fn new(clip: Handle<TargetClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            speed: 1.0,
            looping: false,
            playing: true,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Move the playhead by `delta` seconds and return the time to sample.
    ///
    /// Looping wraps around `duration`, otherwise playback stops at either end.
    pub fn advance(&mut self, delta: f32, duration: f32) -> f32 {
        if !self.playing {
            return self.time;
        }
        if duration <= 0.0 {
            self.time = 0.0;
            return self.time;
        }

        self.time += delta * self.speed;
        if self.looping {
            self.time = self.time.rem_euclid(duration);
        } else if !(0.0..duration).contains(&self.time) {
            self.time = self.time.clamp(0.0, duration);
            self.playing = false;
        }

        self.time
    }
}

/// Sample every track of `clip` at `time`, keyed by target bone name.
pub fn clip_pose(clip: &TargetClip, time: f32) -> impl Iterator<Item = (&str, TrackSample)> {
    clip.tracks
        .iter()
        .filter_map(move |track| Some((track.bone.as_str(), track.sample(time)?)))
}

fn retarget_requested_clips(
    mut commands: Commands,
    q_requests: Query<(Entity, &HumanoidRig, &RetargetClip)>,
    sources: Res<Assets<SourceClip>>,
    mut targets: ResMut<Assets<TargetClip>>,
    config: Res<RigConfig>,
) {
    for (entity, rig, request) in q_requests.iter() {
        let Some(source) = sources.get(&request.source) else {
            continue;
        };

        let outcome = Retargeter::new(&config.profile).retarget(source, rig);
        debug!(
            "Playing clip {} on rig {:?} with profile {}.",
            source.name,
            rig.id(),
            config.profile.name
        );

        let clip = targets.add(outcome.clip);
        commands
            .entity(entity)
            .remove::<RetargetClip>()
            .insert(ClipPlayer::new(clip).with_looping(request.looping));
    }
}

fn play_clips(
    mut q_players: Query<(&HumanoidRig, &mut ClipPlayer)>,
    mut q_transforms: Query<&mut Transform>,
    clips: Res<Assets<TargetClip>>,
    time: Res<Time>,
) {
    for (rig, mut player) in q_players.iter_mut() {
        let Some(clip) = clips.get(&player.clip) else {
            continue;
        };

        let sample_time = player.advance(time.delta_seconds(), clip.duration);

        for (bone, sample) in clip_pose(clip, sample_time) {
            let Some(node) = rig.node(bone) else {
                continue;
            };
            let Ok(mut transform) = q_transforms.get_mut(node) else {
                continue;
            };

            match sample {
                TrackSample::Rotation(rotation) => transform.rotation = rotation,
                TrackSample::Position(position) => transform.translation = position,
            }
        }
    }
}
