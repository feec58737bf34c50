//! Smoothing of solved face data into expression weights and gaze.

use bevy::prelude::*;
use bevy::utils::HashMap;
use serde::{Deserialize, Serialize};

use crate::rig::RigHandle;
use crate::session::{RigError, RigSession};

#[derive(Serialize, Deserialize, Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionPreset {
    Aa,
    Ih,
    Ou,
    Ee,
    Oh,
    Blink,
    BlinkLeft,
    BlinkRight,
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
    Neutral,
}

#[derive(Serialize, Deserialize, Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vowel {
    A,
    E,
    I,
    O,
    U,
}

impl Vowel {
    pub const ALL: [Vowel; 5] = [Vowel::A, Vowel::E, Vowel::I, Vowel::O, Vowel::U];

    pub fn preset(self) -> ExpressionPreset {
        match self {
            Vowel::A => ExpressionPreset::Aa,
            Vowel::E => ExpressionPreset::Ee,
            Vowel::I => ExpressionPreset::Ih,
            Vowel::O => ExpressionPreset::Oh,
            Vowel::U => ExpressionPreset::Ou,
        }
    }
}

/// Current expression weights of a rig, each within `0.0..=1.0`.
#[derive(Component, Reflect, Default, Debug, Clone)]
pub struct ExpressionWeights(HashMap<ExpressionPreset, f32>);

impl ExpressionWeights {
    pub fn get(&self, preset: ExpressionPreset) -> f32 {
        self.0.get(&preset).copied().unwrap_or_default()
    }

    pub fn set(&mut self, preset: ExpressionPreset, weight: f32) {
        self.0.insert(preset, weight.clamp(0.0, 1.0));
    }
}

/// Gaze direction of a rig.
#[derive(Component, Reflect, Default, Debug, Clone, Copy, PartialEq)]
pub struct LookAt {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
pub struct MouthShape {
    #[serde(rename = "A")]
    pub a: f32,
    #[serde(rename = "E")]
    pub e: f32,
    #[serde(rename = "I")]
    pub i: f32,
    #[serde(rename = "O")]
    pub o: f32,
    #[serde(rename = "U")]
    pub u: f32,
}

impl MouthShape {
    pub fn get(&self, vowel: Vowel) -> f32 {
        match vowel {
            Vowel::A => self.a,
            Vowel::E => self.e,
            Vowel::I => self.i,
            Vowel::O => self.o,
            Vowel::U => self.u,
        }
    }

    pub fn set(&mut self, vowel: Vowel, value: f32) {
        match vowel {
            Vowel::A => self.a = value,
            Vowel::E => self.e = value,
            Vowel::I => self.i = value,
            Vowel::O => self.o = value,
            Vowel::U => self.u = value,
        }
    }
}

/// Face values from the landmark solver, eye openness in `0.0..=1.0`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct RiggedFace {
    pub head: Vec3,
    pub eye_left: f32,
    pub eye_right: f32,
    pub mouth: MouthShape,
    pub pupil: Vec2,
}

/// Weights the rig held after the last [`apply_face`], so clamped to `0.0..=1.0`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct ExpressionState {
    pub blink_left: f32,
    pub blink_right: f32,
    pub mouth: MouthShape,
    pub gaze: LookAt,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FaceConfig {
    pub blink_smoothing: f32,
    pub blink_gain: f32,
    pub vowel_smoothing: f32,
    pub vowel_gain: f32,
    pub gaze_smoothing: f32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            blink_smoothing: 0.4,
            blink_gain: 0.8,
            vowel_smoothing: 0.3,
            vowel_gain: 0.8,
            gaze_smoothing: 0.4,
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Smooth `face` into the rig's blink, vowel and gaze values.
///
/// Blinks are blended toward the rig's combined `blink` weight, vowels toward
/// their own current weights and gaze toward the session's previous target.
pub fn apply_face(
    face: &RiggedFace,
    rig: &mut impl RigHandle,
    session: &mut RigSession,
    config: &FaceConfig,
) -> Result<(), RigError> {
    session.validate(&*rig)?;
    let state = session.expression_mut();

    let previous_blink = rig.expression(ExpressionPreset::Blink);
    let blink = |eye: f32| {
        lerp(
            (1.0 - eye).clamp(0.0, 1.0),
            previous_blink,
            config.blink_smoothing,
        ) / config.blink_gain
    };
    rig.set_expression(ExpressionPreset::BlinkLeft, blink(face.eye_left));
    rig.set_expression(ExpressionPreset::BlinkRight, blink(face.eye_right));
    state.blink_left = rig.expression(ExpressionPreset::BlinkLeft);
    state.blink_right = rig.expression(ExpressionPreset::BlinkRight);

    for vowel in Vowel::ALL {
        let weight = lerp(
            face.mouth.get(vowel) / config.vowel_gain,
            rig.expression(vowel.preset()),
            config.vowel_smoothing,
        );
        rig.set_expression(vowel.preset(), weight);
        state.mouth.set(vowel, rig.expression(vowel.preset()));
    }

    state.gaze = LookAt {
        pitch: lerp(state.gaze.pitch, face.pupil.y, config.gaze_smoothing),
        yaw: lerp(state.gaze.yaw, face.pupil.x, config.gaze_smoothing),
    };
    rig.apply_yaw_pitch(state.gaze.yaw, state.gaze.pitch);

    Ok(())
}
