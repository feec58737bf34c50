//! Axis and representation corrections shared by the clip and live paths.

use bevy::prelude::*;

use crate::error::MalformedTrackError;

/// Component count of a quaternion keyframe (x, y, z, w).
pub const QUAT_STRIDE: usize = 4;
/// Component count of a position or Euler keyframe.
pub const VEC3_STRIDE: usize = 3;

/// Negate the x component of every quaternion in a flat `x, y, z, w` sequence.
///
/// Only the x axis is touched, this is not a conjugation. Returns a copy, the input is left as is.
pub fn adjust_quaternion_track(values: &[f32], invert: bool) -> Result<Vec<f32>, MalformedTrackError> {
    check_arity(values, QUAT_STRIDE)?;

    let mut adjusted = values.to_vec();
    if invert {
        for x in adjusted.iter_mut().step_by(QUAT_STRIDE) {
            *x = -*x;
        }
    }

    Ok(adjusted)
}

/// Single quaternion version of [`adjust_quaternion_track`].
#[inline]
#[must_use]
pub fn invert_quaternion_x(rotation: Quat) -> Quat {
    Quat::from_xyzw(-rotation.x, rotation.y, rotation.z, rotation.w)
}

/// Euler angles in radians, applied in `XYZ` order.
#[inline]
#[must_use]
pub fn euler_xyz_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z)
}

pub(crate) fn check_arity(values: &[f32], arity: usize) -> Result<(), MalformedTrackError> {
    match values.len() % arity {
        0 => Ok(()),
        _ => Err(MalformedTrackError::Arity {
            len: values.len(),
            arity,
        }),
    }
}
