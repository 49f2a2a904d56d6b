//! Keyframe smoothing with a triangular time window.
//!
//! Each keyframe becomes the weighted average of every keyframe closer than
//! `width` seconds, weight `1 - dt / width`. Looping variants measure `dt` around
//! a cycle of length `duration`.

use nalgebra::{SVector, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::tween::Tweenable;

/// Smoothing techniques for translation and scale channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmoothVectors {
    Lerp,
    LoopLerp,
}

/// Smoothing techniques for rotation channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmoothRotations {
    Nlerp,
    LoopNlerp,
}

fn time_distance(a: f32, b: f32, cycle: Option<f32>) -> f32 {
    let dt = (a - b).abs();
    match cycle {
        Some(duration) if duration > 0.0 => dt.min((duration - dt).abs()),
        _ => dt,
    }
}

fn smooth_values<T: Tweenable<D>, const D: usize>(
    times: &[f32],
    values: &[T],
    width: f32,
    cycle: Option<f32>,
) -> Vec<T> {
    debug_assert_eq!(times.len(), values.len());
    if width <= 0.0 {
        return values.to_vec();
    }
    times
        .iter()
        .zip(values)
        .map(|(&center_time, center)| {
            let reference = center.to_coords();
            let mut sum = SVector::<f32, D>::zeros();
            let mut total = 0.0;
            for (&time, value) in times.iter().zip(values) {
                let dt = time_distance(center_time, time, cycle);
                if dt < width {
                    let weight = 1.0 - dt / width;
                    sum += T::align(value.to_coords(), &reference) * weight;
                    total += weight;
                }
            }
            if total > 0.0 {
                T::from_coords(sum / total)
            } else {
                *center
            }
        })
        .collect()
}

impl SmoothVectors {
    pub fn is_cyclic(self) -> bool {
        matches!(self, Self::LoopLerp)
    }

    pub fn smooth(
        self,
        times: &[f32],
        duration: f32,
        values: &[Vector3<f32>],
        width: f32,
    ) -> Vec<Vector3<f32>> {
        let cycle = self.is_cyclic().then_some(duration);
        smooth_values(times, values, width, cycle)
    }
}

impl SmoothRotations {
    pub fn is_cyclic(self) -> bool {
        matches!(self, Self::LoopNlerp)
    }

    /// Neighbours are flipped into the hemisphere of the rotation being smoothed
    /// and the average renormalized.
    pub fn smooth(
        self,
        times: &[f32],
        duration: f32,
        values: &[UnitQuaternion<f32>],
        width: f32,
    ) -> Vec<UnitQuaternion<f32>> {
        let cycle = self.is_cyclic().then_some(duration);
        smooth_values(times, values, width, cycle)
    }
}
