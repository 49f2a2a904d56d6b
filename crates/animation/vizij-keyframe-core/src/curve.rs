//! Precomputed curves: per-interval slopes / neighbours built once, evaluated many times.
//!
//! A curve owns a copy of its keyframes. It never observes the track it was built
//! from: rebuild it whenever that track changes.

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::AnimationError;
use crate::track::BoneTrack;
use crate::transform::Transform;
use crate::tween::{
    build_rotation_segment, build_segment, Lookup, RotationTechnique, Segment, Timeline,
    TweenTechnique, TweenTransforms, Tweenable,
};

/// Immutable, precomputed interpolation of one keyframe channel.
///
/// `K` is the technique the curve was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedCurve<T, const D: usize, K = TweenTechnique> {
    times: Vec<f32>,
    values: Vec<T>,
    cycle_time: f32,
    technique: K,
    cyclic: bool,
    /// One entry per interval start; `None` where no interval follows.
    segments: Vec<Option<Segment<T, D>>>,
}

pub type VectorCurve = PrecomputedCurve<Vector3<f32>, 3>;
pub type RotationCurve = PrecomputedCurve<UnitQuaternion<f32>, 4, RotationTechnique>;

impl<T: Tweenable<D>, const D: usize, K: Copy> PrecomputedCurve<T, D, K> {
    fn build(
        times: &[f32],
        cycle_time: f32,
        values: &[T],
        technique: K,
        cyclic: bool,
        segment: impl Fn(&Timeline<'_>, usize) -> Option<Segment<T, D>>,
    ) -> crate::Result<Self> {
        if times.is_empty() {
            return Err(AnimationError::EmptyTrack);
        }
        if values.len() != times.len() {
            return Err(AnimationError::LengthMismatch {
                channel: "curve values".to_string(),
                expected: times.len(),
                actual: values.len(),
            });
        }
        let last_time = times[times.len() - 1];
        if cyclic && !(cycle_time >= last_time) {
            return Err(AnimationError::invalid_time("cycle time", cycle_time));
        }

        let timeline = Timeline::new(times, cycle_time, cyclic);
        let segments = (0..=timeline.last())
            .map(|index| segment(&timeline, index))
            .collect();

        Ok(Self {
            times: times.to_vec(),
            values: values.to_vec(),
            cycle_time,
            technique,
            cyclic,
            segments,
        })
    }

    /// Evaluate at `time`; identical to direct interpolation on the same input.
    pub fn evaluate(&self, time: f32) -> T {
        let timeline = Timeline::new(&self.times, self.cycle_time, self.cyclic);
        match timeline.lookup(time) {
            Lookup::Key(index) => self.values[index],
            Lookup::Segment { index, t } => self.segments[index]
                .as_ref()
                .map_or(self.values[index], |segment| segment.evaluate(t)),
        }
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn cycle_time(&self) -> f32 {
        self.cycle_time
    }

    pub fn technique(&self) -> K {
        self.technique
    }

    /// Number of evaluable intervals.
    pub fn segment_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_some()).count()
    }
}

impl<T: Tweenable<D>, const D: usize> PrecomputedCurve<T, D> {
    /// Build every interval of `values` over `times` for `technique`.
    pub fn precompute(
        times: &[f32],
        cycle_time: f32,
        values: &[T],
        technique: TweenTechnique,
    ) -> crate::Result<Self> {
        let shape = technique.shape();
        Self::build(
            times,
            cycle_time,
            values,
            technique,
            technique.is_cyclic(),
            |timeline, index| build_segment(timeline, values, index, shape),
        )
    }
}

impl RotationCurve {
    /// Build every interval of a rotation channel. Matches
    /// [`RotationTechnique::interpolate`].
    pub fn precompute(
        times: &[f32],
        cycle_time: f32,
        values: &[UnitQuaternion<f32>],
        technique: impl Into<RotationTechnique>,
    ) -> crate::Result<Self> {
        let technique = technique.into();
        Self::build(
            times,
            cycle_time,
            values,
            technique,
            technique.is_cyclic(),
            |timeline, index| build_rotation_segment(timeline, values, index, technique),
        )
    }
}

/// Precomputed curves for every channel of a bone track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCurves {
    pub translations: VectorCurve,
    pub rotations: RotationCurve,
    /// `None` when the track has no scale channel (unit scale).
    pub scales: Option<VectorCurve>,
}

impl TrackCurves {
    pub fn from_track(
        track: &BoneTrack,
        cycle_time: f32,
        techniques: &TweenTransforms,
    ) -> crate::Result<Self> {
        let times = track.times();
        let translations = VectorCurve::precompute(
            times,
            cycle_time,
            track.translations(),
            techniques.translations,
        )?;
        let rotations =
            RotationCurve::precompute(times, cycle_time, track.rotations(), techniques.rotations)?;
        let scales = track
            .scales()
            .map(|scales| VectorCurve::precompute(times, cycle_time, scales, techniques.scales))
            .transpose()?;
        Ok(Self {
            translations,
            rotations,
            scales,
        })
    }

    pub fn transform(&self, time: f32) -> Transform {
        Transform::new(
            self.translations.evaluate(time),
            self.rotations.evaluate(time),
            self.scales
                .as_ref()
                .map_or(Vector3::repeat(1.0), |curve| curve.evaluate(time)),
        )
    }
}
