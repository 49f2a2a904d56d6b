//! Tween techniques: how keyframe values are interpolated between samples.
//!
//! Techniques form a closed set along two axes:
//! - shape: Lerp, finite-difference cubic (FDC) spline, Catmull-Rom spline,
//!   centripetal Catmull-Rom spline;
//! - topology: acyclic (clamped at the last sample) or looping (wraps back to the
//!   first sample over `cycle_time`).
//!
//! Evaluation works on the coordinates of a [`Tweenable`] value, so the same code
//! drives translations, scales and rotations (quaternion coordinates, renormalized).
//! Rotations additionally have spherical techniques, see [`RotationTechnique`].

use std::fmt;
use std::str::FromStr;

use nalgebra::{Quaternion, SVector, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::math::{
    catmull_rom_slope, centripetal_interpolate, centripetal_knot, finite_difference_slope,
    hermite_cubic, lerp, secant_slope, slerp, squad,
};
use crate::track::BoneTrack;
use crate::transform::Transform;

/// Curve shape, independent of looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Lerp,
    FdcSpline,
    CatmullRomSpline,
    CentripetalSpline,
}

/// Named interpolation techniques.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TweenTechnique {
    /// Linear (nlerp for rotations), clamped at the last sample
    Lerp,
    /// Linear, wrapping from the last sample to the first
    LoopLerp,
    /// Cubic Hermite with finite-difference slopes
    FdcSpline,
    LoopFdcSpline,
    /// Cubic Hermite with Catmull-Rom slopes
    CatmullRomSpline,
    LoopCatmullRomSpline,
    /// Catmull-Rom with centripetal knot spacing
    CentripetalSpline,
    LoopCentripetalSpline,
}

impl TweenTechnique {
    pub const ALL: [TweenTechnique; 8] = [
        Self::Lerp,
        Self::LoopLerp,
        Self::FdcSpline,
        Self::LoopFdcSpline,
        Self::CatmullRomSpline,
        Self::LoopCatmullRomSpline,
        Self::CentripetalSpline,
        Self::LoopCentripetalSpline,
    ];

    /// Combine a shape and a topology.
    pub fn from_parts(shape: Shape, cyclic: bool) -> Self {
        match (shape, cyclic) {
            (Shape::Lerp, false) => Self::Lerp,
            (Shape::Lerp, true) => Self::LoopLerp,
            (Shape::FdcSpline, false) => Self::FdcSpline,
            (Shape::FdcSpline, true) => Self::LoopFdcSpline,
            (Shape::CatmullRomSpline, false) => Self::CatmullRomSpline,
            (Shape::CatmullRomSpline, true) => Self::LoopCatmullRomSpline,
            (Shape::CentripetalSpline, false) => Self::CentripetalSpline,
            (Shape::CentripetalSpline, true) => Self::LoopCentripetalSpline,
        }
    }

    #[inline]
    pub fn shape(self) -> Shape {
        match self {
            Self::Lerp | Self::LoopLerp => Shape::Lerp,
            Self::FdcSpline | Self::LoopFdcSpline => Shape::FdcSpline,
            Self::CatmullRomSpline | Self::LoopCatmullRomSpline => Shape::CatmullRomSpline,
            Self::CentripetalSpline | Self::LoopCentripetalSpline => Shape::CentripetalSpline,
        }
    }

    #[inline]
    pub fn is_cyclic(self) -> bool {
        matches!(
            self,
            Self::LoopLerp
                | Self::LoopFdcSpline
                | Self::LoopCatmullRomSpline
                | Self::LoopCentripetalSpline
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lerp => "Lerp",
            Self::LoopLerp => "LoopLerp",
            Self::FdcSpline => "FdcSpline",
            Self::LoopFdcSpline => "LoopFdcSpline",
            Self::CatmullRomSpline => "CatmullRomSpline",
            Self::LoopCatmullRomSpline => "LoopCatmullRomSpline",
            Self::CentripetalSpline => "CentripetalSpline",
            Self::LoopCentripetalSpline => "LoopCentripetalSpline",
        }
    }
}

impl fmt::Display for TweenTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TweenTechnique {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|technique| technique.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AnimationError::InvalidConfig {
                reason: format!("unknown tween technique '{s}'"),
            })
    }
}

/// A keyframe value that can be interpolated through its `D` coordinates.
pub trait Tweenable<const D: usize>: Copy + PartialEq {
    fn to_coords(&self) -> SVector<f32, D>;

    fn from_coords(coords: SVector<f32, D>) -> Self;

    /// Pick the representation of `coords` nearest to `reference`. Only matters for
    /// double-covered values such as quaternions.
    #[inline]
    fn align(coords: SVector<f32, D>, _reference: &SVector<f32, D>) -> SVector<f32, D> {
        coords
    }
}

impl Tweenable<3> for Vector3<f32> {
    #[inline]
    fn to_coords(&self) -> SVector<f32, 3> {
        *self
    }

    #[inline]
    fn from_coords(coords: SVector<f32, 3>) -> Self {
        coords
    }
}

impl Tweenable<4> for UnitQuaternion<f32> {
    #[inline]
    fn to_coords(&self) -> SVector<f32, 4> {
        self.as_ref().coords
    }

    #[inline]
    fn from_coords(coords: SVector<f32, 4>) -> Self {
        UnitQuaternion::new_normalize(Quaternion::from_vector(coords))
    }

    /// Shortest-arc: flip into the hemisphere of `reference`.
    #[inline]
    fn align(coords: SVector<f32, 4>, reference: &SVector<f32, 4>) -> SVector<f32, 4> {
        if coords.dot(reference) < 0.0 {
            -coords
        } else {
            coords
        }
    }
}

/// Index arithmetic over a keyframe time array for one topology.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timeline<'a> {
    times: &'a [f32],
    cycle_time: f32,
    cyclic: bool,
    /// Last index that takes part in interpolation.
    last: usize,
}

/// Where a query time falls on a [`Timeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Lookup {
    /// Exactly on (or clamped to) a keyframe.
    Key(usize),
    /// Inside the interval starting at `index`, at fraction `t`.
    Segment { index: usize, t: f32 },
}

impl<'a> Timeline<'a> {
    pub(crate) fn new(times: &'a [f32], cycle_time: f32, cyclic: bool) -> Self {
        debug_assert!(!times.is_empty(), "timeline needs at least one keyframe");
        let mut last = times.len() - 1;
        let mut cyclic = cyclic;
        if cyclic {
            debug_assert!(
                cycle_time >= times[last],
                "cycle time {cycle_time} before last keyframe {}",
                times[last]
            );
            // An end keyframe on the loop point duplicates keyframe 0. With only
            // two keyframes nothing would be left to loop over, so run acyclic.
            if cycle_time <= times[last] {
                if last > 1 {
                    last -= 1;
                } else {
                    cyclic = false;
                }
            }
        }
        Self {
            times,
            cycle_time,
            cyclic,
            last,
        }
    }

    #[inline]
    pub(crate) fn last(&self) -> usize {
        self.last
    }

    /// Following keyframe and the interval length to it.
    pub(crate) fn next(&self, index: usize) -> Option<(usize, f32)> {
        if index < self.last {
            let dt = self.times[index + 1] - self.times[index];
            (dt > 0.0).then_some((index + 1, dt))
        } else if self.cyclic {
            let dt = self.cycle_time - self.times[self.last];
            (dt > 0.0).then_some((0, dt))
        } else {
            None
        }
    }

    /// Preceding keyframe and the interval length from it.
    pub(crate) fn prev(&self, index: usize) -> Option<(usize, f32)> {
        if index > 0 {
            let dt = self.times[index] - self.times[index - 1];
            (dt > 0.0).then_some((index - 1, dt))
        } else if self.cyclic {
            let dt = self.cycle_time - self.times[self.last];
            (dt > 0.0).then_some((self.last, dt))
        } else {
            None
        }
    }

    pub(crate) fn lookup(&self, time: f32) -> Lookup {
        let time = if self.cyclic && self.cycle_time > 0.0 && time > self.cycle_time {
            time.rem_euclid(self.cycle_time)
        } else {
            time
        };
        // Also catches NaN.
        if self.times.len() == 1 || !(time > self.times[0]) {
            return Lookup::Key(0);
        }

        let index = self.times[..=self.last].partition_point(|&t| t <= time) - 1;
        if self.times[index] == time {
            return Lookup::Key(index);
        }
        match self.next(index) {
            Some((_, dt)) => Lookup::Segment {
                index,
                t: ((time - self.times[index]) / dt).clamp(0.0, 1.0),
            },
            None => Lookup::Key(index),
        }
    }
}

/// Technique-specific data for one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SegmentForm<const D: usize> {
    /// Start and end coincide: evaluation returns the start value.
    Held,
    Linear,
    /// Great arc between unit start and end coordinates.
    Spherical,
    /// Squad with inner control points.
    Squad {
        a: SVector<f32, D>,
        b: SVector<f32, D>,
    },
    Hermite {
        start_slope: SVector<f32, D>,
        end_slope: SVector<f32, D>,
    },
    Centripetal {
        before: SVector<f32, D>,
        after: SVector<f32, D>,
        dt01: f32,
        dt12: f32,
        dt23: f32,
    },
}

/// Everything needed to evaluate one interval without looking at its neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Segment<T, const D: usize> {
    pub(crate) start: T,
    pub(crate) end: T,
    pub(crate) start_coords: SVector<f32, D>,
    pub(crate) end_coords: SVector<f32, D>,
    pub(crate) duration: f32,
    pub(crate) form: SegmentForm<D>,
}

impl<T: Tweenable<D>, const D: usize> Segment<T, D> {
    pub(crate) fn evaluate(&self, t: f32) -> T {
        match self.form {
            SegmentForm::Held => self.start,
            SegmentForm::Linear => T::from_coords(lerp(t, &self.start_coords, &self.end_coords)),
            SegmentForm::Spherical => {
                T::from_coords(slerp(t, &self.start_coords, &self.end_coords))
            }
            SegmentForm::Squad { a, b } => {
                T::from_coords(squad(t, &self.start_coords, &a, &b, &self.end_coords))
            }
            SegmentForm::Hermite {
                start_slope,
                end_slope,
            } => T::from_coords(hermite_cubic(
                t,
                self.duration,
                &self.start_coords,
                &self.end_coords,
                &start_slope,
                &end_slope,
            )),
            SegmentForm::Centripetal {
                before,
                after,
                dt01,
                dt12,
                dt23,
            } => T::from_coords(centripetal_interpolate(
                t,
                &before,
                &self.start_coords,
                &self.end_coords,
                &after,
                dt01,
                dt12,
                dt23,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SlopeRule {
    FiniteDifference,
    CatmullRom,
}

fn slope<const D: usize>(
    rule: SlopeRule,
    before: Option<(SVector<f32, D>, f32)>,
    mid: &SVector<f32, D>,
    after: Option<(SVector<f32, D>, f32)>,
) -> SVector<f32, D> {
    match (before, after) {
        (Some((v0, dt01)), Some((v2, dt12))) => match rule {
            SlopeRule::FiniteDifference => finite_difference_slope(&v0, mid, &v2, dt01, dt12),
            SlopeRule::CatmullRom => catmull_rom_slope(&v0, &v2, dt01, dt12),
        },
        (None, Some((v2, dt12))) => secant_slope(mid, &v2, dt12),
        (Some((v0, dt01)), None) => secant_slope(&v0, mid, dt01),
        (None, None) => SVector::zeros(),
    }
}

/// Nearest value before `index` that differs from `reference`, walking backwards
/// (around the loop when cyclic). `None` at an acyclic boundary.
fn distinct_before<T: Tweenable<D>, const D: usize>(
    timeline: &Timeline<'_>,
    values: &[T],
    index: usize,
    reference: &SVector<f32, D>,
) -> Option<SVector<f32, D>> {
    let mut i = index;
    for _ in 0..=timeline.last() {
        let (prev, _) = timeline.prev(i)?;
        let coords = T::align(values[prev].to_coords(), reference);
        if coords != *reference {
            return Some(coords);
        }
        i = prev;
    }
    None
}

fn distinct_after<T: Tweenable<D>, const D: usize>(
    timeline: &Timeline<'_>,
    values: &[T],
    index: usize,
    reference: &SVector<f32, D>,
) -> Option<SVector<f32, D>> {
    let mut i = index;
    for _ in 0..=timeline.last() {
        let (next, _) = timeline.next(i)?;
        let coords = T::align(values[next].to_coords(), reference);
        if coords != *reference {
            return Some(coords);
        }
        i = next;
    }
    None
}

/// Build the interval that starts at keyframe `index`, or `None` when the
/// timeline has no following keyframe there.
pub(crate) fn build_segment<T: Tweenable<D>, const D: usize>(
    timeline: &Timeline<'_>,
    values: &[T],
    index: usize,
    shape: Shape,
) -> Option<Segment<T, D>> {
    let (next, duration) = timeline.next(index)?;
    let start = values[index];
    let end = values[next];
    let start_coords = start.to_coords();
    let end_coords = T::align(end.to_coords(), &start_coords);

    let form = match shape {
        Shape::Lerp if start_coords == end_coords => SegmentForm::Held,
        Shape::Lerp => SegmentForm::Linear,
        Shape::FdcSpline | Shape::CatmullRomSpline => {
            let rule = if shape == Shape::FdcSpline {
                SlopeRule::FiniteDifference
            } else {
                SlopeRule::CatmullRom
            };
            let before = timeline
                .prev(index)
                .map(|(i, dt)| (T::align(values[i].to_coords(), &start_coords), dt));
            let after = timeline
                .next(next)
                .map(|(i, dt)| (T::align(values[i].to_coords(), &end_coords), dt));
            SegmentForm::Hermite {
                start_slope: slope(rule, before, &start_coords, Some((end_coords, duration))),
                end_slope: slope(rule, Some((start_coords, duration)), &end_coords, after),
            }
        }
        Shape::CentripetalSpline if start_coords == end_coords => SegmentForm::Held,
        Shape::CentripetalSpline => {
            // Off the end of an acyclic sequence, extrapolate the central chord.
            let before = distinct_before(timeline, values, index, &start_coords)
                .unwrap_or_else(|| start_coords * 2.0 - end_coords);
            let after = distinct_after(timeline, values, next, &end_coords)
                .unwrap_or_else(|| end_coords * 2.0 - start_coords);
            SegmentForm::Centripetal {
                before,
                after,
                dt01: centripetal_knot(&before, &start_coords),
                dt12: centripetal_knot(&start_coords, &end_coords),
                dt23: centripetal_knot(&end_coords, &after),
            }
        }
    };

    Some(Segment {
        start,
        end,
        start_coords,
        end_coords,
        duration,
        form,
    })
}

/// Interpolate a keyframe sequence at `time`.
///
/// `times` must be non-empty and ascending with `values` of the same length.
/// `cycle_time` (at least the last time) is only used by looping techniques.
/// Before the first keyframe, and for single-keyframe sequences, the first value is
/// returned unchanged; keyframe times return their stored value exactly.
pub fn interpolate<T: Tweenable<D>, const D: usize>(
    time: f32,
    times: &[f32],
    cycle_time: f32,
    values: &[T],
    technique: TweenTechnique,
) -> T {
    debug_assert_eq!(times.len(), values.len());
    let timeline = Timeline::new(times, cycle_time, technique.is_cyclic());
    match timeline.lookup(time) {
        Lookup::Key(index) => values[index],
        Lookup::Segment { index, t } => build_segment(&timeline, values, index, technique.shape())
            .map_or(values[index], |segment| segment.evaluate(t)),
    }
}

/// Interpolation techniques for rotation channels.
///
/// The named variants work on the unit hypersphere and always take the shorter arc.
/// [`RotationTechnique::Coords`] runs a vector technique on quaternion coordinates
/// and renormalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RotationTechnique {
    /// Normalized linear blend, clamped at the last sample
    Nlerp,
    LoopNlerp,
    /// Slerp on wide arcs, nlerp where `1 - cos(half angle)` is at most 0.1
    QuickSlerp,
    LoopQuickSlerp,
    /// Constant angular velocity along each arc
    Slerp,
    LoopSlerp,
    /// Squad spline through every keyframe
    Spline,
    LoopSpline,
    Coords(TweenTechnique),
}

impl RotationTechnique {
    /// The spherical techniques; every [`TweenTechnique`] is also available through
    /// [`RotationTechnique::Coords`].
    pub const ALL: [RotationTechnique; 8] = [
        Self::Nlerp,
        Self::LoopNlerp,
        Self::QuickSlerp,
        Self::LoopQuickSlerp,
        Self::Slerp,
        Self::LoopSlerp,
        Self::Spline,
        Self::LoopSpline,
    ];

    #[inline]
    pub fn is_cyclic(self) -> bool {
        match self {
            Self::LoopNlerp | Self::LoopQuickSlerp | Self::LoopSlerp | Self::LoopSpline => true,
            Self::Nlerp | Self::QuickSlerp | Self::Slerp | Self::Spline => false,
            Self::Coords(technique) => technique.is_cyclic(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nlerp => "Nlerp",
            Self::LoopNlerp => "LoopNlerp",
            Self::QuickSlerp => "QuickSlerp",
            Self::LoopQuickSlerp => "LoopQuickSlerp",
            Self::Slerp => "Slerp",
            Self::LoopSlerp => "LoopSlerp",
            Self::Spline => "Spline",
            Self::LoopSpline => "LoopSpline",
            Self::Coords(technique) => technique.name(),
        }
    }

    /// Interpolate a rotation sequence at `time`. Boundary rules match
    /// [`interpolate`].
    pub fn interpolate(
        self,
        time: f32,
        times: &[f32],
        cycle_time: f32,
        values: &[UnitQuaternion<f32>],
    ) -> UnitQuaternion<f32> {
        debug_assert_eq!(times.len(), values.len());
        let timeline = Timeline::new(times, cycle_time, self.is_cyclic());
        match timeline.lookup(time) {
            Lookup::Key(index) => values[index],
            Lookup::Segment { index, t } => build_rotation_segment(&timeline, values, index, self)
                .map_or(values[index], |segment| segment.evaluate(t)),
        }
    }
}

impl From<TweenTechnique> for RotationTechnique {
    fn from(technique: TweenTechnique) -> Self {
        Self::Coords(technique)
    }
}

impl fmt::Display for RotationTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RotationTechnique {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(technique) = Self::ALL
            .iter()
            .copied()
            .find(|technique| technique.name().eq_ignore_ascii_case(s))
        {
            return Ok(technique);
        }
        s.parse::<TweenTechnique>()
            .map(Self::Coords)
            .map_err(|_| AnimationError::InvalidConfig {
                reason: format!("unknown rotation technique '{s}'"),
            })
    }
}

impl TryFrom<String> for RotationTechnique {
    type Error = AnimationError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<RotationTechnique> for String {
    fn from(technique: RotationTechnique) -> Self {
        technique.name().to_string()
    }
}

fn log_unit(q: &Quaternion<f32>) -> Vector3<f32> {
    let imag = q.imag();
    let sin = imag.norm();
    if sin < 1.0e-7 {
        return Vector3::zeros();
    }
    imag * (sin.atan2(q.scalar()) / sin)
}

fn exp_pure(v: &Vector3<f32>) -> Quaternion<f32> {
    let angle = v.norm();
    if angle < 1.0e-7 {
        return Quaternion::identity();
    }
    Quaternion::from_parts(angle.cos(), v * (angle.sin() / angle))
}

/// Squad inner control point at `q1`, given its neighbours in the same hemisphere.
fn squad_control(
    q0: &SVector<f32, 4>,
    q1: &SVector<f32, 4>,
    q2: &SVector<f32, 4>,
) -> SVector<f32, 4> {
    let center = Quaternion::from_vector(*q1);
    let inverse = center.conjugate();
    let tangent = log_unit(&(inverse * Quaternion::from_vector(*q0)))
        + log_unit(&(inverse * Quaternion::from_vector(*q2)));
    (center * exp_pure(&(tangent * -0.25))).coords.normalize()
}

/// Rotation counterpart of [`build_segment`].
pub(crate) fn build_rotation_segment(
    timeline: &Timeline<'_>,
    values: &[UnitQuaternion<f32>],
    index: usize,
    technique: RotationTechnique,
) -> Option<Segment<UnitQuaternion<f32>, 4>> {
    let shape = match technique {
        RotationTechnique::Coords(technique) => Some(technique.shape()),
        RotationTechnique::Nlerp | RotationTechnique::LoopNlerp => Some(Shape::Lerp),
        _ => None,
    };
    if let Some(shape) = shape {
        return build_segment(timeline, values, index, shape);
    }

    let align = <UnitQuaternion<f32> as Tweenable<4>>::align;
    let (next, duration) = timeline.next(index)?;
    let start = values[index];
    let end = values[next];
    let start_coords = start.to_coords();
    let end_coords = align(end.to_coords(), &start_coords);

    let form = match technique {
        _ if start_coords == end_coords => SegmentForm::Held,
        RotationTechnique::QuickSlerp | RotationTechnique::LoopQuickSlerp
            if 1.0 - start_coords.dot(&end_coords) <= 0.1 =>
        {
            SegmentForm::Linear
        }
        RotationTechnique::Spline | RotationTechnique::LoopSpline => {
            let before = timeline
                .prev(index)
                .map_or(start_coords, |(i, _)| align(values[i].to_coords(), &start_coords));
            let after = timeline
                .next(next)
                .map_or(end_coords, |(i, _)| align(values[i].to_coords(), &end_coords));
            SegmentForm::Squad {
                a: squad_control(&before, &start_coords, &end_coords),
                b: squad_control(&start_coords, &end_coords, &after),
            }
        }
        _ => SegmentForm::Spherical,
    };

    Some(Segment {
        start,
        end,
        start_coords,
        end_coords,
        duration,
        form,
    })
}

/// Techniques for the three channels of a bone track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweenTransforms {
    pub translations: TweenTechnique,
    pub rotations: RotationTechnique,
    pub scales: TweenTechnique,
}

impl Default for TweenTransforms {
    fn default() -> Self {
        Self {
            translations: TweenTechnique::Lerp,
            rotations: RotationTechnique::Nlerp,
            scales: TweenTechnique::Lerp,
        }
    }
}

impl TweenTransforms {
    pub fn new(
        translations: TweenTechnique,
        rotations: impl Into<RotationTechnique>,
        scales: TweenTechnique,
    ) -> Self {
        Self {
            translations,
            rotations: rotations.into(),
            scales,
        }
    }

    /// The same technique on every channel.
    pub fn uniform(technique: TweenTechnique) -> Self {
        Self::new(technique, technique, technique)
    }

    /// True when any channel loops.
    pub fn is_cyclic(&self) -> bool {
        self.translations.is_cyclic() || self.rotations.is_cyclic() || self.scales.is_cyclic()
    }

    /// Evaluate a bone track at `time`. Tracks without scales yield unit scale.
    pub fn transform(&self, time: f32, track: &BoneTrack, cycle_time: f32) -> Transform {
        let times = track.times();
        let translation = interpolate(
            time,
            times,
            cycle_time,
            track.translations(),
            self.translations,
        );
        let rotation = self
            .rotations
            .interpolate(time, times, cycle_time, track.rotations());
        let scale = match track.scales() {
            Some(scales) => interpolate(time, times, cycle_time, scales, self.scales),
            None => Vector3::repeat(1.0),
        };
        Transform::new(translation, rotation, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technique_axes_round_trip() {
        for technique in TweenTechnique::ALL {
            assert_eq!(
                TweenTechnique::from_parts(technique.shape(), technique.is_cyclic()),
                technique
            );
        }
        assert_eq!(
            TweenTechnique::ALL.iter().filter(|t| t.is_cyclic()).count(),
            4
        );
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "loopcentripetalspline".parse::<TweenTechnique>().unwrap(),
            TweenTechnique::LoopCentripetalSpline
        );
        assert!("bezier".parse::<TweenTechnique>().is_err());
    }

    #[test]
    fn timeline_drops_redundant_end_keyframe_when_looping() {
        let times = [0.0, 1.0, 2.0];
        let looping = Timeline::new(&times, 2.0, true);
        assert_eq!(looping.last(), 1);
        assert_eq!(looping.next(1), Some((0, 1.0)));
        assert_eq!(looping.prev(0), Some((1, 1.0)));

        let open = Timeline::new(&times, 2.0, false);
        assert_eq!(open.last(), 2);
        assert_eq!(open.next(2), None);
        assert_eq!(open.prev(0), None);
    }

    #[test]
    fn two_keyframe_loop_ending_on_loop_point_runs_acyclic() {
        let times = [0.0, 1.0];
        let closed = Timeline::new(&times, 1.0, true);
        assert_eq!(closed.last(), 1);
        assert_eq!(closed.next(0), Some((1, 1.0)));
        assert_eq!(closed.next(1), None);
        assert_eq!(closed.prev(0), None);
        assert_eq!(closed.lookup(0.5), Lookup::Segment { index: 0, t: 0.5 });
        assert_eq!(closed.lookup(1.0), Lookup::Key(1));

        let single = Timeline::new(&times[..1], 0.0, true);
        assert_eq!(single.last(), 0);
        assert_eq!(single.lookup(0.3), Lookup::Key(0));
    }

    #[test]
    fn timeline_lookup() {
        let times = [0.0, 1.0, 3.0];
        let open = Timeline::new(&times, 3.0, false);
        assert_eq!(open.lookup(-1.0), Lookup::Key(0));
        assert_eq!(open.lookup(1.0), Lookup::Key(1));
        assert_eq!(open.lookup(2.0), Lookup::Segment { index: 1, t: 0.5 });
        assert_eq!(open.lookup(5.0), Lookup::Key(2));
        assert_eq!(open.lookup(f32::NAN), Lookup::Key(0));

        let looping = Timeline::new(&times, 4.0, true);
        assert_eq!(looping.lookup(3.5), Lookup::Segment { index: 2, t: 0.5 });
        assert_eq!(looping.lookup(5.0), Lookup::Key(1));
    }

    #[test]
    fn rotation_technique_names() {
        for technique in RotationTechnique::ALL {
            assert_eq!(technique.name().parse::<RotationTechnique>().unwrap(), technique);
        }
        assert_eq!(
            "loopcatmullromspline".parse::<RotationTechnique>().unwrap(),
            RotationTechnique::Coords(TweenTechnique::LoopCatmullRomSpline)
        );
        assert!("squad".parse::<RotationTechnique>().is_err());
        assert_eq!(
            RotationTechnique::ALL.iter().filter(|t| t.is_cyclic()).count(),
            4
        );

        let json = serde_json::to_string(&RotationTechnique::LoopSpline).unwrap();
        assert_eq!(json, "\"LoopSpline\"");
        let parsed: RotationTechnique = serde_json::from_str("\"FdcSpline\"").unwrap();
        assert_eq!(parsed, RotationTechnique::Coords(TweenTechnique::FdcSpline));
    }

    #[test]
    fn squad_control_with_equal_neighbours_is_the_center() {
        let q = UnitQuaternion::from_euler_angles(0.2f32, -0.4, 0.9).to_coords();
        assert!((squad_control(&q, &q, &q) - q).norm() < 1.0e-6);
    }

    #[test]
    fn repeated_times_do_not_produce_nan_slopes() {
        let times = [0.0, 1.0, 1.0, 2.0];
        let values = [
            Vector3::new(0.0f32, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(2.0, 1.0, 0.0),
        ];
        for technique in TweenTechnique::ALL {
            let v = interpolate(1.5, &times, 2.0, &values, technique);
            assert!(v.iter().all(|c| c.is_finite()), "{technique}: {v:?}");
        }
    }
}
