//! Curve math primitives shared by every tween technique.
//!
//! All helpers are generic over `SVector<f32, D>` so translations and scales (D=3)
//! and quaternion coordinates (D=4) run through the same code.

use nalgebra::SVector;

/// Linear interpolation between `v0` (t=0) and `v1` (t=1).
///
/// Returns `v0` untouched when both endpoints are equal, so a held value never
/// drifts through float rounding.
#[inline]
pub fn lerp<const D: usize>(
    t: f32,
    v0: &SVector<f32, D>,
    v1: &SVector<f32, D>,
) -> SVector<f32, D> {
    debug_assert!((0.0..=1.0).contains(&t), "t = {t}");
    if v0 == v1 {
        return *v0;
    }
    *v0 * (1.0 - t) + *v1 * t
}

/// Evaluate a cubic Hermite segment at `t` in [0,1].
///
/// `m1`/`m2` are derivatives with respect to time; `interval` converts them to the
/// unit parameter of the segment.
#[inline]
pub fn hermite_cubic<const D: usize>(
    t: f32,
    interval: f32,
    v1: &SVector<f32, D>,
    v2: &SVector<f32, D>,
    m1: &SVector<f32, D>,
    m2: &SVector<f32, D>,
) -> SVector<f32, D> {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    *v1 * h00 + *v2 * h01 + *m1 * (interval * h10) + *m2 * (interval * h11)
}

/// Slope of the chord from `v0` to `v1` over `dt`.
#[inline]
pub fn secant_slope<const D: usize>(
    v0: &SVector<f32, D>,
    v1: &SVector<f32, D>,
    dt: f32,
) -> SVector<f32, D> {
    debug_assert!(dt > 0.0, "dt = {dt}");
    (*v1 - *v0) / dt
}

/// Average of the incoming and outgoing secant slopes at `v1`.
#[inline]
pub fn finite_difference_slope<const D: usize>(
    v0: &SVector<f32, D>,
    v1: &SVector<f32, D>,
    v2: &SVector<f32, D>,
    dt01: f32,
    dt12: f32,
) -> SVector<f32, D> {
    (secant_slope(v0, v1, dt01) + secant_slope(v1, v2, dt12)) * 0.5
}

/// Catmull-Rom slope at the middle point: the secant across it, ignoring how the
/// span splits between the two sub-intervals.
#[inline]
pub fn catmull_rom_slope<const D: usize>(
    v0: &SVector<f32, D>,
    v2: &SVector<f32, D>,
    dt01: f32,
    dt12: f32,
) -> SVector<f32, D> {
    secant_slope(v0, v2, dt01 + dt12)
}

/// Centripetal knot spacing: square root of the chord length.
#[inline]
pub fn centripetal_knot<const D: usize>(vi: &SVector<f32, D>, vj: &SVector<f32, D>) -> f32 {
    (*vj - *vi).norm().sqrt()
}

#[inline]
fn blend<const D: usize>(
    a: &SVector<f32, D>,
    b: &SVector<f32, D>,
    ta: f32,
    tb: f32,
    u: f32,
) -> SVector<f32, D> {
    let span = tb - ta;
    *a * ((tb - u) / span) + *b * ((u - ta) / span)
}

/// Centripetal Catmull-Rom between `v1` (t=0) and `v2` (t=1), Barry-Goldman form.
///
/// `dt01`, `dt12`, `dt23` are [`centripetal_knot`] spacings. A zero-length central
/// chord returns `v1` unchanged. The outer spacings must be positive.
#[allow(clippy::too_many_arguments)]
pub fn centripetal_interpolate<const D: usize>(
    t: f32,
    v0: &SVector<f32, D>,
    v1: &SVector<f32, D>,
    v2: &SVector<f32, D>,
    v3: &SVector<f32, D>,
    dt01: f32,
    dt12: f32,
    dt23: f32,
) -> SVector<f32, D> {
    if v1 == v2 || dt12 <= 0.0 {
        return *v1;
    }
    debug_assert!(dt01 > 0.0 && dt23 > 0.0, "dt01 = {dt01}, dt23 = {dt23}");

    let t0 = 0.0;
    let t1 = dt01;
    let t2 = t1 + dt12;
    let t3 = t2 + dt23;
    let u = t1 + t * dt12;

    let a1 = blend(v0, v1, t0, t1, u);
    let a2 = blend(v1, v2, t1, t2, u);
    let a3 = blend(v2, v3, t2, t3, u);
    let b1 = blend(&a1, &a2, t0, t2, u);
    let b2 = blend(&a2, &a3, t1, t3, u);
    blend(&b1, &b2, t1, t2, u)
}

/// Spherical linear interpolation between unit vectors `v0` (t=0) and `v1` (t=1)
/// along the great arc joining them. No hemisphere flip is applied.
///
/// Nearly parallel endpoints fall back to a plain blend.
#[inline]
pub fn slerp<const D: usize>(
    t: f32,
    v0: &SVector<f32, D>,
    v1: &SVector<f32, D>,
) -> SVector<f32, D> {
    if v0 == v1 {
        return *v0;
    }
    let cos = v0.dot(v1).clamp(-1.0, 1.0);
    let angle = cos.acos();
    let sin = angle.sin();
    if sin < 1.0e-6 {
        return *v0 * (1.0 - t) + *v1 * t;
    }
    *v0 * (((1.0 - t) * angle).sin() / sin) + *v1 * ((t * angle).sin() / sin)
}

/// Shoemake's spherical quadrangle between `v1` (t=0) and `v2` (t=1) with inner
/// control points `a` and `b`.
#[inline]
pub fn squad<const D: usize>(
    t: f32,
    v1: &SVector<f32, D>,
    a: &SVector<f32, D>,
    b: &SVector<f32, D>,
    v2: &SVector<f32, D>,
) -> SVector<f32, D> {
    slerp(2.0 * t * (1.0 - t), &slerp(t, v1, v2), &slerp(t, a, b))
}
