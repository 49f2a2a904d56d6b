use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};
use vizij_keyframe_core::{
    interpolate, BoneTrack, RotationCurve, RotationTechnique, TrackCurves, TweenTechnique,
    TweenTransforms, VectorCurve,
};

fn query_times(cycle_time: f32) -> Vec<f32> {
    let mut times: Vec<f32> = (0..=120).map(|i| i as f32 * 0.05 - 0.5).collect();
    times.push(cycle_time);
    times.push(cycle_time * 2.5);
    times
}

fn keyframes() -> (Vec<f32>, Vec<Vector3<f32>>, Vec<UnitQuaternion<f32>>) {
    let times = vec![0.0, 0.4, 0.9, 1.0, 1.8, 2.5];
    let vectors = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.5, 1.0, 0.0),
        Vector3::new(0.5, 1.0, 0.0),
        Vector3::new(1.5, -0.5, 0.25),
        Vector3::new(2.0, 0.0, 1.0),
        Vector3::new(0.0, 0.0, 0.0),
    ];
    let rotations = vec![
        UnitQuaternion::identity(),
        UnitQuaternion::from_euler_angles(0.3, 0.1, 0.0),
        UnitQuaternion::from_euler_angles(0.3, 0.1, 0.0),
        UnitQuaternion::from_euler_angles(-0.6, 0.8, 0.2),
        UnitQuaternion::new_unchecked(
            -UnitQuaternion::from_euler_angles(0.1, 0.0, 2.9).into_inner(),
        ),
        UnitQuaternion::identity(),
    ];
    (times, vectors, rotations)
}

#[test]
fn precomputed_vectors_match_direct_interpolation() {
    let (times, vectors, _) = keyframes();
    for &cycle_time in &[2.5, 3.0] {
        for technique in TweenTechnique::ALL {
            let curve = VectorCurve::precompute(&times, cycle_time, &vectors, technique).unwrap();
            for time in query_times(cycle_time) {
                let cached = curve.evaluate(time);
                let direct = interpolate(time, &times, cycle_time, &vectors, technique);
                assert_relative_eq!(cached, direct, epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn precomputed_rotations_match_direct_interpolation() {
    let (times, _, rotations) = keyframes();
    for &cycle_time in &[2.5, 3.0] {
        for technique in TweenTechnique::ALL {
            let curve =
                RotationCurve::precompute(&times, cycle_time, &rotations, technique).unwrap();
            for time in query_times(cycle_time) {
                let cached = curve.evaluate(time);
                let direct = interpolate(time, &times, cycle_time, &rotations, technique);
                assert_relative_eq!(
                    cached.as_ref().coords,
                    direct.as_ref().coords,
                    epsilon = 1e-6
                );
            }
        }
    }
}

#[test]
fn precomputed_spherical_rotations_match_direct_interpolation() {
    let (times, _, rotations) = keyframes();
    for &cycle_time in &[2.5, 3.0] {
        for technique in RotationTechnique::ALL {
            let curve =
                RotationCurve::precompute(&times, cycle_time, &rotations, technique).unwrap();
            assert_eq!(curve.technique(), technique);
            for time in query_times(cycle_time) {
                let cached = curve.evaluate(time);
                let direct = technique.interpolate(time, &times, cycle_time, &rotations);
                assert_relative_eq!(
                    cached.as_ref().coords,
                    direct.as_ref().coords,
                    epsilon = 1e-6
                );
            }
        }
    }
}

#[test]
fn curve_keeps_its_inputs() {
    let (times, vectors, _) = keyframes();
    let curve =
        VectorCurve::precompute(&times, 3.0, &vectors, TweenTechnique::LoopCatmullRomSpline)
            .unwrap();
    assert_eq!(curve.times(), times.as_slice());
    assert_eq!(curve.values(), vectors.as_slice());
    assert_eq!(curve.cycle_time(), 3.0);
    assert_eq!(curve.technique(), TweenTechnique::LoopCatmullRomSpline);
    assert_eq!(curve.segment_count(), times.len());
}

#[test]
fn track_curves_match_per_frame_transform() {
    let (times, vectors, rotations) = keyframes();
    let scales: Vec<Vector3<f32>> = times
        .iter()
        .map(|&t| Vector3::new(1.0 + t, 1.0, 1.0 - 0.1 * t))
        .collect();
    let track = BoneTrack::new(4, times, vectors, rotations, Some(scales)).unwrap();
    let rotation_techniques = [
        RotationTechnique::Coords(TweenTechnique::LoopCentripetalSpline),
        RotationTechnique::LoopSpline,
        RotationTechnique::QuickSlerp,
    ];
    for rotation_technique in rotation_techniques {
        let techniques = TweenTransforms::new(
            TweenTechnique::FdcSpline,
            rotation_technique,
            TweenTechnique::Lerp,
        );
        let curves = TrackCurves::from_track(&track, 3.0, &techniques).unwrap();

        for time in query_times(3.0) {
            let cached = curves.transform(time);
            let direct = techniques.transform(time, &track, 3.0);
            assert_relative_eq!(cached.translation, direct.translation, epsilon = 1e-6);
            assert_relative_eq!(
                cached.rotation.as_ref().coords,
                direct.rotation.as_ref().coords,
                epsilon = 1e-6
            );
            assert_relative_eq!(cached.scale, direct.scale, epsilon = 1e-6);
        }
    }
}

#[test]
fn track_without_scales_evaluates_unit_scale() {
    let track = BoneTrack::new(
        0,
        vec![0.0, 1.0],
        vec![Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0)],
        vec![UnitQuaternion::identity(); 2],
        None,
    )
    .unwrap();
    let curves = TrackCurves::from_track(&track, 1.0, &TweenTransforms::default()).unwrap();
    assert!(curves.scales.is_none());
    assert_eq!(curves.transform(0.5).scale, Vector3::repeat(1.0));
    assert_eq!(curves.transform(0.5).translation, Vector3::new(0.5, 0.0, 0.0));
}

#[test]
fn two_keyframe_loop_on_loop_point_caches_like_direct() {
    let times = [0.0, 1.0];
    let vectors = [Vector3::new(0.0f32, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)];
    let rotations = [
        UnitQuaternion::identity(),
        UnitQuaternion::from_euler_angles(0.0f32, 0.3, 0.8),
    ];
    for technique in TweenTechnique::ALL.into_iter().filter(|t| t.is_cyclic()) {
        let curve = VectorCurve::precompute(&times, 1.0, &vectors, technique).unwrap();
        assert_eq!(curve.segment_count(), 1);
        assert_relative_eq!(curve.evaluate(0.5), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_eq!(curve.evaluate(1.0), vectors[1]);

        let rotation_curve = RotationCurve::precompute(&times, 1.0, &rotations, technique).unwrap();
        for time in query_times(1.0) {
            let direct = interpolate(time, &times, 1.0, &vectors, technique);
            assert_relative_eq!(curve.evaluate(time), direct, epsilon = 1e-6);
            let direct = interpolate(time, &times, 1.0, &rotations, technique);
            assert_relative_eq!(
                rotation_curve.evaluate(time).as_ref().coords,
                direct.as_ref().coords,
                epsilon = 1e-6
            );
        }
    }
}
