//! Pure editing transforms on bone tracks and animations.
//!
//! Every function reads its input and returns a new track (or animation). Invalid
//! arguments are rejected before any output is built.

use log::{debug, trace};
use nalgebra::Vector3;

use crate::error::{check_duration, check_positive_time, AnimationError};
use crate::smooth::{SmoothRotations, SmoothVectors};
use crate::track::{Animation, BoneIndex, BoneTrack};
use crate::transform::Transform;
use crate::tween::TweenTransforms;

fn keyframes(track: &BoneTrack) -> impl Iterator<Item = (f32, Transform)> + '_ {
    track
        .times()
        .iter()
        .enumerate()
        .map(move |(index, &time)| (time, track.transform(index)))
}

/// Build a track from `(time, transform)` pairs. The scale channel is kept when
/// `keep_scales` is set or any keyframe has a non-unit scale.
fn assemble(bone: BoneIndex, frames: Vec<(f32, Transform)>, keep_scales: bool) -> BoneTrack {
    let keep_scales =
        keep_scales || frames.iter().any(|(_, frame)| frame.scale != Vector3::repeat(1.0));
    let times = frames.iter().map(|(time, _)| *time).collect();
    let translations = frames.iter().map(|(_, frame)| frame.translation).collect();
    let rotations = frames.iter().map(|(_, frame)| frame.rotation).collect();
    let scales = keep_scales.then(|| frames.iter().map(|(_, frame)| frame.scale).collect());
    BoneTrack::from_parts(bone, times, translations, rotations, scales)
}

fn with_times(track: &BoneTrack, times: Vec<f32>) -> BoneTrack {
    let bone = track.bone();
    let (_, translations, rotations, scales) = track.clone().into_parts();
    BoneTrack::from_parts(bone, times, translations, rotations, scales)
}

/// Looping techniques need the whole track inside one cycle.
fn check_cycle(
    track: &BoneTrack,
    duration: f32,
    techniques: &TweenTransforms,
) -> crate::Result<()> {
    check_duration(duration)?;
    if techniques.is_cyclic() && duration < track.last_time() {
        return Err(AnimationError::TrackTooLong {
            bone: track.bone(),
            end: track.last_time(),
            duration,
        });
    }
    Ok(())
}

/// Per-frame evaluator: before time 0, or for a single keyframe, the first keyframe.
pub fn transform_at(
    track: &BoneTrack,
    time: f32,
    duration: f32,
    techniques: &TweenTransforms,
) -> Transform {
    if time <= 0.0 || track.keyframe_count() == 1 {
        track.transform(0)
    } else {
        techniques.transform(time, track, duration)
    }
}

/// Keep the keyframes at or before `end_time`. Keyframe 0 always survives.
pub fn truncate(track: &BoneTrack, end_time: f32) -> crate::Result<BoneTrack> {
    check_positive_time("truncate end time", end_time)?;
    let keep = track.find_previous_keyframe_index(end_time) + 1;
    trace!(
        "truncate bone {} at {end_time}: {} -> {keep} keyframes",
        track.bone(),
        track.keyframe_count()
    );
    let frames = keyframes(track).take(keep).collect();
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Cut everything before `neck_time`, shift the rest so the neck lands on 0 and
/// start with `neck_transform`.
pub fn behead(
    track: &BoneTrack,
    neck_time: f32,
    neck_transform: Transform,
    old_duration: f32,
) -> crate::Result<BoneTrack> {
    check_duration(old_duration)?;
    check_positive_time("neck time", neck_time)?;
    if neck_time > old_duration {
        return Err(AnimationError::invalid_time("neck time", neck_time));
    }

    // Keyframes at or before the neck are replaced by the neck keyframe.
    let cut = track.times().partition_point(|&t| t <= neck_time);
    let mut frames = Vec::with_capacity(track.keyframe_count() - cut + 1);
    frames.push((0.0, neck_transform));
    frames.extend(
        keyframes(track)
            .skip(cut)
            .map(|(time, frame)| (time - neck_time, frame)),
    );
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Make the keyframe at `end_time` a copy of keyframe 0, appending one if needed.
///
/// `end_time` must not precede the last keyframe.
pub fn wrap(track: &BoneTrack, end_time: f32) -> crate::Result<BoneTrack> {
    wrap_blended(track, end_time, 0.0)
}

/// Like [`wrap`], but when a keyframe already sits at `end_time` both ends take
/// the blend of keyframe 0 and that keyframe, `end_weight` of the way towards the
/// end. An appended end keyframe copies keyframe 0 and ignores the weight.
pub fn wrap_blended(track: &BoneTrack, end_time: f32, end_weight: f32) -> crate::Result<BoneTrack> {
    check_positive_time("wrap end time", end_time)?;
    if !(0.0..=1.0).contains(&end_weight) {
        return Err(AnimationError::InvalidWeight { weight: end_weight });
    }
    if end_time < track.last_time() {
        return Err(AnimationError::invalid_time("wrap end time", end_time));
    }

    let mut frames: Vec<_> = keyframes(track).collect();
    let first = track.transform(0);
    if end_time > track.last_time() {
        frames.push((end_time, first));
    } else {
        let last = frames.len() - 1;
        let closed = if end_weight == 0.0 {
            first
        } else {
            first.blend(&frames[last].1, end_weight)
        };
        frames[0].1 = closed;
        frames[last].1 = closed;
    }
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Insert a keyframe in time order. Fails if one already exists at `time`.
pub fn insert_keyframe(
    track: &BoneTrack,
    time: f32,
    transform: Transform,
) -> crate::Result<BoneTrack> {
    check_positive_time("keyframe time", time)?;
    if track.find_keyframe_index(time).is_some() {
        return Err(AnimationError::KeyframeExists { time });
    }
    let slot = track.times().partition_point(|&t| t < time);
    let mut frames: Vec<_> = keyframes(track).collect();
    frames.insert(slot, (time, transform));
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Overwrite the value of keyframe `index`; times are unchanged.
pub fn replace_keyframe(
    track: &BoneTrack,
    index: usize,
    transform: Transform,
) -> crate::Result<BoneTrack> {
    let count = track.keyframe_count();
    if index >= count {
        return Err(AnimationError::index_out_of_range(
            "keyframe index",
            index,
            0,
            count - 1,
        ));
    }
    let mut frames: Vec<_> = keyframes(track).collect();
    frames[index].1 = transform;
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Remove `count` keyframes starting at `start_index`. Keyframe 0 is never deleted.
pub fn delete_range(
    track: &BoneTrack,
    start_index: usize,
    count: usize,
) -> crate::Result<BoneTrack> {
    let total = track.keyframe_count();
    if total < 2 || start_index < 1 || start_index >= total {
        return Err(AnimationError::index_out_of_range(
            "start index",
            start_index,
            1,
            total.saturating_sub(1),
        ));
    }
    let end = start_index + count;
    if end > total {
        return Err(AnimationError::index_out_of_range("end index", end, start_index, total));
    }
    let frames = keyframes(track)
        .enumerate()
        .filter(|(index, _)| !(start_index..end).contains(index))
        .map(|(_, frame)| frame)
        .collect();
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Evaluate `track` at each of `new_times`, which must be non-empty, non-negative
/// and strictly ascending.
pub fn resample(
    track: &BoneTrack,
    new_times: &[f32],
    duration: f32,
    techniques: &TweenTransforms,
) -> crate::Result<BoneTrack> {
    check_cycle(track, duration, techniques)?;
    let frames: Vec<_> = new_times
        .iter()
        .map(|&time| (time, transform_at(track, time, duration, techniques)))
        .collect();
    let keep_scales = track.has_scales();
    let resampled = BoneTrack::new(
        track.bone(),
        frames.iter().map(|(time, _)| *time).collect(),
        frames.iter().map(|(_, frame)| frame.translation).collect(),
        frames.iter().map(|(_, frame)| frame.rotation).collect(),
        keep_scales.then(|| frames.iter().map(|(_, frame)| frame.scale).collect()),
    )?;
    trace!(
        "resampled bone {}: {} -> {} keyframes",
        track.bone(),
        track.keyframe_count(),
        resampled.keyframe_count()
    );
    Ok(resampled)
}

/// Resample on the grid `0, 1/rate, 2/rate, ...` with a final sample at exactly
/// `duration`.
pub fn resample_at_rate(
    track: &BoneTrack,
    rate: f32,
    duration: f32,
    techniques: &TweenTransforms,
) -> crate::Result<BoneTrack> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(AnimationError::InvalidSampleRate { rate });
    }
    check_duration(duration)?;

    let count = 1 + (duration * rate).floor() as usize;
    let mut times: Vec<f32> = (0..count)
        .map(|k| (k as f32 / rate).min(duration))
        .collect();
    if times.last().is_some_and(|&last| last < duration) {
        times.push(duration);
    }
    resample(track, &times, duration, techniques)
}

/// Resample to `count` evenly spaced samples from 0 to `duration` inclusive.
pub fn resample_to_number(
    track: &BoneTrack,
    count: usize,
    duration: f32,
    techniques: &TweenTransforms,
) -> crate::Result<BoneTrack> {
    if count < 2 {
        return Err(AnimationError::InvalidSampleCount { count });
    }
    if !(duration.is_finite() && duration > 0.0) {
        return Err(AnimationError::InvalidDuration { duration });
    }

    let last = count - 1;
    let times: Vec<f32> = (0..count)
        .map(|k| {
            if k == last {
                duration
            } else {
                k as f32 * duration / last as f32
            }
        })
        .collect();
    resample(track, &times, duration, techniques)
}

/// Keep every `factor`-th keyframe starting with keyframe 0.
pub fn reduce(track: &BoneTrack, factor: usize) -> crate::Result<BoneTrack> {
    if factor < 2 {
        return Err(AnimationError::InvalidFactor { factor });
    }
    let frames = keyframes(track).step_by(factor).collect();
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Drop keyframes whose time equals the previous surviving keyframe's time.
/// Returns `None` when there is nothing to drop.
pub fn remove_repeats(track: &BoneTrack) -> Option<BoneTrack> {
    let times = track.times();
    if times.windows(2).all(|pair| pair[0] != pair[1]) {
        return None;
    }
    let mut frames: Vec<(f32, Transform)> = Vec::with_capacity(times.len());
    for (time, frame) in keyframes(track) {
        if frames.last().map_or(true, |(previous, _)| *previous != time) {
            frames.push((time, frame));
        }
    }
    trace!(
        "bone {}: removed {} repeated keyframes",
        track.bone(),
        times.len() - frames.len()
    );
    Some(assemble(track.bone(), frames, track.has_scales()))
}

/// Smooth each channel with its own technique over a window of `width` seconds.
/// Times are unchanged.
pub fn smooth(
    track: &BoneTrack,
    width: f32,
    translations: SmoothVectors,
    rotations: SmoothRotations,
    scales: SmoothVectors,
    duration: f32,
) -> crate::Result<BoneTrack> {
    check_duration(duration)?;
    if !(width >= 0.0 && width <= duration) {
        return Err(AnimationError::InvalidWindow { width, duration });
    }
    let times = track.times();
    let new_translations = translations.smooth(times, duration, track.translations(), width);
    let new_rotations = rotations.smooth(times, duration, track.rotations(), width);
    let new_scales = track
        .scales()
        .map(|values| scales.smooth(times, duration, values, width));
    Ok(BoneTrack::from_parts(
        track.bone(),
        times.to_vec(),
        new_translations,
        new_rotations,
        new_scales,
    ))
}

/// Rescale every keyframe time by `new_duration / old_duration`.
///
/// Shrinking to zero collapses all times onto 0; pass the result through
/// [`remove_repeats`] if a strictly ascending track is needed.
pub fn set_duration(
    track: &BoneTrack,
    old_duration: f32,
    new_duration: f32,
) -> crate::Result<BoneTrack> {
    check_duration(old_duration)?;
    check_duration(new_duration)?;
    if track.last_time() > old_duration {
        return Err(AnimationError::TrackTooLong {
            bone: track.bone(),
            end: track.last_time(),
            duration: old_duration,
        });
    }
    let times = track
        .times()
        .iter()
        .map(|&time| {
            if old_duration == 0.0 {
                0.0
            } else {
                (new_duration * time / old_duration).clamp(0.0, new_duration)
            }
        })
        .collect();
    Ok(with_times(track, times))
}

/// Reverse keyframe order; keyframe `i` moves to `last_time - time_i`.
pub fn reverse(track: &BoneTrack) -> BoneTrack {
    let last = track.last_time();
    let mut frames: Vec<_> = keyframes(track)
        .map(|(time, frame)| (last - time, frame))
        .collect();
    frames.reverse();
    assemble(track.bone(), frames, track.has_scales())
}

/// Append `second`, delayed by `start_time2`, after `first`, keeping keyframes up
/// to `new_duration`. A keyframe of `first` at exactly `start_time2` is blended
/// half-way with keyframe 0 of `second`. The result belongs to `first`'s bone.
pub fn chain(
    first: &BoneTrack,
    second: &BoneTrack,
    start_time2: f32,
    new_duration: f32,
) -> crate::Result<BoneTrack> {
    check_duration(new_duration)?;
    if !(start_time2 >= 0.0 && start_time2 <= new_duration) {
        return Err(AnimationError::invalid_time("second track start", start_time2));
    }

    let last1 = first.find_previous_keyframe_index(new_duration);
    let last2 = second.find_previous_keyframe_index(new_duration - start_time2);
    let end1 = first.times()[last1];
    if end1 > start_time2 {
        return Err(AnimationError::OverlappingTracks {
            end1,
            start2: start_time2,
        });
    }

    let mut frames: Vec<(f32, Transform)> = keyframes(first).take(last1 + 1).collect();
    let mut tail = keyframes(second)
        .take(last2 + 1)
        .map(|(time, frame)| (time + start_time2, frame));
    if end1 == start_time2 {
        if let (Some(joint), Some((_, head))) = (frames.last_mut(), tail.next()) {
            joint.1 = joint.1.blend(&head, 0.5);
        }
    }
    frames.extend(tail);
    Ok(assemble(
        first.bone(),
        frames,
        first.has_scales() || second.has_scales(),
    ))
}

/// Delay every keyframe by `delay`, dropping those past `new_duration`. A positive
/// delay inserts an identity keyframe at time 0.
pub fn delay_all(track: &BoneTrack, delay: f32, new_duration: f32) -> crate::Result<BoneTrack> {
    check_duration(new_duration)?;
    if !(delay >= 0.0 && delay <= new_duration) {
        return Err(AnimationError::invalid_time("delay", delay));
    }
    let last = track.find_previous_keyframe_index(new_duration - delay);
    let mut frames = Vec::with_capacity(last + 2);
    if delay > 0.0 {
        frames.push((0.0, Transform::identity()));
    }
    frames.extend(
        keyframes(track)
            .take(last + 1)
            .map(|(time, frame)| (time + delay, frame)),
    );
    Ok(assemble(track.bone(), frames, track.has_scales()))
}

/// Move keyframe `index` (never keyframe 0) to `new_time`.
///
/// `Ok(None)` when `new_time` would not stay strictly between its neighbours, or
/// past `duration` for the final keyframe.
pub fn set_frame_time(
    track: &BoneTrack,
    index: usize,
    new_time: f32,
    duration: f32,
) -> crate::Result<Option<BoneTrack>> {
    let count = track.keyframe_count();
    if count < 2 || index < 1 || index >= count {
        return Err(AnimationError::index_out_of_range(
            "frame index",
            index,
            1,
            count.saturating_sub(1),
        ));
    }
    check_positive_time("new frame time", new_time)?;

    let times = track.times();
    if new_time <= times[index - 1] {
        return Ok(None);
    }
    let upper_ok = match times.get(index + 1) {
        Some(&next) => new_time < next,
        None => new_time <= duration,
    };
    if !upper_ok {
        return Ok(None);
    }

    let mut new_times = times.to_vec();
    new_times[index] = new_time;
    Ok(Some(with_times(track, new_times)))
}

/// Drop a scale channel that is unit throughout. `None` when every keyframe is
/// the identity transform.
pub fn simplify(track: &BoneTrack) -> Option<BoneTrack> {
    let all_identity =
        (0..track.keyframe_count()).all(|index| track.transform(index).is_identity());
    if all_identity {
        return None;
    }
    let unit_scales = track
        .scales()
        .map_or(true, |scales| scales.iter().all(|s| *s == Vector3::repeat(1.0)));
    let frames = keyframes(track).collect();
    Some(assemble(track.bone(), frames, !unit_scales))
}

/// Apply [`remove_repeats`] to every track. Returns the new animation and how many
/// tracks changed.
pub fn remove_repeats_in_animation(animation: &Animation) -> (Animation, usize) {
    let mut changed = 0;
    let tracks: Vec<BoneTrack> = animation
        .tracks()
        .iter()
        .map(|track| match remove_repeats(track) {
            Some(cleaned) => {
                changed += 1;
                cleaned
            }
            None => track.clone(),
        })
        .collect();
    debug!(
        "removed repeated keyframes from {changed} of {} tracks in '{}'",
        tracks.len(),
        animation.name()
    );
    (rebuild(animation, tracks), changed)
}

/// Force the first keyframe of every track to time 0. Returns the new animation
/// and how many tracks changed.
pub fn zero_first(animation: &Animation) -> (Animation, usize) {
    let mut changed = 0;
    let tracks: Vec<BoneTrack> = animation
        .tracks()
        .iter()
        .map(|track| {
            if track.times()[0] == 0.0 {
                return track.clone();
            }
            changed += 1;
            let mut times = track.times().to_vec();
            times[0] = 0.0;
            with_times(track, times)
        })
        .collect();
    debug!(
        "zeroed first keyframe in {changed} of {} tracks in '{}'",
        tracks.len(),
        animation.name()
    );
    (rebuild(animation, tracks), changed)
}

/// Rescale every track of `animation` to `new_duration`.
pub fn set_animation_duration(
    animation: &Animation,
    new_duration: f32,
) -> crate::Result<Animation> {
    let tracks = animation
        .tracks()
        .iter()
        .map(|track| set_duration(track, animation.duration(), new_duration))
        .collect::<crate::Result<Vec<_>>>()?;
    Animation::with_tracks(animation.name(), new_duration, tracks)
}

/// Same name and duration, new tracks. Edits never move a track past the duration
/// or duplicate a bone.
fn rebuild(animation: &Animation, tracks: Vec<BoneTrack>) -> Animation {
    let mut rebuilt = match Animation::new(animation.name(), animation.duration()) {
        Ok(rebuilt) => rebuilt,
        Err(_) => return animation.clone(),
    };
    for track in tracks {
        let result = rebuilt.add_track(track);
        debug_assert!(result.is_ok(), "{result:?}");
    }
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    fn ramp(times: &[f32]) -> BoneTrack {
        BoneTrack::new(
            2,
            times.to_vec(),
            times.iter().map(|&t| Vector3::new(t, 0.0, 0.0)).collect(),
            vec![UnitQuaternion::identity(); times.len()],
            None,
        )
        .unwrap()
    }

    #[test]
    fn assemble_materializes_scales_only_when_needed() {
        let track = ramp(&[0.0, 1.0]);
        let plain = insert_keyframe(&track, 0.5, Transform::identity()).unwrap();
        assert!(!plain.has_scales());

        let scaled = Transform {
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..Transform::identity()
        };
        let with_scale = insert_keyframe(&track, 0.5, scaled).unwrap();
        assert_eq!(
            with_scale.scales().unwrap(),
            &[Vector3::repeat(1.0), Vector3::repeat(2.0), Vector3::repeat(1.0)]
        );
    }

    #[test]
    fn cyclic_resample_needs_track_inside_cycle() {
        let track = ramp(&[0.0, 2.0]);
        let looping = TweenTransforms::uniform(crate::TweenTechnique::LoopLerp);
        assert!(matches!(
            resample(&track, &[0.0, 1.0], 1.0, &looping),
            Err(AnimationError::TrackTooLong { .. })
        ));
        assert!(resample(&track, &[0.0, 1.0], 2.0, &looping).is_ok());
    }
}
