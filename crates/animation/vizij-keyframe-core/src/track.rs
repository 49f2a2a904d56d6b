//! Bone keyframe tracks and animations.

use hashbrown::HashMap;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{check_duration, AnimationError};
use crate::transform::Transform;

/// Bone index, stable within one skeleton.
pub type BoneIndex = usize;

/// Keyframes for one bone as parallel arrays.
///
/// Invariants: `times` is non-empty, finite, non-negative and ascending;
/// translations, rotations and (when present) scales match its length.
/// A missing scale channel means unit scale at every keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoneTrackData", into = "BoneTrackData")]
pub struct BoneTrack {
    bone: BoneIndex,
    times: Vec<f32>,
    translations: Vec<Vector3<f32>>,
    rotations: Vec<UnitQuaternion<f32>>,
    scales: Option<Vec<Vector3<f32>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoneTrackData {
    bone: BoneIndex,
    times: Vec<f32>,
    translations: Vec<Vector3<f32>>,
    rotations: Vec<UnitQuaternion<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scales: Option<Vec<Vector3<f32>>>,
}

impl TryFrom<BoneTrackData> for BoneTrack {
    type Error = AnimationError;

    fn try_from(data: BoneTrackData) -> Result<Self, Self::Error> {
        BoneTrack::new(
            data.bone,
            data.times,
            data.translations,
            data.rotations,
            data.scales,
        )
    }
}

impl From<BoneTrack> for BoneTrackData {
    fn from(track: BoneTrack) -> Self {
        Self {
            bone: track.bone,
            times: track.times,
            translations: track.translations,
            rotations: track.rotations,
            scales: track.scales,
        }
    }
}

fn validate_keyframes(
    times: &[f32],
    translations: usize,
    rotations: usize,
    scales: Option<usize>,
    strict: bool,
) -> crate::Result<()> {
    if times.is_empty() {
        return Err(AnimationError::EmptyTrack);
    }
    for (index, &time) in times.iter().enumerate() {
        if !time.is_finite() || time < 0.0 {
            return Err(AnimationError::invalid_time("keyframe time", time));
        }
        if index > 0 {
            let previous = times[index - 1];
            if time < previous || (strict && time == previous) {
                return Err(AnimationError::NonAscendingTimes {
                    index,
                    time,
                    previous,
                });
            }
        }
    }
    let expected = times.len();
    let channels = [
        ("translations", Some(translations)),
        ("rotations", Some(rotations)),
        ("scales", scales),
    ];
    for (channel, actual) in channels {
        if let Some(actual) = actual {
            if actual != expected {
                return Err(AnimationError::LengthMismatch {
                    channel: channel.to_string(),
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(())
}

impl BoneTrack {
    /// Build a track with strictly ascending keyframe times.
    pub fn new(
        bone: BoneIndex,
        times: Vec<f32>,
        translations: Vec<Vector3<f32>>,
        rotations: Vec<UnitQuaternion<f32>>,
        scales: Option<Vec<Vector3<f32>>>,
    ) -> crate::Result<Self> {
        validate_keyframes(
            &times,
            translations.len(),
            rotations.len(),
            scales.as_ref().map(Vec::len),
            true,
        )?;
        Ok(Self {
            bone,
            times,
            translations,
            rotations,
            scales,
        })
    }

    /// Like [`BoneTrack::new`] but accepts repeated times, as found in imported
    /// data. Clean such tracks with [`crate::edit::remove_repeats`].
    pub fn with_repeats(
        bone: BoneIndex,
        times: Vec<f32>,
        translations: Vec<Vector3<f32>>,
        rotations: Vec<UnitQuaternion<f32>>,
        scales: Option<Vec<Vector3<f32>>>,
    ) -> crate::Result<Self> {
        validate_keyframes(
            &times,
            translations.len(),
            rotations.len(),
            scales.as_ref().map(Vec::len),
            false,
        )?;
        Ok(Self {
            bone,
            times,
            translations,
            rotations,
            scales,
        })
    }

    /// Single keyframe at time 0.
    pub fn single(bone: BoneIndex, transform: Transform) -> Self {
        let scales = (transform.scale != Vector3::repeat(1.0)).then(|| vec![transform.scale]);
        Self {
            bone,
            times: vec![0.0],
            translations: vec![transform.translation],
            rotations: vec![transform.rotation],
            scales,
        }
    }

    /// Assemble arrays produced by an edit from an already-valid track.
    pub(crate) fn from_parts(
        bone: BoneIndex,
        times: Vec<f32>,
        translations: Vec<Vector3<f32>>,
        rotations: Vec<UnitQuaternion<f32>>,
        scales: Option<Vec<Vector3<f32>>>,
    ) -> Self {
        debug_assert!(validate_keyframes(
            &times,
            translations.len(),
            rotations.len(),
            scales.as_ref().map(Vec::len),
            false
        )
        .is_ok());
        Self {
            bone,
            times,
            translations,
            rotations,
            scales,
        }
    }

    #[inline]
    pub fn bone(&self) -> BoneIndex {
        self.bone
    }

    #[inline]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    #[inline]
    pub fn translations(&self) -> &[Vector3<f32>] {
        &self.translations
    }

    #[inline]
    pub fn rotations(&self) -> &[UnitQuaternion<f32>] {
        &self.rotations
    }

    #[inline]
    pub fn scales(&self) -> Option<&[Vector3<f32>]> {
        self.scales.as_deref()
    }

    #[inline]
    pub fn has_scales(&self) -> bool {
        self.scales.is_some()
    }

    #[inline]
    pub fn keyframe_count(&self) -> usize {
        self.times.len()
    }

    /// Time of the final keyframe.
    #[inline]
    pub fn last_time(&self) -> f32 {
        self.times[self.times.len() - 1]
    }

    /// Scale at `index`, unit when the track has no scale channel.
    pub fn scale(&self, index: usize) -> Vector3<f32> {
        self.scales
            .as_ref()
            .map_or(Vector3::repeat(1.0), |scales| scales[index])
    }

    /// Keyframe `index` as a transform. Panics when out of range.
    pub fn transform(&self, index: usize) -> Transform {
        Transform::new(
            self.translations[index],
            self.rotations[index],
            self.scale(index),
        )
    }

    /// Index of the keyframe at exactly `time`.
    pub fn find_keyframe_index(&self, time: f32) -> Option<usize> {
        let index = self.times.partition_point(|&t| t < time);
        (self.times.get(index) == Some(&time)).then_some(index)
    }

    /// Index of the last keyframe at or before `time`; 0 when `time` precedes them all.
    pub fn find_previous_keyframe_index(&self, time: f32) -> usize {
        self.times.partition_point(|&t| t <= time).saturating_sub(1)
    }

    /// Same keyframes, reassigned to another bone.
    pub fn with_bone(mut self, bone: BoneIndex) -> Self {
        self.bone = bone;
        self
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<f32>,
        Vec<Vector3<f32>>,
        Vec<UnitQuaternion<f32>>,
        Option<Vec<Vector3<f32>>>,
    ) {
        (self.times, self.translations, self.rotations, self.scales)
    }
}

/// A named set of bone tracks, at most one per bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnimationData", into = "AnimationData")]
pub struct Animation {
    name: String,
    duration: f32,
    tracks: Vec<BoneTrack>,
    by_bone: HashMap<BoneIndex, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnimationData {
    name: String,
    duration: f32,
    #[serde(default)]
    tracks: Vec<BoneTrack>,
}

impl TryFrom<AnimationData> for Animation {
    type Error = AnimationError;

    fn try_from(data: AnimationData) -> Result<Self, Self::Error> {
        Animation::with_tracks(data.name, data.duration, data.tracks)
    }
}

impl From<Animation> for AnimationData {
    fn from(animation: Animation) -> Self {
        Self {
            name: animation.name,
            duration: animation.duration,
            tracks: animation.tracks,
        }
    }
}

impl Animation {
    /// Empty animation. `duration` must be finite and non-negative.
    pub fn new(name: impl Into<String>, duration: f32) -> crate::Result<Self> {
        check_duration(duration)?;
        Ok(Self {
            name: name.into(),
            duration,
            tracks: Vec::new(),
            by_bone: HashMap::new(),
        })
    }

    pub fn with_tracks(
        name: impl Into<String>,
        duration: f32,
        tracks: impl IntoIterator<Item = BoneTrack>,
    ) -> crate::Result<Self> {
        let mut animation = Self::new(name, duration)?;
        for track in tracks {
            animation.add_track(track)?;
        }
        Ok(animation)
    }

    /// Add a track; rejects a second track for the same bone and tracks that run
    /// past the duration.
    pub fn add_track(&mut self, track: BoneTrack) -> crate::Result<()> {
        let bone = track.bone();
        if self.by_bone.contains_key(&bone) {
            return Err(AnimationError::DuplicateTrack { bone });
        }
        if track.last_time() > self.duration {
            return Err(AnimationError::TrackTooLong {
                bone,
                end: track.last_time(),
                duration: self.duration,
            });
        }
        self.by_bone.insert(bone, self.tracks.len());
        self.tracks.push(track);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Tracks in insertion order.
    pub fn tracks(&self) -> &[BoneTrack] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track_for(&self, bone: BoneIndex) -> Option<&BoneTrack> {
        self.by_bone.get(&bone).map(|&slot| &self.tracks[slot])
    }

    pub fn into_tracks(self) -> Vec<BoneTrack> {
        self.tracks
    }
}
