//! Cross-skeleton retargeting with a per-call pose cache.
//!
//! Target bones mapped from the same source animation share sample times, so the
//! retargeted target pose for a time is computed once and reused by every track.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use log::{debug, trace, warn};

use crate::config::Config;
use crate::error::AnimationError;
use crate::mapping::SkeletonMapping;
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use crate::track::{Animation, BoneIndex, BoneTrack};
use crate::tween::TweenTransforms;

/// Retargeted target poses keyed by sample time, quantized to `resolution` seconds.
#[derive(Debug)]
pub struct PoseCache<'a> {
    resolution: f32,
    poses: HashMap<i64, Pose<'a>>,
    hits: usize,
    misses: usize,
}

impl<'a> PoseCache<'a> {
    /// `resolution` must be positive; see [`Config::validate`].
    pub fn new(resolution: f32) -> Self {
        debug_assert!(resolution > 0.0, "resolution = {resolution}");
        Self {
            resolution,
            poses: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Times closer than half a resolution step share a key.
    #[inline]
    pub fn key(&self, time: f32) -> i64 {
        (time / self.resolution).round() as i64
    }

    pub fn get_or_insert_with<F>(&mut self, time: f32, compute: F) -> &Pose<'a>
    where
        F: FnOnce() -> Pose<'a>,
    {
        let key = self.key(time);
        match self.poses.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                entry.insert(compute())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

/// Retarget one target bone.
///
/// Samples at the keyframe times of `source_track`, or once at time 0 when there is
/// no source track. Without `source_animation` the source skeleton stays in its
/// bind pose. The result holds the target bone's user transforms: retargeted
/// rotations with zero translations and unit scales.
#[allow(clippy::too_many_arguments)]
pub fn retarget_track<'a>(
    source_animation: Option<&Animation>,
    source_track: Option<&BoneTrack>,
    source_skeleton: &Skeleton,
    target_skeleton: &'a Skeleton,
    target_bone: BoneIndex,
    mapping: &SkeletonMapping,
    techniques: &TweenTransforms,
    cache: &mut PoseCache<'a>,
) -> crate::Result<BoneTrack> {
    if target_bone >= target_skeleton.len() {
        return Err(AnimationError::index_out_of_range(
            "target bone",
            target_bone,
            0,
            target_skeleton.len().saturating_sub(1),
        ));
    }

    let times = source_track.map_or_else(|| vec![0.0], |track| track.times().to_vec());
    let mut translations = Vec::with_capacity(times.len());
    let mut rotations = Vec::with_capacity(times.len());

    for &time in &times {
        let pose = cache.get_or_insert_with(time, || {
            let mut source_pose = Pose::bind(source_skeleton);
            if let Some(animation) = source_animation {
                source_pose.set_to_animation(animation, time, techniques);
            }
            let mut target_pose = Pose::bind(target_skeleton);
            target_pose.set_to_retarget(&source_pose, mapping);
            target_pose
        });
        let user = pose.user_transform(target_bone);
        translations.push(user.translation);
        rotations.push(user.rotation);
    }

    trace!(
        "retargeted target bone {target_bone} over {} samples",
        times.len()
    );
    BoneTrack::new(target_bone, times, translations, rotations, None)
}

/// Retarget `source_animation` onto `target_skeleton`: one track per target bone
/// that `mapping` names.
///
/// A mapped source bone missing from `source_skeleton` is an error. Mappings for
/// bones that `target_skeleton` lacks are skipped with a warning.
pub fn retarget_animation(
    source_animation: &Animation,
    source_skeleton: &Skeleton,
    target_skeleton: &Skeleton,
    mapping: &SkeletonMapping,
    config: &Config,
    name: &str,
) -> crate::Result<Animation> {
    config.validate()?;

    let mut pairs: Vec<(BoneIndex, BoneIndex)> = Vec::new();
    for (target_bone, bone) in target_skeleton.bones().iter().enumerate() {
        let Some(bone_mapping) = mapping.get(&bone.name) else {
            continue;
        };
        let source_bone = source_skeleton.bone_index(&bone_mapping.source).ok_or_else(|| {
            AnimationError::UnknownBone {
                name: bone_mapping.source.clone(),
                skeleton: "source".to_string(),
            }
        })?;
        pairs.push((target_bone, source_bone));
    }
    for bone_mapping in mapping.iter() {
        if target_skeleton.bone_index(&bone_mapping.target).is_none() {
            warn!(
                "mapping names target bone '{}' which is not in the target skeleton",
                bone_mapping.target
            );
        }
    }

    let mut cache = PoseCache::new(config.pose_cache_resolution);
    let mut result = Animation::new(name, source_animation.duration())?;
    for (target_bone, source_bone) in pairs {
        let track = retarget_track(
            Some(source_animation),
            source_animation.track_for(source_bone),
            source_skeleton,
            target_skeleton,
            target_bone,
            mapping,
            &config.techniques,
            &mut cache,
        )?;
        result.add_track(track)?;
    }

    debug!(
        "retargeted '{}' -> '{}': {} tracks, {} poses computed, {} reused",
        source_animation.name(),
        name,
        result.track_count(),
        cache.misses(),
        cache.hits()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Bone;
    use crate::transform::Transform;
    use nalgebra::UnitQuaternion;

    #[test]
    fn cache_key_absorbs_float_noise() {
        let cache = PoseCache::new(1e-4);
        assert_eq!(cache.key(0.1), cache.key(0.1 + 1e-7));
        assert_eq!(cache.key(0.3), cache.key(0.1 + 0.2));
        assert_ne!(cache.key(0.1), cache.key(0.1002));
    }

    #[test]
    fn cache_counts_hits_and_misses() {
        let skeleton = Skeleton::new(vec![Bone::new("root", None, Transform::identity())]).unwrap();
        let mut cache = PoseCache::new(1e-4);
        let mut computed = 0;
        for &time in &[0.0, 0.5, 0.5, 0.0] {
            cache.get_or_insert_with(time, || {
                computed += 1;
                Pose::bind(&skeleton)
            });
        }
        assert_eq!(computed, 2);
        assert_eq!((cache.len(), cache.misses(), cache.hits()), (2, 2, 2));
    }

    #[test]
    fn bind_pose_retarget_has_single_sample() {
        let twist = UnitQuaternion::from_euler_angles(0.0f32, 0.0, 0.25);
        let source = Skeleton::new(vec![Bone::new("pelvis", None, Transform::identity())]).unwrap();
        let target = Skeleton::new(vec![Bone::new("Hips", None, Transform::identity())]).unwrap();
        let mut mapping = SkeletonMapping::new();
        mapping.map_with_twist("Hips", "pelvis", twist);

        let mut cache = PoseCache::new(1e-4);
        let track = retarget_track(
            None,
            None,
            &source,
            &target,
            0,
            &mapping,
            &TweenTransforms::default(),
            &mut cache,
        )
        .unwrap();
        assert_eq!(track.times(), &[0.0]);
        assert!(
            (track.rotations()[0].as_ref().coords.dot(&twist.as_ref().coords).abs() - 1.0).abs()
                < 1e-5
        );
        assert!(!track.has_scales());

        let out_of_range = retarget_track(
            None,
            None,
            &source,
            &target,
            3,
            &mapping,
            &TweenTransforms::default(),
            &mut cache,
        );
        assert!(matches!(out_of_range, Err(AnimationError::IndexOutOfRange { .. })));
    }
}
