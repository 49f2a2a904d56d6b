//! Per-bone user transforms over a skeleton.
//!
//! A bone's local transform combines its bind transform with its user transform:
//! translations add, rotations compose (`bind * user`), scales multiply. Tracks
//! store user transforms.

use nalgebra::UnitQuaternion;

use crate::edit::transform_at;
use crate::mapping::SkeletonMapping;
use crate::skeleton::Skeleton;
use crate::track::{Animation, BoneIndex, BoneTrack};
use crate::transform::Transform;
use crate::tween::TweenTransforms;

#[derive(Debug, Clone, PartialEq)]
pub struct Pose<'a> {
    skeleton: &'a Skeleton,
    user: Vec<Transform>,
}

impl<'a> Pose<'a> {
    /// Every bone at its bind transform.
    pub fn bind(skeleton: &'a Skeleton) -> Self {
        Self {
            skeleton,
            user: vec![Transform::identity(); skeleton.len()],
        }
    }

    pub fn skeleton(&self) -> &'a Skeleton {
        self.skeleton
    }

    pub fn set_to_bind(&mut self) {
        self.user.fill(Transform::identity());
    }

    /// Evaluate `animation` at `time`; bones without a track return to bind.
    /// Tracks for bones outside this skeleton are ignored.
    pub fn set_to_animation(
        &mut self,
        animation: &Animation,
        time: f32,
        techniques: &TweenTransforms,
    ) {
        self.set_to_bind();
        for track in animation.tracks() {
            if let Some(user) = self.user.get_mut(track.bone()) {
                *user = transform_at(track, time, animation.duration(), techniques);
            }
        }
    }

    pub fn user_transform(&self, bone: BoneIndex) -> Transform {
        self.user[bone]
    }

    pub fn set_user_transform(&mut self, bone: BoneIndex, transform: Transform) {
        self.user[bone] = transform;
    }

    fn bind_of(&self, bone: BoneIndex) -> &Transform {
        &self.skeleton.bones()[bone].bind
    }

    pub fn local_rotation(&self, bone: BoneIndex) -> UnitQuaternion<f32> {
        self.bind_of(bone).rotation * self.user[bone].rotation
    }

    pub fn local_transform(&self, bone: BoneIndex) -> Transform {
        let bind = self.bind_of(bone);
        let user = &self.user[bone];
        Transform::new(
            bind.translation + user.translation,
            bind.rotation * user.rotation,
            bind.scale.component_mul(&user.scale),
        )
    }

    /// Orientation in model space.
    pub fn model_orientation(&self, bone: BoneIndex) -> UnitQuaternion<f32> {
        let local = self.local_rotation(bone);
        match self.skeleton.parent(bone) {
            Some(parent) => self.model_orientation(parent) * local,
            None => local,
        }
    }

    /// Full model-space transform; the parent's scale applies to the child offset.
    pub fn model_transform(&self, bone: BoneIndex) -> Transform {
        let local = self.local_transform(bone);
        match self.skeleton.parent(bone) {
            Some(parent) => {
                let parent = self.model_transform(parent);
                Transform::new(
                    parent.translation
                        + parent.rotation * parent.scale.component_mul(&local.translation),
                    parent.rotation * local.rotation,
                    parent.scale.component_mul(&local.scale),
                )
            }
            None => local,
        }
    }

    /// Model orientation of every bone, indexed by bone.
    pub fn model_orientations(&self) -> Vec<UnitQuaternion<f32>> {
        let mut model = vec![UnitQuaternion::identity(); self.user.len()];
        for bone in self.skeleton.pre_order() {
            let local = self.local_rotation(bone);
            model[bone] = match self.skeleton.parent(bone) {
                Some(parent) => model[parent] * local,
                None => local,
            };
        }
        model
    }

    /// User rotation that gives `bone` the model orientation `model`, with the
    /// parent chain as currently posed.
    pub fn user_for_model(
        &self,
        bone: BoneIndex,
        model: &UnitQuaternion<f32>,
    ) -> UnitQuaternion<f32> {
        let local = match self.skeleton.parent(bone) {
            Some(parent) => self.model_orientation(parent).inverse() * model,
            None => *model,
        };
        let mut user = self.bind_of(bone).rotation.inverse() * local;
        user.renormalize();
        user
    }

    /// Pose this skeleton so every mapped bone matches the model orientation of its
    /// source bone (followed by the mapping twist). Unmapped bones, and bones whose
    /// source is missing from `source`, return to bind. Translations stay at bind.
    pub fn set_to_retarget(&mut self, source: &Pose<'_>, mapping: &SkeletonMapping) {
        let source_model = source.model_orientations();
        let mut model = vec![UnitQuaternion::identity(); self.user.len()];

        for bone in self.skeleton.pre_order() {
            self.user[bone] = Transform::identity();
            let driven = self.skeleton.bones()[bone].name.as_str();
            let source_bone = mapping.get(driven).and_then(|m| {
                source
                    .skeleton
                    .bone_index(&m.source)
                    .map(|index| (index, m.twist))
            });
            let parent_model = self.skeleton.parent(bone).map(|parent| model[parent]);

            if let Some((index, twist)) = source_bone {
                let local = match parent_model {
                    Some(parent_model) => parent_model.inverse() * source_model[index],
                    None => source_model[index],
                };
                let mut user = self.bind_of(bone).rotation.inverse() * local * twist;
                user.renormalize();
                self.user[bone].rotation = user;
            }

            let local = self.local_rotation(bone);
            model[bone] = parent_model.map_or(local, |parent_model| parent_model * local);
        }
    }

    /// Zero-duration animation with one keyframe per bone holding this pose.
    pub fn capture(&self, name: &str) -> crate::Result<Animation> {
        let tracks = self
            .user
            .iter()
            .enumerate()
            .map(|(bone, user)| BoneTrack::single(bone, *user));
        Animation::with_tracks(name, 0.0, tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Bone;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f32::consts::FRAC_PI_2;

    fn chain() -> Skeleton {
        let twisted = Transform::new(
            Vector3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2),
            Vector3::repeat(1.0),
        );
        Skeleton::new(vec![
            Bone::new("root", None, Transform::identity()),
            Bone::new("mid", Some(0), twisted),
            Bone::new("tip", Some(1), Transform::from_translation(Vector3::new(0.0, 1.0, 0.0))),
        ])
        .unwrap()
    }

    #[test]
    fn bind_model_transforms() {
        let skeleton = chain();
        let pose = Pose::bind(&skeleton);
        let tip = pose.model_transform(2);
        // mid is rotated 90 degrees about z, so tip's +y offset points along -x
        assert_relative_eq!(tip.translation, Vector3::new(-1.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(
            pose.model_orientation(2).angle(),
            FRAC_PI_2,
            epsilon = 1e-5
        );
        let all = pose.model_orientations();
        assert_relative_eq!(all[2].angle(), FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn user_for_model_inverts_model_orientation() {
        let skeleton = chain();
        let mut pose = Pose::bind(&skeleton);
        let wanted = UnitQuaternion::from_euler_angles(0.4, -0.2, 1.1);
        let user = pose.user_for_model(1, &wanted);
        pose.set_user_transform(1, Transform::from_rotation(user));
        let got = pose.model_orientation(1);
        let dot = got.as_ref().coords.dot(&wanted.as_ref().coords).abs();
        assert_relative_eq!(dot, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn retarget_onto_identical_skeleton_copies_rotations() {
        let skeleton = chain();
        let mut source = Pose::bind(&skeleton);
        let roll = UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0);
        let pitch = UnitQuaternion::from_euler_angles(0.0, 0.7, 0.0);
        source.set_user_transform(0, Transform::from_rotation(roll));
        source.set_user_transform(2, Transform::from_rotation(pitch));

        let mut mapping = SkeletonMapping::new();
        for bone in skeleton.bones() {
            mapping.map(bone.name.clone(), bone.name.clone());
        }
        let mut target = Pose::bind(&skeleton);
        target.set_to_retarget(&source, &mapping);

        for bone in 0..skeleton.len() {
            let a = source.user_transform(bone).rotation;
            let b = target.user_transform(bone).rotation;
            let dot = a.as_ref().coords.dot(&b.as_ref().coords).abs();
            assert_relative_eq!(dot, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn capture_holds_user_transforms() {
        let skeleton = chain();
        let mut pose = Pose::bind(&skeleton);
        pose.set_user_transform(1, Transform::from_translation(Vector3::new(0.0, 0.0, 2.0)));
        let animation = pose.capture("snapshot").unwrap();
        assert_eq!(animation.duration(), 0.0);
        assert_eq!(animation.track_count(), 3);
        assert_eq!(
            animation.track_for(1).unwrap().transform(0).translation,
            Vector3::new(0.0, 0.0, 2.0)
        );
    }
}
