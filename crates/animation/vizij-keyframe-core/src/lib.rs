//! Vizij Keyframe Core (engine-agnostic)
//!
//! Keyframe curve evaluation, bone-track editing and skeleton retargeting.
//! The crate consumes plain keyframe arrays plus skeleton/bone-mapping data and
//! returns new keyframe arrays or interpolated poses. It never touches rendering.
//!
//! Layout:
//! - [`math`]: lerp, slerp, squad, cubic Hermite and centripetal primitives.
//! - [`tween`]: the closed sets of interpolation techniques for vectors and rotations.
//! - [`curve`]: per-interval precomputed curves for O(1) segment evaluation.
//! - [`track`] / [`edit`] / [`smooth`]: bone tracks and pure editing transforms.
//! - [`skeleton`] / [`pose`] / [`mapping`] / [`retarget`]: cross-skeleton retargeting.

pub mod config;
pub mod curve;
pub mod edit;
pub mod error;
pub mod mapping;
pub mod math;
pub mod pose;
pub mod retarget;
pub mod skeleton;
pub mod smooth;
pub mod track;
pub mod transform;
pub mod tween;

// Re-exports for consumers (adapters)
pub use config::Config;
pub use curve::{PrecomputedCurve, RotationCurve, TrackCurves, VectorCurve};
pub use error::AnimationError;
pub use mapping::{BoneMapping, SkeletonMapping};
pub use pose::Pose;
pub use retarget::{retarget_animation, retarget_track, PoseCache};
pub use skeleton::{Bone, Skeleton};
pub use smooth::{SmoothRotations, SmoothVectors};
pub use track::{Animation, BoneIndex, BoneTrack};
pub use transform::Transform;
pub use tween::{interpolate, RotationTechnique, Shape, TweenTechnique, TweenTransforms, Tweenable};

/// Keyframe core result type
pub type Result<T> = core::result::Result<T, AnimationError>;
