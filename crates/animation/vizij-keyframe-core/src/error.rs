//! Error types for keyframe curves, track edits and retargeting

use serde::{Deserialize, Serialize};

/// Every way an edit, a track construction or a retarget can be rejected.
///
/// All variants describe invalid arguments: the call that returns one has not
/// produced any partial output.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// A track needs at least one keyframe
    #[error("Track has no keyframes")]
    EmptyTrack,

    /// Keyframe times must ascend
    #[error("Keyframe time at index {index} ({time}) does not follow {previous}")]
    NonAscendingTimes {
        index: usize,
        time: f32,
        previous: f32,
    },

    /// A parallel keyframe array has the wrong length
    #[error("{channel} has {actual} entries, expected {expected}")]
    LengthMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },

    /// Time value outside what the operation accepts
    #[error("Invalid time for {what}: {time}")]
    InvalidTime { what: String, time: f32 },

    /// Negative or non-finite duration
    #[error("Invalid duration: {duration}")]
    InvalidDuration { duration: f32 },

    /// Keyframe index out of range
    #[error("Index {index} is out of range [{min}, {max}] for {what}")]
    IndexOutOfRange {
        what: String,
        index: usize,
        min: usize,
        max: usize,
    },

    /// A keyframe already exists at the requested time
    #[error("Track already has a keyframe at {time}")]
    KeyframeExists { time: f32 },

    /// Reduction factor below 2
    #[error("Reduction factor must be at least 2, got {factor}")]
    InvalidFactor { factor: usize },

    /// Sample rate not positive
    #[error("Sample rate must be positive and finite, got {rate}")]
    InvalidSampleRate { rate: f32 },

    /// Too few samples requested
    #[error("Sample count must be at least 2, got {count}")]
    InvalidSampleCount { count: usize },

    /// Blend weight outside [0, 1]
    #[error("Blend weight must be in [0, 1], got {weight}")]
    InvalidWeight { weight: f32 },

    /// Smoothing window outside [0, duration]
    #[error("Smoothing width {width} is outside [0, {duration}]")]
    InvalidWindow { width: f32, duration: f32 },

    /// Chained tracks overlap in time
    #[error("Tracks overlap: first ends at {end1}, second starts at {start2}")]
    OverlappingTracks { end1: f32, start2: f32 },

    /// An animation holds at most one track per bone
    #[error("Animation already has a track for bone {bone}")]
    DuplicateTrack { bone: usize },

    /// A track runs past the animation duration
    #[error("Track for bone {bone} ends at {end}, after the animation duration {duration}")]
    TrackTooLong { bone: usize, end: f32, duration: f32 },

    /// Bone name not present in a skeleton
    #[error("Bone '{name}' not found in {skeleton} skeleton")]
    UnknownBone { name: String, skeleton: String },

    /// Structural problem in a skeleton
    #[error("Invalid skeleton: {reason}")]
    InvalidSkeleton { reason: String },

    /// Rejected configuration value
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl AnimationError {
    pub(crate) fn invalid_time(what: impl Into<String>, time: f32) -> Self {
        Self::InvalidTime {
            what: what.into(),
            time,
        }
    }

    pub(crate) fn index_out_of_range(
        what: impl Into<String>,
        index: usize,
        min: usize,
        max: usize,
    ) -> Self {
        Self::IndexOutOfRange {
            what: what.into(),
            index,
            min,
            max,
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyTrack
            | Self::NonAscendingTimes { .. }
            | Self::LengthMismatch { .. }
            | Self::DuplicateTrack { .. }
            | Self::TrackTooLong { .. } => "track",
            Self::InvalidTime { .. }
            | Self::InvalidDuration { .. }
            | Self::IndexOutOfRange { .. }
            | Self::KeyframeExists { .. }
            | Self::InvalidFactor { .. }
            | Self::InvalidSampleRate { .. }
            | Self::InvalidSampleCount { .. }
            | Self::InvalidWeight { .. }
            | Self::InvalidWindow { .. }
            | Self::OverlappingTracks { .. } => "argument",
            Self::UnknownBone { .. } | Self::InvalidSkeleton { .. } => "skeleton",
            Self::InvalidConfig { .. } => "config",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Reject negative, NaN or infinite durations.
pub(crate) fn check_duration(duration: f32) -> crate::Result<()> {
    if duration.is_finite() && duration >= 0.0 {
        Ok(())
    } else {
        Err(AnimationError::InvalidDuration { duration })
    }
}

/// Reject times that are not finite and strictly positive.
pub(crate) fn check_positive_time(what: &str, time: f32) -> crate::Result<()> {
    if time.is_finite() && time > 0.0 {
        Ok(())
    } else {
        Err(AnimationError::invalid_time(what, time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(AnimationError::EmptyTrack.category(), "track");
        assert_eq!(
            AnimationError::InvalidFactor { factor: 1 }.category(),
            "argument"
        );
        let unknown = AnimationError::UnknownBone {
            name: "hips".to_string(),
            skeleton: "source".to_string(),
        };
        assert_eq!(unknown.category(), "skeleton");
    }

    #[test]
    fn test_display_mentions_values() {
        let err = AnimationError::index_out_of_range("keyframe index", 7, 0, 3);
        assert_eq!(
            err.to_string(),
            "Index 7 is out of range [0, 3] for keyframe index"
        );
    }

    #[test]
    fn test_checks() {
        assert!(check_duration(0.0).is_ok());
        assert!(check_duration(-1.0).is_err());
        assert!(check_duration(f32::NAN).is_err());
        assert!(check_positive_time("end time", 0.0).is_err());
        assert!(check_positive_time("end time", 0.5).is_ok());
    }

    #[test]
    fn test_serialization() {
        let error = AnimationError::KeyframeExists { time: 1.5 };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: AnimationError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
