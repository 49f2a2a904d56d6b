//! Core configuration for vizij-keyframe-core.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::tween::TweenTransforms;

/// Default pose-cache bucket: 0.1 ms.
pub const DEFAULT_POSE_CACHE_RESOLUTION: f32 = 1.0e-4;

/// Evaluation and retargeting settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Current technique per channel (translations, rotations, scales).
    pub techniques: TweenTransforms,

    /// Seconds per pose-cache key during retargeting. Sample times closer than
    /// half of this share one cached pose.
    pub pose_cache_resolution: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            techniques: TweenTransforms::default(),
            pose_cache_resolution: DEFAULT_POSE_CACHE_RESOLUTION,
        }
    }
}

impl Config {
    pub fn validate(&self) -> crate::Result<()> {
        let resolution = self.pose_cache_resolution;
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(AnimationError::InvalidConfig {
                reason: format!("pose_cache_resolution must be positive, got {resolution}"),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON config document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::{RotationTechnique, TweenTechnique};

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.techniques.rotations, RotationTechnique::Nlerp);
        assert_eq!(config.pose_cache_resolution, 1.0e-4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_document() {
        let json = r#"{"techniques":{
            "translations":"FdcSpline","rotations":"LoopSlerp","scales":"Lerp"}}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.techniques.translations, TweenTechnique::FdcSpline);
        assert_eq!(config.techniques.rotations, RotationTechnique::LoopSlerp);
        assert_eq!(config.pose_cache_resolution, DEFAULT_POSE_CACHE_RESOLUTION);

        // vector technique names select the coordinate variant
        let json = r#"{"techniques":{
            "translations":"Lerp","rotations":"LoopLerp","scales":"Lerp"}}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(
            config.techniques.rotations,
            RotationTechnique::Coords(TweenTechnique::LoopLerp)
        );

        let json = r#"{"techniques":{
            "translations":"Lerp","rotations":"Bezier","scales":"Lerp"}}"#;
        let err = Config::from_json_str(json).unwrap_err();
        assert_eq!(err.category(), "serialization");
    }

    #[test]
    fn rejects_bad_resolution() {
        let err = Config::from_json_str(r#"{"pose_cache_resolution":0.0}"#).unwrap_err();
        assert_eq!(err.category(), "config");
        let err = Config::from_json_str("{not json").unwrap_err();
        assert_eq!(err.category(), "serialization");
    }
}
