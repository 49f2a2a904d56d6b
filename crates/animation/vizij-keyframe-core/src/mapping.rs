//! Bone-name correspondence between a source and a target skeleton.

use hashbrown::HashMap;
use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::skeleton::Skeleton;

fn identity_twist() -> UnitQuaternion<f32> {
    UnitQuaternion::identity()
}

/// One target bone driven by one source bone, with a corrective twist applied
/// after the source orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneMapping {
    pub target: String,
    pub source: String,
    #[serde(default = "identity_twist")]
    pub twist: UnitQuaternion<f32>,
}

impl BoneMapping {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            twist: identity_twist(),
        }
    }

    /// Swap source and target; the twist is inverted.
    pub fn inverse(&self) -> Self {
        Self {
            target: self.source.clone(),
            source: self.target.clone(),
            twist: self.twist.inverse(),
        }
    }
}

/// Target-name to source-name table. Each target bone maps to at most one source
/// bone; several targets may share a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<BoneMapping>", into = "Vec<BoneMapping>")]
pub struct SkeletonMapping {
    mappings: Vec<BoneMapping>,
    by_target: HashMap<String, usize>,
}

impl From<Vec<BoneMapping>> for SkeletonMapping {
    fn from(mappings: Vec<BoneMapping>) -> Self {
        let mut result = Self::new();
        for mapping in mappings {
            result.insert(mapping);
        }
        result
    }
}

impl From<SkeletonMapping> for Vec<BoneMapping> {
    fn from(mapping: SkeletonMapping) -> Self {
        mapping.mappings
    }
}

impl SkeletonMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `target` to `source`, replacing any earlier mapping for `target`.
    pub fn map(&mut self, target: impl Into<String>, source: impl Into<String>) {
        self.insert(BoneMapping::new(target, source));
    }

    pub fn map_with_twist(
        &mut self,
        target: impl Into<String>,
        source: impl Into<String>,
        twist: UnitQuaternion<f32>,
    ) {
        self.insert(BoneMapping {
            twist,
            ..BoneMapping::new(target, source)
        });
    }

    fn insert(&mut self, mapping: BoneMapping) {
        match self.by_target.get(&mapping.target) {
            Some(&slot) => self.mappings[slot] = mapping,
            None => {
                self.by_target
                    .insert(mapping.target.clone(), self.mappings.len());
                self.mappings.push(mapping);
            }
        }
    }

    pub fn get(&self, target: &str) -> Option<&BoneMapping> {
        self.by_target.get(target).map(|&slot| &self.mappings[slot])
    }

    /// First mapping driven by `source`.
    pub fn get_for_source(&self, source: &str) -> Option<&BoneMapping> {
        self.mappings.iter().find(|mapping| mapping.source == source)
    }

    pub fn remove(&mut self, target: &str) -> Option<BoneMapping> {
        let slot = self.by_target.remove(target)?;
        let removed = self.mappings.remove(slot);
        for index in self.by_target.values_mut() {
            if *index > slot {
                *index -= 1;
            }
        }
        Some(removed)
    }

    /// Source-to-target table. When several targets share a source, the last
    /// one wins.
    pub fn inverse(&self) -> Self {
        let mut result = Self::new();
        for mapping in &self.mappings {
            result.insert(mapping.inverse());
        }
        result
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Mappings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &BoneMapping> {
        self.mappings.iter()
    }

    pub fn source_bones(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.mappings.len());
        for mapping in &self.mappings {
            if !names.contains(&mapping.source.as_str()) {
                names.push(&mapping.source);
            }
        }
        names
    }

    pub fn target_bones(&self) -> Vec<&str> {
        self.mappings.iter().map(|m| m.target.as_str()).collect()
    }

    /// Check every mapped name against the two skeletons.
    pub fn validate(&self, source: &Skeleton, target: &Skeleton) -> crate::Result<()> {
        for mapping in &self.mappings {
            if target.bone_index(&mapping.target).is_none() {
                return Err(AnimationError::UnknownBone {
                    name: mapping.target.clone(),
                    skeleton: "target".to_string(),
                });
            }
            if source.bone_index(&mapping.source).is_none() {
                return Err(AnimationError::UnknownBone {
                    name: mapping.source.clone(),
                    skeleton: "source".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_replaces_and_removes() {
        let mut mapping = SkeletonMapping::new();
        mapping.map("Hips", "pelvis");
        mapping.map("Spine", "spine_01");
        mapping.map("Hips", "root");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("Hips").unwrap().source, "root");
        assert_eq!(mapping.get_for_source("spine_01").unwrap().target, "Spine");

        let removed = mapping.remove("Hips").unwrap();
        assert_eq!(removed.source, "root");
        assert_eq!(mapping.target_bones(), vec!["Spine"]);
        assert_eq!(mapping.get("Spine").unwrap().source, "spine_01");
        assert!(mapping.remove("Hips").is_none());
    }

    #[test]
    fn test_inverse_inverts_twist() {
        let twist = UnitQuaternion::from_euler_angles(0.0f32, 0.3, 0.0);
        let mut mapping = SkeletonMapping::new();
        mapping.map_with_twist("Arm", "arm_l", twist);
        let inverse = mapping.inverse();
        let back = inverse.get("arm_l").unwrap();
        assert_eq!(back.source, "Arm");
        assert_eq!(back.twist, twist.inverse());
        assert_eq!(inverse.inverse(), mapping);
    }

    #[test]
    fn test_shared_source_listed_once() {
        let mut mapping = SkeletonMapping::new();
        mapping.map("LeftEye", "head");
        mapping.map("RightEye", "head");
        assert_eq!(mapping.source_bones(), vec!["head"]);
        assert_eq!(mapping.target_bones(), vec!["LeftEye", "RightEye"]);
    }

    #[test]
    fn test_serde_list_form() {
        let json = r#"[{"target":"Hips","source":"pelvis"}]"#;
        let mapping: SkeletonMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.get("Hips").unwrap().twist, UnitQuaternion::identity());
    }
}
