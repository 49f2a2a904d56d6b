//! Skeleton topology: named bones with parent links and bind transforms.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::track::BoneIndex;
use crate::transform::Transform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// `None` for root bones.
    #[serde(default)]
    pub parent: Option<BoneIndex>,
    /// Bind (rest) transform relative to the parent.
    #[serde(default)]
    pub bind: Transform,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<BoneIndex>, bind: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            bind,
        }
    }
}

/// An ordered forest of bones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SkeletonData", into = "SkeletonData")]
pub struct Skeleton {
    bones: Vec<Bone>,
    by_name: HashMap<String, BoneIndex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SkeletonData {
    bones: Vec<Bone>,
}

impl TryFrom<SkeletonData> for Skeleton {
    type Error = AnimationError;

    fn try_from(data: SkeletonData) -> Result<Self, Self::Error> {
        Skeleton::new(data.bones)
    }
}

impl From<Skeleton> for SkeletonData {
    fn from(skeleton: Skeleton) -> Self {
        Self {
            bones: skeleton.bones,
        }
    }
}

impl Skeleton {
    /// Validates unique names, in-range parents and the absence of cycles.
    pub fn new(bones: Vec<Bone>) -> crate::Result<Self> {
        let count = bones.len();
        let mut by_name = HashMap::with_capacity(count);
        for (index, bone) in bones.iter().enumerate() {
            if by_name.insert(bone.name.clone(), index).is_some() {
                return Err(AnimationError::InvalidSkeleton {
                    reason: format!("duplicate bone name '{}'", bone.name),
                });
            }
            if let Some(parent) = bone.parent {
                if parent >= count || parent == index {
                    return Err(AnimationError::InvalidSkeleton {
                        reason: format!("bone '{}' has invalid parent {parent}", bone.name),
                    });
                }
            }
        }

        for (index, bone) in bones.iter().enumerate() {
            let mut cursor = bone.parent;
            let mut steps = 0;
            while let Some(parent) = cursor {
                steps += 1;
                if steps > count {
                    return Err(AnimationError::InvalidSkeleton {
                        reason: format!("bone '{}' (index {index}) is part of a cycle", bone.name),
                    });
                }
                cursor = bones[parent].parent;
            }
        }

        Ok(Self { bones, by_name })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: BoneIndex) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_index(&self, name: &str) -> Option<BoneIndex> {
        self.by_name.get(name).copied()
    }

    pub fn parent(&self, index: BoneIndex) -> Option<BoneIndex> {
        self.bones.get(index).and_then(|bone| bone.parent)
    }

    pub fn roots(&self) -> Vec<BoneIndex> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn children(&self, index: BoneIndex) -> Vec<BoneIndex> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent == Some(index))
            .map(|(child, _)| child)
            .collect()
    }

    /// Depth-first order with every parent before its children.
    pub fn pre_order(&self) -> Vec<BoneIndex> {
        let mut children: Vec<Vec<BoneIndex>> = vec![Vec::new(); self.bones.len()];
        for (index, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                children[parent].push(index);
            }
        }

        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<BoneIndex> = self.roots().into_iter().rev().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(children[index].iter().rev());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, parent: Option<BoneIndex>) -> Bone {
        Bone::new(name, parent, Transform::identity())
    }

    #[test]
    fn test_pre_order_visits_parents_first() {
        let skeleton = Skeleton::new(vec![
            bone("spine", Some(2)),
            bone("head", Some(0)),
            bone("hips", None),
            bone("leg", Some(2)),
        ])
        .unwrap();
        assert_eq!(skeleton.roots(), vec![2]);
        assert_eq!(skeleton.children(2), vec![0, 3]);
        assert_eq!(skeleton.pre_order(), vec![2, 0, 1, 3]);
        assert_eq!(skeleton.bone_index("head"), Some(1));
        assert_eq!(skeleton.parent(1), Some(0));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Skeleton::new(vec![bone("a", None), bone("a", None)]),
            Err(AnimationError::InvalidSkeleton { .. })
        ));
        assert!(Skeleton::new(vec![bone("a", Some(5))]).is_err());
        assert!(Skeleton::new(vec![bone("a", Some(1)), bone("b", Some(0))]).is_err());
    }

    #[test]
    fn test_deserialize_runs_validation() {
        let json = r#"{"bones":[{"name":"root"},{"name":"tip","parent":0}]}"#;
        let skeleton: Skeleton = serde_json::from_str(json).unwrap();
        assert_eq!(skeleton.len(), 2);
        let cyclic = r#"{"bones":[{"name":"a","parent":1},{"name":"b","parent":0}]}"#;
        assert!(serde_json::from_str::<Skeleton>(cyclic).is_err());
    }
}
