use serde::Serialize;

/// A single decoded keypoint in original-frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Heatmap value at the located peak.
    pub score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Ordered keypoints, one per heatmap channel.
///
/// Index `i` always corresponds to model channel `i`. No joint semantics are
/// attached here; see [`CocoJoint`] for the conventional 17-channel layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeypointSet {
    points: Box<[Keypoint]>,
}

impl KeypointSet {
    pub(crate) fn from_vec(points: Vec<Keypoint>) -> Self {
        Self {
            points: points.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, channel: usize) -> Option<&Keypoint> {
        self.points.get(channel)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keypoint> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Keypoint] {
        &self.points
    }

    /// `[x, y]` pairs in channel order.
    pub fn positions(&self) -> Vec<[f32; 2]> {
        self.points.iter().map(Keypoint::position).collect()
    }

    /// Look up a joint by its COCO label. Only meaningful for 17-channel models.
    pub fn joint(&self, joint: CocoJoint) -> Option<&Keypoint> {
        if self.points.len() != CocoJoint::COUNT {
            return None;
        }
        self.points.get(joint as usize)
    }
}

impl<'a> IntoIterator for &'a KeypointSet {
    type Item = &'a Keypoint;
    type IntoIter = std::slice::Iter<'a, Keypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// COCO keypoint order used by HRNet and most top-down pose models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CocoJoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl CocoJoint {
    pub const COUNT: usize = 17;

    pub const ALL: [CocoJoint; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_indices_round_trip() {
        for (i, joint) in CocoJoint::ALL.iter().enumerate() {
            assert_eq!(*joint as usize, i);
            assert_eq!(CocoJoint::from_index(i), Some(*joint));
        }
        assert_eq!(CocoJoint::from_index(CocoJoint::COUNT), None);
    }

    #[test]
    fn joint_lookup_requires_coco_layout() {
        let short = KeypointSet::from_vec(vec![Keypoint::new(1.0, 2.0, 0.5)]);
        assert!(short.joint(CocoJoint::Nose).is_none());

        let full = KeypointSet::from_vec(
            (0..CocoJoint::COUNT)
                .map(|i| Keypoint::new(i as f32, 0.0, 1.0))
                .collect(),
        );
        assert_eq!(full.joint(CocoJoint::LeftKnee).map(|k| k.x), Some(13.0));
    }

    #[test]
    fn serializes_as_plain_array() {
        let set = KeypointSet::from_vec(vec![Keypoint::new(4.0, 2.0, 0.9)]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["x"], 4.0);
        assert_eq!(json[0]["y"], 2.0);
    }
}
