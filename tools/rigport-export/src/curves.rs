//! Curve sampler
//!
//! Rebuilds fully populated (location, rotation, scale) poses from sparse
//! per-channel animation samples. A channel with no sample at a frame carries
//! its last known value forward, starting from the rest defaults.

use rigport_shared::{Frame, JointIndex};
use std::collections::BTreeMap;

use crate::compose::{Rotation, RotationMode};
use crate::error::CurveError;
use crate::skeleton::Skeleton;
use crate::snapshot::FCurveSnapshot;

const DEFAULT_LOCATION: [f32; 3] = [0.0, 0.0, 0.0];
const DEFAULT_EULER: [f32; 3] = [0.0, 0.0, 0.0];
/// `[w, x, y, z]`
const DEFAULT_QUATERNION: [f32; 4] = [1.0, 0.0, 0.0, 0.0];
const DEFAULT_SCALE: [f32; 3] = [1.0, 1.0, 1.0];

/// Animatable pose-bone property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKind {
    Location,
    RotationEuler,
    /// Axis 0 is `w`
    RotationQuaternion,
    Scale,
}

impl PropertyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "location" => Some(PropertyKind::Location),
            "rotation_euler" => Some(PropertyKind::RotationEuler),
            "rotation_quaternion" => Some(PropertyKind::RotationQuaternion),
            "scale" => Some(PropertyKind::Scale),
            _ => None,
        }
    }

    /// Number of axes
    pub fn arity(self) -> u32 {
        match self {
            PropertyKind::RotationQuaternion => 4,
            _ => 3,
        }
    }
}

/// One keyframe value of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub bone: String,
    pub property: String,
    pub axis: u32,
    pub frame: Frame,
    pub value: f32,
}

/// Reconstructed local pose of one bone at one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub frame: Frame,
    pub location: [f32; 3],
    pub rotation: Rotation,
    pub scale: [f32; 3],
}

/// Output of [`sample_curves`]
#[derive(Debug, Clone, Default)]
pub struct SampledCurves {
    /// Ascending, duplicate-free poses per bone. Bones without samples are absent.
    pub poses: BTreeMap<JointIndex, Vec<BonePose>>,
    /// Samples that were skipped, one entry per distinct problem
    pub skipped: Vec<CurveError>,
}

impl SampledCurves {
    /// Every frame at which some bone has a pose
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        self.poses.values().flatten().map(|pose| pose.frame)
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Channel values observed at one frame for one bone
#[derive(Debug, Clone, Copy, Default)]
struct FrameSamples {
    location: [Option<f32>; 3],
    euler: [Option<f32>; 3],
    quaternion: [Option<f32>; 4],
    scale: [Option<f32>; 3],
}

impl FrameSamples {
    fn set(&mut self, property: PropertyKind, axis: usize, value: f32) {
        let slot = match property {
            PropertyKind::Location => &mut self.location[axis],
            PropertyKind::RotationEuler => &mut self.euler[axis],
            PropertyKind::RotationQuaternion => &mut self.quaternion[axis],
            PropertyKind::Scale => &mut self.scale[axis],
        };
        *slot = Some(value);
    }
}

/// Overwrite running values with whatever was sampled this frame
fn carry<const N: usize>(running: &mut [f32; N], sampled: &[Option<f32>; N]) {
    for (value, sample) in running.iter_mut().zip(sampled) {
        if let Some(v) = sample {
            *value = *v;
        }
    }
}

fn record(skipped: &mut Vec<CurveError>, err: CurveError) {
    if !skipped.contains(&err) {
        tracing::debug!("Skipping animation channel: {}", err);
        skipped.push(err);
    }
}

/// Split `pose.bones["<bone>"].<property>` into bone name and property
pub fn parse_data_path(data_path: &str) -> Option<(String, &str)> {
    let rest = data_path.strip_prefix("pose.bones[\"")?;
    let (bone, property) = rest.rsplit_once("\"].")?;
    if bone.is_empty() || property.is_empty() {
        return None;
    }
    Some((bone.replace("\\\"", "\"").replace("\\\\", "\\"), property))
}

/// Flatten f-curves into raw samples.
///
/// Keyframe frames are rounded up to whole frames. Curves that do not target a
/// pose bone and keyframes with non-finite frames are skipped.
pub fn flatten_fcurves(fcurves: &[FCurveSnapshot]) -> (Vec<RawSample>, Vec<CurveError>) {
    let mut samples = Vec::new();
    let mut skipped = Vec::new();

    for fcurve in fcurves {
        let Some((bone, property)) = parse_data_path(&fcurve.data_path) else {
            record(
                &mut skipped,
                CurveError::UnrecognizedDataPath {
                    data_path: fcurve.data_path.clone(),
                },
            );
            continue;
        };

        for &[frame, value] in &fcurve.keyframe_points {
            if !frame.is_finite() {
                record(
                    &mut skipped,
                    CurveError::InvalidKeyframe {
                        bone: bone.clone(),
                        property: property.to_string(),
                    },
                );
                continue;
            }
            samples.push(RawSample {
                bone: bone.clone(),
                property: property.to_string(),
                axis: fcurve.array_index,
                frame: frame.ceil() as Frame,
                value,
            });
        }
    }

    (samples, skipped)
}

/// Reconstruct per-bone poses from raw samples.
///
/// Only frames at which a bone has at least one recognized sample are emitted
/// for that bone. Rotation samples of the representation a bone does not use
/// still mark the frame, but their values are ignored. When the same
/// (bone, property, axis, frame) appears twice, the later sample wins.
pub fn sample_curves(samples: &[RawSample], skeleton: &Skeleton) -> SampledCurves {
    let mut by_bone: BTreeMap<JointIndex, BTreeMap<Frame, FrameSamples>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for sample in samples {
        let Some(joint) = skeleton.index_of(&sample.bone) else {
            record(
                &mut skipped,
                CurveError::UnknownBone {
                    bone: sample.bone.clone(),
                },
            );
            continue;
        };

        let property = match PropertyKind::from_name(&sample.property) {
            Some(kind) if sample.axis < kind.arity() => kind,
            _ => {
                record(
                    &mut skipped,
                    CurveError::UnsupportedProperty {
                        bone: sample.bone.clone(),
                        property: sample.property.clone(),
                        axis: sample.axis,
                    },
                );
                continue;
            }
        };

        by_bone
            .entry(joint)
            .or_default()
            .entry(sample.frame)
            .or_default()
            .set(property, sample.axis as usize, sample.value);
    }

    let poses = by_bone
        .into_iter()
        .map(|(joint, frames)| (joint, fill_forward(&frames, skeleton.rotation_mode(joint))))
        .collect();

    SampledCurves { poses, skipped }
}

/// Carry-forward fill over one bone's frames, in ascending order
fn fill_forward(frames: &BTreeMap<Frame, FrameSamples>, mode: RotationMode) -> Vec<BonePose> {
    let mut location = DEFAULT_LOCATION;
    let mut euler = DEFAULT_EULER;
    let mut quaternion = DEFAULT_QUATERNION;
    let mut scale = DEFAULT_SCALE;

    frames
        .iter()
        .map(|(&frame, sampled)| {
            carry(&mut location, &sampled.location);
            carry(&mut scale, &sampled.scale);
            let rotation = match mode {
                RotationMode::Quaternion => {
                    carry(&mut quaternion, &sampled.quaternion);
                    Rotation::Quaternion(quaternion)
                }
                RotationMode::Euler(order) => {
                    carry(&mut euler, &sampled.euler);
                    Rotation::Euler(euler, order)
                }
            };
            BonePose {
                frame,
                location,
                rotation,
                scale,
            }
        })
        .collect()
}
