//! Action conversion (f-curves -> bone-space keyframes)
//!
//! Samples each action's curves, composes every reconstructed pose into a
//! local matrix, and collects the results keyed by `JointIndex`. Actions are
//! converted in parallel against the shared skeleton.

use hashbrown::HashSet;
use rayon::prelude::*;
use rigport_shared::{Bone, BoneKeyframe, BoneKeyframes, BoneSpaceAction, Frame};
use std::collections::BTreeMap;

use crate::compose::{compose, to_row_major};
use crate::curves::{SampledCurves, flatten_fcurves, sample_curves};
use crate::error::CurveError;
use crate::skeleton::Skeleton;
use crate::snapshot::ActionSnapshot;

/// Result of converting one action
#[derive(Debug, Clone)]
pub struct ConvertedAction {
    pub name: String,
    /// `None` when no bone had a usable sample
    pub action: Option<BoneSpaceAction>,
    /// Channels that were skipped
    pub skipped: Vec<CurveError>,
}

/// Result of converting every action of an armature
#[derive(Debug, Clone, Default)]
pub struct ConvertedActions {
    pub actions: BTreeMap<String, BoneSpaceAction>,
    /// Skipped channels per action, only for actions that skipped something
    pub skipped: BTreeMap<String, Vec<CurveError>>,
    /// Actions left out because they had no keyframes
    pub empty: Vec<String>,
}

/// Declared frame range, rounded up to whole frames
fn declared_range(action: &ActionSnapshot) -> Result<Option<(Frame, Frame)>, CurveError> {
    let Some([start, end]) = action.frame_range else {
        return Ok(None);
    };
    let (start, end) = (start.ceil() as Frame, end.ceil() as Frame);
    if start > end {
        return Err(CurveError::InvalidFrameRange {
            action: action.name.clone(),
            start,
            end,
        });
    }
    Ok(Some((start, end)))
}

fn derived_range(sampled: &SampledCurves) -> Option<(Frame, Frame)> {
    let min = sampled.frames().min()?;
    let max = sampled.frames().max()?;
    Some((min, max))
}

/// Convert one action into bone-space keyframes
pub fn convert_action(
    action: &ActionSnapshot,
    skeleton: &Skeleton,
) -> Result<ConvertedAction, CurveError> {
    let declared = declared_range(action)?;

    let (samples, mut skipped) = flatten_fcurves(&action.fcurves);
    let sampled = sample_curves(&samples, skeleton);
    skipped.extend(sampled.skipped.iter().cloned());

    let Some(derived) = derived_range(&sampled) else {
        return Ok(ConvertedAction {
            name: action.name.clone(),
            action: None,
            skipped,
        });
    };

    let keyframes = sampled
        .poses
        .iter()
        .map(|(&joint, poses)| {
            let keyframes = poses
                .iter()
                .map(|pose| BoneKeyframe {
                    frame: pose.frame,
                    bone: Bone::Matrix(to_row_major(compose(
                        pose.location,
                        pose.rotation,
                        pose.scale,
                    ))),
                })
                .collect();
            (joint, keyframes)
        })
        .collect();

    Ok(ConvertedAction {
        name: action.name.clone(),
        action: Some(BoneSpaceAction {
            bone_keyframes: BoneKeyframes {
                frame_range_inclusive: declared.unwrap_or(derived),
                keyframes,
            },
            pose_markers: action.pose_markers.clone(),
        }),
        skipped,
    })
}

/// Convert every action of an armature.
///
/// Action names must be unique. Actions without keyframes are left out.
pub fn convert_actions(
    actions: &[ActionSnapshot],
    skeleton: &Skeleton,
) -> Result<ConvertedActions, CurveError> {
    let mut seen = HashSet::new();
    for action in actions {
        if !seen.insert(action.name.as_str()) {
            return Err(CurveError::DuplicateAction {
                action: action.name.clone(),
            });
        }
    }

    let converted: Result<Vec<_>, CurveError> = actions
        .par_iter()
        .map(|action| convert_action(action, skeleton))
        .collect();

    let mut result = ConvertedActions::default();
    for action in converted? {
        if !action.skipped.is_empty() {
            tracing::debug!(
                "Action '{}': skipped {} channel(s)",
                action.name,
                action.skipped.len()
            );
            result.skipped.insert(action.name.clone(), action.skipped);
        }
        match action.action {
            Some(data) => {
                result.actions.insert(action.name, data);
            }
            None => {
                tracing::warn!("Action '{}' has no keyframes, skipping", action.name);
                result.empty.push(action.name);
            }
        }
    }

    Ok(result)
}
