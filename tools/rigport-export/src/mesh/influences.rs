//! Bone influence packing
//!
//! Vertex groups are matched to armature bones by name and re-indexed to
//! `JointIndex`. Groups that match no bone are dropped from every vertex.

use rigport_shared::{BoneInfluences, BonesPerVertex, JointIndex};
use std::collections::BTreeMap;

use crate::error::MeshError;
use crate::skeleton::Skeleton;
use crate::snapshot::VertexSnapshot;

/// Per-vertex influence count limit, set by the `u16` counts on the wire
pub(crate) const MAX_INFLUENCES: usize = u16::MAX as usize;

/// Resolve each vertex group index to a joint, `None` for groups without a bone
fn resolve_groups(vertex_groups: &[String], skeleton: &Skeleton) -> Vec<Option<JointIndex>> {
    vertex_groups
        .iter()
        .map(|name| skeleton.index_of(name))
        .collect()
}

/// Flatten per-vertex influences, keeping each vertex's group order.
///
/// Influences past `MAX_INFLUENCES` on a vertex are dropped. Returns the
/// influences plus one skip entry per unresolved group or overfull vertex.
pub(crate) fn pack_influences(
    vertices: &[VertexSnapshot],
    vertex_groups: &[String],
    skeleton: &Skeleton,
) -> (BoneInfluences, Vec<MeshError>) {
    let joints = resolve_groups(vertex_groups, skeleton);

    let mut counts = Vec::with_capacity(vertices.len());
    let mut bone_indices = Vec::new();
    let mut bone_weights = Vec::new();
    let mut dropped: BTreeMap<String, usize> = BTreeMap::new();
    let mut overfull = Vec::new();

    for (index, vertex) in vertices.iter().enumerate() {
        let mut kept = 0usize;
        let mut excess = 0usize;
        for &(group, weight) in &vertex.groups {
            match joints.get(group).copied().flatten() {
                Some(_) if kept == MAX_INFLUENCES => excess += 1,
                Some(joint) => {
                    bone_indices.push(joint);
                    bone_weights.push(weight);
                    kept += 1;
                }
                None => {
                    let name = vertex_groups
                        .get(group)
                        .cloned()
                        .unwrap_or_else(|| format!("#{group}"));
                    *dropped.entry(name).or_default() += 1;
                }
            }
        }
        counts.push(u16::try_from(kept).unwrap_or(u16::MAX));
        if excess > 0 {
            overfull.push((index, excess));
        }
    }

    let overfull = overfull.into_iter().map(|(vertex, excess)| {
        tracing::warn!(
            "Vertex {} has {} influences past the limit of {}, dropping them",
            vertex,
            excess,
            MAX_INFLUENCES
        );
        MeshError::TooManyInfluences {
            vertex,
            dropped: excess,
            max: MAX_INFLUENCES,
        }
    });

    let skipped = dropped
        .into_iter()
        .map(|(group, vertices)| {
            tracing::warn!(
                "Dropping vertex group '{}' ({} vertices): no matching bone",
                group,
                vertices
            );
            MeshError::UnresolvedVertexGroup { group, vertices }
        })
        .chain(overfull)
        .collect();

    (
        BoneInfluences {
            bones_per_vertex: BonesPerVertex::NonUniform(counts),
            bone_indices,
            bone_weights,
        },
        skipped,
    )
}
