//! World-space bounding box

use glam::{Mat4, Vec3};
use rigport_shared::BoundingBox;

/// The 8 corners of the local axis-aligned box around `positions`
pub fn local_corners(positions: impl IntoIterator<Item = [f32; 3]>) -> Option<[Vec3; 8]> {
    let mut iter = positions.into_iter().map(Vec3::from_array);
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));

    Some([
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ])
}

/// Box around the local corners after transforming them by `world`.
///
/// `None` when there are no positions.
pub fn world_bounding_box(
    positions: impl IntoIterator<Item = [f32; 3]>,
    world: Mat4,
) -> Option<BoundingBox> {
    let corners = local_corners(positions)?.map(|c| world.transform_point3(c));
    let (min, max) = corners[1..]
        .iter()
        .fold((corners[0], corners[0]), |(min, max), &c| (min.min(c), max.max(c)));

    Some(BoundingBox {
        min_corner: min.to_array(),
        max_corner: max.to_array(),
    })
}
