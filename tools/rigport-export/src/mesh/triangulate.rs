//! Fan triangulation of packed faces
//!
//! Face `[v0, v1, .., vn]` becomes `[v0, v1, v2], [v0, v2, v3], ..`, so a quad
//! splits along its `v0`-`v2` diagonal. Faces with fewer than three loops are
//! dropped. Bone influences are per vertex and stay as they are.

use rigport_shared::MeshAttributes;

/// Old loop indices making up the new triangles, plus the source face of each
fn fan_loops(vertices_in_each_face: &[u32]) -> (Vec<usize>, Vec<usize>) {
    let mut loops = Vec::new();
    let mut faces = Vec::new();
    let mut start = 0;

    for (face, &count) in vertices_in_each_face.iter().enumerate() {
        let count = count as usize;
        for i in 1..count.saturating_sub(1) {
            loops.extend([start, start + i, start + i + 1]);
            faces.push(face);
        }
        start += count;
    }

    (loops, faces)
}

fn gather<T: Copy>(values: &[T], at: &[usize]) -> Vec<T> {
    at.iter().filter_map(|&i| values.get(i).copied()).collect()
}

/// Split every face of `attribs` into triangles
pub fn triangulate(attribs: &mut MeshAttributes) {
    let (loops, faces) = fan_loops(&attribs.vertices_in_each_face);

    attribs.positions.indices = gather(&attribs.positions.indices, &loops);
    attribs.normals.indices = gather(&attribs.normals.indices, &loops);
    if let Some(uvs) = &mut attribs.uvs {
        uvs.indices = gather(&uvs.indices, &loops);
    }
    attribs.material_index = gather(&attribs.material_index, &faces);
    attribs.vertices_in_each_face = vec![3; faces.len()];
}
