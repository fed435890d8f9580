use std::collections::HashSet;

use glam::{Vec2, Vec3A};

use crate::scene::{Corner, Mesh, MAX_TEXTURE_CHANNELS};

use super::ExportOptions;

/// A triangle resolved against the mesh's vertex-index space, carrying the
/// per-corner UV pool references of the polygon it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Indices into the mesh `positions` array.
    pub indices: [usize; 3],
    /// Per-corner, per-channel indices into the raw UV pools.
    pub uvs: [[Option<usize>; MAX_TEXTURE_CHANNELS]; 3],
}

/// The result of triangulating a mesh. Invariant:
/// `attempted == triangles.len() + rejected`.
#[derive(Debug, Default, PartialEq)]
pub struct Triangulation {
    pub triangles: Vec<Triangle>,
    pub attempted: usize,
    pub rejected: usize,
}

/// Fan-triangulates every polygon of the mesh and resolves each corner
/// against the vertex-index space.
///
/// Triangulation is deterministic: each polygon fans out from its first
/// corner, so repeated invocations on identical input produce identical
/// output. A triangle whose corners cannot all be resolved is dropped whole
/// and counted; partial triangles are never emitted.
///
/// When `backface_culling` is set, the 2nd and 3rd corner of every emitted
/// triangle are swapped to reverse the winding order. The UV references move
/// with their corners.
pub fn triangulate(mesh: &Mesh, backface_culling: bool) -> Triangulation {
    let mut result = Triangulation::default();

    for polygon in &mesh.polygons {
        if polygon.corners.len() < 3 {
            log::warn!(
                "Mesh \"{}\" contains a degenerate polygon with {} corners",
                mesh.name,
                polygon.corners.len()
            );
            continue;
        }

        for i in 1..polygon.corners.len() - 1 {
            result.attempted += 1;

            let corners = [
                polygon.corners[0],
                polygon.corners[i],
                polygon.corners[i + 1],
            ];
            match resolve(&corners, mesh.positions.len()) {
                Some(mut triangle) => {
                    if backface_culling {
                        triangle.indices.swap(1, 2);
                        triangle.uvs.swap(1, 2);
                    }
                    result.triangles.push(triangle);
                }
                None => result.rejected += 1,
            }
        }
    }

    result
}

/// Resolves a triangle's corners against the vertex-index space. Fails when
/// any corner references a vertex outside it.
fn resolve(corners: &[Corner; 3], num_vertices: usize) -> Option<Triangle> {
    let mut indices = [0; 3];
    let mut uvs = [[None; MAX_TEXTURE_CHANNELS]; 3];

    for (slot, corner) in corners.iter().enumerate() {
        if corner.position >= num_vertices {
            return None;
        }
        indices[slot] = corner.position;
        uvs[slot] = corner.uv;
    }

    Some(Triangle { indices, uvs })
}

/// Builds the per-vertex UV output arrays, one per channel present, each the
/// same length as the vertex-index space.
///
/// Entries default to the `(-1, -1)` sentinel; each resolved triangle writes
/// its corners' UV pairs at the corresponding vertex indices, flipping V for
/// the texture origin convention. A vertex never touched by a resolved
/// triangle keeps the sentinel.
pub fn uv_channels(mesh: &Mesh, triangulation: &Triangulation) -> Vec<Vec<Vec2>> {
    if mesh.uv_channels.is_empty() || mesh.uv_channels[0].is_empty() {
        return Vec::new();
    }

    let count = mesh.uv_channels.len().min(MAX_TEXTURE_CHANNELS);
    let mut channels = Vec::with_capacity(count);

    for (channel, pool) in mesh.uv_channels.iter().enumerate().take(count) {
        let mut out = vec![Vec2::new(-1., -1.); mesh.positions.len()];

        for triangle in &triangulation.triangles {
            for slot in 0..3 {
                if let Some(uv_index) = triangle.uvs[slot][channel] {
                    if let Some(uv) = pool.get(uv_index) {
                        out[triangle.indices[slot]] = Vec2::new(uv.x, 1. - uv.y);
                    }
                }
            }
        }

        channels.push(out);
    }

    channels
}

/// Which vertices of a triangle must fall inside an influence's affected set
/// for the triangle to join that influence's vertex group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// A single affected vertex is enough.
    Any,
    /// All three vertices must be affected.
    All,
}

impl Default for Membership {
    fn default() -> Self {
        Membership::Any
    }
}

/// A named vertex group: the subset of resolved triangles affected by one
/// skinning influence.
#[derive(Debug, PartialEq)]
pub struct VertexGroup {
    pub name: String,
    pub triangles: Vec<[usize; 3]>,
}

/// Maps each skinning influence to the triangles it affects.
///
/// A mesh without influences yields a single synthetic group covering every
/// resolved triangle, named `null` (or `blendShape` in blend-shape mode).
pub fn vertex_groups(
    mesh: &Mesh,
    triangulation: &Triangulation,
    membership: Membership,
    blend_shapes: bool,
) -> Vec<VertexGroup> {
    if mesh.influences.is_empty() {
        let name = if blend_shapes { "blendShape" } else { "null" };
        return vec![VertexGroup {
            name: name.into(),
            triangles: triangulation
                .triangles
                .iter()
                .map(|triangle| triangle.indices)
                .collect(),
        }];
    }

    mesh.influences
        .iter()
        .map(|influence| {
            let affected: HashSet<usize> = influence.vertices.iter().copied().collect();
            let triangles = triangulation
                .triangles
                .iter()
                .filter(|triangle| match membership {
                    Membership::Any => triangle.indices.iter().any(|i| affected.contains(i)),
                    Membership::All => triangle.indices.iter().all(|i| affected.contains(i)),
                })
                .map(|triangle| triangle.indices)
                .collect();

            VertexGroup {
                name: influence.name.clone(),
                triangles,
            }
        })
        .collect()
}

/// A vertex-position snapshot at one point in time.
#[derive(Debug, PartialEq)]
pub struct Frame {
    pub time: f64,
    pub points: Vec<Vec3A>,
}

/// Samples the mesh's keyframe animation track.
///
/// With key times present, each unique time (by exact value, arrival order
/// preserved) is sampled from the animation snapshots; times without a
/// snapshot are skipped silently, leaving partial output. Without key times,
/// a nonzero frame rate steps the playback range instead, unless blend-shape
/// mode suppresses the fallback. A mesh carrying no animation source
/// snapshots its static positions at each step.
pub fn sample_frames(mesh: &Mesh, options: &ExportOptions) -> Vec<Frame> {
    let mut frames = Vec::new();

    if mesh.has_keyframes() {
        let mut seen: Vec<f64> = Vec::new();
        let key_times = mesh
            .animation
            .as_ref()
            .map(|animation| animation.key_times.as_slice())
            .unwrap_or_default();

        for &time in key_times {
            if seen.iter().any(|&previous| previous == time) {
                continue;
            }
            seen.push(time);

            if let Some(points) = sample_at(mesh, time) {
                frames.push(Frame { time, points });
            }
        }
    } else if options.frame_rate > 0 && !options.blend_shapes {
        let (start, end) = options.playback;
        let mut time = start;
        while time <= end {
            if let Some(points) = sample_at(mesh, time) {
                frames.push(Frame { time, points });
            }
            time += options.frame_rate as f64;
        }
    }

    frames
}

fn sample_at(mesh: &Mesh, time: f64) -> Option<Vec<Vec3A>> {
    match &mesh.animation {
        Some(animation) => animation.sample(time).map(<[Vec3A]>::to_vec),
        None => Some(mesh.positions.clone()),
    }
}
