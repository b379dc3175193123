//! Wireframe outlines of the scene, projected for the overlay painter.

use crate::scene::{Aabb, SceneNode};
use glam::{Mat4, Vec2, Vec3};

/// Corners closer than this (in clip-space w) are treated as behind the eye.
const MIN_DEPTH: f32 = 0.05;
/// Light intensity drawn at full strength.
const FULL_GLOW_INTENSITY: f32 = 2500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineKind {
    Artwork,
    Visitor,
    /// The visitor currently in conversation.
    Speaker,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub at: Vec2,
    /// 0..=1, from the light's intensity.
    pub strength: f32,
}

/// Projected box edges and light positions in normalized device
/// coordinates (y up).
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub kind: OutlineKind,
    pub edges: Vec<[Vec2; 2]>,
    pub glows: Vec<Glow>,
}

/// Projects every mesh under `root` as a box outline and every light as a
/// glow. Boxes that reach behind the camera are left out rather than clipped.
pub fn outline_node(
    view_projection: Mat4,
    world: Mat4,
    root: &SceneNode,
    kind: OutlineKind,
) -> Option<Outline> {
    let mut edges = Vec::new();
    root.visit_meshes(world, &mut |mesh, matrix| {
        if let Some(box_edges) = project_box(view_projection * matrix, &mesh.bounds) {
            edges.extend(box_edges);
        }
    });
    let mut glows = Vec::new();
    root.visit_lights(world, &mut |light, matrix| {
        let clip = view_projection * matrix.w_axis;
        if clip.w >= MIN_DEPTH {
            glows.push(Glow {
                at: Vec2::new(clip.x / clip.w, clip.y / clip.w),
                strength: (light.intensity / FULL_GLOW_INTENSITY).clamp(0.1, 1.0),
            });
        }
    });

    if edges.is_empty() && glows.is_empty() {
        None
    } else {
        Some(Outline { kind, edges, glows })
    }
}

fn project_box(clip_from_local: Mat4, bounds: &Aabb) -> Option<Vec<[Vec2; 2]>> {
    let mut corners = [Vec2::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let local = Vec3::new(
            if i & 1 == 0 { bounds.min.x } else { bounds.max.x },
            if i & 2 == 0 { bounds.min.y } else { bounds.max.y },
            if i & 4 == 0 { bounds.min.z } else { bounds.max.z },
        );
        let clip = clip_from_local * local.extend(1.0);
        if clip.w < MIN_DEPTH {
            return None;
        }
        *corner = Vec2::new(clip.x / clip.w, clip.y / clip.w);
    }

    // Twelve edges: corner pairs differing in exactly one axis bit.
    let mut edges = Vec::with_capacity(12);
    for i in 0..8 {
        for bit in [1, 2, 4] {
            if i & bit == 0 {
                edges.push([corners[i], corners[i | bit]]);
            }
        }
    }
    Some(edges)
}

/// Maps a normalized device coordinate onto a viewport of `size` with the
/// origin at the top left.
pub fn ndc_to_viewport(ndc: Vec2, size: Vec2) -> Vec2 {
    Vec2::new((ndc.x + 1.0) * 0.5 * size.x, (1.0 - ndc.y) * 0.5 * size.y)
}
