//! CPU ray picking
//!
//! Casts the crosshair ray against the world-space bounds of every mesh under
//! each candidate root. Hits are resolved to the root's logical owner (a
//! visitor or a point of interest), filtered by distance and ranked nearest
//! first.
//!
//! ## Priority
//!
//! Candidate groups are tested in order. The first group with any hit inside
//! the distance limit wins and later groups are not considered for that
//! click, so visitors standing in front of artwork always take the pick.

use crate::scene::{Aabb, PoiId, SceneNode, VisitorId};
use glam::{Mat4, Vec3};

// ========================================================================
// Ray
// ========================================================================

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first point inside `aabb` (slab test).
    /// A ray starting inside the box hits at distance zero.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
            if dir.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

// ========================================================================
// Candidates and hits
// ========================================================================

/// Logical owner a leaf mesh resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickTarget {
    Visitor(VisitorId),
    Poi(PoiId),
}

/// A top-level pickable object: its owner, world placement and node tree.
#[derive(Debug, Clone, Copy)]
pub struct PickCandidate<'a> {
    pub owner: PickTarget,
    pub world: Mat4,
    pub root: &'a SceneNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub owner: PickTarget,
    pub mesh: String,
    pub distance: f32,
    pub point: Vec3,
}

/// Ranked hits for one click. Empty when nothing is in reach.
pub fn pick(ray: &Ray, groups: &[&[PickCandidate<'_>]], max_distance: f32) -> Vec<PickHit> {
    for group in groups {
        let hits = intersect_candidates(ray, group, max_distance);
        if !hits.is_empty() {
            return hits;
        }
    }
    Vec::new()
}

/// All mesh hits under `candidates` within `max_distance`, nearest first.
pub fn intersect_candidates(
    ray: &Ray,
    candidates: &[PickCandidate<'_>],
    max_distance: f32,
) -> Vec<PickHit> {
    let mut hits = Vec::new();
    for candidate in candidates {
        candidate.root.visit_meshes(candidate.world, &mut |mesh, world| {
            let bounds = mesh.bounds.transformed(world);
            if let Some(distance) = ray.intersect_aabb(&bounds) {
                if distance <= max_distance {
                    hits.push(PickHit {
                        owner: candidate.owner,
                        mesh: mesh.name.clone(),
                        distance,
                        point: ray.at(distance),
                    });
                }
            }
        });
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

// ========================================================================
// Tests
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GroupNode, MeshNode, NodeTransform};

    fn cube(name: &str) -> SceneNode {
        SceneNode::Mesh(MeshNode {
            name: name.to_string(),
            local: NodeTransform::default(),
            bounds: Aabb::from_center_size(Vec3::ZERO, Vec3::ONE),
        })
    }

    fn framed(name: &str) -> SceneNode {
        SceneNode::Group(GroupNode {
            name: name.to_string(),
            local: NodeTransform::default(),
            children: vec![cube("frame"), cube("canvas")],
        })
    }

    fn candidate(owner: PickTarget, at: Vec3, root: &SceneNode) -> PickCandidate<'_> {
        PickCandidate {
            owner,
            world: Mat4::from_translation(at),
            root,
        }
    }

    fn looking_down_negative_z() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn slab_test_reports_entry_distance() {
        let ray = looking_down_negative_z();
        let aabb = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(ray.intersect_aabb(&aabb), Some(9.0));

        let miss = Aabb::from_center_size(Vec3::new(5.0, 0.0, 0.0), Vec3::ONE);
        assert_eq!(ray.intersect_aabb(&miss), None);

        let behind = Aabb::from_center_size(Vec3::new(0.0, 0.0, 20.0), Vec3::ONE);
        assert_eq!(ray.intersect_aabb(&behind), None);
    }

    #[test]
    fn hits_sorted_and_filtered_by_distance() {
        let near = cube("near");
        let far = cube("far");
        let out_of_reach = cube("out");
        let candidates = [
            candidate(PickTarget::Poi(2), Vec3::new(0.0, 0.0, 4.0), &far),
            candidate(PickTarget::Poi(1), Vec3::new(0.0, 0.0, 7.0), &near),
            candidate(PickTarget::Poi(3), Vec3::new(0.0, 0.0, -5.0), &out_of_reach),
        ];

        let hits = pick(&looking_down_negative_z(), &[&candidates], 7.0);
        let owners: Vec<PickTarget> = hits.iter().map(|hit| hit.owner).collect();
        assert_eq!(owners, vec![PickTarget::Poi(1), PickTarget::Poi(2)]);
        assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    }

    #[test]
    fn leaf_meshes_resolve_to_top_level_owner() {
        let artwork = framed("artwork");
        let candidates = [candidate(PickTarget::Poi(11), Vec3::ZERO, &artwork)];
        let hits = pick(&looking_down_negative_z(), &[&candidates], 20.0);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.owner == PickTarget::Poi(11)));
    }

    #[test]
    fn visitors_take_priority_over_points_of_interest() {
        let body = cube("body");
        let artwork = framed("artwork");
        // Artwork is nearer than the visitor; visitors still win.
        let visitors = [candidate(PickTarget::Visitor(1), Vec3::new(0.0, 0.0, 5.0), &body)];
        let pois = [candidate(PickTarget::Poi(3), Vec3::new(0.0, 0.0, 8.0), &artwork)];

        let hits = pick(&looking_down_negative_z(), &[&visitors, &pois], 7.0);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|hit| matches!(hit.owner, PickTarget::Visitor(1))));
    }

    #[test]
    fn visitor_out_of_reach_falls_through_to_artwork() {
        let body = cube("body");
        let artwork = framed("artwork");
        let visitors = [candidate(PickTarget::Visitor(1), Vec3::new(0.0, 0.0, -8.0), &body)];
        let pois = [candidate(PickTarget::Poi(3), Vec3::new(0.0, 0.0, 6.0), &artwork)];

        let hits = pick(&looking_down_negative_z(), &[&visitors, &pois], 7.0);
        assert_eq!(hits[0].owner, PickTarget::Poi(3));
    }
}
