pub mod node;
pub mod serialization;

pub use node::{Aabb, GroupNode, LightNode, MeshNode, NodeTransform, SceneNode};

use glam::{Mat4, Quat, Vec3};
use std::collections::BTreeMap;

pub type PoiId = u32;
pub type VisitorId = u32;

/// Framed artwork as described by the layout file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArtworkSpec {
    pub id: PoiId,
    pub image_url: String,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
    #[serde(default = "default_artwork_height")]
    pub height: f32,
    /// Width over height of the image.
    #[serde(default = "default_aspect")]
    pub aspect: f32,
    #[serde(default = "default_frame_depth")]
    pub frame_depth: f32,
}

/// Visitor model and placement as described by the layout file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisitorSpec {
    pub id: VisitorId,
    pub name: String,
    pub model: String,
    /// Body bounds in world units after scaling.
    pub size: [f32; 3],
    #[serde(default)]
    pub floor_offset: f32,
    /// Fixed spawn point; a random one inside the spawn spread otherwise.
    #[serde(default)]
    pub spawn: Option<[f32; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GalleryLayout {
    #[serde(default)]
    pub artworks: Vec<ArtworkSpec>,
    #[serde(default)]
    pub visitors: Vec<VisitorSpec>,
}

fn default_artwork_height() -> f32 {
    1.5
}

fn default_aspect() -> f32 {
    1.0
}

fn default_frame_depth() -> f32 {
    0.05
}

/// World placement of a top-level scene object. Rotation is about +Y only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub yaw: f32,
}

impl Transform {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_y(self.yaw), self.position)
    }

    /// Unit vector the object's front (+Z) points along.
    pub fn facing(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::Z
    }
}

/// Yaw that turns an object at `from` to face `to`, ignoring height.
pub fn yaw_towards(from: Vec3, to: Vec3) -> f32 {
    let delta = to - from;
    delta.x.atan2(delta.z)
}

/// `to` shifted by whole turns so that it lies within half a turn of `from`.
pub fn nearest_angle(from: f32, to: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    from + (to - from + PI).rem_euclid(TAU) - PI
}

#[derive(Debug, Clone)]
pub struct PointOfInterest {
    pub id: PoiId,
    pub transform: Transform,
    pub image_ref: String,
    pub node: SceneNode,
}

/// Points of interest that have finished loading. Never shrinks during a
/// session.
#[derive(Debug, Default)]
pub struct PoiRegistry {
    pois: BTreeMap<PoiId, PointOfInterest>,
}

impl PoiRegistry {
    pub fn new() -> Self {
        Self {
            pois: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, poi: PointOfInterest) {
        if self.pois.insert(poi.id, poi).is_some() {
            log::warn!("Point of interest registered twice; keeping the latest");
        }
    }

    pub fn get(&self, id: PoiId) -> Option<&PointOfInterest> {
        self.pois.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    /// Entry at `index` in id order, for uniform random selection.
    pub fn nth(&self, index: usize) -> Option<&PointOfInterest> {
        self.pois.values().nth(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointOfInterest> {
        self.pois.values()
    }
}
