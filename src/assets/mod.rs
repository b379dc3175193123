mod images;

pub use images::{ArtworkImages, ImageSlot};

use crate::scene::{
    Aabb, ArtworkSpec, GroupNode, LightNode, MeshNode, NodeTransform, SceneNode, VisitorSpec,
};
use glam::Vec3;

const FRAME_BORDER: f32 = 0.1;
const CANVAS_DEPTH: f32 = 0.01;
const PICTURE_LIGHT_INTENSITY: f32 = 2500.0;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("invalid bounds for {name}")]
    InvalidBounds { name: String },
    #[error("artwork {id} has no image reference")]
    MissingImage { id: u32 },
    #[error("failed to fetch {reference}: {reason}")]
    Fetch { reference: String, reason: String },
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Builds scene content for layout entries.
pub trait AssetSource {
    fn load_visitor(&self, spec: &VisitorSpec) -> Result<SceneNode, AssetError>;
    fn load_artwork(&self, spec: &ArtworkSpec) -> Result<SceneNode, AssetError>;
}

/// Box stand-ins sized from the layout: a frame, canvas and picture light
/// for each artwork and a single body box for each visitor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderAssets;

impl AssetSource for PlaceholderAssets {
    fn load_visitor(&self, spec: &VisitorSpec) -> Result<SceneNode, AssetError> {
        let size = Vec3::from_array(spec.size);
        check_size(&spec.name, size)?;
        log::debug!("Placeholder body for {} ({})", spec.name, spec.model);

        Ok(SceneNode::Group(GroupNode {
            name: format!("visitor-{}", spec.id),
            local: NodeTransform::default(),
            children: vec![SceneNode::Mesh(MeshNode {
                name: format!("{}-body", spec.name),
                local: NodeTransform::default(),
                bounds: Aabb::from_center_size(Vec3::new(0.0, size.y * 0.5, 0.0), size),
            })],
        }))
    }

    fn load_artwork(&self, spec: &ArtworkSpec) -> Result<SceneNode, AssetError> {
        if spec.image_url.trim().is_empty() {
            return Err(AssetError::MissingImage { id: spec.id });
        }
        let name = format!("artwork-{}", spec.id);
        let canvas = Vec3::new(spec.height * spec.aspect, spec.height, CANVAS_DEPTH);
        check_size(&name, canvas)?;
        let frame = Vec3::new(
            canvas.x + FRAME_BORDER,
            canvas.y + FRAME_BORDER,
            spec.frame_depth.max(CANVAS_DEPTH),
        );

        let children = vec![
            SceneNode::Mesh(MeshNode {
                name: format!("{}-frame", name),
                local: NodeTransform::default(),
                bounds: Aabb::from_center_size(Vec3::ZERO, frame),
            }),
            SceneNode::Mesh(MeshNode {
                name: format!("{}-canvas", name),
                local: NodeTransform::at(Vec3::new(0.0, 0.0, (frame.z + CANVAS_DEPTH) * 0.5)),
                bounds: Aabb::from_center_size(Vec3::ZERO, canvas),
            }),
            SceneNode::Light(LightNode {
                name: format!("{}-light", name),
                local: NodeTransform::at(Vec3::new(0.0, frame.y * 0.5 + 0.3, 0.5)),
                intensity: PICTURE_LIGHT_INTENSITY,
            }),
        ];

        Ok(SceneNode::Group(GroupNode {
            name,
            local: NodeTransform::default(),
            children,
        }))
    }
}

fn check_size(name: &str, size: Vec3) -> Result<(), AssetError> {
    if size.is_finite() && size.min_element() > 0.0 {
        Ok(())
    } else {
        Err(AssetError::InvalidBounds {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::serialization::default_layout;
    use glam::Mat4;

    #[test]
    fn every_default_entry_loads() {
        let layout = default_layout().unwrap();
        for artwork in &layout.artworks {
            let node = PlaceholderAssets.load_artwork(artwork).unwrap();
            assert_eq!(node.mesh_count(), 2);
        }
        for visitor in &layout.visitors {
            let node = PlaceholderAssets.load_visitor(visitor).unwrap();
            assert_eq!(node.mesh_count(), 1);
        }
    }

    #[test]
    fn visitor_body_stands_on_origin() {
        let spec = VisitorSpec {
            id: 1,
            name: "Marshal".to_string(),
            model: "models/marshal.gltf".to_string(),
            size: [0.6, 1.1, 0.5],
            floor_offset: -0.2,
            spawn: None,
        };
        let node = PlaceholderAssets.load_visitor(&spec).unwrap();
        let mut bounds = Vec::new();
        node.visit_meshes(Mat4::IDENTITY, &mut |mesh, world| {
            bounds.push(mesh.bounds.transformed(world));
        });
        assert!(bounds[0].min.y.abs() < 1e-6);
        assert!((bounds[0].max.y - 1.1).abs() < 1e-6);
    }

    #[test]
    fn bad_entries_are_rejected() {
        let mut artwork = ArtworkSpec {
            id: 5,
            image_url: String::new(),
            position: [0.0, 1.5, 0.0],
            yaw: 0.0,
            height: 1.5,
            aspect: 1.0,
            frame_depth: 0.05,
        };
        assert!(matches!(
            PlaceholderAssets.load_artwork(&artwork),
            Err(AssetError::MissingImage { id: 5 })
        ));

        artwork.image_url = "img/five.jpg".to_string();
        artwork.aspect = 0.0;
        assert!(matches!(
            PlaceholderAssets.load_artwork(&artwork),
            Err(AssetError::InvalidBounds { .. })
        ));
    }
}
