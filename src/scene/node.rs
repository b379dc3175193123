use glam::{Mat4, Quat, Vec3};

/// Axis-aligned box in the local space of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    /// Bounds of this box after transforming all eight corners.
    pub fn transformed(&self, matrix: Mat4) -> Aabb {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let world = matrix.transform_point3(corner);
            min = min.min(world);
            max = max.max(world);
        }
        Aabb { min, max }
    }
}

/// Local placement of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub yaw: f32,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            yaw: 0.0,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_rotation_y(self.yaw),
            self.translation,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub local: NodeTransform,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub name: String,
    pub local: NodeTransform,
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    pub name: String,
    pub local: NodeTransform,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub struct CameraNode {
    pub name: String,
    pub local: NodeTransform,
    pub fov_y: f32,
}

/// Loaded scene content. Only meshes take part in picking.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Mesh(MeshNode),
    Group(GroupNode),
    Light(LightNode),
    // Model files may carry cameras; the placeholder loader never does.
    #[allow(dead_code)]
    Camera(CameraNode),
}

impl SceneNode {
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Mesh(node) => &node.name,
            SceneNode::Group(node) => &node.name,
            SceneNode::Light(node) => &node.name,
            SceneNode::Camera(node) => &node.name,
        }
    }

    pub fn local(&self) -> &NodeTransform {
        match self {
            SceneNode::Mesh(node) => &node.local,
            SceneNode::Group(node) => &node.local,
            SceneNode::Light(node) => &node.local,
            SceneNode::Camera(node) => &node.local,
        }
    }

    /// Walks the subtree depth-first, handing every node its accumulated
    /// world matrix.
    pub fn walk<F>(&self, parent: Mat4, visit: &mut F)
    where
        F: FnMut(&SceneNode, Mat4),
    {
        let world = parent * self.local().matrix();
        visit(self, world);
        if let SceneNode::Group(group) = self {
            for child in &group.children {
                child.walk(world, visit);
            }
        }
    }

    pub fn visit_meshes<F>(&self, parent: Mat4, visit: &mut F)
    where
        F: FnMut(&MeshNode, Mat4),
    {
        self.walk(parent, &mut |node, world| {
            if let SceneNode::Mesh(mesh) = node {
                visit(mesh, world);
            }
        });
    }

    pub fn visit_lights<F>(&self, parent: Mat4, visit: &mut F)
    where
        F: FnMut(&LightNode, Mat4),
    {
        self.walk(parent, &mut |node, world| {
            if let SceneNode::Light(light) = node {
                visit(light, world);
            }
        });
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.visit_meshes(Mat4::IDENTITY, &mut |_, _| count += 1);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(name: &str, at: Vec3) -> SceneNode {
        SceneNode::Mesh(MeshNode {
            name: name.to_string(),
            local: NodeTransform::at(at),
            bounds: Aabb::from_center_size(Vec3::ZERO, Vec3::ONE),
        })
    }

    #[test]
    fn traversal_skips_lights_and_cameras() {
        let root = SceneNode::Group(GroupNode {
            name: "root".to_string(),
            local: NodeTransform::default(),
            children: vec![
                mesh("a", Vec3::X),
                SceneNode::Light(LightNode {
                    name: "lamp".to_string(),
                    local: NodeTransform::default(),
                    intensity: 1.0,
                }),
                SceneNode::Group(GroupNode {
                    name: "nested".to_string(),
                    local: NodeTransform::default(),
                    children: vec![mesh("b", Vec3::Y)],
                }),
                SceneNode::Camera(CameraNode {
                    name: "eye".to_string(),
                    local: NodeTransform::default(),
                    fov_y: 1.0,
                }),
            ],
        });

        let mut names = Vec::new();
        root.visit_meshes(Mat4::IDENTITY, &mut |mesh, _| names.push(mesh.name.clone()));
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(root.mesh_count(), 2);

        let mut lamps = Vec::new();
        root.visit_lights(Mat4::IDENTITY, &mut |light, _| lamps.push(light.name.clone()));
        assert_eq!(lamps, vec!["lamp".to_string()]);
    }

    #[test]
    fn world_matrix_accumulates_parent_translation() {
        let root = SceneNode::Group(GroupNode {
            name: "root".to_string(),
            local: NodeTransform::at(Vec3::new(10.0, 0.0, 0.0)),
            children: vec![mesh("child", Vec3::new(0.0, 2.0, 0.0))],
        });

        let mut origin = Vec3::ZERO;
        root.visit_meshes(Mat4::IDENTITY, &mut |_, world| {
            origin = world.transform_point3(Vec3::ZERO);
        });
        assert!((origin - Vec3::new(10.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn rotated_box_bounds_swap_axes() {
        let aabb = Aabb::from_center_size(Vec3::ZERO, Vec3::new(4.0, 1.0, 0.5));
        let turned = aabb.transformed(Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!((turned.max.x - 0.25).abs() < 1e-4);
        assert!((turned.max.z - 2.0).abs() < 1e-4);
    }
}
