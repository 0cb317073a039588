//! Demo scene: application-owned context for the pipeline
//!
//! Everything the render loop touches lives here explicitly (camera, model,
//! shader parameters, per-mesh visibility) instead of in globals. The model
//! is built procedurally so the demo needs no asset files.

use std::collections::HashSet;

use crate::pipeline::{Camera, Color, Face, Mesh, Model, ShaderParams, Texture, Vec2, Vec3, Vertex};

pub struct Scene {
    pub camera: Camera,
    pub model: Model,
    pub params: ShaderParams,
    /// Meshes hidden from submission, keyed by mesh name
    pub hidden: HashSet<String>,
    pub wireframe: bool,
    pub hires: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            camera: Camera::new(
                Vec3::new(0.0, 0.0, -2.3),
                Vec3::new(0.0, 0.0, -3.0),
                Vec3::UP,
            ),
            model: demo_model(),
            params: ShaderParams::default(),
            hidden: HashSet::new(),
            wireframe: false,
            hires: false,
        }
    }

    /// Move the camera along its view direction
    pub fn dolly(&mut self, amount: f32) {
        let dir = (self.camera.look_at - self.camera.position).normalize();
        self.camera.position += dir * amount;
    }

    pub fn toggle_mesh(&mut self, name: &str) {
        if !self.hidden.remove(name) {
            self.hidden.insert(name.to_string());
        }
    }

    pub fn is_visible(&self, name: &str) -> bool {
        !self.hidden.contains(name)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkerboard textures for the slots the demo model references
pub fn demo_textures() -> Vec<(usize, Texture)> {
    vec![
        (0, Texture::checkerboard(32, 32, Color::new(170, 120, 70), Color::new(120, 80, 45))),
        (1, Texture::checkerboard(32, 32, Color::new(90, 130, 190), Color::new(60, 90, 140))),
        (2, Texture::checkerboard(32, 32, Color::new(120, 160, 110), Color::new(80, 110, 75))),
    ]
}

/// A small three-mesh tower: slab base, cube hull, cube cap.
/// Each mesh pulls from its own texture slot.
pub fn demo_model() -> Model {
    let mut model = Model::new("tower");
    model.meshes.push(cube_mesh(
        "base",
        Vec3::new(0.0, -0.65, 0.0),
        Vec3::new(0.9, 0.15, 0.9),
        2,
    ));
    model.meshes.push(cube_mesh(
        "hull",
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.5, 0.5, 0.5),
        0,
    ));
    model.meshes.push(cube_mesh(
        "cap",
        Vec3::new(0.0, 0.75, 0.0),
        Vec3::new(0.25, 0.25, 0.25),
        1,
    ));
    model
}

/// Axis-aligned cuboid mesh: 24 vertices (4 per face, per-face normals),
/// 12 counter-clockwise triangles
fn cube_mesh(name: &str, center: Vec3, half: Vec3, slot: usize) -> Mesh {
    // (normal, tangent, bitangent) per face, with t x b = n so the corner
    // order below is counter-clockwise viewed from outside
    let axes = [
        (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
        (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
        (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
    ];

    let uvs = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut mesh = Mesh::new(name);
    for (n, t, b) in axes {
        let hn = n.dot(half).abs();
        let ht = t.dot(half).abs();
        let hb = b.dot(half).abs();
        let base = mesh.vertices.len();

        for (i, (su, sv)) in corners.into_iter().enumerate() {
            let pos = center + n * hn + t * (ht * su) + b * (hb * sv);
            mesh.vertices.push(Vertex::new(pos, uvs[i], n));
        }

        mesh.faces.push(Face::new(base, base + 1, base + 2, slot));
        mesh.faces.push(Face::new(base, base + 2, base + 3, slot));
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_model_is_well_formed() {
        assert!(demo_model().validate().is_ok());
    }

    #[test]
    fn test_demo_textures_cover_referenced_slots() {
        let model = demo_model();
        let bound: Vec<usize> = demo_textures().into_iter().map(|(slot, _)| slot).collect();
        for mesh in &model.meshes {
            for face in &mesh.faces {
                assert!(bound.contains(&face.texture_slot));
            }
        }
    }

    #[test]
    fn test_toggle_mesh_round_trips() {
        let mut scene = Scene::new();
        assert!(scene.is_visible("cap"));
        scene.toggle_mesh("cap");
        assert!(!scene.is_visible("cap"));
        scene.toggle_mesh("cap");
        assert!(scene.is_visible("cap"));
    }

    #[test]
    fn test_dolly_moves_toward_look_at() {
        let mut scene = Scene::new();
        let before = (scene.camera.look_at - scene.camera.position).len();
        scene.dolly(0.1);
        let after = (scene.camera.look_at - scene.camera.position).len();
        assert!(after < before);
    }
}
