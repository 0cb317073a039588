//! Programmable pipeline stages
//!
//! Two pluggable slots, invoked per vertex during mesh submission: a position
//! stage (object space -> clip space) and a vertex stage (shading attribute).
//! Stages are strategies, not a shading language: swap implementations at
//! runtime via `Render3D::set_position_shader` / `set_vertex_shader`.

use super::math::{Mat4, Vec3, Vec4};
use super::types::{Color, Vertex};

/// Parameters read by the vertex stage. Owned by the application, written
/// once per frame, and passed by reference into each submission call.
#[derive(Debug, Clone, Copy)]
pub struct ShaderParams {
    /// Light direction in view space (toward the light), unit length
    pub light_direction: Vec3,
    /// Ambient intensity floor, 0.0-1.0
    pub ambient: f32,
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self {
            light_direction: Vec3::new(0.0, 0.0, 1.0),
            ambient: 0.3,
        }
    }
}

/// Position stage: object-space position to clip-space position
pub trait PositionShader {
    fn transform(&self, pos: Vec3, mvp: &Mat4) -> Vec4;
}

/// Vertex stage: per-vertex shading attribute
pub trait VertexShader {
    fn shade(&self, vertex: &Vertex, model_view: &Mat4, params: &ShaderParams) -> Color;
}

/// The standard position stage: projection * model-view
pub struct MvpPositionShader;

impl PositionShader for MvpPositionShader {
    fn transform(&self, pos: Vec3, mvp: &Mat4) -> Vec4 {
        *mvp * Vec4::from_point(pos)
    }
}

/// Directional diffuse lighting from the vertex normal.
///
/// The normal is rotated into view space (w = 0, translation ignored) and
/// dotted with the view-space light direction. A zero normal shades as
/// ambient only.
pub struct LitVertexShader;

impl VertexShader for LitVertexShader {
    fn shade(&self, vertex: &Vertex, model_view: &Mat4, params: &ShaderParams) -> Color {
        let n = (*model_view * Vec4::from_direction(vertex.normal)).xyz().normalize();
        let diffuse = n.dot(params.light_direction).max(0.0);
        let intensity = (params.ambient + (1.0 - params.ambient) * diffuse).clamp(0.0, 1.0);
        Color::WHITE.shade(intensity)
    }
}

/// Constant white: textures are shown unshaded
pub struct UnlitVertexShader;

impl VertexShader for UnlitVertexShader {
    fn shade(&self, _vertex: &Vertex, _model_view: &Mat4, _params: &ShaderParams) -> Color {
        Color::WHITE
    }
}
