//! Mesh and model containers, plus RON model files
//!
//! A model owns one or more named meshes; each mesh is a vertex array plus
//! indexed triangles. Models arrive pre-parsed (RON here), the pipeline never
//! reads an asset pack format itself.

use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use super::render::Render3D;
use super::shader::ShaderParams;
use super::types::{Face, Vertex};
use super::MAX_TEXTURE_SLOTS;

/// Error type for model loading
#[derive(Debug)]
pub enum ModelError {
    Io(std::io::Error),
    Parse(ron::error::SpannedError),
    Serialize(ron::Error),
    Integrity(String),
}

impl From<std::io::Error> for ModelError {
    fn from(e: std::io::Error) -> Self {
        ModelError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ModelError {
    fn from(e: ron::error::SpannedError) -> Self {
        ModelError::Parse(e)
    }
}

impl From<ron::Error> for ModelError {
    fn from(e: ron::Error) -> Self {
        ModelError::Serialize(e)
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Io(e) => write!(f, "IO error: {}", e),
            ModelError::Parse(e) => write!(f, "Parse error: {}", e),
            ModelError::Serialize(e) => write!(f, "Serialize error: {}", e),
            ModelError::Integrity(msg) => write!(f, "Integrity error: {}", msg),
        }
    }
}

/// One named mesh: vertices plus indexed triangles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }
}

/// An ordered collection of meshes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            meshes: Vec::new(),
        }
    }

    pub fn get_num_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Panics on an out-of-range index (caller contract violation)
    pub fn mesh(&self, index: usize) -> &Mesh {
        &self.meshes[index]
    }

    /// Submit one mesh through the pipeline's current shader stages.
    ///
    /// Producer step only: transformed triangles accumulate in the pipeline
    /// buffer until `rasterise()`. An out-of-range index aborts.
    pub fn draw_mesh(&self, index: usize, r3d: &mut Render3D, params: &ShaderParams) {
        assert!(
            index < self.meshes.len(),
            "mesh index {} out of range ({} meshes)",
            index,
            self.meshes.len()
        );
        r3d.submit_mesh(&self.meshes[index], params);
    }

    /// Asset-integrity check: every face index must address a vertex, every
    /// texture slot must be bindable. Run on every load.
    pub fn validate(&self) -> Result<(), ModelError> {
        for mesh in &self.meshes {
            for (i, face) in mesh.faces.iter().enumerate() {
                let max = face.v0.max(face.v1).max(face.v2);
                if max >= mesh.vertices.len() {
                    return Err(ModelError::Integrity(format!(
                        "mesh '{}' face {} references vertex {} of {}",
                        mesh.name,
                        i,
                        max,
                        mesh.vertices.len()
                    )));
                }
                if face.texture_slot >= MAX_TEXTURE_SLOTS {
                    return Err(ModelError::Integrity(format!(
                        "mesh '{}' face {} references texture slot {} (max {})",
                        mesh.name,
                        i,
                        face.texture_slot,
                        MAX_TEXTURE_SLOTS - 1
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Load a model from a RON file, refusing assets that fail validation
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, ModelError> {
    let contents = fs::read_to_string(path)?;
    load_model_from_str(&contents)
}

/// Load a model from a RON string (for embedded models or testing)
pub fn load_model_from_str(s: &str) -> Result<Model, ModelError> {
    let model: Model = ron::from_str(s)?;
    model.validate()?;
    Ok(model)
}

/// Save a model to a RON file
pub fn save_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<(), ModelError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(model, config)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::math::{Vec2, Vec3};

    fn one_triangle_mesh(slot: usize) -> Mesh {
        let mut mesh = Mesh::new("tri");
        mesh.vertices = vec![
            Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec2::new(0.0, 0.0), Vec3::ZERO),
            Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec2::new(1.0, 0.0), Vec3::ZERO),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.5, 1.0), Vec3::ZERO),
        ];
        mesh.faces = vec![Face::new(0, 1, 2, slot)];
        mesh
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let mut model = Model::new("ok");
        model.meshes.push(one_triangle_mesh(7));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_vertex_index() {
        let mut model = Model::new("bad");
        let mut mesh = one_triangle_mesh(0);
        mesh.faces[0].v2 = 3;
        model.meshes.push(mesh);
        assert!(matches!(model.validate(), Err(ModelError::Integrity(_))));
    }

    #[test]
    fn test_validate_rejects_bad_slot() {
        let mut model = Model::new("bad");
        model.meshes.push(one_triangle_mesh(8));
        assert!(matches!(model.validate(), Err(ModelError::Integrity(_))));
    }

    #[test]
    fn test_ron_round_trip() {
        let mut model = Model::new("roundtrip");
        model.meshes.push(one_triangle_mesh(2));

        let config = ron::ser::PrettyConfig::new();
        let s = ron::ser::to_string_pretty(&model, config).unwrap();
        let back = load_model_from_str(&s).unwrap();
        assert_eq!(back.name, "roundtrip");
        assert_eq!(back.get_num_meshes(), 1);
        assert_eq!(back.mesh(0).faces[0].texture_slot, 2);
    }

    #[test]
    #[should_panic]
    fn test_mesh_index_out_of_range_aborts() {
        let model = Model::new("empty");
        model.mesh(0);
    }
}
