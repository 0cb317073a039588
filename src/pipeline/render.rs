//! Render pipeline: triangle buffer, clipping, and rasterization
//!
//! `Render3D` accumulates shader-transformed triangles during mesh submission
//! and consumes them in `rasterise()`, writing filled spans or wireframe
//! edges into a `Framebuffer`.

use super::math::{barycentric, Mat4, Vec3, Vec4};
use super::model::Mesh;
use super::shader::{
    MvpPositionShader, PositionShader, ShaderParams, UnlitVertexShader, VertexShader,
};
use super::types::{Color, Texture};
use super::MAX_TEXTURE_SLOTS;

/// Vertices with clip-space w at or below this are treated as behind the eye
const NEAR_W_EPSILON: f32 = 1e-3;

/// Target surface for software rendering: RGBA8 pixels plus a depth buffer
pub struct Framebuffer {
    pub pixels: Vec<u8>,   // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>, // Depth buffer
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![f32::MAX; width * height],
            width,
            height,
        }
    }

    /// Switch display mode; reallocates only on an actual change
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height * 4];
            self.zbuffer = vec![f32::MAX; width * height];
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for i in 0..(self.width * self.height) {
            self.pixels[i * 4] = bytes[0];
            self.pixels[i * 4 + 1] = bytes[1];
            self.pixels[i * 4 + 2] = bytes[2];
            self.pixels[i * 4 + 3] = bytes[3];
            self.zbuffer[i] = f32::MAX;
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            let bytes = color.to_bytes();
            self.pixels[idx] = bytes[0];
            self.pixels[idx + 1] = bytes[1];
            self.pixels[idx + 2] = bytes[2];
            self.pixels[idx + 3] = bytes[3];
        }
    }

    pub fn set_pixel_with_depth(&mut self, x: usize, y: usize, z: f32, color: Color) -> bool {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if z < self.zbuffer[idx] {
                self.zbuffer[idx] = z;
                let pixel_idx = idx * 4;
                let bytes = color.to_bytes();
                self.pixels[pixel_idx] = bytes[0];
                self.pixels[pixel_idx + 1] = bytes[1];
                self.pixels[pixel_idx + 2] = bytes[2];
                self.pixels[pixel_idx + 3] = bytes[3];
                return true;
            }
        }
        false
    }

    /// Draw a line from (x0, y0) to (x1, y1) using Bresenham's algorithm.
    /// Out-of-bounds pixels are skipped, not wrapped.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
                self.set_pixel(x as usize, y as usize, color);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// A vertex after the shader stages: clip-space position, texture coordinate,
/// shaded colour
#[derive(Debug, Clone, Copy)]
struct TransformedVertex {
    clip: Vec4,
    uv: super::math::Vec2,
    color: Color,
}

/// A buffered triangle awaiting rasterization
struct TransformedTriangle {
    v: [TransformedVertex; 3],
    texture_slot: usize,
}

/// The software render pipeline.
///
/// Per frame: set matrices and stages, submit meshes (each vertex runs the
/// position and vertex stages and lands in the triangle buffer), then call
/// `rasterise()` to consume the buffer into a framebuffer. Exclusive `&mut`
/// receivers keep submission and rasterization from interleaving.
pub struct Render3D {
    projection: Mat4,
    model_view: Mat4,
    mvp: Mat4,
    textures: [Option<Texture>; MAX_TEXTURE_SLOTS],
    position_shader: Box<dyn PositionShader>,
    vertex_shader: Box<dyn VertexShader>,
    fill_triangles: bool,
    clear_colour: Color,
    triangles: Vec<TransformedTriangle>,
}

impl Render3D {
    pub fn new() -> Self {
        Self {
            projection: Mat4::identity(),
            model_view: Mat4::identity(),
            mvp: Mat4::identity(),
            textures: std::array::from_fn(|_| None),
            position_shader: Box::new(MvpPositionShader),
            vertex_shader: Box::new(UnlitVertexShader),
            fill_triangles: true,
            clear_colour: Color::BLACK,
            triangles: Vec::new(),
        }
    }

    /// Replace the projection matrix for subsequent submissions
    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
        self.mvp = self.projection * self.model_view;
    }

    /// Replace the model-view matrix for subsequent submissions
    pub fn set_model_view(&mut self, model_view: Mat4) {
        self.model_view = model_view;
        self.mvp = self.projection * self.model_view;
    }

    /// Bind a texture to a slot. An out-of-range slot aborts.
    pub fn set_texture(&mut self, texture: Texture, slot: usize) {
        assert!(
            slot < MAX_TEXTURE_SLOTS,
            "texture slot {} out of range (0-{})",
            slot,
            MAX_TEXTURE_SLOTS - 1
        );
        self.textures[slot] = Some(texture);
    }

    /// Install the position stage; takes effect for subsequent submissions
    pub fn set_position_shader(&mut self, shader: Box<dyn PositionShader>) {
        self.position_shader = shader;
    }

    /// Install the vertex stage; takes effect for subsequent submissions
    pub fn set_vertex_shader(&mut self, shader: Box<dyn VertexShader>) {
        self.vertex_shader = shader;
    }

    /// Filled vs wireframe rasterization. One pass never mixes the two;
    /// the last call before `rasterise()` wins.
    pub fn set_fill_triangles(&mut self, fill: bool) {
        self.fill_triangles = fill;
    }

    pub fn set_clear_colour(&mut self, colour: Color) {
        self.clear_colour = colour;
    }

    /// Vertices buffered since the last `rasterise()` call (diagnostic)
    pub fn get_transformed_vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    /// Run both shader stages over a mesh and buffer its triangles.
    /// Invoked by `Model::draw_mesh`; does not rasterize.
    pub fn submit_mesh(&mut self, mesh: &Mesh, params: &ShaderParams) {
        for face in &mesh.faces {
            let v = [face.v0, face.v1, face.v2].map(|i| {
                let vertex = &mesh.vertices[i];
                TransformedVertex {
                    clip: self.position_shader.transform(vertex.pos, &self.mvp),
                    uv: vertex.uv,
                    color: self.vertex_shader.shade(vertex, &self.model_view, params),
                }
            });
            self.triangles.push(TransformedTriangle {
                v,
                texture_slot: face.texture_slot,
            });
        }
    }

    /// Terminal pipeline step: clear the target, clip/cull the buffered
    /// triangles, scan-convert the survivors, and empty the buffer.
    ///
    /// Clipping policy: a triangle is dropped whole when any vertex is behind
    /// the eye or in front of the near plane, when all three vertices lie
    /// beyond the far plane, or when its screen bounding box misses the
    /// target entirely. Partially on-screen triangles clip per pixel.
    pub fn rasterise(&mut self, fb: &mut Framebuffer) {
        fb.clear(self.clear_colour);

        let triangles = std::mem::take(&mut self.triangles);

        for tri in &triangles {
            if tri.v.iter().any(|v| v.clip.w <= NEAR_W_EPSILON || v.clip.z < -v.clip.w) {
                continue;
            }
            if tri.v.iter().all(|v| v.clip.z > v.clip.w) {
                continue;
            }

            // Perspective divide + viewport transform (NDC y up, screen y down)
            let screen = tri.v.map(|v| {
                let inv_w = 1.0 / v.clip.w;
                Vec3::new(
                    (v.clip.x * inv_w + 1.0) * 0.5 * fb.width as f32,
                    (1.0 - v.clip.y * inv_w) * 0.5 * fb.height as f32,
                    v.clip.z * inv_w,
                )
            });

            let min_x = screen[0].x.min(screen[1].x).min(screen[2].x);
            let max_x = screen[0].x.max(screen[1].x).max(screen[2].x);
            let min_y = screen[0].y.min(screen[1].y).min(screen[2].y);
            let max_y = screen[0].y.max(screen[1].y).max(screen[2].y);
            if max_x < 0.0 || min_x >= fb.width as f32 || max_y < 0.0 || min_y >= fb.height as f32 {
                continue;
            }

            // Back-face cull on screen-space signed area. With y flipped,
            // front faces (counter-clockwise in NDC) come out negative; this
            // also drops zero-area degenerates.
            let signed_area = (screen[1].x - screen[0].x) * (screen[2].y - screen[0].y)
                - (screen[2].x - screen[0].x) * (screen[1].y - screen[0].y);
            if signed_area >= 0.0 {
                continue;
            }

            if self.fill_triangles {
                let texture = self.textures[tri.texture_slot].as_ref();
                fill_triangle(fb, tri, &screen, texture);
            } else {
                for i in 0..3 {
                    let a = screen[i];
                    let b = screen[(i + 1) % 3];
                    fb.draw_line(
                        a.x as i32,
                        a.y as i32,
                        b.x as i32,
                        b.y as i32,
                        tri.v[i].color,
                    );
                }
            }
        }
    }
}

impl Default for Render3D {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan-convert one triangle: barycentric coverage over the clamped bounding
/// box, depth-tested, texture sample modulated by the interpolated vertex
/// colour (Gouraud).
fn fill_triangle(
    fb: &mut Framebuffer,
    tri: &TransformedTriangle,
    screen: &[Vec3; 3],
    texture: Option<&Texture>,
) {
    let min_x = screen[0].x.min(screen[1].x).min(screen[2].x).max(0.0) as usize;
    let max_x = (screen[0].x.max(screen[1].x).max(screen[2].x) + 1.0).min(fb.width as f32) as usize;
    let min_y = screen[0].y.min(screen[1].y).min(screen[2].y).max(0.0) as usize;
    let max_y = (screen[0].y.max(screen[1].y).max(screen[2].y) + 1.0).min(fb.height as f32) as usize;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = Vec3::new(x as f32, y as f32, 0.0);
            let bc = barycentric(p, screen[0], screen[1], screen[2]);

            const ERR: f32 = -0.0001;
            if bc.x >= ERR && bc.y >= ERR && bc.z >= ERR {
                let z = bc.x * screen[0].z + bc.y * screen[1].z + bc.z * screen[2].z;

                let u = bc.x * tri.v[0].uv.x + bc.y * tri.v[1].uv.x + bc.z * tri.v[2].uv.x;
                let v = bc.x * tri.v[0].uv.y + bc.y * tri.v[1].uv.y + bc.z * tri.v[2].uv.y;

                let texel = match texture {
                    Some(tex) => tex.sample(u, 1.0 - v),
                    None => Color::WHITE,
                };

                let c0 = tri.v[0].color;
                let c1 = tri.v[1].color;
                let c2 = tri.v[2].color;
                let shade = Color::new(
                    (bc.x * c0.r as f32 + bc.y * c1.r as f32 + bc.z * c2.r as f32) as u8,
                    (bc.x * c0.g as f32 + bc.y * c1.g as f32 + bc.z * c2.g as f32) as u8,
                    (bc.x * c0.b as f32 + bc.y * c1.b as f32 + bc.z * c2.b as f32) as u8,
                );

                fb.set_pixel_with_depth(x, y, z, texel.modulate(shade));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::camera::Camera;
    use crate::pipeline::math::Vec2;
    use crate::pipeline::model::Mesh;
    use crate::pipeline::shader::LitVertexShader;
    use crate::pipeline::types::{Face, Vertex};

    const CLEAR: Color = Color { r: 20, g: 30, b: 40, a: 255 };

    fn demo_camera_pipeline(width: usize, height: usize) -> Render3D {
        let cam = Camera::new(
            Vec3::new(0.0, 0.0, -2.3),
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::UP,
        );
        let mut r3d = Render3D::new();
        r3d.set_projection(Camera::perspective_matrix(
            0.1,
            10.0,
            std::f32::consts::FRAC_PI_4,
            width as f32 / height as f32,
        ));
        r3d.set_model_view(cam.get_look_matrix());
        r3d.set_clear_colour(CLEAR);
        r3d
    }

    /// Front-facing triangle in the z = depth plane, centred on the view axis
    fn facing_triangle_mesh(depth: f32, slot: usize) -> Mesh {
        let mut mesh = Mesh::new("tri");
        mesh.vertices = vec![
            Vertex::new(Vec3::new(-0.5, -0.5, depth), Vec2::new(0.0, 0.0), Vec3::ZERO),
            Vertex::new(Vec3::new(0.5, -0.5, depth), Vec2::new(1.0, 0.0), Vec3::ZERO),
            Vertex::new(Vec3::new(0.0, 0.75, depth), Vec2::new(0.5, 1.0), Vec3::ZERO),
        ];
        mesh.faces = vec![Face::new(0, 1, 2, slot)];
        mesh
    }

    fn pixel_at(fb: &Framebuffer, x: usize, y: usize) -> Color {
        let idx = (y * fb.width + x) * 4;
        Color::with_alpha(
            fb.pixels[idx],
            fb.pixels[idx + 1],
            fb.pixels[idx + 2],
            fb.pixels[idx + 3],
        )
    }

    fn count_non_clear(fb: &Framebuffer) -> usize {
        let mut n = 0;
        for y in 0..fb.height {
            for x in 0..fb.width {
                if pixel_at(fb, x, y) != CLEAR {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_empty_rasterise_is_pure_clear() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);
        assert_eq!(r3d.get_transformed_vertex_count(), 0);
        r3d.rasterise(&mut fb);
        assert_eq!(count_non_clear(&fb), 0);
        assert_eq!(r3d.get_transformed_vertex_count(), 0);
    }

    #[test]
    fn test_visible_triangle_covers_screen_center() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        let mesh = facing_triangle_mesh(-3.0, 0);
        r3d.submit_mesh(&mesh, &ShaderParams::default());
        assert_eq!(r3d.get_transformed_vertex_count(), 3);

        r3d.rasterise(&mut fb);
        // The look-at point sits in the middle of the triangle, so the pixel
        // at the centre of the screen must have been drawn over.
        assert_ne!(pixel_at(&fb, 32, 24), CLEAR);
        // Buffer consumed
        assert_eq!(r3d.get_transformed_vertex_count(), 0);
    }

    #[test]
    fn test_triangle_behind_near_plane_draws_nothing() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        // Behind the camera entirely (camera at z=-2.3 looking toward -z)
        let mesh = facing_triangle_mesh(3.0, 0);
        r3d.submit_mesh(&mesh, &ShaderParams::default());
        r3d.rasterise(&mut fb);
        assert_eq!(count_non_clear(&fb), 0);
    }

    #[test]
    fn test_triangle_beyond_far_plane_draws_nothing() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        let mesh = facing_triangle_mesh(-50.0, 0);
        r3d.submit_mesh(&mesh, &ShaderParams::default());
        r3d.rasterise(&mut fb);
        assert_eq!(count_non_clear(&fb), 0);
    }

    #[test]
    fn test_back_face_is_culled() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        let mut mesh = facing_triangle_mesh(-3.0, 0);
        // Reverse the winding so the triangle faces away
        let f = mesh.faces[0];
        mesh.faces[0] = Face::new(f.v2, f.v1, f.v0, f.texture_slot);
        r3d.submit_mesh(&mesh, &ShaderParams::default());
        r3d.rasterise(&mut fb);
        assert_eq!(count_non_clear(&fb), 0);
    }

    #[test]
    fn test_last_fill_mode_call_wins() {
        let mut r3d = Render3D::new();
        r3d.set_fill_triangles(true);
        r3d.set_fill_triangles(false);
        assert!(!r3d.fill_triangles);
    }

    #[test]
    fn test_wireframe_draws_edges_not_interior() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        let mesh = facing_triangle_mesh(-3.0, 0);
        r3d.submit_mesh(&mesh, &ShaderParams::default());
        r3d.set_fill_triangles(false);
        r3d.rasterise(&mut fb);

        let drawn = count_non_clear(&fb);
        assert!(drawn > 0);
        // Edges only: far fewer pixels than a filled triangle would cover
        assert!(drawn < 64 * 48 / 8);
    }

    #[test]
    fn test_all_eight_texture_slots_bind_and_render() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        for slot in 0..MAX_TEXTURE_SLOTS {
            let shade = (slot * 32) as u8;
            r3d.set_texture(
                Texture::checkerboard(8, 8, Color::new(shade, shade, shade), Color::WHITE),
                slot,
            );
        }

        for slot in 0..MAX_TEXTURE_SLOTS {
            let mesh = facing_triangle_mesh(-3.0 - slot as f32 * 0.1, slot);
            r3d.submit_mesh(&mesh, &ShaderParams::default());
        }
        assert_eq!(r3d.get_transformed_vertex_count(), 24);
        r3d.rasterise(&mut fb);
        assert!(count_non_clear(&fb) > 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_slot_aborts() {
        let mut r3d = Render3D::new();
        r3d.set_texture(Texture::new(2, 2), MAX_TEXTURE_SLOTS);
    }

    #[test]
    fn test_stage_swap_affects_later_submissions_only() {
        let mut r3d = demo_camera_pipeline(64, 48);
        let mesh = facing_triangle_mesh(-3.0, 0);
        let params = ShaderParams {
            light_direction: Vec3::new(0.0, 0.0, 1.0),
            ambient: 0.0,
        };

        r3d.submit_mesh(&mesh, &params);
        r3d.set_vertex_shader(Box::new(LitVertexShader));
        r3d.submit_mesh(&mesh, &params);

        // First submission kept the unlit (white) stage output; the second
        // went through the lit stage (zero normals -> black at ambient 0).
        assert_eq!(r3d.triangles[0].v[0].color, Color::WHITE);
        assert_ne!(r3d.triangles[1].v[0].color, Color::WHITE);
    }

    #[test]
    fn test_nearer_triangle_wins_depth_test() {
        let mut fb = Framebuffer::new(64, 48);
        let mut r3d = demo_camera_pipeline(64, 48);

        r3d.set_texture(Texture::checkerboard(4, 4, Color::new(200, 0, 0), Color::new(200, 0, 0)), 0);
        r3d.set_texture(Texture::checkerboard(4, 4, Color::new(0, 200, 0), Color::new(0, 200, 0)), 1);

        // Far (red) submitted after near (green): depth test must still keep green
        let near = facing_triangle_mesh(-3.0, 1);
        let far = facing_triangle_mesh(-4.0, 0);
        r3d.submit_mesh(&near, &ShaderParams::default());
        r3d.submit_mesh(&far, &ShaderParams::default());
        r3d.rasterise(&mut fb);

        let center = pixel_at(&fb, 32, 24);
        assert_eq!((center.r, center.g), (0, 200));
    }
}
