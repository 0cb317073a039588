//! Look-at camera and perspective projection

use super::math::{Mat4, Vec3};

/// Camera described by where it is, what it looks at, and which way is up.
///
/// All fields are free to mutate between frames; the view matrix is derived
/// fresh on every `get_look_matrix` call, never cached. The up vector must
/// not be parallel to the view direction — a parallel up collapses the view
/// basis to a degenerate (but finite) matrix rather than crashing.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, look_at: Vec3, up: Vec3) -> Self {
        Self { position, look_at, up }
    }

    /// Standard perspective projection. View space looks down -z; clip-space
    /// w is the view-space distance in front of the eye.
    ///
    /// Degenerate parameters (near <= 0, far <= near, aspect <= 0) are
    /// caller contract violations and abort.
    pub fn perspective_matrix(near: f32, far: f32, vfov: f32, aspect: f32) -> Mat4 {
        assert!(near > 0.0, "perspective near plane must be positive");
        assert!(far > near, "perspective far plane must be beyond near");
        assert!(aspect > 0.0, "perspective aspect ratio must be positive");

        let f = 1.0 / (vfov / 2.0).tan();
        let mut mat = Mat4::identity();
        mat.m[0][0] = f / aspect;
        mat.m[1][1] = f;
        mat.m[2][2] = -(far + near) / (far - near);
        mat.m[2][3] = -(2.0 * far * near) / (far - near);
        mat.m[3][2] = -1.0;
        mat.m[3][3] = 0.0;
        mat
    }

    /// View matrix from the current position/look-at/up
    pub fn get_look_matrix(&self) -> Mat4 {
        let f = (self.look_at - self.position).normalize();
        let s = f.cross(self.up.normalize()).normalize();
        let u = s.cross(f);

        let mut mat = Mat4::identity();
        mat.m[0][0] = s.x;
        mat.m[0][1] = s.y;
        mat.m[0][2] = s.z;
        mat.m[1][0] = u.x;
        mat.m[1][1] = u.y;
        mat.m[1][2] = u.z;
        mat.m[2][0] = -f.x;
        mat.m[2][1] = -f.y;
        mat.m[2][2] = -f.z;
        mat.m[0][3] = -s.dot(self.position);
        mat.m[1][3] = -u.dot(self.position);
        mat.m[2][3] = f.dot(self.position);
        mat
    }
}
