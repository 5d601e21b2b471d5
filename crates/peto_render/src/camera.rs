use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Perspective camera looking from `eye` at `target`, +Y up.
pub struct Camera3D {
    pub eye: Vec3,
    pub target: Vec3,
    pub fovy_radians: f32,
    pub near: f32,
    pub far: f32,
    pub viewport: (u32, u32),
}

impl Camera3D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            fovy_radians: 45.0f32.to_radians(),
            near: 0.1,
            far: 100.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        let aspect = self.viewport.0.max(1) as f32 / self.viewport.1.max(1) as f32;
        let proj = Mat4::perspective_rh(self.fovy_radians, aspect, self.near, self.far);
        let view = Mat4::look_at_rh(self.eye, self.target, Vec3::Y);
        proj * view
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_proj().to_cols_array_2d(),
        }
    }
}
