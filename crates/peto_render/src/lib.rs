pub mod box_pipeline;
pub mod camera;
pub mod gpu_context;
pub mod vertex;

pub use box_pipeline::BoxPipeline;
pub use camera::{Camera3D, CameraUniform};
pub use gpu_context::GpuContext;
pub use vertex::{BoxInstance, CubeVertex};
