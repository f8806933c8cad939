//! Renderer: drawable objects, materials and textures over an explicit
//! rendering context.
//!
//! Nothing here holds global GL state. Every call that touches the GPU takes
//! the context as `&mut C`, and every bind is undone before the call
//! returns.

pub mod binding;
pub mod context;
pub mod gl;
pub mod material;
pub mod object;
pub mod recording;
pub mod shader;
pub mod texture;

pub use context::{DrawMode, RenderContext, UniformValue};
pub use material::{Material, SharedMaterial};
pub use object::{Object3D, ObjectKind, VertexLayout};
pub use recording::RecordingContext;
pub use shader::Shader;
pub use texture::{LoadState, Texture};
