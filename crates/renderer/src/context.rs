//! The rendering-context capability.
//!
//! Every operation that touches GPU state takes a `&mut C` where
//! `C: RenderContext`. The trait is a narrow, safe slice of the GL / WebGL2
//! API: just what buffers, vertex arrays, textures, programs and indexed
//! draws need. Two backends exist: [`glow::Context`](crate::gl) for real
//! drivers and [`RecordingContext`](crate::recording::RecordingContext),
//! which tracks state in memory.

use std::fmt::Debug;

use corelib::{GfxResult, Mat4, Vec3};

/// Buffer bind points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// How an index sequence is assembled into primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    #[default]
    Triangles,
    Points,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

/// One `tex_parameter` assignment on the 2D target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureParameter {
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    F32(f32),
    I32(i32),
}

pub trait RenderContext {
    type Buffer: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug + PartialEq;
    type Texture: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type UniformLocation: Clone + Debug;

    // Buffers
    fn create_buffer(&mut self) -> GfxResult<Self::Buffer>;
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Self::Buffer>);
    /// Upload `data` with static-draw usage to the buffer bound at `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);

    // Vertex arrays
    fn create_vertex_array(&mut self) -> GfxResult<Self::VertexArray>;
    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);
    fn bind_vertex_array(&mut self, vertex_array: Option<Self::VertexArray>);
    fn enable_vertex_attrib_array(&mut self, location: u32);
    /// Float attribute sourced from the bound array buffer. Stride and offset in bytes.
    fn vertex_attrib_pointer_f32(&mut self, location: u32, components: i32, stride: i32, offset: i32);

    // Textures
    fn create_texture(&mut self) -> GfxResult<Self::Texture>;
    fn delete_texture(&mut self, texture: Self::Texture);
    /// Select texture unit `unit` (0-based, not the `TEXTURE0` enum).
    fn active_texture(&mut self, unit: u32);
    fn bind_texture_2d(&mut self, texture: Option<Self::Texture>);
    /// Level 0 of the bound 2D texture, RGBA / unsigned byte.
    fn tex_image_2d_rgba8(&mut self, width: u32, height: u32, pixels: &[u8]);
    fn generate_mipmap_2d(&mut self);
    fn tex_parameter_2d(&mut self, parameter: TextureParameter);

    // Programs
    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> GfxResult<Self::Program>;
    fn delete_program(&mut self, program: Self::Program);
    fn use_program(&mut self, program: Option<Self::Program>);
    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    /// Set a uniform on the program currently in use.
    fn set_uniform(&mut self, location: &Self::UniformLocation, value: UniformValue);

    // Drawing
    /// Indexed draw from the bound element buffer with unsigned 32-bit indices.
    fn draw_elements_u32(&mut self, mode: DrawMode, count: i32, offset: i32);
}
