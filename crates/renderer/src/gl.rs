//! `RenderContext` for a live GL / WebGL2 context through `glow`.
//!
//! The context must be current on the calling thread for every call.

use corelib::{GfxError, GfxResult, ResourceKind, ShaderStage};
use glow::HasContext;

use crate::context::{
    BufferTarget, DrawMode, RenderContext, TextureFilter, TextureParameter, TextureWrap,
    UniformValue,
};

impl BufferTarget {
    fn gl(self) -> u32 {
        match self {
            BufferTarget::Array => glow::ARRAY_BUFFER,
            BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

impl DrawMode {
    fn gl(self) -> u32 {
        match self {
            DrawMode::Triangles => glow::TRIANGLES,
            DrawMode::Points => glow::POINTS,
        }
    }
}

impl TextureWrap {
    fn gl(self) -> i32 {
        (match self {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
            TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        }) as i32
    }
}

impl TextureFilter {
    fn gl(self) -> i32 {
        (match self {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
            TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
            TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }) as i32
    }
}

impl TextureParameter {
    fn gl(self) -> (u32, i32) {
        match self {
            TextureParameter::WrapS(w) => (glow::TEXTURE_WRAP_S, w.gl()),
            TextureParameter::WrapT(w) => (glow::TEXTURE_WRAP_T, w.gl()),
            TextureParameter::MinFilter(f) => (glow::TEXTURE_MIN_FILTER, f.gl()),
            TextureParameter::MagFilter(f) => (glow::TEXTURE_MAG_FILTER, f.gl()),
        }
    }
}

fn compile_stage(
    gl: &glow::Context,
    stage: ShaderStage,
    source: &str,
) -> GfxResult<<glow::Context as HasContext>::Shader> {
    let kind = match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    };
    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|e| GfxError::create(ResourceKind::Shader, e))?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(GfxError::Compile { stage, log });
        }
        Ok(shader)
    }
}

impl RenderContext for glow::Context {
    type Buffer = <glow::Context as HasContext>::Buffer;
    type VertexArray = <glow::Context as HasContext>::VertexArray;
    type Texture = <glow::Context as HasContext>::Texture;
    type Program = <glow::Context as HasContext>::Program;
    type UniformLocation = <glow::Context as HasContext>::UniformLocation;

    fn create_buffer(&mut self) -> GfxResult<Self::Buffer> {
        unsafe { HasContext::create_buffer(self) }
            .map_err(|e| GfxError::create(ResourceKind::Buffer, e))
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { HasContext::bind_buffer(self, target.gl(), buffer) }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        unsafe { self.buffer_data_u8_slice(target.gl(), data, glow::STATIC_DRAW) }
    }

    fn create_vertex_array(&mut self) -> GfxResult<Self::VertexArray> {
        unsafe { HasContext::create_vertex_array(self) }
            .map_err(|e| GfxError::create(ResourceKind::VertexArray, e))
    }

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<Self::VertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, location) }
    }

    fn vertex_attrib_pointer_f32(&mut self, location: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(
                self,
                location,
                components,
                glow::FLOAT,
                false,
                stride,
                offset,
            )
        }
    }

    fn create_texture(&mut self) -> GfxResult<Self::Texture> {
        unsafe { HasContext::create_texture(self) }
            .map_err(|e| GfxError::create(ResourceKind::Texture, e))
    }

    fn delete_texture(&mut self, texture: Self::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn bind_texture_2d(&mut self, texture: Option<Self::Texture>) {
        unsafe { self.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d_rgba8(&mut self, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            )
        }
    }

    fn generate_mipmap_2d(&mut self) {
        unsafe { self.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn tex_parameter_2d(&mut self, parameter: TextureParameter) {
        let (name, value) = parameter.gl();
        unsafe { self.tex_parameter_i32(glow::TEXTURE_2D, name, value) }
    }

    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> GfxResult<Self::Program> {
        let vs = compile_stage(self, ShaderStage::Vertex, vertex_src)?;
        let fs = match compile_stage(self, ShaderStage::Fragment, fragment_src) {
            Ok(fs) => fs,
            Err(e) => {
                unsafe { self.delete_shader(vs) };
                return Err(e);
            }
        };
        unsafe {
            let program =
                HasContext::create_program(self).map_err(|e| GfxError::create(ResourceKind::Program, e))?;
            self.attach_shader(program, vs);
            self.attach_shader(program, fs);
            self.link_program(program);
            let linked = self.get_program_link_status(program);
            let log = self.get_program_info_log(program);
            for s in [vs, fs] {
                self.detach_shader(program, s);
                self.delete_shader(s);
            }
            if !linked {
                HasContext::delete_program(self, program);
                return Err(GfxError::Link(log));
            }
            Ok(program)
        }
    }

    fn delete_program(&mut self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn use_program(&mut self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.get_attrib_location(program, name) }
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn set_uniform(&mut self, location: &Self::UniformLocation, value: UniformValue) {
        let loc = Some(location);
        unsafe {
            match value {
                UniformValue::Mat4(m) => {
                    self.uniform_matrix_4_f32_slice(loc, false, &m.to_cols_array())
                }
                UniformValue::Vec3(v) => self.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::F32(x) => self.uniform_1_f32(loc, x),
                UniformValue::I32(x) => self.uniform_1_i32(loc, x),
            }
        }
    }

    fn draw_elements_u32(&mut self, mode: DrawMode, count: i32, offset: i32) {
        unsafe { self.draw_elements(mode.gl(), count, glow::UNSIGNED_INT, offset) }
    }
}
