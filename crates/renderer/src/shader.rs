//! Linked shader program and name-based uniform / attribute access.

use corelib::{GfxResult, Mat4, Vec3};

use crate::context::{RenderContext, UniformValue};

pub const ATTR_POSITION: &str = "a_position";
pub const ATTR_NORMAL: &str = "a_normal";
pub const ATTR_TANGENT: &str = "a_tangent";
pub const ATTR_TEXTURE_COORD: &str = "a_texture_coord";

pub const UNIFORM_MODEL: &str = "u_m";

pub struct Shader<C: RenderContext> {
    program: C::Program,
    label: String,
}

impl<C: RenderContext> Shader<C> {
    pub fn compile(
        ctx: &mut C,
        label: impl Into<String>,
        vertex_src: &str,
        fragment_src: &str,
    ) -> GfxResult<Self> {
        let label = label.into();
        let program = ctx.create_program(vertex_src, fragment_src)?;
        log::debug!("Shader '{}' linked as {:?}", label, program);
        Ok(Self { program, label })
    }

    pub fn program(&self) -> C::Program {
        self.program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `None` when the program has no active attribute called `name`.
    pub fn attribute_location(&self, ctx: &C, name: &str) -> Option<u32> {
        ctx.attribute_location(self.program, name)
    }

    pub fn bind(&self, ctx: &mut C) {
        ctx.use_program(Some(self.program));
    }

    pub fn unbind(&self, ctx: &mut C) {
        ctx.use_program(None);
    }

    /// Run `f` with this program in use.
    pub fn scoped<R>(&self, ctx: &mut C, f: impl FnOnce(&mut C) -> R) -> R {
        self.bind(ctx);
        let out = f(ctx);
        self.unbind(ctx);
        out
    }

    /// Uniform setters expect the program to be in use. Names the program
    /// does not know are ignored.
    pub fn set_uniform(&self, ctx: &mut C, name: &str, value: UniformValue) {
        match ctx.uniform_location(self.program, name) {
            Some(loc) => ctx.set_uniform(&loc, value),
            None => log::trace!("Shader '{}' has no uniform {}", self.label, name),
        }
    }

    pub fn set_uniform_mat4(&self, ctx: &mut C, name: &str, m: &Mat4) {
        self.set_uniform(ctx, name, UniformValue::Mat4(*m));
    }

    pub fn set_uniform_vec3(&self, ctx: &mut C, name: &str, v: Vec3) {
        self.set_uniform(ctx, name, UniformValue::Vec3(v));
    }

    pub fn set_uniform_f32(&self, ctx: &mut C, name: &str, x: f32) {
        self.set_uniform(ctx, name, UniformValue::F32(x));
    }

    pub fn set_uniform_i32(&self, ctx: &mut C, name: &str, x: i32) {
        self.set_uniform(ctx, name, UniformValue::I32(x));
    }

    pub fn destroy(self, ctx: &mut C) {
        ctx.delete_program(self.program);
    }
}

impl<C: RenderContext> std::fmt::Debug for Shader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("program", &self.program)
            .finish()
    }
}
