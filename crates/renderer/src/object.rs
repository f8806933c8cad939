//! Drawable objects: geometry buffers, a vertex layout bound to a shader,
//! a model transform and an optional material.
//!
//! Two kinds share one record. `Plain` objects expect planar vertex data
//! (all positions, then all normals) and upload only the model matrix.
//! `Shaded` objects expect interleaved vertices and also feed their
//! material's colors and texture maps to the shader before drawing.

use std::rc::Rc;

use asset::mesh::{BASE_FLOATS, TEXTURED_FLOATS};
use corelib::{GfxResult, Mat4, Transform};

use crate::binding::{with_buffer, with_texture_units, with_vertex_array};
use crate::context::{BufferTarget, DrawMode, RenderContext};
use crate::material::SharedMaterial;
use crate::shader::{
    ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT, ATTR_TEXTURE_COORD, Shader, UNIFORM_MODEL,
};

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// One float attribute inside the vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub components: i32,
    pub offset_bytes: i32,
}

/// How the vertex buffer's floats map to attributes. Fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexLayout {
    /// Tightly packed positions followed by normals starting at half the
    /// buffer. Only correct for planar data with as many normals as
    /// positions.
    Planar { normal_offset_bytes: i32 },
    /// `position, normal` or `position, normal, tangent, uv` per vertex.
    Interleaved { textured: bool },
}

impl VertexLayout {
    pub fn planar(vertex_floats: usize) -> Self {
        if vertex_floats % BASE_FLOATS != 0 {
            log::warn!(
                "{} vertex floats do not split into position/normal halves; normals will be misread",
                vertex_floats
            );
        }
        VertexLayout::Planar {
            normal_offset_bytes: (vertex_floats * F32_BYTES / 2) as i32,
        }
    }

    /// Floats per vertex; 0 for tightly packed planar data.
    pub fn stride_floats(&self) -> usize {
        match *self {
            VertexLayout::Planar { .. } => 0,
            VertexLayout::Interleaved { textured: false } => BASE_FLOATS,
            VertexLayout::Interleaved { textured: true } => TEXTURED_FLOATS,
        }
    }

    pub fn stride_bytes(&self) -> i32 {
        (self.stride_floats() * F32_BYTES) as i32
    }

    pub fn attributes(&self) -> Vec<AttributeSpec> {
        let attr = |name, components, offset_floats: usize| AttributeSpec {
            name,
            components,
            offset_bytes: (offset_floats * F32_BYTES) as i32,
        };
        match *self {
            VertexLayout::Planar {
                normal_offset_bytes,
            } => vec![
                attr(ATTR_POSITION, 3, 0),
                AttributeSpec {
                    name: ATTR_NORMAL,
                    components: 3,
                    offset_bytes: normal_offset_bytes,
                },
            ],
            VertexLayout::Interleaved { textured } => {
                let mut attrs = vec![attr(ATTR_POSITION, 3, 0), attr(ATTR_NORMAL, 3, 3)];
                if textured {
                    attrs.push(attr(ATTR_TANGENT, 3, 6));
                    attrs.push(attr(ATTR_TEXTURE_COORD, 2, 9));
                }
                attrs
            }
        }
    }
}

pub enum ObjectKind<C: RenderContext> {
    Plain {
        material: Option<SharedMaterial<C>>,
    },
    Shaded {
        material: SharedMaterial<C>,
    },
}

impl<C: RenderContext> ObjectKind<C> {
    fn layout(&self, vertex_floats: usize) -> VertexLayout {
        match self {
            ObjectKind::Plain { .. } => VertexLayout::planar(vertex_floats),
            ObjectKind::Shaded { material } => VertexLayout::Interleaved {
                textured: material.borrow().has_texture(),
            },
        }
    }
}

pub struct Object3D<C: RenderContext> {
    shader: Rc<Shader<C>>,
    kind: ObjectKind<C>,
    vertices: Vec<f32>,
    indices: Vec<u32>,
    vertex_buffer: C::Buffer,
    index_buffer: C::Buffer,
    vertex_array: C::VertexArray,
    layout: VertexLayout,
    draw_mode: DrawMode,
    model_matrix: Mat4,
}

impl<C: RenderContext> Object3D<C> {
    /// Plain object without a material.
    pub fn new(
        ctx: &mut C,
        shader: Rc<Shader<C>>,
        vertices: Vec<f32>,
        indices: Vec<u32>,
        draw_mode: DrawMode,
    ) -> GfxResult<Self> {
        Self::build(
            ctx,
            shader,
            vertices,
            indices,
            draw_mode,
            ObjectKind::Plain { material: None },
        )
    }

    /// Plain object that carries a material for the caller's use. The
    /// material is not sent to the shader.
    pub fn with_material(
        ctx: &mut C,
        shader: Rc<Shader<C>>,
        vertices: Vec<f32>,
        indices: Vec<u32>,
        draw_mode: DrawMode,
        material: SharedMaterial<C>,
    ) -> GfxResult<Self> {
        Self::build(
            ctx,
            shader,
            vertices,
            indices,
            draw_mode,
            ObjectKind::Plain {
                material: Some(material),
            },
        )
    }

    /// Material-shaded object. `vertices` are interleaved, 11 floats per
    /// vertex if the material has any texture map at this point, else 6.
    pub fn shaded(
        ctx: &mut C,
        shader: Rc<Shader<C>>,
        vertices: Vec<f32>,
        indices: Vec<u32>,
        draw_mode: DrawMode,
        material: SharedMaterial<C>,
    ) -> GfxResult<Self> {
        Self::build(
            ctx,
            shader,
            vertices,
            indices,
            draw_mode,
            ObjectKind::Shaded { material },
        )
    }

    fn build(
        ctx: &mut C,
        shader: Rc<Shader<C>>,
        vertices: Vec<f32>,
        indices: Vec<u32>,
        draw_mode: DrawMode,
        kind: ObjectKind<C>,
    ) -> GfxResult<Self> {
        let vertex_buffer = create_buffer(ctx, BufferTarget::Array, bytemuck::cast_slice(&vertices))?;
        let index_buffer =
            create_buffer(ctx, BufferTarget::ElementArray, bytemuck::cast_slice(&indices))?;
        let layout = kind.layout(vertices.len());
        let vertex_array = build_vertex_array(ctx, &shader, vertex_buffer, layout)?;
        log::debug!(
            "Object3D created: {} floats, {} indices, {:?}, shader '{}'",
            vertices.len(),
            indices.len(),
            layout,
            shader.label()
        );
        Ok(Self {
            shader,
            kind,
            vertices,
            indices,
            vertex_buffer,
            index_buffer,
            vertex_array,
            layout,
            draw_mode,
            model_matrix: Mat4::IDENTITY,
        })
    }

    /// Swap the shader and rebuild the vertex array against its attribute
    /// locations. The vertex layout itself does not change.
    pub fn set_shader(&mut self, ctx: &mut C, shader: Rc<Shader<C>>) -> GfxResult<()> {
        let vertex_array = build_vertex_array(ctx, &shader, self.vertex_buffer, self.layout)?;
        ctx.delete_vertex_array(self.vertex_array);
        self.vertex_array = vertex_array;
        self.shader = shader;
        Ok(())
    }

    pub fn set_draw_mode(&mut self, draw_mode: DrawMode) {
        self.draw_mode = draw_mode;
    }

    pub fn set_transformation(&mut self, model_matrix: Mat4) {
        self.model_matrix = model_matrix;
    }

    pub fn set_transform(&mut self, transform: &Transform) {
        self.model_matrix = transform.matrix();
    }

    /// Per-frame hook, called before `render`. Does nothing for now.
    pub fn update(&mut self) {}

    pub fn render(&self, ctx: &mut C) {
        match &self.kind {
            ObjectKind::Plain { .. } => self.draw(ctx),
            ObjectKind::Shaded { material } => {
                let material = material.borrow();
                self.shader
                    .scoped(ctx, |ctx| material.apply(&self.shader, ctx));
                with_texture_units(ctx, &material.texture_units(), |ctx| self.draw(ctx));
            }
        }
    }

    fn draw(&self, ctx: &mut C) {
        let count = self.indices.len() as i32;
        with_vertex_array(ctx, self.vertex_array, |ctx| {
            with_buffer(ctx, BufferTarget::ElementArray, self.index_buffer, |ctx| {
                self.shader.scoped(ctx, |ctx| {
                    self.shader
                        .set_uniform_mat4(ctx, UNIFORM_MODEL, &self.model_matrix);
                    ctx.draw_elements_u32(self.draw_mode, count, 0);
                });
            });
        });
    }

    pub fn destroy(self, ctx: &mut C) {
        ctx.delete_vertex_array(self.vertex_array);
        ctx.delete_buffer(self.vertex_buffer);
        ctx.delete_buffer(self.index_buffer);
    }

    pub fn shader(&self) -> &Rc<Shader<C>> {
        &self.shader
    }

    pub fn kind(&self) -> &ObjectKind<C> {
        &self.kind
    }

    pub fn material(&self) -> Option<&SharedMaterial<C>> {
        match &self.kind {
            ObjectKind::Plain { material } => material.as_ref(),
            ObjectKind::Shaded { material } => Some(material),
        }
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn vertex_array(&self) -> C::VertexArray {
        self.vertex_array
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn model_matrix(&self) -> &Mat4 {
        &self.model_matrix
    }
}

fn create_buffer<C: RenderContext>(
    ctx: &mut C,
    target: BufferTarget,
    bytes: &[u8],
) -> GfxResult<C::Buffer> {
    let buffer = ctx.create_buffer()?;
    with_buffer(ctx, target, buffer, |ctx| ctx.buffer_data(target, bytes));
    Ok(buffer)
}

/// Record `layout` into a new vertex array, skipping attributes the shader
/// does not declare.
fn build_vertex_array<C: RenderContext>(
    ctx: &mut C,
    shader: &Shader<C>,
    vertex_buffer: C::Buffer,
    layout: VertexLayout,
) -> GfxResult<C::VertexArray> {
    let vertex_array = ctx.create_vertex_array()?;
    let stride = layout.stride_bytes();
    with_vertex_array(ctx, vertex_array, |ctx| {
        with_buffer(ctx, BufferTarget::Array, vertex_buffer, |ctx| {
            for attr in layout.attributes() {
                let Some(location) = shader.attribute_location(ctx, attr.name) else {
                    log::debug!("Shader '{}' has no {}, skipped", shader.label(), attr.name);
                    continue;
                };
                ctx.enable_vertex_attrib_array(location);
                ctx.vertex_attrib_pointer_f32(location, attr.components, stride, attr.offset_bytes);
            }
        });
    });
    Ok(vertex_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UniformValue;
    use crate::material::{
        Material, UNIFORM_KA, UNIFORM_MAP_KD, UNIFORM_MAP_NORM, UNIFORM_SHININESS, UNIT_MAP_KD,
        UNIT_MAP_NORM,
    };
    use crate::recording::{AttribPointer, RecordingContext};
    use corelib::{Vec3, vec3};

    const FS: &str = "void main() {}";
    const VS_PLAIN: &str = "in vec3 a_position;\nin vec3 a_normal;\nvoid main() {}";
    const VS_TEXTURED: &str = "in vec3 a_position;\nin vec3 a_normal;\n\
        in vec3 a_tangent;\nin vec2 a_texture_coord;\nvoid main() {}";
    const VS_NO_TANGENT: &str =
        "in vec3 a_position;\nin vec3 a_normal;\nin vec2 a_texture_coord;\nvoid main() {}";
    const VS_POSITION_ONLY: &str = "in vec3 a_position;\nvoid main() {}";

    fn shader(ctx: &mut RecordingContext, vs: &str) -> Rc<Shader<RecordingContext>> {
        Rc::new(Shader::compile(ctx, "test", vs, FS).unwrap())
    }

    fn triangle() -> (Vec<f32>, Vec<u32>) {
        (
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            vec![0, 1, 2],
        )
    }

    fn pointers(ctx: &RecordingContext, obj: &Object3D<RecordingContext>) -> Vec<(u32, AttribPointer)> {
        ctx.vertex_array(obj.vertex_array())
            .unwrap()
            .pointers
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect()
    }

    #[test]
    fn triangle_issues_one_u32_draw_of_three() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let obj = Object3D::new(&mut ctx, s, v, i, DrawMode::Triangles).unwrap();

        obj.render(&mut ctx);

        let draws = ctx.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, DrawMode::Triangles);
        assert_eq!(draws[0].count, 3);
        assert_eq!(draws[0].offset, 0);
        assert_eq!(draws[0].uniforms[UNIFORM_MODEL], UniformValue::Mat4(Mat4::IDENTITY));
        assert!(ctx.errors().is_empty(), "{:?}", ctx.errors());
    }

    #[test]
    fn buffers_hold_packed_geometry() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let obj = Object3D::new(&mut ctx, s, v.clone(), i, DrawMode::Points).unwrap();
        obj.render(&mut ctx);

        let draw = &ctx.draws()[0];
        let ibo = draw.bindings.element_buffer.unwrap();
        assert_eq!(ctx.buffer(ibo).unwrap(), bytemuck::cast_slice::<u32, u8>(&[0, 1, 2]));
        let (_, position) = pointers(&ctx, &obj)[0];
        assert_eq!(ctx.buffer(position.buffer).unwrap(), bytemuck::cast_slice::<f32, u8>(&v));
        assert_eq!(draw.mode, DrawMode::Points);
    }

    #[test]
    fn planar_layout_puts_normals_at_half_the_buffer() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_PLAIN);
        let v = vec![0.0; 18]; // 3 positions + 3 normals
        let obj = Object3D::new(&mut ctx, s, v, vec![0, 1, 2], DrawMode::Triangles).unwrap();

        let ptrs = pointers(&ctx, &obj);
        assert_eq!(ptrs.len(), 2);
        assert_eq!((ptrs[0].1.stride, ptrs[0].1.offset), (0, 0));
        assert_eq!((ptrs[1].1.stride, ptrs[1].1.offset), (0, 36));
        assert_eq!(obj.layout().stride_floats(), 0);
    }

    #[test]
    fn render_restores_bind_points() {
        let mut ctx = RecordingContext::new();
        let tex = ctx.create_texture().unwrap();
        let s = shader(&mut ctx, VS_TEXTURED);
        let material = Material::default().with_map_kd(tex).with_map_norm(tex).shared();
        let obj = Object3D::shaded(
            &mut ctx,
            s,
            vec![0.0; 33],
            vec![0, 1, 2],
            DrawMode::Triangles,
            material,
        )
        .unwrap();

        let before = ctx.bindings().clone();
        obj.render(&mut ctx);
        obj.render(&mut ctx);
        assert_eq!(ctx.bindings(), &before);
        assert_eq!(ctx.draws().len(), 2);
        assert!(ctx.errors().is_empty(), "{:?}", ctx.errors());
    }

    #[test]
    fn interleaved_objects_render_back_to_back() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let a = Object3D::new(&mut ctx, s.clone(), v.clone(), i.clone(), DrawMode::Triangles).unwrap();
        let mut b = Object3D::new(&mut ctx, s, v, vec![0, 1, 2, 2, 1, 0], DrawMode::Triangles).unwrap();
        b.set_transformation(Mat4::from_translation(vec3(1.0, 0.0, 0.0)));

        a.render(&mut ctx);
        b.render(&mut ctx);

        let draws = ctx.draws();
        assert_eq!(draws[0].bindings.vertex_array, Some(a.vertex_array()));
        assert_eq!(draws[1].bindings.vertex_array, Some(b.vertex_array()));
        assert_eq!(draws[1].count, 6);
        assert_eq!(
            draws[1].uniforms[UNIFORM_MODEL],
            UniformValue::Mat4(Mat4::from_translation(vec3(1.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn set_shader_rebuilds_against_new_locations() {
        let mut ctx = RecordingContext::new();
        let full = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let mut obj = Object3D::new(&mut ctx, full, v, i, DrawMode::Triangles).unwrap();
        let old_vao = obj.vertex_array();
        assert_eq!(pointers(&ctx, &obj).len(), 2);

        let narrow = shader(&mut ctx, VS_POSITION_ONLY);
        obj.set_shader(&mut ctx, narrow.clone()).unwrap();

        assert!(ctx.vertex_array(old_vao).is_none());
        assert_ne!(obj.vertex_array(), old_vao);
        assert_eq!(pointers(&ctx, &obj).len(), 1);
        assert!(Rc::ptr_eq(obj.shader(), &narrow));

        obj.render(&mut ctx);
        assert_eq!(ctx.draws()[0].bindings.program, Some(narrow.program()));
    }

    #[test]
    fn shaded_stride_is_six_without_textures() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_TEXTURED);
        let obj = Object3D::shaded(
            &mut ctx,
            s,
            vec![0.0; 18],
            vec![0, 1, 2],
            DrawMode::Triangles,
            Material::default().shared(),
        )
        .unwrap();

        assert_eq!(obj.layout().stride_floats(), 6);
        let ptrs = pointers(&ctx, &obj);
        // Tangent and UV are declared by the shader but not bound.
        assert_eq!(ptrs.len(), 2);
        assert!(ptrs.iter().all(|(_, p)| p.stride == 24));
        assert_eq!(ptrs[1].1.offset, 12);
    }

    #[test]
    fn shaded_stride_is_frozen_at_construction() {
        let mut ctx = RecordingContext::new();
        let tex = ctx.create_texture().unwrap();
        let s = shader(&mut ctx, VS_TEXTURED);
        let material = Material::default().with_map_kd(tex).shared();
        let mut obj = Object3D::shaded(
            &mut ctx,
            s.clone(),
            vec![0.0; 33],
            vec![0, 1, 2],
            DrawMode::Triangles,
            material.clone(),
        )
        .unwrap();

        let ptrs = pointers(&ctx, &obj);
        assert_eq!(ptrs.len(), 4);
        assert!(ptrs.iter().all(|(_, p)| p.stride == 44));
        let offsets: Vec<i32> = ptrs.iter().map(|(_, p)| p.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36]);

        material.borrow_mut().map_kd = None;
        obj.set_shader(&mut ctx, s).unwrap();
        assert_eq!(obj.layout().stride_floats(), 11);
        assert!(pointers(&ctx, &obj).iter().all(|(_, p)| p.stride == 44));
    }

    #[test]
    fn missing_tangent_is_skipped_not_fatal() {
        let mut ctx = RecordingContext::new();
        let tex = ctx.create_texture().unwrap();
        let s = shader(&mut ctx, VS_NO_TANGENT);
        let obj = Object3D::shaded(
            &mut ctx,
            s.clone(),
            vec![0.0; 33],
            vec![0, 1, 2],
            DrawMode::Triangles,
            Material::default().with_map_kd(tex).shared(),
        )
        .unwrap();

        let ptrs = pointers(&ctx, &obj);
        let uv_loc = s.attribute_location(&ctx, ATTR_TEXTURE_COORD).unwrap();
        assert_eq!(ptrs.len(), 3);
        let uv = ptrs.iter().find(|(loc, _)| *loc == uv_loc).unwrap().1;
        assert_eq!((uv.components, uv.offset), (2, 36));
    }

    #[test]
    fn shaded_render_feeds_material_before_draw() {
        let mut ctx = RecordingContext::new();
        let kd_tex = ctx.create_texture().unwrap();
        let norm_tex = ctx.create_texture().unwrap();
        let s = shader(&mut ctx, VS_TEXTURED);
        let material = Material::new(Vec3::splat(0.2), Vec3::ONE, Vec3::ZERO, 64.0)
            .with_map_kd(kd_tex)
            .with_map_norm(norm_tex)
            .shared();
        let obj = Object3D::shaded(
            &mut ctx,
            s,
            vec![0.0; 33],
            vec![0, 1, 2],
            DrawMode::Triangles,
            material,
        )
        .unwrap();

        obj.render(&mut ctx);

        let draw = &ctx.draws()[0];
        assert_eq!(draw.uniforms[UNIFORM_KA], UniformValue::Vec3(Vec3::splat(0.2)));
        assert_eq!(draw.uniforms[UNIFORM_SHININESS], UniformValue::F32(64.0));
        assert_eq!(draw.uniforms[UNIFORM_MAP_KD], UniformValue::I32(0));
        assert_eq!(draw.uniforms[UNIFORM_MAP_NORM], UniformValue::I32(2));
        assert_eq!(draw.bindings.textures_2d.get(&UNIT_MAP_KD), Some(&kd_tex));
        assert_eq!(draw.bindings.textures_2d.get(&UNIT_MAP_NORM), Some(&norm_tex));
        assert_eq!(draw.bindings.textures_2d.get(&1), None);
    }

    #[test]
    fn plain_object_ignores_its_material() {
        let mut ctx = RecordingContext::new();
        let tex = ctx.create_texture().unwrap();
        let s = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let material = Material::default().with_map_kd(tex).shared();
        let obj =
            Object3D::with_material(&mut ctx, s, v, i, DrawMode::Triangles, material).unwrap();

        obj.render(&mut ctx);

        assert!(obj.material().is_some());
        let draw = &ctx.draws()[0];
        assert!(!draw.uniforms.contains_key(UNIFORM_KA));
        assert!(draw.bindings.textures_2d.is_empty());
    }

    #[test]
    fn transform_and_draw_mode_setters() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let mut obj = Object3D::new(&mut ctx, s, v, i, DrawMode::Triangles).unwrap();
        assert_eq!(obj.model_matrix(), &Mat4::IDENTITY);

        let t = Transform::from_trs(vec3(0.0, 2.0, 0.0), Vec3::ZERO, Vec3::ONE);
        obj.set_transform(&t);
        obj.set_draw_mode(DrawMode::Points);
        obj.update();

        assert_eq!(obj.model_matrix(), &t.matrix());
        assert_eq!(obj.draw_mode(), DrawMode::Points);
    }

    #[test]
    fn destroy_releases_all_gpu_objects() {
        let mut ctx = RecordingContext::new();
        let s = shader(&mut ctx, VS_PLAIN);
        let (v, i) = triangle();
        let obj = Object3D::new(&mut ctx, s.clone(), v, i, DrawMode::Triangles).unwrap();
        obj.destroy(&mut ctx);
        // Only the program remains.
        assert_eq!(ctx.live_objects(), 1);
        assert!(ctx.errors().is_empty());
    }
}
