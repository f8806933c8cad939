//! Phong-style material record and how it is fed to a shader.

use std::cell::RefCell;
use std::rc::Rc;

use corelib::Vec3;

use crate::context::RenderContext;
use crate::shader::Shader;

pub const UNIFORM_KA: &str = "u_material.kA";
pub const UNIFORM_KD: &str = "u_material.kD";
pub const UNIFORM_KS: &str = "u_material.kS";
pub const UNIFORM_SHININESS: &str = "u_material.shininess";
pub const UNIFORM_MAP_KD: &str = "u_material.map_kD";
pub const UNIFORM_MAP_NS: &str = "u_material.map_nS";
pub const UNIFORM_MAP_NORM: &str = "u_material.map_norm";

/// Fixed texture unit per map.
pub const UNIT_MAP_KD: u32 = 0;
pub const UNIT_MAP_NS: u32 = 1;
pub const UNIT_MAP_NORM: u32 = 2;

/// Material shared between the objects drawn with it and whoever edits it.
pub type SharedMaterial<C> = Rc<RefCell<Material<C>>>;

/// Colors, shininess and up to three texture maps (diffuse, specular
/// power, normal). Maps hold texture handles owned by a [`crate::Texture`].
pub struct Material<C: RenderContext> {
    pub ka: Vec3,
    pub kd: Vec3,
    pub ks: Vec3,
    pub shininess: f32,
    pub map_kd: Option<C::Texture>,
    pub map_ns: Option<C::Texture>,
    pub map_norm: Option<C::Texture>,
}

impl<C: RenderContext> Clone for Material<C> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<C: RenderContext> Default for Material<C> {
    fn default() -> Self {
        Self {
            ka: Vec3::splat(0.1),
            kd: Vec3::splat(0.8),
            ks: Vec3::splat(0.5),
            shininess: 32.0,
            map_kd: None,
            map_ns: None,
            map_norm: None,
        }
    }
}

impl<C: RenderContext> Material<C> {
    pub fn new(ka: Vec3, kd: Vec3, ks: Vec3, shininess: f32) -> Self {
        Self {
            ka,
            kd,
            ks,
            shininess,
            ..Self::default()
        }
    }

    pub fn with_map_kd(mut self, texture: C::Texture) -> Self {
        self.map_kd = Some(texture);
        self
    }

    pub fn with_map_ns(mut self, texture: C::Texture) -> Self {
        self.map_ns = Some(texture);
        self
    }

    pub fn with_map_norm(mut self, texture: C::Texture) -> Self {
        self.map_norm = Some(texture);
        self
    }

    pub fn shared(self) -> SharedMaterial<C> {
        Rc::new(RefCell::new(self))
    }

    /// True when any map is present; textured meshes carry tangents and UVs.
    pub fn has_texture(&self) -> bool {
        self.has_map_kd() || self.has_map_ns() || self.has_map_norm()
    }

    pub fn has_map_kd(&self) -> bool {
        self.map_kd.is_some()
    }

    pub fn has_map_ns(&self) -> bool {
        self.map_ns.is_some()
    }

    pub fn has_map_norm(&self) -> bool {
        self.map_norm.is_some()
    }

    pub fn map_kd(&self) -> Option<C::Texture> {
        self.map_kd
    }

    pub fn map_ns(&self) -> Option<C::Texture> {
        self.map_ns
    }

    pub fn map_norm(&self) -> Option<C::Texture> {
        self.map_norm
    }

    /// Present maps paired with their texture unit.
    pub fn texture_units(&self) -> Vec<(u32, C::Texture)> {
        self.maps()
            .filter_map(|(unit, _, tex)| tex.map(|t| (unit, t)))
            .collect()
    }

    fn maps(&self) -> impl Iterator<Item = (u32, &'static str, Option<C::Texture>)> {
        [
            (UNIT_MAP_KD, UNIFORM_MAP_KD, self.map_kd),
            (UNIT_MAP_NS, UNIFORM_MAP_NS, self.map_ns),
            (UNIT_MAP_NORM, UNIFORM_MAP_NORM, self.map_norm),
        ]
        .into_iter()
    }

    /// Upload colors and sampler units. `shader` must be in use.
    pub fn apply(&self, shader: &Shader<C>, ctx: &mut C) {
        shader.set_uniform_vec3(ctx, UNIFORM_KA, self.ka);
        shader.set_uniform_vec3(ctx, UNIFORM_KD, self.kd);
        shader.set_uniform_vec3(ctx, UNIFORM_KS, self.ks);
        shader.set_uniform_f32(ctx, UNIFORM_SHININESS, self.shininess);
        for (unit, uniform, tex) in self.maps() {
            if tex.is_some() {
                shader.set_uniform_i32(ctx, uniform, unit as i32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UniformValue;
    use crate::recording::RecordingContext;

    #[test]
    fn has_texture_tracks_any_map() {
        let mut ctx = RecordingContext::new();
        let tex = ctx.create_texture().unwrap();
        let plain = Material::<RecordingContext>::default();
        assert!(!plain.has_texture());
        let normal_only = plain.clone().with_map_norm(tex);
        assert!(normal_only.has_texture());
        assert!(!normal_only.has_map_kd());
        assert_eq!(normal_only.texture_units(), vec![(UNIT_MAP_NORM, tex)]);
    }

    #[test]
    fn apply_sets_colors_and_present_samplers_only() {
        let mut ctx = RecordingContext::new();
        let tex = ctx.create_texture().unwrap();
        let shader = Shader::compile(&mut ctx, "phong", "void main() {}", "void main() {}").unwrap();
        let material = Material::new(Vec3::ZERO, Vec3::ONE, Vec3::Y, 8.0).with_map_ns(tex);

        shader.scoped(&mut ctx, |ctx| material.apply(&shader, ctx));

        let uniforms = &ctx.program(shader.program()).unwrap().uniforms;
        assert_eq!(uniforms[UNIFORM_KD], UniformValue::Vec3(Vec3::ONE));
        assert_eq!(uniforms[UNIFORM_SHININESS], UniformValue::F32(8.0));
        assert_eq!(uniforms[UNIFORM_MAP_NS], UniformValue::I32(1));
        assert!(!uniforms.contains_key(UNIFORM_MAP_KD));
        assert!(!uniforms.contains_key(UNIFORM_MAP_NORM));
    }
}
