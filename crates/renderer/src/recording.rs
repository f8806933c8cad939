//! In-memory `RenderContext` that tracks bind points and object state.
//!
//! No pixels are produced. Instead the context keeps what a driver would
//! keep: which objects are bound where, how each vertex array maps its
//! attributes, texture parameters and mip levels, uniform values per program,
//! and a log of every draw. Misuse that a GL driver would flag (setting a
//! uniform with no program, drawing without a vertex array, ...) is collected
//! in [`RecordingContext::errors`].
//!
//! Programs are "compiled" by scanning the vertex source for `in`
//! declarations; attribute locations follow declaration order. Uniform
//! lookups always succeed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use asset::texture::mip_level_count;
use corelib::{GfxError, GfxResult, ShaderStage};

use crate::context::{
    BufferTarget, DrawMode, RenderContext, TextureFilter, TextureParameter, TextureWrap,
    UniformValue,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexArrayId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub program: ProgramId,
    pub name: String,
}

/// Snapshot of every bind point the renderer touches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    pub array_buffer: Option<BufferId>,
    pub element_buffer: Option<BufferId>,
    pub vertex_array: Option<VertexArrayId>,
    pub program: Option<ProgramId>,
    pub active_unit: u32,
    /// Unit -> bound 2D texture. Units with nothing bound are absent.
    pub textures_2d: BTreeMap<u32, TextureId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttribPointer {
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
    pub buffer: BufferId,
}

#[derive(Clone, Debug, Default)]
pub struct VertexArrayRecord {
    pub enabled: BTreeSet<u32>,
    pub pointers: BTreeMap<u32, AttribPointer>,
}

#[derive(Clone, Debug)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    /// 0 until level 0 is uploaded.
    pub mip_levels: u32,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for TextureRecord {
    // GL initial state.
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            mip_levels: 0,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            min_filter: TextureFilter::NearestMipmapLinear,
            mag_filter: TextureFilter::Linear,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProgramRecord {
    pub attributes: Vec<String>,
    pub uniforms: BTreeMap<String, UniformValue>,
}

#[derive(Clone, Debug)]
pub struct DrawCall {
    pub mode: DrawMode,
    pub count: i32,
    pub offset: i32,
    pub bindings: Bindings,
    /// Uniform values of the active program at draw time.
    pub uniforms: BTreeMap<String, UniformValue>,
}

#[derive(Default)]
pub struct RecordingContext {
    next_id: u32,
    bindings: Bindings,
    buffers: HashMap<BufferId, Vec<u8>>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayRecord>,
    textures: HashMap<TextureId, TextureRecord>,
    programs: HashMap<ProgramId, ProgramRecord>,
    draws: Vec<DrawCall>,
    errors: Vec<String>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn error(&mut self, message: String) {
        log::warn!("GL error: {}", message);
        self.errors.push(message);
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn buffer(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> Option<&VertexArrayRecord> {
        self.vertex_arrays.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureRecord> {
        self.textures.get(&id)
    }

    pub fn program(&self, id: ProgramId) -> Option<&ProgramRecord> {
        self.programs.get(&id)
    }

    pub fn live_objects(&self) -> usize {
        self.buffers.len() + self.vertex_arrays.len() + self.textures.len() + self.programs.len()
    }

    /// Record for the texture bound on the active unit, flagging misuse.
    fn bound_texture_mut(&mut self, op: &str) -> Option<&mut TextureRecord> {
        let unit = self.bindings.active_unit;
        let Some(id) = self.bindings.textures_2d.get(&unit).copied() else {
            self.error(format!("{} with no texture bound on unit {}", op, unit));
            return None;
        };
        self.textures.get_mut(&id)
    }
}

/// Attribute names from `in <type> <name>;` lines, `layout(...)` prefixes allowed.
fn scan_attributes(vertex_src: &str) -> Vec<String> {
    vertex_src
        .lines()
        .filter_map(|line| {
            let mut line = line.trim();
            if line.starts_with("layout") {
                line = line.split_once(')')?.1.trim();
            }
            let mut tokens = line.split_whitespace();
            if tokens.next()? != "in" {
                return None;
            }
            let _ty = tokens.next()?;
            let name = tokens.next()?.trim_end_matches(';');
            Some(name.to_string())
        })
        .collect()
}

impl RenderContext for RecordingContext {
    type Buffer = BufferId;
    type VertexArray = VertexArrayId;
    type Texture = TextureId;
    type Program = ProgramId;
    type UniformLocation = UniformSlot;

    fn create_buffer(&mut self) -> GfxResult<BufferId> {
        let id = BufferId(self.next());
        self.buffers.insert(id, Vec::new());
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            self.error(format!("delete of unknown buffer {:?}", buffer));
        }
        if self.bindings.array_buffer == Some(buffer) {
            self.bindings.array_buffer = None;
        }
        if self.bindings.element_buffer == Some(buffer) {
            self.bindings.element_buffer = None;
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if let Some(id) = buffer
            && !self.buffers.contains_key(&id)
        {
            self.error(format!("bind of unknown buffer {:?}", id));
            return;
        }
        match target {
            BufferTarget::Array => self.bindings.array_buffer = buffer,
            BufferTarget::ElementArray => self.bindings.element_buffer = buffer,
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        let bound = match target {
            BufferTarget::Array => self.bindings.array_buffer,
            BufferTarget::ElementArray => self.bindings.element_buffer,
        };
        match bound.and_then(|id| self.buffers.get_mut(&id)) {
            Some(store) => *store = data.to_vec(),
            None => self.error(format!("buffer_data with nothing bound to {:?}", target)),
        }
    }

    fn create_vertex_array(&mut self) -> GfxResult<VertexArrayId> {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id, VertexArrayRecord::default());
        Ok(id)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            self.error(format!("delete of unknown vertex array {:?}", vertex_array));
        }
        if self.bindings.vertex_array == Some(vertex_array) {
            self.bindings.vertex_array = None;
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        if let Some(id) = vertex_array
            && !self.vertex_arrays.contains_key(&id)
        {
            self.error(format!("bind of unknown vertex array {:?}", id));
            return;
        }
        self.bindings.vertex_array = vertex_array;
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        match self
            .bindings
            .vertex_array
            .and_then(|id| self.vertex_arrays.get_mut(&id))
        {
            Some(vao) => {
                vao.enabled.insert(location);
            }
            None => self.error("enable_vertex_attrib_array with no vertex array bound".into()),
        }
    }

    fn vertex_attrib_pointer_f32(&mut self, location: u32, components: i32, stride: i32, offset: i32) {
        let Some(buffer) = self.bindings.array_buffer else {
            self.error("vertex_attrib_pointer with no array buffer bound".into());
            return;
        };
        match self
            .bindings
            .vertex_array
            .and_then(|id| self.vertex_arrays.get_mut(&id))
        {
            Some(vao) => {
                vao.pointers.insert(
                    location,
                    AttribPointer {
                        components,
                        stride,
                        offset,
                        buffer,
                    },
                );
            }
            None => self.error("vertex_attrib_pointer with no vertex array bound".into()),
        }
    }

    fn create_texture(&mut self) -> GfxResult<TextureId> {
        let id = TextureId(self.next());
        self.textures.insert(id, TextureRecord::default());
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            self.error(format!("delete of unknown texture {:?}", texture));
        }
        self.bindings.textures_2d.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&mut self, unit: u32) {
        self.bindings.active_unit = unit;
    }

    fn bind_texture_2d(&mut self, texture: Option<TextureId>) {
        let unit = self.bindings.active_unit;
        match texture {
            Some(id) if !self.textures.contains_key(&id) => {
                self.error(format!("bind of unknown texture {:?}", id));
            }
            Some(id) => {
                self.bindings.textures_2d.insert(unit, id);
            }
            None => {
                self.bindings.textures_2d.remove(&unit);
            }
        }
    }

    fn tex_image_2d_rgba8(&mut self, width: u32, height: u32, pixels: &[u8]) {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            self.error(format!(
                "tex_image_2d: {} bytes for {}x{} RGBA",
                pixels.len(),
                width,
                height
            ));
            return;
        }
        if let Some(tex) = self.bound_texture_mut("tex_image_2d") {
            tex.width = width;
            tex.height = height;
            tex.mip_levels = 1;
        }
    }

    fn generate_mipmap_2d(&mut self) {
        if let Some(tex) = self.bound_texture_mut("generate_mipmap") {
            tex.mip_levels = mip_level_count(tex.width, tex.height);
        }
    }

    fn tex_parameter_2d(&mut self, parameter: TextureParameter) {
        if let Some(tex) = self.bound_texture_mut("tex_parameter") {
            match parameter {
                TextureParameter::WrapS(w) => tex.wrap_s = w,
                TextureParameter::WrapT(w) => tex.wrap_t = w,
                TextureParameter::MinFilter(f) => tex.min_filter = f,
                TextureParameter::MagFilter(f) => tex.mag_filter = f,
            }
        }
    }

    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> GfxResult<ProgramId> {
        for (stage, src) in [
            (ShaderStage::Vertex, vertex_src),
            (ShaderStage::Fragment, fragment_src),
        ] {
            if !src.contains("void main") {
                return Err(GfxError::Compile {
                    stage,
                    log: "no entry point `main`".into(),
                });
            }
        }
        let id = ProgramId(self.next());
        let attributes = scan_attributes(vertex_src);
        log::debug!("Recorded program {:?} with attributes {:?}", id, attributes);
        self.programs.insert(
            id,
            ProgramRecord {
                attributes,
                uniforms: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            self.error(format!("delete of unknown program {:?}", program));
        }
        if self.bindings.program == Some(program) {
            self.bindings.program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program
            && !self.programs.contains_key(&id)
        {
            self.error(format!("use of unknown program {:?}", id));
            return;
        }
        self.bindings.program = program;
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let record = self.programs.get(&program)?;
        record
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot> {
        self.programs.contains_key(&program).then(|| UniformSlot {
            program,
            name: name.to_string(),
        })
    }

    fn set_uniform(&mut self, location: &UniformSlot, value: UniformValue) {
        if self.bindings.program != Some(location.program) {
            self.error(format!(
                "uniform {} set on {:?} while {:?} is in use",
                location.name, location.program, self.bindings.program
            ));
            return;
        }
        if let Some(record) = self.programs.get_mut(&location.program) {
            record.uniforms.insert(location.name.clone(), value);
        }
    }

    fn draw_elements_u32(&mut self, mode: DrawMode, count: i32, offset: i32) {
        let Some(program) = self.bindings.program else {
            self.error("draw with no program in use".into());
            return;
        };
        if self.bindings.vertex_array.is_none() {
            self.error("draw with no vertex array bound".into());
            return;
        }
        let Some(ibo) = self.bindings.element_buffer else {
            self.error("draw with no element buffer bound".into());
            return;
        };
        let available = self.buffers.get(&ibo).map_or(0, |b| b.len() / 4) as i64;
        if i64::from(offset) / 4 + i64::from(count) > available {
            self.error(format!(
                "draw of {} indices at offset {} overruns element buffer of {}",
                count, offset, available
            ));
        }
        let uniforms = self
            .programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default();
        self.draws.push(DrawCall {
            mode,
            count,
            offset,
            bindings: self.bindings.clone(),
            uniforms,
        });
    }
}
