//! Headless demo for prism3d.
//! Builds a plain and a material-shaded cube, runs a few update/render
//! frames on the recording backend and reports what reached the "GPU".

use std::rc::Rc;

use anyhow::{Context, Result};
use asset::{MeshData, TextureData, obj};
use corelib::{Transform, Vec3, vec3};
use renderer::{
    DrawMode, LoadState, Material, Object3D, RecordingContext, RenderContext, Shader, Texture,
};

const PLAIN_VS: &str = include_str!("shaders/plain.vert");
const PLAIN_FS: &str = include_str!("shaders/plain.frag");
const PHONG_VS: &str = include_str!("shaders/phong.vert");
const PHONG_FS: &str = include_str!("shaders/phong.frag");
const CUBE_OBJ: &str = include_str!("../assets/cube.obj");

struct Options {
    frames: u32,
    texture: Option<String>,
    mesh: Option<String>,
    flip_y: bool,
}

fn parse_options() -> Options {
    let mut opts = Options {
        frames: 3,
        texture: None,
        mesh: None,
        flip_y: true,
    };
    for arg in std::env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("--frames=") {
            match v.parse::<u32>() {
                Ok(n) => opts.frames = n,
                Err(_) => log::warn!("Ignoring bad frame count '{}'", v),
            }
        } else if let Some(v) = arg.strip_prefix("--texture=") {
            opts.texture = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--mesh=") {
            opts.mesh = Some(v.to_string());
        } else if arg == "--no-flip" {
            opts.flip_y = false;
        } else {
            log::warn!("Unknown argument '{}'", arg);
        }
    }
    opts
}

struct Scene<C: RenderContext> {
    textures: Vec<Texture<C>>,
    objects: Vec<Object3D<C>>,
    transform: Transform,
}

impl<C: RenderContext> Scene<C> {
    fn build(ctx: &mut C, opts: &Options) -> Result<Self> {
        let mesh: MeshData = match &opts.mesh {
            Some(path) => obj::load_obj_from_path(path)?,
            None => obj::load_obj_from_str(CUBE_OBJ).context("Built-in cube")?,
        };

        let diffuse = match &opts.texture {
            Some(path) => Texture::with_flip(ctx, path.as_str(), opts.flip_y)?,
            None => Texture::spawn(ctx, "checkerboard", || Ok(TextureData::checkerboard(64)))?,
        };
        let material = Material::new(Vec3::splat(0.1), Vec3::ONE, Vec3::splat(0.6), 48.0)
            .with_map_kd(diffuse.gl_texture())
            .shared();

        let plain_shader = Rc::new(Shader::compile(ctx, "plain", PLAIN_VS, PLAIN_FS)?);
        let phong_shader = Rc::new(Shader::compile(ctx, "phong", PHONG_VS, PHONG_FS)?);

        let mut plain = Object3D::new(
            ctx,
            plain_shader,
            mesh.planar(),
            mesh.indices.clone(),
            DrawMode::Triangles,
        )?;
        plain.set_transform(&Transform::from_trs(
            vec3(-2.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::ONE,
        ));

        let textured = material.borrow().has_texture();
        let shaded = Object3D::shaded(
            ctx,
            phong_shader,
            mesh.interleaved(textured),
            mesh.indices.clone(),
            DrawMode::Triangles,
            material,
        )?;

        Ok(Self {
            textures: vec![diffuse],
            objects: vec![plain, shaded],
            transform: Transform::identity(),
        })
    }

    fn frame(&mut self, ctx: &mut C, dt: f32) {
        for tex in &mut self.textures {
            if let LoadState::Ready { width, height, .. } = tex.poll(ctx) {
                log::trace!("'{}' ready ({}x{})", tex.filename(), width, height);
            }
        }

        self.transform = self.transform.rotated(vec3(0.5 * dt, dt, 0.0));
        if let Some(shaded) = self.objects.last_mut() {
            shaded.set_transform(&self.transform);
        }

        for obj in &mut self.objects {
            obj.update();
        }
        for obj in &self.objects {
            obj.render(ctx);
        }
    }

    /// Block on outstanding texture loads so the last frames sample real data.
    fn finish_loading(&mut self, ctx: &mut C) {
        for tex in &mut self.textures {
            let state = tex.wait(ctx);
            log::info!("Texture '{}': {:?}", tex.filename(), state);
        }
    }

    fn destroy(self, ctx: &mut C) {
        let mut shaders = Vec::new();
        for obj in self.objects {
            shaders.push(Rc::clone(obj.shader()));
            obj.destroy(ctx);
        }
        for shader in shaders {
            if let Ok(shader) = Rc::try_unwrap(shader) {
                shader.destroy(ctx);
            }
        }
        for tex in self.textures {
            tex.destroy(ctx);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_options();
    log::info!(
        "Starting prism3d demo: frames={}, texture={:?}, mesh={:?}, flip_y={}",
        opts.frames,
        opts.texture,
        opts.mesh,
        opts.flip_y
    );

    let mut ctx = RecordingContext::new();
    let mut scene = Scene::build(&mut ctx, &opts)?;

    let dt = 1.0 / 60.0;
    for i in 0..opts.frames {
        if i + 1 == opts.frames {
            scene.finish_loading(&mut ctx);
        }
        scene.frame(&mut ctx, dt);
    }
    scene.destroy(&mut ctx);

    log::info!(
        "Issued {} draw calls, {} live GPU objects left",
        ctx.draws().len(),
        ctx.live_objects()
    );
    for err in ctx.errors() {
        log::warn!("Context reported: {}", err);
    }
    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
