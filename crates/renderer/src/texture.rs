//! GPU texture whose pixels arrive from a background decode.
//!
//! The handle exists as soon as [`Texture::new`] returns and can be put into
//! a [`Material`](crate::Material) right away. Its content is undefined until
//! the decode finishes and the owner calls [`Texture::poll`] or
//! [`Texture::wait`] on the thread that owns the context. A started decode
//! cannot be cancelled; dropping the texture only discards the result.

use std::thread;

use asset::TextureData;
use corelib::GfxResult;
use futures::channel::oneshot;

use crate::binding::with_texture_2d;
use crate::context::{RenderContext, TextureFilter, TextureParameter, TextureWrap};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready {
        width: u32,
        height: u32,
        mip_levels: u32,
    },
    Failed,
}

type Decoded = anyhow::Result<TextureData>;

pub struct Texture<C: RenderContext> {
    filename: String,
    handle: C::Texture,
    pending: Option<oneshot::Receiver<Decoded>>,
    state: LoadState,
}

impl<C: RenderContext> Texture<C> {
    /// Load `filename`, flipping rows so UV (0, 0) is the bottom-left corner.
    pub fn new(ctx: &mut C, filename: impl Into<String>) -> GfxResult<Self> {
        Self::with_flip(ctx, filename, true)
    }

    pub fn with_flip(ctx: &mut C, filename: impl Into<String>, flip_y: bool) -> GfxResult<Self> {
        let filename = filename.into();
        let path = filename.clone();
        Self::spawn(ctx, filename, move || TextureData::load(&path, flip_y))
    }

    /// Allocate the handle now and run `loader` on its own thread.
    pub fn spawn<F>(ctx: &mut C, filename: impl Into<String>, loader: F) -> GfxResult<Self>
    where
        F: FnOnce() -> Decoded + Send + 'static,
    {
        let filename = filename.into();
        let handle = ctx.create_texture()?;
        let (tx, rx) = oneshot::channel();
        thread::spawn(move || {
            // Receiver gone means the texture was dropped; nothing to do.
            let _ = tx.send(loader());
        });
        log::debug!("Texture {:?} allocated, loading '{}'", handle, filename);
        Ok(Self {
            filename,
            handle,
            pending: Some(rx),
            state: LoadState::Pending,
        })
    }

    /// Upload the decoded image if it has arrived. Never blocks.
    pub fn poll(&mut self, ctx: &mut C) -> LoadState {
        let Some(rx) = self.pending.as_mut() else {
            return self.state;
        };
        match rx.try_recv() {
            Ok(None) => {}
            Ok(Some(decoded)) => {
                self.pending = None;
                self.complete(ctx, decoded);
            }
            Err(oneshot::Canceled) => {
                self.pending = None;
                self.complete(ctx, Err(anyhow::anyhow!("loader thread exited early")));
            }
        }
        self.state
    }

    /// Block until the decode finishes, then upload.
    pub fn wait(&mut self, ctx: &mut C) -> LoadState {
        if let Some(rx) = self.pending.take() {
            let decoded = pollster::block_on(rx)
                .unwrap_or_else(|_| Err(anyhow::anyhow!("loader thread exited early")));
            self.complete(ctx, decoded);
        }
        self.state
    }

    fn complete(&mut self, ctx: &mut C, decoded: Decoded) {
        self.state = match decoded {
            Ok(data) => self.upload(ctx, &data),
            Err(e) => {
                log::warn!("Texture '{}' failed to load: {:#}", self.filename, e);
                LoadState::Failed
            }
        };
    }

    fn upload(&self, ctx: &mut C, data: &TextureData) -> LoadState {
        with_texture_2d(ctx, self.handle, |ctx| {
            ctx.tex_image_2d_rgba8(data.width, data.height, &data.data);
            ctx.generate_mipmap_2d();
            ctx.tex_parameter_2d(TextureParameter::WrapS(TextureWrap::Repeat));
            ctx.tex_parameter_2d(TextureParameter::WrapT(TextureWrap::Repeat));
            ctx.tex_parameter_2d(TextureParameter::MinFilter(TextureFilter::LinearMipmapLinear));
            ctx.tex_parameter_2d(TextureParameter::MagFilter(TextureFilter::Linear));
        });
        let mip_levels = data.mip_level_count();
        log::debug!(
            "Texture '{}' uploaded: {}x{}, {} mip levels",
            self.filename,
            data.width,
            data.height,
            mip_levels
        );
        LoadState::Ready {
            width: data.width,
            height: data.height,
            mip_levels,
        }
    }

    /// Valid from construction on; content only after the load completes.
    pub fn gl_texture(&self) -> C::Texture {
        self.handle
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready { .. })
    }

    pub fn destroy(self, ctx: &mut C) {
        ctx.delete_texture(self.handle);
    }
}
