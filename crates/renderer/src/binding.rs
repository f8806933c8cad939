//! Scoped bind / unbind pairs.
//!
//! Each helper binds an object, runs the closure and restores the bind point
//! to its neutral state (nothing bound, texture unit 0), so render calls of
//! different objects can be interleaved on one context.

use crate::context::{BufferTarget, RenderContext};

pub fn with_vertex_array<C: RenderContext, R>(
    ctx: &mut C,
    vertex_array: C::VertexArray,
    f: impl FnOnce(&mut C) -> R,
) -> R {
    ctx.bind_vertex_array(Some(vertex_array));
    let out = f(ctx);
    ctx.bind_vertex_array(None);
    out
}

pub fn with_buffer<C: RenderContext, R>(
    ctx: &mut C,
    target: BufferTarget,
    buffer: C::Buffer,
    f: impl FnOnce(&mut C) -> R,
) -> R {
    ctx.bind_buffer(target, Some(buffer));
    let out = f(ctx);
    ctx.bind_buffer(target, None);
    out
}

/// Bind `texture` on unit 0.
pub fn with_texture_2d<C: RenderContext, R>(
    ctx: &mut C,
    texture: C::Texture,
    f: impl FnOnce(&mut C) -> R,
) -> R {
    with_texture_units(ctx, &[(0, texture)], f)
}

/// Bind each `(unit, texture)` pair, run `f`, then unbind them all and
/// leave unit 0 active.
///
/// Units are reset to neutral, not to whatever was bound before the call.
pub fn with_texture_units<C: RenderContext, R>(
    ctx: &mut C,
    units: &[(u32, C::Texture)],
    f: impl FnOnce(&mut C) -> R,
) -> R {
    for &(unit, texture) in units {
        ctx.active_texture(unit);
        ctx.bind_texture_2d(Some(texture));
    }
    if !units.is_empty() {
        ctx.active_texture(0);
    }
    let out = f(ctx);
    for &(unit, _) in units {
        ctx.active_texture(unit);
        ctx.bind_texture_2d(None);
    }
    ctx.active_texture(0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Bindings, RecordingContext};

    #[test]
    fn nested_scopes_restore_neutral_state() {
        let mut ctx = RecordingContext::new();
        let vao = ctx.create_vertex_array().unwrap();
        let ibo = ctx.create_buffer().unwrap();
        let tex = ctx.create_texture().unwrap();

        let seen = with_vertex_array(&mut ctx, vao, |ctx| {
            with_buffer(ctx, BufferTarget::ElementArray, ibo, |ctx| {
                with_texture_units(ctx, &[(1, tex), (2, tex)], |ctx| ctx.bindings().clone())
            })
        });

        assert_eq!(seen.vertex_array, Some(vao));
        assert_eq!(seen.element_buffer, Some(ibo));
        assert_eq!(seen.textures_2d.len(), 2);
        assert_eq!(ctx.bindings(), &Bindings::default());
    }

    #[test]
    fn texture_scope_resets_to_neutral_not_prior_binding() {
        let mut ctx = RecordingContext::new();
        let outer = ctx.create_texture().unwrap();
        let inner = ctx.create_texture().unwrap();
        ctx.active_texture(1);
        ctx.bind_texture_2d(Some(outer));

        with_texture_units(&mut ctx, &[(1, inner)], |_| ());

        assert_eq!(ctx.bindings().active_unit, 0);
        assert!(ctx.bindings().textures_2d.get(&1).is_none());
    }
}
