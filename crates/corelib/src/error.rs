//! Error type shared by every crate that talks to a rendering context.

use thiserror::Error;

/// Kind of GPU object a context failed to allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    VertexArray,
    Texture,
    Program,
    Shader,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::VertexArray => "vertex array",
            ResourceKind::Texture => "texture",
            ResourceKind::Program => "program",
            ResourceKind::Shader => "shader",
        };
        f.write_str(name)
    }
}

/// Shader pipeline stage, used in compile diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Error)]
pub enum GfxError {
    #[error("Failed to create {kind}: {message}")]
    Create { kind: ResourceKind, message: String },

    #[error("{stage:?} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("Program failed to link: {0}")]
    Link(String),
}

impl GfxError {
    pub fn create(kind: ResourceKind, message: impl Into<String>) -> Self {
        GfxError::Create {
            kind,
            message: message.into(),
        }
    }
}

pub type GfxResult<T> = Result<T, GfxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_error_names_the_resource() {
        let err = GfxError::create(ResourceKind::VertexArray, "out of handles");
        assert_eq!(
            err.to_string(),
            "Failed to create vertex array: out of handles"
        );
    }
}
