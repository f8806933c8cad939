//! CPU-side asset data: decoded textures, meshes and the OBJ loader.
//! Nothing here touches a rendering context.

pub mod mesh;
pub mod obj;
pub mod texture;

pub use mesh::{MeshData, MeshVertex};
pub use texture::{TextureData, TextureFormat};
