//! Core data types: geometry, textures, materials, meshes and the scene.

pub mod geometry;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;
