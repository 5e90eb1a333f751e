//! Render pipeline construction.

pub mod standard;
