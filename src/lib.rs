//! doorbox
//!
//! A cross-platform (native and WASM) wgpu demo: a subdivided box wearing a
//! full door texture set, spinning under an orbit camera. Textures load on
//! background tasks and appear as they arrive; the render loop never waits
//! for them.
//!
//! High-level modules
//! - `app`: window, event loop and per-frame orchestration
//! - `camera`: camera, projection and the damped orbit controller
//! - `context`: surface, device and swapchain configuration
//! - `data_structures`: geometry, textures, materials, meshes and the scene
//! - `driver`: the frame loop state machine and clock abstraction
//! - `panel`: runtime-tunable parameters
//! - `pipelines`: render pipeline and shader
//! - `resources`: asset fetching and the batch texture loader
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod driver;
pub mod panel;
pub mod pipelines;
pub mod resources;

pub use app::{DemoConfig, run};
pub use driver::{Frame, FrameClock, LoopState, ManualClock, MonotonicClock, RenderLoop};
pub use resources::loader::{LoadProgress, LoadingManager};
