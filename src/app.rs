//! Application wiring and the winit event loop.
//!
//! [`run`] builds the window, the GPU context and the scene, then hands
//! control to winit. Texture fetches run on background tasks; every frame
//! the app drains whatever resolved, refreshes the material and draws. A
//! missing or failed texture never stalls the loop, the affected slot just
//! keeps rendering its placeholder.

use std::{iter, sync::Arc};

use cgmath::Deg;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    camera::{Camera, CameraResources, OrbitController, Projection, Viewport},
    context::Context,
    data_structures::{
        geometry::BoxGeometry,
        material::{self, Material, TextureSlots},
        mesh::Mesh,
        scene::{LightResources, Scene},
        texture::{SamplerConfig, Texture, TextureHandle, WrapMode},
    },
    driver::{MonotonicClock, RenderLoop},
    panel::DebugPanel,
    pipelines::standard::mk_standard_pipeline,
    resources::loader::{LoadingManager, TextureLoader},
};

/// Everything tunable about the demo, with defaults matching the door box.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Directory under `assets/` holding the texture set.
    pub texture_dir: String,
    /// Angular rates about the x and y axes in rad/s.
    pub rotation_rates: (f32, f32),
    pub segments: [u32; 3],
    pub box_size: f32,
    pub displacement_scale: f32,
    pub camera_distance: f32,
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub sensitivity: f32,
    pub damping: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            texture_dir: "textures/door".to_owned(),
            rotation_rates: (0.3, 0.6),
            segments: [100, 100, 100],
            box_size: 1.0,
            displacement_scale: 0.1,
            camera_distance: 2.0,
            fovy_degrees: 75.0,
            znear: 0.1,
            zfar: 100.0,
            sensitivity: 0.005,
            damping: 6.0,
        }
    }
}

/// Initialized application state: GPU context plus the scene and loop.
pub struct AppState {
    ctx: Context,
    viewport: Viewport,
    projection: Projection,
    camera_res: CameraResources,
    light_res: LightResources,
    scene: Scene,
    controller: OrbitController,
    loader: TextureLoader,
    // Loaded outside the manager's accounting; demonstrates the manual path.
    #[allow(dead_code)]
    manual_texture: TextureHandle,
    panel: DebugPanel,
    pipeline: wgpu::RenderPipeline,
    material_layout: wgpu::BindGroupLayout,
    driver: RenderLoop<MonotonicClock>,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &DemoConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let viewport = Viewport::new(ctx.config.width, ctx.config.height);
        let projection = Projection::new(
            viewport.width,
            viewport.height,
            Deg(config.fovy_degrees),
            config.znear,
            config.zfar,
        );
        let camera = Camera::new([0.0, 0.0, config.camera_distance], [0.0, 0.0, 0.0]);
        let controller = OrbitController::new(&camera, config.sensitivity, config.damping);
        let camera_res = CameraResources::new(&ctx.device);
        let mut scene = Scene::new(camera);
        let light_res = LightResources::new(&ctx.device, scene.light_uniform());

        // Only the color map carries sRGB data and a UV repeat.
        let color_sampling = SamplerConfig {
            wrap: WrapMode::Repeat,
            repeat: [1.0, 1.0],
            srgb: true,
        };
        let data_sampling = SamplerConfig {
            wrap: WrapMode::ClampToEdge,
            repeat: [1.0, 1.0],
            srgb: false,
        };
        // Placeholders are chosen so an unloaded slot is a no-op: flat
        // normal, zero height, full alpha and occlusion.
        let slots = TextureSlots {
            color: Texture::new("door_color", color_sampling, [255; 4]).into_handle(),
            alpha: Texture::new("door_alpha", data_sampling, [255; 4]).into_handle(),
            height: Texture::new("door_height", data_sampling, [0, 0, 0, 255]).into_handle(),
            normal: Texture::new("door_normal", data_sampling, [128, 128, 255, 255]).into_handle(),
            ambient_occlusion: Texture::new("door_ao", data_sampling, [255; 4]).into_handle(),
            metalness: Texture::new("door_metalness", data_sampling, [0, 0, 0, 255]).into_handle(),
            roughness: Texture::new("door_roughness", data_sampling, [255; 4]).into_handle(),
        };

        let manager = LoadingManager::new()
            .on_start(|| log::info!("texture loading started"))
            .on_progress(|name, progress| {
                log::info!(
                    "loaded {} ({}/{})",
                    name,
                    progress.succeeded,
                    progress.total()
                )
            })
            .on_load(|progress| {
                log::info!(
                    "texture loading finished: {} ok, {} failed",
                    progress.succeeded,
                    progress.failed
                )
            })
            .on_error(|name| log::warn!("failed to load {}", name));
        let mut loader = TextureLoader::new(manager);
        let dir = &config.texture_dir;
        loader.enqueue("color", &format!("{dir}/color.jpg"), slots.color.clone());
        loader.enqueue("alpha", &format!("{dir}/alpha.jpg"), slots.alpha.clone());
        loader.enqueue("height", &format!("{dir}/height.jpg"), slots.height.clone());
        loader.enqueue("normal", &format!("{dir}/normal.jpg"), slots.normal.clone());
        loader.enqueue(
            "ambientOcclusion",
            &format!("{dir}/ambientOcclusion.jpg"),
            slots.ambient_occlusion.clone(),
        );
        loader.enqueue(
            "metalness",
            &format!("{dir}/metalness.jpg"),
            slots.metalness.clone(),
        );
        loader.enqueue(
            "roughness",
            &format!("{dir}/roughness.jpg"),
            slots.roughness.clone(),
        );

        let manual_texture = Texture::new("manual_color", color_sampling, [255; 4]).into_handle();
        loader.enqueue_untracked(
            "manual_color",
            &format!("{dir}/color.jpg"),
            manual_texture.clone(),
        );

        let material = Material::new(slots, true, config.displacement_scale);
        let material_layout = material::bind_group_layout(&ctx.device);
        let model_layout = Mesh::bind_group_layout(&ctx.device);
        let pipeline = mk_standard_pipeline(
            &ctx.device,
            &ctx.config,
            &material_layout,
            &camera_res.bind_group_layout,
            &light_res.bind_group_layout,
            &model_layout,
            material.transparent,
        );

        let geometry = BoxGeometry::with_segments(
            config.box_size,
            config.box_size,
            config.box_size,
            config.segments,
        );
        let mut mesh = Mesh::new(geometry, material);
        mesh.upload(&ctx.device, &model_layout);
        scene.set_mesh(mesh);

        let mut panel = DebugPanel::new();
        panel.register("displacement_scale", config.displacement_scale, 0.0, 0.5);

        let mut driver = RenderLoop::new(MonotonicClock::new(), config.rotation_rates);
        driver.start();

        Ok(Self {
            ctx,
            viewport,
            projection,
            camera_res,
            light_res,
            scene,
            controller,
            loader,
            manual_texture,
            panel,
            pipeline,
            material_layout,
            driver,
            is_surface_configured: false,
        })
    }

    /// Apply a new window size to the surface, depth buffer and projection
    /// in one step so no frame sees them disagree.
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.is_surface_configured = true;
        self.viewport = Viewport::new(width, height);
        self.projection.resize(width, height);
        self.ctx.resize(width, height);
        log::debug!(
            "resized to {}x{} (aspect {:.3})",
            width,
            height,
            self.viewport.aspect()
        );
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        self.loader.poll();

        if let Some(frame) = self.driver.tick() {
            if let Some(mesh) = &mut self.scene.mesh {
                mesh.set_rotation(frame.rotation);
            }
            self.controller.update(&mut self.scene.camera, frame.dt);
        }
        self.camera_res
            .write(&self.ctx.queue, &self.scene.camera, &self.projection);

        if let Some(mesh) = &mut self.scene.mesh {
            if let Some(scale) = self.panel.get("displacement_scale") {
                mesh.material.set_displacement_scale(scale);
            }
            mesh.material
                .refresh(&self.ctx.device, &self.ctx.queue, &self.material_layout);
            mesh.write_model(&self.ctx.queue);
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(mesh) = &self.scene.mesh {
                if let (Some(binding), Some(buffers)) = (mesh.material.binding(), mesh.buffers()) {
                    render_pass.set_pipeline(&self.pipeline);
                    render_pass.set_bind_group(0, &binding.bind_group, &[]);
                    render_pass.set_bind_group(1, &self.camera_res.bind_group, &[]);
                    render_pass.set_bind_group(2, &self.light_res.bind_group, &[]);
                    render_pass.set_bind_group(3, &buffers.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..buffers.num_elements, 0, 0..1);
                }
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub enum AppEvent {
    Initialized(Box<AppState>),
}

pub struct App {
    config: DemoConfig,
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    // Only the wasm init path reports back through the proxy.
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: EventLoopProxy<AppEvent>,
    state: Option<AppState>,
}

impl App {
    fn new(event_loop: &EventLoop<AppEvent>, config: DemoConfig) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            state: None,
        })
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("door box");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => panic!("App initialization failed. Cannot create a window: {}", e),
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            // block_on also puts the loader's spawned fetches on the runtime.
            let state = match self
                .async_runtime
                .block_on(AppState::new(window, &self.config))
            {
                Ok(state) => state,
                Err(e) => panic!("App initialization failed: {}", e),
            };
            self.state = Some(state);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = match AppState::new(window, &config).await {
                    Ok(state) => state,
                    Err(e) => panic!("App initialization failed: {}", e),
                };
                assert!(
                    proxy
                        .send_event(AppEvent::Initialized(Box::new(state)))
                        .is_ok()
                );
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Initialized(state) => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(*state);
                let state = self.state.as_mut().expect("state was just stored");
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.controller.is_dragging() {
                state.controller.handle_mouse(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(()) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(e) => log::error!("Unable to render {}", e),
            },
            _ => {}
        }
    }
}

pub fn run(config: DemoConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
