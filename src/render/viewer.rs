use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, ModifiersState, NamedKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::{
    active::{ImageSlot, SlotUpdate},
    config::Configuration,
    events::{ImageSource, LoadImage, LoadOutcome, PreparedImage},
    panel::{Panel, PanelAction},
    params::WipeParams,
    processing::layout::cover_uv_scale,
    tasks::{unsplash::TopicPicker, watch::SourceChanged},
};

const TITLE_REFRESH: Duration = Duration::from_millis(250);

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
}

/// Uniform block consumed by `wipe.wgsl`; the field order is the WGSL layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WipeUniforms {
    pub threshold: f32,
    pub feather: f32,
    pub time: f32,
    pub noise_strength: f32,
    pub noise_scale: f32,
    pub invert: f32,
    pub has_gray: f32,
    _pad: f32,
    pub uv_scale: [f32; 2],
    _pad2: [f32; 2],
}

impl WipeUniforms {
    pub fn new(params: &WipeParams, has_gray: bool, uv_scale: [f32; 2]) -> Self {
        Self {
            threshold: params.threshold,
            feather: params.feather,
            time: params.time,
            noise_strength: params.noise_strength,
            noise_scale: params.noise_scale,
            invert: if params.direction.inverts_luma() { 1.0 } else { 0.0 },
            has_gray: if has_gray { 1.0 } else { 0.0 },
            _pad: 0.0,
            uv_scale,
            _pad2: [0.0; 2],
        }
    }
}

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    Panel(PanelAction),
    FetchRemote,
    ReloadBundled,
    Quit,
}

/// Map a pressed key to a command. `nudge` and `coarse` are the step counts
/// for the arrow keys without and with Shift.
pub fn key_command(key: &Key, shift: bool, nudge: i32, coarse: i32) -> Option<KeyCommand> {
    let steps = if shift { coarse } else { nudge };
    let command = match key {
        Key::Named(NamedKey::Tab) if shift => KeyCommand::Panel(PanelAction::PreviousControl),
        Key::Named(NamedKey::Tab) => KeyCommand::Panel(PanelAction::NextControl),
        Key::Named(NamedKey::ArrowUp) => KeyCommand::Panel(PanelAction::Nudge(steps)),
        Key::Named(NamedKey::ArrowDown) => KeyCommand::Panel(PanelAction::Nudge(-steps)),
        Key::Named(NamedKey::Space) => KeyCommand::Panel(PanelAction::TogglePaused),
        Key::Named(NamedKey::Escape) => KeyCommand::Quit,
        Key::Character(text) => match text.to_ascii_lowercase().as_str() {
            " " => KeyCommand::Panel(PanelAction::TogglePaused),
            "d" => KeyCommand::Panel(PanelAction::ToggleDirection),
            "r" => KeyCommand::Panel(PanelAction::Reset),
            "u" => KeyCommand::FetchRemote,
            "b" => KeyCommand::ReloadBundled,
            "q" => KeyCommand::Quit,
            _ => return None,
        },
        _ => return None,
    };
    Some(command)
}

/// Channels connecting the viewer to the loader and the file watcher.
pub struct ViewerChannels {
    pub load_tx: mpsc::Sender<LoadImage>,
    pub outcomes: mpsc::Receiver<LoadOutcome>,
    pub changes: Option<xchan::Receiver<SourceChanged>>,
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    uniforms: wgpu::Buffer,
    sampler: wgpu::Sampler,
    color_view: wgpu::TextureView,
    gray_view: wgpu::TextureView,
    image_size: (u32, u32),
    has_gray: bool,
}

impl Gpu {
    fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        // The wipe blends stored byte values; a linear target writes them out unchanged.
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| !fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wipe-shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/wipe.wgsl"
            ))),
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("wipe-bind-layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("wipe-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("wipe-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_fullscreen"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_wipe"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("wipe-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wipe-uniforms"),
            size: std::mem::size_of::<WipeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // black until the first image arrives
        let color_view = upload_texture(
            &device,
            &queue,
            "wipe-color",
            wgpu::TextureFormat::Rgba8Unorm,
            (1, 1),
            &[0, 0, 0, 255],
        );
        let gray_view = upload_texture(
            &device,
            &queue,
            "wipe-gray",
            wgpu::TextureFormat::R8Unorm,
            (1, 1),
            &[0],
        );
        let bind_group = create_bind_group(
            &device,
            &bind_layout,
            &color_view,
            &gray_view,
            &sampler,
            &uniforms,
        );

        Ok(Self {
            surface,
            config,
            device,
            queue,
            pipeline,
            bind_layout,
            bind_group,
            uniforms,
            sampler,
            color_view,
            gray_view,
            image_size: (1, 1),
            has_gray: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        debug!(
            width = self.config.width,
            height = self.config.height,
            "viewer surface resized",
        );
    }

    fn set_image(&mut self, image: &PreparedImage) -> Result<()> {
        let (width, height) = image.dimensions();
        let max = self.device.limits().max_texture_dimension_2d;
        anyhow::ensure!(
            width <= max && height <= max,
            "image {width}x{height} exceeds the GPU texture limit of {max}"
        );

        self.color_view = upload_texture(
            &self.device,
            &self.queue,
            "wipe-color",
            wgpu::TextureFormat::Rgba8Unorm,
            (width, height),
            image.color.as_raw(),
        );
        self.gray_view = match image.gray.as_ref() {
            Some(gray) => upload_texture(
                &self.device,
                &self.queue,
                "wipe-gray",
                wgpu::TextureFormat::R8Unorm,
                (width, height),
                gray.as_raw(),
            ),
            None => upload_texture(
                &self.device,
                &self.queue,
                "wipe-gray",
                wgpu::TextureFormat::R8Unorm,
                (1, 1),
                &[0],
            ),
        };
        self.has_gray = image.gray.is_some();
        self.image_size = (width, height);
        self.bind_group = create_bind_group(
            &self.device,
            &self.bind_layout,
            &self.color_view,
            &self.gray_view,
            &self.sampler,
            &self.uniforms,
        );
        Ok(())
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
    pixels: &[u8],
) -> wgpu::TextureView {
    let bytes_per_pixel = match format {
        wgpu::TextureFormat::R8Unorm => 1,
        _ => 4,
    };
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_pixel * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    color: &wgpu::TextureView,
    gray: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("wipe-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(color),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(gray),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: uniforms.as_entire_binding(),
            },
        ],
    })
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    params: WipeParams,
    panel: Panel,
    slot: ImageSlot,
    topics: TopicPicker,
    modifiers: ModifiersState,
    last_frame: Option<Instant>,
    last_title: Option<Instant>,
    last_error: Option<String>,
    channels: ViewerChannels,
}

impl ViewerApp {
    fn new(cfg: Configuration, cancel: CancellationToken, channels: ViewerChannels) -> Self {
        let topics = TopicPicker::new(&cfg.unsplash.queries);
        Self {
            params: cfg.wipe.clone(),
            cfg,
            cancel,
            window: None,
            gpu: None,
            panel: Panel::new(),
            slot: ImageSlot::new(),
            topics,
            modifiers: ModifiersState::default(),
            last_frame: None,
            last_title: None,
            last_error: None,
            channels,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let mut attrs = WindowAttributes::default().with_title(self.cfg.viewer.title.clone());
        if self.cfg.viewer.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    /// Hand `source` to the loader under a fresh generation. A busy loader
    /// refuses it and the load already in flight stays current.
    fn request(&mut self, source: ImageSource) {
        match self.slot.try_issue(&self.channels.load_tx, source) {
            Ok(generation) => info!(generation, "requesting image"),
            Err(TrySendError::Full(source)) => {
                warn!(%source, "loader queue full; request dropped");
                self.last_error = Some("loader busy, try again".into());
            }
            Err(TrySendError::Closed(source)) => {
                warn!(%source, "loader stopped; request dropped");
                self.last_error = Some("loader stopped".into());
            }
        }
        self.refresh_title(true);
    }

    fn request_remote(&mut self) {
        match self.topics.pick() {
            Some(topic) => self.request(ImageSource::Remote { topic }),
            None => {
                warn!("no remote topics configured");
                self.last_error = Some("no remote topics configured".into());
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(command) = key_command(
            &event.logical_key,
            self.modifiers.shift_key(),
            self.cfg.viewer.nudge_steps,
            self.cfg.viewer.coarse_nudge_steps,
        ) else {
            return;
        };
        debug!(?command, "key command");
        match command {
            KeyCommand::Panel(action) => {
                self.panel.apply(action, &mut self.params);
                if action == PanelAction::Reset {
                    self.last_frame = None;
                }
                self.refresh_title(true);
            }
            KeyCommand::FetchRemote => self.request_remote(),
            KeyCommand::ReloadBundled => self.request(self.cfg.image.source()),
            KeyCommand::Quit => {
                info!("quit requested from keyboard");
                event_loop.exit();
            }
        }
    }

    fn poll_loader(&mut self) {
        while let Ok(outcome) = self.channels.outcomes.try_recv() {
            match self.slot.apply(outcome) {
                SlotUpdate::Swapped => self.show_active(),
                SlotUpdate::Rejected(failed) => {
                    warn!(
                        generation = failed.generation,
                        source = %failed.source,
                        error = %failed.error,
                        "keeping current image",
                    );
                    self.last_error = Some(match failed.source.missing_hint(&failed.error) {
                        Some(hint) => {
                            warn!("{hint}");
                            hint.to_string()
                        }
                        None => failed.error.to_string(),
                    });
                    self.refresh_title(true);
                }
                SlotUpdate::Stale { generation, latest } => {
                    debug!(generation, latest, "ignored stale load");
                }
            }
        }
    }

    fn show_active(&mut self) {
        let Some(active) = self.slot.active() else {
            return;
        };
        let (width, height) = active.prepared.dimensions();
        info!(
            generation = active.generation,
            source = %active.source,
            width,
            height,
            credit = active.attribution.as_ref().map(|a| a.text.as_str()),
            "showing image",
        );
        self.last_error = None;
        if let Some(gpu) = self.gpu.as_mut() {
            if let Err(err) = gpu.set_image(&active.prepared) {
                error!(error = ?err, "failed to upload image");
                self.last_error = Some(err.to_string());
            }
        }
        self.refresh_title(true);
    }

    fn poll_watcher(&mut self) {
        let Some(changes) = self.channels.changes.as_ref() else {
            return;
        };
        // a burst of writes becomes a single reload
        let changed: Vec<PathBuf> = changes.try_iter().map(|change| change.path).collect();
        let Some(path) = changed.last() else {
            return;
        };
        if !self.slot.follows_bundled() {
            debug!(path = %path.display(), "image changed on disk; another image is showing");
            return;
        }
        info!(path = %path.display(), events = changed.len(), "image changed on disk");
        self.request(self.cfg.image.source());
    }

    fn refresh_title(&mut self, force: bool) {
        let now = Instant::now();
        if !force && self.last_title.is_some_and(|at| now.duration_since(at) < TITLE_REFRESH) {
            return;
        }
        let Some(window) = self.window.as_ref() else {
            return;
        };
        self.last_title = Some(now);

        let mut title = format!("{} | {}", self.cfg.viewer.title, self.panel.status(&self.params));
        if let Some(credit) = self.slot.active().and_then(|a| a.attribution.as_ref()) {
            title.push_str(&format!(" | Photo: {} ({})", credit.text, credit.url));
        }
        if let Some(err) = self.last_error.as_ref() {
            title.push_str(&format!(" | error: {err}"));
        }
        window.set_title(&title);
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self
            .last_frame
            .replace(now)
            .map_or(0.0, |prev| now.duration_since(prev).as_secs_f32());
        self.params.advance(dt);

        let Some(window) = self.window.as_ref() else {
            return;
        };
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let (image_w, image_h) = gpu.image_size;
        let uv_scale = cover_uv_scale(gpu.config.width, gpu.config.height, image_w, image_h);
        let uniforms = WipeUniforms::new(&self.params, gpu.has_gray, uv_scale);
        gpu.queue
            .write_buffer(&gpu.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                let size = window.inner_size();
                gpu.resize(size.width, size.height);
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                let size = window.inner_size();
                gpu.resize(size.width, size.height);
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("wipe-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_pipeline(&gpu.pipeline);
            rpass.set_bind_group(0, &gpu.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();

        self.refresh_title(false);
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.gpu.is_none() {
            match Gpu::new(window.clone()) {
                Ok(gpu) => self.gpu = Some(gpu),
                Err(err) => {
                    error!(error = ?err, "failed to initialize GPU state");
                    event_loop.exit();
                    return;
                }
            }
            // an image may have arrived before the surface existed
            if self.slot.active().is_some() {
                self.show_active();
            }
        }

        self.refresh_title(true);
        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::DroppedFile(path) => {
                self.request(ImageSource::File(path));
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }
        self.poll_loader();
        self.poll_watcher();
        // the wipe animates continuously; AutoVsync paces the redraws
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }
}

/// Open the window and run the wipe until it is closed or `cancel` fires.
/// `initial` is requested before the first frame. Must be called from the
/// main thread inside a tokio runtime.
pub fn run_windowed(
    cfg: Configuration,
    initial: ImageSource,
    channels: ViewerChannels,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(cfg, cancel, channels);
    app.request(initial);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")
}
