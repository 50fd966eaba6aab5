//! End-to-end frame loop scenarios against the in-process backend.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use garnet_render::backend::null::BackendEvent;
use garnet_render::graph::ExecuteFn;
use garnet_render::registry::{Binding, RenderStateDescriptor, RenderTargetDescriptor, ShaderBinding};
use garnet_render::types::{
    BlendMode, BufferUsage, ClearValue, Extent2d, RasterState, TextureFormat, VertexFormat,
    VertexLayout, Viewport,
};
use garnet_render::{
    Application, Command, FramePipeline, NullBackend, PipelineConfig, Registry, RenderError,
    RenderGraph, RenderNode, SurfaceStatus,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared observations the test asserts against after driving frames.
#[derive(Default)]
struct FrameCounters {
    camera_constructs: AtomicUsize,
    forward_constructs: AtomicUsize,
    forward_resolved: AtomicBool,
}

/// Publishes a view-matrix uniform buffer as "camera:buffer".
struct CameraNode {
    counters: Arc<FrameCounters>,
}

impl RenderNode for CameraNode {
    fn name(&self) -> &str {
        "camera"
    }

    fn construct_frame(&mut self, registry: &mut Registry) -> Result<ExecuteFn, RenderError> {
        self.counters.camera_constructs.fetch_add(1, Ordering::SeqCst);
        let view = glam::Mat4::IDENTITY;
        let buffer = registry.create_uniform_buffer(&view)?;
        registry.publish("buffer", buffer);
        Ok(Box::new(move |ctx, list| {
            let time = glam::Vec4::splat(ctx.elapsed);
            list.push(Command::UpdateBuffer {
                buffer,
                offset: 0,
                data: bytemuck::bytes_of(&time).to_vec(),
            });
        }))
    }
}

/// Consumes "camera:buffer" and draws a triangle into a window target.
struct ForwardNode {
    counters: Arc<FrameCounters>,
}

impl RenderNode for ForwardNode {
    fn name(&self) -> &str {
        "forward"
    }

    fn construct_frame(&mut self, registry: &mut Registry) -> Result<ExecuteFn, RenderError> {
        self.counters.forward_constructs.fetch_add(1, Ordering::SeqCst);

        let camera = registry.get_buffer("camera", "buffer");
        self.counters
            .forward_resolved
            .store(camera.is_some(), Ordering::SeqCst);

        let target = registry.create_render_target(
            RenderTargetDescriptor::window()
                .with_label("forward")
                .with_color(TextureFormat::Rgba8UnormSrgb, ClearValue::color(0.0, 0.0, 0.0, 1.0)),
        )?;
        let vertices: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
        let vertex_buffer =
            registry.create_buffer_with_data(bytemuck::bytes_of(&vertices), BufferUsage::VERTEX)?;

        let mut binding_sets = Vec::new();
        if let Some(camera) = camera {
            let set =
                registry.create_binding_set(vec![ShaderBinding::new(0, Binding::UniformBuffer(camera))])?;
            binding_sets.push(set);
        }
        let state = registry.create_render_state(RenderStateDescriptor {
            label: Some("forward".to_string()),
            target,
            vertex_layout: VertexLayout::packed(&[VertexFormat::Float32x3]),
            shader: "forward".to_string(),
            binding_sets: binding_sets.clone(),
            viewport: Viewport::from_extent(Extent2d::new(1280, 720)),
            blend: BlendMode::Opaque,
            raster: RasterState::opaque(),
        })?;

        Ok(Box::new(move |_ctx, list| {
            list.push(Command::SetRenderState(state));
            for (index, set) in binding_sets.iter().enumerate() {
                list.push(Command::BindSet {
                    index: index as u32,
                    set: *set,
                });
            }
            list.push(Command::BindVertexBuffer(vertex_buffer));
            list.push(Command::Draw {
                vertex_count: 3,
                instance_count: 1,
            });
        }))
    }
}

struct DemoApp {
    counters: Arc<FrameCounters>,
}

impl Application for DemoApp {
    fn setup(&mut self, graph: &mut RenderGraph) {
        graph.add_node(CameraNode {
            counters: Arc::clone(&self.counters),
        });
        graph.add_node(ForwardNode {
            counters: Arc::clone(&self.counters),
        });
    }
}

fn pipeline_with(
    backend: NullBackend,
    config: PipelineConfig,
) -> (FramePipeline<NullBackend>, DemoApp, Arc<FrameCounters>) {
    let counters = Arc::new(FrameCounters::default());
    let mut app = DemoApp {
        counters: Arc::clone(&counters),
    };
    let pipeline = FramePipeline::new(backend, &mut app, config, Extent2d::new(1280, 720));
    (pipeline, app, counters)
}

#[test]
fn test_frames_submit_and_present() {
    init_logger();
    let (mut pipeline, mut app, counters) =
        pipeline_with(NullBackend::new(3), PipelineConfig::default());

    for _ in 0..4 {
        pipeline.render_frame(&mut app).unwrap();
    }

    assert_eq!(pipeline.backend().submit_count(), 4);
    assert_eq!(pipeline.backend().present_count(), 4);
    assert_eq!(pipeline.frame_index(), 4);

    // Both frame slots were constructed exactly once; later frames reuse
    // the stored closures.
    assert_eq!(counters.camera_constructs.load(Ordering::SeqCst), 2);
    assert_eq!(counters.forward_constructs.load(Ordering::SeqCst), 2);
    assert!(counters.forward_resolved.load(Ordering::SeqCst));
}

#[test]
fn test_dependency_orders_execution() {
    init_logger();
    let (mut pipeline, mut app, _counters) =
        pipeline_with(NullBackend::new(2), PipelineConfig::default());

    pipeline.render_frame(&mut app).unwrap();
    assert_eq!(pipeline.graph().execution_order(), ["camera", "forward"]);
    assert!(pipeline
        .registry(0)
        .unwrap()
        .dependencies()
        .contains(&("forward".to_string(), "camera".to_string())));
}

#[test]
fn test_fence_observed_signaled_before_every_submit() {
    init_logger();
    let (mut pipeline, mut app, _counters) =
        pipeline_with(NullBackend::new(2), PipelineConfig::default());

    for _ in 0..6 {
        pipeline.render_frame(&mut app).unwrap();
    }

    // Every submit must be preceded by a successful wait on the slot
    // fence, with no other submit in between.
    let events = pipeline.backend().events();
    for (index, event) in events.iter().enumerate() {
        if matches!(event, BackendEvent::Submit { .. }) {
            let preceding = events[..index]
                .iter()
                .rev()
                .find(|e| matches!(e, BackendEvent::WaitFence { .. } | BackendEvent::Submit { .. }));
            assert_eq!(
                preceding,
                Some(&BackendEvent::WaitFence { signaled: true }),
                "submit at event {index} not gated by a signaled fence wait"
            );
        }
    }
}

#[test]
fn test_resize_reconstructs_against_new_generation() {
    init_logger();
    let (mut pipeline, mut app, counters) =
        pipeline_with(NullBackend::new(2), PipelineConfig::default());

    pipeline.render_frame(&mut app).unwrap();
    pipeline.render_frame(&mut app).unwrap();
    assert_eq!(counters.camera_constructs.load(Ordering::SeqCst), 2);

    pipeline.on_resize_event(Extent2d::new(1920, 1080));
    // Debounce: the resize settles after the quiet period.
    std::thread::sleep(Duration::from_millis(60));

    pipeline.render_frame(&mut app).unwrap();
    assert_eq!(pipeline.window_size(), Extent2d::new(1920, 1080));
    assert_eq!(
        pipeline.backend().rebuild_sizes(),
        [Extent2d::new(1920, 1080)]
    );

    // The rebuilt frame reconstructed its slot, and forward re-resolved
    // "camera:buffer" against the new registry generation.
    assert_eq!(counters.camera_constructs.load(Ordering::SeqCst), 3);
    assert_eq!(counters.forward_constructs.load(Ordering::SeqCst), 3);
    assert!(counters.forward_resolved.load(Ordering::SeqCst));

    // The next frame reconstructs the other slot.
    pipeline.render_frame(&mut app).unwrap();
    assert_eq!(counters.camera_constructs.load(Ordering::SeqCst), 4);
}

#[test]
fn test_out_of_date_acquire_rebuilds_and_recovers() {
    init_logger();
    let mut backend = NullBackend::new(2);
    backend.script_acquire([SurfaceStatus::OutOfDate]);
    let (mut pipeline, mut app, _counters) = pipeline_with(backend, PipelineConfig::default());

    pipeline.render_frame(&mut app).unwrap();

    // The rebuild happened before the successful submit of the same frame.
    let events = pipeline.backend().events();
    let rebuild = events
        .iter()
        .position(|e| matches!(e, BackendEvent::RebuildTargets(_)))
        .expect("out-of-date acquire must rebuild targets");
    let submit = events
        .iter()
        .position(|e| matches!(e, BackendEvent::Submit { .. }))
        .expect("frame must still submit after recovery");
    assert!(rebuild < submit);
    assert_eq!(pipeline.backend().present_count(), 1);
}

#[test]
fn test_persistent_out_of_date_is_an_error() {
    init_logger();
    let mut backend = NullBackend::new(2);
    backend.script_acquire([SurfaceStatus::OutOfDate; 8]);
    let (mut pipeline, mut app, _counters) = pipeline_with(backend, PipelineConfig::default());

    let err = pipeline.render_frame(&mut app).unwrap_err();
    assert_eq!(err, RenderError::SurfaceLost { attempts: 4 });
}

#[test]
fn test_suboptimal_present_defers_rebuild_to_next_acquire() {
    init_logger();
    let mut backend = NullBackend::new(2);
    backend.script_present([SurfaceStatus::Suboptimal]);
    let (mut pipeline, mut app, _counters) = pipeline_with(backend, PipelineConfig::default());

    pipeline.render_frame(&mut app).unwrap();
    assert!(pipeline.backend().rebuild_sizes().is_empty());

    pipeline.render_frame(&mut app).unwrap();
    assert_eq!(pipeline.backend().rebuild_sizes().len(), 1);
    assert_eq!(pipeline.backend().present_count(), 2);
}

#[test]
fn test_unsignaled_fence_times_out_instead_of_hanging() {
    init_logger();
    let backend = NullBackend::new(1).with_manual_fences();
    let config = PipelineConfig::default()
        .with_frames_in_flight(1)
        .with_fence_timeout(Duration::from_millis(20));
    let (mut pipeline, mut app, _counters) = pipeline_with(backend, config);

    // Slot fences start signaled, so the first frame goes through even
    // though the backend never signals on submit.
    pipeline.render_frame(&mut app).unwrap();

    // The second use of the slot finds its fence still unsignaled.
    let err = pipeline.render_frame(&mut app).unwrap_err();
    assert!(matches!(err, RenderError::SyncTimeout(_)));
}

#[test]
fn test_wait_idle_drains_before_teardown() {
    init_logger();
    let (mut pipeline, mut app, _counters) =
        pipeline_with(NullBackend::new(2), PipelineConfig::default());

    pipeline.render_frame(&mut app).unwrap();
    pipeline.wait_idle().unwrap();
    assert_eq!(
        pipeline.backend().events().last(),
        Some(&BackendEvent::WaitIdle)
    );
}

#[test]
fn test_missing_dependency_falls_back_to_placeholder() {
    init_logger();

    /// Looks up a texture nobody publishes and substitutes a 1x1 pixel.
    struct MaterialNode {
        used_placeholder: Arc<AtomicBool>,
    }

    impl RenderNode for MaterialNode {
        fn name(&self) -> &str {
            "material"
        }

        fn construct_frame(&mut self, registry: &mut Registry) -> Result<ExecuteFn, RenderError> {
            let albedo = match registry.get_texture("loader", "albedo") {
                Some(texture) => texture,
                None => {
                    self.used_placeholder.store(true, Ordering::SeqCst);
                    registry.create_pixel_texture(glam::Vec4::ONE, true)?
                }
            };
            Ok(Box::new(move |_ctx, list| {
                list.push(Command::ClearTexture {
                    texture: albedo,
                    value: ClearValue::color(1.0, 1.0, 1.0, 1.0),
                });
            }))
        }
    }

    struct MaterialApp {
        used_placeholder: Arc<AtomicBool>,
    }

    impl Application for MaterialApp {
        fn setup(&mut self, graph: &mut RenderGraph) {
            graph.add_node(MaterialNode {
                used_placeholder: Arc::clone(&self.used_placeholder),
            });
        }
    }

    let used_placeholder = Arc::new(AtomicBool::new(false));
    let mut app = MaterialApp {
        used_placeholder: Arc::clone(&used_placeholder),
    };
    let mut pipeline = FramePipeline::new(
        NullBackend::new(2),
        &mut app,
        PipelineConfig::default(),
        Extent2d::new(640, 480),
    );

    pipeline.render_frame(&mut app).unwrap();
    assert!(used_placeholder.load(Ordering::SeqCst));
    // The placeholder's pixel upload reached the backend.
    assert!(pipeline
        .backend()
        .events()
        .contains(&BackendEvent::TextureUpload));
}

#[test]
fn test_static_scope_publication() {
    init_logger();

    /// Consumes the fullscreen quad the application publishes statically.
    struct BlitNode {
        found: Arc<AtomicBool>,
    }

    impl RenderNode for BlitNode {
        fn name(&self) -> &str {
            "blit"
        }

        fn construct_frame(&mut self, registry: &mut Registry) -> Result<ExecuteFn, RenderError> {
            self.found.store(
                registry.get_buffer("static", "quad").is_some(),
                Ordering::SeqCst,
            );
            Ok(Box::new(|_, _| {}))
        }
    }

    struct BlitApp {
        found: Arc<AtomicBool>,
    }

    impl Application for BlitApp {
        fn setup(&mut self, graph: &mut RenderGraph) {
            graph.add_node(BlitNode {
                found: Arc::clone(&self.found),
            });
        }

        fn construct_static(&mut self, registry: &mut Registry) -> Result<(), RenderError> {
            let quad: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
            let buffer =
                registry.create_buffer_with_data(bytemuck::bytes_of(&quad), BufferUsage::VERTEX)?;
            registry.publish("quad", buffer);
            Ok(())
        }
    }

    let found = Arc::new(AtomicBool::new(false));
    let mut app = BlitApp {
        found: Arc::clone(&found),
    };
    let mut pipeline = FramePipeline::new(
        NullBackend::new(2),
        &mut app,
        PipelineConfig::default(),
        Extent2d::new(640, 480),
    );

    pipeline.render_frame(&mut app).unwrap();
    assert!(found.load(Ordering::SeqCst));
}
