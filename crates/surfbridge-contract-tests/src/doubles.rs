//! Recording test doubles for the two external collaborators: the GPU and the platform
//! producer. Both note the calling thread for every resource operation.

use parking_lot::{Mutex, MutexGuard};
use std::cell::{Cell, RefCell};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use surfbridge_core::{
    BridgeConfig, BridgeError, ItemId, Rect, TextureFilter, TextureName, TextureTarget,
    TextureTransform,
};
use surfbridge_runtime_glow::{
    BufferId, FrameReport, GpuContext, ProgramId, RenderLoop, SceneItem, SurfaceTextureItem,
    UniformLocation,
};
use surfbridge_source::{
    FrameListener, FrameStatus, PlatformProducer, ProducerFactory, SourceError,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---- GPU ----

pub const LOC_MATRIX: UniformLocation = UniformLocation(0);
pub const LOC_OPACITY: UniformLocation = UniformLocation(1);
pub const LOC_TRANSFORM: UniformLocation = UniformLocation(2);
pub const LOC_SAMPLER: UniformLocation = UniformLocation(3);

#[derive(Debug, Clone, PartialEq)]
pub enum GpuEvent {
    CreateTexture(TextureName, TextureFilter),
    DeleteTexture(TextureName),
    BindTexture { unit: u32, texture: Option<TextureName> },
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UniformI32(UniformLocation, i32),
    UniformF32(UniformLocation, f32),
    UniformMat4(UniformLocation, [f32; 16]),
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    Upload(BufferId, Vec<f32>),
    Draw(BufferId, i32),
}

#[derive(Debug)]
pub struct RecordingGpu {
    events: RefCell<Vec<GpuEvent>>,
    threads: RefCell<Vec<(&'static str, ThreadId)>>,
    next_name: Cell<u32>,
    pub context_current: Cell<bool>,
    pub fail_texture: Cell<bool>,
}

impl Default for RecordingGpu {
    fn default() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            threads: RefCell::new(Vec::new()),
            next_name: Cell::new(1),
            context_current: Cell::new(true),
            fail_texture: Cell::new(false),
        }
    }
}

impl RecordingGpu {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<GpuEvent> {
        self.events.borrow().clone()
    }

    pub fn threads(&self) -> Vec<(&'static str, ThreadId)> {
        self.threads.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&GpuEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn textures_created(&self) -> Vec<TextureName> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GpuEvent::CreateTexture(t, _) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub fn textures_deleted(&self) -> Vec<TextureName> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GpuEvent::DeleteTexture(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Textures, programs and buffers created and not yet deleted, as `(kind, name)`.
    ///
    /// Panics if any object is deleted twice or deleted without having been created.
    pub fn live_objects(&self) -> Vec<(&'static str, u32)> {
        let mut live = Vec::new();
        for e in self.events.borrow().iter() {
            match e {
                GpuEvent::CreateTexture(t, _) => live.push(("texture", t.get())),
                GpuEvent::LinkProgram(p) => live.push(("program", p.0.get())),
                GpuEvent::CreateBuffer(b) => live.push(("buffer", b.0.get())),
                GpuEvent::DeleteTexture(t) => release(&mut live, ("texture", t.get())),
                GpuEvent::DeleteProgram(p) => release(&mut live, ("program", p.0.get())),
                GpuEvent::DeleteBuffer(b) => release(&mut live, ("buffer", b.0.get())),
                _ => {}
            }
        }
        live
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.count(|e| match e {
            GpuEvent::CreateTexture(..) => kind == "texture",
            GpuEvent::LinkProgram(_) => kind == "program",
            GpuEvent::CreateBuffer(_) => kind == "buffer",
            _ => false,
        })
    }

    pub fn draws(&self) -> usize {
        self.count(|e| matches!(e, GpuEvent::Draw(..)))
    }

    /// The transform uniform value in effect at each draw call, in draw order.
    pub fn transforms_at_draws(&self) -> Vec<Option<[f32; 16]>> {
        let mut current = None;
        let mut out = Vec::new();
        for e in self.events.borrow().iter() {
            match e {
                GpuEvent::UniformMat4(loc, m) if *loc == LOC_TRANSFORM => current = Some(*m),
                GpuEvent::Draw(..) => out.push(current),
                _ => {}
            }
        }
        out
    }

    fn push(&self, e: GpuEvent) {
        self.events.borrow_mut().push(e);
    }

    fn note_thread(&self, op: &'static str) {
        self.threads.borrow_mut().push((op, thread::current().id()));
    }

    fn next(&self) -> NonZeroU32 {
        let n = self.next_name.get();
        self.next_name.set(n + 1);
        NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
    }
}

fn release(live: &mut Vec<(&'static str, u32)>, object: (&'static str, u32)) {
    match live.iter().position(|o| *o == object) {
        Some(pos) => {
            live.remove(pos);
        }
        None => panic!("{} {} deleted twice or never created", object.0, object.1),
    }
}

impl GpuContext for RecordingGpu {
    fn has_current_context(&self) -> bool {
        self.context_current.get()
    }

    fn create_external_texture(&self, filter: TextureFilter) -> Result<TextureName, BridgeError> {
        self.note_thread("create");
        if self.fail_texture.get() {
            return Err(BridgeError::GlCreate("create_texture failed: out of names".into()));
        }
        let name = TextureName(self.next());
        self.push(GpuEvent::CreateTexture(name, filter));
        Ok(name)
    }

    fn delete_texture(&self, _target: TextureTarget, texture: TextureName) {
        self.note_thread("destroy");
        self.push(GpuEvent::DeleteTexture(texture));
    }

    fn bind_texture_unit(&self, unit: u32, _target: TextureTarget, texture: Option<TextureName>) {
        self.push(GpuEvent::BindTexture { unit, texture });
    }

    fn link_program(
        &self,
        _vert_src: &str,
        _frag_src: &str,
        _attributes: &[&str],
    ) -> Result<ProgramId, BridgeError> {
        let p = ProgramId(self.next());
        self.push(GpuEvent::LinkProgram(p));
        Ok(p)
    }

    fn delete_program(&self, program: ProgramId) {
        self.push(GpuEvent::DeleteProgram(program));
    }

    fn use_program(&self, _program: Option<ProgramId>) {}

    fn uniform_location(&self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        match name {
            "qt_Matrix" => Some(LOC_MATRIX),
            "qt_Opacity" => Some(LOC_OPACITY),
            "uSTMatrix" => Some(LOC_TRANSFORM),
            "sTexture" => Some(LOC_SAMPLER),
            _ => None,
        }
    }

    fn set_uniform_i32(&self, location: UniformLocation, value: i32) {
        self.push(GpuEvent::UniformI32(location, value));
    }

    fn set_uniform_f32(&self, location: UniformLocation, value: f32) {
        self.push(GpuEvent::UniformF32(location, value));
    }

    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]) {
        self.push(GpuEvent::UniformMat4(location, *value));
    }

    fn create_vertex_buffer(&self) -> Result<BufferId, BridgeError> {
        let buffer = BufferId(self.next());
        self.push(GpuEvent::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn upload_vertices(&self, buffer: BufferId, data: &[f32]) {
        self.push(GpuEvent::Upload(buffer, data.to_vec()));
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.push(GpuEvent::DeleteBuffer(buffer));
    }

    fn set_blending(&self, _enabled: bool) {}

    fn draw_textured_strip(&self, buffer: BufferId, vertex_count: i32) {
        self.push(GpuEvent::Draw(buffer, vertex_count));
    }
}

// ---- Producer ----

#[derive(Debug, Default)]
pub struct ProducerLog {
    pub created: u32,
    pub dropped: u32,
    pub bound_textures: Vec<TextureName>,
    pub listener_sets: u32,
    pub listener_clears: u32,
    pub pulls: u32,
    pub fetches: u32,
    pub threads: Vec<(&'static str, ThreadId)>,
}

/// State shared between the fake producer (render thread) and the test's "decoder" threads.
#[derive(Debug, Default)]
pub struct FakeProducerShared {
    log: Mutex<ProducerLog>,
    listener: Mutex<Option<FrameListener>>,
    frame: Mutex<(u64, TextureTransform)>,
    pub fail_bind: AtomicBool,
    pub fail_pull: AtomicBool,
}

impl FakeProducerShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> MutexGuard<'_, ProducerLog> {
        self.log.lock()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Decoder side: a new frame lands, then the listener fires.
    pub fn push_frame(&self, transform: TextureTransform) {
        self.land_frame(transform);
        self.notify();
    }

    /// A frame lands without a notification (or before the listener is installed).
    pub fn land_frame(&self, transform: TextureTransform) {
        let mut f = self.frame.lock();
        f.0 += 1;
        f.1 = transform;
    }

    /// Fires the installed listener, if any.
    pub fn notify(&self) {
        let listener = self.listener.lock().clone();
        if let Some(l) = listener {
            l.on_frame_available();
        }
    }
}

#[derive(Debug)]
pub struct FakeProducer {
    shared: Arc<FakeProducerShared>,
    latched: u64,
    transform: TextureTransform,
}

impl PlatformProducer for FakeProducer {
    fn set_frame_listener(&mut self, listener: Option<FrameListener>) -> Result<(), SourceError> {
        {
            let mut log = self.shared.log.lock();
            match listener {
                Some(_) => log.listener_sets += 1,
                None => log.listener_clears += 1,
            }
        }
        *self.shared.listener.lock() = listener;
        Ok(())
    }

    fn update_tex_image(&mut self) -> Result<FrameStatus, SourceError> {
        {
            let mut log = self.shared.log.lock();
            log.pulls += 1;
            log.threads.push(("pull", thread::current().id()));
        }
        if self.shared.fail_pull.load(Ordering::SeqCst) {
            return Err(SourceError::Producer("surface abandoned".into()));
        }
        let (serial, transform) = *self.shared.frame.lock();
        if serial > self.latched {
            self.latched = serial;
            self.transform = transform;
            Ok(FrameStatus::New)
        } else {
            Ok(FrameStatus::Unchanged)
        }
    }

    fn transform_matrix(&mut self, out: &mut [f32; 16]) -> Result<(), SourceError> {
        {
            let mut log = self.shared.log.lock();
            log.fetches += 1;
            log.threads.push(("fetch", thread::current().id()));
        }
        *out = *self.transform.as_array();
        Ok(())
    }
}

impl Drop for FakeProducer {
    fn drop(&mut self) {
        self.shared.log.lock().dropped += 1;
    }
}

#[derive(Debug, Clone)]
pub struct FakeFactory {
    pub shared: Arc<FakeProducerShared>,
}

impl ProducerFactory for FakeFactory {
    type Producer = FakeProducer;

    fn create(
        &mut self,
        texture: TextureName,
        _target: TextureTarget,
    ) -> Result<FakeProducer, SourceError> {
        if self.shared.fail_bind.load(Ordering::SeqCst) {
            return Err(SourceError::Bind {
                texture,
                reason: "invalid texture".into(),
            });
        }
        {
            let mut log = self.shared.log.lock();
            log.created += 1;
            log.bound_textures.push(texture);
        }
        Ok(FakeProducer {
            shared: Arc::clone(&self.shared),
            latched: 0,
            transform: TextureTransform::identity(),
        })
    }
}

// ---- Harness ----

pub type FakeItem = SurfaceTextureItem<RecordingGpu, FakeFactory>;

pub struct Harness {
    pub gpu: Rc<RecordingGpu>,
    pub shared: Arc<FakeProducerShared>,
    pub render: RenderLoop<RecordingGpu>,
    pub item: ItemId,
}

impl Harness {
    pub fn new(bounds: Rect) -> Self {
        Self::with_item(bounds, |_| {})
    }

    /// `setup` runs on the item before it is handed to the render loop.
    pub fn with_item(bounds: Rect, setup: impl FnOnce(&mut FakeItem)) -> Self {
        init_tracing();
        let gpu = RecordingGpu::new();
        let mut render = RenderLoop::new(Rc::clone(&gpu), BridgeConfig::default());
        render.set_viewport(800.0, 600.0);
        let (item, shared) = add_fake_item(&mut render, bounds, setup);

        Self {
            gpu,
            shared,
            render,
            item,
        }
    }

    pub fn frame(&mut self) -> FrameReport {
        match self.render.render_frame() {
            Ok(report) => report,
            Err(e) => panic!("render_frame failed: {e}"),
        }
    }
}

/// Adds one item backed by its own fake producer to `render`.
pub fn add_fake_item(
    render: &mut RenderLoop<RecordingGpu>,
    bounds: Rect,
    setup: impl FnOnce(&mut FakeItem),
) -> (ItemId, Arc<FakeProducerShared>) {
    let shared = FakeProducerShared::new();
    let id = render.allocate_item_id();
    let mut item = SurfaceTextureItem::new(
        id,
        Rc::clone(render.gl()),
        FakeFactory {
            shared: Arc::clone(&shared),
        },
        BridgeConfig::default(),
        render.requester(),
        Arc::clone(render.listeners()),
    );
    item.set_bounds(bounds);
    setup(&mut item);
    render.add_item(Box::new(item));
    (id, shared)
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("render", &self.render)
            .field("item", &self.item)
            .finish()
    }
}

/// A recognisable transform: column-major with a v flip and a small crop.
pub fn sample_transform(seed: f32) -> TextureTransform {
    TextureTransform::from_cols_array([
        1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        seed, 1.0, 0.0, 1.0,
    ])
}
