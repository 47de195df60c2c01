//! The banner pipeline state machine.
//!
//! Drives exactly one render at a time through four strictly sequential
//! stages: Parse -> Instantiate -> Prepare -> Render. Parsing,
//! classification and resource fetches run on the background context;
//! instantiation and anchor emission run on the injected UI-affinity
//! executor. Only the prepare stage fans out, joined by a counting barrier
//! before rendering begins, so layout always observes a fully prepared tree.

use crate::error::PipelineError;
use crate::events::{BannerDelegate, DisplayMode};
use crate::layout;
use crate::markup;
use crate::node::{self, NodeId, NodeKind, RenderNode, WidgetHandle};
use crate::pipeline::barrier::PrepareBarrier;
use crate::pipeline::executor::UiExecutor;
use crate::resource::{PrepareError, PreparedImage, ResourceFetcher};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task;

/// Lifecycle of one pipeline run. A new `create` call is accepted only in
/// `Idle`, `Ready` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Parsing,
    Instantiating,
    Preparing,
    Rendering,
    Ready,
    Failed,
}

struct Banner {
    root: RenderNode,
    mode: DisplayMode,
}

/// Orchestrates markup parsing, widget instantiation, resource preparation
/// and anchor compilation for one banner at a time.
pub struct BannerPipeline {
    state: Mutex<PipelineState>,
    /// Bumped on every accepted `create` and every `clear`; stage
    /// completions from older runs observe the mismatch and become no-ops.
    generation: AtomicU64,
    banner: Mutex<Option<Banner>>,
    next_widget: Arc<AtomicU64>,
    fetcher: Arc<dyn ResourceFetcher>,
    delegate: Arc<dyn BannerDelegate>,
    ui: Arc<dyn UiExecutor>,
}

impl BannerPipeline {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        delegate: Arc<dyn BannerDelegate>,
        ui: Arc<dyn UiExecutor>,
    ) -> Self {
        BannerPipeline {
            state: Mutex::new(PipelineState::Idle),
            generation: AtomicU64::new(0),
            banner: Mutex::new(None),
            next_widget: Arc::new(AtomicU64::new(1)),
            fetcher,
            delegate,
            ui,
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Runs the full pipeline for one markup document.
    ///
    /// Rejects with [`PipelineError::AlreadyInProgress`] before doing any
    /// work if another run is in flight. Terminal outcomes are also signaled
    /// once through the delegate; a run superseded by [`clear`] finishes as
    /// a silent no-op.
    ///
    /// [`clear`]: BannerPipeline::clear
    pub async fn create(&self, markup: &str, mode: DisplayMode) -> Result<(), PipelineError> {
        let generation = {
            let mut state = self.state.lock().expect("state lock poisoned");
            if !matches!(
                *state,
                PipelineState::Idle | PipelineState::Ready | PipelineState::Failed
            ) {
                return Err(PipelineError::AlreadyInProgress);
            }
            *state = PipelineState::Parsing;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!("[PIPELINE] Starting run #{} (mode {:?}).", generation, mode);

        // --- STAGE 1: Parse + classify (background) ---
        let source = markup.to_string();
        let parsed = task::spawn_blocking(move || -> Result<RenderNode, PipelineError> {
            let document = markup::parse(&source)?;
            Ok(node::classify(&Arc::new(document))?)
        })
        .await
        .unwrap_or_else(|e| Err(PipelineError::StageFailed(format!("parse worker: {e}"))));

        let tree = match parsed {
            Ok(tree) => tree,
            Err(e) => return self.fail(generation, e),
        };
        debug!("[PARSE] Classified {} renderable nodes.", tree.node_count());

        // --- STAGE 2: Instantiate widget handles (UI affinity) ---
        if !self.advance(generation, PipelineState::Instantiating) {
            return Ok(());
        }
        let tree = match self.instantiate(tree).await {
            Ok(tree) => tree,
            Err(e) => return self.fail(generation, e),
        };

        // --- STAGE 3: Prepare resources (background fan-out) ---
        if !self.advance(generation, PipelineState::Preparing) {
            return Ok(());
        }
        let tree = self.prepare(tree).await;

        // --- STAGE 4: Compile anchors (UI affinity) ---
        if !self.advance(generation, PipelineState::Rendering) {
            return Ok(());
        }
        let tree = match self.render(tree).await {
            Ok(tree) => tree,
            Err(e) => return self.fail(generation, e),
        };
        let root_handle = match tree.widget {
            Some(handle) => handle,
            None => {
                return self.fail(
                    generation,
                    PipelineError::StageFailed("root widget was never instantiated".into()),
                );
            }
        };

        if !self.advance(generation, PipelineState::Ready) {
            return Ok(());
        }
        info!("[PIPELINE] Run #{} ready (root {:?}).", generation, root_handle);
        self.delegate.banner_ready(root_handle, &tree, mode);

        let mut slot = self.banner.lock().expect("banner lock poisoned");
        // A clear() may have landed after the Ready transition; publish only
        // when this run is still current.
        if self.generation.load(Ordering::SeqCst) == generation {
            *slot = Some(Banner { root: tree, mode });
        }
        Ok(())
    }

    /// Forcibly resets to `Idle`, discarding the rendered tree and making
    /// the completions of any in-flight run no-ops.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = PipelineState::Idle;
        }
        self.banner.lock().expect("banner lock poisoned").take();
        info!("[PIPELINE] Cleared.");
    }

    /// Dispatches a button node's action payload to the delegate.
    pub fn dispatch_action(&self, id: NodeId) {
        let action = {
            let slot = self.banner.lock().expect("banner lock poisoned");
            slot.as_ref().and_then(|banner| banner.root.find(id)).and_then(|n| match &n.kind {
                NodeKind::Button { action } => action.clone(),
                _ => None,
            })
        };
        if let Some(action) = action {
            self.delegate.banner_action(&action);
        }
    }

    /// Forwards a surface-visibility change to the delegate.
    pub fn notify_shown(&self) {
        self.delegate.banner_shown();
    }

    pub fn notify_closed(&self) {
        self.delegate.banner_closed();
    }

    /// Runs `f` against the rendered root node, if a banner is ready.
    pub fn with_banner<T>(&self, f: impl FnOnce(&RenderNode) -> T) -> Option<T> {
        let slot = self.banner.lock().expect("banner lock poisoned");
        slot.as_ref().map(|banner| f(&banner.root))
    }

    /// Display mode of the currently rendered banner, if any.
    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.banner.lock().expect("banner lock poisoned").as_ref().map(|b| b.mode)
    }

    /// Transitions to `next` unless the run was superseded.
    fn advance(&self, generation: u64, next: PipelineState) -> bool {
        let mut state = self.state.lock().expect("state lock poisoned");
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("[PIPELINE] Run #{} superseded before {:?}.", generation, next);
            return false;
        }
        *state = next;
        true
    }

    /// Terminal failure: transition to `Failed` and signal the delegate
    /// once, unless the run was already superseded.
    fn fail(&self, generation: u64, error: PipelineError) -> Result<(), PipelineError> {
        if !self.advance(generation, PipelineState::Failed) {
            return Ok(());
        }
        warn!("[PIPELINE] Run #{} failed: {}", generation, error);
        self.delegate.banner_failed(&error);
        Err(error)
    }

    async fn instantiate(&self, mut tree: RenderNode) -> Result<RenderNode, PipelineError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let counter = Arc::clone(&self.next_widget);
        self.ui.execute(Box::new(move || {
            allocate_widgets(&mut tree, &counter);
            let _ = tx.send(tree);
        }));
        rx.await
            .map_err(|_| PipelineError::StageFailed("UI executor dropped instantiate task".into()))
    }

    async fn prepare(&self, mut tree: RenderNode) -> RenderNode {
        let targets = collect_prepare_targets(&tree);
        if targets.is_empty() {
            return tree;
        }
        info!("[PREPARE] Dispatching {} resource fetches.", targets.len());

        let barrier = Arc::new(PrepareBarrier::new());
        let (result_tx, result_rx) =
            async_channel::unbounded::<(NodeId, Result<PreparedImage, PrepareError>)>();

        // Enter for the whole batch up front so the barrier cannot resolve
        // between the first completion and the last dispatch.
        for _ in &targets {
            barrier.enter();
        }
        for (id, src) in targets {
            let fetcher = Arc::clone(&self.fetcher);
            let barrier = Arc::clone(&barrier);
            let result_tx = result_tx.clone();
            task::spawn_blocking(move || {
                let outcome = crate::resource::prepare_image(fetcher.as_ref(), &src);
                let _ = result_tx.send_blocking((id, outcome));
                barrier.leave();
            });
        }
        drop(result_tx);

        barrier.wait().await;

        while let Ok((id, outcome)) = result_rx.try_recv() {
            match outcome {
                Ok(image) => {
                    if let Some(target) = tree.find_mut(id) {
                        target.image = Some(image);
                    }
                }
                // Non-fatal: the node stays imageless and siblings proceed.
                Err(e) => warn!("[PREPARE] Node {:?} left unprepared: {}", id, e),
            }
        }
        tree
    }

    async fn render(&self, mut tree: RenderNode) -> Result<RenderNode, PipelineError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.ui.execute(Box::new(move || {
            layout::compile_tree(&mut tree);
            let _ = tx.send(tree);
        }));
        rx.await
            .map_err(|_| PipelineError::StageFailed("UI executor dropped render task".into()))
    }
}

fn allocate_widgets(node: &mut RenderNode, counter: &AtomicU64) {
    node.widget = Some(WidgetHandle(counter.fetch_add(1, Ordering::Relaxed)));
    for child in &mut node.children {
        allocate_widgets(child, counter);
    }
}

/// Image nodes with a source URL are the only nodes requiring preparation.
fn collect_prepare_targets(tree: &RenderNode) -> Vec<(NodeId, String)> {
    let mut targets = Vec::new();
    collect_into(tree, &mut targets);
    targets
}

fn collect_into(node: &RenderNode, out: &mut Vec<(NodeId, String)>) {
    if let NodeKind::Image { src: Some(src) } = &node.kind {
        out.push((node.id(), src.clone()));
    }
    for child in &node.children {
        collect_into(child, out);
    }
}
