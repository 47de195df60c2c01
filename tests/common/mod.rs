//! Shared helpers for the pipeline integration tests.

use marquee::{
    BannerDelegate, BannerPipeline, DisplayMode, FetchError, PipelineError, PipelineState,
    RenderNode, ResourceFetcher, WidgetHandle,
};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A valid 2x1 RGB PNG, small enough to inline as a fixture.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x7B,
    0x40, 0xE8, 0xDD, 0x00, 0x00, 0x00, 0x0F, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
    0xCF, 0xC0, 0xC0, 0xF0, 0x9F, 0x01, 0x00, 0x07, 0xFF, 0x01, 0xFF, 0x01, 0x7F, 0x89, 0xA7,
    0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Every observable delegate callback, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready { root: WidgetHandle, mode: DisplayMode, node_count: usize },
    Failed(String),
    Action(String),
    Shown,
    Closed,
}

/// Delegate that records callbacks for later assertion.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<Event>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn ready_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::Ready { .. })).count()
    }

    pub fn failed_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::Failed(_))).count()
    }
}

impl BannerDelegate for RecordingDelegate {
    fn banner_ready(&self, root: WidgetHandle, tree: &RenderNode, mode: DisplayMode) {
        self.events.lock().unwrap().push(Event::Ready {
            root,
            mode,
            node_count: tree.node_count(),
        });
    }

    fn banner_failed(&self, error: &PipelineError) {
        self.events.lock().unwrap().push(Event::Failed(error.to_string()));
    }

    fn banner_action(&self, action: &str) {
        self.events.lock().unwrap().push(Event::Action(action.to_string()));
    }

    fn banner_shown(&self) {
        self.events.lock().unwrap().push(Event::Shown);
    }

    fn banner_closed(&self) {
        self.events.lock().unwrap().push(Event::Closed);
    }
}

/// Fetcher whose `fetch` blocks until `release` is called, so tests can hold
/// the pipeline in the prepare stage deterministically.
#[derive(Debug, Default)]
pub struct GatedFetcher {
    released: Mutex<bool>,
    gate: Condvar,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.gate.notify_all();
    }
}

impl ResourceFetcher for GatedFetcher {
    fn fetch(&self, _url: &str) -> Result<std::sync::Arc<Vec<u8>>, FetchError> {
        let mut released = self.released.lock().unwrap();
        while !*released {
            released = self.gate.wait(released).unwrap();
        }
        Ok(std::sync::Arc::new(TINY_PNG.to_vec()))
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Polls until the pipeline reaches `target`, panicking after two seconds.
pub async fn wait_for_state(pipeline: &BannerPipeline, target: PipelineState) {
    for _ in 0..200 {
        if pipeline.state() == target {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pipeline never reached {:?} (still {:?})", target, pipeline.state());
}
