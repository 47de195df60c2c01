//! marquee: a native banner rendering pipeline.
//!
//! Renders a small server-delivered markup dialect (`re-body`, `re-block`,
//! `re-text`, ...) into declarative layout for an on-screen banner. The crate
//! owns the markup-to-layout path:
//!
//! - [`markup`] parses the tolerant dialect into an element tree;
//! - [`style`] resolves raw attributes into typed style values;
//! - [`node`] classifies elements into renderable node kinds;
//! - [`layout`] compiles each node into anchor relationships for the host's
//!   geometry solver;
//! - [`pipeline`] drives the Parse -> Instantiate -> Prepare -> Render
//!   lifecycle with UI/background affinity and a prepare barrier.
//!
//! Widget painting, geometry solving and networking for markup/analytics are
//! owned by the host; the pipeline reports to it through
//! [`events::BannerDelegate`].
//!
//! ```no_run
//! use marquee::{BannerPipeline, DisplayMode, HttpFetcher, UiThreadExecutor};
//! use std::sync::Arc;
//!
//! # async fn run(delegate: Arc<dyn marquee::BannerDelegate>) {
//! let pipeline = BannerPipeline::new(
//!     Arc::new(HttpFetcher::new()),
//!     delegate,
//!     Arc::new(UiThreadExecutor::new()),
//! );
//! pipeline
//!     .create("<re-body><re-text>Hello</re-text></re-body>", DisplayMode::Top)
//!     .await
//!     .expect("banner creation failed");
//! # }
//! ```

pub mod error;
pub mod events;
pub mod layout;
pub mod markup;
pub mod node;
pub mod pipeline;
pub mod resource;
pub mod style;

pub use error::PipelineError;
pub use events::{BannerDelegate, DisplayMode};
pub use layout::{Anchor, compile_surface};
pub use markup::{Element, ParseError, parse};
pub use node::{ClassifyError, NodeId, NodeKind, RenderNode, WidgetHandle, classify};
pub use pipeline::{BannerPipeline, InlineExecutor, PipelineState, UiExecutor, UiThreadExecutor};
pub use resource::{FetchError, HttpFetcher, InMemoryFetcher, PreparedImage, ResourceFetcher};
pub use style::{Align, Border, Color, Insets, Styled};
