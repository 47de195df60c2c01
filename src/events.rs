//! Host-facing events and configuration values.

use crate::error::PipelineError;
use crate::node::{RenderNode, WidgetHandle};
use serde::{Deserialize, Serialize};

/// Requested presentation style of the banner, orthogonal to node layout.
/// Delivered by the server alongside the markup, defaulting to `Center`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Notification,
    Top,
    #[default]
    Center,
    Fullscreen,
}

/// Capability interface through which the pipeline reports to its host.
///
/// Injected at construction; the pipeline never reaches for the host through
/// globals. Callbacks must not call back into the pipeline synchronously.
pub trait BannerDelegate: Send + Sync {
    /// A run finished: the root widget handle, the resolved node tree and
    /// the accepted display mode are ready for mounting.
    fn banner_ready(&self, root: WidgetHandle, tree: &RenderNode, mode: DisplayMode);

    /// A run failed terminally; no banner will be produced.
    fn banner_failed(&self, error: &PipelineError);

    /// A button node was activated with the given action payload.
    fn banner_action(&self, action: &str);

    /// The rendered surface became visible.
    fn banner_shown(&self) {}

    /// The rendered surface was dismissed.
    fn banner_closed(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mode_uses_lowercase_wire_names() {
        let mode: DisplayMode = serde_json::from_str("\"fullscreen\"").unwrap();
        assert_eq!(mode, DisplayMode::Fullscreen);
        assert_eq!(serde_json::to_string(&DisplayMode::Top).unwrap(), "\"top\"");
    }

    #[test]
    fn display_mode_defaults_to_center() {
        assert_eq!(DisplayMode::default(), DisplayMode::Center);
    }
}
