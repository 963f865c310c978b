//! storyviz — turns a short natural-language story into a sequence of
//! illustrated scenes.
//!
//! Three-stage pipeline: a style-aware visual guide is derived from the
//! story, the guide is expanded into per-scene image prompts, and each
//! prompt is rendered through an image backend with bounded retry and a
//! placeholder image on terminal failure. Presentation is the caller's
//! concern; this crate returns an ordered list of (prompt, image) pairs
//! plus a progress event feed.

pub mod backend;
pub mod clipdrop;
pub mod error;
pub mod export;
pub mod gemini;
pub mod generate;
pub mod job;
pub mod parser;
pub mod pipeline;
pub mod placeholder;
pub mod render;
pub mod settings;
pub mod styles;

pub use backend::{ImageBackend, TextBackend};
pub use clipdrop::ClipdropClient;
pub use error::{BackendError, ExpandError, ParseError, PipelineError, RequestError};
pub use gemini::GeminiClient;
pub use job::{JobBoard, JobId, StoryJobStatus};
pub use pipeline::{
    validate_request, Pipeline, PipelineRun, ProgressEvent, ScenePrompt, StoryStage,
};
pub use placeholder::render_placeholder;
pub use render::{RenderOptions, RenderedScene};
pub use settings::Settings;
pub use styles::{style_by_key, StyleDescriptor, ART_STYLES};

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honoring `RUST_LOG`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
