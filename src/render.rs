//! Per-scene image rendering with bounded retry and placeholder
//! degradation.

use image::RgbImage;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::backend::ImageBackend;
use crate::error::BackendError;
use crate::pipeline::{ProgressEvent, ScenePrompt};
use crate::placeholder::render_placeholder;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Retry budget for one scene. `retries` is the total number of backend
/// calls; the inter-attempt delay is constant, no backoff growth.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_DELAY,
        }
    }
}

/// One scene of the finished story: the prompt it was rendered from and
/// either a backend image or, when every attempt failed, the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedScene {
    pub prompt: ScenePrompt,
    pub image: RgbImage,
    pub placeholder: bool,
}

/// Renders one scene. Retries HTTP errors, transport errors and
/// undecodable payloads alike, sleeping `opts.delay` between attempts
/// (so at most `retries - 1` sleeps). Exhaustion does not fail the run:
/// the scene comes back carrying the placeholder image instead.
pub async fn render_scene<B>(
    backend: &B,
    prompt: &ScenePrompt,
    scene_index: usize,
    opts: &RenderOptions,
    progress: &mut (dyn FnMut(ProgressEvent) + Send),
) -> RenderedScene
where
    B: ImageBackend + ?Sized,
{
    for attempt in 1..=opts.retries {
        let failure = match backend.generate_image(&prompt.text).await {
            Ok(bytes) => match image::load_from_memory(&bytes) {
                Ok(img) => {
                    info!(scene = scene_index, attempt, "scene rendered");
                    return RenderedScene {
                        prompt: prompt.clone(),
                        image: img.to_rgb8(),
                        placeholder: false,
                    };
                }
                Err(e) => format!("Image decode failed: {e}."),
            },
            Err(BackendError::Status { status }) => {
                format!("HTTP error occurred: {status}.")
            }
            Err(e) => format!("Request failed: {e}."),
        };

        warn!(scene = scene_index, attempt, retries = opts.retries, %failure, "render attempt failed");
        progress(ProgressEvent::Warning {
            scene: Some(scene_index),
            message: format!("{failure} Retrying ({attempt}/{})...", opts.retries),
        });

        if attempt < opts.retries {
            tokio::time::sleep(opts.delay).await;
        }
    }

    error!(scene = scene_index, "image generation failed after all retries");
    progress(ProgressEvent::Error {
        scene: Some(scene_index),
        message: "Image generation failed after multiple retries.".to_string(),
    });
    RenderedScene {
        prompt: prompt.clone(),
        image: render_placeholder(&prompt.text),
        placeholder: true,
    }
}
