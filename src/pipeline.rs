//! The run orchestrator: sequences guide derivation, prompt expansion
//! and per-scene rendering, and reports stage progress to the caller.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::backend::{ImageBackend, TextBackend};
use crate::clipdrop::ClipdropClient;
use crate::error::{BackendError, PipelineError, RequestError};
use crate::gemini::GeminiClient;
use crate::generate::{derive_guide, expand_prompts};
use crate::render::{render_scene, RenderOptions, RenderedScene};
use crate::settings::Settings;
use crate::styles::{style_by_key, StyleDescriptor};

pub const MIN_STORY_WORDS: usize = 10;
pub const MIN_SCENES: u8 = 2;
pub const MAX_SCENES: u8 = 8;

/// The rendering text for one scene, decoded from one inner group of the
/// expander's list-of-lists response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScenePrompt {
    pub text: String,
}

/// Where a run currently stands. Linear: `Queued` through `Done`, with
/// `Failed` reachable only from prompt expansion and `Empty` marking a
/// run whose expansion produced zero scenes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StoryStage {
    Queued,
    Guide,
    Prompting,
    Rendering { completed: u32, total: u32 },
    Done,
    Empty,
    Failed { error: String },
}

/// Progress feed consumed by the caller: stage transitions, plus
/// warnings and errors keyed to their scene index where one applies.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Stage(StoryStage),
    Warning {
        scene: Option<usize>,
        message: String,
    },
    Error {
        scene: Option<usize>,
        message: String,
    },
}

/// The finished run: everything each stage produced, in order. Built
/// stage by stage and handed to the caller by value once complete.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub story: String,
    pub style: &'static StyleDescriptor,
    pub scene_count: u8,
    pub guide: String,
    pub prompts: Vec<ScenePrompt>,
    pub scenes: Vec<RenderedScene>,
}

/// Caller-side pre-flight check: the pipeline itself assumes these hold.
pub fn validate_request(story: &str, scene_count: u8) -> Result<(), RequestError> {
    let words = story.split_whitespace().count();
    if words < MIN_STORY_WORDS {
        return Err(RequestError::StoryTooShort {
            got: words,
            min: MIN_STORY_WORDS,
        });
    }
    if !(MIN_SCENES..=MAX_SCENES).contains(&scene_count) {
        return Err(RequestError::SceneCountOutOfRange {
            got: scene_count,
            min: MIN_SCENES,
            max: MAX_SCENES,
        });
    }
    Ok(())
}

/// One pipeline over a text backend and an image backend. Holds no
/// per-run state; each `run` builds and returns a fresh [`PipelineRun`].
#[derive(Debug, Clone)]
pub struct Pipeline<T, I> {
    text: T,
    image: I,
    render: RenderOptions,
}

impl Pipeline<GeminiClient, ClipdropClient> {
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        Ok(Pipeline::new(
            GeminiClient::from_settings(settings)?,
            ClipdropClient::from_settings(settings)?,
        ))
    }
}

impl<T, I> Pipeline<T, I>
where
    T: TextBackend,
    I: ImageBackend,
{
    pub fn new(text: T, image: I) -> Self {
        Self {
            text,
            image,
            render: RenderOptions::default(),
        }
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// Runs the full pipeline for one story. Scenes render sequentially
    /// in prompt order; only prompt expansion can abort the run, and the
    /// loop is driven by however many prompts actually came back (a
    /// count mismatch is reported as a warning, not enforced).
    pub async fn run(
        &self,
        story: &str,
        style_key: &str,
        scene_count: u8,
        mut progress: impl FnMut(ProgressEvent) + Send,
    ) -> Result<PipelineRun, PipelineError> {
        let style = match style_by_key(style_key) {
            Some(style) => style,
            None => {
                let err = PipelineError::UnknownStyle(style_key.to_string());
                progress(ProgressEvent::Stage(StoryStage::Failed {
                    error: err.to_string(),
                }));
                return Err(err);
            }
        };

        info!(style = style.key, scene_count, "pipeline run started");

        progress(ProgressEvent::Stage(StoryStage::Guide));
        let guide = derive_guide(&self.text, story, style, &mut progress).await;

        progress(ProgressEvent::Stage(StoryStage::Prompting));
        let prompts = match expand_prompts(&self.text, story, &guide, style, scene_count).await {
            Ok(prompts) => prompts,
            Err(e) => {
                error!(error = %e, "prompt expansion failed, aborting run");
                progress(ProgressEvent::Error {
                    scene: None,
                    message: format!("Prompt generation failed: {e}"),
                });
                progress(ProgressEvent::Stage(StoryStage::Failed {
                    error: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        if prompts.len() != scene_count as usize {
            warn!(
                requested = scene_count,
                returned = prompts.len(),
                "backend returned a different scene count than requested"
            );
            progress(ProgressEvent::Warning {
                scene: None,
                message: format!(
                    "Requested {scene_count} scenes but the backend returned {}.",
                    prompts.len()
                ),
            });
        }

        let mut run = PipelineRun {
            story: story.to_string(),
            style,
            scene_count,
            guide,
            prompts: prompts.clone(),
            scenes: Vec::with_capacity(prompts.len()),
        };

        if prompts.is_empty() {
            warn!("no prompts returned, no images produced");
            progress(ProgressEvent::Stage(StoryStage::Empty));
            return Ok(run);
        }

        let total = prompts.len() as u32;
        progress(ProgressEvent::Stage(StoryStage::Rendering {
            completed: 0,
            total,
        }));
        for (idx, prompt) in prompts.iter().enumerate() {
            let scene = render_scene(&self.image, prompt, idx, &self.render, &mut progress).await;
            run.scenes.push(scene);
            progress(ProgressEvent::Stage(StoryStage::Rendering {
                completed: idx as u32 + 1,
                total,
            }));
        }

        info!(scenes = run.scenes.len(), "pipeline run finished");
        progress(ProgressEvent::Stage(StoryStage::Done));
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpandError;
    use crate::generate::fallback_guide;
    use crate::placeholder::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const STORY: &str = "A lone astronaut lands on a distant moon and finds a glowing forest \
        breathing beneath the ice, where every tree hums with a light that remembers the stars \
        it fell from long ago.";

    /// Text backend scripted per call: first answer serves the guide
    /// request, the second serves prompt expansion.
    struct ScriptedText {
        answers: Mutex<Vec<Result<String, BackendError>>>,
    }

    impl ScriptedText {
        fn new(answers: Vec<Result<String, BackendError>>) -> Self {
            Self {
                answers: Mutex::new(answers),
            }
        }
    }

    #[async_trait]
    impl TextBackend for ScriptedText {
        async fn generate_text(&self, _instruction: &str) -> Result<String, BackendError> {
            self.answers.lock().unwrap().remove(0)
        }
    }

    /// Image backend returning a tiny PNG, with one prompt substring
    /// optionally forced to fail every attempt.
    struct ScriptedImages {
        calls: AtomicU32,
        fail_containing: Option<&'static str>,
    }

    impl ScriptedImages {
        fn ok() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_containing: None,
            }
        }

        fn failing_on(substr: &'static str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_containing: Some(substr),
            }
        }
    }

    #[async_trait]
    impl ImageBackend for ScriptedImages {
        async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(needle) = self.fail_containing {
                if prompt.contains(needle) {
                    return Err(BackendError::Status { status: 500 });
                }
            }
            let img = image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
            Ok(buf.into_inner())
        }
    }

    fn three_prompts() -> String {
        "[[\"a rocket over dunes\"], [\"a glowing forest canopy\"], [\"an astronaut waving home\"]]"
            .to_string()
    }

    fn fast_pipeline<T: TextBackend, I: ImageBackend>(text: T, image: I) -> Pipeline<T, I> {
        Pipeline::new(text, image).with_render_options(RenderOptions {
            retries: 3,
            delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn full_run_produces_one_scene_per_prompt() {
        let text = ScriptedText::new(vec![
            Ok("a consistent pastel palette".to_string()),
            Ok(three_prompts()),
        ]);
        let pipeline = fast_pipeline(text, ScriptedImages::ok());
        let mut stages = Vec::new();
        let run = pipeline
            .run(STORY, "Comic Book", 3, |e| {
                if let ProgressEvent::Stage(stage) = e {
                    stages.push(stage);
                }
            })
            .await
            .unwrap();

        assert_eq!(run.guide, "a consistent pastel palette");
        assert_eq!(run.prompts.len(), 3);
        assert_eq!(run.scenes.len(), 3);
        assert!(run.scenes.iter().all(|s| !s.placeholder));
        assert_eq!(stages.first(), Some(&StoryStage::Guide));
        assert_eq!(stages.last(), Some(&StoryStage::Done));
        assert!(stages.contains(&StoryStage::Rendering {
            completed: 3,
            total: 3
        }));
    }

    #[tokio::test]
    async fn failing_scene_degrades_to_placeholder_only() {
        let text = ScriptedText::new(vec![
            Ok("a consistent pastel palette".to_string()),
            Ok(three_prompts()),
        ]);
        let images = ScriptedImages::failing_on("glowing forest");
        let pipeline = fast_pipeline(text, images);
        let run = pipeline
            .run(STORY, "Comic Book", 3, |_| {})
            .await
            .unwrap();

        assert_eq!(run.scenes.len(), 3);
        assert!(!run.scenes[0].placeholder);
        assert!(run.scenes[1].placeholder);
        assert!(!run.scenes[2].placeholder);
        assert_eq!(
            run.scenes[1].image.dimensions(),
            (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT)
        );
        assert_eq!(
            run.scenes[1].image,
            crate::placeholder::render_placeholder("a glowing forest canopy")
        );
    }

    #[tokio::test]
    async fn guide_failure_recovers_and_run_continues() {
        let text = ScriptedText::new(vec![
            Err(BackendError::Transport("boom".into())),
            Ok(three_prompts()),
        ]);
        let pipeline = fast_pipeline(text, ScriptedImages::ok());
        let mut warnings = 0;
        let run = pipeline
            .run(STORY, "Comic Book", 3, |e| {
                if matches!(e, ProgressEvent::Warning { .. }) {
                    warnings += 1;
                }
            })
            .await
            .unwrap();

        let style = style_by_key("Comic Book").unwrap();
        assert_eq!(run.guide, fallback_guide(style));
        assert_eq!(run.guide, "a basic guide for characters in a Comic Book style");
        assert_eq!(run.scenes.len(), 3);
        assert!(warnings >= 1);
    }

    #[tokio::test]
    async fn expansion_failure_aborts_with_no_scenes() {
        let text = ScriptedText::new(vec![
            Ok("a guide".to_string()),
            Ok("not a list".to_string()),
        ]);
        let pipeline = fast_pipeline(text, ScriptedImages::ok());
        let mut stages = Vec::new();
        let err = pipeline
            .run(STORY, "Comic Book", 3, |e| {
                if let ProgressEvent::Stage(stage) = e {
                    stages.push(stage);
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Expand(ExpandError::Parse(_))
        ));
        assert!(matches!(stages.last(), Some(StoryStage::Failed { .. })));
        assert!(!stages
            .iter()
            .any(|s| matches!(s, StoryStage::Rendering { .. })));
    }

    #[tokio::test]
    async fn empty_prompt_list_ends_in_empty_state() {
        let text = ScriptedText::new(vec![Ok("a guide".to_string()), Ok("[]".to_string())]);
        let images = ScriptedImages::ok();
        let pipeline = fast_pipeline(text, images);
        let mut stages = Vec::new();
        let run = pipeline
            .run(STORY, "Comic Book", 4, |e| {
                if let ProgressEvent::Stage(stage) = e {
                    stages.push(stage);
                }
            })
            .await
            .unwrap();

        assert!(run.scenes.is_empty());
        assert_eq!(stages.last(), Some(&StoryStage::Empty));
        assert_eq!(pipeline.image.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn count_mismatch_warns_and_renders_what_came_back() {
        let text = ScriptedText::new(vec![
            Ok("a guide".to_string()),
            Ok("[[\"only one scene\"]]".to_string()),
        ]);
        let pipeline = fast_pipeline(text, ScriptedImages::ok());
        let mut mismatch_warned = false;
        let run = pipeline
            .run(STORY, "Comic Book", 5, |e| {
                if let ProgressEvent::Warning { message, .. } = &e {
                    if message.contains("Requested 5") {
                        mismatch_warned = true;
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(run.scenes.len(), 1);
        assert!(mismatch_warned);
    }

    #[tokio::test]
    async fn unknown_style_is_rejected_before_any_backend_call() {
        let text = ScriptedText::new(vec![]);
        let pipeline = fast_pipeline(text, ScriptedImages::ok());
        let err = pipeline
            .run(STORY, "Oil Painting", 3, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::UnknownStyle("Oil Painting".to_string()));
        assert_eq!(pipeline.image.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn request_validation_boundaries() {
        assert!(validate_request(STORY, 2).is_ok());
        assert!(validate_request(STORY, 8).is_ok());
        assert!(matches!(
            validate_request(STORY, 1),
            Err(RequestError::SceneCountOutOfRange { .. })
        ));
        assert!(matches!(
            validate_request(STORY, 9),
            Err(RequestError::SceneCountOutOfRange { .. })
        ));
        assert!(matches!(
            validate_request("too short", 3),
            Err(RequestError::StoryTooShort { .. })
        ));
    }
}
