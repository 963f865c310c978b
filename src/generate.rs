//! The two text-backend stages: guide derivation and prompt expansion.

use tracing::{debug, warn};

use crate::backend::TextBackend;
use crate::error::ExpandError;
use crate::parser::parse_prompt_groups;
use crate::pipeline::{ProgressEvent, ScenePrompt};
use crate::styles::StyleDescriptor;

/// The deterministic guide used when the text backend is unavailable.
pub fn fallback_guide(style: &StyleDescriptor) -> String {
    format!("a basic guide for characters in a {} style", style.key)
}

fn guide_instruction(story: &str, style: &StyleDescriptor) -> String {
    format!(
        "Create a brief, single-paragraph visual guide for a story in a '{}' style. Story: {}",
        style.key, story
    )
}

fn expansion_instruction(
    story: &str,
    guide: &str,
    style: &StyleDescriptor,
    scene_count: u8,
) -> String {
    format!(
        r#"Generate {scene_count} image prompts for the story below, following the visual guide.
Story: {story}
Visual Guide: {guide}
Art Style: {style_info}
Instructions: Return ONLY a list of lists. Each inner list must contain a single string: the detailed, concise prompt (under 80 words).
Example: [["Prompt 1..."], ["Prompt 2..."]]"#,
        style_info = style.prompt_addition,
    )
}

/// Produces the visual-consistency guide for a run. One backend call;
/// any failure is recovered into [`fallback_guide`] so the run can
/// proceed, with a warning surfaced to the caller.
pub async fn derive_guide<B>(
    backend: &B,
    story: &str,
    style: &StyleDescriptor,
    progress: &mut (dyn FnMut(ProgressEvent) + Send),
) -> String
where
    B: TextBackend + ?Sized,
{
    match backend.generate_text(&guide_instruction(story, style)).await {
        Ok(text) => {
            debug!(chars = text.len(), "guide derived");
            text
        }
        Err(e) => {
            warn!(error = %e, "guide derivation failed, using fallback guide");
            progress(ProgressEvent::Warning {
                scene: None,
                message: "Guide analysis failed. Using a fallback guide.".to_string(),
            });
            fallback_guide(style)
        }
    }
}

/// Expands the story into per-scene prompts. One backend call, then a
/// strict decode of the response. There is no fallback here: without
/// real scene text nothing downstream can render, so both backend and
/// parse failures are fatal to the run.
pub async fn expand_prompts<B>(
    backend: &B,
    story: &str,
    guide: &str,
    style: &StyleDescriptor,
    scene_count: u8,
) -> Result<Vec<ScenePrompt>, ExpandError>
where
    B: TextBackend + ?Sized,
{
    let instruction = expansion_instruction(story, guide, style, scene_count);
    let response = backend.generate_text(&instruction).await?;
    debug!(chars = response.len(), "prompt expansion response received");
    let groups = parse_prompt_groups(&response)?;
    Ok(groups
        .into_iter()
        .map(|mut group| ScenePrompt {
            text: group.swap_remove(0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, ParseError};
    use crate::styles::style_by_key;
    use async_trait::async_trait;

    struct CannedText(Result<String, BackendError>);

    #[async_trait]
    impl TextBackend for CannedText {
        async fn generate_text(&self, _instruction: &str) -> Result<String, BackendError> {
            self.0.clone()
        }
    }

    fn no_progress() -> impl FnMut(ProgressEvent) + Send {
        |_| {}
    }

    #[tokio::test]
    async fn guide_returns_backend_text_verbatim() {
        let backend = CannedText(Ok("two foxes, autumn palette".to_string()));
        let style = style_by_key("Pixar 3D").unwrap();
        let mut progress = no_progress();
        let guide = derive_guide(&backend, "a story", style, &mut progress).await;
        assert_eq!(guide, "two foxes, autumn palette");
    }

    #[tokio::test]
    async fn guide_falls_back_on_backend_error() {
        let backend = CannedText(Err(BackendError::Status { status: 503 }));
        let style = style_by_key("Studio Ghibli").unwrap();
        let mut warned = false;
        let mut progress = |event: ProgressEvent| {
            if matches!(event, ProgressEvent::Warning { .. }) {
                warned = true;
            }
        };
        let guide = derive_guide(&backend, "a story", style, &mut progress).await;
        assert_eq!(guide, "a basic guide for characters in a Studio Ghibli style");
        assert!(warned);
    }

    #[tokio::test]
    async fn expansion_decodes_prompts_in_order() {
        let backend = CannedText(Ok(
            "```python\n[[\"first scene\"], [\"second scene\"]]\n```".to_string()
        ));
        let style = style_by_key("Comic Book").unwrap();
        let prompts = expand_prompts(&backend, "a story", "a guide", style, 2)
            .await
            .unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].text, "first scene");
        assert_eq!(prompts[1].text, "second scene");
    }

    #[tokio::test]
    async fn expansion_rejects_non_list_response() {
        let backend = CannedText(Ok("not a list".to_string()));
        let style = style_by_key("Comic Book").unwrap();
        let err = expand_prompts(&backend, "a story", "a guide", style, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpandError::Parse(ParseError::Unexpected { .. })));
    }

    #[tokio::test]
    async fn expansion_propagates_backend_failure() {
        let backend = CannedText(Err(BackendError::Transport("connection refused".into())));
        let style = style_by_key("Comic Book").unwrap();
        let err = expand_prompts(&backend, "a story", "a guide", style, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpandError::Backend(_)));
    }
}
