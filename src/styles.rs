use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// One entry of the art-style catalog.
///
/// Catalog entries are static and looked up by key; the `prompt_addition`
/// phrase is appended to scene prompts to keep every scene in the same
/// visual register.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StyleDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub prompt_addition: &'static str,
    pub description: &'static str,
}

pub const ART_STYLES: &[StyleDescriptor] = &[
    StyleDescriptor {
        key: "Disney Animation",
        name: "Disney Animation",
        prompt_addition: "Disney-style animation, vibrant colors, expressive characters, magical atmosphere, detailed backgrounds, professional Disney art style",
        description: "Classic Disney animated movie style",
    },
    StyleDescriptor {
        key: "Pixar 3D",
        name: "Pixar 3D",
        prompt_addition: "Pixar-style 3D animation, cute characters, warm lighting, detailed textures, cinematic quality, professional 3D rendering",
        description: "Modern Pixar 3D animation style",
    },
    StyleDescriptor {
        key: "Studio Ghibli",
        name: "Studio Ghibli",
        prompt_addition: "Studio Ghibli style, hand-drawn animation, soft watercolor backgrounds, whimsical characters, nature-focused, dreamy atmosphere",
        description: "Beautiful hand-drawn Studio Ghibli style",
    },
    StyleDescriptor {
        key: "Comic Book",
        name: "Comic Book",
        prompt_addition: "Comic book illustration style, bold outlines, dynamic poses, vibrant colors, action-packed scenes, graphic novel art",
        description: "Dynamic comic book style",
    },
];

static STYLE_INDEX: Lazy<HashMap<&'static str, &'static StyleDescriptor>> =
    Lazy::new(|| ART_STYLES.iter().map(|s| (s.key, s)).collect());

pub fn style_by_key(key: &str) -> Option<&'static StyleDescriptor> {
    STYLE_INDEX.get(key).copied()
}
