//! Manim scene modules generated from beats.

mod builder;
mod template;
mod text;

pub use builder::{
    build_all_scene_files, build_scene_file, scene_source, to_class_name, SceneFile, SceneStyle,
    DEFAULT_SCENE_DURATION,
};
pub use text::{normalize_text, resolve_color, safe_range};
