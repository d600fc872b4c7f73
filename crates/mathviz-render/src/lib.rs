//! Turning beats into video.
//!
//! - [`scene`] - Generates one self-contained Manim module per beat
//! - [`ManimRenderer`] - Renders modules in bounded parallel subprocesses
//! - [`Composer`] - FFmpeg merge, concat, subtitles and final encode
//! - [`command`] - Subprocess runner with timeout and cancellation

pub mod command;
mod compose;
mod manim;
pub mod scene;

pub use command::{CommandError, CommandOutput, CommandRunner, RunOptions};
pub use compose::{concat_list, merge_args, Composer, FALLBACK_DURATION_SECS};
pub use manim::{find_rendered_mp4, ManimRenderer, RenderOutcome, RenderTask};
pub use scene::{build_all_scene_files, build_scene_file, to_class_name, SceneFile, SceneStyle};
