//! Manim renders, one subprocess per beat.
//!
//! Each beat renders in its own process so Manim's global state never leaks
//! between beats and a crash cannot take the server down with it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::future::join_all;
use mathviz_config::{Quality, Settings};
use mathviz_core::EngineError;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::command::{head, tail, CommandRunner, RunOptions};

const OUTPUT_TAIL_CHARS: usize = 2000;
const ERROR_MESSAGE_CHARS: usize = 500;

/// One beat to render.
#[derive(Debug, Clone)]
pub struct RenderTask {
    pub beat_id: String,
    pub scene_file: PathBuf,
    pub class_name: String,
    pub media_dir: PathBuf,
}

/// Successful renders by beat id, and error messages for the rest.
pub type RenderOutcome = (HashMap<String, PathBuf>, HashMap<String, String>);

/// Locates the final MP4 Manim wrote under `media_dir`.
///
/// Partial movie files and `_temp` outputs are ignored. An exact class-name
/// match wins, otherwise the most recently modified file.
pub fn find_rendered_mp4(media_dir: &Path, class_name: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut pending = vec![media_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().is_some_and(|n| n != "partial_movie_files") {
                    pending.push(path);
                }
                continue;
            }
            let is_mp4 = path.extension().is_some_and(|e| e == "mp4");
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if is_mp4 && !stem.ends_with("_temp") {
                candidates.push(path);
            }
        }
    }

    if let Some(exact) = candidates
        .iter()
        .find(|p| p.file_stem().is_some_and(|s| s == class_name))
    {
        return Some(exact.clone());
    }

    candidates.into_iter().max_by_key(|p| {
        std::fs::metadata(p)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    })
}

/// Runs `manim render` for generated scene modules.
pub struct ManimRenderer {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ManimRenderer {
    /// `command` may carry leading arguments, e.g. `python -m manim`.
    ///
    /// The command is split on whitespace unless it names an existing file,
    /// so an executable whose path contains spaces must be given bare.
    pub fn new(command: &str, timeout: Duration) -> Self {
        let command = command.trim();
        if Path::new(command).is_file() {
            return Self {
                program: command.to_string(),
                base_args: Vec::new(),
                timeout,
                cancel: CancellationToken::new(),
            };
        }
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "manim".to_string());
        Self {
            program,
            base_args: parts.collect(),
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.manim_command,
            Duration::from_secs(settings.render_timeout_secs),
        )
    }

    /// Token that aborts every in-flight render when cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Renders one scene class and returns the produced MP4.
    ///
    /// Manim runs inside the scene file's own directory. Generated scenes
    /// import nothing local, so no project root is needed on `sys.path`;
    /// both paths are made absolute so relative output dirs still resolve.
    pub async fn render_segment(
        &self,
        scene_file: &Path,
        class_name: &str,
        media_dir: &Path,
        quality: Quality,
    ) -> Result<PathBuf, EngineError> {
        tokio::fs::create_dir_all(media_dir)
            .await
            .map_err(|e| EngineError::io(media_dir, e))?;
        let scene_file = std::path::absolute(scene_file).map_err(|e| EngineError::io(scene_file, e))?;
        let media_dir = std::path::absolute(media_dir).map_err(|e| EngineError::io(media_dir, e))?;

        let mut args = self.base_args.clone();
        args.extend([
            "render".to_string(),
            scene_file.to_string_lossy().into_owned(),
            class_name.to_string(),
            format!("-q{}", quality.manim_flag()),
            "--media_dir".to_string(),
            media_dir.to_string_lossy().into_owned(),
            "--disable_caching".to_string(),
        ]);

        let mut options = RunOptions::default()
            .timeout(self.timeout)
            .cancel_with(self.cancel.clone())
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUTF8", "1");
        if let Some(dir) = scene_file.parent() {
            options = options.work_dir(dir);
        }

        info!("Rendering {} ({} quality)", class_name, quality);
        let output = CommandRunner::run(&self.program, &args, &options)
            .await
            .map_err(|e| EngineError::Render(format!("{} ({})", e, class_name)))?;

        if !output.success() {
            return Err(EngineError::Render(format!(
                "Manim render failed for '{}':\nSTDOUT: {}\nSTDERR: {}",
                class_name,
                tail(&output.stdout, OUTPUT_TAIL_CHARS),
                tail(&output.stderr, OUTPUT_TAIL_CHARS)
            )));
        }

        let mp4 = find_rendered_mp4(&media_dir, class_name).ok_or_else(|| {
            EngineError::Render(format!(
                "Manim reported success but no .mp4 found in {}",
                media_dir.display()
            ))
        })?;

        info!("Rendered {} -> {}", class_name, mp4.display());
        Ok(mp4)
    }

    /// Renders all tasks with at most `max_workers` Manim processes at once.
    ///
    /// Failures are collected per beat rather than aborting the batch.
    pub async fn render_all_parallel(
        &self,
        tasks: &[RenderTask],
        quality: Quality,
        max_workers: usize,
    ) -> RenderOutcome {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));

        let renders = tasks.iter().map(|task| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => {
                        self.render_segment(&task.scene_file, &task.class_name, &task.media_dir, quality)
                            .await
                    }
                    Err(e) => Err(EngineError::Render(e.to_string())),
                };
                (task.beat_id.clone(), result)
            }
        });

        let mut rendered = HashMap::new();
        let mut errors = HashMap::new();
        for (beat_id, result) in join_all(renders).await {
            match result {
                Ok(path) => {
                    rendered.insert(beat_id, path);
                }
                Err(e) => {
                    error!("Render failed for beat '{}': {}", beat_id, e);
                    errors.insert(beat_id, head(&e.to_string(), ERROR_MESSAGE_CHARS).to_string());
                }
            }
        }

        (rendered, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fake manim: `sh <script> render <file> <Class> -q? --media_dir <dir> --disable_caching`.
    fn fake_manim(dir: &Path, script: &str) -> ManimRenderer {
        let path = dir.join("fake_manim.sh");
        fs::write(&path, script).unwrap();
        ManimRenderer::new(&format!("sh {}", path.display()), Duration::from_secs(10))
    }

    const WRITES_MP4: &str = r#"
case "$3" in
  *fail*) echo "LaTeX Error: boom" >&2; exit 1 ;;
esac
out="$6/videos/scene/480p15"
mkdir -p "$out/partial_movie_files/$3"
touch "$out/partial_movie_files/$3/00000.mp4"
touch "$out/$3.mp4"
"#;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_exact_class_and_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        let q = dir.path().join("videos/beat_a/720p30");
        touch(&q.join("partial_movie_files/MathVizScene_a/x.mp4"));
        touch(&q.join("MathVizScene_a_temp.mp4"));
        touch(&q.join("Other.mp4"));
        touch(&q.join("MathVizScene_a.mp4"));

        let found = find_rendered_mp4(dir.path(), "MathVizScene_a").unwrap();
        assert_eq!(found, q.join("MathVizScene_a.mp4"));
    }

    #[test]
    fn falls_back_to_any_final_mp4() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("videos/s/480p15/Renamed.mp4"));
        touch(&dir.path().join("videos/s/480p15/partial_movie_files/C/1.mp4"));

        let found = find_rendered_mp4(dir.path(), "C").unwrap();
        assert!(found.ends_with("Renamed.mp4"));
    }

    #[test]
    fn nothing_found_in_partials_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("videos/s/480p15/partial_movie_files/C/1.mp4"));
        assert!(find_rendered_mp4(dir.path(), "C").is_none());
        assert!(find_rendered_mp4(&dir.path().join("missing"), "C").is_none());
    }

    #[test]
    fn command_with_arguments_is_split() {
        let r = ManimRenderer::new("python -m manim", Duration::from_secs(1));
        assert_eq!(r.program, "python");
        assert_eq!(r.base_args, vec!["-m", "manim"]);
    }

    #[test]
    fn existing_program_path_with_spaces_is_kept_whole() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("my tools").join("manim");
        touch(&program);

        let r = ManimRenderer::new(&format!(" {} ", program.display()), Duration::from_secs(1));
        assert_eq!(r.program, program.to_string_lossy());
        assert!(r.base_args.is_empty());
    }

    #[tokio::test]
    async fn manim_runs_in_scene_directory_with_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_manim(
            dir.path(),
            r#"
pwd > "$6/cwd.txt"
echo "$2" > "$6/scene.txt"
mkdir -p "$6/videos/s/480p15"
touch "$6/videos/s/480p15/$3.mp4"
"#,
        );
        let scene = dir.path().join("scenes/job/beat_a.py");
        touch(&scene);
        let media = dir.path().join("media/a");

        renderer
            .render_segment(&scene, "MathVizScene_a", &media, Quality::Low)
            .await
            .unwrap();

        let cwd = fs::read_to_string(media.join("cwd.txt")).unwrap();
        assert_eq!(
            fs::canonicalize(cwd.trim()).unwrap(),
            fs::canonicalize(scene.parent().unwrap()).unwrap()
        );
        let passed = fs::read_to_string(media.join("scene.txt")).unwrap();
        assert!(Path::new(passed.trim()).is_absolute());
    }

    #[tokio::test]
    async fn render_segment_returns_class_mp4() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_manim(dir.path(), WRITES_MP4);
        let scene = dir.path().join("scenes/beat_a.py");
        touch(&scene);
        let media = dir.path().join("media/a");

        let mp4 = renderer
            .render_segment(&scene, "MathVizScene_a", &media, Quality::Low)
            .await
            .unwrap();
        assert_eq!(mp4, media.join("videos/scene/480p15/MathVizScene_a.mp4"));
    }

    #[tokio::test]
    async fn failed_render_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_manim(dir.path(), WRITES_MP4);
        let scene = dir.path().join("beat.py");
        touch(&scene);

        let err = renderer
            .render_segment(&scene, "MathVizScene_fail", &dir.path().join("m"), Quality::Medium)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Manim render failed for 'MathVizScene_fail'"), "{}", msg);
        assert!(msg.contains("LaTeX Error: boom"));
    }

    #[tokio::test]
    async fn parallel_render_splits_successes_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_manim(dir.path(), WRITES_MP4);
        let scene = dir.path().join("beat.py");
        touch(&scene);

        let tasks: Vec<RenderTask> = ["one", "fail_two", "three"]
            .iter()
            .map(|id| RenderTask {
                beat_id: id.to_string(),
                scene_file: scene.clone(),
                class_name: format!("MathVizScene_{}", id),
                media_dir: dir.path().join("media").join(id),
            })
            .collect();

        let (rendered, errors) = renderer.render_all_parallel(&tasks, Quality::Low, 0).await;

        assert_eq!(rendered.len(), 2);
        assert!(rendered.contains_key("one") && rendered.contains_key("three"));
        assert_eq!(errors.len(), 1);
        assert!(errors["fail_two"].chars().count() <= 500);
    }
}
