//! Headless command-line engine adapter.
//!
//! Invokes `<program> [script] headless-run --source S --target T
//! --output-path O <options...>` and hands the child to [`supervise`].

use std::path::PathBuf;

use async_trait::async_trait;
use faceswap_core::options::{value_to_text, EngineOptions};
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::run::{RunObserver, RunOutcome, RunRequest, TransformEngine};
use crate::supervisor::supervise;

/// Subcommand that runs the engine without its UI.
pub const HEADLESS_SUBCOMMAND: &str = "headless-run";

/// Runs the engine as a local child process.
#[derive(Debug, Clone)]
pub struct CliEngine {
    /// Executable to launch (e.g. `python3`).
    program: PathBuf,
    /// Script passed as the first argument, if the program is an interpreter.
    script: Option<PathBuf>,
    /// Working directory for the child. Inherits ours when `None`.
    working_dir: Option<PathBuf>,
}

impl CliEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: None,
            working_dir: None,
        }
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Build the full command line for `request`.
    pub fn command(&self, request: &RunRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(script) = &self.script {
            cmd.arg(script);
        }
        cmd.arg(HEADLESS_SUBCOMMAND)
            .arg("--source")
            .arg(&request.source_path)
            .arg("--target")
            .arg(&request.target_path)
            .arg("--output-path")
            .arg(&request.output_path)
            .args(cli_args(&request.options));
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl TransformEngine for CliEngine {
    fn name(&self) -> &'static str {
        "cli"
    }

    async fn run(
        &self,
        request: &RunRequest,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut cmd = self.command(request);
        supervise(&mut cmd, request, observer, cancel).await
    }
}

/// Render the option bag as command-line flags.
///
/// `face_detector_model = "retinaface"` becomes `--face-detector-model
/// retinaface`. Arrays pass each element as a separate value, `true` emits
/// the bare flag, and `false` or `null` omit the option.
pub fn cli_args(options: &EngineOptions) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in options.iter() {
        let flag = format!("--{}", key.replace('_', "-"));
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => args.push(flag),
            Value::Array(items) => {
                if items.is_empty() {
                    continue;
                }
                args.push(flag);
                args.extend(items.iter().map(value_to_text));
            }
            other => {
                args.push(flag);
                args.push(value_to_text(other));
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::test_helpers::{request_in, write_temp_script, RecordingObserver};

    #[test]
    fn options_render_as_kebab_flags() {
        let mut options = EngineOptions::empty();
        options.insert("face_detector_model", json!("retinaface"));
        options.insert("execution_providers", json!(["cuda", "cpu"]));
        options.insert("execution_thread_count", json!(4));
        options.insert("keep_temp", json!(true));
        options.insert("skip_audio", json!(false));

        let args = cli_args(&options);

        // serde_json maps iterate in key order.
        assert_eq!(
            args,
            vec![
                "--execution-providers",
                "cuda",
                "cpu",
                "--execution-thread-count",
                "4",
                "--face-detector-model",
                "retinaface",
                "--keep-temp",
            ]
        );
    }

    #[test]
    fn command_places_paths_before_options() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut request = request_in(dir.path(), Duration::from_secs(5));
        request.options.insert("face_mask_type", json!("box"));
        let engine = CliEngine::new("python3").with_script("facefusion.py");

        let cmd = engine.command(&request);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "facefusion.py");
        assert_eq!(args[1], HEADLESS_SUBCOMMAND);
        assert_eq!(args[2], "--source");
        assert_eq!(args[3], request.source_path.to_string_lossy());
        assert_eq!(args[6], "--output-path");
        assert_eq!(args[7], request.output_path.to_string_lossy());
        assert_eq!(&args[8..], ["--face-mask-type", "box"]);
    }

    #[tokio::test]
    async fn run_passes_paths_to_the_engine() {
        let dir = tempfile::tempdir().expect("temp dir");
        let request = request_in(dir.path(), Duration::from_secs(5));
        // Writes the artifact wherever --output-path points.
        let script = write_temp_script(
            "out=''\n\
             while [ $# -gt 0 ]; do\n\
               if [ \"$1\" = '--output-path' ]; then out=\"$2\"; fi\n\
               shift\n\
             done\n\
             echo 'Processing frames'\n\
             echo swapped > \"$out\"\n",
        );
        let engine = CliEngine::new("bash").with_script(script.path());
        let mut observer = RecordingObserver::default();

        let outcome = engine
            .run(&request, &mut observer, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            RunOutcome::Success {
                output_path: request.output_path.clone()
            }
        );
        assert_eq!(observer.lines, vec!["Processing frames"]);
        let written = std::fs::read_to_string(&request.output_path).expect("artifact");
        assert_eq!(written.trim(), "swapped");
    }

    #[tokio::test]
    async fn run_uses_the_working_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let request = request_in(dir.path(), Duration::from_secs(5));
        let script = write_temp_script("pwd\n");
        let engine = CliEngine::new("bash")
            .with_script(script.path())
            .with_working_dir(dir.path());
        let mut observer = RecordingObserver::default();

        let outcome = engine
            .run(&request, &mut observer, &CancellationToken::new())
            .await;

        // No artifact written, so the run fails, but the cwd is observable.
        assert!(matches!(outcome, RunOutcome::Failed { .. }));
        let cwd = std::fs::canonicalize(dir.path()).expect("canonical dir");
        let reported = std::fs::canonicalize(&observer.lines[0]).expect("canonical pwd");
        assert_eq!(reported, cwd);
    }
}
