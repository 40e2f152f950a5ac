//! Adapters for the external face-swap engine.
//!
//! Two adapters implement [`TransformEngine`]: [`CliEngine`] runs the engine
//! as a supervised child process, [`HttpEngine`] drives a remote engine
//! service over HTTP. [`EngineConfig`] picks one from the environment.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod run;
pub mod supervisor;

pub use cli::CliEngine;
pub use config::{EngineConfig, EngineMode};
pub use error::EngineError;
pub use http::HttpEngine;
pub use run::{RunObserver, RunOutcome, RunRequest, TransformEngine};

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    use faceswap_core::options::EngineOptions;

    use crate::run::{RunObserver, RunRequest};

    /// Create source/target inputs in `dir` and point the output next to them.
    pub fn request_in(dir: &Path, deadline: Duration) -> RunRequest {
        let source_path = dir.join("source.jpg");
        let target_path = dir.join("target.mp4");
        std::fs::write(&source_path, b"fake jpeg bytes").expect("write source");
        std::fs::write(&target_path, b"fake mp4 bytes").expect("write target");
        RunRequest {
            source_path,
            target_path,
            output_path: dir.join("out.mp4"),
            options: EngineOptions::empty(),
            deadline,
        }
    }

    pub fn write_temp_script(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp file");
        writeln!(f, "#!/bin/bash").expect("write shebang");
        write!(f, "{body}").expect("write body");
        f
    }

    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        pub started: bool,
        pub lines: Vec<String>,
    }

    impl RunObserver for RecordingObserver {
        fn started(&mut self) {
            self.started = true;
        }

        fn line(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }
    }
}
