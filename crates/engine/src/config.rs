use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::CliEngine;
use crate::http::HttpEngine;
use crate::run::TransformEngine;

/// Which adapter drives the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Local child process running the headless CLI.
    Cli,
    /// Remote engine service over HTTP.
    Http,
}

impl std::str::FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" => Ok(Self::Cli),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown engine mode '{other}' (expected cli or http)")),
        }
    }
}

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: EngineMode,
    /// Executable launched in CLI mode (default: `python3`).
    pub program: String,
    /// Script handed to `program` (default: `/workspace/facefusion/facefusion.py`).
    pub script: Option<PathBuf>,
    /// Working directory for the child. Defaults to the script's directory.
    pub working_dir: Option<PathBuf>,
    /// Base URL of the engine service in HTTP mode.
    pub url: String,
    /// Per-run deadline.
    pub timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                                |
    /// |-----------------------|----------------------------------------|
    /// | `ENGINE_MODE`         | `cli`                                  |
    /// | `ENGINE_PROGRAM`      | `python3`                              |
    /// | `ENGINE_SCRIPT`       | `/workspace/facefusion/facefusion.py`  |
    /// | `ENGINE_WORKDIR`      | directory of `ENGINE_SCRIPT`           |
    /// | `ENGINE_URL`          | `http://facefusion:7860`               |
    /// | `ENGINE_TIMEOUT_SECS` | `1800`                                 |
    ///
    /// An empty `ENGINE_SCRIPT` runs `ENGINE_PROGRAM` directly.
    pub fn from_env() -> Self {
        let mode: EngineMode = std::env::var("ENGINE_MODE")
            .unwrap_or_else(|_| "cli".into())
            .parse()
            .expect("ENGINE_MODE must be cli or http");

        let program = std::env::var("ENGINE_PROGRAM").unwrap_or_else(|_| "python3".into());

        let script = std::env::var("ENGINE_SCRIPT")
            .unwrap_or_else(|_| "/workspace/facefusion/facefusion.py".into());
        let script = (!script.trim().is_empty()).then(|| PathBuf::from(script));

        let working_dir = std::env::var("ENGINE_WORKDIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                script
                    .as_ref()
                    .and_then(|s| s.parent())
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(PathBuf::from)
            });

        let url = std::env::var("ENGINE_URL").unwrap_or_else(|_| "http://facefusion:7860".into());

        let timeout_secs: u64 = std::env::var("ENGINE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("ENGINE_TIMEOUT_SECS must be a valid u64");

        Self {
            mode,
            program,
            script,
            working_dir,
            url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Construct the configured adapter.
    pub fn build(&self) -> Arc<dyn TransformEngine> {
        match self.mode {
            EngineMode::Cli => {
                let mut engine = CliEngine::new(&self.program);
                if let Some(script) = &self.script {
                    engine = engine.with_script(script);
                }
                if let Some(dir) = &self.working_dir {
                    engine = engine.with_working_dir(dir);
                }
                Arc::new(engine)
            }
            EngineMode::Http => Arc::new(HttpEngine::new(self.url.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_mode_parses_case_insensitively() {
        assert_eq!("cli".parse::<EngineMode>(), Ok(EngineMode::Cli));
        assert_eq!(" HTTP ".parse::<EngineMode>(), Ok(EngineMode::Http));
        assert!("grpc".parse::<EngineMode>().is_err());
    }

    #[test]
    fn build_selects_the_adapter() {
        let mut config = EngineConfig {
            mode: EngineMode::Cli,
            program: "python3".into(),
            script: Some(PathBuf::from("/opt/engine/run.py")),
            working_dir: None,
            url: "http://localhost:7860".into(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(config.build().name(), "cli");

        config.mode = EngineMode::Http;
        assert_eq!(config.build().name(), "http");
    }
}
