//! Run the measurements listed in a manifest.
//!
//! Manifest format:
//! ```json
//! { "runs": [
//!     { "movement": "flexion", "side": "left", "input": "a.mp4", "landmarks": "a.jsonl" },
//!     { "movement": "pys", "side": "right", "input": "b.mp4", "detector": "detect-hands" }
//! ] }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gonio_common::config::AppConfig;
use gonio_model::movement::ReferenceRange;
use gonio_model::report::AnalysisReport;
use gonio_pipeline::{
    AnalysisOverrides, JsonReportWriter, MeasurementLogWriter, MeasurementSession,
    ResultConsumer, RunConfig, RunRequest,
};
use gonio_video::{FfmpegBackend, VideoBackend};
use serde::Deserialize;
use tokio::sync::Semaphore;

use super::{print_report, ProviderArgs};

#[derive(Debug, Deserialize)]
struct Manifest {
    runs: Vec<ManifestRun>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestRun {
    movement: String,
    side: String,
    input: PathBuf,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    trace: Option<PathBuf>,
    #[serde(default)]
    reference_range: Option<ReferenceRange>,
    #[serde(flatten)]
    provider: ProviderArgs,
}

impl ManifestRun {
    /// Relative paths are taken relative to the manifest's directory.
    fn rebase(mut self, base: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.input = rebase(self.input);
        self.output = self.output.map(rebase);
        self.trace = self.trace.map(rebase);
        self.provider.landmarks = self.provider.landmarks.map(rebase);
        self
    }
}

pub async fn run(
    app: AppConfig,
    manifest_path: PathBuf,
    jobs: usize,
    log: Option<PathBuf>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| anyhow::anyhow!("Failed to read manifest {}: {e}", manifest_path.display()))?;
    let manifest: Manifest = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid manifest: {e}"))?;
    let base = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let backend: Arc<dyn VideoBackend> = Arc::new(FfmpegBackend::new(&app.video));
    if !backend.is_available() {
        anyhow::bail!("{} is not available", app.video.ffmpeg);
    }

    let jobs = jobs.max(1);
    println!("Running {} measurement(s), {jobs} at a time", manifest.runs.len());
    println!();

    let app = Arc::new(app);
    let permits = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::with_capacity(manifest.runs.len());
    for (index, entry) in manifest.runs.into_iter().enumerate() {
        let entry = entry.rebase(&base);
        let app = app.clone();
        let backend = backend.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            tokio::task::spawn_blocking(move || run_entry(&app, backend, entry))
                .await?
                .map_err(|e| anyhow::anyhow!("run {}: {e}", index + 1))
        }));
    }

    let mut reports = Vec::new();
    let mut failures = 0usize;
    for handle in handles {
        match handle.await? {
            Ok(report) => reports.push(report),
            Err(err) => {
                failures += 1;
                tracing::error!(error = %err, "Batch run failed");
                println!("[FAIL] {err}");
            }
        }
    }

    if let Some(path) = log {
        let mut log = MeasurementLogWriter::new(path);
        for report in &reports {
            log.consume(report)?;
        }
    }

    for report in &reports {
        println!();
        print_report(report);
    }

    println!();
    println!("{} succeeded, {failures} failed", reports.len());
    if failures > 0 {
        anyhow::bail!("{failures} run(s) failed");
    }
    Ok(())
}

fn run_entry(
    app: &AppConfig,
    backend: Arc<dyn VideoBackend>,
    entry: ManifestRun,
) -> anyhow::Result<AnalysisReport> {
    let request = RunRequest {
        movement: entry.movement,
        side: entry.side,
        input: entry.input,
        output: entry.output,
        trace: entry.trace,
        overrides: AnalysisOverrides {
            reference_range: entry.reference_range,
            ..Default::default()
        },
    };
    let config = RunConfig::resolve(app, request)?;
    let provider = entry.provider.build(&config.movement)?;

    let mut session = MeasurementSession::new(config, backend, provider);
    let mut writer = JsonReportWriter::new();
    Ok(session.run_with(&mut writer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_paths_rebased_on_manifest_dir() {
        let manifest: Manifest = serde_json::from_str(
            r#"{ "runs": [
                { "movement": "flexion", "side": "left", "input": "a.mp4", "landmarks": "a.jsonl" },
                { "movement": "pys", "side": "derecha", "input": "/abs/b.mp4",
                  "detector": "detect-hands", "detector_args": ["--model", "full"],
                  "reference_range": { "min": 0.0, "max": 90.0 } }
            ] }"#,
        )
        .unwrap();

        let base = Path::new("/data/session");
        let mut runs = manifest.runs.into_iter().map(|r| r.rebase(base));

        let first = runs.next().unwrap();
        assert_eq!(first.input, PathBuf::from("/data/session/a.mp4"));
        assert_eq!(
            first.provider.landmarks,
            Some(PathBuf::from("/data/session/a.jsonl"))
        );
        assert!(first.provider.detector.is_none());

        let second = runs.next().unwrap();
        assert_eq!(second.input, PathBuf::from("/abs/b.mp4"));
        assert_eq!(second.provider.detector.as_deref(), Some("detect-hands"));
        assert_eq!(second.provider.detector_args, vec!["--model", "full"]);
        assert_eq!(second.reference_range.unwrap().max, 90.0);
    }
}
