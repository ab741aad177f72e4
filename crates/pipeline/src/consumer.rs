//! Result consumers: where a finished report goes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use gonio_common::error::{GonioError, GonioResult};
use gonio_model::report::AnalysisReport;

/// Receives one report per run.
pub trait ResultConsumer: Send {
    fn consume(&mut self, report: &AnalysisReport) -> GonioResult<()>;
}

/// Writes `<output stem>.report.json` next to the output video, or into a
/// fixed directory.
#[derive(Debug, Clone, Default)]
pub struct JsonReportWriter {
    dir: Option<PathBuf>,
    written: Vec<PathBuf>,
}

impl JsonReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            written: Vec::new(),
        }
    }

    /// Where the report for `report` is written.
    pub fn report_path(&self, report: &AnalysisReport) -> PathBuf {
        report_path_for(&report.output_video, self.dir.as_deref())
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ResultConsumer for JsonReportWriter {
    fn consume(&mut self, report: &AnalysisReport) -> GonioResult<()> {
        let path = self.report_path(report);
        report.save_json(&path).map_err(|e| {
            GonioError::processing(format!("Failed to write report {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Wrote analysis report");
        self.written.push(path);
        Ok(())
    }
}

/// `<stem>.report.json` beside `output_video`, or inside `dir`.
pub fn report_path_for(output_video: &Path, dir: Option<&Path>) -> PathBuf {
    let stem = output_video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gonio".to_string());
    let name = format!("{stem}.report.json");
    match dir {
        Some(dir) => dir.join(name),
        None => output_video.with_file_name(name),
    }
}

/// Appends flattened measurement records to a JSONL log, one per measured
/// arm of each run.
///
/// Runs that measured nothing are skipped with a warning.
#[derive(Debug, Clone)]
pub struct MeasurementLogWriter {
    path: PathBuf,
    appended: u64,
}

impl MeasurementLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            appended: 0,
        }
    }

    pub fn appended(&self) -> u64 {
        self.appended
    }
}

impl ResultConsumer for MeasurementLogWriter {
    fn consume(&mut self, report: &AnalysisReport) -> GonioResult<()> {
        let records = match report.measurement_records() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(run = %report.id, error = %err, "Skipping measurement log entry");
                return Ok(());
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for record in &records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
            self.appended += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonio_model::movement::{MovementKind, Side};
    use gonio_model::report::{AngleRange, FrameStats};

    fn report(output: PathBuf, range: Option<AngleRange>) -> AnalysisReport {
        AnalysisReport {
            id: "run-1".to_string(),
            created_at: "2026-05-02T09:30:00+00:00".to_string(),
            movement: MovementKind::Flexion,
            side: Side::Left,
            range,
            pronation: None,
            supination: None,
            left: None,
            right: None,
            output_video: output,
            source_video: PathBuf::from("in.mp4"),
            fps: 30.0,
            width: 640,
            height: 480,
            duration_secs: 1.0,
            frames: FrameStats::default(),
            reference_range: None,
        }
    }

    #[test]
    fn test_report_path_beside_video() {
        let path = report_path_for(Path::new("/videos/abc_output.mp4"), None);
        assert_eq!(path, PathBuf::from("/videos/abc_output.report.json"));

        let path = report_path_for(Path::new("/videos/abc_output.mp4"), Some(Path::new("/reports")));
        assert_eq!(path, PathBuf::from("/reports/abc_output.report.json"));
    }

    #[test]
    fn test_json_report_writer_writes_file() {
        let dir = std::env::temp_dir().join("gonio_test_report_writer");
        let _ = std::fs::remove_dir_all(&dir);

        let mut writer = JsonReportWriter::new();
        let report = report(dir.join("run_output.mp4"), Some(AngleRange::new(10.0, 20.0, 2)));
        writer.consume(&report).unwrap();

        let written = &writer.written()[0];
        assert_eq!(written, &dir.join("run_output.report.json"));
        let loaded = AnalysisReport::load_json(written).unwrap();
        assert_eq!(loaded, report);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_measurement_log_skips_empty_runs() {
        let dir = std::env::temp_dir().join("gonio_test_measurement_log");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("measurements.jsonl");

        let mut log = MeasurementLogWriter::new(&path);
        log.consume(&report(PathBuf::from("a.mp4"), None)).unwrap();
        assert_eq!(log.appended(), 0);
        assert!(!path.exists());

        log.consume(&report(PathBuf::from("b.mp4"), Some(AngleRange::new(30.0, 120.0, 9))))
            .unwrap();
        log.consume(&report(PathBuf::from("c.mp4"), Some(AngleRange::new(25.0, 125.0, 9))))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"angle_max\":120.0"));
        assert!(content.contains("\"date\":\"2026-05-02\""));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_measurement_log_keeps_supination_only_runs() {
        let dir = std::env::temp_dir().join("gonio_test_measurement_log_supination");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("measurements.jsonl");

        let mut run = report(PathBuf::from("pys.mp4"), None);
        run.movement = MovementKind::PronationSupination;
        run.supination = Some(AngleRange::new(20.0, 75.0, 14));

        let mut log = MeasurementLogWriter::new(&path);
        log.consume(&run).unwrap();
        assert_eq!(log.appended(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert!(line["angle_min"].is_null());
        assert_eq!(line["secondary"]["max_angle"], 75.0);
        assert_eq!(line["movement"], "pronation-supination");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_measurement_log_writes_each_arm_of_bilateral_run() {
        let dir = std::env::temp_dir().join("gonio_test_measurement_log_bilateral");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("measurements.jsonl");

        let mut run = report(PathBuf::from("both.mp4"), None);
        run.side = Side::Both;
        run.left = Some(AngleRange::new(30.0, 130.0, 8));
        run.right = Some(AngleRange::new(35.0, 138.0, 8));

        let mut log = MeasurementLogWriter::new(&path);
        log.consume(&run).unwrap();
        assert_eq!(log.appended(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("\"side\":\"left\""));
        assert!(lines[1].contains("\"angle_max\":138.0"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
