//! Executes parsed shell scripts against a [`Session`].
//!
//! A failing command never aborts the script: its message is delivered as a
//! session notice and the next command runs.

use crate::error::{LoadError, SelectionError};
use crate::graph;
use crate::loader::DataSource;
use crate::parser::{Assignment, Command, LoadTarget, Pipeline};
use crate::report;
use crate::session::Session;
use crate::{OutputFormat, RenderOptions};
use anyhow::Context;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShellError {
    /// Load and selection failures are announced by the session itself
    fn already_noticed(&self) -> bool {
        !matches!(self, ShellError::Other(_))
    }
}

/// Outcome of running a script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub executed: usize,
    pub failed: usize,
}

pub struct Shell<'a> {
    session: &'a Session,
    render: RenderOptions,
    preview_rows: usize,
    output: Option<String>,
    stdin: Box<dyn Read + 'a>,
}

impl<'a> Shell<'a> {
    pub fn new(session: &'a Session, render: RenderOptions) -> Self {
        Self {
            session,
            render,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            output: None,
            stdin: Box::new(std::io::stdin()),
        }
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Destination for `render()` calls that name no path
    pub fn with_output(mut self, path: Option<String>) -> Self {
        self.output = path;
        self
    }

    /// Source for `load(stdin)`
    pub fn with_input(mut self, input: impl Read + 'a) -> Self {
        self.stdin = Box::new(input);
        self
    }

    pub fn run<W: Write>(&mut self, pipeline: &Pipeline, out: &mut W) -> RunReport {
        let mut report = RunReport::default();

        for command in &pipeline.commands {
            report.executed += 1;
            debug!(command = command.name(), "executing");

            if let Err(err) = self.execute(command, out) {
                report.failed += 1;
                if !err.already_noticed() {
                    self.session
                        .notice(format!("{} failed: {:#}", command.name(), err));
                }
            }
        }

        info!(executed = report.executed, failed = report.failed, "script finished");
        report
    }

    pub fn execute<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<(), ShellError> {
        match command {
            Command::Load(target) => {
                let source = self.source(target)?;
                self.session.load(source)?;
            }
            Command::Set(assignments) => self.apply(assignments)?,
            Command::Preview { rows } => {
                let snapshot = self.session.snapshot();
                let table = report::preview_table(&snapshot.dataset, rows.unwrap_or(self.preview_rows));
                write_text(out, &table)?;
            }
            Command::Summary => write_text(out, &report::summary_table(&self.session.schema()))?,
            Command::Schema => write_text(out, &report::schema_listing(&self.session.schema()))?,
            Command::Render { path } => {
                let path = path.as_deref().or(self.output.as_deref());
                let chart = self.session.render();
                let options = self.options_for(path);
                let bytes = graph::render_chart(&chart, &options)?;
                emit(out, path, &bytes)?;
            }
            Command::Export { path } => {
                let chart = self.session.render();
                let mut json = serde_json::to_vec_pretty(&chart).context("Failed to serialize chart")?;
                json.push(b'\n');
                emit(out, path.as_deref(), &json)?;
            }
        }
        Ok(())
    }

    fn source(&mut self, target: &LoadTarget) -> anyhow::Result<DataSource> {
        let source = match target {
            LoadTarget::Sample => DataSource::Sample,
            LoadTarget::Url(url) => DataSource::Url(url.clone()),
            LoadTarget::File(path) => {
                let bytes = fs::read(path).with_context(|| format!("Failed to read '{}'", path))?;
                DataSource::Upload { name: upload_name(path), bytes }
            }
            LoadTarget::Stdin => {
                let mut bytes = Vec::new();
                self.stdin
                    .read_to_end(&mut bytes)
                    .context("Failed to read CSV from stdin")?;
                DataSource::Upload { name: "stdin".to_string(), bytes }
            }
        };
        Ok(source)
    }

    /// Edits in one `set(...)` stop at the first rejected one
    fn apply(&self, assignments: &[Assignment]) -> Result<(), SelectionError> {
        for Assignment { field, value } in assignments {
            self.session.update_selection(field, &value.as_text())?;
        }
        Ok(())
    }

    /// The output extension wins over the configured format
    fn options_for(&self, path: Option<&str>) -> RenderOptions {
        let mut options = self.render.clone();
        let extension = path
            .and_then(|p| Path::new(p).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("svg") => options.format = OutputFormat::Svg,
            Some("png") => options.format = OutputFormat::Png,
            _ => {}
        }
        options
    }
}

fn upload_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

fn write_text<W: Write>(out: &mut W, text: &str) -> anyhow::Result<()> {
    out.write_all(text.as_bytes()).context("Failed to write output")?;
    out.flush().context("Failed to flush output")?;
    Ok(())
}

fn emit<W: Write>(out: &mut W, path: Option<&str>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Failed to write '{}'", path))?;
            info!(path, size = bytes.len(), "wrote output");
        }
        None => {
            out.write_all(bytes).context("Failed to write output")?;
            out.flush().context("Failed to flush output")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchOptions;
    use crate::loader::{Fetch, Loader};
    use crate::parser::parse_script;
    use crate::session::SessionEvent;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct NoNetwork;

    impl Fetch for NoNetwork {
        fn get(&self, url: &str) -> Result<Vec<u8>, LoadError> {
            Err(LoadError::Network(format!("no route to {}", url)))
        }
    }

    fn session() -> Session {
        Session::with_loader(Loader::new(Box::new(NoNetwork), 42), DispatchOptions::default())
    }

    fn notices(session: &Session) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.subscribe(Box::new(move |event| {
            if let SessionEvent::Notice(msg) = event {
                sink.lock().push(msg.clone());
            }
        }));
        seen
    }

    fn run(session: &Session, script: &str, stdin: &'static [u8]) -> (RunReport, Vec<u8>) {
        let pipeline = parse_script(script).unwrap();
        let mut out = Vec::new();
        let report = Shell::new(session, RenderOptions::default())
            .with_input(stdin)
            .run(&pipeline, &mut out);
        (report, out)
    }

    #[test]
    fn test_preview_from_stdin() {
        let session = session();
        let (report, out) = run(&session, "load(stdin) | preview(rows: 1)", b"a,b\nx,1\ny,NA\n");
        assert_eq!(report, RunReport { executed: 2, failed: 0 });
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("a  b\n"));
        assert!(text.contains("x  1"));
        assert!(text.contains("1 of 2 rows shown"));
    }

    #[test]
    fn test_failures_become_notices_and_script_continues() {
        let session = session();
        let seen = notices(&session);
        let script = r#"load(sample); load(url: "http://nowhere.invalid/a.csv"); set(x: Nope); load(file: "/no/such/file.csv"); schema()"#;
        let (report, out) = run(&session, script, b"");

        assert_eq!(report, RunReport { executed: 5, failed: 3 });
        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].starts_with("Failed to load data"));
        assert!(seen[1].starts_with("Invalid selection"));
        assert!(seen[2].starts_with("load failed"));

        // The sample survived both failed loads
        assert!(String::from_utf8(out).unwrap().starts_with("Product\tcategorical\n"));
    }

    #[test]
    fn test_export_json() {
        let session = session();
        let (_, out) = run(&session, "load(sample) | set(chart: forest, group: Region) | export()", b"");
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["kind"], "forest");
        assert_eq!(json["rows"].as_array().unwrap().len(), 4);
        assert_eq!(json["rows"][0]["n"], 50);
    }

    #[test]
    fn test_render_to_file_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let script = format!("load(sample) | set(chart: histogram, x: Sales) | render(path: \"{}\")", path.display());
        let (report, out) = run(&session(), &script, b"");
        assert_eq!(report.failed, 0);
        assert!(out.is_empty());
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn test_default_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.png");
        let session = session();
        let pipeline = parse_script("load(sample) | render()").unwrap();
        let mut out = Vec::new();
        let report = Shell::new(&session, RenderOptions::default())
            .with_output(Some(path.display().to_string()))
            .run(&pipeline, &mut out);
        assert_eq!(report.failed, 0);
        assert!(out.is_empty());
        assert_eq!(&fs::read(&path).unwrap()[1..4], b"PNG");
    }

    #[test]
    fn test_set_stops_at_first_rejected_edit() {
        let session = session();
        let (report, _) = run(&session, "load(sample) | set(chart: line, ci: 5, chart: box)", b"");
        assert_eq!(report.failed, 1);
        assert_eq!(session.selection().chart, crate::selection::ChartKind::Line);
    }

    #[test]
    fn test_upload_name() {
        assert_eq!(upload_name("/tmp/data/sales.csv"), "sales.csv");
        assert_eq!(upload_name("plain.csv"), "plain.csv");
    }
}
