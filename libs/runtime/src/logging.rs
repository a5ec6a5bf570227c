use crate::config::{LoggingConfig, Section};
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

const DEFAULT_SECTION: &str = "default";

// -------- levels --------

fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn file_level(section: &Section) -> LevelFilter {
    if section.file_level.trim().is_empty() {
        parse_level(&section.console_level)
    } else {
        parse_level(&section.file_level)
    }
}

// -------- rotating file writers --------

#[derive(Clone)]
struct RotatingFile(Arc<Mutex<FileRotate<AppendCount>>>);

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

/// Writer that swallows output for targets without a file.
struct MaybeFile(Option<RotatingFile>);

impl Write for MaybeFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes each record to the file of the most specific matching target section,
/// falling back to the default section's file.
#[derive(Clone, Default)]
struct LogFiles {
    default: Option<RotatingFile>,
    // longest prefix first
    by_target: Vec<(String, RotatingFile)>,
}

impl LogFiles {
    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_target.is_empty()
    }

    fn resolve(&self, target: &str) -> Option<RotatingFile> {
        self.by_target
            .iter()
            .find(|(prefix, _)| matches_target(target, prefix))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }
}

impl<'a> fmt::MakeWriter<'a> for LogFiles {
    type Writer = MaybeFile;

    fn make_writer(&'a self) -> Self::Writer {
        MaybeFile(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaybeFile(self.resolve(meta.target()))
    }
}

/// True if `target` is `prefix` itself or a module below it.
fn matches_target(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

/// Relative log paths are placed under `base_dir` (the server home dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(section: &Section, base_dir: &Path) -> std::io::Result<Option<RotatingFile>> {
    if section.file.trim().is_empty() {
        return Ok(None);
    }
    let path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let rot = FileRotate::new(
        &path,
        AppendCount::new(section.max_backups.unwrap_or(3)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Some(RotatingFile(Arc::new(Mutex::new(rot)))))
}

// -------- filters --------

struct Plan {
    console: Targets,
    file: Targets,
    files: LogFiles,
}

fn build_plan(cfg: &LoggingConfig, base_dir: &Path) -> Plan {
    let default = cfg.get(DEFAULT_SECTION);

    let mut console = Targets::new()
        .with_default(default.map_or(LevelFilter::INFO, |s| parse_level(&s.console_level)));
    let mut file = Targets::new().with_default(default.map_or(LevelFilter::OFF, file_level));
    let mut files = LogFiles::default();

    if let Some(section) = default {
        files.default = open_or_warn(DEFAULT_SECTION, section, base_dir);
    }

    let mut sections: Vec<(&String, &Section)> = cfg
        .iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .collect();
    sections.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));

    for (target, section) in sections {
        console = console.with_target(target.clone(), parse_level(&section.console_level));
        file = file.with_target(target.clone(), file_level(section));
        if let Some(w) = open_or_warn(target, section, base_dir) {
            files.by_target.push((target.clone(), w));
        }
    }

    Plan {
        console,
        file,
        files,
    }
}

fn open_or_warn(name: &str, section: &Section, base_dir: &Path) -> Option<RotatingFile> {
    match open_rotating(section, base_dir) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Failed to open log file '{}' for '{}': {}", section.file, name, e);
            None
        }
    }
}

// -------- public init --------

/// Install the global subscriber: a human-readable console layer plus, when any
/// section names a file, a JSON layer written to size-rotated files.
/// Relative file paths resolve against `base_dir` (usually `server.home_dir`).
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // `log` records from dependencies go through tracing as well
    let _ = tracing_log::LogTracer::init();

    let plan = build_plan(cfg, base_dir);

    let console_layer = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.console);

    let file_layer = (!plan.files.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(plan.files)
            .with_filter(plan.file)
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(file: &str) -> Section {
        Section {
            console_level: "info".into(),
            file: file.into(),
            file_level: "debug".into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(parse_level("trace"), LevelFilter::TRACE);
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level("Warn"), LevelFilter::WARN);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("none"), LevelFilter::OFF);
        assert_eq!(parse_level("bogus"), LevelFilter::INFO);
    }

    #[test]
    fn test_file_level_falls_back_to_console_level() {
        let mut s = section("");
        s.file_level.clear();
        s.console_level = "warn".into();
        assert_eq!(file_level(&s), LevelFilter::WARN);
    }

    #[test]
    fn test_target_matching() {
        assert!(matches_target("recipes", "recipes"));
        assert!(matches_target("recipes::domain::service", "recipes"));
        assert!(!matches_target("recipes_extra", "recipes"));
        assert!(!matches_target("api_ingress", "recipes"));
    }

    #[test]
    fn test_relative_log_paths_resolve_under_base_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/app.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/app.log"));
    }

    #[test]
    fn test_plan_routes_targets_to_their_files() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("recipes".into(), section("logs/recipes.log"));
        cfg.insert("api_ingress".into(), section(""));

        let plan = build_plan(&cfg, tmp.path());

        assert!(plan.files.default.is_some());
        assert_eq!(plan.files.by_target.len(), 1);
        assert!(tmp.path().join("logs").is_dir());
        assert!(plan.files.resolve("recipes::domain").is_some());
        assert!(plan.files.resolve("sea_orm").is_some());
    }

    #[test]
    fn test_plan_without_files() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section(""));
        let plan = build_plan(&cfg, tmp.path());
        assert!(plan.files.is_empty());
    }
}
