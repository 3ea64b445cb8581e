use std::{
    borrow::Cow,
    fmt,
    fs::{self, OpenOptions},
    io::{self, Write},
    panic::Location,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::{
    caller::{CallStack, CallerResolver, FunctionNames},
    format::{self, Field, Record},
    LogError, LogLevel, Log, LoggerConfig,
};

struct Shared {
    level: AtomicU8,
    json: AtomicBool,
    report_caller: AtomicBool,
    out: Mutex<Box<dyn Write + Send>>,
    resolver: CallerResolver,
}

/// Handle to a logger; clones share level, format, output and the caller
/// location caches.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("json", &self.is_json())
            .field("report_caller", &self.report_caller())
            .field("prefixes", &self.shared.resolver.prefixes())
            .finish()
    }
}

impl Logger {
    /// Text records at `info` and above on stderr, with caller locations.
    pub fn new() -> Self {
        Self::with_function_names(FunctionNames::default())
    }

    pub fn with_function_names(functions: FunctionNames) -> Self {
        Logger {
            shared: Arc::new(Shared {
                level: AtomicU8::new(LogLevel::default() as u8),
                json: AtomicBool::new(false),
                report_caller: AtomicBool::new(true),
                out: Mutex::new(Box::new(io::stderr())),
                resolver: CallerResolver::with_function_names(functions),
            }),
        }
    }

    /// Amend a live logger from a loaded config. The output is switched last,
    /// so a log file that cannot be opened leaves the logger untouched.
    pub fn apply_config(&self, cfg: &LoggerConfig) -> Result<(), LogError> {
        let out: Option<Box<dyn Write + Send>> = match cfg.log_file.as_str() {
            "" => None,
            "stderr" => Some(Box::new(io::stderr())),
            "stdout" => Some(Box::new(io::stdout())),
            path => Some(Box::new(open_log_file(Path::new(path))?)),
        };

        self.set_level(cfg.level);
        self.set_json(cfg.use_json);
        self.set_report_caller(!cfg.disable_src_file);
        if let Some(n) = cfg.src_keep_dirs {
            self.set_keep_dirs(n);
        }
        if let Some(out) = out {
            self.set_output(out);
        }
        Ok(())
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.shared.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn set_level_name(&self, name: &str) -> Result<(), LogError> {
        self.set_level(name.parse()?);
        Ok(())
    }

    /// Cheap check for guarding expensive debug output.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    pub fn is_json(&self) -> bool {
        self.shared.json.load(Ordering::Relaxed)
    }

    pub fn set_json(&self, json: bool) {
        self.shared.json.store(json, Ordering::Relaxed);
    }

    pub fn report_caller(&self) -> bool {
        self.shared.report_caller.load(Ordering::Relaxed)
    }

    pub fn set_report_caller(&self, enabled: bool) {
        self.shared.report_caller.store(enabled, Ordering::Relaxed);
    }

    pub fn set_output(&self, out: Box<dyn Write + Send>) {
        self.replace_output(out);
    }

    pub fn replace_output(&self, out: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
        let mut current = self.shared.out.lock();
        let _ = current.flush();
        std::mem::replace(&mut *current, out)
    }

    pub fn resolver(&self) -> &CallerResolver {
        &self.shared.resolver
    }

    /// Strip the directory `up_n_dirs` levels above the calling source file
    /// from every logged file path, e.g. from `src/lib.rs` of a module rooted
    /// two levels up:
    ///
    /// ```no_run
    /// # let logger = callsite_log::Logger::new();
    /// logger.add_caller_src_path_prefix(1).expect("module root");
    /// ```
    ///
    /// The call site is taken through `#[track_caller]`: a helper that calls
    /// this on behalf of its own caller must be `#[track_caller]` too.
    #[track_caller]
    pub fn add_caller_src_path_prefix(&self, up_n_dirs: usize) -> Result<String, LogError> {
        self.add_src_path_prefix_from(&Location::caller(), up_n_dirs, 0)
    }

    /// Like [`Logger::add_caller_src_path_prefix`] for an explicit call stack,
    /// using the frame `skip` levels above its top.
    pub fn add_src_path_prefix_from<S>(&self, stack: &S, up_n_dirs: usize, skip: usize) -> Result<String, LogError>
    where
        S: CallStack + ?Sized,
    {
        self.shared.resolver.add_ancestor_prefix(stack, up_n_dirs, skip)
    }

    pub fn add_src_path_prefix(&self, prefix: &str) {
        self.shared.resolver.add_prefix(prefix);
    }

    /// How many directories to keep in front of the file name when the path
    /// matches no prefix: `/a/b/c/f.rs` with `n == 2` logs as `b/c/f.rs`.
    /// Defaults to 1.
    pub fn set_keep_dirs(&self, n: usize) {
        self.shared.resolver.set_keep_dirs(n);
    }

    pub fn comp(&self, name: impl Into<String>) -> CompLogger {
        CompLogger {
            logger: self.clone(),
            comp: Some(name.into()),
            fields: Vec::new(),
        }
    }

    pub fn with_field<T: Serialize>(&self, name: impl Into<Cow<'static, str>>, value: T) -> CompLogger {
        CompLogger {
            logger: self.clone(),
            comp: None,
            fields: Vec::new(),
        }
        .with_field(name, value)
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        Log::new(self, None, &[], level, msg.into())
    }

    #[track_caller]
    pub fn trace(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Trace, msg)
    }

    #[track_caller]
    pub fn debug(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Debug, msg)
    }

    #[track_caller]
    pub fn info(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Info, msg)
    }

    #[track_caller]
    pub fn warn(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Warn, msg)
    }

    #[track_caller]
    pub fn error(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Error, msg)
    }

    pub(crate) fn emit(&self, record: &Record<'_>) {
        let caller = if self.report_caller() {
            Some(self.shared.resolver.resolve(&record.frame))
        } else {
            None
        };
        let line = format::render(record, caller.as_deref(), self.is_json());

        let mut out = self.shared.out.lock();
        let _ = out.write_all(line.as_bytes());
    }
}

fn open_log_file(path: &Path) -> Result<fs::File, LogError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// A logger that tags every record with a component name and a fixed set of
/// extra fields.
#[derive(Clone, Debug)]
pub struct CompLogger {
    logger: Logger,
    comp: Option<String>,
    fields: Vec<Field>,
}

impl CompLogger {
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn comp(&self) -> Option<&str> {
        self.comp.as_deref()
    }

    pub fn with_field<T: Serialize>(&self, name: impl Into<Cow<'static, str>>, value: T) -> CompLogger {
        let mut derived = self.clone();
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        derived.fields.push((name.into(), value));
        derived
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.logger.enabled(level)
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        Log::new(&self.logger, self.comp.as_deref(), &self.fields, level, msg.into())
    }

    #[track_caller]
    pub fn trace(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Trace, msg)
    }

    #[track_caller]
    pub fn debug(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Debug, msg)
    }

    #[track_caller]
    pub fn info(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Info, msg)
    }

    #[track_caller]
    pub fn warn(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Warn, msg)
    }

    #[track_caller]
    pub fn error(&self, msg: impl Into<Cow<'static, str>>) -> Log<'_> {
        self.log(LogLevel::Error, msg)
    }
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};

    use crate::{
        caller::{CallSiteKey, Frame},
        log,
        testutils::LogCollector,
        LogError, LogLevel, Logger, LoggerConfig,
    };

    fn records(collector: &LogCollector<'_, Logger>) -> Vec<Value> {
        collector
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_levels_filter() {
        let logger = Logger::new();
        logger.set_json(true);
        let collector = LogCollector::new(&logger, Some(LogLevel::Warn));

        logger.debug("hidden").attr("n", 1);
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown too");

        let recs = records(&collector);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0]["level"], json!("warn"));
        assert_eq!(recs[1]["msg"], json!("shown too"));
        assert!(!logger.enabled(LogLevel::Info));
    }

    #[test]
    fn test_set_level_name() {
        let logger = Logger::new();
        logger.set_level_name("DEBUG").unwrap();
        assert_eq!(logger.level(), LogLevel::Debug);

        assert!(matches!(logger.set_level_name("loud"), Err(LogError::Level(_))));
        assert_eq!(logger.level(), LogLevel::Debug);
    }

    #[test]
    fn test_component_loggers() {
        let logger = Logger::new();
        logger.set_json(true);
        let collector = LogCollector::new(&logger, None);

        let comp = logger.comp("Comp1");
        let extra = comp.with_field("extra_info", "text");
        comp.info("plain");
        extra.warn("with extra").attr("count", 2);

        let recs = records(&collector);
        assert_eq!(recs[0]["comp"], json!("Comp1"));
        assert!(recs[0].get("extra_info").is_none());
        assert_eq!(recs[1]["comp"], json!("Comp1"));
        assert_eq!(recs[1]["extra_info"], json!("text"));
        assert_eq!(recs[1]["count"], json!(2));
    }

    #[test]
    fn test_caller_location() {
        let logger = Logger::new();
        logger.set_json(true);
        let prefix = logger.add_caller_src_path_prefix(0).unwrap();
        let collector = LogCollector::new(&logger, None);

        let line = line!() + 1;
        logger.info("here");

        let recs = records(&collector);
        let file = recs[0]["file"].as_str().unwrap();
        let expected_path = file!().strip_prefix(prefix.as_str()).unwrap_or(file!());
        assert_eq!(file, format!("{expected_path}:{line}"));
        assert!(recs[0].get("func").is_none());
    }

    #[test]
    fn test_macro_records_function() {
        let logger = Logger::with_function_names(crate::FunctionNames::Short);
        logger.set_json(true);
        let collector = LogCollector::new(&logger, None);

        log!(logger, LogLevel::Info, "hello").attr("what", 12);
        log!(logger, LogLevel::Info, "retry {} of {}", 2, 5);

        let recs = records(&collector);
        assert_eq!(recs[0]["func"], json!("test_macro_records_function"));
        assert_eq!(recs[0]["what"], json!(12));
        assert_eq!(recs[1]["msg"], json!("retry 2 of 5"));
    }

    #[test]
    fn test_disable_src_file() {
        let logger = Logger::new();
        logger
            .apply_config(&LoggerConfig {
                disable_src_file: true,
                ..LoggerConfig::default()
            })
            .unwrap();
        let collector = LogCollector::new(&logger, None);

        logger.info("no caller");

        let recs = records(&collector);
        assert!(recs[0].get("file").is_none());
        assert_eq!(logger.resolver().cached_call_sites(), 0);
    }

    #[test]
    fn test_text_output() {
        let logger = Logger::new();
        let collector = LogCollector::new(&logger, None);

        logger.comp("main").info("started").attr("port", 8080);

        let lines = collector.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("time=\""), "{}", lines[0]);
        assert!(lines[0].contains(" level=info comp=main file=\""), "{}", lines[0]);
        assert!(lines[0].ends_with(" port=8080 msg=started"), "{}", lines[0]);
    }

    #[test]
    fn test_log_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/app.log");

        let logger = Logger::new();
        logger
            .apply_config(&LoggerConfig {
                log_file: path.to_string_lossy().into_owned(),
                level: LogLevel::Debug,
                ..LoggerConfig::default()
            })
            .unwrap();
        logger.debug("to file").attr("k", "v");
        logger.set_output(Box::new(std::io::sink()));

        let contents = std::fs::read_to_string(&path).unwrap();
        let rec: Value = serde_json::from_str(contents.trim_end()).unwrap();
        assert_eq!(rec["msg"], json!("to file"));
        assert_eq!(rec["level"], json!("debug"));
        assert_eq!(rec["k"], json!("v"));
    }

    #[test]
    fn test_bad_log_file_keeps_logger() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let logger = Logger::new();
        let err = logger
            .apply_config(&LoggerConfig {
                log_file: blocker.join("app.log").to_string_lossy().into_owned(),
                level: LogLevel::Error,
                ..LoggerConfig::default()
            })
            .unwrap_err();

        assert!(matches!(err, LogError::Io(_)));
        assert_eq!(logger.level(), LogLevel::Info);
        assert!(!logger.is_json());
    }

    #[test]
    fn test_keep_dirs_and_prefix_from_stack() {
        let logger = Logger::new();
        let stack = vec![Frame {
            key: CallSiteKey::from_raw(1),
            file: "/w/app/pkg/logger.rs",
            line: 3,
            function: None,
        }];

        assert_eq!(logger.add_src_path_prefix_from(&stack, 1, 0).unwrap(), "/w/app/");
        assert!(matches!(
            logger.add_src_path_prefix_from(&stack, 1, 1),
            Err(LogError::LocationUnavailable { depth: 1 })
        ));

        logger.set_keep_dirs(0);
        assert_eq!(logger.resolver().keep_dirs(), 0);
        logger.add_src_path_prefix("/opt/lib");
        assert_eq!(logger.resolver().prefixes(), vec!["/opt/lib/".to_string(), "/w/app/".to_string()]);
    }
}
