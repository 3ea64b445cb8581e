use std::{borrow::Cow, panic::Location};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
    caller::Frame,
    format::{Field, Record},
    LogLevel, Logger,
};

/// A record under construction. It is written out when dropped.
///
/// Records below the logger's level are never printed and skip the
/// serialization of their attributes.
pub struct Log<'a> {
    logger: &'a Logger,
    comp: Option<&'a str>,
    base: &'a [Field],
    time: DateTime<Utc>,
    level: LogLevel,
    msg: Cow<'static, str>,
    caller: &'static Location<'static>,
    pub caller_fn: Option<&'static str>,
    print: bool,
    attrs: Vec<Field>,
}

impl<'a> Log<'a> {
    #[track_caller]
    pub(crate) fn new(
        logger: &'a Logger,
        comp: Option<&'a str>,
        base: &'a [Field],
        level: LogLevel,
        msg: Cow<'static, str>,
    ) -> Self {
        Log {
            logger,
            comp,
            base,
            time: Utc::now(),
            level,
            msg,
            caller: Location::caller(),
            caller_fn: None,
            print: logger.enabled(level),
            attrs: Vec::new(),
        }
    }

    pub fn attr<T: Serialize>(mut self, name: impl Into<Cow<'static, str>>, value: T) -> Self {
        if self.print {
            let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
            self.attrs.push((name.into(), value));
        }
        self
    }

    pub fn is_printed(&self) -> bool {
        self.print
    }

    pub fn caller_file(&self) -> &'static str {
        self.caller.file()
    }

    pub fn caller_lineno(&self) -> u32 {
        self.caller.line()
    }
}

impl Drop for Log<'_> {
    fn drop(&mut self) {
        if !self.print {
            return;
        }

        self.logger.emit(&Record {
            time: self.time,
            level: self.level,
            msg: &self.msg,
            comp: self.comp,
            frame: Frame::from_location(self.caller).with_function(self.caller_fn),
            fields: [self.base, &self.attrs],
        });
    }
}

/// Start a record from `$logger` (a [`Logger`] or [`crate::CompLogger`]),
/// recording the enclosing function as well as the call site.
///
/// ```no_run
/// use callsite_log::{log, Logger, LogLevel};
///
/// let logger = Logger::new();
/// log!(logger, LogLevel::Info, "listening").attr("port", 8080);
/// log!(logger, LogLevel::Warn, "retry {} of {}", 2, 5);
/// ```
#[macro_export]
macro_rules! log {
    (@fn_name) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);

        // Find and cut the rest of the path
        &name[..name.len() - 3]
    }};
    ($logger:expr, $level:expr, $msg:expr) => {{
        let mut log = $logger.log($level, $msg);
        log.caller_fn = Some($crate::log!(@fn_name));
        log
    }};
    ($logger:expr, $level:expr, $fmt:literal, $($arg:tt)+) => {{
        let mut log = $logger.log($level, format!($fmt, $($arg)+));
        log.caller_fn = Some($crate::log!(@fn_name));
        log
    }};
}
