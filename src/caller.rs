use std::{
    collections::HashMap,
    panic::Location,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::{error::LogError, prefix::PrefixTrimCache, trim_fn_path};

/// Identity of a single call site, used only as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteKey(usize);

impl CallSiteKey {
    /// `Location::caller()` hands out one static per call site, so its
    /// address is stable across calls from the same line.
    pub fn of(location: &'static Location<'static>) -> Self {
        CallSiteKey(location as *const Location<'static> as usize)
    }

    pub const fn from_raw(raw: usize) -> Self {
        CallSiteKey(raw)
    }
}

/// What the logger knows about the code that emitted a record.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub key: CallSiteKey,
    pub file: &'a str,
    pub line: u32,
    pub function: Option<&'a str>,
}

impl Frame<'static> {
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Frame {
            key: CallSiteKey::of(location),
            file: location.file(),
            line: location.line(),
            function: None,
        }
    }

    pub fn with_function(mut self, function: Option<&'static str>) -> Self {
        self.function = function;
        self
    }
}

/// Access to the frames above a registration call.
///
/// Depth `0` is the call site that asked for the registration. Functions
/// marked `#[track_caller]` do not count as frames, so wrappers that want to
/// register on behalf of their own caller must carry the attribute as well.
pub trait CallStack {
    fn frame(&self, depth: usize) -> Option<Frame<'_>>;
}

impl CallStack for &'static Location<'static> {
    fn frame(&self, depth: usize) -> Option<Frame<'_>> {
        (depth == 0).then(|| Frame::from_location(*self))
    }
}

impl<'a> CallStack for [Frame<'a>] {
    fn frame(&self, depth: usize) -> Option<Frame<'_>> {
        self.get(depth).copied()
    }
}

impl<'a> CallStack for Vec<Frame<'a>> {
    fn frame(&self, depth: usize) -> Option<Frame<'_>> {
        self.as_slice().frame(depth)
    }
}

/// How much of the calling function's path ends up in the `func` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionNames {
    #[default]
    Omit,
    /// Last path segment only, `handle` for `app::server::handle`.
    Short,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLocation {
    function: String,
    location: String,
}

impl RenderedLocation {
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

struct ResolverState {
    paths: PrefixTrimCache,
    rendered: HashMap<CallSiteKey, Arc<RenderedLocation>>,
}

/// Renders frames as `(function, "path:line")`, once per call site.
///
/// The path trimming rules and the per call site cache share one lock;
/// every operation is a short in-memory update.
pub struct CallerResolver {
    state: Mutex<ResolverState>,
    functions: FunctionNames,
    misses: AtomicU64,
}

impl Default for CallerResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CallerResolver {
    pub fn new() -> Self {
        Self::with_function_names(FunctionNames::default())
    }

    pub fn with_function_names(functions: FunctionNames) -> Self {
        CallerResolver {
            state: Mutex::new(ResolverState {
                paths: PrefixTrimCache::new(),
                rendered: HashMap::new(),
            }),
            functions,
            misses: AtomicU64::new(0),
        }
    }

    pub fn function_names(&self) -> FunctionNames {
        self.functions
    }

    pub fn resolve(&self, frame: &Frame<'_>) -> Arc<RenderedLocation> {
        let mut state = self.state.lock();
        if let Some(rendered) = state.rendered.get(&frame.key) {
            return rendered.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let rendered = Arc::new(RenderedLocation {
            function: self.render_function(frame.function),
            location: format!("{}:{}", state.paths.strip_prefix(frame.file), frame.line),
        });
        state.rendered.insert(frame.key, rendered.clone());
        rendered
    }

    fn render_function(&self, function: Option<&str>) -> String {
        match (self.functions, function) {
            (FunctionNames::Omit, _) | (_, None) => String::new(),
            (FunctionNames::Short, Some(f)) => trim_fn_path(f).to_owned(),
            (FunctionNames::Full, Some(f)) => f.to_owned(),
        }
    }

    /// Number of call sites rendered so far; every other lookup was served
    /// from the cache.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn cached_call_sites(&self) -> usize {
        self.state.lock().rendered.len()
    }

    pub fn add_prefix(&self, prefix: &str) -> bool {
        self.state.lock().paths.add_prefix(prefix)
    }

    /// Register the directory `up_n_dirs` levels above the source file of the
    /// frame found `skip` levels deep in `stack`.
    ///
    /// Call sites already rendered keep their cached text.
    pub fn add_ancestor_prefix<S>(&self, stack: &S, up_n_dirs: usize, skip: usize) -> Result<String, LogError>
    where
        S: CallStack + ?Sized,
    {
        let frame = stack
            .frame(skip)
            .filter(|f| !f.file.is_empty())
            .ok_or(LogError::LocationUnavailable { depth: skip })?;

        Ok(self.state.lock().paths.add_ancestor_prefix(frame.file, up_n_dirs))
    }

    pub fn set_keep_dirs(&self, n: usize) {
        self.state.lock().paths.set_keep_dirs(n);
    }

    pub fn keep_dirs(&self) -> usize {
        self.state.lock().paths.keep_dirs()
    }

    pub fn prefixes(&self) -> Vec<String> {
        self.state.lock().paths.prefixes().to_vec()
    }
}

#[cfg(test)]
mod test {
    use std::{panic::Location, sync::Arc, thread};

    use super::{CallSiteKey, CallStack, CallerResolver, Frame, FunctionNames};
    use crate::LogError;

    fn frame(key: usize, file: &'static str, line: u32) -> Frame<'static> {
        Frame {
            key: CallSiteKey::from_raw(key),
            file,
            line,
            function: Some("app::server::handle"),
        }
    }

    #[test]
    fn test_resolve_strips_prefix() {
        let resolver = CallerResolver::new();
        resolver.add_prefix("/w/app");

        let rendered = resolver.resolve(&frame(1, "/w/app/src/server.rs", 42));
        assert_eq!(rendered.location(), "src/server.rs:42");
        assert_eq!(rendered.function(), "");
    }

    #[test]
    fn test_resolve_is_memoized() {
        let resolver = CallerResolver::new();
        let f = frame(7, "/w/app/src/server.rs", 42);

        let first = resolver.resolve(&f);
        let second = resolver.resolve(&f);

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.misses(), 1);
        assert_eq!(resolver.cached_call_sites(), 1);

        resolver.resolve(&frame(8, "/w/app/src/server.rs", 43));
        assert_eq!(resolver.misses(), 2);
    }

    #[test]
    fn test_cached_entry_survives_late_prefix() {
        let resolver = CallerResolver::new();
        let f = frame(1, "/w/app/src/server.rs", 42);

        assert_eq!(resolver.resolve(&f).location(), "src/server.rs:42");
        resolver.add_prefix("/w/");
        assert_eq!(resolver.resolve(&f).location(), "src/server.rs:42");
        assert_eq!(resolver.resolve(&frame(2, "/w/app/src/server.rs", 50)).location(), "app/src/server.rs:50");
    }

    #[test]
    fn test_function_name_policy() {
        let f = frame(1, "/w/app/src/server.rs", 42);

        for (policy, expected) in [
            (FunctionNames::Omit, ""),
            (FunctionNames::Short, "handle"),
            (FunctionNames::Full, "app::server::handle"),
        ] {
            let resolver = CallerResolver::with_function_names(policy);
            assert_eq!(resolver.resolve(&f).function(), expected);
        }
    }

    #[test]
    fn test_ancestor_prefix_from_stack() {
        let resolver = CallerResolver::new();
        let stack = vec![
            frame(1, "/w/app/internal/register.rs", 10),
            frame(2, "/w/app/pkg/logger.rs", 12),
        ];

        let prefix = resolver.add_ancestor_prefix(&stack, 1, 1).unwrap();
        assert_eq!(prefix, "/w/app/");
        assert_eq!(resolver.prefixes(), vec!["/w/app/".to_string()]);
        assert_eq!(resolver.resolve(&frame(3, "/w/app/pkg/comp.rs", 5)).location(), "pkg/comp.rs:5");
    }

    #[test]
    fn test_ancestor_prefix_unavailable() {
        let resolver = CallerResolver::new();
        let stack = vec![frame(1, "/w/app/pkg/logger.rs", 12)];

        match resolver.add_ancestor_prefix(&stack, 1, 3) {
            Err(LogError::LocationUnavailable { depth }) => assert_eq!(depth, 3),
            other => panic!("unexpected result: {other:?}"),
        }

        let stripped = vec![frame(1, "", 0)];
        assert!(matches!(
            resolver.add_ancestor_prefix(&stripped, 0, 0),
            Err(LogError::LocationUnavailable { depth: 0 })
        ));
        assert!(resolver.prefixes().is_empty());
    }

    #[test]
    fn test_location_stack() {
        let location: &'static Location<'static> = Location::caller();

        let top = location.frame(0).unwrap();
        assert_eq!(top.file, file!());
        assert!(location.frame(1).is_none());

        let resolver = CallerResolver::new();
        let prefix = resolver.add_ancestor_prefix(&location, 0, 0).unwrap();
        assert!(file!().starts_with(&prefix) || prefix.is_empty());
    }

    #[test]
    fn test_location_key_is_per_call_site() {
        #[track_caller]
        fn site() -> CallSiteKey {
            CallSiteKey::of(Location::caller())
        }

        let repeated: Vec<CallSiteKey> = (0..3).map(|_| site()).collect();
        assert!(repeated.iter().all(|k| *k == repeated[0]));

        let elsewhere = site();
        assert_ne!(elsewhere, repeated[0]);
    }

    #[test]
    fn test_concurrent_registration_and_lookup() {
        let resolver = Arc::new(CallerResolver::new());
        let prefixes: Vec<String> = (0..16).map(|i| format!("/w/{}/", "m".repeat(i + 1))).collect();

        let mut handles = Vec::new();
        for prefix in prefixes.clone() {
            let resolver = resolver.clone();
            handles.push(thread::spawn(move || {
                resolver.add_prefix(&prefix);
            }));
        }
        for t in 0..8usize {
            let resolver = resolver.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200usize {
                    let key = (t * 1000 + i) % 50;
                    let rendered = resolver.resolve(&frame(key, "/w/mmm/src/lib.rs", key as u32));
                    assert!(rendered.location().ends_with(&format!(":{key}")));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut expected = prefixes;
        expected.reverse();
        assert_eq!(resolver.prefixes(), expected);
        assert_eq!(resolver.cached_call_sites(), 50);
        assert_eq!(resolver.misses(), 50);
    }
}
