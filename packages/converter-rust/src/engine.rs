//! Conversion engine: the registry facade used on the routing hot path.
//!
//! A conversion walks, in order: the null and identity shortcuts, the miss
//! cache, the conversion table (then the resolver, whose hits are cached
//! under the requested key), the fallback chain (promoting promotable
//! successes), and for primitive targets a retry with the wrapper type.
//! When all of that fails the type pair is recorded as a miss and the
//! caller gets `None`, not an error.
//!
//! No lock is held while a converter runs, so converters may call back
//! into the engine through [`ConversionCall::converter`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, error, info, trace, warn, Level};

use conduit_core::{
    builtin, ConversionCall, ConversionContext, ConversionError, ConverterError, ConverterRef,
    Outcome, TypeConverter, TypeDescriptor, TypeKey, Value,
};

use crate::catalog::TypeCatalog;
use crate::config::{ConverterConfig, ExistsPolicy, LoadMode};
use crate::converters::{CoreConverterLoader, EnumFallback, ToStringFallback};
use crate::fallback::{FallbackChain, FallbackResult};
use crate::loader::{ConverterLoader, LoadReport, Registrar};
use crate::resolver::Resolver;
use crate::stats::{Statistics, StatisticsSnapshot};
use crate::table::{ConversionTable, MissCache, PutOutcome};

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`ConversionEngine`].
///
/// State machine: `NotLoaded -> Loading -> Loaded -> Stopped -> Loading ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, never started.
    NotLoaded,
    /// `start()` is running the loaders.
    Loading,
    /// Accepting conversions.
    Loaded,
    /// Stopped; `start()` rebuilds from scratch.
    Stopped,
}

impl EngineState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotLoaded => "not-loaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one conversion attempt before it is mapped to the public API.
enum Attempt {
    Converted(Value),
    /// This value cannot be converted; the type pair is not cached.
    Rejected,
    /// The type pair has no conversion and is now in the miss cache.
    Missed,
}

// ---------------------------------------------------------------------------
// ConversionEngine
// ---------------------------------------------------------------------------

/// Registry of converters with lookup, fallback and caching.
///
/// Independent instances share nothing but the builtin type descriptors.
/// Wrap in an `Arc` to share across threads.
pub struct ConversionEngine {
    config: Arc<ConverterConfig>,
    table: ConversionTable,
    misses: MissCache,
    fallbacks: FallbackChain,
    catalog: TypeCatalog,
    loaders: RwLock<Vec<Arc<dyn ConverterLoader>>>,
    state: ArcSwap<EngineState>,
    /// Serialises start, stop and lazy loading. Reentrant so a loader that
    /// calls back into the engine cannot deadlock it.
    lifecycle: ReentrantMutex<()>,
    /// Set when loading begins.
    loaders_ran: AtomicBool,
    /// Set once the loaders have returned.
    loaders_done: AtomicBool,
    /// Bumped by every `stop()`. Cache writes made by a conversion that
    /// started in an earlier epoch are undone.
    epoch: AtomicU64,
    stats: Statistics,
}

impl ConversionEngine {
    /// Creates an engine with only the core fallbacks installed.
    #[must_use]
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        let engine = Self {
            stats: Statistics::new(config.statistics_enabled),
            config,
            table: ConversionTable::new(),
            misses: MissCache::new(),
            fallbacks: FallbackChain::new(),
            catalog: TypeCatalog::new(),
            loaders: RwLock::new(Vec::new()),
            state: ArcSwap::from_pointee(EngineState::NotLoaded),
            lifecycle: ReentrantMutex::new(()),
            loaders_ran: AtomicBool::new(false),
            loaders_done: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        };
        engine.install_core_fallbacks();
        engine
    }

    /// Creates an engine that loads the builtin converters on start.
    #[must_use]
    pub fn with_defaults(config: Arc<ConverterConfig>) -> Self {
        let engine = Self::new(config);
        engine.add_loader(CoreConverterLoader);
        engine
    }

    fn install_core_fallbacks(&self) {
        self.fallbacks.reset(Vec::new());
        self.fallbacks
            .add_fallback(Arc::new(ToStringFallback), false);
        self.fallbacks.add_fallback(Arc::new(EnumFallback), true);
    }

    #[must_use]
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    // -- registration -------------------------------------------------------

    /// Registers `converter` for `source -> target`, applying the configured
    /// [`ExistsPolicy`] when the key already has a different converter.
    ///
    /// # Errors
    ///
    /// `ConverterExists` under [`ExistsPolicy::Fail`].
    pub fn register_converter(
        &self,
        source: &TypeDescriptor,
        target: &TypeDescriptor,
        converter: ConverterRef,
    ) -> Result<(), ConversionError> {
        let key = TypeKey::new(target.clone(), source.clone());
        trace!(%key, converter = converter.name(), "adding type converter");

        match self.config.exists_policy {
            ExistsPolicy::Override => {
                if let PutOutcome::Replaced(previous) = self.table.put(key.clone(), converter.clone()) {
                    self.log_exists(&key, "overriding type converter", &previous, &converter);
                }
            }
            ExistsPolicy::Ignore => match self.table.get_key(&key) {
                Some(existing) if !Arc::ptr_eq(&existing, &converter) => {
                    self.log_exists(&key, "ignoring duplicate type converter", &existing, &converter);
                }
                Some(_) => {}
                None => {
                    self.table.put_if_absent(key, converter);
                }
            },
            ExistsPolicy::Fail => match self.table.get_key(&key) {
                Some(existing) if !Arc::ptr_eq(&existing, &converter) => {
                    return Err(ConversionError::ConverterExists { key });
                }
                Some(_) => {}
                None => {
                    if !self.table.put_if_absent(key.clone(), converter) {
                        return Err(ConversionError::ConverterExists { key });
                    }
                }
            },
        }
        Ok(())
    }

    fn log_exists(&self, key: &TypeKey, message: &str, existing: &ConverterRef, added: &ConverterRef) {
        let level = self.config.exists_log_level;
        let (existing, added) = (existing.name(), added.name());
        if level == Level::ERROR {
            error!(%key, existing, added, "{message}");
        } else if level == Level::WARN {
            warn!(%key, existing, added, "{message}");
        } else if level == Level::INFO {
            info!(%key, existing, added, "{message}");
        } else if level == Level::DEBUG {
            debug!(%key, existing, added, "{message}");
        } else {
            trace!(%key, existing, added, "{message}");
        }
    }

    /// Adds a fallback in front of the chain.
    pub fn register_fallback(&self, converter: ConverterRef, can_promote: bool) {
        trace!(converter = converter.name(), can_promote, "adding fallback type converter");
        self.fallbacks.add_fallback(converter, can_promote);
    }

    /// Removes the converter for `source -> target`. Returns `true` if one
    /// was registered.
    pub fn remove_converter(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> bool {
        self.table
            .remove(&TypeKey::new(target.clone(), source.clone()))
    }

    /// Appends a loader, run on the next start.
    pub fn add_loader(&self, loader: impl ConverterLoader + 'static) {
        self.loaders.write().push(Arc::new(loader));
    }

    // -- lifecycle ----------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> EngineState {
        **self.state.load()
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(Arc::new(state));
    }

    /// Runs the loaders (eager mode) and starts accepting conversions.
    ///
    /// A no-op while already started. Failing loaders and skipped
    /// registrations are logged and listed in the report.
    ///
    /// # Errors
    ///
    /// `Misconfigured` when called from a loader while starting.
    pub fn start(&self) -> Result<LoadReport, ConversionError> {
        let _guard = self.lifecycle.lock();
        match self.state() {
            EngineState::Loaded => return Ok(LoadReport::default()),
            EngineState::Loading => {
                return Err(ConversionError::Misconfigured {
                    reason: "start() called while the engine is loading".to_string(),
                })
            }
            EngineState::NotLoaded | EngineState::Stopped => {}
        }

        self.set_state(EngineState::Loading);
        let report = match self.config.load_mode {
            LoadMode::Eager => {
                self.loaders_ran.store(true, Ordering::Release);
                let report = self.run_loaders();
                self.loaders_done.store(true, Ordering::Release);
                report
            }
            LoadMode::Lazy => LoadReport::default(),
        };
        self.set_state(EngineState::Loaded);

        info!(
            mode = ?self.config.load_mode,
            converters = self.table.len(),
            fallbacks = self.fallbacks.len(),
            %report,
            "type converter engine started"
        );
        Ok(report)
    }

    /// Clears every converter and cached miss and restores the core
    /// fallbacks. Converters registered outside loaders are gone after a
    /// restart.
    pub fn stop(&self) {
        let _guard = self.lifecycle.lock();
        if self.state() != EngineState::Loaded {
            return;
        }
        self.set_state(EngineState::Stopped);
        self.epoch.fetch_add(1, Ordering::SeqCst);

        if self.stats.is_enabled() {
            info!(
                total = self.table.len(),
                misses = self.misses.len(),
                "{}",
                self.stats.snapshot()
            );
        }

        self.table.clear();
        self.misses.clear();
        self.install_core_fallbacks();
        self.stats.reset();
        self.loaders_ran.store(false, Ordering::Release);
        self.loaders_done.store(false, Ordering::Release);
        info!("type converter engine stopped");
    }

    fn run_loaders(&self) -> LoadReport {
        let loaders = self.loaders.read().clone();
        let mut report = LoadReport::default();
        for loader in &loaders {
            let mut registrar = Registrar::new(self, loader.name());
            let result = loader.load(&mut registrar);
            let mut entry = registrar.finish();
            match result {
                Ok(()) => debug!(
                    loader = loader.name(),
                    registered = entry.registered,
                    fallbacks = entry.fallbacks,
                    "loaded type converters"
                ),
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!(loader = loader.name(), error = %reason, "type converter loader failed");
                    entry.error = Some(reason);
                }
            }
            report.loaders.push(entry);
        }
        report
    }

    /// Runs the loaders once in lazy mode. Returns `true` when loaders
    /// finished during this call, including when it waited for another
    /// thread's load, so the caller should resolve again.
    ///
    /// A lookup made by a loader while it runs gets `false`.
    fn ensure_loaded(&self) -> bool {
        if self.config.load_mode != LoadMode::Lazy || self.loaders_done.load(Ordering::Acquire) {
            return false;
        }
        // Blocks while another thread is loading.
        let _guard = self.lifecycle.lock();
        if self.loaders_done.load(Ordering::Acquire) {
            return true;
        }
        if self.loaders_ran.swap(true, Ordering::AcqRel) {
            return false;
        }
        let report = self.run_loaders();
        self.loaders_done.store(true, Ordering::Release);
        info!(%report, "lazily loaded type converters");
        true
    }

    fn ensure_started(&self) -> Result<(), ConversionError> {
        match self.state() {
            EngineState::Loaded => Ok(()),
            other => Err(ConversionError::EngineNotStarted {
                state: other.as_str(),
            }),
        }
    }

    // -- queries ------------------------------------------------------------

    /// Converts `value` to `target`.
    ///
    /// `Ok(None)` when no conversion exists, including for a null value
    /// (except a `bool` primitive target, which yields `false`).
    ///
    /// # Errors
    ///
    /// `ConversionFailed` when a converter fails, `EngineNotStarted` unless
    /// the engine is started.
    pub fn convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Result<Option<Value>, ConversionError> {
        self.ensure_started()?;
        let Some(value) = value else {
            self.stats.record_noop();
            return Ok(null_default(target));
        };

        match self.convert_value(target, ctx, value) {
            Ok(Attempt::Converted(converted)) => {
                self.stats.record_hit();
                Ok(Some(converted))
            }
            Ok(Attempt::Rejected | Attempt::Missed) => {
                self.stats.record_miss();
                Ok(None)
            }
            Err(cause) => {
                self.stats.record_failure();
                Err(ConversionError::ConversionFailed {
                    value: value.describe(ctx.max_logged_chars),
                    from_type: value.type_descriptor().name().to_string(),
                    target: target.clone(),
                    cause,
                })
            }
        }
    }

    /// Like [`ConversionEngine::convert`] but a missing conversion is an
    /// error.
    ///
    /// # Errors
    ///
    /// `NoConversionAvailable` in addition to the errors of `convert`.
    pub fn mandatory_convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Result<Value, ConversionError> {
        self.convert(target, ctx, value)?
            .ok_or_else(|| ConversionError::NoConversionAvailable {
                value: value.map_or_else(|| "null".to_string(), |v| v.describe(ctx.max_logged_chars)),
                from_type: value.map_or_else(
                    || "null".to_string(),
                    |v| v.type_descriptor().name().to_string(),
                ),
                target: target.clone(),
            })
    }

    /// Best-effort conversion; every failure becomes `None`.
    #[must_use]
    pub fn try_convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Option<Value> {
        self.convert(target, ctx, value).ok().flatten()
    }

    /// Resolves the converter for a type pair without invoking it or
    /// caching the result. In lazy mode the first failed lookup runs the
    /// loaders and retries.
    #[must_use]
    pub fn lookup(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> Option<ConverterRef> {
        let resolver = Resolver::new(&self.table);
        resolver.resolve(target, Some(source)).or_else(|| {
            if self.ensure_loaded() {
                resolver.resolve(target, Some(source))
            } else {
                None
            }
        })
    }

    // -- introspection ------------------------------------------------------

    /// Number of direct entries, including promoted and cached ones.
    #[must_use]
    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// `(source, target)` pairs in registration order.
    #[must_use]
    pub fn mappings(&self) -> Vec<(Option<TypeDescriptor>, TypeDescriptor)> {
        self.table.mappings()
    }

    #[must_use]
    pub fn is_known_miss(&self, key: &TypeKey) -> bool {
        self.misses.contains(key)
    }

    /// Number of fallbacks currently in the chain.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    #[must_use]
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Turns utilization counting on or off at runtime.
    pub fn set_statistics_enabled(&self, enabled: bool) {
        self.stats.set_enabled(enabled);
    }

    // -- conversion internals -----------------------------------------------

    fn get_or_find(
        &self,
        epoch: u64,
        key: &TypeKey,
        target: &TypeDescriptor,
        source: &TypeDescriptor,
    ) -> Option<ConverterRef> {
        if let Some(found) = self.table.get_key(key) {
            return Some(found);
        }
        let found = self.lookup(target, source)?;
        self.cache_converter(epoch, key, &found);
        Some(found)
    }

    /// Inserts `converter` under `key` unless present. Returns `true` if the
    /// entry was added and survived.
    fn cache_converter(&self, epoch: u64, key: &TypeKey, converter: &ConverterRef) -> bool {
        if !self.table.put_if_absent(key.clone(), converter.clone()) {
            return false;
        }
        // `stop()` bumps the epoch before clearing, so an insert that lands
        // after the clear sees the new epoch here.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            self.table.remove_if_same(key, converter);
            return false;
        }
        true
    }

    /// Shortcuts, then one counted attempt.
    fn convert_value(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: &Value,
    ) -> Result<Attempt, anyhow::Error> {
        if value.is_instance_of(target) || target.wrapper() == Some(value.type_descriptor()) {
            self.stats.record_noop();
            return Ok(Attempt::Converted(value.clone()));
        }
        self.stats.record_attempt();
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.attempt(epoch, target, ctx, value)
    }

    fn attempt(
        &self,
        epoch: u64,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: &Value,
    ) -> Result<Attempt, anyhow::Error> {
        if value.is_instance_of(target) {
            return Ok(Attempt::Converted(value.clone()));
        }
        let source = value.type_descriptor();
        let key = TypeKey::new(target.clone(), source.clone());
        if self.misses.contains(&key) {
            return Ok(Attempt::Missed);
        }
        trace!(%key, value = %value.describe(ctx.max_logged_chars), "finding type converter");

        let call = ConversionCall {
            target,
            context: ctx,
            value,
            converter: self,
        };

        if let Some(converter) = self.get_or_find(epoch, &key, target, source) {
            match converter.convert(&call) {
                Ok(Outcome::Converted(converted)) => return Ok(Attempt::Converted(converted)),
                Ok(Outcome::Reject) => return Ok(Attempt::Rejected),
                Ok(Outcome::Impossible) => return Ok(self.record_miss(epoch, key)),
                Ok(Outcome::Pass) => {}
                Err(err) => return no_value_or_failure(&key, converter.name(), err),
            }
        }

        match self.fallbacks.try_all(&call) {
            Ok(FallbackResult::Converted { value: converted, entry }) => {
                if entry.can_promote() && self.cache_converter(epoch, &key, entry.converter()) {
                    self.stats.record_promotion();
                    debug!(%key, converter = entry.converter().name(), "promoted fallback type converter");
                }
                return Ok(Attempt::Converted(converted));
            }
            Ok(FallbackResult::Reject) => return Ok(Attempt::Rejected),
            Ok(FallbackResult::Impossible) => return Ok(self.record_miss(epoch, key)),
            Ok(FallbackResult::Exhausted) => {}
            Err(err) => return no_value_or_failure(&key, "fallback", err),
        }

        if let Some(wrapper) = target.wrapper().filter(|wrapper| *wrapper != target) {
            match self.attempt(epoch, wrapper, ctx, value)? {
                Attempt::Missed => {}
                other => return Ok(other),
            }
        }

        Ok(self.record_miss(epoch, key))
    }

    fn record_miss(&self, epoch: u64, key: TypeKey) -> Attempt {
        trace!(%key, "no type converter, caching miss");
        if self.misses.insert(key.clone()) && self.epoch.load(Ordering::SeqCst) != epoch {
            self.misses.remove(&key);
        }
        Attempt::Missed
    }
}

fn null_default(target: &TypeDescriptor) -> Option<Value> {
    (*target == builtin::prim_bool()).then(|| Value::of(false))
}

fn no_value_or_failure(key: &TypeKey, converter: &str, err: ConverterError) -> Result<Attempt, anyhow::Error> {
    match err {
        ConverterError::Failed(cause) => Err(cause),
        ConverterError::NoValue(reason) => {
            debug!(%key, converter, %reason, "type converter produced no value");
            Ok(Attempt::Rejected)
        }
    }
}

impl TypeConverter for ConversionEngine {
    fn convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Result<Option<Value>, ConversionError> {
        ConversionEngine::convert(self, target, ctx, value)
    }

    fn mandatory_convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Result<Value, ConversionError> {
        ConversionEngine::mandatory_convert(self, target, ctx, value)
    }

    fn try_convert(
        &self,
        target: &TypeDescriptor,
        ctx: &ConversionContext,
        value: Option<&Value>,
    ) -> Option<Value> {
        ConversionEngine::try_convert(self, target, ctx, value)
    }

    fn lookup(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> Option<ConverterRef> {
        ConversionEngine::lookup(self, target, source)
    }
}

impl fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEngine")
            .field("state", &self.state())
            .field("converters", &self.table.len())
            .field("misses", &self.misses.len())
            .field("fallbacks", &self.fallbacks.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
