use tracing::Level;

/// When loaders are invoked relative to `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Every loader runs while the engine is starting.
    #[default]
    Eager,
    /// Legacy mode: the engine starts empty and runs its loaders once, on the
    /// first lookup that finds no converter.
    Lazy,
}

/// What to do when a converter is registered for a key that already has a
/// different converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistsPolicy {
    /// Replace the existing converter (last write wins).
    #[default]
    Override,
    /// Keep the existing converter and drop the new one.
    Ignore,
    /// Reject the registration with `ConverterExists`.
    Fail,
}

/// Configuration for a [`ConversionEngine`](crate::ConversionEngine).
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Eager or lazy loader invocation.
    pub load_mode: LoadMode,
    /// Duplicate registration handling.
    pub exists_policy: ExistsPolicy,
    /// Level at which overridden or ignored duplicates are logged.
    pub exists_log_level: Level,
    /// Whether utilization counters are recorded.
    pub statistics_enabled: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            load_mode: LoadMode::Eager,
            exists_policy: ExistsPolicy::Override,
            exists_log_level: Level::WARN,
            statistics_enabled: false,
        }
    }
}
