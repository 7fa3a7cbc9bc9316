//! Loaders supply converters discovered outside the engine.
//!
//! The engine invokes every registered [`ConverterLoader`] in registration
//! order, handing each one a [`Registrar`] scoped to that loader. A loader
//! that fails is logged and skipped; converters it registered before
//! failing stay registered.

use std::fmt;

use tracing::warn;

use conduit_core::{ConversionError, ConverterRef, TypeDescriptor};

use crate::catalog::TypeCatalog;
use crate::engine::ConversionEngine;

/// Supplies a batch of converters to an engine during startup.
pub trait ConverterLoader: Send + Sync {
    /// Name used in logs and the [`LoadReport`].
    fn name(&self) -> &str;

    /// Registers this loader's converters.
    ///
    /// # Errors
    ///
    /// Any failure aborts this loader only.
    fn load(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()>;
}

/// Registration API handed to a loader while it runs.
pub struct Registrar<'a> {
    engine: &'a ConversionEngine,
    report: LoaderReport,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(engine: &'a ConversionEngine, loader: &str) -> Self {
        Self {
            engine,
            report: LoaderReport::new(loader),
        }
    }

    pub(crate) fn finish(self) -> LoaderReport {
        self.report
    }

    /// Registers `converter` for `source -> target`.
    ///
    /// # Errors
    ///
    /// `ConverterExists` when the engine rejects duplicates.
    pub fn register_converter(
        &mut self,
        source: &TypeDescriptor,
        target: &TypeDescriptor,
        converter: ConverterRef,
    ) -> Result<(), ConversionError> {
        self.engine.register_converter(source, target, converter)?;
        self.report.registered += 1;
        Ok(())
    }

    /// Registers a converter whose types are given by catalog name.
    ///
    /// Returns `Ok(false)` and logs a warning when either name is unknown;
    /// the registration is skipped and the loader carries on.
    ///
    /// # Errors
    ///
    /// As [`Registrar::register_converter`].
    pub fn register_named(
        &mut self,
        source: &str,
        target: &str,
        converter: ConverterRef,
    ) -> Result<bool, ConversionError> {
        let catalog = self.engine.catalog();
        let (Some(from), Some(to)) = (catalog.get(source), catalog.get(target)) else {
            let reason = format!(
                "converter {} references unknown type ({source} -> {target})",
                converter.name()
            );
            warn!(loader = %self.report.name, %reason, "skipping converter registration");
            self.report.skipped.push(reason);
            return Ok(false);
        };
        self.register_converter(&from, &to, converter)?;
        Ok(true)
    }

    /// Adds a fallback converter in front of the existing chain.
    pub fn register_fallback(&mut self, converter: ConverterRef, can_promote: bool) {
        self.engine.register_fallback(converter, can_promote);
        self.report.fallbacks += 1;
    }

    /// Makes `ty` resolvable by name for later `register_named` calls.
    ///
    /// # Errors
    ///
    /// `Misconfigured` when the name is bound to another type.
    pub fn register_type(&mut self, ty: &TypeDescriptor) -> Result<(), ConversionError> {
        self.engine.catalog().register(ty)
    }

    #[must_use]
    pub fn catalog(&self) -> &TypeCatalog {
        self.engine.catalog()
    }
}

/// What one loader contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderReport {
    pub name: String,
    pub registered: usize,
    pub fallbacks: usize,
    /// Reasons for skipped registrations.
    pub skipped: Vec<String>,
    /// Set when the loader failed.
    pub error: Option<String>,
}

impl LoaderReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            registered: 0,
            fallbacks: 0,
            skipped: Vec::new(),
            error: None,
        }
    }
}

/// Summary of one `start()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaders: Vec<LoaderReport>,
}

impl LoadReport {
    #[must_use]
    pub fn total_registered(&self) -> usize {
        self.loaders.iter().map(|l| l.registered).sum()
    }

    /// Loaders that returned an error.
    pub fn failed(&self) -> impl Iterator<Item = &LoaderReport> {
        self.loaders.iter().filter(|l| l.error.is_some())
    }

    /// Whether every loader succeeded without skipping anything.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.loaders
            .iter()
            .all(|l| l.error.is_none() && l.skipped.is_empty())
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} loaders, {} converters, {} failed",
            self.loaders.len(),
            self.total_registered(),
            self.failed().count()
        )
    }
}

/// Loader over a fixed list of converters, for converters known at compile
/// time.
pub struct BatchLoader {
    name: String,
    converters: Vec<(TypeDescriptor, TypeDescriptor, ConverterRef)>,
    fallbacks: Vec<(ConverterRef, bool)>,
}

impl BatchLoader {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            converters: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(
        mut self,
        source: &TypeDescriptor,
        target: &TypeDescriptor,
        converter: ConverterRef,
    ) -> Self {
        self.converters
            .push((source.clone(), target.clone(), converter));
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, converter: ConverterRef, can_promote: bool) -> Self {
        self.fallbacks.push((converter, can_promote));
        self
    }
}

impl ConverterLoader for BatchLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
        for (source, target, converter) in &self.converters {
            registrar.register_converter(source, target, converter.clone())?;
        }
        for (converter, can_promote) in &self.fallbacks {
            registrar.register_fallback(converter.clone(), *can_promote);
        }
        Ok(())
    }
}
