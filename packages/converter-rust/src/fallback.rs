//! Ordered chain of fallback converters consulted after direct lookup fails.

use std::sync::Arc;

use arc_swap::ArcSwap;
use conduit_core::{ConversionCall, ConverterError, ConverterRef, Outcome, Value};

/// A fallback converter and whether its successes may be promoted to a
/// direct table entry.
#[derive(Clone)]
pub struct FallbackEntry {
    converter: ConverterRef,
    can_promote: bool,
}

impl FallbackEntry {
    #[must_use]
    pub fn new(converter: ConverterRef, can_promote: bool) -> Self {
        Self {
            converter,
            can_promote,
        }
    }

    #[must_use]
    pub fn converter(&self) -> &ConverterRef {
        &self.converter
    }

    #[must_use]
    pub fn can_promote(&self) -> bool {
        self.can_promote
    }
}

/// Outcome of walking the whole chain.
pub enum FallbackResult {
    /// A fallback produced a value.
    Converted { value: Value, entry: FallbackEntry },
    /// A fallback declared this value unconvertible.
    Reject,
    /// A fallback declared the type pair unconvertible.
    Impossible,
    /// Every fallback passed.
    Exhausted,
}

/// Fallback list, most recently added first.
///
/// Readers load a snapshot without locking. Writers replace the whole list;
/// registration is expected during startup only and concurrent writers may
/// interleave in any order.
pub struct FallbackChain {
    entries: ArcSwap<Vec<FallbackEntry>>,
}

impl FallbackChain {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Inserts at the front, so it is tried before every existing entry.
    pub fn add_fallback(&self, converter: ConverterRef, can_promote: bool) {
        let entry = FallbackEntry::new(converter, can_promote);
        self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(entry.clone());
            next.extend(current.iter().cloned());
            next
        });
    }

    /// Current snapshot in try order.
    #[must_use]
    pub fn entries(&self) -> Arc<Vec<FallbackEntry>> {
        self.entries.load_full()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Replaces the chain with `entries`, given in try order.
    pub fn reset(&self, entries: Vec<FallbackEntry>) {
        self.entries.store(Arc::new(entries));
    }

    /// Invokes each fallback in order until one gives a definitive answer.
    ///
    /// # Errors
    ///
    /// The first error returned by a fallback; later fallbacks are not tried.
    pub fn try_all(&self, call: &ConversionCall<'_>) -> Result<FallbackResult, ConverterError> {
        let snapshot = self.entries.load();
        for entry in snapshot.iter() {
            match entry.converter.convert(call)? {
                Outcome::Converted(value) => {
                    return Ok(FallbackResult::Converted {
                        value,
                        entry: entry.clone(),
                    })
                }
                Outcome::Reject => return Ok(FallbackResult::Reject),
                Outcome::Impossible => return Ok(FallbackResult::Impossible),
                Outcome::Pass => {}
            }
        }
        Ok(FallbackResult::Exhausted)
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use conduit_core::{
        builtin, converter_fn, ConversionContext, ConversionError, TypeConverter,
        TypeDescriptor,
    };

    use super::*;

    struct NoEngine;

    impl TypeConverter for NoEngine {
        fn convert(
            &self,
            _: &TypeDescriptor,
            _: &ConversionContext,
            _: Option<&Value>,
        ) -> Result<Option<Value>, ConversionError> {
            Ok(None)
        }
        fn mandatory_convert(
            &self,
            target: &TypeDescriptor,
            _: &ConversionContext,
            _: Option<&Value>,
        ) -> Result<Value, ConversionError> {
            Err(ConversionError::NoConversionAvailable {
                value: "null".to_string(),
                from_type: "null".to_string(),
                target: target.clone(),
            })
        }
        fn try_convert(
            &self,
            _: &TypeDescriptor,
            _: &ConversionContext,
            _: Option<&Value>,
        ) -> Option<Value> {
            None
        }
        fn lookup(&self, _: &TypeDescriptor, _: &TypeDescriptor) -> Option<ConverterRef> {
            None
        }
    }

    fn run(chain: &FallbackChain) -> Result<FallbackResult, ConverterError> {
        let ctx = ConversionContext::default();
        let value = Value::of(5i32);
        let call = ConversionCall {
            target: &builtin::string(),
            context: &ctx,
            value: &value,
            converter: &NoEngine,
        };
        chain.try_all(&call)
    }

    fn fixed(name: &'static str, outcome: fn() -> Outcome, hits: Arc<AtomicU32>) -> ConverterRef {
        converter_fn(name, move |_call: &ConversionCall<'_>| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(outcome())
        })
    }

    #[test]
    fn later_registrations_are_tried_first() {
        let chain = FallbackChain::new();
        let hits = Arc::new(AtomicU32::new(0));
        chain.add_fallback(fixed("first", || Outcome::value("first".to_string()), hits.clone()), false);
        chain.add_fallback(fixed("second", || Outcome::value("second".to_string()), hits.clone()), true);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.entries()[0].converter().name(), "second");
        match run(&chain).unwrap() {
            FallbackResult::Converted { value, entry } => {
                assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("second"));
                assert!(entry.can_promote());
            }
            _ => panic!("expected conversion"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pass_continues_and_definitive_answers_stop() {
        let chain = FallbackChain::new();
        let tail_hits = Arc::new(AtomicU32::new(0));
        let head_hits = Arc::new(AtomicU32::new(0));
        chain.add_fallback(fixed("tail", || Outcome::Impossible, tail_hits.clone()), false);
        chain.add_fallback(fixed("head", || Outcome::Pass, head_hits.clone()), false);
        assert!(matches!(run(&chain).unwrap(), FallbackResult::Impossible));
        assert_eq!(head_hits.load(Ordering::SeqCst), 1);
        assert_eq!(tail_hits.load(Ordering::SeqCst), 1);

        let never = Arc::new(AtomicU32::new(0));
        chain.reset(vec![
            FallbackEntry::new(fixed("reject", || Outcome::Reject, Arc::new(AtomicU32::new(0))), false),
            FallbackEntry::new(fixed("never", || Outcome::value(1i32), never.clone()), true),
        ]);
        assert!(matches!(run(&chain).unwrap(), FallbackResult::Reject));
        assert_eq!(never.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn all_passing_is_exhausted() {
        let chain = FallbackChain::new();
        assert!(chain.is_empty());
        assert!(matches!(run(&chain).unwrap(), FallbackResult::Exhausted));

        chain.add_fallback(fixed("pass", || Outcome::Pass, Arc::new(AtomicU32::new(0))), true);
        assert!(matches!(run(&chain).unwrap(), FallbackResult::Exhausted));
    }

    #[test]
    fn errors_stop_the_chain() {
        let chain = FallbackChain::new();
        let after = Arc::new(AtomicU32::new(0));
        chain.add_fallback(fixed("after", || Outcome::value(1i32), after.clone()), true);
        chain.add_fallback(
            converter_fn("broken", |_call: &ConversionCall<'_>| Err(ConverterError::msg("boom"))),
            false,
        );
        assert!(matches!(run(&chain), Err(ConverterError::Failed(_))));
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }
}
