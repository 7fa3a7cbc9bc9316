use std::collections::BTreeMap;

/// Default number of characters of a value rendered into error messages.
pub const DEFAULT_MAX_LOGGED_CHARS: usize = 1000;

/// Per-exchange context handed to every conversion function.
/// Carries the exchange identity for diagnostics and free-form properties
/// that converters may consult (e.g. a charset hint).
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Identifier of the message exchange being routed, if any.
    pub exchange_id: Option<String>,
    /// Exchange properties visible to converters.
    pub properties: BTreeMap<String, String>,
    /// Upper bound on characters of a value rendered into errors and logs.
    pub max_logged_chars: usize,
}

impl ConversionContext {
    /// Context bound to a specific exchange.
    #[must_use]
    pub fn for_exchange(exchange_id: impl Into<String>) -> Self {
        Self {
            exchange_id: Some(exchange_id.into()),
            ..Self::default()
        }
    }

    /// Adds a property, returning the updated context.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self {
            exchange_id: None,
            properties: BTreeMap::new(),
            max_logged_chars: DEFAULT_MAX_LOGGED_CHARS,
        }
    }
}
