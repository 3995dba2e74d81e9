//! Event registry: maps persisted event names to decoders.
//!
//! Populated explicitly at startup, one `register` call per event kind.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

type Decoder<E> = Box<dyn Fn(serde_json::Value) -> Result<E, serde_json::Error> + Send + Sync>;

/// Failure to turn a stored `(name, data)` pair back into an event.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unknown event type: {0}")]
    Unknown(String),

    #[error("Failed to decode event {name}: {source}")]
    Payload {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decoders for every event kind of one aggregate type.
pub struct EventRegistry<E> {
    decoders: HashMap<&'static str, Decoder<E>>,
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<E> fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("EventRegistry").field("names", &names).finish()
    }
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for `name`. A later registration replaces an
    /// earlier one.
    pub fn register<F>(&mut self, name: &'static str, decoder: F) -> &mut Self
    where
        F: Fn(serde_json::Value) -> Result<E, serde_json::Error> + Send + Sync + 'static,
    {
        self.decoders.insert(name, Box::new(decoder));
        self
    }

    /// Register `name` as a JSON payload `P` wrapped into the event enum by
    /// `wrap`, typically a tuple variant constructor.
    pub fn register_payload<P>(&mut self, name: &'static str, wrap: fn(P) -> E) -> &mut Self
    where
        P: DeserializeOwned + 'static,
        E: 'static,
    {
        self.register(name, move |data| serde_json::from_value::<P>(data).map(wrap))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.keys().copied().collect()
    }

    pub fn decode(&self, name: &str, data: serde_json::Value) -> Result<E, DecodeError> {
        let decoder = self
            .decoders
            .get(name)
            .ok_or_else(|| DecodeError::Unknown(name.to_string()))?;
        decoder(data).map_err(|source| DecodeError::Payload {
            name: name.to_string(),
            source,
        })
    }
}
