//! Handler registry: the extension point for externally-synced rocks.
//!
//! A handler can claim responsibility for syncing or pruning a declared
//! entry instead of the built-in install/remove path. The registry is
//! an explicit ordered list; sync lookup returns the first non-absent
//! callback (first-registered-wins), prune lookup consults every
//! handler.

use crate::types::DesiredSpec;
use std::collections::BTreeMap;

/// Receives progress and error messages from a handler callback.
///
/// Errors recorded here accumulate; they never stop the run.
pub trait EventSink {
    /// Report a human-readable progress message.
    fn progress(&mut self, message: &str);

    /// Record an error message.
    fn error(&mut self, message: &str);
}

/// A deferred handler action, invoked by the sync engine.
pub type HandlerCallback = Box<dyn FnOnce(&mut dyn EventSink)>;

/// An external collaborator that can own the sync/prune of some rocks.
pub trait Handler {
    /// Claim the sync of a declared entry.
    ///
    /// Returning `Some` pre-empts all built-in classification for the
    /// entry.
    fn sync_callback(&self, spec: &DesiredSpec) -> Option<HandlerCallback>;

    /// Claim part of the prune phase, given the full desired set.
    ///
    /// Invoked before the engine prunes anything itself, so the handler
    /// can account for rocks it owns.
    fn prune_callback(&self, desired: &BTreeMap<String, DesiredSpec>) -> Option<HandlerCallback>;
}

/// Ordered list of registered handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Earlier registrations win sync conflicts.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// First non-absent sync callback for a declared entry.
    pub fn sync_callback(&self, spec: &DesiredSpec) -> Option<HandlerCallback> {
        self.handlers.iter().find_map(|h| h.sync_callback(spec))
    }

    /// Prune callbacks from every handler that offers one.
    pub fn prune_callbacks(
        &self,
        desired: &BTreeMap<String, DesiredSpec>,
    ) -> Vec<HandlerCallback> {
        self.handlers
            .iter()
            .filter_map(|h| h.prune_callback(desired))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClaimingHandler {
        claims: String,
        tag: &'static str,
    }

    impl Handler for ClaimingHandler {
        fn sync_callback(&self, spec: &DesiredSpec) -> Option<HandlerCallback> {
            if spec.name == self.claims {
                let tag = self.tag;
                Some(Box::new(move |sink| sink.progress(tag)))
            } else {
                None
            }
        }

        fn prune_callback(
            &self,
            _desired: &BTreeMap<String, DesiredSpec>,
        ) -> Option<HandlerCallback> {
            let tag = self.tag;
            Some(Box::new(move |sink| sink.progress(tag)))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Vec<String>,
    }

    impl EventSink for RecordingSink {
        fn progress(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }
        fn error(&mut self, _message: &str) {}
    }

    #[test]
    fn test_first_registered_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(ClaimingHandler {
            claims: "shared".to_string(),
            tag: "first",
        }));
        registry.register(Box::new(ClaimingHandler {
            claims: "shared".to_string(),
            tag: "second",
        }));

        let spec = DesiredSpec::latest("shared");
        let cb = registry.sync_callback(&spec).expect("claimed");
        let mut sink = RecordingSink::default();
        cb(&mut sink);
        assert_eq!(sink.messages, vec!["first"]);
    }

    #[test]
    fn test_unclaimed_entry_returns_none() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(ClaimingHandler {
            claims: "mine".to_string(),
            tag: "h",
        }));
        assert!(registry.sync_callback(&DesiredSpec::latest("other")).is_none());
    }

    #[test]
    fn test_all_prune_callbacks_collected() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(ClaimingHandler {
            claims: "a".to_string(),
            tag: "one",
        }));
        registry.register(Box::new(ClaimingHandler {
            claims: "b".to_string(),
            tag: "two",
        }));
        let callbacks = registry.prune_callbacks(&BTreeMap::new());
        assert_eq!(callbacks.len(), 2);
    }
}
