//! Vendor scope — the shared namespace vendor client libraries are loaded
//! into. The browser equivalent is `window`; here the host owns an explicit
//! registry and passes it by reference, so a prior binding can be captured
//! and restored instead of silently clobbered.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased vendor library binding.
pub type Binding = Arc<dyn Any + Send + Sync>;

/// Registry of named vendor bindings, keyed by the slot the vendor's script
/// would bind in a browser (e.g. "Keen").
#[derive(Default)]
pub struct VendorScope {
    slots: HashMap<String, Binding>,
}

impl VendorScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` at `slot`, overwriting any existing binding.
    pub fn install(&mut self, slot: impl Into<String>, value: Binding) {
        self.slots.insert(slot.into(), value);
    }

    /// Remove and return the binding at `slot`. Destinations use this to
    /// capture a prior binding before a load overwrites it.
    pub fn capture(&mut self, slot: &str) -> Option<Binding> {
        self.slots.remove(slot)
    }

    pub fn get(&self, slot: &str) -> Option<&Binding> {
        self.slots.get(slot)
    }

    /// Downcast the binding at `slot` to a concrete library type. Returns
    /// `None` when the slot is empty or holds something else.
    pub fn get_as<T: Any + Send + Sync>(&self, slot: &str) -> Option<Arc<T>> {
        self.slots
            .get(slot)
            .cloned()
            .and_then(|binding| binding.downcast::<T>().ok())
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct FakeLibrary {
        version: String,
    }

    #[test]
    fn test_install_and_downcast() {
        let mut scope = VendorScope::new();
        assert!(scope.is_empty());

        scope.install(
            "Keen",
            Arc::new(FakeLibrary {
                version: "5.0.1".to_string(),
            }),
        );
        assert!(scope.contains("Keen"));
        assert_eq!(scope.len(), 1);

        let library = scope.get_as::<FakeLibrary>("Keen").unwrap();
        assert_eq!(library.version, "5.0.1");

        // Wrong type downcasts to nothing
        assert!(scope.get_as::<String>("Keen").is_none());
        assert!(scope.get_as::<FakeLibrary>("Segment").is_none());
    }

    #[test]
    fn test_capture_removes_binding() {
        let mut scope = VendorScope::new();
        scope.install("Keen", Arc::new(FakeLibrary { version: "3.4.1".to_string() }));

        let captured = scope.capture("Keen").unwrap();
        assert!(!scope.contains("Keen"));
        assert!(scope.capture("Keen").is_none());

        // A captured binding can be reinstalled untouched
        scope.install("Keen", captured);
        let library = scope.get_as::<FakeLibrary>("Keen").unwrap();
        assert_eq!(library.version, "3.4.1");
    }

    #[test]
    fn test_install_overwrites() {
        let mut scope = VendorScope::new();
        scope.install("Keen", Arc::new(FakeLibrary { version: "3.4.1".to_string() }));
        scope.install("Keen", Arc::new(FakeLibrary { version: "5.0.1".to_string() }));

        assert_eq!(scope.len(), 1);
        let library = scope.get_as::<FakeLibrary>("Keen").unwrap();
        assert_eq!(library.version, "5.0.1");
    }
}
