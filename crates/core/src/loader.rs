//! Script loading — how destination client libraries get into the vendor
//! scope. The host owns the actual fetch; a destination only names the
//! library variant it needs and resumes in a completion callback.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{BeaconError, BeaconResult};
use crate::scope::{Binding, VendorScope};

/// Names the library variant a destination wants loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub lib: String,
}

impl LoadRequest {
    pub fn new(lib: impl Into<String>) -> Self {
        Self { lib: lib.into() }
    }
}

/// Invoked once the requested library's bindings are installed in the scope.
pub type LoadCallback = Box<dyn FnOnce(&mut VendorScope) + Send>;

/// Host-supplied loader for vendor client libraries.
///
/// There is no error channel back into a destination: a loader that cannot
/// complete simply never invokes the callback, and the host observes the
/// destination as never ready.
pub trait ScriptLoader: Send + Sync {
    fn load(
        &self,
        request: LoadRequest,
        scope: &mut VendorScope,
        done: LoadCallback,
    ) -> BeaconResult<()>;
}

/// Loader backed by a fixed table of preloaded libraries. Installs the
/// binding synchronously and invokes the completion callback inline; serves
/// tests and embedded hosts that link their vendor clients ahead of time.
#[derive(Default)]
pub struct StaticLoader {
    scripts: HashMap<String, (String, Binding)>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `binding` to be installed at `slot` whenever `lib` is
    /// requested.
    pub fn script(
        mut self,
        lib: impl Into<String>,
        slot: impl Into<String>,
        binding: Binding,
    ) -> Self {
        self.scripts.insert(lib.into(), (slot.into(), binding));
        self
    }
}

impl ScriptLoader for StaticLoader {
    fn load(
        &self,
        request: LoadRequest,
        scope: &mut VendorScope,
        done: LoadCallback,
    ) -> BeaconResult<()> {
        let (slot, binding) = self
            .scripts
            .get(&request.lib)
            .ok_or_else(|| BeaconError::Loader(format!("unknown library '{}'", request.lib)))?;
        scope.install(slot.clone(), binding.clone());
        debug!(lib = %request.lib, slot = %slot, "library installed");
        done(scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_static_loader_installs_and_signals() {
        let loader = StaticLoader::new().script("keen-tracker", "Keen", Arc::new(42u32));
        let mut scope = VendorScope::new();

        let completed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&completed);
        loader
            .load(
                LoadRequest::new("keen-tracker"),
                &mut scope,
                Box::new(move |scope| {
                    assert!(scope.contains("Keen"));
                    flag.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(completed.load(Ordering::SeqCst));
        assert_eq!(*scope.get_as::<u32>("Keen").unwrap(), 42);
    }

    #[test]
    fn test_static_loader_unknown_lib() {
        let loader = StaticLoader::new();
        let mut scope = VendorScope::new();

        let result = loader.load(
            LoadRequest::new("keen"),
            &mut scope,
            Box::new(|_| panic!("callback must not run for an unknown library")),
        );
        assert!(result.is_err());
        assert!(scope.is_empty());
    }
}
