//! The adapter's view of the Keen client library: credential operand,
//! client trait, and the loaded-library binding a script loader installs
//! into the vendor scope.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use beacon_core::Properties;

/// Scope slot the vendor library claims for itself on load.
pub const VENDOR_SLOT: &str = "Keen";
/// Scope slot the adapter re-exposes the freshly loaded library under, so a
/// pre-existing `Keen` binding can be handed back untouched.
pub const ADAPTER_SLOT: &str = "KeenBeacon";
/// Full library: event collection plus query support.
pub const LIB_FULL: &str = "keen";
/// Slim tracker build: write-only event collection.
pub const LIB_SLIM: &str = "keen-tracker";

/// Constructor operand for a Keen client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCredentials {
    pub project_id: String,
    pub write_key: String,
    pub read_key: Option<String>,
}

/// Global-properties provider registered by identify. The client consults
/// it on every outgoing event; each call returns a fresh copy so the client
/// can never observe later mutation of identified state.
pub type GlobalsProvider = Box<dyn Fn() -> Properties + Send + Sync>;

/// The collection client the adapter records into. Fire-and-forget:
/// delivery, batching, and retries are the vendor library's concern.
pub trait KeenClient: Send + Sync {
    /// Record one event into the named collection.
    fn record_event(&self, collection: &str, event: Properties);

    /// Install the global-properties provider, replacing any prior one.
    fn extend_events(&self, provider: GlobalsProvider);
}

/// Constructs clients bound to a project's credentials.
pub trait ClientFactory: Send + Sync {
    fn client(&self, credentials: ProjectCredentials) -> Arc<dyn KeenClient>;
}

/// Which build of the vendor library was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryFlavor {
    /// `keen`: collection plus query support.
    Full,
    /// `keen-tracker`: collection only.
    Slim,
}

/// A loaded client library as it appears in the vendor scope. Its presence
/// under the vendor or adapter slot is the load-completion marker.
pub struct KeenLibrary {
    version: String,
    flavor: LibraryFlavor,
    factory: Arc<dyn ClientFactory>,
}

impl KeenLibrary {
    pub fn new(
        version: impl Into<String>,
        flavor: LibraryFlavor,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            version: version.into(),
            flavor,
            factory,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn flavor(&self) -> LibraryFlavor {
        self.flavor
    }

    /// Whether this build can run queries (full library only).
    pub fn supports_queries(&self) -> bool {
        self.flavor == LibraryFlavor::Full
    }

    /// Construct a client bound to `credentials`.
    pub fn client(&self, credentials: ProjectCredentials) -> Arc<dyn KeenClient> {
        self.factory.client(credentials)
    }
}

/// In-memory client that captures events and the installed provider, for
/// tests and embedded hosts that want to inspect traffic.
#[derive(Default)]
pub struct CaptureClient {
    state: Mutex<CaptureState>,
}

#[derive(Default)]
struct CaptureState {
    events: Vec<(String, Properties)>,
    provider: Option<GlobalsProvider>,
}

impl CaptureClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded `(collection, event)` pairs, in call order.
    pub fn events(&self) -> Vec<(String, Properties)> {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .events
            .clone()
    }

    pub fn count(&self) -> usize {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .events
            .len()
    }

    pub fn count_collection(&self, collection: &str) -> usize {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .events
            .iter()
            .filter(|(c, _)| c == collection)
            .count()
    }

    pub fn last(&self) -> Option<(String, Properties)> {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .events
            .last()
            .cloned()
    }

    /// Invoke the captured global-properties provider, if one is installed.
    pub fn globals(&self) -> Option<Properties> {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .provider
            .as_ref()
            .map(|provider| provider())
    }

    pub fn clear(&self) {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .events
            .clear();
    }
}

impl KeenClient for CaptureClient {
    fn record_event(&self, collection: &str, event: Properties) {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .events
            .push((collection.to_string(), event));
    }

    fn extend_events(&self, provider: GlobalsProvider) {
        self.state
            .lock()
            .expect("capture client mutex poisoned")
            .provider = Some(provider);
    }
}

/// Factory that hands out one shared [`CaptureClient`] and remembers every
/// credential set it was asked to bind.
pub struct CaptureFactory {
    client: Arc<CaptureClient>,
    seen: Mutex<Vec<ProjectCredentials>>,
}

impl CaptureFactory {
    pub fn new() -> Self {
        Self {
            client: Arc::new(CaptureClient::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// The shared client every [`ClientFactory::client`] call returns.
    pub fn client_handle(&self) -> Arc<CaptureClient> {
        Arc::clone(&self.client)
    }

    pub fn credentials_seen(&self) -> Vec<ProjectCredentials> {
        self.seen
            .lock()
            .expect("capture factory mutex poisoned")
            .clone()
    }
}

impl Default for CaptureFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for CaptureFactory {
    fn client(&self, credentials: ProjectCredentials) -> Arc<dyn KeenClient> {
        self.seen
            .lock()
            .expect("capture factory mutex poisoned")
            .push(credentials);
        Arc::clone(&self.client) as Arc<dyn KeenClient>
    }
}

/// Convenience: a capture factory wrapped for sharing with a loader table.
pub fn capture_factory() -> Arc<CaptureFactory> {
    Arc::new(CaptureFactory::new())
}
