//! Synchronous fan-out dispatcher — the minimal host side of the
//! destination contract. Owns the vendor scope and the loader, initializes
//! registered destinations, and forwards each event to every destination
//! that has signaled ready. Queueing, batching, and retries belong to real
//! host frameworks; none live here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::destination::Destination;
use crate::event::{Event, Identify, PageView, Track};
use crate::loader::ScriptLoader;
use crate::scope::VendorScope;

struct Registered {
    destination: Box<dyn Destination>,
    ready: Arc<AtomicBool>,
}

pub struct Dispatcher {
    scope: VendorScope,
    loader: Arc<dyn ScriptLoader>,
    destinations: Vec<Registered>,
}

impl Dispatcher {
    pub fn new(loader: Arc<dyn ScriptLoader>) -> Self {
        Self {
            scope: VendorScope::new(),
            loader,
            destinations: Vec::new(),
        }
    }

    /// Register a destination. Events flow to it once `initialize` has run
    /// and the destination has signaled ready.
    pub fn register(&mut self, destination: Box<dyn Destination>) {
        info!(destination = destination.name(), "destination registered");
        self.destinations.push(Registered {
            destination,
            ready: Arc::new(AtomicBool::new(false)),
        });
    }

    /// Initialize every registered destination. A destination that fails to
    /// initialize is logged and skipped; the rest proceed.
    pub fn initialize(&mut self) {
        for registered in &mut self.destinations {
            let name = registered.destination.name();
            let ready = Arc::clone(&registered.ready);
            let result = registered.destination.initialize(
                &mut self.scope,
                self.loader.as_ref(),
                Box::new(move || {
                    ready.store(true, Ordering::SeqCst);
                }),
            );
            match result {
                Ok(()) => debug!(destination = name, "initialize dispatched"),
                Err(err) => {
                    warn!(destination = name, error = %err, "destination failed to initialize")
                }
            }
        }
    }

    /// Whether the named destination has signaled ready.
    pub fn is_ready(&self, name: &str) -> bool {
        self.destinations
            .iter()
            .any(|registered| {
                registered.destination.name() == name && registered.ready.load(Ordering::SeqCst)
            })
    }

    /// Whether the named destination reports its vendor library loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.destinations
            .iter()
            .any(|registered| {
                registered.destination.name() == name
                    && registered.destination.loaded(&self.scope)
            })
    }

    /// The shared vendor scope. Hosts and tests may pre-seed bindings a
    /// page would already carry.
    pub fn scope_mut(&mut self) -> &mut VendorScope {
        &mut self.scope
    }

    pub fn scope(&self) -> &VendorScope {
        &self.scope
    }

    pub fn page(&self, page: &PageView) {
        debug!(message_id = %page.message_id, "page dispatched");
        for destination in self.ready_destinations() {
            destination.page(page);
        }
    }

    pub fn identify(&self, identify: &Identify) {
        debug!(message_id = %identify.message_id, "identify dispatched");
        for destination in self.ready_destinations() {
            destination.identify(identify);
        }
    }

    pub fn track(&self, track: &Track) {
        debug!(message_id = %track.message_id, event = %track.event, "track dispatched");
        for destination in self.ready_destinations() {
            destination.track(track);
        }
    }

    /// Route an event by its variant.
    pub fn dispatch(&self, event: &Event) {
        match event {
            Event::Page(page) => self.page(page),
            Event::Identify(identify) => self.identify(identify),
            Event::Track(track) => self.track(track),
        }
    }

    fn ready_destinations(&self) -> impl Iterator<Item = &dyn Destination> {
        self.destinations
            .iter()
            .filter(|registered| registered.ready.load(Ordering::SeqCst))
            .map(|registered| registered.destination.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::ReadyCallback;
    use crate::error::BeaconResult;
    use crate::loader::{LoadRequest, StaticLoader};
    use std::sync::atomic::AtomicUsize;

    /// Destination double that counts the calls it receives.
    struct CountingDestination {
        ready_immediately: bool,
        pages: Arc<AtomicUsize>,
        identifies: Arc<AtomicUsize>,
        tracks: Arc<AtomicUsize>,
    }

    impl CountingDestination {
        fn new(ready_immediately: bool) -> Self {
            Self {
                ready_immediately,
                pages: Arc::new(AtomicUsize::new(0)),
                identifies: Arc::new(AtomicUsize::new(0)),
                tracks: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Destination for CountingDestination {
        fn name(&self) -> &'static str {
            "Counting"
        }

        fn initialize(
            &mut self,
            _scope: &mut VendorScope,
            _loader: &dyn ScriptLoader,
            on_ready: ReadyCallback,
        ) -> BeaconResult<()> {
            if self.ready_immediately {
                on_ready();
            }
            Ok(())
        }

        fn loaded(&self, _scope: &VendorScope) -> bool {
            true
        }

        fn page(&self, _page: &PageView) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn identify(&self, _identify: &Identify) {
            self.identifies.fetch_add(1, Ordering::SeqCst);
        }

        fn track(&self, _track: &Track) {
            self.tracks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_events_flow_only_after_ready() {
        let destination = CountingDestination::new(false);
        let tracks = Arc::clone(&destination.tracks);

        let mut dispatcher = Dispatcher::new(Arc::new(StaticLoader::new()));
        dispatcher.register(Box::new(destination));

        dispatcher.track(&Track::new("Before Init"));
        assert_eq!(tracks.load(Ordering::SeqCst), 0);

        dispatcher.initialize();
        assert!(!dispatcher.is_ready("Counting"));
        dispatcher.track(&Track::new("After Init"));
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_routes_by_variant() {
        let destination = CountingDestination::new(true);
        let pages = Arc::clone(&destination.pages);
        let identifies = Arc::clone(&destination.identifies);
        let tracks = Arc::clone(&destination.tracks);

        let mut dispatcher = Dispatcher::new(Arc::new(StaticLoader::new()));
        dispatcher.register(Box::new(destination));
        dispatcher.initialize();
        assert!(dispatcher.is_ready("Counting"));
        assert!(dispatcher.is_loaded("Counting"));

        dispatcher.dispatch(&Event::Page(PageView::new().with_name("Home")));
        dispatcher.dispatch(&Event::Identify(Identify::new().with_user_id("user-1")));
        dispatcher.dispatch(&Event::Track(Track::new("Signed Up")));

        assert_eq!(pages.load(Ordering::SeqCst), 1);
        assert_eq!(identifies.load(Ordering::SeqCst), 1);
        assert_eq!(tracks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_initialize_is_skipped() {
        struct FailingDestination;

        impl Destination for FailingDestination {
            fn name(&self) -> &'static str {
                "Failing"
            }

            fn initialize(
                &mut self,
                scope: &mut VendorScope,
                loader: &dyn ScriptLoader,
                _on_ready: ReadyCallback,
            ) -> BeaconResult<()> {
                loader.load(LoadRequest::new("missing"), scope, Box::new(|_| {}))?;
                Ok(())
            }

            fn loaded(&self, _scope: &VendorScope) -> bool {
                false
            }

            fn page(&self, _page: &PageView) {}
            fn identify(&self, _identify: &Identify) {}
            fn track(&self, _track: &Track) {}
        }

        let mut dispatcher = Dispatcher::new(Arc::new(StaticLoader::new()));
        dispatcher.register(Box::new(FailingDestination));
        dispatcher.initialize();

        assert!(!dispatcher.is_ready("Failing"));
        assert!(!dispatcher.is_loaded("Failing"));
        // Dispatch after a failed initialize must not panic
        dispatcher.track(&Track::new("Ignored"));
    }
}
