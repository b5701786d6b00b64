//! The Keen IO destination adapter: loads the vendor client library
//! through the host's script loader, constructs a client bound to the
//! project credentials, and maps page/identify/track calls onto it.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use beacon_core::{
    BeaconResult, Destination, Identify, LoadRequest, PageView, Properties, ReadyCallback,
    ScriptLoader, Track, VendorScope,
};

use crate::addons::shape;
use crate::client::{KeenClient, KeenLibrary, ADAPTER_SLOT, VENDOR_SLOT};
use crate::config::KeenConfig;

/// Destination adapter for Keen IO event collection.
///
/// Stateless given an event and the configuration, except for the client
/// handle established once when the library load completes.
pub struct KeenDestination {
    config: KeenConfig,
    client: Arc<OnceLock<Arc<dyn KeenClient>>>,
}

impl KeenDestination {
    pub fn new(config: KeenConfig) -> Self {
        Self {
            config,
            client: Arc::new(OnceLock::new()),
        }
    }

    /// Build the adapter from the JSON settings object a host stores per
    /// destination.
    pub fn from_settings(settings: serde_json::Value) -> BeaconResult<Self> {
        Ok(Self::new(KeenConfig::from_settings(settings)?))
    }

    pub fn config(&self) -> &KeenConfig {
        &self.config
    }

    fn client(&self) -> Option<&Arc<dyn KeenClient>> {
        self.client.get()
    }
}

impl Destination for KeenDestination {
    fn name(&self) -> &'static str {
        "Keen IO"
    }

    fn initialize(
        &mut self,
        scope: &mut VendorScope,
        loader: &dyn ScriptLoader,
        on_ready: ReadyCallback,
    ) -> BeaconResult<()> {
        let lib = self.config.library();
        // Whoever owned the vendor slot before us gets it back after load.
        let prior = scope.get(VENDOR_SLOT).cloned();
        let credentials = self.config.credentials();
        let client_cell = Arc::clone(&self.client);

        info!(library = lib, "loading Keen client library");
        loader.load(
            LoadRequest::new(lib),
            scope,
            Box::new(move |scope| {
                let Some(binding) = scope.capture(VENDOR_SLOT) else {
                    warn!("load completed without a Keen binding in scope");
                    return;
                };
                // Relocate the fresh library to the adapter's own slot and
                // hand the vendor slot back to its prior owner, if any.
                scope.install(ADAPTER_SLOT, Arc::clone(&binding));
                scope.install(VENDOR_SLOT, prior.unwrap_or(binding));

                let Some(library) = scope.get_as::<KeenLibrary>(ADAPTER_SLOT) else {
                    warn!("binding in scope is not a Keen client library");
                    return;
                };
                let client = library.client(credentials);
                if client_cell.set(client).is_err() {
                    debug!("Keen client already constructed; repeat load ignored");
                }
                info!(
                    version = library.version(),
                    queries = library.supports_queries(),
                    "Keen client ready"
                );
                on_ready();
            }),
        )
    }

    fn loaded(&self, scope: &VendorScope) -> bool {
        scope.get_as::<KeenLibrary>(VENDOR_SLOT).is_some()
            || scope.get_as::<KeenLibrary>(ADAPTER_SLOT).is_some()
    }

    /// Page views fan out as tracks. The toggles are independent: a page
    /// with a category and a name under all three produces three calls.
    fn page(&self, page: &PageView) {
        if self.config.track_all_pages {
            self.track(&page.track(None));
        }
        if self.config.track_named_pages {
            if let Some(name) = page.full_name() {
                self.track(&page.track(Some(name.as_str())));
            }
        }
        if self.config.track_categorized_pages {
            if let Some(category) = &page.category {
                self.track(&page.track(Some(category.as_str())));
            }
        }
    }

    fn identify(&self, identify: &Identify) {
        let Some(client) = self.client() else {
            warn!(
                message_id = %identify.message_id,
                "Keen client not constructed; identify dropped"
            );
            return;
        };

        let mut user = Properties::new();
        if let Some(user_id) = identify.user_id() {
            user.insert("userId".into(), json!(user_id));
        }
        let traits = identify.resolved_traits();
        if !traits.is_empty() {
            user.insert("traits".into(), Value::Object(traits));
        }
        let mut globals = Properties::new();
        globals.insert("user".into(), Value::Object(user));

        let shaped = shape(globals, &self.config, &identify.context, identify.timestamp);
        debug!(
            message_id = %identify.message_id,
            addons = addon_count(&shaped),
            "identify installed as global properties"
        );
        // The provider owns its snapshot; every consultation hands the
        // client a fresh copy.
        client.extend_events(Box::new(move || shaped.clone()));
    }

    fn track(&self, track: &Track) {
        let Some(client) = self.client() else {
            warn!(
                event = %track.event,
                message_id = %track.message_id,
                "Keen client not constructed; track dropped"
            );
            return;
        };

        let shaped = shape(
            track.properties.clone(),
            &self.config,
            &track.context,
            track.timestamp,
        );
        debug!(
            event = %track.event,
            message_id = %track.message_id,
            addons = addon_count(&shaped),
            "event recorded"
        );
        client.record_event(&track.event, shaped);
    }
}

fn addon_count(shaped: &Properties) -> usize {
    shaped
        .get("keen")
        .and_then(|keen| keen["addons"].as_array())
        .map_or(0, Vec::len)
}
