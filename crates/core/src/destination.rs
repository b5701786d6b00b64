//! Destination plugin contract — the operations every destination adapter
//! exposes to the dispatcher.

use crate::error::BeaconResult;
use crate::event::{Identify, PageView, Track};
use crate::loader::ScriptLoader;
use crate::scope::VendorScope;

/// Signals the host that a destination finished constructing its client and
/// can accept events.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// A destination adapter: forwards normalized analytics events into one
/// third-party collection service.
pub trait Destination: Send + Sync {
    /// Stable destination name, e.g. "Keen IO".
    fn name(&self) -> &'static str;

    /// Load the vendor client library through `loader` and construct the
    /// client. `on_ready` must be invoked only once the client is fully
    /// constructed; a load that never completes leaves it uninvoked.
    fn initialize(
        &mut self,
        scope: &mut VendorScope,
        loader: &dyn ScriptLoader,
        on_ready: ReadyCallback,
    ) -> BeaconResult<()>;

    /// Whether the vendor library's constructor is present in the scope.
    /// Pure predicate; the host polls this during asynchronous loads.
    fn loaded(&self, scope: &VendorScope) -> bool;

    /// Forward a page view. May fan out to several downstream calls.
    fn page(&self, page: &PageView);

    /// Forward an identify call.
    fn identify(&self, identify: &Identify);

    /// Forward a track call.
    fn track(&self, track: &Track);
}
