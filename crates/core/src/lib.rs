pub mod destination;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod loader;
pub mod scope;

pub use destination::{Destination, ReadyCallback};
pub use dispatcher::Dispatcher;
pub use error::{BeaconError, BeaconResult};
pub use event::{Event, Identify, PageContext, PageView, Properties, Track};
pub use loader::{LoadCallback, LoadRequest, ScriptLoader, StaticLoader};
pub use scope::{Binding, VendorScope};
