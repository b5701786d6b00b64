//! Keen IO destination adapter — maps page/identify/track events from the
//! beacon dispatch layer onto the Keen event-collection client, attaching
//! server-side enrichment addon directives along the way.
//!
//! # Modules
//!
//! - [`config`] — Destination settings (credentials, addon and page toggles)
//! - [`client`] — The adapter's view of the vendor client library
//! - [`addons`] — Enrichment addon catalog and the payload-shaping pass
//! - [`destination`] — The adapter implementing the destination contract

pub mod addons;
pub mod client;
pub mod config;
pub mod destination;

pub use addons::{shape, Addon, AddonSpec};
pub use client::{
    CaptureClient, CaptureFactory, ClientFactory, GlobalsProvider, KeenClient, KeenLibrary,
    LibraryFlavor, ProjectCredentials,
};
pub use config::KeenConfig;
pub use destination::KeenDestination;
