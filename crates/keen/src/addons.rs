//! Keen server-side enrichment addons and the payload-shaping pass that
//! attaches them. Addons run at ingestion time inside the collector; the
//! adapter's whole job is to declare which ones run and to plant the raw
//! input fields they read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use beacon_core::{PageContext, Properties};

use crate::config::KeenConfig;

/// Ingestion-time template the collector resolves to the request IP.
pub const IP_PLACEHOLDER: &str = "${keen.ip}";
/// Ingestion-time template the collector resolves to the request user agent.
pub const UA_PLACEHOLDER: &str = "${keen.user_agent}";

/// Enrichment addons the collector can run. Catalog order here is the
/// order they are evaluated and emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addon {
    IpToGeo,
    UaParser,
    UrlParser,
    ReferrerParser,
    DatetimeParser,
}

/// One enrichment directive as it appears under `keen.addons`: which addon
/// to run, where it reads its raw inputs, and where it writes its result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddonSpec {
    pub name: &'static str,
    pub input: BTreeMap<&'static str, &'static str>,
    pub output: &'static str,
}

impl Addon {
    pub fn name(&self) -> &'static str {
        match self {
            Addon::IpToGeo => "keen:ip_to_geo",
            Addon::UaParser => "keen:ua_parser",
            Addon::UrlParser => "keen:url_parser",
            Addon::ReferrerParser => "keen:referrer_parser",
            Addon::DatetimeParser => "keen:date_time_parser",
        }
    }

    /// The directive object attached under `keen.addons` for this addon.
    pub fn spec(&self) -> AddonSpec {
        match self {
            Addon::IpToGeo => AddonSpec {
                name: self.name(),
                input: BTreeMap::from([("ip", "geo.ip_address")]),
                output: "geo.info",
            },
            Addon::UaParser => AddonSpec {
                name: self.name(),
                input: BTreeMap::from([("ua_string", "tech.user_agent")]),
                output: "tech.info",
            },
            Addon::UrlParser => AddonSpec {
                name: self.name(),
                input: BTreeMap::from([("url", "page.url")]),
                output: "page.info",
            },
            Addon::ReferrerParser => AddonSpec {
                name: self.name(),
                input: BTreeMap::from([
                    ("referrer_url", "referrer.url"),
                    ("page_url", "page.url"),
                ]),
                output: "referrer.info",
            },
            Addon::DatetimeParser => AddonSpec {
                name: self.name(),
                input: BTreeMap::from([("date_time", "keen.timestamp")]),
                output: "timestamp_info",
            },
        }
    }
}

/// Shape an outgoing event: for each enabled addon, append its directive
/// and plant the raw field it reads, then stamp `keen.timestamp` with the
/// event's own declared time. Identify and track payloads both pass
/// through here.
pub fn shape(
    mut properties: Properties,
    config: &KeenConfig,
    context: &PageContext,
    timestamp: DateTime<Utc>,
) -> Properties {
    let mut addons: Vec<Value> = Vec::new();

    if config.ip_addon {
        addons.push(json!(Addon::IpToGeo.spec()));
        set_path(&mut properties, "geo.ip_address", json!(IP_PLACEHOLDER));
    }
    if config.ua_addon {
        addons.push(json!(Addon::UaParser.spec()));
        set_path(&mut properties, "tech.user_agent", json!(UA_PLACEHOLDER));
    }
    if config.url_addon {
        addons.push(json!(Addon::UrlParser.spec()));
        set_path(&mut properties, "page.url", context_field(&context.url));
    }
    if config.referrer_addon {
        addons.push(json!(Addon::ReferrerParser.spec()));
        set_path(&mut properties, "referrer.url", context_field(&context.referrer));
        set_path(&mut properties, "page.url", context_field(&context.url));
    }
    if config.datetime_addon {
        // Reads the stamped keen.timestamp; nothing extra to plant.
        addons.push(json!(Addon::DatetimeParser.spec()));
    }

    properties.insert(
        "keen".into(),
        json!({
            "timestamp": timestamp,
            "addons": addons,
        }),
    );
    properties
}

/// A context value for injection. Absent values become the empty string,
/// matching an empty `document.referrer` on a direct visit.
fn context_field(value: &Option<String>) -> Value {
    json!(value.clone().unwrap_or_default())
}

/// Set `value` at a dot-separated `path`, creating intermediate objects.
/// A non-object in the way is replaced; planted fields own their namespace.
fn set_path(properties: &mut Properties, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            properties.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = properties
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Properties::new()));
            if !entry.is_object() {
                *entry = Value::Object(Properties::new());
            }
            if let Value::Object(nested) = entry {
                set_path(nested, rest, value);
            }
        }
    }
}
