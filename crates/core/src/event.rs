//! Analytics event model — the page/identify/track facade shared by the
//! dispatcher and every destination adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

/// Unordered string-keyed mapping of arbitrary scalar/object values.
pub type Properties = serde_json::Map<String, Value>;

/// Ambient page context captured where the event originated. A browser SDK
/// fills these from `document`; server-side callers supply what they know.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContext {
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub title: Option<String>,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A normalized analytics event, one variant per call kind. Each variant
/// exposes only the accessors it legitimately has: a page view has no
/// traits, an identify has no category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Page(PageView),
    Identify(Identify),
    Track(Track),
}

impl Event {
    pub fn message_id(&self) -> Uuid {
        match self {
            Event::Page(page) => page.message_id,
            Event::Identify(identify) => identify.message_id,
            Event::Track(track) => track.message_id,
        }
    }
}

/// A page view. Name and category are both optional; an anonymous page has
/// neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageView {
    pub category: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub context: PageContext,
    pub timestamp: DateTime<Utc>,
    pub message_id: Uuid,
}

impl PageView {
    pub fn new() -> Self {
        Self {
            category: None,
            name: None,
            properties: Properties::new(),
            context: PageContext::default(),
            timestamp: Utc::now(),
            message_id: Uuid::new_v4(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_context(mut self, context: PageContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Category and name joined ("Docs Home"), the bare name when there is
    /// no category, or nothing for an unnamed page. A category alone does
    /// not make a full name.
    pub fn full_name(&self) -> Option<String> {
        match (&self.category, &self.name) {
            (Some(category), Some(name)) => Some(format!("{} {}", category, name)),
            (None, Some(name)) => Some(name.clone()),
            (_, None) => None,
        }
    }

    /// Caller properties with the canonical page fields filled in when
    /// absent: name, category, url, path, search, referrer, title.
    /// Caller-supplied values win; path and search are derived from the
    /// context URL.
    pub fn resolved_properties(&self) -> Properties {
        let mut props = self.properties.clone();
        if let Some(name) = &self.name {
            props.entry("name").or_insert_with(|| json!(name));
        }
        if let Some(category) = &self.category {
            props.entry("category").or_insert_with(|| json!(category));
        }
        if let Some(raw) = &self.context.url {
            props.entry("url").or_insert_with(|| json!(raw));
            if let Ok(parsed) = Url::parse(raw) {
                props.entry("path").or_insert_with(|| json!(parsed.path()));
                let search = parsed
                    .query()
                    .map(|query| format!("?{}", query))
                    .unwrap_or_default();
                props.entry("search").or_insert_with(|| json!(search));
            }
        }
        if let Some(referrer) = &self.context.referrer {
            props.entry("referrer").or_insert_with(|| json!(referrer));
        }
        if let Some(title) = &self.context.title {
            props.entry("title").or_insert_with(|| json!(title));
        }
        props
    }

    /// Derive the track call for this page view. `name` selects between the
    /// anonymous "Loaded a Page" and "Viewed {name} Page"; the track carries
    /// the resolved page properties, the same context and timestamp, and a
    /// fresh message id.
    pub fn track(&self, name: Option<&str>) -> Track {
        let event = match name {
            Some(name) => format!("Viewed {} Page", name),
            None => "Loaded a Page".to_string(),
        };
        Track {
            event,
            properties: self.resolved_properties(),
            context: self.context.clone(),
            timestamp: self.timestamp,
            message_id: Uuid::new_v4(),
        }
    }
}

impl Default for PageView {
    fn default() -> Self {
        Self::new()
    }
}

/// An identify call binding a subject identifier and/or traits to the
/// current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identify {
    pub user_id: Option<String>,
    pub traits: Option<Properties>,
    #[serde(default)]
    pub context: PageContext,
    pub timestamp: DateTime<Utc>,
    pub message_id: Uuid,
}

impl Identify {
    pub fn new() -> Self {
        Self {
            user_id: None,
            traits: None,
            context: PageContext::default(),
            timestamp: Utc::now(),
            message_id: Uuid::new_v4(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_traits(mut self, traits: Properties) -> Self {
        self.traits = Some(traits);
        self
    }

    pub fn with_context(mut self, context: PageContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Traits with the subject identifier folded in under `id`, possibly
    /// empty when the call carried neither.
    pub fn resolved_traits(&self) -> Properties {
        let mut traits = self.traits.clone().unwrap_or_default();
        if let Some(id) = &self.user_id {
            traits.insert("id".to_string(), json!(id));
        }
        traits
    }
}

impl Default for Identify {
    fn default() -> Self {
        Self::new()
    }
}

/// A track call recording one named event with its properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub event: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub context: PageContext,
    pub timestamp: DateTime<Utc>,
    pub message_id: Uuid,
}

impl Track {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            properties: Properties::new(),
            context: PageContext::default(),
            timestamp: Utc::now(),
            message_id: Uuid::new_v4(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_context(mut self, context: PageContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, Value)]) -> Properties {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_full_name() {
        let anonymous = PageView::new();
        assert_eq!(anonymous.full_name(), None);

        let named = PageView::new().with_name("Home");
        assert_eq!(named.full_name(), Some("Home".to_string()));

        let categorized = PageView::new().with_category("Docs").with_name("Home");
        assert_eq!(categorized.full_name(), Some("Docs Home".to_string()));

        // A category alone does not make a full name
        let category_only = PageView::new().with_category("Docs");
        assert_eq!(category_only.full_name(), None);
    }

    #[test]
    fn test_resolved_properties_fills_canonical_fields() {
        let page = PageView::new()
            .with_category("Docs")
            .with_name("Home")
            .with_properties(props(&[("prop", json!(true))]))
            .with_context(
                PageContext::new()
                    .with_url("https://example.com/docs/home?ref=nav")
                    .with_referrer("https://google.com")
                    .with_title("Docs Home"),
            );

        let resolved = page.resolved_properties();
        assert_eq!(resolved["prop"], json!(true));
        assert_eq!(resolved["name"], json!("Home"));
        assert_eq!(resolved["category"], json!("Docs"));
        assert_eq!(resolved["url"], json!("https://example.com/docs/home?ref=nav"));
        assert_eq!(resolved["path"], json!("/docs/home"));
        assert_eq!(resolved["search"], json!("?ref=nav"));
        assert_eq!(resolved["referrer"], json!("https://google.com"));
        assert_eq!(resolved["title"], json!("Docs Home"));
    }

    #[test]
    fn test_resolved_properties_caller_wins() {
        let page = PageView::new()
            .with_name("Home")
            .with_properties(props(&[("name", json!("Override"))]))
            .with_context(PageContext::new().with_url("https://example.com/"));

        let resolved = page.resolved_properties();
        assert_eq!(resolved["name"], json!("Override"));
        assert_eq!(resolved["path"], json!("/"));
        assert_eq!(resolved["search"], json!(""));
    }

    #[test]
    fn test_page_track_naming() {
        let page = PageView::new().with_category("Docs").with_name("Home");
        assert_eq!(page.track(None).event, "Loaded a Page");
        assert_eq!(page.track(Some("Docs Home")).event, "Viewed Docs Home Page");

        let track = page.track(Some("Docs"));
        assert_eq!(track.event, "Viewed Docs Page");
        assert_eq!(track.timestamp, page.timestamp);
        assert_ne!(track.message_id, page.message_id);
        assert_eq!(track.properties["category"], json!("Docs"));
        assert_eq!(track.properties["name"], json!("Home"));
    }

    #[test]
    fn test_resolved_traits_folds_in_id() {
        let bare = Identify::new();
        assert!(bare.resolved_traits().is_empty());

        let with_id = Identify::new().with_user_id("user-1");
        assert_eq!(with_id.resolved_traits()["id"], json!("user-1"));

        let both = Identify::new()
            .with_user_id("user-1")
            .with_traits(props(&[("plan", json!("pro"))]));
        let traits = both.resolved_traits();
        assert_eq!(traits["id"], json!("user-1"));
        assert_eq!(traits["plan"], json!("pro"));
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = Event::Track(
            Track::new("Signed Up").with_properties(props(&[("plan", json!("pro"))])),
        );
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        match decoded {
            Event::Track(track) => {
                assert_eq!(track.event, "Signed Up");
                assert_eq!(track.properties["plan"], json!("pro"));
                assert_eq!(track.message_id, event.message_id());
            }
            other => panic!("expected a track event, got {:?}", other),
        }
    }
}
