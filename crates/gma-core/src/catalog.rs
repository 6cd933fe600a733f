//! Server-provided id ↔ name lookup tables and selector resolution.

use crate::error::{GmaError, Result};
use crate::ids::value_to_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Fixed language-code → language-name table used when a caller passes
/// `en`/`ko`/`zh-hans` instead of a catalog id or name.
const LANGUAGE_CODES: &[(&str, &str)] = &[("en", "English"), ("ko", "한국어"), ("zh-hans", "中文")];

/// Looks up the display name for a language code.
pub fn language_name_for_code(code: &str) -> Option<&'static str> {
    LANGUAGE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A user-supplied reference to a catalog entry, by id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(String);

impl Selector {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for Selector {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Outcome of resolving selectors against a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved ids, deduplicated, in first-match order. Never empty unless
    /// the catalog itself is empty.
    pub ids: Vec<String>,
    /// Selectors that matched nothing.
    pub unmatched: Vec<Selector>,
    /// True when the ids are the whole catalog because nothing matched.
    pub fell_back: bool,
}

/// An ordered id ↔ name table (languages, strategies, measurements).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Builds a catalog from `(id, name)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(id, name)| CatalogEntry::new(id, name))
                .collect(),
        )
    }

    /// Parses the report-options list shape: `[{"<id>": "<name>"}, ...]`.
    ///
    /// `null` is treated as an empty catalog.
    pub fn from_id_name_maps(value: &Value) -> Result<Self> {
        let items = match value {
            Value::Null => return Ok(Self::default()),
            Value::Array(items) => items,
            other => {
                return Err(GmaError::parse(
                    "JSON",
                    format!("expected a list of {{id: name}} objects, got {other}"),
                ));
            }
        };

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let map = item.as_object().ok_or_else(|| {
                GmaError::parse("JSON", format!("catalog entry is not an object: {item}"))
            })?;
            for (id, name) in map {
                let name = value_to_id(name).unwrap_or_default();
                entries.push(CatalogEntry::new(id.clone(), name));
            }
        }
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.id.as_str())
    }

    pub fn name_for_id(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    /// Entries whose id or name equals the selector.
    pub fn matching<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = &'a CatalogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.id == selector.as_str() || e.name == selector.as_str())
    }

    /// Resolves selectors to ids with the fallback-to-all policy.
    ///
    /// Each unmatched selector is logged as a warning and skipped. When the
    /// resolved set ends up empty (no selectors, or none matched) every id in
    /// the catalog is returned instead; a request never selects zero entries.
    pub fn resolve(&self, kind: &str, selectors: &[Selector]) -> Resolution {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut unmatched = Vec::new();

        for selector in selectors {
            let mut found = false;
            for entry in self.matching(selector) {
                found = true;
                if seen.insert(entry.id.as_str()) {
                    ids.push(entry.id.clone());
                }
            }
            if !found {
                warn!(kind, selector = %selector, "{} entry was not found in GMA for this node", kind);
                unmatched.push(selector.clone());
            }
        }

        let fell_back = ids.is_empty();
        if fell_back {
            if selectors.is_empty() {
                debug!(kind, count = self.len(), "no {} selected, using all", kind);
            } else {
                warn!(kind, "no {} matched the given set, defaulting to all", kind);
            }
            ids = self.ids();
        }

        Resolution {
            ids,
            unmatched,
            fell_back,
        }
    }

    /// Matches a language selector by id, by name, or by language code.
    pub fn find_language(&self, selector: &Selector) -> Option<&CatalogEntry> {
        let code_name = language_name_for_code(selector.as_str());
        self.entries.iter().find(|e| {
            e.id == selector.as_str()
                || e.name == selector.as_str()
                || code_name.is_some_and(|name| e.name == name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn alpha_beta() -> Catalog {
        Catalog::from_pairs([("1", "Alpha"), ("2", "Beta")])
    }

    fn selectors(values: &[&str]) -> Vec<Selector> {
        values.iter().map(|v| Selector::from(*v)).collect()
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` and returns the warning lines it logged.
    fn warnings_from<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines = output
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(str::to_string)
            .collect();
        (value, lines)
    }

    #[test]
    fn test_resolve_by_name_with_unmatched_selector() {
        let (resolution, warnings) =
            warnings_from(|| alpha_beta().resolve("strategy", &selectors(&["Alpha", "99"])));
        assert_eq!(resolution.ids, vec!["1".to_string()]);
        assert_eq!(resolution.unmatched, vec![Selector::from("99")]);
        assert!(!resolution.fell_back);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("selector=99"), "{}", warnings[0]);
    }

    #[test]
    fn test_resolve_without_selectors_falls_back_to_all() {
        let resolution = alpha_beta().resolve("strategy", &[]);
        assert_eq!(resolution.ids, vec!["1".to_string(), "2".to_string()]);
        assert!(resolution.fell_back);
        assert!(resolution.unmatched.is_empty());
    }

    #[test]
    fn test_resolve_nothing_matched_falls_back_to_all() {
        let resolution = alpha_beta().resolve("measurement", &selectors(&["Gamma", "7"]));
        assert_eq!(resolution.ids, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(resolution.unmatched.len(), 2);
        assert!(resolution.fell_back);
    }

    #[test]
    fn test_resolve_by_id_and_name_dedupes() {
        let resolution = alpha_beta().resolve("strategy", &selectors(&["2", "Beta", "Alpha"]));
        assert_eq!(resolution.ids, vec!["2".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_from_id_name_maps() {
        let catalog =
            Catalog::from_id_name_maps(&json!([{ "10": "Prayer" }, { "11": "Outreach" }])).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.id_for_name("Outreach"), Some("11"));
        assert_eq!(catalog.name_for_id("10"), Some("Prayer"));

        assert!(Catalog::from_id_name_maps(&Value::Null).unwrap().is_empty());
        assert!(Catalog::from_id_name_maps(&json!("nope")).is_err());
    }

    #[test]
    fn test_find_language_by_code() {
        let languages = Catalog::from_pairs([("1", "English"), ("3", "한국어")]);
        assert_eq!(languages.find_language(&Selector::from("ko")).unwrap().id, "3");
        assert_eq!(languages.find_language(&Selector::from("1")).unwrap().name, "English");
        assert_eq!(languages.find_language(&Selector::from("English")).unwrap().id, "1");
        assert!(languages.find_language(&Selector::from("fr")).is_none());
    }
}
