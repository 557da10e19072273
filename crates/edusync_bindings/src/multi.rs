//! Several named bindings for one entity.
//!
//! A dashboard screen usually shows progress, recommendations and
//! assessments side by side for the same student. [`MultiBinding`] keeps
//! one [`Binding`] per source under a caller-chosen name.

use crate::binding::{Binding, Fetcher};
use crate::error::BindingResult;
use edusync_core::{Category, EntityId, Payload, Synchronizer};
use futures::future::join_all;
use std::collections::BTreeMap;

/// Named bindings sharing one entity.
#[derive(Debug, Default)]
pub struct MultiBinding {
    bindings: BTreeMap<String, Binding>,
}

impl MultiBinding {
    /// Binds every `(name, category)` in `sources` to `entity_id`.
    ///
    /// A later source with an already used name replaces the earlier one.
    pub fn new<I, S>(sync: &Synchronizer, entity_id: Option<EntityId>, sources: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        let bindings = sources
            .into_iter()
            .map(|(name, category)| (name.into(), Binding::new(sync, category, entity_id.clone())))
            .collect();
        Self { bindings }
    }

    /// Attaches a fetcher to the binding called `name`.
    ///
    /// Unknown names are ignored.
    #[must_use]
    pub fn with_fetcher(mut self, name: &str, fetcher: Fetcher) -> Self {
        if let Some(binding) = self.bindings.remove(name) {
            self.bindings.insert(name.to_string(), binding.with_fetcher(fetcher));
        }
        self
    }

    /// The binding called `name`.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// The visible value of the binding called `name`.
    pub fn data(&self, name: &str) -> Option<Payload> {
        self.bindings.get(name).and_then(Binding::data)
    }

    /// Visible values of every binding that has one, by name.
    pub fn snapshot(&self) -> BTreeMap<String, Payload> {
        self.bindings
            .iter()
            .filter_map(|(name, binding)| binding.data().map(|data| (name.clone(), data)))
            .collect()
    }

    /// Returns true while any binding is fetching.
    pub fn is_loading(&self) -> bool {
        self.bindings.values().any(Binding::is_loading)
    }

    /// Errors of the bindings that have one, by name.
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.bindings
            .iter()
            .filter_map(|(name, binding)| binding.error().map(|e| (name.clone(), e)))
            .collect()
    }

    /// Names of all bindings, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Loads every binding concurrently.
    ///
    /// Each binding records its own failure. The first error, in name
    /// order, is returned once all loads have finished.
    pub async fn load_all(&self) -> BindingResult<()> {
        let loads = self.bindings.values().map(Binding::load);
        let results = join_all(loads).await;
        results.into_iter().try_for_each(|r| r.map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::fetcher;
    use crate::error::BindingError;
    use edusync_core::SyncConfig;

    fn dashboard(sync: &Synchronizer) -> MultiBinding {
        MultiBinding::new(
            sync,
            Some(EntityId::from("s1")),
            [
                ("progress", Category::Progress),
                ("recommended", Category::Module),
                ("assessments", Category::Assessment),
            ],
        )
    }

    #[tokio::test]
    async fn follows_each_source() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let multi = dashboard(&sync);
        assert_eq!(multi.len(), 3);
        assert_eq!(multi.names().collect::<Vec<_>>(), ["assessments", "progress", "recommended"]);

        sync.update_data(
            Category::Progress,
            Payload::new().with("pct", 60),
            Some(EntityId::from("s1")),
            "test",
        );

        assert_eq!(multi.data("progress"), Some(Payload::new().with("pct", 60)));
        assert_eq!(multi.data("assessments"), None);
        assert_eq!(multi.snapshot().len(), 1);
        assert_eq!(multi.data("missing"), None);
    }

    #[tokio::test]
    async fn load_all_collects_errors() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let multi = dashboard(&sync)
            .with_fetcher("progress", fetcher(|| async { Ok(Payload::new().with("pct", 5)) }))
            .with_fetcher(
                "assessments",
                fetcher(|| async { Err(BindingError::fetch("HTTP 503")) }),
            )
            .with_fetcher("unknown", fetcher(|| async { Ok(Payload::new()) }));

        let err = multi.load_all().await.unwrap_err();
        assert_eq!(err, BindingError::Fetch("HTTP 503".into()));
        assert!(!multi.is_loading());

        assert_eq!(multi.data("progress"), Some(Payload::new().with("pct", 5)));
        let errors = multi.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("assessments"));
    }

    #[tokio::test]
    async fn empty_loads_ok() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let multi = MultiBinding::new(&sync, None, Vec::<(String, Category)>::new());
        assert!(multi.is_empty());
        multi.load_all().await.unwrap();
    }
}
