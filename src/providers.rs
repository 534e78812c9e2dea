//! Provider catalogue.
//!
//! The backend is the single source of truth for which providers exist; this
//! module holds what it returned for the session and answers lookups for the
//! settings panel and the headless commands.

use crate::api::ProviderDescriptor;

/// Provider selected when the backend reports no saved configuration.
/// Cloud hosted and quick to answer, so a first connection test is cheap.
pub const FALLBACK_PROVIDER: &str = "gemini";

/// Providers returned by `GET /ai-providers`, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCatalog {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderCatalog {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter()
    }

    /// Look up a provider by ID.
    pub fn get(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Position of `id` in backend order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.id == id)
    }

    pub fn first(&self) -> Option<&ProviderDescriptor> {
        self.providers.first()
    }

    /// Provider `offset` steps away from `id`, wrapping at both ends.
    pub fn neighbour(&self, id: &str, offset: isize) -> Option<&ProviderDescriptor> {
        if self.providers.is_empty() {
            return None;
        }
        let len = self.providers.len() as isize;
        let current = self.index_of(id).map_or(0, |i| i as isize);
        let next = (current + offset).rem_euclid(len) as usize;
        self.providers.get(next)
    }

    /// Return the display name for the given provider ID.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|p| p.name.as_str()).unwrap_or(id)
    }

    /// Return all provider IDs.
    #[cfg(test)]
    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, name: &str, requires_api_key: bool) -> ProviderDescriptor {
        ProviderDescriptor {
            id: id.into(),
            name: name.into(),
            description: format!("{name} models"),
            requires_api_key,
            requires_host: !requires_api_key,
        }
    }

    fn catalog() -> ProviderCatalog {
        ProviderCatalog::new(vec![
            descriptor("ollama", "Ollama", false),
            descriptor("gemini", "Google Gemini", true),
            descriptor("huggingface", "HuggingFace", true),
        ])
    }

    #[test]
    fn lookup_by_id() {
        let catalog = catalog();
        assert_eq!(catalog.get("gemini").unwrap().name, "Google Gemini");
        assert!(catalog.get("chatgpt").is_none());
        assert_eq!(catalog.index_of("huggingface"), Some(2));
        assert_eq!(catalog.ids(), vec!["ollama", "gemini", "huggingface"]);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let catalog = catalog();
        assert_eq!(catalog.display_name("ollama"), "Ollama");
        assert_eq!(catalog.display_name("deepseek"), "deepseek");
    }

    #[test]
    fn neighbour_wraps_both_ways() {
        let catalog = catalog();
        assert_eq!(catalog.neighbour("huggingface", 1).unwrap().id, "ollama");
        assert_eq!(catalog.neighbour("ollama", -1).unwrap().id, "huggingface");
        assert_eq!(catalog.neighbour("gemini", 1).unwrap().id, "huggingface");
        assert!(ProviderCatalog::default().neighbour("gemini", 1).is_none());
    }
}
