use crate::config::CompilerConfig;
use crate::registry::ComponentTemplate;
use indexmap::IndexMap;
use loom_tree::Fragment;

/// Side nodes recorded for one component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedAssets {
    pub styles: Vec<Fragment>,
    pub scripts: Vec<Fragment>,
}

impl CachedAssets {
    /// Styles first, then scripts
    pub fn side_nodes(&self) -> impl Iterator<Item = &Fragment> {
        self.styles.iter().chain(&self.scripts)
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.scripts.is_empty()
    }
}

/// Components used so far in a compilation, in first-use order.
///
/// A fresh cache is created for every compilation and handed back with its
/// result, so the serializer can read which assets were emitted.
#[derive(Debug, Clone, Default)]
pub struct ComponentCache {
    entries: IndexMap<String, CachedAssets>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record a use of `template`. Returns `true` the first time a name is
    /// seen, i.e. when its side nodes must be emitted. Scoped styles are
    /// stored already rewritten.
    pub fn record(&mut self, template: &ComponentTemplate, config: &CompilerConfig) -> bool {
        if self.entries.contains_key(&template.name) {
            return false;
        }
        self.entries.insert(
            template.name.clone(),
            CachedAssets {
                styles: template.side_styles(config),
                scripts: template.scripts.clone(),
            },
        );
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CachedAssets> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CachedAssets)> {
        self.entries.iter().map(|(name, assets)| (name.as_str(), assets))
    }
}
