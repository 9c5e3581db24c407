//! Memoized expansion for batches of sources.
//!
//! Build tools often feed the same text through the expander many times: one file listed for
//! several stages, or permutations that only differ in includes resolved elsewhere. The cache keys
//! on the BLAKE3 hash of the source and holds a bounded number of results, evicting the oldest
//! insertion first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::TranslationConfig;
use crate::error::ExpandError;
use crate::expand::{expand_source, ExpandOptions, ExpandedShader};

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Expansion results for one configuration and set of options.
///
/// Changing either drops every entry. Failed expansions are not stored.
#[derive(Debug)]
pub struct ExpansionCache {
    config: TranslationConfig,
    options: ExpandOptions,
    capacity: usize,
    entries: HashMap<blake3::Hash, Arc<ExpandedShader>>,
    order: VecDeque<blake3::Hash>,
    stats: CacheStats,
}

impl ExpansionCache {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(config: TranslationConfig, options: ExpandOptions) -> Self {
        Self::with_capacity(config, options, Self::DEFAULT_CAPACITY)
    }

    /// A cache holding at most `capacity` results (at least one).
    pub fn with_capacity(config: TranslationConfig, options: ExpandOptions, capacity: usize) -> Self {
        Self {
            config,
            options,
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> TranslationConfig {
        self.config
    }

    pub fn options(&self) -> ExpandOptions {
        self.options
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_config(&mut self, config: TranslationConfig) {
        if self.config != config {
            self.config = config;
            self.clear();
        }
    }

    pub fn set_options(&mut self, options: ExpandOptions) {
        if self.options != options {
            self.options = options;
            self.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(&blake3::hash(source.as_bytes()))
    }

    /// Expand `source`, reusing a stored result when the same text was expanded before.
    pub fn expand(&mut self, source: &str) -> Result<Arc<ExpandedShader>, ExpandError> {
        let hash = blake3::hash(source.as_bytes());
        if let Some(shader) = self.entries.get(&hash) {
            self.stats.hits += 1;
            trace!(%hash, "expansion cache hit");
            return Ok(Arc::clone(shader));
        }

        self.stats.misses += 1;
        trace!(%hash, "expansion cache miss");
        let shader = Arc::new(expand_source(&self.config, source, &self.options)?);

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
                debug!(hash = %oldest, "evicted cached expansion");
            }
        }
        self.entries.insert(hash, Arc::clone(&shader));
        self.order.push_back(hash);
        Ok(shader)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;

    const SOURCE: &str = "texture_2d(albedo, 1);\nvoid main() { float4 c = sample_texture(albedo, uv); }\n";

    fn explicit(offset: u32) -> TranslationConfig {
        ProfileConfig::desktop_explicit(offset).resolve().unwrap()
    }

    #[test]
    fn repeated_source_shares_one_result() {
        let mut cache = ExpansionCache::new(explicit(2), ExpandOptions::default());

        let first = cache.expand(SOURCE).unwrap();
        let second = cache.expand(SOURCE).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.glsl.contains("layout(binding = 3) uniform sampler2D albedo"));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let mut cache = ExpansionCache::with_capacity(explicit(0), ExpandOptions::default(), 2);
        cache.expand("float2 a;").unwrap();
        cache.expand("float3 b;").unwrap();
        cache.expand("float4 c;").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("float2 a;"));
        assert!(cache.contains("float3 b;"));
        assert!(cache.contains("float4 c;"));
        assert_eq!(cache.stats().evictions, 1);

        // A zero capacity still keeps the latest result.
        let mut tiny = ExpansionCache::with_capacity(explicit(0), ExpandOptions::default(), 0);
        tiny.expand("float2 a;").unwrap();
        assert_eq!((tiny.capacity(), tiny.len()), (1, 1));
    }

    #[test]
    fn changing_configuration_clears_entries() {
        let mut cache = ExpansionCache::new(explicit(2), ExpandOptions::default());
        cache.expand(SOURCE).unwrap();

        cache.set_config(explicit(2));
        assert_eq!(cache.len(), 1);

        cache.set_config(explicit(8));
        assert!(cache.is_empty());
        let shader = cache.expand(SOURCE).unwrap();
        assert!(shader.glsl.contains("layout(binding = 9) uniform sampler2D albedo"));

        cache.set_options(ExpandOptions {
            emit_precision: false,
        });
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache =
            ExpansionCache::new(ProfileConfig::mobile().resolve().unwrap(), ExpandOptions::default());
        let source = "texture_cube_array(probes, 0);";
        assert!(cache.expand(source).is_err());
        assert!(cache.expand(source).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }
}
