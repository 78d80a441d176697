use crate::error::JourneyResult;
use crate::model::{LookupFailurePolicy, UNKNOWN_GENRE};
use crate::spotify::ListeningSource;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub lookups: usize,
    pub cache_hits: usize,
    pub fallbacks: usize,
    pub failures: usize,
}

/// Maps an artist to its genre labels, one lookup per call unless caching is
/// on. Never yields an empty list: no data becomes `["Unknown"]`.
pub struct GenreResolver<'a> {
    source: &'a dyn ListeningSource,
    policy: LookupFailurePolicy,
    cache: Option<HashMap<String, Vec<String>>>,
    stats: ResolverStats,
}

impl<'a> GenreResolver<'a> {
    pub fn new(source: &'a dyn ListeningSource, policy: LookupFailurePolicy, cache: bool) -> Self {
        Self {
            source,
            policy,
            cache: cache.then(HashMap::new),
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// `Ok(None)` means the record should be dropped (skip policy).
    pub fn resolve(&mut self, artist_id: &str) -> JourneyResult<Option<Vec<String>>> {
        if artist_id.is_empty() {
            self.stats.fallbacks += 1;
            return Ok(Some(fallback_genres()));
        }

        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(artist_id)) {
            self.stats.cache_hits += 1;
            return Ok(Some(cached.clone()));
        }

        self.stats.lookups += 1;
        let genres = match self.source.artist_genres(artist_id) {
            Ok(genres) => genres,
            Err(err) => {
                self.stats.failures += 1;
                return match self.policy {
                    LookupFailurePolicy::Abort => Err(err),
                    LookupFailurePolicy::Skip => {
                        warn!(artist_id, error = %err, "genre lookup failed, dropping record");
                        Ok(None)
                    }
                    LookupFailurePolicy::Fallback => {
                        warn!(artist_id, error = %err, "genre lookup failed, using fallback");
                        self.stats.fallbacks += 1;
                        Ok(Some(fallback_genres()))
                    }
                };
            }
        };

        let genres = if genres.is_empty() {
            self.stats.fallbacks += 1;
            fallback_genres()
        } else {
            genres
        };
        debug!(artist_id, genres = ?genres, "resolved artist genres");

        if let Some(cache) = self.cache.as_mut() {
            cache.insert(artist_id.to_string(), genres.clone());
        }
        Ok(Some(genres))
    }
}

fn fallback_genres() -> Vec<String> {
    vec![UNKNOWN_GENRE.to_string()]
}
