use std::collections::HashMap;
use std::sync::RwLock;

use l10n_domain::{TaskHistory, TaskIdentity};

/// 运行内的任务历史缓存，容量有限，满时淘汰最早写入的条目
pub struct HistoryCache {
    cache: RwLock<HashMap<TaskIdentity, CachedHistory>>,
    max_entries: usize,
    stats: RwLock<CacheStats>,
    next_insertion: RwLock<u64>,
}

struct CachedHistory {
    history: TaskHistory,
    /// 写入顺序号，数值越小越早
    inserted: u64,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_entries: usize,
    pub hit_rate: f64,
}

impl HistoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            stats: RwLock::new(CacheStats::default()),
            next_insertion: RwLock::new(0),
        }
    }

    pub fn get(&self, identity: &TaskIdentity) -> Option<TaskHistory> {
        let found = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(identity).map(|cached| cached.history.clone()));

        if let Ok(mut stats) = self.stats.write() {
            if found.is_some() {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
        found
    }

    /// 读取但不计入命中统计
    pub fn peek(&self, identity: &TaskIdentity) -> Option<TaskHistory> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(identity).map(|cached| cached.history.clone()))
    }

    pub fn put(&self, identity: TaskIdentity, history: TaskHistory) {
        let inserted = match self.next_insertion.write() {
            Ok(mut next) => {
                *next += 1;
                *next
            }
            Err(_) => return,
        };

        if let Ok(mut cache) = self.cache.write() {
            if !cache.contains_key(&identity) && cache.len() >= self.max_entries {
                self.evict_oldest(&mut cache);
            }

            cache.insert(identity, CachedHistory { history, inserted });

            if let Ok(mut stats) = self.stats.write() {
                stats.total_entries = cache.len();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();

            if let Ok(mut stats) = self.stats.write() {
                stats.total_entries = 0;
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        if let Ok(stats) = self.stats.read() {
            let mut stats = stats.clone();
            stats.hit_rate = if stats.hits + stats.misses > 0 {
                stats.hits as f64 / (stats.hits + stats.misses) as f64
            } else {
                0.0
            };
            stats
        } else {
            CacheStats::default()
        }
    }

    fn evict_oldest(&self, cache: &mut HashMap<TaskIdentity, CachedHistory>) {
        if let Some(oldest) = cache
            .iter()
            .min_by_key(|(_, cached)| cached.inserted)
            .map(|(key, _)| key.clone())
        {
            cache.remove(&oldest);
            if let Ok(mut stats) = self.stats.write() {
                stats.evictions += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(key: &str) -> TaskIdentity {
        TaskIdentity::new(key, "fr")
    }

    fn history(attempts: u32) -> TaskHistory {
        TaskHistory {
            attempt_count: attempts,
            ..TaskHistory::default()
        }
    }

    #[test]
    fn test_get_and_put() {
        let cache = HistoryCache::new(4);
        assert!(cache.get(&identity("a")).is_none());

        cache.put(identity("a"), history(2));
        assert_eq!(cache.get(&identity("a")).map(|h| h.attempt_count), Some(2));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert!((stats.hit_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let cache = HistoryCache::new(2);
        cache.put(identity("a"), history(1));
        cache.put(identity("b"), history(2));
        // 读取不影响淘汰顺序
        cache.get(&identity("a"));
        cache.put(identity("c"), history(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&identity("a")).is_none());
        assert!(cache.get(&identity("b")).is_some());
        assert!(cache.get(&identity("c")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = HistoryCache::new(2);
        cache.put(identity("a"), history(1));
        cache.put(identity("b"), history(1));
        cache.put(identity("a"), history(5));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(&identity("a")).map(|h| h.attempt_count), Some(5));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_peek_leaves_stats_untouched() {
        let cache = HistoryCache::new(2);
        assert!(cache.peek(&identity("a")).is_none());
        cache.put(identity("a"), history(3));
        assert_eq!(cache.peek(&identity("a")).map(|h| h.attempt_count), Some(3));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
