use crate::tree::IndifferentMap;

/// The compiled config file, plus whether it still matches the current
/// config path and parser chain.
///
/// `configs` holds nothing meaningful until the first successful build.
/// Only two things touch the validity flag: [`invalidate`](Self::invalidate)
/// and a successful rebuild inside
/// [`get_or_try_insert_with`](Self::get_or_try_insert_with).
#[derive(Debug, Default)]
pub(crate) struct ConfigCache {
    configs: IndifferentMap,
    valid: bool,
}

impl ConfigCache {
    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Returns the cached configs, rebuilding them with `build` first if the
    /// cache is stale. A failed rebuild leaves the cache stale.
    pub(crate) fn get_or_try_insert_with<E>(
        &mut self,
        build: impl FnOnce() -> Result<IndifferentMap, E>,
    ) -> Result<&IndifferentMap, E> {
        if !self.valid {
            self.configs = build()?;
            self.valid = true;
        }
        Ok(&self.configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ConfigTree;
    use std::cell::Cell;

    fn map(key: &str) -> IndifferentMap {
        [(key, ConfigTree::Null)].into_iter().collect()
    }

    #[test]
    fn test_builds_once_while_valid() {
        let mut cache = ConfigCache::default();
        let builds = Cell::new(0);
        let build = || {
            builds.set(builds.get() + 1);
            Ok::<_, ()>(map("local"))
        };

        assert!(!cache.is_valid());
        cache.get_or_try_insert_with(build).unwrap();
        cache.get_or_try_insert_with(build).unwrap();

        assert!(cache.is_valid());
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let mut cache = ConfigCache::default();
        cache.get_or_try_insert_with(|| Ok::<_, ()>(map("old"))).unwrap();
        cache.invalidate();

        let configs = cache.get_or_try_insert_with(|| Ok::<_, ()>(map("new"))).unwrap();
        assert!(configs.contains_key("new"));
        assert!(!configs.contains_key("old"));
    }

    #[test]
    fn test_failed_build_stays_invalid() {
        let mut cache = ConfigCache::default();
        let result = cache.get_or_try_insert_with(|| Err("boom"));

        assert_eq!(result.unwrap_err(), "boom");
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_failed_rebuild_keeps_cache_stale() {
        let mut cache = ConfigCache::default();
        cache.get_or_try_insert_with(|| Ok::<_, &str>(map("old"))).unwrap();
        cache.invalidate();

        assert!(cache.get_or_try_insert_with(|| Err("boom")).is_err());
        assert!(!cache.is_valid());

        let configs = cache.get_or_try_insert_with(|| Ok::<_, &str>(map("new"))).unwrap();
        assert!(configs.contains_key("new"));
    }
}
