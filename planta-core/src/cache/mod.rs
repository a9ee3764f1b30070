//! Locally persisted, ordered plant cache.
//!
//! The cache keeps plants in insertion order and re-persists the complete
//! snapshot after every mutation.

mod storage;

pub use storage::{CacheError, CacheStorage, CACHE_FILENAME};

use uuid::Uuid;

use crate::models::Plant;

/// In-memory plant list backed by a [`CacheStorage`] snapshot.
#[derive(Debug)]
pub struct PlantCache {
    storage: CacheStorage,
    plants: Vec<Plant>,
}

impl PlantCache {
    /// Opens the cache, loading the last persisted snapshot if there is one.
    pub fn open(storage: CacheStorage) -> Result<Self, CacheError> {
        let plants = storage.load()?.unwrap_or_default();
        Ok(Self { storage, plants })
    }

    /// Re-reads the persisted snapshot, discarding in-memory state.
    pub fn load(&mut self) -> Result<&[Plant], CacheError> {
        self.plants = self.storage.load()?.unwrap_or_default();
        Ok(&self.plants)
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Plant> {
        self.plants.get(position)
    }

    pub fn position_of(&self, local_id: Uuid) -> Option<usize> {
        self.plants.iter().position(|p| p.local_id == local_id)
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Substitutes the whole snapshot.
    pub fn replace_all(&mut self, plants: Vec<Plant>) -> Result<(), CacheError> {
        self.plants = plants;
        self.persist()
    }

    pub fn append(&mut self, plant: Plant) -> Result<(), CacheError> {
        self.plants.push(plant);
        self.persist()
    }

    /// Applies `mutator` to the plant at `position`.
    ///
    /// Returns `Ok(None)` without persisting when the position is out of range.
    pub fn update_at<F>(&mut self, position: usize, mutator: F) -> Result<Option<&Plant>, CacheError>
    where
        F: FnOnce(&mut Plant),
    {
        match self.plants.get_mut(position) {
            Some(plant) => mutator(plant),
            None => return Ok(None),
        }
        self.persist()?;
        Ok(self.plants.get(position))
    }

    /// Removes and returns the plant at `position`.
    pub fn remove_at(&mut self, position: usize) -> Result<Option<Plant>, CacheError> {
        if position >= self.plants.len() {
            return Ok(None);
        }
        let removed = self.plants.remove(position);
        self.persist()?;
        Ok(Some(removed))
    }

    fn persist(&self) -> Result<(), CacheError> {
        self.storage.save(&self.plants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache() -> (PlantCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = PlantCache::open(CacheStorage::new(temp_dir.path())).unwrap();
        (cache, temp_dir)
    }

    fn reopen(cache: &PlantCache) -> PlantCache {
        PlantCache::open(cache.storage().clone()).unwrap()
    }

    #[test]
    fn test_open_empty() {
        let (cache, _temp) = test_cache();
        assert!(cache.is_empty());
        assert!(!cache.storage().exists());
    }

    #[test]
    fn test_append_persists_in_order() {
        let (mut cache, _temp) = test_cache();
        cache.append(Plant::new("Fern", 3).unwrap()).unwrap();
        cache.append(Plant::new("Basil", 2).unwrap()).unwrap();

        let reopened = reopen(&cache);
        let names: Vec<_> = reopened.plants().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Fern", "Basil"]);
    }

    #[test]
    fn test_update_at_persists() {
        let (mut cache, _temp) = test_cache();
        cache.append(Plant::new("Fern", 3).unwrap()).unwrap();

        let updated = cache
            .update_at(0, |p| p.name = "Boston Fern".to_string())
            .unwrap()
            .cloned();
        assert_eq!(updated.unwrap().name, "Boston Fern");
        assert_eq!(reopen(&cache).plants()[0].name, "Boston Fern");
    }

    #[test]
    fn test_update_at_out_of_range() {
        let (mut cache, _temp) = test_cache();
        assert!(cache.update_at(3, |_| {}).unwrap().is_none());
        assert!(!cache.storage().exists());
    }

    #[test]
    fn test_remove_at_keeps_relative_order() {
        let (mut cache, _temp) = test_cache();
        for name in ["A", "B", "C"] {
            cache.append(Plant::new(name, 1).unwrap()).unwrap();
        }

        let removed = cache.remove_at(1).unwrap().unwrap();
        assert_eq!(removed.name, "B");

        let names: Vec<_> = reopen(&cache)
            .plants()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(cache.remove_at(5).unwrap().is_none());
    }

    #[test]
    fn test_replace_all_and_load() {
        let (mut cache, _temp) = test_cache();
        cache.append(Plant::new("Old", 1).unwrap()).unwrap();

        let fresh = Plant::new("New", 4).unwrap();
        cache.replace_all(vec![fresh.clone()]).unwrap();

        assert_eq!(cache.load().unwrap(), &[fresh][..]);
    }

    #[test]
    fn test_position_of() {
        let (mut cache, _temp) = test_cache();
        let fern = Plant::new("Fern", 3).unwrap();
        let id = fern.local_id;
        cache.append(Plant::new("Basil", 2).unwrap()).unwrap();
        cache.append(fern).unwrap();

        assert_eq!(cache.position_of(id), Some(1));
        assert_eq!(cache.position_of(Uuid::new_v4()), None);
    }
}
