use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

/// Tracks `(name, id)` pairs as metrics are started in name-managed mode,
/// detecting duplicate names and hash collisions between distinct names.
///
/// Created lazily by the encoder on the first `start_metric_name()` call —
/// id-mode encoders never allocate one.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    /// Insertion-ordered (name, id) pairs; order matches the metric-names payload.
    entries: Vec<(String, u64)>,
    names: HashSet<String>,
    by_id: HashMap<u64, String>,
    has_collision: bool,
}

impl CollisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` mapped to hash `id`. Returns `Err(DuplicateMetric)` if
    /// `name` was already tracked. A hash collision (different name, same
    /// id) is not an error: it sets `has_collision()` and both names remain
    /// independently retrievable once `HasMetricNames` is forced on.
    pub fn track(&mut self, name: &str, id: u64) -> Result<()> {
        if self.names.contains(name) {
            return Err(Error::DuplicateMetric {
                name: name.to_string(),
            });
        }

        if let Some(existing) = self.by_id.get(&id) {
            if existing != name {
                self.has_collision = true;
                tracing::warn!(
                    id,
                    existing = %existing,
                    incoming = %name,
                    "hash collision between distinct metric names"
                );
            }
        } else {
            self.by_id.insert(id, name.to_string());
        }

        self.names.insert(name.to_string());
        self.entries.push((name.to_string(), id));
        Ok(())
    }

    pub fn has_collision(&self) -> bool {
        self.has_collision
    }

    /// Names in insertion order, matching the index-entry order they pair with.
    pub fn names_in_order(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
