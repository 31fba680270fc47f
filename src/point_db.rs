use std::path::Path;

use rayon::prelude::*;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    record::ProblemRecord,
    vector_store::{
        CollectionInfo,
        CollectionLookup,
        Distance,
        ScoredPoint,
        StoredPoint,
        VectorStore,
        rank_key,
    },
};

const COLLECTIONS: TableDefinition<&str, &str> =
    TableDefinition::new("collections");
const VECTORS: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("vectors");
const PAYLOADS: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("payloads");

/// Collection metadata, stored as JSON in the `collections` table.
#[derive(Debug, Serialize, Deserialize)]
struct CollectionMeta {
    dimension: usize,
    distance: Distance,
}

/// Persistent vector collections backed by a single redb file.
///
/// Points are keyed by `(collection, id)`. Vectors are stored as raw f32
/// values (`dimension * 4` bytes), payloads as JSON. Search is an exact scan
/// over every point in the collection.
pub struct PointDb {
    db: Database,
}

impl PointDb {
    /// Open or create a point database at the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use mathsearch::PointDb;
    ///
    /// let db = PointDb::open(&tmp.path().join("points.redb")).unwrap();
    /// assert!(db.list_collections().unwrap().is_empty());
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(COLLECTIONS)?;
        txn.open_table(VECTORS)?;
        txn.open_table(PAYLOADS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    fn meta(&self, name: &str) -> Result<Option<CollectionMeta>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(COLLECTIONS)?;
        match table.get(name)? {
            Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
            None => Ok(None),
        }
    }

    fn require_meta(&self, name: &str) -> Result<CollectionMeta> {
        self.meta(name)?.ok_or_else(|| Error::NotFound {
            kind: "collection",
            name: name.to_string(),
        })
    }

    fn count_points(&self, name: &str) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VECTORS)?;
        let mut count = 0;
        for entry in table.range((name, 0u64)..=(name, u64::MAX))? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Remove a collection and all of its points.
    ///
    /// Returns `false` if the collection did not exist.
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut collections = txn.open_table(COLLECTIONS)?;
            let removed = collections.remove(name)?.is_some();

            let mut vectors = txn.open_table(VECTORS)?;
            let mut ids = Vec::new();
            for entry in vectors.range((name, 0u64)..=(name, u64::MAX))? {
                let (key, _) = entry?;
                ids.push(key.value().1);
            }

            let mut payloads = txn.open_table(PAYLOADS)?;
            for id in ids {
                vectors.remove((name, id))?;
                payloads.remove((name, id))?;
            }
            removed
        };
        txn.commit()?;
        Ok(removed)
    }

    /// List every collection with its current point count.
    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let names: Vec<String> = {
            let txn = self.db.begin_read()?;
            let table = txn.open_table(COLLECTIONS)?;
            let mut names = Vec::new();
            for entry in table.iter()? {
                let (k, _) = entry?;
                names.push(k.value().to_string());
            }
            names
        };

        let mut result = Vec::with_capacity(names.len());
        for name in names {
            if let CollectionLookup::Exists(info) = self.collection_info(&name)? {
                result.push(info);
            }
        }
        Ok(result)
    }
}

impl VectorStore for PointDb {
    fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<CollectionInfo> {
        if dimension == 0 {
            return Err(Error::InvalidArgument(
                "collection dimension must be at least 1".to_string(),
            ));
        }

        let meta = serde_json::to_string(&CollectionMeta {
            dimension,
            distance,
        })?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(COLLECTIONS)?;
            if table.get(name)?.is_some() {
                return Err(Error::AlreadyExists {
                    kind: "collection",
                    name: name.to_string(),
                });
            }
            table.insert(name, meta.as_str())?;
        }
        txn.commit()?;

        Ok(CollectionInfo {
            name: name.to_string(),
            dimension,
            distance,
            point_count: 0,
        })
    }

    fn collection_info(&self, name: &str) -> Result<CollectionLookup> {
        let Some(meta) = self.meta(name)? else {
            return Ok(CollectionLookup::NotFound);
        };

        Ok(CollectionLookup::Exists(CollectionInfo {
            name: name.to_string(),
            dimension: meta.dimension,
            distance: meta.distance,
            point_count: self.count_points(name)?,
        }))
    }

    fn upsert(&self, name: &str, points: &[StoredPoint]) -> Result<usize> {
        let meta = self.require_meta(name)?;

        if let Some(bad) =
            points.iter().find(|p| p.vector.len() != meta.dimension)
        {
            return Err(Error::DimensionMismatch {
                expected: meta.dimension,
                actual: bad.vector.len(),
            });
        }

        if points.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write()?;
        {
            let mut vectors = txn.open_table(VECTORS)?;
            let mut payloads = txn.open_table(PAYLOADS)?;
            for point in points {
                let payload = serde_json::to_string(&point.payload)?;
                vectors.insert(
                    (name, point.id),
                    bytemuck::cast_slice::<f32, u8>(&point.vector),
                )?;
                payloads.insert((name, point.id), payload.as_str())?;
            }
        }
        txn.commit()?;
        Ok(points.len())
    }

    fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let meta = self.require_meta(name)?;
        if query.len() != meta.dimension {
            return Err(Error::DimensionMismatch {
                expected: meta.dimension,
                actual: query.len(),
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_read()?;
        let vectors = txn.open_table(VECTORS)?;

        let mut candidates = Vec::new();
        for entry in vectors.range((name, 0u64)..=(name, u64::MAX))? {
            let (key, value) = entry?;
            candidates.push((key.value().1, decode_vector(value.value())));
        }

        let mut scored: Vec<(u64, f32)> = candidates
            .par_iter()
            .map(|(id, vector)| (*id, meta.distance.score(query, vector)))
            .collect();

        // Best score first; equal scores keep insertion (id) order.
        scored.sort_by(|a, b| {
            rank_key(b.1)
                .total_cmp(&rank_key(a.1))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        let payloads = txn.open_table(PAYLOADS)?;
        let mut results = Vec::with_capacity(scored.len());
        for (id, score) in scored {
            let guard = payloads.get((name, id))?.ok_or_else(|| {
                Error::NotFound {
                    kind: "payload",
                    name: format!("{name}/{id}"),
                }
            })?;
            let payload: ProblemRecord = serde_json::from_str(guard.value())?;
            results.push(ScoredPoint { id, score, payload });
        }

        Ok(results)
    }
}

impl std::fmt::Debug for PointDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointDb").finish_non_exhaustive()
    }
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(std::mem::size_of::<f32>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}
