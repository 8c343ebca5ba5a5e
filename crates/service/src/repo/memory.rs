use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use models::filter::{eval, Filter, Where};
use models::CrudEntity;
use serde_json::Value;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use crate::errors::ServiceError;
use crate::record::{from_object, to_object, Record};
use crate::repository::EntityRepository;

/// In-process repository over an ordered map, optionally persisted as JSON.
///
/// Filters are evaluated on the serialized form of each row, with the same
/// NULL and ordering rules PostgreSQL applies.
pub struct MemoryRepository<E: CrudEntity> {
    rows: RwLock<BTreeMap<i64, E::Model>>,
    file_path: Option<PathBuf>,
}

impl<E: CrudEntity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CrudEntity> MemoryRepository<E> {
    /// Empty, not persisted.
    pub fn new() -> Self {
        Self { rows: RwLock::new(BTreeMap::new()), file_path: None }
    }

    /// Load rows from `path`, creating the file with an empty map if missing.
    /// Every mutation rewrites the file.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ServiceError::Db(e.to_string()))?;
        }
        let rows: BTreeMap<i64, E::Model> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ServiceError::Db(format!("{}: {e}", file_path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = BTreeMap::new();
                write_file(&file_path, &empty).await?;
                empty
            }
            Err(e) => return Err(ServiceError::Db(e.to_string())),
        };
        debug!(collection = E::COLLECTION, rows = rows.len(), path = %file_path.display(), "store loaded");
        Ok(Self { rows: RwLock::new(rows), file_path: Some(file_path) })
    }

    /// Apply `change` to `rows`. File-backed stores write a staged copy first,
    /// so a failed write leaves `rows` untouched.
    async fn commit(&self, rows: &mut BTreeMap<i64, E::Model>, change: Change<E::Model>) -> Result<(), ServiceError> {
        match &self.file_path {
            Some(path) => {
                let mut next = rows.clone();
                change.apply(&mut next);
                write_file(path, &next).await?;
                *rows = next;
            }
            None => change.apply(rows),
        }
        Ok(())
    }

    fn matching<'a>(
        rows: &'a BTreeMap<i64, E::Model>,
        filter: Option<&'a Where>,
    ) -> impl Iterator<Item = Result<(i64, Record), ServiceError>> + 'a {
        rows.iter().filter_map(move |(id, model)| match to_object(model) {
            Ok(obj) if filter.map_or(true, |w| w.matches(&obj)) => Some(Ok((*id, obj))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }

    fn from_input(id: i64, input: &E::Input) -> Result<E::Model, ServiceError> {
        let mut obj = to_object(input)?;
        obj.insert("id".into(), Value::from(id));
        from_object(obj)
    }
}

enum Change<M> {
    Put(Vec<(i64, M)>),
    Remove(i64),
}

impl<M> Change<M> {
    fn apply(self, rows: &mut BTreeMap<i64, M>) {
        match self {
            Change::Put(models) => rows.extend(models),
            Change::Remove(id) => {
                rows.remove(&id);
            }
        }
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_file<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), ServiceError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| ServiceError::Db(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    fs::rename(&tmp, path).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl<E: CrudEntity> EntityRepository<E> for MemoryRepository<E> {
    async fn create(&self, input: E::Input) -> Result<E::Model, ServiceError> {
        let mut rows = self.rows.write().await;
        let id = match E::input_id(&input) {
            Some(id) if rows.contains_key(&id) => {
                return Err(ServiceError::Conflict(format!("{}/{id} already exists", E::COLLECTION)));
            }
            Some(id) => id,
            None => match rows.keys().next_back() {
                None => 1,
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    ServiceError::Conflict(format!("{}: no id left after {max}", E::COLLECTION))
                })?,
            },
        };
        let model = Self::from_input(id, &input)?;
        self.commit(&mut rows, Change::Put(vec![(id, model.clone())])).await?;
        debug!(collection = E::COLLECTION, id, "row inserted");
        Ok(model)
    }

    async fn count(&self, filter: Option<&Where>) -> Result<u64, ServiceError> {
        let rows = self.rows.read().await;
        let mut n = 0u64;
        for item in Self::matching(&rows, filter) {
            item?;
            n += 1;
        }
        Ok(n)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<E::Model>, ServiceError> {
        let rows = self.rows.read().await;
        let mut records = Self::matching(&rows, filter.where_.as_ref())
            .map(|item| item.map(|(_, obj)| obj))
            .collect::<Result<Vec<_>, _>>()?;
        drop(rows);

        eval::sort(&mut records, &filter.order_with_tiebreak("id"));
        let skip = filter.skip.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        records.into_iter().skip(skip).take(limit).map(from_object::<E::Model>).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<E::Model, ServiceError> {
        let rows = self.rows.read().await;
        rows.get(&id).cloned().ok_or_else(|| ServiceError::not_found(E::COLLECTION, id))
    }

    async fn update_all(&self, patch: E::Patch, filter: Option<&Where>) -> Result<u64, ServiceError> {
        let changes = to_object(&patch)?;
        let mut rows = self.rows.write().await;
        let matched = Self::matching(&rows, filter).collect::<Result<Vec<_>, _>>()?;
        let n = matched.len() as u64;
        if changes.is_empty() {
            return Ok(n);
        }
        let mut updated = Vec::with_capacity(matched.len());
        for (id, mut obj) in matched {
            obj.extend(changes.clone());
            updated.push((id, from_object(obj)?));
        }
        self.commit(&mut rows, Change::Put(updated)).await?;
        debug!(collection = E::COLLECTION, rows = n, "rows updated");
        Ok(n)
    }

    async fn update_by_id(&self, id: i64, patch: E::Patch) -> Result<(), ServiceError> {
        let changes = to_object(&patch)?;
        let mut rows = self.rows.write().await;
        let current = rows.get(&id).ok_or_else(|| ServiceError::not_found(E::COLLECTION, id))?;
        if changes.is_empty() {
            return Ok(());
        }
        let mut obj = to_object(current)?;
        obj.extend(changes);
        let model = from_object(obj)?;
        self.commit(&mut rows, Change::Put(vec![(id, model)])).await
    }

    async fn replace_by_id(&self, id: i64, input: E::Input) -> Result<(), ServiceError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&id) {
            return Err(ServiceError::not_found(E::COLLECTION, id));
        }
        let model = Self::from_input(id, &input)?;
        self.commit(&mut rows, Change::Put(vec![(id, model)])).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), ServiceError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&id) {
            return Err(ServiceError::not_found(E::COLLECTION, id));
        }
        self.commit(&mut rows, Change::Remove(id)).await?;
        debug!(collection = E::COLLECTION, id, "row deleted");
        Ok(())
    }
}
