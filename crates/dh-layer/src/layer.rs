//! Layer provider contract and the in-memory implementation.

use std::collections::{BTreeMap, BTreeSet};

use dh_core::geometry::Bbox;
use dh_core::FeatureId;

use crate::error::{LayerError, LayerResult};
use crate::feature::{Feature, NewFeature};

/// Feature filter for `LayerProvider::features`.
///
/// An empty request matches every feature.
#[derive(Debug, Clone, Default)]
pub struct FeatureRequest {
    pub ids: Option<BTreeSet<FeatureId>>,
    pub bbox: Option<Bbox>,
}

impl FeatureRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: impl IntoIterator<Item = FeatureId>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            bbox: None,
        }
    }

    pub fn in_bbox(bbox: Bbox) -> Self {
        Self {
            ids: None,
            bbox: Some(bbox),
        }
    }

    pub fn matches<R>(&self, feature: &Feature<R>) -> bool {
        let id_ok = self.ids.as_ref().is_none_or(|ids| ids.contains(&feature.id));
        if !id_ok {
            return false;
        }
        match &self.bbox {
            None => true,
            Some(query) => feature
                .geometry
                .bbox()
                .is_some_and(|b| b.intersects(query)),
        }
    }
}

/// Access to one feature layer owned by the host.
///
/// Iteration order is ascending by feature id. Edits made between
/// `begin_edit` and `commit` become visible together; `rollback` restores
/// the layer to its state at `begin_edit`.
pub trait LayerProvider<R> {
    fn name(&self) -> &str;

    fn features<'a>(
        &'a self,
        request: &FeatureRequest,
    ) -> Box<dyn Iterator<Item = &'a Feature<R>> + 'a>
    where
        R: 'a;

    fn feature(&self, id: FeatureId) -> Option<&Feature<R>>;

    fn feature_count(&self) -> usize;

    /// Add features, returning their assigned ids in input order.
    fn add_features(&mut self, features: Vec<NewFeature<R>>) -> LayerResult<Vec<FeatureId>>;

    /// Delete features; fails without deleting anything if an id is unknown.
    fn delete_features(&mut self, ids: &[FeatureId]) -> LayerResult<()>;

    /// Replace an existing feature (matched by id).
    fn update_feature(&mut self, feature: Feature<R>) -> LayerResult<()>;

    fn begin_edit(&mut self) -> LayerResult<()>;

    fn commit(&mut self) -> LayerResult<()>;

    fn rollback(&mut self) -> LayerResult<()>;

    fn is_editing(&self) -> bool;
}

/// Run `f` inside an edit session: commit on `Ok`, roll back on `Err`.
pub fn transaction<R, L, T, E>(layer: &mut L, f: impl FnOnce(&mut L) -> Result<T, E>) -> Result<T, E>
where
    L: LayerProvider<R> + ?Sized,
    E: From<LayerError>,
{
    layer.begin_edit()?;
    match f(layer) {
        Ok(value) => {
            layer.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = layer.rollback() {
                tracing::warn!(layer = layer.name(), error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot<R> {
    features: BTreeMap<FeatureId, Feature<R>>,
    next_id: u32,
}

/// In-memory layer keyed by feature id.
#[derive(Debug, Clone)]
pub struct MemoryLayer<R> {
    name: String,
    features: BTreeMap<FeatureId, Feature<R>>,
    next_id: u32,
    snapshot: Option<Snapshot<R>>,
}

impl<R: Clone> MemoryLayer<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: BTreeMap::new(),
            next_id: 0,
            snapshot: None,
        }
    }

    /// Build a layer from drafts (ids assigned in order, starting at 0).
    pub fn from_features(name: impl Into<String>, features: Vec<NewFeature<R>>) -> Self {
        let mut layer = Self::new(name);
        for draft in features {
            layer.insert(draft);
        }
        layer
    }

    fn insert(&mut self, draft: NewFeature<R>) -> FeatureId {
        let id = FeatureId::from_index(self.next_id);
        self.next_id += 1;
        self.features.insert(
            id,
            Feature {
                id,
                geometry: draft.geometry,
                record: draft.record,
            },
        );
        id
    }

    fn unknown(&self, id: FeatureId) -> LayerError {
        LayerError::UnknownFeature(id, self.name.clone())
    }

    /// Remove every feature.
    pub fn clear(&mut self) {
        self.features.clear();
    }
}

impl<R: Clone> LayerProvider<R> for MemoryLayer<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn features<'a>(
        &'a self,
        request: &FeatureRequest,
    ) -> Box<dyn Iterator<Item = &'a Feature<R>> + 'a>
    where
        R: 'a,
    {
        let request = request.clone();
        Box::new(self.features.values().filter(move |f| request.matches(f)))
    }

    fn feature(&self, id: FeatureId) -> Option<&Feature<R>> {
        self.features.get(&id)
    }

    fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn add_features(&mut self, features: Vec<NewFeature<R>>) -> LayerResult<Vec<FeatureId>> {
        Ok(features.into_iter().map(|draft| self.insert(draft)).collect())
    }

    fn delete_features(&mut self, ids: &[FeatureId]) -> LayerResult<()> {
        if let Some(&missing) = ids.iter().find(|id| !self.features.contains_key(id)) {
            return Err(self.unknown(missing));
        }
        for id in ids {
            self.features.remove(id);
        }
        Ok(())
    }

    fn update_feature(&mut self, feature: Feature<R>) -> LayerResult<()> {
        match self.features.get_mut(&feature.id) {
            Some(slot) => {
                *slot = feature;
                Ok(())
            }
            None => Err(self.unknown(feature.id)),
        }
    }

    fn begin_edit(&mut self) -> LayerResult<()> {
        if self.snapshot.is_some() {
            return Err(LayerError::EditInProgress(self.name.clone()));
        }
        self.snapshot = Some(Snapshot {
            features: self.features.clone(),
            next_id: self.next_id,
        });
        Ok(())
    }

    fn commit(&mut self) -> LayerResult<()> {
        match self.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(LayerError::NoEditSession(self.name.clone())),
        }
    }

    fn rollback(&mut self) -> LayerResult<()> {
        match self.snapshot.take() {
            Some(snapshot) => {
                self.features = snapshot.features;
                self.next_id = snapshot.next_id;
                Ok(())
            }
            None => Err(LayerError::NoEditSession(self.name.clone())),
        }
    }

    fn is_editing(&self) -> bool {
        self.snapshot.is_some()
    }
}
