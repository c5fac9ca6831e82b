/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! the interface to the rendering surface. Each map layer owns a persistent feature store that
//! accepts batched edits and answers queries. The store assigns object ids to added features,
//! deletions refer to features by these ids.

use std::{
    collections::BTreeMap, fmt, time::Duration,
    sync::{Arc, Mutex, atomic::{AtomicBool,AtomicUsize,Ordering}}
};
use async_trait::async_trait;
use geo::{Coord, LineString};
use serde_json::Value;
use tracing::debug;

use crate::{GeoPoint, errors::{Result, store_error}};

pub type ObjectId = u64;

/// feature attributes (the fields of the layer)
pub type Attributes = serde_json::Map<String,Value>;

#[derive(Debug,Clone,PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    Polyline(LineString<f64>),
}

/// a renderable feature. `object_id` is only set once the feature is materialized in a store
#[derive(Debug,Clone,PartialEq)]
pub struct Graphic {
    pub object_id: Option<ObjectId>,
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl Graphic {
    pub fn point (pos: GeoPoint, attributes: Attributes)->Self {
        Graphic { object_id: None, geometry: Geometry::Point(pos), attributes }
    }

    pub fn polyline (coords: Vec<Coord<f64>>, attributes: Attributes)->Self {
        Graphic { object_id: None, geometry: Geometry::Polyline( LineString::new(coords)), attributes }
    }

    pub fn with_object_id (mut self, object_id: ObjectId)->Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn attr (&self, field: &str)->Option<&Value> { self.attributes.get(field) }

    pub fn attr_str (&self, field: &str)->Option<&str> {
        self.attributes.get(field).and_then( |v| v.as_str())
    }

    pub fn attr_f64 (&self, field: &str)->Option<f64> {
        self.attributes.get(field).and_then( |v| v.as_f64())
    }

    /// the vertices of a polyline geometry (empty for points)
    pub fn path_coords (&self)->Vec<Coord<f64>> {
        match &self.geometry {
            Geometry::Polyline(ls) => ls.0.clone(),
            Geometry::Point(_) => Vec::new()
        }
    }
}

/// a batch of edits to be applied atomically to one layer
#[derive(Debug,Default)]
pub struct LayerEdits {
    pub add_features: Vec<Graphic>,
    pub delete_features: Vec<Graphic>,
}

impl LayerEdits {
    pub fn adds (add_features: Vec<Graphic>)->Self { LayerEdits { add_features, delete_features: Vec::new() } }
    pub fn deletes (delete_features: Vec<Graphic>)->Self { LayerEdits { add_features: Vec::new(), delete_features } }
}

#[derive(Debug,Clone,PartialEq)]
pub struct FeatureEditResult {
    pub object_id: Option<ObjectId>,
    pub error: Option<String>,
}

impl FeatureEditResult {
    pub fn ok (object_id: ObjectId)->Self { FeatureEditResult { object_id: Some(object_id), error: None } }
    pub fn failed (object_id: Option<ObjectId>, msg: impl ToString)->Self { FeatureEditResult { object_id, error: Some(msg.to_string()) } }
    pub fn is_ok (&self)->bool { self.error.is_none() }
}

#[derive(Debug,Default)]
pub struct EditResults {
    pub add_results: Vec<FeatureEditResult>,
    pub delete_results: Vec<FeatureEditResult>,
}

#[derive(Debug,Clone,PartialEq)]
pub enum FeatureQuery {
    All,
    ObjectIds(Vec<ObjectId>),
    AttributeEquals { field: String, value: Value },
}

impl FeatureQuery {
    pub fn where_eq (field: &str, value: impl Into<Value>)->Self {
        FeatureQuery::AttributeEquals { field: field.to_string(), value: value.into() }
    }

    pub fn matches (&self, object_id: ObjectId, g: &Graphic)->bool {
        match self {
            FeatureQuery::All => true,
            FeatureQuery::ObjectIds(ids) => ids.contains(&object_id),
            FeatureQuery::AttributeEquals{field,value} => g.attr(field) == Some(value)
        }
    }
}

/// the per-layer feature store of the rendering surface.
/// Implementations are shared between the edit applier (writer) and queries, hence `&self` receivers
#[async_trait]
pub trait FeatureStore: Send + Sync {
    fn layer_name (&self)->&str;

    async fn apply_edits (&self, edits: LayerEdits)->Result<EditResults>;

    async fn query_features (&self, query: FeatureQuery)->Result<Vec<Graphic>>;
}

#[async_trait]
impl<S> FeatureStore for Arc<S> where S: FeatureStore + ?Sized {
    fn layer_name (&self)->&str { self.as_ref().layer_name() }

    async fn apply_edits (&self, edits: LayerEdits)->Result<EditResults> {
        self.as_ref().apply_edits(edits).await
    }

    async fn query_features (&self, query: FeatureQuery)->Result<Vec<Graphic>> {
        self.as_ref().query_features(query).await
    }
}

/* #region MemFeatureStore ********************************************************************************/

struct MemLayer {
    features: BTreeMap<ObjectId,Graphic>,
    next_id: ObjectId,
}

/// an in-process feature store. This is what we use for replays and tests. It can simulate
/// edit latency and rejected edits
pub struct MemFeatureStore {
    name: String,
    layer: Mutex<MemLayer>,
    edit_delay: Option<Duration>,
    reject_edits: AtomicBool,
    reject_adds: AtomicBool,

    n_added: AtomicUsize,   // cumulative
    n_deleted: AtomicUsize, // cumulative
}

impl MemFeatureStore {
    pub fn new (name: impl ToString)->Self {
        MemFeatureStore {
            name: name.to_string(),
            layer: Mutex::new( MemLayer { features: BTreeMap::new(), next_id: 1 }),
            edit_delay: None,
            reject_edits: AtomicBool::new(false),
            reject_adds: AtomicBool::new(false),
            n_added: AtomicUsize::new(0),
            n_deleted: AtomicUsize::new(0),
        }
    }

    pub fn with_edit_delay (mut self, delay: Duration)->Self {
        self.edit_delay = Some(delay);
        self
    }

    /// make all following apply_edits calls fail (or succeed again)
    pub fn set_reject_edits (&self, reject: bool) {
        self.reject_edits.store( reject, Ordering::Relaxed);
    }

    /// only reject edit batches that add features. Deletions still go through
    pub fn set_reject_adds (&self, reject: bool) {
        self.reject_adds.store( reject, Ordering::Relaxed);
    }

    pub fn len (&self)->usize { self.lock_layer().features.len() }

    pub fn is_empty (&self)->bool { self.len() == 0 }

    pub fn features (&self)->Vec<Graphic> {
        self.lock_layer().features.values().cloned().collect()
    }

    /// sorted string values of the given attribute over all current features
    pub fn attr_values (&self, field: &str)->Vec<String> {
        let mut values: Vec<String> = self.lock_layer().features.values()
            .filter_map( |g| g.attr_str(field).map( |s| s.to_string()))
            .collect();
        values.sort();
        values
    }

    pub fn total_added (&self)->usize { self.n_added.load( Ordering::Relaxed) }
    pub fn total_deleted (&self)->usize { self.n_deleted.load( Ordering::Relaxed) }

    fn lock_layer (&self)->std::sync::MutexGuard<'_,MemLayer> {
        // a poisoned lock only means a panicking reader, the map itself is still consistent
        self.layer.lock().unwrap_or_else( |e| e.into_inner())
    }
}

impl fmt::Debug for MemFeatureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "MemFeatureStore( layer: {}, features: {})", self.name, self.len())
    }
}

#[async_trait]
impl FeatureStore for MemFeatureStore {
    fn layer_name (&self)->&str { self.name.as_str() }

    async fn apply_edits (&self, edits: LayerEdits)->Result<EditResults> {
        if let Some(delay) = self.edit_delay {
            tokio::time::sleep( delay).await;
        }
        if self.reject_edits.load( Ordering::Relaxed) {
            return Err( store_error( &self.name, "edits rejected"))
        }
        if !edits.add_features.is_empty() && self.reject_adds.load( Ordering::Relaxed) {
            return Err( store_error( &self.name, "additions rejected"))
        }

        let mut results = EditResults::default();
        let mut layer = self.lock_layer();

        for g in edits.delete_features {
            match g.object_id {
                Some(id) => {
                    if layer.features.remove(&id).is_some() {
                        results.delete_results.push( FeatureEditResult::ok(id));
                    } else {
                        results.delete_results.push( FeatureEditResult::failed( Some(id), "unknown object id"));
                    }
                }
                None => results.delete_results.push( FeatureEditResult::failed( None, "feature has no object id"))
            }
        }

        for g in edits.add_features {
            let id = layer.next_id;
            layer.next_id += 1;
            layer.features.insert( id, g.with_object_id(id));
            results.add_results.push( FeatureEditResult::ok(id));
        }

        let n_add = results.add_results.len();
        let n_del = results.delete_results.iter().filter( |r| r.is_ok()).count();
        self.n_added.fetch_add( n_add, Ordering::Relaxed);
        self.n_deleted.fetch_add( n_del, Ordering::Relaxed);
        debug!("layer {}: {} added, {} deleted, {} features", self.name, n_add, n_del, layer.features.len());

        Ok(results)
    }

    async fn query_features (&self, query: FeatureQuery)->Result<Vec<Graphic>> {
        let layer = self.lock_layer();
        Ok( layer.features.iter()
            .filter( |(id,g)| query.matches( **id, g))
            .map( |(_,g)| g.clone())
            .collect()
        )
    }
}

/* #endregion MemFeatureStore */
