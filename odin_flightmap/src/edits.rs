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

use std::sync::atomic::{AtomicBool,Ordering};
use tracing::{debug,info};

use crate::{
    feature_store::{FeatureStore, FeatureQuery, Graphic, LayerEdits, EditResults, ObjectId},
    reconcile::{Delta, ReconcileMode, RenderedSet, forget_removed},
    errors::{OdinFlightMapError, Result, store_error}
};

/// applies add/remove batches to the feature store of a single layer.
///
/// Each batch is awaited in full before the next one is issued. Removal/addition pairs that
/// belong together are run inside one [`EditPass`], and only one pass per layer can be active.
/// Store errors are not handled here, they propagate to the caller
pub struct EditApplier<S> where S: FeatureStore {
    store: S,
    in_flight: AtomicBool,
}

impl<S> EditApplier<S> where S: FeatureStore {
    pub fn new (store: S)->Self {
        EditApplier { store, in_flight: AtomicBool::new(false) }
    }

    pub fn store (&self)->&S { &self.store }

    pub fn layer_name (&self)->&str { self.store.layer_name() }

    pub fn is_in_flight (&self)->bool { self.in_flight.load( Ordering::Acquire) }

    /// start a pass for this layer. Fails with `EditInFlight` if there already is one
    pub fn begin_pass (&self)->Result<EditPass<'_,S>> {
        if self.in_flight.compare_exchange( false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err( OdinFlightMapError::EditInFlight( self.layer_name().to_string()))
        }
        Ok( EditPass { applier: self } )
    }

    /// single removal batch. An empty `graphics` list clears the whole layer
    pub async fn apply_removals (&self, graphics: Vec<Graphic>)->Result<usize> {
        self.begin_pass()?.apply_removals( graphics).await
    }

    /// single addition batch, returning the materialized graphics
    pub async fn apply_additions (&self, graphics: Vec<Graphic>)->Result<Vec<Graphic>> {
        self.begin_pass()?.apply_additions( graphics).await
    }

    /// apply a reconciliation delta (removals first). In `Full` mode the layer is cleared before
    /// the additions, in `Partial` mode we only issue removals if there is something to remove
    /// since an empty removal list would clear the layer.
    /// Successful removals are reflected in `rendered` right away, even if the additions fail
    pub async fn apply_delta (&self, delta: Delta, mode: ReconcileMode, rendered: &mut RenderedSet)->Result<Vec<Graphic>> {
        let pass = self.begin_pass()?;

        if mode == ReconcileMode::Full || !delta.to_remove.is_empty() {
            pass.apply_removals( delta.to_remove.clone()).await?;
            forget_removed( rendered, &delta.to_remove, mode);
        }

        if delta.to_add.is_empty() {
            Ok( Vec::new())
        } else {
            pass.apply_additions( delta.to_add).await
        }
    }

    /// clear the layer and add `graphics`. This is how we update single-occupancy layers
    pub async fn replace_all (&self, graphics: Vec<Graphic>)->Result<Vec<Graphic>> {
        let pass = self.begin_pass()?;
        pass.apply_removals( Vec::new()).await?;

        if graphics.is_empty() {
            Ok( Vec::new())
        } else {
            pass.apply_additions( graphics).await
        }
    }
}

/// exclusive edit access to one layer. The layer is released when the pass is dropped
pub struct EditPass<'a,S> where S: FeatureStore {
    applier: &'a EditApplier<S>
}

impl<'a,S> EditPass<'a,S> where S: FeatureStore {

    pub async fn apply_removals (&self, graphics: Vec<Graphic>)->Result<usize> {
        let store = &self.applier.store;

        let graphics = if graphics.is_empty() {
            store.query_features( FeatureQuery::All).await?
        } else {
            graphics
        };
        if graphics.is_empty() {
            return Ok(0) // nothing to clear
        }

        let results = store.apply_edits( LayerEdits::deletes( graphics)).await?;
        check_results( store.layer_name(), &results)?;

        let n_removed = results.delete_results.len();
        if n_removed > 0 {
            info!("{} object(s) have been removed from layer {}", n_removed, store.layer_name());
        }
        Ok(n_removed)
    }

    /// add `graphics` and wait until the store reports all of them as materialized
    pub async fn apply_additions (&self, graphics: Vec<Graphic>)->Result<Vec<Graphic>> {
        let store = &self.applier.store;
        let n_requested = graphics.len();

        let results = store.apply_edits( LayerEdits::adds( graphics)).await?;
        check_results( store.layer_name(), &results)?;

        if n_requested == 0 {
            return Ok( Vec::new())
        }

        let object_ids: Vec<ObjectId> = results.add_results.iter().filter_map( |r| r.object_id).collect();
        if object_ids.len() != n_requested {
            return Err( store_error( store.layer_name(), format!("store reported {} object ids for {} added features", object_ids.len(), n_requested)))
        }

        let materialized = store.query_features( FeatureQuery::ObjectIds( object_ids)).await?;
        if materialized.len() != n_requested {
            return Err( store_error( store.layer_name(), format!("only {} of {} added features materialized", materialized.len(), n_requested)))
        }

        info!("{} object(s) have been added to layer {}", materialized.len(), store.layer_name());
        Ok(materialized)
    }
}

impl<'a,S> Drop for EditPass<'a,S> where S: FeatureStore {
    fn drop (&mut self) {
        self.applier.in_flight.store( false, Ordering::Release);
    }
}

fn check_results (layer: &str, results: &EditResults)->Result<()> {
    let failed = results.add_results.iter().chain( results.delete_results.iter()).find( |r| !r.is_ok());
    if let Some(r) = failed {
        debug!("rejected edit on layer {}: {:?}", layer, r);
        let msg = r.error.clone().unwrap_or_default();
        return Err( store_error( layer, format!("edit of feature {:?} failed: {}", r.object_id, msg)))
    }
    Ok(())
}
