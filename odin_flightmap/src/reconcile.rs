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

use std::collections::BTreeMap;
use serde::{Serialize,Deserialize};

use crate::{KEY_FIELD, feature_store::Graphic, viewport::CandidateSet};

/// what is currently displayed on a layer, by object key. Graphics of a RenderedSet carry the
/// object ids the store assigned when they were added
pub type RenderedSet = BTreeMap<String,Graphic>;

#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
pub enum ReconcileMode {
    /// add every candidate, remove nothing (the layer gets cleared before)
    Full,
    /// only add what is new and remove what is gone
    Partial
}

#[derive(Debug,Default)]
pub struct Delta {
    pub to_add: Vec<Graphic>,
    pub to_remove: Vec<Graphic>,
}

impl Delta {
    pub fn is_empty (&self)->bool { self.to_add.is_empty() && self.to_remove.is_empty() }
}

/// compute the edits that turn `previous` into `candidates`.
/// Keys that are in both sets are left alone so that unchanged features don't flicker
pub fn reconcile (previous: &RenderedSet, candidates: &CandidateSet, mode: ReconcileMode)->Delta {
    let mut delta = Delta::default();

    match mode {
        ReconcileMode::Full => {
            delta.to_add.extend( candidates.graphics.values().cloned());
        }
        ReconcileMode::Partial => {
            for (key,g) in &candidates.graphics {
                if !previous.contains_key(key) {
                    delta.to_add.push( g.clone());
                }
            }
            for (key,g) in previous {
                if !candidates.contains(key) {
                    delta.to_remove.push( g.clone());
                }
            }
        }
    }

    delta
}

/// the RenderedSet that replaces `previous` once a delta was applied.
/// It has exactly the keys of `candidates`. Retained keys keep the graphic that is already on the
/// surface, new keys use their `materialized` (store confirmed) graphic or the candidate if the
/// store did not report one
pub fn next_rendered_set (previous: &RenderedSet, candidates: &CandidateSet, mode: ReconcileMode, materialized: &[Graphic])->RenderedSet {
    let mut by_key: BTreeMap<&str,&Graphic> = BTreeMap::new();
    for g in materialized {
        if let Some(key) = g.attr_str(KEY_FIELD) {
            by_key.insert( key, g);
        }
    }

    let mut next = RenderedSet::new();
    for (key,g) in &candidates.graphics {
        let rendered = match mode {
            ReconcileMode::Partial => previous.get(key).or_else( || by_key.get( key.as_str()).copied()),
            ReconcileMode::Full => by_key.get( key.as_str()).copied()
        };
        next.insert( key.clone(), rendered.unwrap_or(g).clone());
    }
    next
}

/// drop the keys of features that were just removed from the layer. This is committed as soon as
/// the removal batch succeeded so that a failing addition batch can't leave stale object ids behind
pub fn forget_removed (rendered: &mut RenderedSet, removed: &[Graphic], mode: ReconcileMode) {
    match mode {
        ReconcileMode::Full => rendered.clear(), // the layer was cleared
        ReconcileMode::Partial => {
            for g in removed {
                if let Some(key) = g.attr_str(KEY_FIELD) {
                    rendered.remove(key);
                }
            }
        }
    }
}
