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

use odin_flightmap::{
    TrackedObject,
    feature_store::Graphic,
    partition::Bucket,
    projection::Geographic,
    reconcile::{RenderedSet, ReconcileMode, reconcile, next_rendered_set},
    viewport::{BoundingBox, CandidateSet, ViewportFilter}
};

fn candidates (keys: &[&str])->CandidateSet {
    let buckets: Vec<Bucket> = vec![ keys.iter().map( |k| TrackedObject::new( k, 1.0, 1.0)).collect() ];
    ViewportFilter::new( Geographic, 200).select( &buckets, &BoundingBox::new( 0.0, 0.0, 10.0, 10.0))
}

/// a rendered set as it looks after its graphics were materialized in a store
fn rendered (keys: &[&str])->RenderedSet {
    candidates( keys).graphics.into_iter().enumerate()
        .map( |(i,(k,g))| (k, g.with_object_id( 100 + i as u64)))
        .collect()
}

fn keys_of (graphics: &[Graphic])->Vec<&str> {
    graphics.iter().filter_map( |g| g.attr_str("icao24")).collect()
}

// run with "cargo test test_partial -- --nocapture"
#[test]
fn test_partial() {
    let previous = rendered( &["A", "B"]);
    let delta = reconcile( &previous, &candidates( &["B", "C"]), ReconcileMode::Partial);
    println!("add: {:?}, remove: {:?}", keys_of( &delta.to_add), keys_of( &delta.to_remove));

    assert_eq!( keys_of( &delta.to_add), vec!["C"]);
    assert_eq!( keys_of( &delta.to_remove), vec!["A"]);
    assert_eq!( delta.to_remove[0].object_id, previous["A"].object_id); // removals refer to what is on the surface
}

#[test]
fn test_full() {
    let previous = rendered( &["A", "B"]);
    let delta = reconcile( &previous, &candidates( &["Y", "X"]), ReconcileMode::Full);

    assert_eq!( keys_of( &delta.to_add), vec!["X", "Y"]);
    assert!( delta.to_remove.is_empty());
}

#[test]
fn test_unchanged() {
    let previous = rendered( &["A", "B"]);
    let delta = reconcile( &previous, &candidates( &["A", "B"]), ReconcileMode::Partial);
    assert!( delta.is_empty());

    let delta = reconcile( &RenderedSet::new(), &candidates( &[]), ReconcileMode::Partial);
    assert!( delta.is_empty());
}

#[test]
fn test_next_rendered_set() {
    let previous = rendered( &["A", "B"]);
    let cands = candidates( &["B", "C"]);
    let materialized = vec![ cands.graphics["C"].clone().with_object_id( 42) ];

    let next = next_rendered_set( &previous, &cands, ReconcileMode::Partial, &materialized);
    assert_eq!( next.keys().map( |k| k.as_str()).collect::<Vec<_>>(), vec!["B", "C"]);
    assert_eq!( next["B"].object_id, previous["B"].object_id);
    assert_eq!( next["C"].object_id, Some(42));

    // after a full pass everything was re-added, old ids are gone
    let materialized: Vec<Graphic> = cands.graphics.values().enumerate().map( |(i,g)| g.clone().with_object_id( 7 + i as u64)).collect();
    let next = next_rendered_set( &previous, &cands, ReconcileMode::Full, &materialized);
    assert_eq!( next["B"].object_id, Some(7));
    assert_eq!( next["C"].object_id, Some(8));
}
