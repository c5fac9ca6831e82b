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

use std::sync::Arc;
use geo::Coord;
use odin_flightmap::{
    GeoPoint, FlightRecord, PathSample, AirportRecord,
    edits::EditApplier,
    feature_store::{MemFeatureStore, Graphic},
    flight_path::FlightPathTracker
};

type Store = Arc<MemFeatureStore>;

async fn setup ()->(FlightPathTracker<Store>, Store) {
    let path_store = Arc::new( MemFeatureStore::new( "traveled_path"));
    let airport_store = Arc::new( MemFeatureStore::new( "airports"));

    let origin = AirportRecord {
        icao: "KSFO".into(), name: Some("San Francisco International".into()), city: None, country: None,
        longitude: 0.5, latitude: 0.25
    };
    EditApplier::new( airport_store.clone()).apply_additions( vec![ origin.to_graphic() ]).await.unwrap();

    (FlightPathTracker::new( path_store.clone(), airport_store), path_store)
}

fn record (icao24: &str, dep: Option<&str>, samples: &[(f64,f64)])->FlightRecord {
    let path = samples.iter().map( |(x,y)| PathSample::new( *x, *y)).collect();
    FlightRecord::new( icao24, Some("UAL123".into()), dep.map( |s| s.to_string()), path)
}

fn coords (pts: &[(f64,f64)])->Vec<Coord<f64>> {
    pts.iter().map( |(x,y)| Coord { x: *x, y: *y }).collect()
}

fn single_path (store: &MemFeatureStore)->Graphic {
    let features = store.features();
    assert_eq!( features.len(), 1);
    features[0].clone()
}

// run with "cargo test test_select_with_origin -- --nocapture"
#[tokio::test]
async fn test_select_with_origin() {
    let (mut tracker, path_store) = setup().await;

    let flight = record( "a1b2c3", Some("KSFO"), &[(1.0,1.0), (2.0,2.0)]);
    tracker.select( Some(&flight), Some( GeoPoint::new( 3.0, 3.0))).await.unwrap();

    let g = single_path( &path_store);
    println!("path: {:?}", g.path_coords());
    assert_eq!( g.path_coords(), coords( &[(0.5,0.25), (1.0,1.0), (2.0,2.0), (3.0,3.0)]));
    assert_eq!( g.attr_str("icao24"), Some("a1b2c3"));
    assert_eq!( g.attr_str("callsign"), Some("UAL123"));
    assert_eq!( tracker.selected_key(), Some("a1b2c3"));
    assert_eq!( tracker.query_tracked_key().await.unwrap().as_deref(), Some("a1b2c3"));
}

#[tokio::test]
async fn test_missing_data() {
    let (mut tracker, path_store) = setup().await;

    // unknown airport and null samples are skipped
    let mut flight = record( "a1b2c3", Some("KXXX"), &[(1.0,1.0)]);
    flight.path.push( PathSample { longitude: None, latitude: None });
    flight.path.push( PathSample::new( 2.0, 2.0));
    tracker.select( Some(&flight), None).await.unwrap();
    assert_eq!( single_path( &path_store).path_coords(), coords( &[(1.0,1.0), (2.0,2.0)]));

    // no flight leaves the layer alone
    tracker.select( None, Some( GeoPoint::new( 3.0, 3.0))).await.unwrap();
    assert_eq!( path_store.len(), 1);

    // a path without any point clears the layer
    let flight = record( "a1b2c3", None, &[]);
    tracker.select( Some(&flight), None).await.unwrap();
    assert!( path_store.is_empty());
}

#[tokio::test]
async fn test_update() {
    let (mut tracker, path_store) = setup().await;

    // nothing selected yet
    tracker.update( &record( "a1b2c3", None, &[(1.0,1.0)])).await.unwrap();
    assert!( path_store.is_empty());

    tracker.select( Some( &record( "a1b2c3", Some("KSFO"), &[(1.0,1.0)])), None).await.unwrap();
    let id_before = single_path( &path_store).object_id;

    // stale reply for another aircraft
    tracker.update( &record( "4ca7b4", None, &[(5.0,5.0)])).await.unwrap();
    assert_eq!( single_path( &path_store).object_id, id_before);

    tracker.update( &record( "a1b2c3", Some("KSFO"), &[(1.0,1.0), (1.5,1.5)])).await.unwrap();
    let g = single_path( &path_store);
    assert_ne!( g.object_id, id_before);
    assert_eq!( g.path_coords(), coords( &[(0.5,0.25), (1.0,1.0), (1.5,1.5)]));

    tracker.clear().await.unwrap();
    assert!( path_store.is_empty());
    assert!( tracker.selected_key().is_none());
    assert!( tracker.query_tracked_key().await.unwrap().is_none());
}
