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
use tokio::sync::mpsc;
use odin_flightmap::{
    FlightMapConfig, TrackedObject, FlightRecord, PathSample, AirportRecord, GeoPoint, load_config,
    dispatcher::{FlightMapEvent, UpdateDispatcher},
    errors::OdinFlightMapError,
    feature_store::MemFeatureStore,
    messages::{InboundMsg, OutboundMsg},
    projection::Geographic,
    reconcile::ReconcileMode,
    viewport::BoundingBox
};

type Store = Arc<MemFeatureStore>;

struct Fixture {
    dispatcher: UpdateDispatcher<Store,Geographic>,
    objects: Store,
    paths: Store,
    airports: Store,
    rx_out: mpsc::Receiver<OutboundMsg>,
}

fn fixture (config: FlightMapConfig)->Fixture {
    let objects = Arc::new( MemFeatureStore::new( &config.object_layer));
    let paths = Arc::new( MemFeatureStore::new( &config.path_layer));
    let airports = Arc::new( MemFeatureStore::new( &config.airport_layer));
    let (tx_out, rx_out) = mpsc::channel( 16);

    let dispatcher = UpdateDispatcher::new( config, Geographic, objects.clone(), paths.clone(), airports.clone(), tx_out).unwrap();
    Fixture { dispatcher, objects, paths, airports, rx_out }
}

fn snapshot (objs: &[(&str,f64,f64)])->FlightMapEvent {
    FlightMapEvent::Inbound( InboundMsg::Snapshot( objs.iter().map( |(k,x,y)| TrackedObject::new( k, *x, *y)).collect()))
}

fn viewport (x_min: f64, y_min: f64, x_max: f64, y_max: f64)->FlightMapEvent {
    FlightMapEvent::ViewportStationary( BoundingBox::new( x_min, y_min, x_max, y_max))
}

// run with "cargo test test_snapshot_render -- --nocapture"
#[tokio::test]
async fn test_snapshot_render() {
    let mut f = fixture( FlightMapConfig::default());
    f.dispatcher.init().await.unwrap();

    f.dispatcher.handle_event( viewport( 0.0, 0.0, 10.0, 10.0)).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("A",1.0,1.0), ("B",2.0,2.0), ("C",20.0,2.0)])).await.unwrap();

    println!("object layer: {:?}", f.objects.attr_values("icao24"));
    assert_eq!( f.objects.attr_values("icao24"), vec!["A", "B"]);
    let rendered: Vec<&str> = f.dispatcher.session().rendered.keys().map( |k| k.as_str()).collect();
    assert_eq!( rendered, vec!["A", "B"]);
    assert!( f.dispatcher.session().rendered.values().all( |g| g.object_id.is_some()));
}

#[tokio::test]
async fn test_viewport_change_is_partial() {
    let mut f = fixture( FlightMapConfig::default());
    f.dispatcher.init().await.unwrap();

    // snapshot before the first viewport is only stored
    f.dispatcher.handle_event( snapshot( &[("A",1.0,1.0), ("B",5.0,5.0), ("C",9.0,9.0)])).await.unwrap();
    assert!( f.objects.is_empty());
    assert_eq!( f.dispatcher.session().n_objects(), 3);

    f.dispatcher.handle_event( viewport( 0.0, 0.0, 6.0, 6.0)).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["A", "B"]);
    let id_b = f.dispatcher.session().rendered["B"].object_id;

    f.dispatcher.handle_event( viewport( 4.0, 4.0, 10.0, 10.0)).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["B", "C"]);
    assert_eq!( f.dispatcher.session().rendered["B"].object_id, id_b); // B was not touched
    assert_eq!( f.objects.total_added(), 3);
    assert_eq!( f.objects.total_deleted(), 1);

    // nothing changed, nothing to do (in particular no clear)
    f.dispatcher.handle_event( viewport( 4.0, 4.0, 10.0, 10.0)).await.unwrap();
    assert_eq!( f.objects.len(), 2);
    assert_eq!( f.objects.total_added(), 3);
}

#[tokio::test]
async fn test_snapshot_modes() {
    let mut f = fixture( FlightMapConfig::default());
    f.dispatcher.handle_event( viewport( 0.0, 0.0, 10.0, 10.0)).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("A",1.0,1.0), ("B",2.0,2.0)])).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("B",2.5,2.0), ("C",3.0,3.0)])).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["B", "C"]);
    assert_eq!( f.objects.total_added(), 4); // full: everything re-added

    let config = FlightMapConfig { snapshot_mode: ReconcileMode::Partial, ..FlightMapConfig::default() };
    let mut f = fixture( config);
    f.dispatcher.handle_event( viewport( 0.0, 0.0, 10.0, 10.0)).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("A",1.0,1.0), ("B",2.0,2.0)])).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("B",2.5,2.0), ("C",3.0,3.0)])).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["B", "C"]);
    assert_eq!( f.objects.total_added(), 3);
    assert_eq!( f.objects.total_deleted(), 1);
}

#[tokio::test]
async fn test_store_failure_keeps_session() {
    let mut f = fixture( FlightMapConfig::default());
    f.dispatcher.handle_event( viewport( 0.0, 0.0, 10.0, 10.0)).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("A",1.0,1.0)])).await.unwrap();

    f.objects.set_reject_edits( true);
    let res = f.dispatcher.handle_event( snapshot( &[("B",2.0,2.0)])).await;
    assert!( matches!( res, Err(OdinFlightMapError::StoreError{..})));
    assert!( f.dispatcher.session().rendered.contains_key("A")); // stale until the next successful pass
    assert!( !f.dispatcher.object_layer().is_in_flight());

    f.objects.set_reject_edits( false);
    f.dispatcher.handle_event( snapshot( &[("B",2.0,2.0)])).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["B"]);
}

#[tokio::test]
async fn test_recover_from_failed_additions() {
    let config = FlightMapConfig { snapshot_mode: ReconcileMode::Partial, ..FlightMapConfig::default() };
    let mut f = fixture( config);
    f.dispatcher.handle_event( viewport( 0.0, 0.0, 10.0, 10.0)).await.unwrap();
    f.dispatcher.handle_event( snapshot( &[("A",1.0,1.0), ("B",2.0,2.0)])).await.unwrap();

    // A gets removed, adding C fails
    f.objects.set_reject_adds( true);
    let res = f.dispatcher.handle_event( snapshot( &[("B",2.0,2.0), ("C",3.0,3.0)])).await;
    assert!( matches!( res, Err(OdinFlightMapError::StoreError{..})));
    assert_eq!( f.objects.attr_values("icao24"), vec!["B"]);
    let rendered: Vec<&str> = f.dispatcher.session().rendered.keys().map( |k| k.as_str()).collect();
    assert_eq!( rendered, vec!["B"]);

    f.objects.set_reject_adds( false);
    f.dispatcher.handle_event( snapshot( &[("B",2.0,2.0), ("C",3.0,3.0)])).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["B", "C"]);

    f.dispatcher.handle_event( viewport( 2.5, 0.0, 10.0, 10.0)).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["C"]);
    let rendered: Vec<&str> = f.dispatcher.session().rendered.keys().map( |k| k.as_str()).collect();
    assert_eq!( rendered, vec!["C"]);
}

#[tokio::test]
async fn test_selection_and_path_refresh() {
    let mut f = fixture( FlightMapConfig::default());

    let airports = vec![ AirportRecord {
        icao: "KSFO".into(), name: None, city: None, country: None, longitude: 0.5, latitude: 0.5
    }];
    f.dispatcher.handle_event( FlightMapEvent::Inbound( InboundMsg::Airports( airports))).await.unwrap();
    assert_eq!( f.airports.len(), 1);

    // the user clicks, we drop any path and ask the server
    f.dispatcher.handle_event( FlightMapEvent::UserSelect { icao24: "a1b2c3".into(), map_point: Coord { x: 3.0, y: 3.0 } }).await.unwrap();
    assert_eq!( f.rx_out.try_recv().unwrap(), OutboundMsg::SelectAircraft { icao24: "a1b2c3".into(), position: GeoPoint::new( 3.0, 3.0) });

    // no path on the surface yet, nothing to refresh
    f.dispatcher.request_path_update().await.unwrap();
    assert!( f.rx_out.try_recv().is_err());

    let flight = FlightRecord::new( "a1b2c3", None, Some("KSFO".into()), vec![ PathSample::new( 1.0, 1.0), PathSample::new( 2.0, 2.0) ]);
    let msg = InboundMsg::FlightSelected { flight: Some(flight), cursor: Some( GeoPoint::new( 3.0, 3.0)) };
    f.dispatcher.handle_event( FlightMapEvent::Inbound( msg)).await.unwrap();

    let path = f.paths.features();
    assert_eq!( path.len(), 1);
    let pts: Vec<(f64,f64)> = path[0].path_coords().iter().map( |c| (c.x, c.y)).collect();
    assert_eq!( pts, vec![ (0.5,0.5), (1.0,1.0), (2.0,2.0), (3.0,3.0) ]);

    f.dispatcher.request_path_update().await.unwrap();
    assert_eq!( f.rx_out.try_recv().unwrap(), OutboundMsg::PathUpdate { icao24: "a1b2c3".into() });

    let update = FlightRecord::new( "a1b2c3", None, None, vec![ PathSample::new( 1.0, 1.0), PathSample::new( 2.0, 2.0), PathSample::new( 4.0, 4.0) ]);
    f.dispatcher.handle_event( FlightMapEvent::Inbound( InboundMsg::PathUpdate( update))).await.unwrap();
    assert_eq!( f.paths.features()[0].path_coords().len(), 3);

    // a new click clears the path
    f.dispatcher.handle_event( FlightMapEvent::UserSelect { icao24: "4ca7b4".into(), map_point: Coord { x: 5.0, y: 5.0 } }).await.unwrap();
    assert!( f.paths.is_empty());
}

#[tokio::test]
async fn test_json_input() {
    let mut f = fixture( FlightMapConfig::default());
    f.dispatcher.handle_event( viewport( -123.0, 37.0, -122.0, 38.0)).await.unwrap();

    f.dispatcher.handle_json( r#"[{"icao24":"a1b2c3","longitude":-122.3,"latitude":37.7},{"icao24":"3c6444","longitude":8.57,"latitude":50.03}]"#).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["a1b2c3"]);

    let res = f.dispatcher.handle_json( r#"["bogus"]"#).await;
    assert!( matches!( res, Err(OdinFlightMapError::MalformedMessage(_))));
}

#[tokio::test]
async fn test_run_loop() {
    let mut f = fixture( FlightMapConfig::default());
    let (tx, rx) = mpsc::channel( 16);

    tx.send( viewport( 0.0, 0.0, 10.0, 10.0)).await.unwrap();
    tx.send( FlightMapEvent::Inbound( InboundMsg::PathUpdate( FlightRecord::new( "zzz", None, None, vec![])))).await.unwrap(); // ignored
    tx.send( snapshot( &[("A",1.0,1.0), ("B",20.0,2.0)])).await.unwrap();
    tx.send( FlightMapEvent::Terminate).await.unwrap();
    tx.send( snapshot( &[("C",1.0,1.0)])).await.unwrap(); // never processed

    f.dispatcher.run( rx).await.unwrap();
    assert_eq!( f.objects.attr_values("icao24"), vec!["A"]);
}

#[test]
fn test_config() {
    let config: FlightMapConfig = load_config( concat!( env!("CARGO_MANIFEST_DIR"), "/configs/flightmap.ron")).unwrap();
    println!("{config:?}");
    assert_eq!( config.bucket_count, 128);
    assert_eq!( config.max_features, 200);
    assert_eq!( config.path_update_interval.as_secs(), 4);
    assert_eq!( config.snapshot_mode, ReconcileMode::Full);
    assert_eq!( config.object_layer, "aircraft");

    let bad = FlightMapConfig { bucket_count: 0, ..FlightMapConfig::default() };
    assert!( matches!( bad.check(), Err(OdinFlightMapError::InvalidConfig(_))));
}
