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

//! incremental rendering of live aircraft positions onto layered map feature stores.
//!
//! Snapshots of all tracked aircraft are hashed into buckets, filtered against the current
//! viewport, diffed against what is already displayed and the resulting delta is applied to an
//! external [`feature_store::FeatureStore`]. A single selected aircraft additionally gets its
//! traveled path drawn into a separate layer. Everything is driven by the
//! [`dispatcher::UpdateDispatcher`] control loop.

use std::{fmt, fs, path::Path, time::Duration};
use serde::{Serialize,Deserialize};
use chrono::{DateTime,Utc};
use uom::si::{f64::{Length,Velocity}, length::meter, velocity::meter_per_second};

pub mod errors;
use errors::Result;

pub mod projection;
pub mod feature_store;
use feature_store::{Attributes, Graphic};

pub mod partition;
pub mod viewport;
pub mod reconcile;
use reconcile::ReconcileMode;

pub mod edits;
pub mod flight_path;
pub mod messages;
pub mod dispatcher;

/// geographic position with x = longitude and y = latitude in degrees
pub type GeoPoint = geo::Point<f64>;

/// the attribute that holds the identity key of aircraft and path features
pub const KEY_FIELD: &str = "icao24";

/// the data model for a tracked aircraft as it is received in snapshots. Instances are replaced
/// wholesale by each new snapshot, we never update fields of a TrackedObject
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct TrackedObject {
    /// the identity key. Records without one deserialize with an empty key and get dropped during partitioning
    #[serde(default)]
    pub icao24: String,

    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,

    // OpenSky reports null positions for aircraft that were only seen through mode-S
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub true_track: Option<f64>, // degrees clockwise from north
    #[serde(default)]
    pub velocity: Option<Velocity>, // m/s on the wire
    #[serde(default)]
    pub baro_altitude: Option<Length>, // m on the wire
    #[serde(default)]
    pub on_ground: Option<bool>,

    #[serde(default, with="chrono::serde::ts_seconds_option")]
    pub last_contact: Option<DateTime<Utc>>,
}

impl TrackedObject {
    pub fn new (icao24: impl ToString, longitude: f64, latitude: f64)->Self {
        TrackedObject {
            icao24: icao24.to_string(),
            callsign: None,
            origin_country: None,
            longitude: Some(longitude),
            latitude: Some(latitude),
            true_track: None,
            velocity: None,
            baro_altitude: None,
            on_ground: None,
            last_contact: None
        }
    }

    pub fn key (&self)->&str { self.icao24.as_str() }

    pub fn has_key (&self)->bool { !self.icao24.is_empty() }

    pub fn position (&self)->Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(lon),Some(lat)) => Some( GeoPoint::new( lon, lat)),
            _ => None
        }
    }

    /// the point graphic we render for this aircraft. Attribute names are what popups and the
    /// rotation renderer of the rendering surface refer to
    pub fn to_graphic (&self)->Option<Graphic> {
        let pos = self.position()?;

        let mut attrs = Attributes::new();
        attrs.insert( KEY_FIELD.into(), self.icao24.as_str().into());
        attrs.insert( "callsign".into(), self.callsign.clone().into());
        attrs.insert( "origin_country".into(), self.origin_country.clone().into());
        attrs.insert( "longitude".into(), pos.x().into());
        attrs.insert( "latitude".into(), pos.y().into());
        attrs.insert( "true_track".into(), self.true_track.into());
        attrs.insert( "baro_altitude".into(), self.baro_altitude.map( |alt| alt.get::<meter>()).into());
        attrs.insert( "velocity".into(), self.velocity.map( |v| v.get::<meter_per_second>()).into());

        Some( Graphic::point( pos, attrs))
    }
}

impl fmt::Display for TrackedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "TrackedObject( icao24: {}", self.icao24)?;
        if let Some(cs) = &self.callsign { write!( f, ", cs: \"{}\"", cs.trim())?; }
        if let Some(p) = self.position() { write!( f, ", pos: [{:.5},{:.5}]", p.x(), p.y())?; }
        if let Some(hdg) = self.true_track { write!( f, ", hdg: {:.0}", hdg)?; }
        if let Some(alt) = self.baro_altitude { write!( f, ", alt: {:.0}", alt.get::<meter>())?; }
        write!( f, ")")
    }
}

/// a single historical position of a [`FlightRecord`]. Coordinates can be null if the
/// recorded state vector had no position
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq)]
pub struct PathSample {
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
}

impl PathSample {
    pub fn new (longitude: f64, latitude: f64)->Self {
        PathSample { longitude: Some(longitude), latitude: Some(latitude) }
    }

    pub fn position (&self)->Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(lon),Some(lat)) => Some( GeoPoint::new( lon, lat)),
            _ => None
        }
    }
}

/// the flight history of a selected aircraft as sent by the server upon selection and path-update requests
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct FlightRecord {
    pub icao24: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub departure_airport_icao: Option<String>,
    #[serde(default)]
    pub arrival_airport_icao: Option<String>,
    #[serde(default)]
    pub path: Vec<PathSample>,

    #[serde(default, with="chrono::serde::ts_seconds_option")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished: Option<bool>,
}

impl FlightRecord {
    pub fn new (icao24: impl ToString, callsign: Option<String>, departure_airport_icao: Option<String>, path: Vec<PathSample>)->Self {
        FlightRecord {
            icao24: icao24.to_string(),
            callsign,
            departure_airport_icao,
            arrival_airport_icao: None,
            path,
            last_update: None,
            finished: None
        }
    }
}

/// static airport reference data. We only need it to resolve departure airports of flight paths
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct AirportRecord {
    pub icao: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

impl AirportRecord {
    pub fn to_graphic (&self)->Graphic {
        let mut attrs = Attributes::new();
        attrs.insert( "icao".into(), self.icao.as_str().into());
        attrs.insert( "name".into(), self.name.clone().into());
        attrs.insert( "city".into(), self.city.clone().into());
        attrs.insert( "country".into(), self.country.clone().into());
        attrs.insert( "longitude".into(), self.longitude.into());
        attrs.insert( "latitude".into(), self.latitude.into());

        Graphic::point( GeoPoint::new( self.longitude, self.latitude), attrs)
    }
}

/* #region config ****************************************************************************************/

#[derive(Deserialize,Serialize,Debug,Clone)]
#[serde(default)]
pub struct FlightMapConfig {
    pub bucket_count: usize, // fixed for the session
    pub max_features: usize, // cap for the viewport filter (can overshoot by one bucket)
    pub path_update_interval: Duration, // how often we ask for a refreshed path of the selected aircraft
    pub snapshot_mode: ReconcileMode, // viewport changes are always partial

    pub object_layer: String,
    pub path_layer: String,
    pub airport_layer: String,
}

impl Default for FlightMapConfig {
    fn default()->Self {
        FlightMapConfig {
            bucket_count: 128,
            max_features: 200,
            path_update_interval: Duration::from_secs(4),
            snapshot_mode: ReconcileMode::Full,
            object_layer: "aircraft".to_string(),
            path_layer: "traveled_path".to_string(),
            airport_layer: "airports".to_string(),
        }
    }
}

impl FlightMapConfig {
    pub fn check (&self)->Result<()> {
        if self.bucket_count == 0 {
            return Err( errors::OdinFlightMapError::InvalidConfig("bucket_count has to be > 0".into()))
        }
        if self.path_update_interval.is_zero() {
            return Err( errors::OdinFlightMapError::InvalidConfig("path_update_interval has to be > 0".into()))
        }
        Ok(())
    }
}

/// load a RON config from the given path
pub fn load_config<C,P> (path: P)->Result<C> where C: for <'a> Deserialize<'a>, P: AsRef<Path> {
    let data = fs::read( path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}

/* #endregion config */
