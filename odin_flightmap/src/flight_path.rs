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

use std::fmt;
use geo::Coord;
use tracing::{debug,warn};

use crate::{
    GeoPoint, FlightRecord, KEY_FIELD,
    feature_store::{Attributes, FeatureQuery, FeatureStore, Graphic},
    edits::EditApplier,
    errors::Result
};

/// the traveled path of the selected aircraft
#[derive(Debug,Clone,PartialEq)]
pub struct FlightPath {
    pub icao24: String,
    pub callsign: Option<String>,
    pub coords: Vec<Coord<f64>>, // lon/lat degrees, oldest first
}

impl FlightPath {
    pub fn to_graphic (&self)->Graphic {
        let mut attrs = Attributes::new();
        attrs.insert( KEY_FIELD.into(), self.icao24.as_str().into());
        attrs.insert( "callsign".into(), self.callsign.clone().into());
        Graphic::polyline( self.coords.clone(), attrs)
    }
}

impl fmt::Display for FlightPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "FlightPath( icao24: {}, n_points: {})", self.icao24, self.coords.len())
    }
}

/// maintains the path layer, which holds at most one polyline feature for the currently selected
/// aircraft. Each update clears the layer and adds the rebuilt path, which keeps the layer free of
/// races at the cost of a full redraw (path updates are periodic, not per frame)
pub struct FlightPathTracker<S> where S: FeatureStore {
    path_layer: EditApplier<S>,
    airport_layer: S, // only queried
    current: Option<FlightPath>,
}

impl<S> FlightPathTracker<S> where S: FeatureStore {
    pub fn new (path_layer: S, airport_layer: S)->Self {
        FlightPathTracker { path_layer: EditApplier::new(path_layer), airport_layer, current: None }
    }

    pub fn path_layer (&self)->&EditApplier<S> { &self.path_layer }

    pub fn current (&self)->Option<&FlightPath> { self.current.as_ref() }

    pub fn selected_key (&self)->Option<&str> { self.current.as_ref().map( |p| p.icao24.as_str()) }

    /// a new aircraft was selected. A `None` record (unknown flight) leaves everything as it is
    pub async fn select (&mut self, selected: Option<&FlightRecord>, cursor: Option<GeoPoint>)->Result<()> {
        self.render_path( selected, cursor).await
    }

    /// a refreshed flight record for the selected aircraft arrived. This is ignored if there is no
    /// selection or if the record is for a different aircraft (stale reply)
    pub async fn update (&mut self, record: &FlightRecord)->Result<()> {
        match self.selected_key().map( |k| k.to_string()) {
            Some(key) if key == record.icao24 => self.render_path( Some(record), None).await,
            Some(key) => {
                warn!("ignoring path update for {} while {} is selected", record.icao24, key);
                Ok(())
            }
            None => Ok(())
        }
    }

    /// drop the selection and clear the path layer
    pub async fn clear (&mut self)->Result<()> {
        self.current = None;
        self.path_layer.replace_all( Vec::new()).await?;
        Ok(())
    }

    /// rebuild the path of `selected` and replace the path layer contents with it
    pub async fn render_path (&mut self, selected: Option<&FlightRecord>, cursor: Option<GeoPoint>)->Result<()> {
        let Some(flight) = selected else { return Ok(()) };

        let mut coords: Vec<Coord<f64>> = Vec::with_capacity( flight.path.len() + 2);

        if let Some(origin) = &flight.departure_airport_icao {
            if let Some(c) = self.resolve_airport( origin).await? {
                coords.push(c);
            }
        }

        for sample in &flight.path {
            if let Some(p) = sample.position() {
                coords.push( p.0);
            }
        }

        if let Some(p) = cursor {
            coords.push( p.0);
        }

        let path = FlightPath { icao24: flight.icao24.clone(), callsign: flight.callsign.clone(), coords };
        debug!("rendering {}", path);

        // an empty path does not contribute a segment, we still clear whatever was shown before
        let graphics = if path.coords.is_empty() { Vec::new() } else { vec![ path.to_graphic() ] };
        self.current = Some(path);
        self.path_layer.replace_all( graphics).await?;
        Ok(())
    }

    /// the key of the path feature that is currently on the surface (if any)
    pub async fn query_tracked_key (&self)->Result<Option<String>> {
        let features = self.path_layer.store().query_features( FeatureQuery::All).await?;
        Ok( features.first().and_then( |g| g.attr_str(KEY_FIELD)).map( |s| s.to_string()))
    }

    async fn resolve_airport (&self, icao: &str)->Result<Option<Coord<f64>>> {
        let features = self.airport_layer.query_features( FeatureQuery::where_eq( "icao", icao)).await?;

        Ok( features.first().and_then( |g| {
            match (g.attr_f64("longitude"), g.attr_f64("latitude")) {
                (Some(x),Some(y)) => Some( Coord { x, y }),
                _ => None
            }
        }))
    }
}
