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

//! the transport messages. The server sends plain JSON arrays that are only distinguished by their
//! shape, we decode them once into [`InboundMsg`] when they come in

use std::fmt;
use serde::ser::{Serialize, Serializer, SerializeSeq};
use serde_json::Value;
use tracing::debug;

use crate::{
    GeoPoint, TrackedObject, FlightRecord, AirportRecord,
    errors::{Result, malformed}
};

pub const AIRPORTS_TAG: &str = "airports";
pub const FLIGHT_TAG: &str = "flight";
pub const PATH_UPDATE_TAG: &str = "path-update";
pub const SELECT_TAG: &str = "icao24";

#[derive(Debug,Clone,PartialEq)]
pub enum InboundMsg {
    /// `[ {TrackedObject}, ... ]` - the complete current set of aircraft
    Snapshot( Vec<TrackedObject> ),

    /// `["airports", metadata, [ {AirportRecord}, ... ]]`
    Airports( Vec<AirportRecord> ),

    /// `[["flight"], {FlightRecord} | null, cursorX, cursorY]` - reply to a selection
    FlightSelected { flight: Option<FlightRecord>, cursor: Option<GeoPoint> },

    /// `["path-update", {FlightRecord}]` - reply to a periodic path-update request
    PathUpdate( FlightRecord ),
}

impl fmt::Display for InboundMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundMsg::Snapshot(objs) => write!( f, "Snapshot( n: {} )", objs.len()),
            InboundMsg::Airports(airports) => write!( f, "Airports( n: {} )", airports.len()),
            InboundMsg::FlightSelected{flight,..} => write!( f, "FlightSelected( {:?} )", flight.as_ref().map( |r| r.icao24.as_str())),
            InboundMsg::PathUpdate(r) => write!( f, "PathUpdate( {} )", r.icao24)
        }
    }
}

impl InboundMsg {
    pub fn from_json (json: &str)->Result<Self> {
        let v: Value = serde_json::from_str( json)?;
        Self::from_value( v)
    }

    pub fn from_value (v: Value)->Result<Self> {
        let Value::Array(elems) = v else {
            return Err( malformed!("message is not an array"))
        };

        match elems.first() {
            None => Ok( InboundMsg::Snapshot( Vec::new())),
            Some(Value::Object(_)) => Ok( InboundMsg::Snapshot( decode_snapshot( elems))),
            Some(Value::String(tag)) if tag == AIRPORTS_TAG => decode_airports( elems),
            Some(Value::String(tag)) if tag == PATH_UPDATE_TAG => decode_path_update( elems),
            Some(Value::Array(tag)) if tag.first().and_then( Value::as_str) == Some(FLIGHT_TAG) => decode_flight_selected( elems),
            Some(other) => Err( malformed!("unknown message tag {}", other))
        }
    }
}

/// records that can't be decoded are dropped, they never invalidate the whole snapshot
fn decode_snapshot (elems: Vec<Value>)->Vec<TrackedObject> {
    let n = elems.len();
    let objs: Vec<TrackedObject> = elems.into_iter().filter_map( |v| serde_json::from_value(v).ok()).collect();
    if objs.len() < n {
        debug!("dropped {} undecodable snapshot records", n - objs.len());
    }
    objs
}

fn decode_airports (elems: Vec<Value>)->Result<InboundMsg> {
    // the airport list is the last element, preceded by optional metadata
    let Some(list) = elems.into_iter().skip(1).last() else {
        return Err( malformed!("airports message without airport list"))
    };
    let airports: Vec<AirportRecord> = serde_json::from_value( list)?;
    Ok( InboundMsg::Airports( airports))
}

fn decode_path_update (elems: Vec<Value>)->Result<InboundMsg> {
    let Some(v) = elems.into_iter().nth(1) else {
        return Err( malformed!("path-update message without flight"))
    };
    Ok( InboundMsg::PathUpdate( serde_json::from_value( v)?))
}

fn decode_flight_selected (elems: Vec<Value>)->Result<InboundMsg> {
    let mut it = elems.into_iter().skip(1);

    let flight: Option<FlightRecord> = match it.next() {
        Some(Value::Null) | None => None,
        Some(v) => Some( serde_json::from_value( v)?)
    };

    let x = it.next().and_then( |v| v.as_f64());
    let y = it.next().and_then( |v| v.as_f64());
    let cursor = match (x,y) {
        (Some(x),Some(y)) => Some( GeoPoint::new( x, y)),
        _ => None
    };

    Ok( InboundMsg::FlightSelected { flight, cursor })
}

/// messages we send back to the server
#[derive(Debug,Clone,PartialEq)]
pub enum OutboundMsg {
    /// `["icao24", key, lon, lat]` - user clicked on an aircraft
    SelectAircraft { icao24: String, position: GeoPoint },

    /// `["path-update", key]` - periodic request for the latest path of the tracked aircraft
    PathUpdate { icao24: String },
}

impl OutboundMsg {
    pub fn to_json (&self)->Result<String> {
        Ok( serde_json::to_string(self)? )
    }
}

impl Serialize for OutboundMsg {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> where S: Serializer {
        match self {
            OutboundMsg::SelectAircraft{icao24,position} => {
                let mut seq = serializer.serialize_seq( Some(4))?;
                seq.serialize_element( SELECT_TAG)?;
                seq.serialize_element( icao24)?;
                seq.serialize_element( &position.x())?;
                seq.serialize_element( &position.y())?;
                seq.end()
            }
            OutboundMsg::PathUpdate{icao24} => {
                let mut seq = serializer.serialize_seq( Some(2))?;
                seq.serialize_element( PATH_UPDATE_TAG)?;
                seq.serialize_element( icao24)?;
                seq.end()
            }
        }
    }
}
