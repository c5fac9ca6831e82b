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

use std::f64::consts::{PI,FRAC_PI_4};
use geo::Coord;
use crate::GeoPoint;

/// semi major axis in meters (also used as the sphere radius of Web Mercator)
pub const EQUATORIAL_EARTH_RADIUS: f64 = 6378137.0;

/// beyond this the Mercator y coordinate diverges
pub const MAX_MERCATOR_LATITUDE: f64 = 89.99999;

/// conversion between geographic degrees and the projected coordinate space of the rendering surface
pub trait Projector: Send + Sync {
    fn to_projected (&self, p: &GeoPoint)->Coord<f64>;
    fn to_geographic (&self, c: &Coord<f64>)->GeoPoint;
}

/// spherical Web Mercator (EPSG:3857), which is what our map views use as spatial reference
#[derive(Debug,Clone,Copy,Default)]
pub struct WebMercator;

impl Projector for WebMercator {
    fn to_projected (&self, p: &GeoPoint)->Coord<f64> {
        let lat = p.y().clamp( -MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let x = EQUATORIAL_EARTH_RADIUS * p.x().to_radians();
        let y = EQUATORIAL_EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        Coord { x, y }
    }

    fn to_geographic (&self, c: &Coord<f64>)->GeoPoint {
        let lon = (c.x / EQUATORIAL_EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (c.y / EQUATORIAL_EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        GeoPoint::new( lon, lat)
    }
}

/// identity projection for surfaces that work in geographic degrees directly
#[derive(Debug,Clone,Copy,Default)]
pub struct Geographic;

impl Projector for Geographic {
    fn to_projected (&self, p: &GeoPoint)->Coord<f64> { Coord { x: p.x(), y: p.y() } }
    fn to_geographic (&self, c: &Coord<f64>)->GeoPoint { GeoPoint::new( c.x, c.y) }
}

/// round to 2 fractional digits, which is the precision we use for viewport containment tests.
/// This rounds the exact decimal value of `v` (2.675 is stored as 2.67499.. and becomes 2.67), with
/// exact ties going away from zero. Scaling by 100 first would round the already inexact product
pub fn round2 (v: f64)->f64 {
    if (v * 8.0).fract() == 0.0 {
        // odd multiples of 1/8 are the only exact ties, and for them v*100 is exact
        (v * 100.0).round() / 100.0
    } else {
        format!("{:.2}", v).parse().unwrap_or(v)
    }
}
