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

use std::{collections::{BTreeMap,HashSet}, fmt};
use serde::{Serialize,Deserialize};
use geo::Coord;

use crate::{
    GeoPoint, partition::Bucket, feature_store::Graphic,
    projection::{Projector, round2}
};

/// the visible extent of the map view in projected coordinates of the rendering surface
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Default)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new (x_min: f64, y_min: f64, x_max: f64, y_max: f64)->Self {
        BoundingBox { x_min, y_min, x_max, y_max }
    }

    /// what we store when the view becomes stationary - extent values are kept with 2 fractional digits
    pub fn from_extent_rounded (x_min: f64, y_min: f64, x_max: f64, y_max: f64)->Self {
        BoundingBox { x_min: round2(x_min), y_min: round2(y_min), x_max: round2(x_max), y_max: round2(y_max) }
    }

    /// project a geographic west/south/east/north rectangle into the surface coordinate space
    pub fn from_geo_wsen (projector: &dyn Projector, west: f64, south: f64, east: f64, north: f64)->Self {
        let sw = projector.to_projected( &GeoPoint::new( west, south));
        let ne = projector.to_projected( &GeoPoint::new( east, north));
        Self::from_extent_rounded( sw.x, sw.y, ne.x, ne.y)
    }

    /// boundary-exclusive containment
    #[inline]
    pub fn contains_strict (&self, c: &Coord<f64>)->bool {
        c.y > self.y_min && c.y < self.y_max && c.x > self.x_min && c.x < self.x_max
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "[{:.2},{:.2} .. {:.2},{:.2}]", self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

/// the objects selected for rendering. `keys` is for cheap membership tests, `graphics` for
/// constructing edits (ordered so that edits are reproducible)
#[derive(Debug,Default,Clone)]
pub struct CandidateSet {
    pub keys: HashSet<String>,
    pub graphics: BTreeMap<String,Graphic>,
}

impl CandidateSet {
    pub fn len (&self)->usize { self.keys.len() }
    pub fn is_empty (&self)->bool { self.keys.is_empty() }
    pub fn contains (&self, key: &str)->bool { self.keys.contains(key) }

    fn insert (&mut self, key: &str, g: Graphic) {
        self.keys.insert( key.to_string());
        self.graphics.insert( key.to_string(), g);
    }
}

pub struct ViewportFilter<P> where P: Projector {
    projector: P,
    max_count: usize,
}

impl<P> ViewportFilter<P> where P: Projector {
    pub fn new (projector: P, max_count: usize)->Self {
        ViewportFilter { projector, max_count }
    }

    pub fn projector (&self)->&P { &self.projector }
    pub fn max_count (&self)->usize { self.max_count }

    /// select the objects that are strictly inside of `bbox`.
    ///
    /// This is an early-exit cap, not a top-N selection: the accepted count is checked before
    /// each bucket and once it exceeds `max_count` all remaining buckets are skipped. The result
    /// can therefore contain up to one bucket worth of objects more than `max_count`, and which
    /// objects are selected depends on bucket and snapshot order
    pub fn select (&self, buckets: &[Bucket], bbox: &BoundingBox)->CandidateSet {
        let mut candidates = CandidateSet::default();
        let mut count: usize = 0;

        for bucket in buckets {
            if count > self.max_count {
                break;
            }

            for o in bucket {
                if let Some(pos) = o.position() {
                    let c = self.projector.to_projected( &pos);
                    let c = Coord { x: round2(c.x), y: round2(c.y) };

                    if bbox.contains_strict( &c) {
                        if let Some(g) = o.to_graphic() {
                            candidates.insert( o.key(), g);
                            count += 1;
                        }
                    }
                }
            }
        }

        candidates
    }
}
