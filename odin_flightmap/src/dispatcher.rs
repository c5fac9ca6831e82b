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
use tokio::{sync::mpsc, time::{self, MissedTickBehavior}};
use tracing::{debug,info,warn,error};

use crate::{
    FlightMapConfig,
    errors::{OdinFlightMapError, Result},
    feature_store::FeatureStore,
    projection::Projector,
    partition::{Bucket, HashPartitioner},
    viewport::{BoundingBox, ViewportFilter},
    reconcile::{RenderedSet, ReconcileMode, reconcile, next_rendered_set},
    edits::EditApplier,
    flight_path::FlightPathTracker,
    messages::{InboundMsg, OutboundMsg},
};

/// everything the dispatcher reacts to
#[derive(Debug,Clone)]
pub enum FlightMapEvent {
    /// a decoded server message
    Inbound( InboundMsg ),

    /// the map view stopped moving, this is the new (projected) extent
    ViewportStationary( BoundingBox ),

    /// the user clicked on the aircraft `icao24` at the projected `map_point`
    UserSelect { icao24: String, map_point: Coord<f64> },

    Terminate
}

impl fmt::Display for FlightMapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightMapEvent::Inbound(msg) => write!( f, "Inbound( {} )", msg),
            FlightMapEvent::ViewportStationary(bbox) => write!( f, "ViewportStationary( {} )", bbox),
            FlightMapEvent::UserSelect{icao24,..} => write!( f, "UserSelect( {} )", icao24),
            FlightMapEvent::Terminate => write!( f, "Terminate")
        }
    }
}

/// the mutable state of a single viewer session
#[derive(Debug,Default)]
pub struct FlightMapSession {
    pub buckets: Vec<Bucket>,  // from the last snapshot
    pub rendered: RenderedSet, // what is on the object layer
    pub extent: Option<BoundingBox>, // last stationary viewport
}

impl FlightMapSession {
    pub fn n_objects (&self)->usize { self.buckets.iter().map( |b| b.len()).sum() }
}

/// the control loop that turns inbound messages and view events into layer edits.
///
/// Events are processed strictly one at a time, each one including all the store edits it
/// causes. The periodic path refresh runs in the same loop so it never overlaps with an event
pub struct UpdateDispatcher<S,P> where S: FeatureStore, P: Projector {
    config: FlightMapConfig,
    partitioner: HashPartitioner,
    filter: ViewportFilter<P>,

    object_layer: EditApplier<S>,
    airport_layer: EditApplier<S>,
    path_tracker: FlightPathTracker<S>,

    tx_out: mpsc::Sender<OutboundMsg>,
    session: FlightMapSession,
}

impl<S,P> UpdateDispatcher<S,P> where S: FeatureStore + Clone, P: Projector {

    /// the airport store is shared between the airport layer (writer) and the path tracker (origin lookup)
    pub fn new (config: FlightMapConfig, projector: P, object_store: S, path_store: S, airport_store: S, tx_out: mpsc::Sender<OutboundMsg>)->Result<Self> {
        config.check()?;
        let partitioner = HashPartitioner::new( config.bucket_count)?;
        let filter = ViewportFilter::new( projector, config.max_features);

        Ok( UpdateDispatcher {
            partitioner,
            filter,
            object_layer: EditApplier::new( object_store),
            airport_layer: EditApplier::new( airport_store.clone()),
            path_tracker: FlightPathTracker::new( path_store, airport_store),
            tx_out,
            session: FlightMapSession::default(),
            config,
        })
    }

    pub fn config (&self)->&FlightMapConfig { &self.config }
    pub fn session (&self)->&FlightMapSession { &self.session }
    pub fn object_layer (&self)->&EditApplier<S> { &self.object_layer }
    pub fn airport_layer (&self)->&EditApplier<S> { &self.airport_layer }
    pub fn path_tracker (&self)->&FlightPathTracker<S> { &self.path_tracker }

    /// start with empty layers and a fresh session. Layers might hold features of a previous session
    pub async fn init (&mut self)->Result<()> {
        self.session = FlightMapSession::default();
        self.object_layer.apply_removals( Vec::new()).await?;
        self.airport_layer.apply_removals( Vec::new()).await?;
        self.path_tracker.clear().await?;
        info!("flightmap layers initialized");
        Ok(())
    }

    /// process events until we get a `Terminate` or the event channel is closed.
    /// Errors of individual events are logged, they don't terminate the loop
    pub async fn run (&mut self, mut rx: mpsc::Receiver<FlightMapEvent>)->Result<()> {
        self.init().await?;

        let mut timer = time::interval( self.config.path_update_interval);
        timer.set_missed_tick_behavior( MissedTickBehavior::Delay);
        timer.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(FlightMapEvent::Terminate) | None => break,
                        Some(event) => {
                            if let Err(e) = self.handle_event( event).await {
                                error!("event processing failed: {}", e);
                            }
                        }
                    }
                }
                _ = timer.tick() => {
                    if let Err(e) = self.request_path_update().await {
                        error!("path update request failed: {}", e);
                    }
                }
            }
        }

        info!("flightmap dispatcher terminated");
        Ok(())
    }

    pub async fn handle_event (&mut self, event: FlightMapEvent)->Result<()> {
        debug!("processing {}", event);

        match event {
            FlightMapEvent::Inbound(msg) => self.handle_inbound( msg).await,
            FlightMapEvent::ViewportStationary(bbox) => self.update_viewport( bbox).await,
            FlightMapEvent::UserSelect{icao24, map_point} => self.select_aircraft( icao24, map_point).await,
            FlightMapEvent::Terminate => Ok(()) // handled by the run loop
        }
    }

    /// decode a raw transport message and process it
    pub async fn handle_json (&mut self, json: &str)->Result<()> {
        let msg = InboundMsg::from_json( json)?;
        self.handle_inbound( msg).await
    }

    pub async fn handle_inbound (&mut self, msg: InboundMsg)->Result<()> {
        match msg {
            InboundMsg::Snapshot(objects) => {
                self.session.buckets = self.partitioner.partition( objects);
                debug!("new snapshot with {} objects", self.session.n_objects());
                self.render( self.config.snapshot_mode).await
            }
            InboundMsg::Airports(airports) => {
                let graphics = airports.iter().map( |a| a.to_graphic()).collect();
                self.airport_layer.replace_all( graphics).await?;
                Ok(())
            }
            InboundMsg::FlightSelected{flight, cursor} => {
                if flight.is_none() { debug!("no flight for selected aircraft") }
                self.path_tracker.select( flight.as_ref(), cursor).await
            }
            InboundMsg::PathUpdate(flight) => {
                self.path_tracker.update( &flight).await
            }
        }
    }

    /// re-filter the last snapshot for a new extent. Nothing to render before the first snapshot
    pub async fn update_viewport (&mut self, bbox: BoundingBox)->Result<()> {
        let bbox = BoundingBox::from_extent_rounded( bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max);
        self.session.extent = Some(bbox);

        if self.session.buckets.is_empty() {
            Ok(())
        } else {
            self.render( ReconcileMode::Partial).await
        }
    }

    /// clear the current path and ask the server for the flight of the clicked aircraft
    pub async fn select_aircraft (&mut self, icao24: String, map_point: Coord<f64>)->Result<()> {
        self.path_tracker.clear().await?;
        let position = self.filter.projector().to_geographic( &map_point);
        self.send( OutboundMsg::SelectAircraft { icao24, position }).await
    }

    /// if there is a path on the surface ask for a refreshed version of it
    pub async fn request_path_update (&mut self)->Result<()> {
        if let Some(icao24) = self.path_tracker.query_tracked_key().await? {
            self.send( OutboundMsg::PathUpdate { icao24 }).await
        } else {
            Ok(())
        }
    }

    async fn render (&mut self, mode: ReconcileMode)->Result<()> {
        let Some(extent) = self.session.extent else {
            debug!("no viewport yet, skipping render");
            return Ok(())
        };

        let candidates = self.filter.select( &self.session.buckets, &extent);
        if candidates.len() > self.config.max_features {
            debug!("viewport selection of {} exceeds max {}", candidates.len(), self.config.max_features);
        }

        let delta = reconcile( &self.session.rendered, &candidates, mode);
        let materialized = self.object_layer.apply_delta( delta, mode, &mut self.session.rendered).await?;

        // only add the new graphics once the whole pass succeeded
        self.session.rendered = next_rendered_set( &self.session.rendered, &candidates, mode, &materialized);
        Ok(())
    }

    async fn send (&self, msg: OutboundMsg)->Result<()> {
        if self.tx_out.send( msg).await.is_err() {
            warn!("outbound channel closed");
            return Err( OdinFlightMapError::ChannelClosed("outbound".into()))
        }
        Ok(())
    }
}
