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

//! feed a JSON-lines recording of server messages through the flightmap dispatcher and report
//! what ends up on the layers. Use RUST_LOG=debug to see the individual edits

use std::{path::PathBuf, sync::Arc};
use anyhow::{Result, anyhow};
use clap::Parser;
use tokio::{fs, sync::mpsc};
use tracing_subscriber::EnvFilter;

use odin_flightmap::{
    FlightMapConfig, load_config, KEY_FIELD,
    dispatcher::UpdateDispatcher,
    feature_store::MemFeatureStore,
    projection::WebMercator,
    viewport::BoundingBox,
};

#[derive(Parser,Debug)]
#[command(version, about="replay recorded flightmap messages")]
struct CliOpts {
    /// RON config file (defaults are used if not set)
    #[arg(long)]
    config: Option<PathBuf>,

    /// projected (Web Mercator) viewport as x_min,y_min,x_max,y_max
    #[arg(long, conflicts_with="geo_viewport")]
    viewport: Option<String>,

    /// geographic viewport in degrees as west,south,east,north
    #[arg(long)]
    geo_viewport: Option<String>,

    /// file with one JSON message per line
    messages: PathBuf,
}

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())  // use RUST_LOG to set max level
        .init();

    let opts = CliOpts::parse();

    let config: FlightMapConfig = match &opts.config {
        Some(path) => load_config( path)?,
        None => FlightMapConfig::default()
    };

    let bbox = if let Some(s) = &opts.viewport {
        let [x_min, y_min, x_max, y_max] = parse_quad( s)?;
        BoundingBox::new( x_min, y_min, x_max, y_max)
    } else {
        let [w, s, e, n] = match &opts.geo_viewport {
            Some(s) => parse_quad( s)?,
            None => [-180.0, -85.0, 180.0, 85.0]
        };
        BoundingBox::from_geo_wsen( &WebMercator, w, s, e, n)
    };

    let object_store = Arc::new( MemFeatureStore::new( &config.object_layer));
    let path_store = Arc::new( MemFeatureStore::new( &config.path_layer));
    let airport_store = Arc::new( MemFeatureStore::new( &config.airport_layer));

    let (tx_out, mut rx_out) = mpsc::channel( 64);
    let mut dispatcher = UpdateDispatcher::new( config, WebMercator, object_store.clone(), path_store.clone(), airport_store.clone(), tx_out)?;
    dispatcher.init().await?;
    dispatcher.update_viewport( bbox).await?;

    let input = fs::read_to_string( &opts.messages).await?;
    let mut n_msgs = 0;
    for (i,line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue }

        n_msgs += 1;
        if let Err(e) = dispatcher.handle_json( line).await {
            println!("line {}: {}", i+1, e);
        }
    }
    dispatcher.request_path_update().await?;

    println!("processed {} messages with viewport {}", n_msgs, bbox);
    println!("airports: {}", airport_store.len());

    let keys = object_store.attr_values( KEY_FIELD);
    println!("aircraft ({}): {}", keys.len(), keys.join(","));

    for g in path_store.features() {
        let coords: Vec<String> = g.path_coords().iter().map( |c| format!("({:.4},{:.4})", c.x, c.y)).collect();
        println!("path of {}: {}", g.attr_str(KEY_FIELD).unwrap_or("?"), coords.join(" "));
    }

    while let Ok(msg) = rx_out.try_recv() {
        println!("outbound: {}", msg.to_json()?);
    }

    Ok(())
}

fn parse_quad (s: &str)->Result<[f64;4]> {
    let vs = s.split(',').map( |v| v.trim().parse::<f64>()).collect::<std::result::Result<Vec<f64>,_>>()?;
    match vs.as_slice() {
        [a, b, c, d] => Ok([*a, *b, *c, *d]),
        _ => Err( anyhow!("expected 4 comma separated values, got '{}'", s))
    }
}
