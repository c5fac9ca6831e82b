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

use thiserror::Error;

pub type Result<T> = std::result::Result<T,OdinFlightMapError>;

#[derive(Error,Debug)]
pub enum OdinFlightMapError {

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("JSON error {0}")]
    JsonError( #[from] serde_json::Error),

    #[error("config RON error {0}")]
    RonError( #[from] ron::error::SpannedError),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// a second reconciliation pass was attempted while one is still pending for the same layer
    #[error("edit already in flight for layer {0}")]
    EditInFlight(String),

    /// the feature store rejected an add/delete/query
    #[error("feature store error on layer {layer}: {msg}")]
    StoreError { layer: String, msg: String },

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

pub fn store_error (layer: &str, msg: impl ToString)->OdinFlightMapError {
    OdinFlightMapError::StoreError{ layer: layer.to_string(), msg: msg.to_string() }
}

macro_rules! malformed {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::errors::OdinFlightMapError::MalformedMessage( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use malformed;
