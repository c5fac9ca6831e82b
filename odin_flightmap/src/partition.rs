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

use crate::{TrackedObject, errors::{OdinFlightMapError, Result}};

/// snapshot objects that share a bucket index, in snapshot order
pub type Bucket = Vec<TrackedObject>;

/// assigns tracked objects to a fixed number of buckets based on a rolling hash of their key.
/// The bucket distribution is what bounds the per-update scan cost of the viewport filter so the
/// hash has to stay reproducible, it is not meant to be strong
#[derive(Debug,Clone,Copy)]
pub struct HashPartitioner {
    bucket_count: usize
}

impl HashPartitioner {
    pub fn new (bucket_count: usize)->Result<Self> {
        if bucket_count == 0 {
            Err( OdinFlightMapError::InvalidConfig("bucket count has to be > 0".into()))
        } else {
            Ok( HashPartitioner { bucket_count })
        }
    }

    pub fn bucket_count (&self)->usize { self.bucket_count }

    pub fn bucket_index (&self, key: &str)->usize {
        bucket_index( key, self.bucket_count)
    }

    /// build a new set of buckets from a snapshot. Objects without a key are dropped
    pub fn partition (&self, objects: Vec<TrackedObject>)->Vec<Bucket> {
        let mut buckets: Vec<Bucket> = vec![Vec::new(); self.bucket_count];
        for o in objects {
            if o.has_key() {
                let idx = self.bucket_index( o.key());
                buckets[idx].push(o);
            }
        }
        buckets
    }
}

/// `h = ((h << 5) - h + c) % n` over the UTF-16 code units of `key`, followed by a final `h % n`.
/// `bucket_count` has to be > 0
pub fn bucket_index (key: &str, bucket_count: usize)->usize {
    let n = bucket_count as i64;
    let mut h: i64 = 0;
    for c in key.encode_utf16() {
        h = ((h << 5) - h + c as i64) % n;
    }
    // the truncating remainder would keep a negative sign
    (h % n).rem_euclid(n) as usize
}

/// the objects of all buckets in bucket order
pub fn flatten (buckets: &[Bucket])->impl Iterator<Item=&TrackedObject> {
    buckets.iter().flat_map( |b| b.iter())
}
