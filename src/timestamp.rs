//
// Copyright (c) 2023 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
use std::fmt;

use uhlc::NTP64;

/// A `(time, id)` pair as carried on a data info / reply, per the hybrid
/// logical clock concept the rest of the real project builds on with
/// `uhlc`. `time` is the real `uhlc::NTP64` scalar; `id` is kept as a plain
/// owned byte string rather than `uhlc::ID` since nothing here needs to mint
/// or validate ids, only compare and carry them.
///
/// Ordering and equality deliberately consider `time` only, never `id` — see
/// the crate-level docs for why this is preserved rather than "fixed".
#[derive(Debug, Clone)]
pub struct ReplyTimestamp {
    pub time: NTP64,
    pub id: Vec<u8>,
}

impl ReplyTimestamp {
    pub fn new(time: NTP64, id: Vec<u8>) -> Self {
        ReplyTimestamp { time, id }
    }

    /// The sentinel used when a reply carries no timestamp info: time zero,
    /// empty id. Anything with an actual clock reading supersedes it.
    pub fn reset() -> Self {
        ReplyTimestamp { time: NTP64(0), id: Vec::new() }
    }
}

impl PartialEq for ReplyTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for ReplyTimestamp {}

impl PartialOrd for ReplyTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReplyTimestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time.cmp(&other.time)
    }
}

impl fmt::Display for ReplyTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02x?}", self.time.0, self.id)
    }
}
