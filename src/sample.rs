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
use crate::timestamp::ReplyTimestamp;

/// A published data sample, handed by reference to every matching
/// subscriber callback. Mirrors `zenoh::net::Sample` (`res_name`, `payload`,
/// `data_info`), flattening `DataInfo`'s timestamp/kind/encoding onto the
/// sample directly since this core has no wire codec to keep them boxed in.
#[derive(Debug, Clone)]
pub struct Sample {
    pub key_expr: String,
    pub payload: Vec<u8>,
    pub encoding: u64,
    pub kind: u64,
    pub timestamp: Option<ReplyTimestamp>,
    #[cfg(feature = "attachment")]
    pub attachment: Option<Vec<u8>>,
}
