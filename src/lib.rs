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
//! Session-level state for a zenoh-like pub/sub/query client: the resource
//! resolver, the subscription registry and sample dispatch, and the
//! pending-query registry with its reply consolidator.
//!
//! This crate has no transport, no wire codec and no key-expression
//! grammar of its own — those live at the edges of a real client. What's
//! here is the part that decides, given a declaration or an incoming
//! sample/reply, what state changes and which callbacks fire, all behind
//! one coarse lock ([`Session`]).
#![forbid(unsafe_code)]

mod error;
mod keyexpr;
mod lock;
mod query;
mod resource;
#[cfg(feature = "subscription")]
mod sample;
mod session;
#[cfg(feature = "subscription")]
mod subscription;
mod timestamp;

pub use error::{Result, SessionError};
pub use keyexpr::{intersects, KeyExpr, KeyExprId, ResourceId};
pub use query::{
    ConsolidationMode, DataInfo, QueryCallback, QueryId, Reply, ReplyContext, ReplyData, ALL_KINDS,
    DATA_INFO_TSTAMP, FLAG_FINAL,
};
pub use session::Session;
pub use timestamp::ReplyTimestamp;

#[cfg(feature = "subscription")]
pub use sample::Sample;
#[cfg(feature = "subscription")]
pub use subscription::{Dropper, SubCallback, SubscriptionId, SubscriptionRecord};
