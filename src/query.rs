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
//! The pending-query registry and reply consolidator — the heart of the
//! session core. A query is registered with a consolidation mode, fed zero
//! or more partial replies, and closed out by exactly one final reply.
use std::collections::HashMap;
use std::fmt;

use log::{debug, trace, warn};

use crate::keyexpr::{KeyExpr, KeyExprId};
use crate::resource::ResourceTable;
use crate::timestamp::ReplyTimestamp;

pub type QueryId = u64;

/// Accept any replier kind, regardless of which bits a concrete kind sets.
pub const ALL_KINDS: u64 = u64::MAX;

pub const FLAG_FINAL: u8 = 0b1;
pub const DATA_INFO_TSTAMP: u8 = 0b1;

/// Per-query reply consolidation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidationMode {
    /// No storage: every partial reply is delivered to the callback as soon
    /// as it arrives, verbatim.
    None,
    /// One slot per key, timestamp only: the newest reply per key is
    /// delivered immediately, the payload dropped right after.
    Lazy,
    /// Full buffering: replies are deep-copied and held back until the
    /// final reply, then drained newest-per-key.
    Full,
}

/// A non-final reply's payload.
#[derive(Debug, Clone)]
pub struct ReplyData {
    pub key_expr: String,
    pub payload: Vec<u8>,
    pub replier_id: Vec<u8>,
    pub replier_kind: u64,
}

/// What a query callback actually receives: a data reply, or the terminator.
#[derive(Debug, Clone)]
pub enum Reply {
    Data(ReplyData),
    Final,
}

/// Header bits carried alongside a reply, independent of its payload.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub header_flags: u8,
    pub query_id: QueryId,
    pub replier_id: Vec<u8>,
    pub replier_kind: u64,
}

/// The subset of a data info record this core cares about: whether a
/// timestamp is present, and what it is.
#[derive(Debug, Clone, Default)]
pub struct DataInfo {
    pub flags: u8,
    pub timestamp: Option<ReplyTimestamp>,
}

/// A query's callback. `FnMut` because a single pending query is only ever
/// driven by one reply at a time, serialized by the session lock, so
/// interior mutability inside the closure (e.g. collecting replies into a
/// `Vec`) needs no extra synchronization of its own.
pub type QueryCallback = Box<dyn FnMut(Reply) + Send>;

/// What FULL/LAZY hold onto per key while a query is outstanding. FULL keeps
/// the full reply; LAZY keeps only the timestamp once its callback has run.
struct PendingSlot {
    key_expr: String,
    data: Option<ReplyData>,
    timestamp: ReplyTimestamp,
}

pub(crate) struct PendingQuery {
    pub id: QueryId,
    pub key_expr: String,
    pub predicate: String,
    pub target_kind: u64,
    pub consolidation: ConsolidationMode,
    callback: QueryCallback,
    pending: Vec<PendingSlot>,
}

impl PendingQuery {
    pub fn new(
        id: QueryId,
        key_expr: String,
        predicate: String,
        target_kind: u64,
        consolidation: ConsolidationMode,
        callback: QueryCallback,
    ) -> Self {
        PendingQuery { id, key_expr, predicate, target_kind, consolidation, callback, pending: Vec::new() }
    }

    fn accepts(&self, replier_kind: u64) -> bool {
        self.target_kind == ALL_KINDS || (self.target_kind & replier_kind) != 0
    }
}

impl fmt::Debug for PendingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQuery")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .field("target_kind", &self.target_kind)
            .field("consolidation", &self.consolidation)
            .field("pending_len", &self.pending.len())
            .finish()
    }
}

/// The pending-query registry and reply consolidator.
#[derive(Default)]
pub(crate) struct PendingQueryRegistry {
    queries: HashMap<QueryId, PendingQuery>,
    next_id: QueryId,
}

impl PendingQueryRegistry {
    pub(crate) fn next_query_id(&mut self) -> QueryId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Registers a query, rejecting a `query_id` already in use (the C
    /// source's duplicate check under the session lock).
    pub(crate) fn register(&mut self, query: PendingQuery) -> crate::error::Result<()> {
        if self.queries.contains_key(&query.id) {
            return Err(crate::error::SessionError::DuplicateQueryId { id: query.id });
        }
        self.queries.insert(query.id, query);
        Ok(())
    }

    pub(crate) fn by_id(&self, id: QueryId) -> Option<&PendingQuery> {
        self.queries.get(&id)
    }

    /// Abandons a query without ever invoking its callback: no FINAL is
    /// synthesized, any buffered replies are simply dropped.
    pub(crate) fn unregister(&mut self, id: QueryId) -> Option<PendingQuery> {
        self.queries.remove(&id)
    }

    pub(crate) fn flush(&mut self) {
        self.queries.clear();
    }

    /// Applies one partial reply to the matching pending query, per the
    /// consolidation state machine.
    pub(crate) fn on_partial_reply(
        &mut self,
        resources: &ResourceTable,
        reply_context: &ReplyContext,
        reskey: &KeyExpr,
        payload: &[u8],
        data_info: &DataInfo,
    ) {
        if reply_context.header_flags & FLAG_FINAL != 0 {
            warn!(
                "partial reply for query {} carries the FINAL flag, dropping",
                reply_context.query_id
            );
            return;
        }

        let query = match self.queries.get_mut(&reply_context.query_id) {
            Some(q) => q,
            None => {
                debug!("partial reply for unknown or closed query id {}", reply_context.query_id);
                return;
            }
        };

        if !query.accepts(reply_context.replier_kind) {
            debug!(
                "partial reply from replier kind {} rejected by query {}'s target",
                reply_context.replier_kind, reply_context.query_id
            );
            return;
        }

        let timestamp = if data_info.flags & DATA_INFO_TSTAMP != 0 {
            data_info.timestamp.clone().unwrap_or_else(ReplyTimestamp::reset)
        } else {
            ReplyTimestamp::reset()
        };

        let key = match reskey.id {
            KeyExprId::None => reskey.suffix.clone(),
            KeyExprId::Id(id) => match resources.expand(false, reskey) {
                Ok(expanded) => expanded,
                Err(_) => {
                    debug!("partial reply with unresolvable key expression id {id}");
                    return;
                }
            },
        };

        match query.consolidation {
            ConsolidationMode::None => {
                (query.callback)(Reply::Data(ReplyData {
                    key_expr: key,
                    payload: payload.to_vec(),
                    replier_id: reply_context.replier_id.clone(),
                    replier_kind: reply_context.replier_kind,
                }));
            }
            ConsolidationMode::Lazy => {
                // Supersede-in-place: drop the stored slot for this key and
                // re-push, rather than mutating at its old position.
                if let Some(idx) = query.pending.iter().position(|p| p.key_expr == key) {
                    if timestamp <= query.pending[idx].timestamp {
                        trace!("stale reply for {key} on query {}, dropping", reply_context.query_id);
                        return;
                    }
                    query.pending.remove(idx);
                }
                query.pending.push(PendingSlot { key_expr: key.clone(), data: None, timestamp });
                (query.callback)(Reply::Data(ReplyData {
                    key_expr: key,
                    payload: payload.to_vec(),
                    replier_id: reply_context.replier_id.clone(),
                    replier_kind: reply_context.replier_kind,
                }));
            }
            ConsolidationMode::Full => {
                if let Some(idx) = query.pending.iter().position(|p| p.key_expr == key) {
                    if timestamp <= query.pending[idx].timestamp {
                        trace!("stale reply for {key} on query {}, dropping", reply_context.query_id);
                        return;
                    }
                    query.pending.remove(idx);
                }
                query.pending.push(PendingSlot {
                    key_expr: key.clone(),
                    data: Some(ReplyData {
                        key_expr: key,
                        payload: payload.to_vec(),
                        replier_id: reply_context.replier_id.clone(),
                        replier_kind: reply_context.replier_kind,
                    }),
                    timestamp,
                });
            }
        }
    }

    /// Closes out the query named by `reply_context.query_id`: drains any
    /// buffered FULL replies, then always delivers a synthetic
    /// [`Reply::Final`], then unregisters the query.
    pub(crate) fn on_final_reply(&mut self, reply_context: &ReplyContext) {
        if reply_context.header_flags & FLAG_FINAL == 0 {
            warn!("final reply for query {} missing the FINAL flag, dropping", reply_context.query_id);
            return;
        }

        let accepted = match self.queries.get(&reply_context.query_id) {
            Some(q) => q.accepts(reply_context.replier_kind),
            None => {
                debug!("final reply for unknown or already-closed query id {}", reply_context.query_id);
                return;
            }
        };
        if !accepted {
            debug!(
                "final reply from replier kind {} rejected by query {}'s target",
                reply_context.replier_kind, reply_context.query_id
            );
            return;
        }

        let mut query = self.queries.remove(&reply_context.query_id).expect("checked present above");
        if query.consolidation == ConsolidationMode::Full {
            for slot in query.pending.drain(..) {
                if let Some(data) = slot.data {
                    (query.callback)(Reply::Data(data));
                }
            }
        } else {
            query.pending.clear();
        }
        (query.callback)(Reply::Final);
    }
}
