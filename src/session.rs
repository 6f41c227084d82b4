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
use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::keyexpr::{KeyExpr, KeyExprId, ResourceId};
use crate::lock::Mutex;
use crate::query::{
    ConsolidationMode, DataInfo, PendingQuery, PendingQueryRegistry, QueryCallback, QueryId,
    ReplyContext,
};
use crate::resource::ResourceTable;
use crate::timestamp::ReplyTimestamp;

#[cfg(feature = "subscription")]
use crate::sample::Sample;
#[cfg(feature = "subscription")]
use crate::subscription::{Dropper, SubCallback, SubscriptionId, SubscriptionRecord, SubscriptionRegistry};

struct Inner {
    resources: ResourceTable,
    #[cfg(feature = "subscription")]
    subs: SubscriptionRegistry,
    queries: PendingQueryRegistry,
}

/// The owning session handle: a resource table, a subscription registry and
/// a pending-query registry, all guarded by one coarse lock.
///
/// A single lock keeps the four pieces of session state (resource tables,
/// subscriptions, pending queries, and their respective id counters)
/// trivially consistent with each other at the cost of serializing unrelated
/// operations — e.g. declaring a resource blocks a concurrent subscription
/// lookup. `dispatch_sample` takes a snapshot of the matching subscriptions
/// and releases the lock *before* invoking any callback, so a subscriber
/// callback that re-enters the session (to declare a new resource, say)
/// cannot deadlock against its own dispatch. Query reply callbacks are the
/// opposite: they run with the lock still held, because LAZY's post-callback
/// cleanup (clearing the stored payload) must observe the callback having
/// already run without another reply racing in between.
pub struct Session {
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new() -> Arc<Session> {
        Arc::new(Session {
            inner: Mutex::new(Inner {
                resources: ResourceTable::new(),
                #[cfg(feature = "subscription")]
                subs: SubscriptionRegistry::default(),
                queries: PendingQueryRegistry::default(),
            }),
        })
    }

    // --- Resources ---

    pub fn declare_resource(&self, is_local: bool, key: KeyExpr) -> ResourceId {
        self.inner.lock().resources.declare(is_local, key)
    }

    pub fn undeclare_resource(&self, is_local: bool, id: ResourceId) {
        self.inner.lock().resources.undeclare(is_local, id)
    }

    /// Expands a key expression to its full string form, consulting the
    /// local or remote resource table according to `is_local`.
    pub fn resolve_key_expr(&self, is_local: bool, key: &KeyExpr) -> Result<String> {
        self.inner.lock().resources.expand(is_local, key)
    }

    // --- Subscriptions ---

    #[cfg(feature = "subscription")]
    pub fn register_subscription(
        &self,
        is_local: bool,
        key_expr: impl Into<String>,
        callback: SubCallback,
        dropper: Option<Dropper>,
    ) -> Option<SubscriptionId> {
        let mut inner = self.inner.lock();
        let id = inner.subs.next_id();
        inner.subs.register(is_local, id, key_expr.into(), callback, dropper)
    }

    #[cfg(feature = "subscription")]
    pub fn unregister_subscription(&self, is_local: bool, id: SubscriptionId) {
        self.inner.lock().subs.unregister(is_local, id);
    }

    #[cfg(feature = "subscription")]
    pub fn subscription_by_id(&self, is_local: bool, id: SubscriptionId) -> Option<Arc<SubscriptionRecord>> {
        self.inner.lock().subs.by_id(is_local, id)
    }

    /// Expands `keyexpr` against the local resource table, snapshots the
    /// matching local subscriptions, releases the lock, then invokes each
    /// callback with the resulting sample.
    #[cfg(feature = "subscription")]
    pub fn dispatch_sample(
        &self,
        keyexpr: &KeyExpr,
        payload: Vec<u8>,
        encoding: u64,
        kind: u64,
        timestamp: Option<ReplyTimestamp>,
        #[cfg_attr(not(feature = "attachment"), allow(unused_variables))] attachment: Option<Vec<u8>>,
    ) -> Result<()> {
        let (expanded, matches) = {
            let mut inner = self.inner.lock();
            let expanded = match keyexpr.id {
                KeyExprId::None => keyexpr.suffix.clone(),
                KeyExprId::Id(_) => inner.resources.expand(true, keyexpr)?,
            };
            let matches = inner.subs.matching(true, &expanded);
            (expanded, matches)
        };
        trace!("dispatching sample on {expanded} to {} subscriber(s)", matches.len());

        let sample = Sample {
            key_expr: expanded,
            payload,
            encoding,
            kind,
            timestamp,
            #[cfg(feature = "attachment")]
            attachment,
        };
        for sub in matches {
            (sub.callback)(&sample);
        }
        Ok(())
    }

    /// No-op when the `subscription` feature is disabled, mirroring the
    /// original's `#else` branch that compiles the dispatch path away
    /// entirely rather than guarding it at runtime.
    #[cfg(not(feature = "subscription"))]
    #[allow(unused_variables, clippy::too_many_arguments)]
    pub fn dispatch_sample(
        &self,
        keyexpr: &KeyExpr,
        payload: Vec<u8>,
        encoding: u64,
        kind: u64,
        timestamp: Option<ReplyTimestamp>,
        attachment: Option<Vec<u8>>,
    ) -> Result<()> {
        Ok(())
    }

    // --- Pending queries ---

    pub fn next_query_id(&self) -> QueryId {
        self.inner.lock().queries.next_query_id()
    }

    pub fn register_pending_query(
        &self,
        id: QueryId,
        key_expr: String,
        predicate: String,
        target_kind: u64,
        consolidation: ConsolidationMode,
        callback: QueryCallback,
    ) -> Result<()> {
        let query = PendingQuery::new(id, key_expr, predicate, target_kind, consolidation, callback);
        self.inner.lock().queries.register(query)
    }

    pub fn unregister_pending_query(&self, id: QueryId) {
        self.inner.lock().queries.unregister(id);
    }

    pub fn on_partial_reply(
        &self,
        reply_context: &ReplyContext,
        reskey: &KeyExpr,
        payload: &[u8],
        data_info: &DataInfo,
    ) {
        let mut inner = self.inner.lock();
        let Inner { resources, queries, .. } = &mut *inner;
        queries.on_partial_reply(resources, reply_context, reskey, payload, data_info);
    }

    pub fn on_final_reply(&self, reply_context: &ReplyContext) {
        self.inner.lock().queries.on_final_reply(reply_context);
    }

    /// Tears down every subscription and abandons every pending query,
    /// invoking subscription droppers but no query callback (see
    /// `PendingQueryRegistry::flush`).
    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        #[cfg(feature = "subscription")]
        inner.subs.flush();
        inner.queries.flush();
    }
}
