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
use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::keyexpr::intersects;
use crate::sample::Sample;

pub type SubscriptionId = u64;

/// A subscriber's data callback. `Sync` because two different publications
/// can be dispatched concurrently by two different threads after each has
/// released the session lock, and both may land on the same subscription.
pub type SubCallback = Arc<dyn Fn(&Sample) + Send + Sync>;

/// A one-shot capability run when a subscription is removed, replacing the
/// C source's `(callback, arg, dropper)` triple with a single closure that
/// owns whatever state it needs to release.
pub type Dropper = Box<dyn FnOnce() + Send>;

/// A registered subscription, shared out by [`SubscriptionRegistry::matching`]
/// as `Arc` clones so callbacks can run after the registry's own borrow (and
/// the session lock) has been released.
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub key_expr: String,
    pub callback: SubCallback,
}

impl std::fmt::Debug for SubscriptionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription{{ id:{}, key_expr:{} }}", self.id, self.key_expr)
    }
}

struct Entry {
    record: Arc<SubscriptionRecord>,
    dropper: Option<Dropper>,
}

#[derive(Default)]
struct Partition {
    entries: HashMap<SubscriptionId, Entry>,
}

impl Partition {
    fn by_id(&self, id: SubscriptionId) -> Option<Arc<SubscriptionRecord>> {
        self.entries.get(&id).map(|e| e.record.clone())
    }

    fn matching(&self, key: &str) -> Vec<Arc<SubscriptionRecord>> {
        self.entries
            .values()
            .filter(|e| intersects(&e.record.key_expr, key))
            .map(|e| e.record.clone())
            .collect()
    }

    fn covers(&self, key: &str) -> bool {
        self.entries.values().any(|e| intersects(&e.record.key_expr, key))
    }

    /// The single removal path: every way a subscription leaves the
    /// registry (an explicit `unregister` or a blanket `flush`) goes through
    /// here, so the dropper always fires exactly once.
    fn remove(&mut self, id: SubscriptionId) {
        if let Some(mut entry) = self.entries.remove(&id) {
            if let Some(dropper) = entry.dropper.take() {
                dropper();
            }
        }
    }

    fn clear(&mut self) {
        let ids: Vec<_> = self.entries.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
    }
}

/// The subscription registry: two partitions (our own subscriptions vs. the
/// remote peer's, mirroring `_Z_RESOURCE_IS_LOCAL`), matched by key
/// expression intersection, dispatched with the session lock released.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    local: Partition,
    remote: Partition,
    next_id: SubscriptionId,
}

impl SubscriptionRegistry {
    fn partition(&self, is_local: bool) -> &Partition {
        if is_local { &self.local } else { &self.remote }
    }

    fn partition_mut(&mut self, is_local: bool) -> &mut Partition {
        if is_local { &mut self.local } else { &mut self.remote }
    }

    pub(crate) fn next_id(&mut self) -> SubscriptionId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Registers a subscription, unless some existing subscription in the
    /// same partition already intersects `key_expr` — in which case nothing
    /// is inserted and `None` is returned, the dropper included (its caller
    /// owns cleanup for a registration that never took effect).
    pub(crate) fn register(
        &mut self,
        is_local: bool,
        id: SubscriptionId,
        key_expr: String,
        callback: SubCallback,
        dropper: Option<Dropper>,
    ) -> Option<SubscriptionId> {
        if self.partition(is_local).covers(&key_expr) {
            trace!("subscription on {key_expr} already covered by an existing one, skipping");
            return None;
        }
        let record = Arc::new(SubscriptionRecord { id, key_expr, callback });
        self.partition_mut(is_local)
            .entries
            .insert(id, Entry { record, dropper });
        Some(id)
    }

    pub(crate) fn by_id(&self, is_local: bool, id: SubscriptionId) -> Option<Arc<SubscriptionRecord>> {
        self.partition(is_local).by_id(id)
    }

    pub(crate) fn matching(&self, is_local: bool, key: &str) -> Vec<Arc<SubscriptionRecord>> {
        self.partition(is_local).matching(key)
    }

    pub(crate) fn unregister(&mut self, is_local: bool, id: SubscriptionId) {
        self.partition_mut(is_local).remove(id);
    }

    pub(crate) fn flush(&mut self) {
        self.local.clear();
        self.remote.clear();
    }
}
