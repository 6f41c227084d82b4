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

use crate::error::{Result, SessionError};
use crate::keyexpr::{KeyExpr, KeyExprId, ResourceId};

/// Resolves resource ids to full key expression strings.
///
/// Mirrors `SessionState::{local_resources, remote_resources,
/// reskey_to_resname}`: one table per declaration scope, since a given id is
/// only meaningful against the side (local or remote) that minted it.
#[derive(Debug, Default)]
pub(crate) struct ResourceTable {
    local: HashMap<ResourceId, KeyExpr>,
    remote: HashMap<ResourceId, KeyExpr>,
    next_id: ResourceId,
}

impl ResourceTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn table(&self, is_local: bool) -> &HashMap<ResourceId, KeyExpr> {
        if is_local { &self.local } else { &self.remote }
    }

    fn table_mut(&mut self, is_local: bool) -> &mut HashMap<ResourceId, KeyExpr> {
        if is_local { &mut self.local } else { &mut self.remote }
    }

    pub(crate) fn declare(&mut self, is_local: bool, key: KeyExpr) -> ResourceId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.table_mut(is_local).insert(id, key);
        id
    }

    pub(crate) fn undeclare(&mut self, is_local: bool, id: ResourceId) {
        self.table_mut(is_local).remove(&id);
    }

    /// Expands `key` into its full key expression string, recursively
    /// resolving its id chain within the given (local or remote) scope.
    pub(crate) fn expand(&self, is_local: bool, key: &KeyExpr) -> Result<String> {
        match key.id {
            KeyExprId::None => Ok(key.suffix.clone()),
            KeyExprId::Id(id) => {
                let decl = self
                    .table(is_local)
                    .get(&id)
                    .ok_or(SessionError::UnknownKeyExpr { id })?;
                let prefix = self.expand(is_local, decl)?;
                Ok(prefix + &key.suffix)
            }
        }
    }
}
