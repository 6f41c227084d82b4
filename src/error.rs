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

/// Errors surfaced by the session core.
///
/// Most variants name a protocol anomaly that the dispatch path logs and
/// drops rather than propagates: a reply callback never sees a
/// [`SessionError`], and the session itself never fails because of one.
/// Only [`SessionError::UnknownKeyExpr`] (from `dispatch_sample`) and
/// [`SessionError::DuplicateQueryId`] (from `register_pending_query`) are
/// ever returned to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The resolver could not expand a resource id chain: some id in the
    /// chain has no declaration in the relevant (local or remote) table.
    UnknownKeyExpr { id: u64 },
    /// `register_pending_query` was called with a `query_id` already
    /// present in the registry.
    DuplicateQueryId { id: u64 },
    /// A reply arrived with flags inconsistent with its role: a partial
    /// reply with the FINAL flag set, or a final reply without it.
    ShapeError,
    /// The pending query's `target.kind` does not accept this replier's
    /// kind.
    TargetMismatch { replier_kind: u64 },
    /// A reply referenced a `query_id` with no matching pending query
    /// (already finalized, or abandoned via `unregister`).
    UnknownQueryId { id: u64 },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnknownKeyExpr { id } => write!(f, "unknown key expression id: {id}"),
            SessionError::DuplicateQueryId { id } => {
                write!(f, "duplicate pending query id: {id}")
            }
            SessionError::ShapeError => write!(f, "reply flags inconsistent with its role"),
            SessionError::TargetMismatch { replier_kind } => {
                write!(f, "replier kind {replier_kind} not accepted by query target")
            }
            SessionError::UnknownQueryId { id } => {
                write!(f, "reply for unknown or no-longer-pending query id: {id}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Crate-wide result alias, mirroring the teacher's `ZResult<T>`.
pub type Result<T> = std::result::Result<T, SessionError>;
