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
//! The session's single coarse lock, swapped between a real mutex and a
//! single-threaded stand-in depending on the `multi-thread` feature — the
//! Rust expression of `Z_FEATURE_MULTI_THREAD`.

#[cfg(feature = "multi-thread")]
pub(crate) use threaded::Mutex;

#[cfg(not(feature = "multi-thread"))]
pub(crate) use single::Mutex;

#[cfg(feature = "multi-thread")]
mod threaded {
    use std::sync::{Mutex as StdMutex, MutexGuard};

    pub(crate) struct Mutex<T>(StdMutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Mutex(StdMutex::new(value))
        }

        pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }
}

#[cfg(not(feature = "multi-thread"))]
mod single {
    use std::cell::{RefCell, RefMut};

    /// A single-threaded stand-in for `std::sync::Mutex`: locking never
    /// blocks, and the type stays `!Sync`, so a build with `multi-thread`
    /// disabled cannot accidentally share a `Session` across threads.
    pub(crate) struct Mutex<T>(RefCell<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Mutex(RefCell::new(value))
        }

        pub(crate) fn lock(&self) -> RefMut<'_, T> {
            self.0.borrow_mut()
        }
    }
}
