/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::error::{ClientError, ErrorCode};
use log::trace;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Address of the allocation a [Weak] points into, used as listener identity
///
/// A held [Weak] keeps the allocation reserved, so the address cannot be handed to another
/// object while the entry holding it exists.
pub(crate) fn listener_key<T: ?Sized>(listener: &Weak<T>) -> usize {
    Weak::as_ptr(listener) as *const () as usize
}

/// Registry of non-owning references to listeners, kept in registration order
///
/// Expired entries are not removed when their listener is dropped but on the next access
/// of the registry.
pub struct ListenerRegistry<T: ?Sized> {
    listeners: Mutex<Vec<Weak<T>>>,
}

impl<T: ?Sized> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Adds `listener`
    ///
    /// Fails with [ErrorCode::InvalidParam] if it has already expired and with
    /// [ErrorCode::Already] if the same live listener is registered.
    pub fn register_listener(&self, listener: Weak<T>) -> Result<(), ClientError> {
        if listener.strong_count() == 0 {
            return Err(ClientError::fail_with_code(
                ErrorCode::InvalidParam,
                "Listener has already expired",
            ));
        }

        let key = listener_key(&listener);
        let mut listeners = self.listeners.lock();
        listeners.retain(|existing| existing.strong_count() > 0);

        if listeners.iter().any(|existing| listener_key(existing) == key) {
            return Err(ClientError::fail_with_code(
                ErrorCode::Already,
                "Listener is already registered",
            ));
        }

        listeners.push(listener);
        trace!("register_listener: now {} listeners", listeners.len());
        Ok(())
    }

    /// Removes `listener`, pruning any expired entries met along the way
    pub fn deregister_listener(&self, listener: &Weak<T>) -> Result<(), ClientError> {
        let key = listener_key(listener);
        let mut found = false;

        self.listeners.lock().retain(|existing| {
            if existing.strong_count() == 0 {
                return false;
            }
            if listener_key(existing) == key {
                found = true;
                return false;
            }
            true
        });

        if found {
            Ok(())
        } else {
            Err(ClientError::fail_with_code(
                ErrorCode::NoSuch,
                "Listener is not registered",
            ))
        }
    }

    /// Point-in-time copy of the live listeners
    ///
    /// A returned listener may be the last strong reference keeping its object alive once the
    /// subscriber lets go; callers get best-effort delivery, not a liveness guarantee.
    pub fn get_listeners(&self) -> Vec<Arc<T>> {
        let mut live = Vec::new();
        self.listeners.lock().retain(|existing| match existing.upgrade() {
            Some(listener) => {
                live.push(listener);
                true
            }
            None => false,
        });
        live
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|existing| existing.strong_count() > 0);
        listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Probe: Send + Sync {
        fn name(&self) -> &str;
    }

    struct NamedProbe(&'static str);

    impl Probe for NamedProbe {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn probe(name: &'static str) -> Arc<dyn Probe> {
        Arc::new(NamedProbe(name))
    }

    fn names(registry: &ListenerRegistry<dyn Probe>) -> Vec<String> {
        registry
            .get_listeners()
            .iter()
            .map(|l| l.name().to_string())
            .collect()
    }

    #[test]
    fn test_register_twice_is_already() {
        let registry = ListenerRegistry::<dyn Probe>::new();
        let a = probe("a");

        assert!(registry.register_listener(Arc::downgrade(&a)).is_ok());
        let err = registry.register_listener(Arc::downgrade(&a)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Already);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_expired_is_invalid_param() {
        let registry = ListenerRegistry::<dyn Probe>::new();
        let a = probe("a");
        let weak = Arc::downgrade(&a);
        drop(a);

        let err = registry.register_listener(weak).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParam);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_deregistered_listener_is_not_returned() {
        let registry = ListenerRegistry::<dyn Probe>::new();
        let a = probe("a");
        let b = probe("b");
        registry.register_listener(Arc::downgrade(&a)).unwrap();
        registry.register_listener(Arc::downgrade(&b)).unwrap();

        assert!(registry.deregister_listener(&Arc::downgrade(&a)).is_ok());
        assert_eq!(names(&registry), vec!["b"]);

        let err = registry
            .deregister_listener(&Arc::downgrade(&a))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoSuch);
    }

    #[test]
    fn test_dropped_listener_is_pruned_lazily() {
        let registry = ListenerRegistry::<dyn Probe>::new();
        let a = probe("a");
        let b = probe("b");
        registry.register_listener(Arc::downgrade(&a)).unwrap();
        registry.register_listener(Arc::downgrade(&b)).unwrap();

        drop(a);
        assert_eq!(registry.listeners.lock().len(), 2);
        assert_eq!(names(&registry), vec!["b"]);
        assert_eq!(registry.listeners.lock().len(), 1);
    }

    #[test]
    fn test_deregister_prunes_dead_entries_even_when_target_missing() {
        let registry = ListenerRegistry::<dyn Probe>::new();
        let a = probe("a");
        let stranger = probe("stranger");
        registry.register_listener(Arc::downgrade(&a)).unwrap();
        drop(a);

        assert!(registry
            .deregister_listener(&Arc::downgrade(&stranger))
            .is_err());
        assert!(registry.listeners.lock().is_empty());
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ListenerRegistry::<dyn Probe>::new();
        let probes: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(probe)
            .collect();
        for p in &probes {
            registry.register_listener(Arc::downgrade(p)).unwrap();
        }

        assert_eq!(names(&registry), vec!["first", "second", "third"]);
    }
}
