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
use crate::storage::listener_registry::listener_key;
use crate::{EventClass, EventMask};
use log::trace;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

const MAX_EVENT_CLASSES: EventClass = EventMask::BITS;

/// Iterates over the [EventClass]es whose bits are set in `mask`
pub fn event_classes(mask: EventMask) -> impl Iterator<Item = EventClass> {
    (0..MAX_EVENT_CLASSES).filter(move |class| mask & (1 << class) != 0)
}

type ClassListeners<T> = BTreeMap<usize, Weak<T>>;

/// Registry of non-owning listener references grouped by event class
///
/// One listener may be registered for several classes at once through an [EventMask]; each
/// class is kept independently, keyed by listener identity, so a listener appears at most
/// once per class. Ordering between listeners of a class is not meaningful.
pub struct EventListenerRegistry<T: ?Sized> {
    classes: Mutex<HashMap<EventClass, ClassListeners<T>>>,
}

impl<T: ?Sized> EventListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            classes: Mutex::new(HashMap::new()),
        }
    }

    /// Adds `listener` to every class set in `mask`
    ///
    /// Classes are independent: one where the listener is already present is left as is.
    pub fn register_listener(&self, listener: Weak<T>, mask: EventMask) -> Result<(), ClientError> {
        if listener.strong_count() == 0 {
            return Err(ClientError::fail_with_code(
                ErrorCode::InvalidParam,
                "Listener has already expired",
            ));
        }

        let key = listener_key(&listener);
        let mut classes = self.classes.lock();
        for class in event_classes(mask) {
            let class_listeners = classes.entry(class).or_default();
            class_listeners.retain(|_, existing| existing.strong_count() > 0);
            if class_listeners.insert(key, listener.clone()).is_some() {
                trace!("register_listener: already registered for class {class}");
            }
        }

        Ok(())
    }

    /// Removes `listener` from every class set in `mask`
    ///
    /// Succeeds if it was removed from at least one of them.
    pub fn deregister_listener(&self, listener: &Weak<T>, mask: EventMask) -> Result<(), ClientError> {
        let key = listener_key(listener);
        let mut removed_any = false;

        let mut classes = self.classes.lock();
        for class in event_classes(mask) {
            let Some(class_listeners) = classes.get_mut(&class) else {
                continue;
            };
            class_listeners.retain(|_, existing| existing.strong_count() > 0);
            removed_any |= class_listeners.remove(&key).is_some();
            if class_listeners.is_empty() {
                classes.remove(&class);
            }
        }

        if removed_any {
            Ok(())
        } else {
            Err(ClientError::fail_with_code(
                ErrorCode::NoSuch,
                format!("Listener is not registered for any class of mask {mask:#x}"),
            ))
        }
    }

    /// Point-in-time copy of the live listeners registered for `class`
    pub fn get_listeners(&self, class: EventClass) -> Vec<Arc<T>> {
        let mut classes = self.classes.lock();
        let Some(class_listeners) = classes.get_mut(&class) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(class_listeners.len());
        class_listeners.retain(|_, existing| match existing.upgrade() {
            Some(listener) => {
                live.push(listener);
                true
            }
            None => false,
        });
        if class_listeners.is_empty() {
            classes.remove(&class);
        }
        live
    }

    /// Mask of the classes that currently have at least one live listener
    pub fn registered_mask(&self) -> EventMask {
        let mut classes = self.classes.lock();
        classes.retain(|_, class_listeners| {
            class_listeners.retain(|_, existing| existing.strong_count() > 0);
            !class_listeners.is_empty()
        });
        classes.keys().fold(0, |mask, class| mask | (1 << *class))
    }
}

impl<T: ?Sized> Default for EventListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
