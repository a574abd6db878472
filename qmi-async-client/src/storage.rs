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

pub mod callback_table;
pub mod event_listener_registry;
pub mod listener_registry;

use crate::listeners::{IndicationListener, ServiceStatusListener};
use crate::storage::callback_table::CallbackTable;
use crate::storage::event_listener_registry::EventListenerRegistry;
use crate::storage::listener_registry::ListenerRegistry;

/// Everything a client keeps on behalf of its callers: outstanding callbacks and listeners
pub struct ClientStorage<I> {
    callbacks: CallbackTable,
    status_listeners: ListenerRegistry<dyn ServiceStatusListener>,
    indication_listeners: EventListenerRegistry<dyn IndicationListener<I>>,
}

impl<I> ClientStorage<I> {
    pub fn new() -> Self {
        Self {
            callbacks: CallbackTable::new(),
            status_listeners: ListenerRegistry::new(),
            indication_listeners: EventListenerRegistry::new(),
        }
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn status_listeners(&self) -> &ListenerRegistry<dyn ServiceStatusListener> {
        &self.status_listeners
    }

    pub fn indication_listeners(&self) -> &EventListenerRegistry<dyn IndicationListener<I>> {
        &self.indication_listeners
    }
}

impl<I> Default for ClientStorage<I> {
    fn default() -> Self {
        Self::new()
    }
}
