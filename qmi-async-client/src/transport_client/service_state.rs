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

use crate::listeners::ServiceStatus;
use crate::transport::{NotifierHandle, ServiceDescriptor, TransportHandle};
use tokio::sync::oneshot;

/// Where a client stands with its remote service
///
/// `Unavailable` and `Available` may alternate any number of times as the service restarts.
/// `Failed` is only left through an explicit release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Uninitialized,
    Unavailable,
    Available,
    Failed,
}

impl ServiceState {
    /// How a move into this state is reported to status listeners, if at all
    pub fn as_status(self) -> Option<ServiceStatus> {
        match self {
            ServiceState::Uninitialized => None,
            ServiceState::Unavailable => Some(ServiceStatus::Unavailable),
            ServiceState::Available => Some(ServiceStatus::Available),
            ServiceState::Failed => Some(ServiceStatus::Failed),
        }
    }
}

/// Everything guarded by a client's state lock
pub(super) struct Connection {
    pub(super) state: ServiceState,
    pub(super) descriptor: Option<ServiceDescriptor>,
    pub(super) handle: Option<TransportHandle>,
    pub(super) notifier: Option<NotifierHandle>,
    /// Bumped by every init and release; transport events carrying an older value are stale
    pub(super) epoch: u64,
    /// Bumped by every release, lets blocked readiness waiters notice one
    pub(super) releases: u64,
    pub(super) connecting: bool,
    /// The service went away while a connect was still under way
    pub(super) lost_while_connecting: bool,
    /// The service came back while a connect was still under way
    pub(super) arrived_while_connecting: bool,
    pub(super) ready_waiters: Vec<oneshot::Sender<bool>>,
}

impl Connection {
    pub(super) fn new() -> Self {
        Self {
            state: ServiceState::Uninitialized,
            descriptor: None,
            handle: None,
            notifier: None,
            epoch: 0,
            releases: 0,
            connecting: false,
            lost_while_connecting: false,
            arrived_while_connecting: false,
            ready_waiters: Vec::new(),
        }
    }

    pub(super) fn is_current(&self, epoch: u64, handle: TransportHandle) -> bool {
        self.epoch == epoch && self.handle == Some(handle)
    }

    /// Marks a connect attempt as started or finished, forgetting what happened during the
    /// previous one
    pub(super) fn set_connecting(&mut self, connecting: bool) {
        self.connecting = connecting;
        self.lost_while_connecting = false;
        self.arrived_while_connecting = false;
    }

    /// Queues a readiness waiter, dropping those whose future is gone
    pub(super) fn add_ready_waiter(&mut self, waiter: oneshot::Sender<bool>) {
        self.ready_waiters.retain(|waiter| !waiter.is_closed());
        self.ready_waiters.push(waiter);
    }

    pub(super) fn resolve_ready_waiters(&mut self, ready: bool) {
        for waiter in self.ready_waiters.drain(..) {
            // The receiving future may already be gone
            let _ = waiter.send(ready);
        }
    }
}
