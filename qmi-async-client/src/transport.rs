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

use crate::error::TransportError;
use crate::{InstanceId, MessageId, ServiceId, TransactionId, UserData};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Names one service endpoint a client talks to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    pub name: String,
    pub service_id: ServiceId,
    pub instance_id: InstanceId,
}

impl ServiceDescriptor {
    pub fn new(name: &str, service_id: ServiceId, instance_id: InstanceId) -> Self {
        Self {
            name: name.to_string(),
            service_id,
            instance_id,
        }
    }
}

/// A connection opened by [Transport::connect]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransportHandle(pub usize);

/// A service watch opened by [Transport::register_notifier]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NotifierHandle(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceEvent {
    ServerArrived,
    ServerRemoved,
}

/// Travels with an asynchronous request through the transport and comes back with its response
pub struct CorrelationRecord {
    transaction_id: TransactionId,
    user_data: UserData,
}

impl CorrelationRecord {
    pub fn new(transaction_id: TransactionId, user_data: UserData) -> Self {
        Self {
            transaction_id,
            user_data,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn into_user_data(self) -> UserData {
        self.user_data
    }
}

impl Debug for CorrelationRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationRecord")
            .field("transaction_id", &self.transaction_id)
            .field("has_user_data", &self.user_data.is_some())
            .finish()
    }
}

/// What the completion callback of an asynchronous request receives
pub struct AsyncResponse {
    pub message_id: MessageId,
    pub payload: Vec<u8>,
    /// Handed back exactly as given to the request
    pub user_data: UserData,
    /// Set when the transport could not complete this one request
    pub transport_error: Option<TransportError>,
}

impl AsyncResponse {
    /// Takes the user data back out as the concrete type it was submitted as
    pub fn take_user_data<T: 'static>(&mut self) -> Option<Box<T>> {
        let user_data = self.user_data.take()?;
        match user_data.downcast::<T>() {
            Ok(value) => Some(value),
            Err(other) => {
                self.user_data = Some(other);
                None
            }
        }
    }
}

impl Debug for AsyncResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResponse")
            .field("message_id", &self.message_id)
            .field("payload_len", &self.payload.len())
            .field("has_user_data", &self.user_data.is_some())
            .field("transport_error", &self.transport_error)
            .finish()
    }
}

/// Callbacks a [Transport] makes into its user
///
/// Calls arrive on transport-owned threads, possibly several at once.
pub trait TransportEvents: Send + Sync {
    fn on_indication(&self, handle: TransportHandle, message_id: MessageId, payload: &[u8]);

    fn on_async_response(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        payload: &[u8],
        record: CorrelationRecord,
        transport_error: Option<TransportError>,
    );

    /// The connection behind `handle` broke
    fn on_error(&self, handle: TransportHandle, error: TransportError);

    fn on_service_event(&self, notifier: NotifierHandle, event: ServiceEvent);
}

/// A message transport to QMI-style services
///
/// After [Transport::release] or [Transport::release_notifier] returns, no further event is
/// delivered for that handle. [Transport::send_async] delivers exactly one
/// [TransportEvents::on_async_response] if and only if it returns `Ok`; on `Err` the record is
/// dropped.
pub trait Transport: Send + Sync {
    fn register_notifier(
        &self,
        service: &ServiceDescriptor,
        events: Arc<dyn TransportEvents>,
    ) -> Result<NotifierHandle, TransportError>;

    fn release_notifier(&self, notifier: NotifierHandle);

    fn connect(
        &self,
        service: &ServiceDescriptor,
        events: Arc<dyn TransportEvents>,
    ) -> Result<TransportHandle, TransportError>;

    fn send_async(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        record: CorrelationRecord,
    ) -> Result<(), TransportError>;

    fn send_sync(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    fn release(&self, handle: TransportHandle);
}
