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

//! Asynchronous request/response/indication bridge over a QMI-style transport
//!
//! A [TransportClient] owns one logical connection to a service. It correlates responses to
//! requests through a [CallbackTable], fans indications out to listeners registered per event
//! class, and tracks service availability across subsystem restarts.
//!
//! The transport itself sits behind the [Transport] trait; [FfiTransport] adapts a C table of
//! entry points (see the `qmi-sys` crate) to it.

use std::any::Any;

mod client_config;
mod client_factory;
mod error;
mod ffi_transport;
mod listeners;
mod storage;
mod task_queue;
mod transport;
mod transport_client;

/// Correlates an asynchronous request with its completion callback
pub type TransactionId = u32;
/// Never handed out for a stored callback, marks a request without one
pub const INVALID_TRANSACTION_ID: TransactionId = 0;

/// A QMI message id, shared by a request and its response
pub type MessageId = u32;
/// A QMI service id
pub type ServiceId = u16;
/// An instance of a QMI service
pub type InstanceId = u16;

/// Bit position of a family of indications within an [EventMask]
pub type EventClass = u32;
/// Set of [EventClass]es
pub type EventMask = u64;

/// Opaque caller data carried from a request to its response
pub type UserData = Option<Box<dyn Any + Send>>;

pub use client_config::{ClientConfig, ServiceConfig};
pub use client_factory::ClientFactory;
pub use error::{ClientError, ErrorCode, InvokeError, TransportError};
pub use ffi_transport::FfiTransport;
pub use listeners::{IndicationCodec, IndicationListener, ServiceStatus, ServiceStatusListener};
pub use storage::callback_table::{CallbackTable, CommandCallback};
pub use storage::event_listener_registry::{event_classes, EventListenerRegistry};
pub use storage::listener_registry::ListenerRegistry;
pub use task_queue::{DeferredTaskQueue, Task};
pub use transport::{
    AsyncResponse, CorrelationRecord, NotifierHandle, ServiceDescriptor, ServiceEvent, Transport,
    TransportEvents, TransportHandle,
};
pub use transport_client::{
    BoundSession, ClientOptions, ResponseCallback, ServiceState, SessionBinder, TransportClient,
};
