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

use crate::error::ClientError;
use crate::{EventClass, MessageId};

/// Service availability as reported to a [ServiceStatusListener]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceStatus {
    Unavailable,
    Available,
    Failed,
}

/// Observer of a client's service availability
///
/// Called on an internal lifecycle thread, never while any client lock is held.
pub trait ServiceStatusListener: Send + Sync {
    fn on_service_status_change(&self, status: ServiceStatus);
}

/// Observer of decoded indications of one or more event classes
///
/// Called synchronously on the transport's callback thread; an implementation must return
/// quickly and must not block on the client that is delivering to it.
pub trait IndicationListener<I>: Send + Sync {
    fn on_indication(&self, indication: &I);
}

/// Turns a service's raw indications into typed values
pub trait IndicationCodec: Send + Sync + 'static {
    type Indication: Send + 'static;

    /// Event class an indication message belongs to, `None` for ids the service does not use
    fn event_class(&self, message_id: MessageId) -> Option<EventClass>;

    fn decode(&self, message_id: MessageId, payload: &[u8])
        -> Result<Self::Indication, ClientError>;
}
