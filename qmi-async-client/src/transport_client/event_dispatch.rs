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

use super::{ClientInner, QMI_CLIENT_TAG};
use crate::error::TransportError;
use crate::listeners::IndicationCodec;
use crate::storage::callback_table::{panic_message, CallbackTable};
use crate::transport::{
    AsyncResponse, CorrelationRecord, NotifierHandle, ServiceEvent, TransportEvents,
    TransportHandle,
};
use crate::{MessageId, INVALID_TRANSACTION_ID};
use log::{debug, error, trace, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

const QMI_CLIENT_FN_INDICATION_TAG: &str = "indication_handler";
const QMI_CLIENT_FN_ASYNC_RESPONSE_TAG: &str = "async_response_handler";
const QMI_CLIENT_FN_ERROR_TAG: &str = "error_handler";
const QMI_CLIENT_FN_NOTIFIER_TAG: &str = "notifier_handler";

/// Receives transport events for one init of a client
///
/// Holds the client weakly, so a transport keeping its events alive does not keep the client
/// alive. Events are tagged with the epoch of the init that registered them.
pub(super) struct ClientEventSink<C: IndicationCodec> {
    pub(super) inner: Weak<ClientInner<C>>,
    pub(super) epoch: u64,
}

impl<C: IndicationCodec> TransportEvents for ClientEventSink<C> {
    fn on_indication(&self, handle: TransportHandle, message_id: MessageId, payload: &[u8]) {
        let Some(inner) = self.inner.upgrade() else {
            trace!(
                "{}:{} - client is gone, dropping indication {message_id:#06x}",
                QMI_CLIENT_TAG,
                QMI_CLIENT_FN_INDICATION_TAG
            );
            return;
        };
        inner.handle_indication(self.epoch, handle, message_id, payload);
    }

    fn on_async_response(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        payload: &[u8],
        record: CorrelationRecord,
        transport_error: Option<TransportError>,
    ) {
        let Some(inner) = self.inner.upgrade() else {
            trace!(
                "{}:{} - client is gone, dropping response {message_id:#06x}",
                QMI_CLIENT_TAG,
                QMI_CLIENT_FN_ASYNC_RESPONSE_TAG
            );
            return;
        };
        inner.handle_async_response(handle, message_id, payload, record, transport_error);
    }

    fn on_error(&self, handle: TransportHandle, transport_error: TransportError) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        debug!(
            "{}:{} - {handle:?}: {transport_error}",
            QMI_CLIENT_TAG, QMI_CLIENT_FN_ERROR_TAG
        );

        let epoch = self.epoch;
        inner.spawn_lifecycle("error", move |inner| {
            inner.connection_lost(epoch, Some(handle), Some(transport_error));
        });
    }

    fn on_service_event(&self, notifier: NotifierHandle, event: ServiceEvent) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        debug!(
            "{}:{} - {notifier:?}: {event:?}",
            QMI_CLIENT_TAG, QMI_CLIENT_FN_NOTIFIER_TAG
        );

        let epoch = self.epoch;
        match event {
            ServiceEvent::ServerRemoved => inner.spawn_lifecycle("removed", move |inner| {
                inner.connection_lost(epoch, None, None);
            }),
            ServiceEvent::ServerArrived => inner.spawn_lifecycle("arrived", move |inner| {
                inner.connect_and_bind(epoch);
            }),
        }
    }
}

impl<C: IndicationCodec> ClientInner<C> {
    /// Decodes an indication and hands it to the listeners of its event class
    ///
    /// Runs on the transport's thread.
    pub(super) fn handle_indication(
        &self,
        epoch: u64,
        handle: TransportHandle,
        message_id: MessageId,
        payload: &[u8],
    ) {
        if !self.connection.lock().is_current(epoch, handle) {
            trace!(
                "{}:{} - {handle:?} is not the current connection, dropping {message_id:#06x}",
                QMI_CLIENT_TAG,
                QMI_CLIENT_FN_INDICATION_TAG
            );
            return;
        }

        let Some(event_class) = self.codec.event_class(message_id) else {
            warn!(
                "{}:{} - no event class for indication {message_id:#06x}",
                QMI_CLIENT_TAG, QMI_CLIENT_FN_INDICATION_TAG
            );
            return;
        };

        let indication = match self.codec.decode(message_id, payload) {
            Ok(indication) => indication,
            Err(err) => {
                error!(
                    "{}:{} - unable to decode indication {message_id:#06x}: {err}",
                    QMI_CLIENT_TAG, QMI_CLIENT_FN_INDICATION_TAG
                );
                return;
            }
        };

        let listeners = self
            .storage
            .indication_listeners()
            .get_listeners(event_class);
        trace!(
            "{}:{} - {message_id:#06x} to {} listeners of class {event_class}",
            QMI_CLIENT_TAG,
            QMI_CLIENT_FN_INDICATION_TAG,
            listeners.len()
        );

        for listener in listeners {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_indication(&indication)));
            if let Err(payload) = delivered {
                error!(
                    "{}:{} - listener panicked: {}",
                    QMI_CLIENT_TAG,
                    QMI_CLIENT_FN_INDICATION_TAG,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Completes the request `record` belongs to, at most once
    pub(super) fn handle_async_response(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        payload: &[u8],
        record: CorrelationRecord,
        transport_error: Option<TransportError>,
    ) {
        let transaction_id = record.transaction_id();
        if transaction_id == INVALID_TRANSACTION_ID {
            trace!(
                "{}:{} - {message_id:#06x} on {handle:?} had no callback",
                QMI_CLIENT_TAG,
                QMI_CLIENT_FN_ASYNC_RESPONSE_TAG
            );
            return;
        }

        let Some(callback) = self
            .storage
            .callbacks()
            .find_and_remove_callback(transaction_id)
        else {
            warn!(
                "{}:{} - no callback for transaction {transaction_id}, dropping {message_id:#06x}",
                QMI_CLIENT_TAG, QMI_CLIENT_FN_ASYNC_RESPONSE_TAG
            );
            return;
        };

        let response = AsyncResponse {
            message_id,
            payload: payload.to_vec(),
            user_data: record.into_user_data(),
            transport_error,
        };
        // Failures are logged by the table
        let _ = CallbackTable::execute_callback(Some(callback), response);
    }
}

impl<C: IndicationCodec> ClientInner<C> {
    pub(super) fn event_sink(self: &Arc<Self>, epoch: u64) -> Arc<dyn TransportEvents> {
        Arc::new(ClientEventSink {
            inner: Arc::downgrade(self),
            epoch,
        })
    }
}
