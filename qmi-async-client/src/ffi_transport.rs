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
use crate::storage::callback_table::panic_message;
use crate::transport::{
    CorrelationRecord, NotifierHandle, ServiceDescriptor, ServiceEvent, Transport,
    TransportEvents, TransportHandle,
};
use crate::MessageId;
use log::{error, trace, warn};
use parking_lot::Mutex;
use qmi_sys::*;
use std::collections::HashMap;
use std::os::raw::{c_uint, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;
use std::sync::Arc;
use std::time::Duration;

const FFI_TRANSPORT_TAG: &str = "FfiTransport";
const FFI_TRANSPORT_FN_INDICATION_TAG: &str = "indication_trampoline";
const FFI_TRANSPORT_FN_RESPONSE_TAG: &str = "async_response_trampoline";
const FFI_TRANSPORT_FN_ERROR_TAG: &str = "error_trampoline";
const FFI_TRANSPORT_FN_NOTIFY_TAG: &str = "notify_trampoline";

/// Where the trampolines of one connection or notifier deliver to
///
/// Its address is the user data registered with the platform. The owning map keeps it alive
/// until the handle is released.
struct EventsContext {
    events: Arc<dyn TransportEvents>,
}

/// User data of one asynchronous request, reclaimed exactly once
struct AsyncResponseContext {
    events: Arc<dyn TransportEvents>,
    record: CorrelationRecord,
}

/// A [Transport] over a platform's C table of QMI entry points
pub struct FfiTransport {
    ops: qmi_transport_ops,
    connections: Mutex<HashMap<TransportHandle, Arc<EventsContext>>>,
    notifiers: Mutex<HashMap<NotifierHandle, Arc<EventsContext>>>,
}

// SAFETY: the entry points of `ops` may be called from any thread and `ops.ctx` is only ever
// handed back to them; all other state is behind locks
unsafe impl Send for FfiTransport {}
unsafe impl Sync for FfiTransport {}

impl FfiTransport {
    /// # Safety
    ///
    /// Every entry point in `ops` must honor the contract documented on [qmi_transport_ops]
    /// for as long as the returned transport exists, and `ops.ctx` must stay valid as long.
    pub unsafe fn new(ops: qmi_transport_ops) -> Self {
        Self {
            ops,
            connections: Mutex::new(HashMap::new()),
            notifiers: Mutex::new(HashMap::new()),
        }
    }

    fn service_info(service: &ServiceDescriptor) -> qmi_service_info {
        qmi_service_info {
            service_id: c_uint::from(service.service_id),
            instance_id: c_uint::from(service.instance_id),
        }
    }

    fn check(code: qmi_client_error_type) -> Result<(), TransportError> {
        match TransportError::from_raw(code) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn buffer_len(len: usize) -> Result<c_uint, TransportError> {
        c_uint::try_from(len).map_err(|_| TransportError::InvalidParam)
    }

    fn events_of(&self, handle: TransportHandle) -> Result<Arc<dyn TransportEvents>, TransportError> {
        self.connections
            .lock()
            .get(&handle)
            .map(|context| context.events.clone())
            .ok_or(TransportError::InvalidClient)
    }
}

impl Transport for FfiTransport {
    fn register_notifier(
        &self,
        service: &ServiceDescriptor,
        events: Arc<dyn TransportEvents>,
    ) -> Result<NotifierHandle, TransportError> {
        let context = Arc::new(EventsContext { events });
        let info = Self::service_info(service);
        let mut notifier: qmi_notifier_type = ptr::null_mut();

        // SAFETY: `info` and `notifier` outlive the call; `context` is kept alive by this frame
        // until it moves into the map
        Self::check(unsafe {
            (self.ops.notifier_init)(
                self.ops.ctx,
                &info,
                notify_trampoline,
                Arc::as_ptr(&context) as *mut c_void,
                &mut notifier,
            )
        })?;

        let handle = NotifierHandle(notifier as usize);
        self.notifiers.lock().insert(handle, context);
        trace!("{}:register_notifier - {handle:?}", FFI_TRANSPORT_TAG);
        Ok(handle)
    }

    fn release_notifier(&self, notifier: NotifierHandle) {
        // Taken out before the platform call, which may hand the same value out again
        let Some(context) = self.notifiers.lock().remove(&notifier) else {
            return;
        };
        // SAFETY: only handles produced by `notifier_init` are in the map
        let code =
            unsafe { (self.ops.notifier_release)(self.ops.ctx, notifier.0 as qmi_notifier_type) };
        if let Err(err) = Self::check(code) {
            warn!("{}:release_notifier - {notifier:?}: {err}", FFI_TRANSPORT_TAG);
        }
        // No notification arrives any more, the context can go
        drop(context);
    }

    fn connect(
        &self,
        service: &ServiceDescriptor,
        events: Arc<dyn TransportEvents>,
    ) -> Result<TransportHandle, TransportError> {
        let context = Arc::new(EventsContext { events });
        let context_ptr = Arc::as_ptr(&context) as *mut c_void;
        let info = Self::service_info(service);
        let mut client: qmi_client_type = ptr::null_mut();

        // SAFETY: `info` and `client` outlive the call; `context` is kept alive by this frame
        // until it moves into the map
        Self::check(unsafe {
            (self.ops.client_init)(
                self.ops.ctx,
                &info,
                indication_trampoline,
                context_ptr,
                &mut client,
            )
        })?;

        // SAFETY: `client` was just produced by `client_init`
        let registered = Self::check(unsafe {
            (self.ops.register_error_cb)(self.ops.ctx, client, error_trampoline, context_ptr)
        });
        if let Err(err) = registered {
            // SAFETY: as above; no callback is made once this returns
            unsafe { (self.ops.client_release)(self.ops.ctx, client) };
            return Err(err);
        }

        let handle = TransportHandle(client as usize);
        self.connections.lock().insert(handle, context);
        trace!(
            "{}:connect - {} connected as {handle:?}",
            FFI_TRANSPORT_TAG,
            service.name
        );
        Ok(handle)
    }

    fn send_async(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        record: CorrelationRecord,
    ) -> Result<(), TransportError> {
        let events = self.events_of(handle)?;
        let request_len = Self::buffer_len(request.len())?;
        let response_len = Self::buffer_len(max_response_len)?;

        let context = Box::into_raw(Box::new(AsyncResponseContext { events, record }));

        // SAFETY: the request buffer outlives the call; `context` is reclaimed by the
        // trampoline if and only if the call succeeds
        let code = unsafe {
            (self.ops.send_msg_async)(
                self.ops.ctx,
                handle.0 as qmi_client_type,
                message_id,
                request.as_ptr(),
                request_len,
                response_len,
                async_response_trampoline,
                context as *mut c_void,
            )
        };

        if let Err(err) = Self::check(code) {
            // SAFETY: the transport rejected the request and will never call back with it
            drop(unsafe { Box::from_raw(context) });
            return Err(err);
        }
        Ok(())
    }

    fn send_sync(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let request_len = Self::buffer_len(request.len())?;
        let response_len = Self::buffer_len(max_response_len)?;
        let timeout_msecs = c_uint::try_from(timeout.as_millis()).unwrap_or(c_uint::MAX);

        let mut response = vec![0u8; max_response_len];
        let mut written: c_uint = 0;

        // SAFETY: both buffers and `written` outlive the call, `response` holds
        // `response_len` bytes
        Self::check(unsafe {
            (self.ops.send_msg_sync)(
                self.ops.ctx,
                handle.0 as qmi_client_type,
                message_id,
                request.as_ptr(),
                request_len,
                response.as_mut_ptr(),
                response_len,
                &mut written,
                timeout_msecs,
            )
        })?;

        response.truncate((written as usize).min(max_response_len));
        Ok(response)
    }

    fn release(&self, handle: TransportHandle) {
        // Taken out before the platform call, which may hand the same value out again
        let Some(context) = self.connections.lock().remove(&handle) else {
            return;
        };
        // SAFETY: only handles produced by `client_init` are in the map
        let code = unsafe { (self.ops.client_release)(self.ops.ctx, handle.0 as qmi_client_type) };
        if let Err(err) = Self::check(code) {
            warn!("{}:release - {handle:?}: {err}", FFI_TRANSPORT_TAG);
        }
        drop(context);
    }
}

/// Views a transport-owned buffer, empty for a null pointer
///
/// # Safety
///
/// A non-null `buf` must point to `len` readable bytes for the returned lifetime.
unsafe fn raw_slice<'a>(buf: *const u8, len: c_uint) -> &'a [u8] {
    if buf.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(buf, len as usize)
    }
}

fn guarded<F: FnOnce()>(tag: &str, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!(
            "{}:{} - panic stopped at the C boundary: {}",
            FFI_TRANSPORT_TAG,
            tag,
            panic_message(payload.as_ref())
        );
    }
}

extern "C" fn indication_trampoline(
    user_handle: qmi_client_type,
    msg_id: c_uint,
    ind_buf: *const u8,
    ind_buf_len: c_uint,
    ind_cb_data: *mut c_void,
) {
    if ind_cb_data.is_null() {
        return;
    }
    guarded(FFI_TRANSPORT_FN_INDICATION_TAG, || {
        // SAFETY: registered as the address of an `EventsContext` that lives until the client
        // is released, and the buffer is valid for the duration of the callback
        let context = unsafe { &*(ind_cb_data as *const EventsContext) };
        let payload = unsafe { raw_slice(ind_buf, ind_buf_len) };
        context
            .events
            .on_indication(TransportHandle(user_handle as usize), msg_id, payload);
    });
}

extern "C" fn async_response_trampoline(
    user_handle: qmi_client_type,
    msg_id: c_uint,
    resp_buf: *const u8,
    resp_buf_len: c_uint,
    resp_cb_data: *mut c_void,
    transp_err: qmi_client_error_type,
) {
    if resp_cb_data.is_null() {
        return;
    }
    // SAFETY: produced by `Box::into_raw` in `send_async` and handed back exactly once
    let context = unsafe { Box::from_raw(resp_cb_data as *mut AsyncResponseContext) };
    guarded(FFI_TRANSPORT_FN_RESPONSE_TAG, move || {
        let AsyncResponseContext { events, record } = *context;
        // SAFETY: the buffer is valid for the duration of the callback
        let payload = unsafe { raw_slice(resp_buf, resp_buf_len) };
        events.on_async_response(
            TransportHandle(user_handle as usize),
            msg_id,
            payload,
            record,
            TransportError::from_raw(transp_err),
        );
    });
}

extern "C" fn error_trampoline(
    user_handle: qmi_client_type,
    error: qmi_client_error_type,
    err_cb_data: *mut c_void,
) {
    if err_cb_data.is_null() {
        return;
    }
    guarded(FFI_TRANSPORT_FN_ERROR_TAG, || {
        // SAFETY: same context as the indication callback of this client
        let context = unsafe { &*(err_cb_data as *const EventsContext) };
        let transport_error =
            TransportError::from_raw(error).unwrap_or(TransportError::ServiceError);
        context
            .events
            .on_error(TransportHandle(user_handle as usize), transport_error);
    });
}

extern "C" fn notify_trampoline(
    notifier: qmi_notifier_type,
    event: qmi_client_notify_event_type,
    notify_cb_data: *mut c_void,
) {
    if notify_cb_data.is_null() {
        return;
    }
    let service_event = match event {
        QMI_CLIENT_SERVICE_COUNT_INC => ServiceEvent::ServerArrived,
        QMI_CLIENT_SERVICE_COUNT_DEC => ServiceEvent::ServerRemoved,
        other => {
            warn!(
                "{}:{} - unknown service event {other}",
                FFI_TRANSPORT_TAG, FFI_TRANSPORT_FN_NOTIFY_TAG
            );
            return;
        }
    };
    guarded(FFI_TRANSPORT_FN_NOTIFY_TAG, || {
        // SAFETY: registered as the address of an `EventsContext` that lives until the
        // notifier is released
        let context = unsafe { &*(notify_cb_data as *const EventsContext) };
        context
            .events
            .on_service_event(NotifierHandle(notifier as usize), service_event);
    });
}
