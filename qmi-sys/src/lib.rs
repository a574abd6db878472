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

//! Raw C-ABI surface of a vendor QMI client transport (QCCI style).
//!
//! The platform hands the SDK a [qmi_transport_ops] table of `extern "C"` entry points. Every
//! entry point takes the table's own `ctx` pointer as its first argument, so a host can back
//! the table with any state it likes.
//!
//! Nothing in here is safe to call directly; the `qmi-async-client` crate wraps it.

#![allow(non_camel_case_types)]

use std::os::raw::{c_int, c_uint, c_void};

/// Status code returned by every transport entry point and passed into callbacks
pub type qmi_client_error_type = c_int;

pub const QMI_NO_ERR: qmi_client_error_type = 0;
pub const QMI_INTERNAL_ERR: qmi_client_error_type = -1;
pub const QMI_SERVICE_ERR: qmi_client_error_type = -2;
pub const QMI_TIMEOUT_ERR: qmi_client_error_type = -3;
pub const QMI_EXTENDED_ERR: qmi_client_error_type = -4;
pub const QMI_PORT_NOT_OPEN_ERR: qmi_client_error_type = -5;
pub const QMI_MEMCOPY_ERROR: qmi_client_error_type = -13;
pub const QMI_INVALID_TXN: qmi_client_error_type = -14;
pub const QMI_CLIENT_ALLOC_FAILURE: qmi_client_error_type = -15;
pub const QMI_CLIENT_TRANSPORT_ERR: qmi_client_error_type = -16;
pub const QMI_CLIENT_PARAM_ERR: qmi_client_error_type = -17;
pub const QMI_CLIENT_INVALID_CLNT: qmi_client_error_type = -18;
pub const QMI_CLIENT_FW_NOT_UP: qmi_client_error_type = -19;
pub const QMI_CLIENT_INVALID_SIG: qmi_client_error_type = -20;
pub const QMI_XPORT_BUSY_ERR: qmi_client_error_type = -21;

/// Event delivered to a [qmi_client_notify_cb]
pub type qmi_client_notify_event_type = c_int;

pub const QMI_CLIENT_SERVICE_COUNT_INC: qmi_client_notify_event_type = 1;
pub const QMI_CLIENT_SERVICE_COUNT_DEC: qmi_client_notify_event_type = 2;

/// Opaque handle of a connected client
pub type qmi_client_type = *mut c_void;

/// Opaque handle of a service notifier
pub type qmi_notifier_type = *mut c_void;

/// Identifies a remote service endpoint
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct qmi_service_info {
    pub service_id: c_uint,
    pub instance_id: c_uint,
}

/// Called for every unsolicited indication on a connected client
pub type qmi_client_ind_cb = extern "C" fn(
    user_handle: qmi_client_type,
    msg_id: c_uint,
    ind_buf: *const u8,
    ind_buf_len: c_uint,
    ind_cb_data: *mut c_void,
);

/// Called once per asynchronous request, with the response or the transport error
pub type qmi_client_recv_msg_async_cb = extern "C" fn(
    user_handle: qmi_client_type,
    msg_id: c_uint,
    resp_buf: *const u8,
    resp_buf_len: c_uint,
    resp_cb_data: *mut c_void,
    transp_err: qmi_client_error_type,
);

/// Called when the remote service of a connected client exits or the connection breaks
pub type qmi_client_error_cb = extern "C" fn(
    user_handle: qmi_client_type,
    error: qmi_client_error_type,
    err_cb_data: *mut c_void,
);

/// Called when a server for the watched service appears or disappears
pub type qmi_client_notify_cb = extern "C" fn(
    notifier: qmi_notifier_type,
    event: qmi_client_notify_event_type,
    notify_cb_data: *mut c_void,
);

/// Entry points a platform provides for talking to QMI services
///
/// # Contract
///
/// * every function may be called from any thread
/// * once `client_release` / `notifier_release` returns, no further callback is made for
///   that handle
/// * `send_msg_async` invokes `resp_cb` exactly once if and only if it returned [QMI_NO_ERR]
#[repr(C)]
#[derive(Clone, Copy)]
pub struct qmi_transport_ops {
    pub ctx: *mut c_void,
    pub client_init: unsafe extern "C" fn(
        ctx: *mut c_void,
        service: *const qmi_service_info,
        ind_cb: qmi_client_ind_cb,
        ind_cb_data: *mut c_void,
        out_handle: *mut qmi_client_type,
    ) -> qmi_client_error_type,
    pub register_error_cb: unsafe extern "C" fn(
        ctx: *mut c_void,
        handle: qmi_client_type,
        err_cb: qmi_client_error_cb,
        err_cb_data: *mut c_void,
    ) -> qmi_client_error_type,
    pub send_msg_async: unsafe extern "C" fn(
        ctx: *mut c_void,
        handle: qmi_client_type,
        msg_id: c_uint,
        req_buf: *const u8,
        req_buf_len: c_uint,
        resp_buf_len: c_uint,
        resp_cb: qmi_client_recv_msg_async_cb,
        resp_cb_data: *mut c_void,
    ) -> qmi_client_error_type,
    pub send_msg_sync: unsafe extern "C" fn(
        ctx: *mut c_void,
        handle: qmi_client_type,
        msg_id: c_uint,
        req_buf: *const u8,
        req_buf_len: c_uint,
        resp_buf: *mut u8,
        resp_buf_len: c_uint,
        resp_out_len: *mut c_uint,
        timeout_msecs: c_uint,
    ) -> qmi_client_error_type,
    pub client_release:
        unsafe extern "C" fn(ctx: *mut c_void, handle: qmi_client_type) -> qmi_client_error_type,
    pub notifier_init: unsafe extern "C" fn(
        ctx: *mut c_void,
        service: *const qmi_service_info,
        notify_cb: qmi_client_notify_cb,
        notify_cb_data: *mut c_void,
        out_notifier: *mut qmi_notifier_type,
    ) -> qmi_client_error_type,
    pub notifier_release:
        unsafe extern "C" fn(ctx: *mut c_void, notifier: qmi_notifier_type) -> qmi_client_error_type,
}
