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

use qmi_sys::*;
use std::error;
use std::fmt::{Display, Formatter};
use std::os::raw::c_int;

/// Why an operation on a client, registry or queue did not succeed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Generic failure, including "service not ready" and transport rejections
    Failed,
    /// The object is already registered or initialized
    Already,
    /// An argument was unusable, e.g. an already expired listener
    InvalidParam,
    /// The object to remove or look up does not exist
    NoSuch,
    /// A local resource (thread, allocation) could not be obtained
    NoMemory,
}

/// Error returned by the client core
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientError {
    code: ErrorCode,
    message: String,
    transport_error: Option<TransportError>,
}

impl ClientError {
    pub fn fail_with_code<T: Into<String>>(code: ErrorCode, message: T) -> Self {
        Self {
            code,
            message: message.into(),
            transport_error: None,
        }
    }

    /// A [ErrorCode::Failed] error caused by the transport rejecting a call
    pub fn from_transport<T: Into<String>>(transport_error: TransportError, message: T) -> Self {
        Self {
            code: ErrorCode::Failed,
            message: message.into(),
            transport_error: Some(transport_error),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn transport_error(&self) -> Option<TransportError> {
        self.transport_error
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.transport_error {
            Some(transport_error) => f.write_fmt(format_args!(
                "{:?}: {} (transport: {})",
                self.code, self.message, transport_error
            )),
            None => f.write_fmt(format_args!("{:?}: {}", self.code, self.message)),
        }
    }
}

impl error::Error for ClientError {}

/// Error reported by the underlying QMI transport
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportError {
    Internal,
    /// The remote service exited
    ServiceError,
    Timeout,
    Extended,
    PortNotOpen,
    MemCopy,
    InvalidTransaction,
    AllocFailure,
    Transport,
    InvalidParam,
    InvalidClient,
    /// The modem firmware has not come up yet
    FirmwareNotUp,
    InvalidSignal,
    Busy,
    Unknown(i32),
}

impl TransportError {
    /// Maps a raw transport status onto a [TransportError], `None` meaning success
    pub fn from_raw(code: c_int) -> Option<Self> {
        let transport_error = match code {
            QMI_NO_ERR => return None,
            QMI_INTERNAL_ERR => TransportError::Internal,
            QMI_SERVICE_ERR => TransportError::ServiceError,
            QMI_TIMEOUT_ERR => TransportError::Timeout,
            QMI_EXTENDED_ERR => TransportError::Extended,
            QMI_PORT_NOT_OPEN_ERR => TransportError::PortNotOpen,
            QMI_MEMCOPY_ERROR => TransportError::MemCopy,
            QMI_INVALID_TXN => TransportError::InvalidTransaction,
            QMI_CLIENT_ALLOC_FAILURE => TransportError::AllocFailure,
            QMI_CLIENT_TRANSPORT_ERR => TransportError::Transport,
            QMI_CLIENT_PARAM_ERR => TransportError::InvalidParam,
            QMI_CLIENT_INVALID_CLNT => TransportError::InvalidClient,
            QMI_CLIENT_FW_NOT_UP => TransportError::FirmwareNotUp,
            QMI_CLIENT_INVALID_SIG => TransportError::InvalidSignal,
            QMI_XPORT_BUSY_ERR => TransportError::Busy,
            other => TransportError::Unknown(other),
        };
        Some(transport_error)
    }

    pub fn to_raw(self) -> c_int {
        match self {
            TransportError::Internal => QMI_INTERNAL_ERR,
            TransportError::ServiceError => QMI_SERVICE_ERR,
            TransportError::Timeout => QMI_TIMEOUT_ERR,
            TransportError::Extended => QMI_EXTENDED_ERR,
            TransportError::PortNotOpen => QMI_PORT_NOT_OPEN_ERR,
            TransportError::MemCopy => QMI_MEMCOPY_ERROR,
            TransportError::InvalidTransaction => QMI_INVALID_TXN,
            TransportError::AllocFailure => QMI_CLIENT_ALLOC_FAILURE,
            TransportError::Transport => QMI_CLIENT_TRANSPORT_ERR,
            TransportError::InvalidParam => QMI_CLIENT_PARAM_ERR,
            TransportError::InvalidClient => QMI_CLIENT_INVALID_CLNT,
            TransportError::FirmwareNotUp => QMI_CLIENT_FW_NOT_UP,
            TransportError::InvalidSignal => QMI_CLIENT_INVALID_SIG,
            TransportError::Busy => QMI_XPORT_BUSY_ERR,
            TransportError::Unknown(code) => code,
        }
    }

    /// Whether the service may come back (subsystem restart) as opposed to the client being
    /// unusable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TransportError::ServiceError
                | TransportError::Timeout
                | TransportError::PortNotOpen
                | TransportError::FirmwareNotUp
                | TransportError::Busy
        )
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:?} ({})", self, self.to_raw()))
    }
}

impl error::Error for TransportError {}

/// Why a type-erased callback could not be run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvokeError {
    /// No callback was supplied
    Missing,
    /// The callback was stored with a different argument type
    SignatureMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// The callback panicked
    Panicked(String),
}

impl Display for InvokeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvokeError::Missing => f.write_str("No callback to invoke"),
            InvokeError::SignatureMismatch { expected, actual } => f.write_fmt(format_args!(
                "Callback expects {expected} but was invoked with {actual}"
            )),
            InvokeError::Panicked(msg) => f.write_fmt(format_args!("Callback panicked: {msg}")),
        }
    }
}

impl error::Error for InvokeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes_map_back_and_forth() {
        assert_eq!(TransportError::from_raw(QMI_NO_ERR), None);
        assert_eq!(
            TransportError::from_raw(QMI_SERVICE_ERR),
            Some(TransportError::ServiceError)
        );
        assert_eq!(
            TransportError::from_raw(-99),
            Some(TransportError::Unknown(-99))
        );
        assert_eq!(TransportError::Busy.to_raw(), QMI_XPORT_BUSY_ERR);
    }

    #[test]
    fn test_recoverable_split() {
        assert!(TransportError::ServiceError.is_recoverable());
        assert!(TransportError::FirmwareNotUp.is_recoverable());
        assert!(!TransportError::InvalidClient.is_recoverable());
        assert!(!TransportError::Internal.is_recoverable());
    }

    #[test]
    fn test_client_error_display_mentions_transport() {
        let err = ClientError::from_transport(TransportError::Timeout, "send_sync");
        assert_eq!(err.code(), ErrorCode::Failed);
        assert_eq!(err.transport_error(), Some(TransportError::Timeout));
        assert!(err.to_string().contains("Timeout"));
    }
}
