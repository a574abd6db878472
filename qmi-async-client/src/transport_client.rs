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

mod event_dispatch;
mod service_state;

pub use service_state::ServiceState;

use crate::error::{ClientError, ErrorCode, TransportError};
use crate::listeners::{IndicationCodec, IndicationListener, ServiceStatus, ServiceStatusListener};
use crate::storage::callback_table::panic_message;
use crate::storage::ClientStorage;
use crate::task_queue::{DeferredTaskQueue, Task};
use crate::transport::{
    AsyncResponse, CorrelationRecord, ServiceDescriptor, Transport, TransportHandle,
};
use crate::{EventMask, MessageId, TransactionId, UserData, INVALID_TRANSACTION_ID};
use log::{debug, error, info, trace, warn};
use parking_lot::{Condvar, Mutex, RwLock};
use service_state::Connection;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

pub(crate) const QMI_CLIENT_TAG: &str = "TransportClient";
const QMI_CLIENT_FN_INIT_TAG: &str = "init";
const QMI_CLIENT_FN_CONNECT_TAG: &str = "connect_and_bind";
const QMI_CLIENT_FN_CONNECTION_LOST_TAG: &str = "connection_lost";
const QMI_CLIENT_FN_SEND_ASYNC_TAG: &str = "send_async";
const QMI_CLIENT_FN_SEND_SYNC_TAG: &str = "send_sync";
const QMI_CLIENT_FN_RELEASE_TAG: &str = "release";
const QMI_CLIENT_FN_NOTIFY_TAG: &str = "notify_status_listeners";

/// Used for [TransportClient::send_sync] when the caller passes no timeout
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(5000);

/// Completion callback of [TransportClient::send_async]
pub type ResponseCallback = Box<dyn FnOnce(AsyncResponse) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    pub sync_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

/// Re-establishes per-session context on a fresh connection
///
/// Called after every successful connect, including reconnects after a service restart. The
/// client only becomes [ServiceState::Available] once `bind` succeeds; until then requests are
/// rejected.
pub trait SessionBinder: Send + Sync {
    fn bind(&self, session: &BoundSession<'_>) -> Result<(), ClientError>;
}

/// A connection that is up but not yet available to regular requests
pub struct BoundSession<'a> {
    transport: &'a dyn Transport,
    handle: TransportHandle,
    service: &'a ServiceDescriptor,
    sync_timeout: Duration,
}

impl BoundSession<'_> {
    pub fn service(&self) -> &ServiceDescriptor {
        self.service
    }

    pub fn send_sync(
        &self,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
    ) -> Result<Vec<u8>, ClientError> {
        self.transport
            .send_sync(
                self.handle,
                message_id,
                request,
                max_response_len,
                self.sync_timeout,
            )
            .map_err(|err| {
                ClientError::from_transport(
                    err,
                    format!("Binding request {message_id:#06x} failed"),
                )
            })
    }
}

enum Readiness {
    Now(bool),
    Later(oneshot::Receiver<bool>),
}

/// One logical connection to a QMI service
///
/// Requests go out through [TransportClient::send_async] and their responses come back through
/// the given callback on a transport thread. Indications are decoded by the client's codec and
/// delivered to the [IndicationListener]s of their event class. Availability changes are
/// reported to [ServiceStatusListener]s.
///
/// Dropping the client releases it.
pub struct TransportClient<C: IndicationCodec> {
    inner: Arc<ClientInner<C>>,
}

pub(crate) struct ClientInner<C: IndicationCodec> {
    transport: Arc<dyn Transport>,
    codec: C,
    options: ClientOptions,
    storage: ClientStorage<C::Indication>,
    connection: Mutex<Connection>,
    state_changed: Condvar,
    session_binder: RwLock<Option<Arc<dyn SessionBinder>>>,
    task_queue: DeferredTaskQueue,
}

impl<C: IndicationCodec> std::fmt::Debug for TransportClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient").finish_non_exhaustive()
    }
}

impl<C: IndicationCodec> TransportClient<C> {
    pub fn new(transport: Arc<dyn Transport>, codec: C, options: ClientOptions) -> Self {
        let inner = ClientInner {
            transport,
            codec,
            options,
            storage: ClientStorage::new(),
            connection: Mutex::new(Connection::new()),
            state_changed: Condvar::new(),
            session_binder: RwLock::new(None),
            task_queue: DeferredTaskQueue::new("qmi-client"),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Starts connecting to `service`
    ///
    /// Returns as soon as the service watch is registered and the connect attempt is under
    /// way; the outcome shows up in [TransportClient::service_state]. Fails with
    /// [ErrorCode::Already] on an initialized client.
    pub fn init(&self, service: ServiceDescriptor) -> Result<(), ClientError> {
        self.inner.init(service)
    }

    /// Sends a request and returns without waiting for its response
    ///
    /// `callback`, if any, runs exactly once with the response or the transport error of this
    /// request. It does not run if the service goes away first or the client is released.
    /// Returns the transaction id of the callback, [INVALID_TRANSACTION_ID] without one.
    pub fn send_async(
        &self,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        callback: Option<ResponseCallback>,
        user_data: UserData,
    ) -> Result<TransactionId, ClientError> {
        self.inner
            .send_async(message_id, request, max_response_len, callback, user_data)
    }

    /// [TransportClient::send_async] as a future
    ///
    /// There is no deadline; a caller that stops waiting leaves the callback in place until the
    /// client is released.
    pub fn request(
        &self,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
    ) -> impl Future<Output = Result<AsyncResponse, ClientError>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let callback: ResponseCallback = Box::new(move |response| {
            let _ = tx.send(response);
        });
        let sent = self.send_async(message_id, request, max_response_len, Some(callback), None);

        async move {
            sent?;
            rx.await.map_err(|_| {
                ClientError::fail_with_code(
                    ErrorCode::Failed,
                    format!("Request {message_id:#06x} was abandoned"),
                )
            })
        }
    }

    /// Sends a request and blocks until its response arrives or `timeout` passes
    pub fn send_sync(
        &self,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, ClientError> {
        self.inner
            .send_sync(message_id, request, max_response_len, timeout)
    }

    pub fn is_ready(&self) -> bool {
        self.service_state() == ServiceState::Available
    }

    pub fn service_state(&self) -> ServiceState {
        self.inner.connection.lock().state
    }

    /// The service this client was initialized for
    pub fn service(&self) -> Option<ServiceDescriptor> {
        self.inner.connection.lock().descriptor.clone()
    }

    /// Resolves to `true` once the client is available, `false` if it fails or is released
    pub fn on_ready(&self) -> impl Future<Output = bool> + Send + 'static {
        let readiness = {
            let mut connection = self.inner.connection.lock();
            match connection.state {
                ServiceState::Available => Readiness::Now(true),
                ServiceState::Failed => Readiness::Now(false),
                ServiceState::Uninitialized | ServiceState::Unavailable => {
                    let (tx, rx) = oneshot::channel();
                    connection.add_ready_waiter(tx);
                    Readiness::Later(rx)
                }
            }
        };

        async move {
            match readiness {
                Readiness::Now(ready) => ready,
                Readiness::Later(rx) => rx.await.unwrap_or(false),
            }
        }
    }

    /// Blocking form of [TransportClient::on_ready], giving up after `timeout`
    pub fn wait_for_ready(&self, timeout: Option<Duration>) -> bool {
        self.inner.wait_for_ready(timeout)
    }

    pub fn register_listener(
        &self,
        listener: Weak<dyn ServiceStatusListener>,
    ) -> Result<(), ClientError> {
        self.inner
            .storage
            .status_listeners()
            .register_listener(listener)
    }

    pub fn deregister_listener(
        &self,
        listener: &Weak<dyn ServiceStatusListener>,
    ) -> Result<(), ClientError> {
        self.inner
            .storage
            .status_listeners()
            .deregister_listener(listener)
    }

    pub fn register_indication_listener(
        &self,
        listener: Weak<dyn IndicationListener<C::Indication>>,
        mask: EventMask,
    ) -> Result<(), ClientError> {
        self.inner
            .storage
            .indication_listeners()
            .register_listener(listener, mask)
    }

    pub fn deregister_indication_listener(
        &self,
        listener: &Weak<dyn IndicationListener<C::Indication>>,
        mask: EventMask,
    ) -> Result<(), ClientError> {
        self.inner
            .storage
            .indication_listeners()
            .deregister_listener(listener, mask)
    }

    /// Installs the binder run on every new connection, replacing any previous one
    pub fn set_session_binder(&self, binder: Arc<dyn SessionBinder>) {
        *self.inner.session_binder.write() = Some(binder);
    }

    /// Queue for background work belonging to this client
    pub fn task_queue(&self) -> &DeferredTaskQueue {
        &self.inner.task_queue
    }

    pub fn codec(&self) -> &C {
        &self.inner.codec
    }

    /// Number of requests whose callbacks have not run yet
    pub fn outstanding_requests(&self) -> usize {
        self.inner.storage.callbacks().len()
    }

    /// Closes the connection and the service watch, runs the queued deferred tasks and drops
    /// the callbacks of outstanding requests
    ///
    /// Pending [TransportClient::on_ready] futures resolve to `false`. Calling it again is a
    /// no-op, and the client can be initialized anew afterwards.
    pub fn release(&self) {
        self.inner.release();
    }
}

impl<C: IndicationCodec> Drop for TransportClient<C> {
    fn drop(&mut self) {
        trace!("{}:drop - releasing", QMI_CLIENT_TAG);
        self.inner.release();
    }
}

impl<C: IndicationCodec> ClientInner<C> {
    fn init(self: &Arc<Self>, service: ServiceDescriptor) -> Result<(), ClientError> {
        let epoch = {
            let mut connection = self.connection.lock();
            if connection.descriptor.is_some() {
                return Err(ClientError::fail_with_code(
                    ErrorCode::Already,
                    format!("Client is already initialized for {}", service.name),
                ));
            }
            connection.epoch += 1;
            connection.descriptor = Some(service.clone());
            connection.epoch
        };
        info!(
            "{}:{} - {} service: {:#06x} instance: {:#06x}",
            QMI_CLIENT_TAG,
            QMI_CLIENT_FN_INIT_TAG,
            service.name,
            service.service_id,
            service.instance_id
        );

        let notifier = match self
            .transport
            .register_notifier(&service, self.event_sink(epoch))
        {
            Ok(notifier) => notifier,
            Err(err) => {
                self.abandon_init(epoch);
                return Err(ClientError::from_transport(
                    err,
                    format!("Unable to watch service {}", service.name),
                ));
            }
        };

        {
            let mut connection = self.connection.lock();
            if connection.epoch != epoch {
                drop(connection);
                self.transport.release_notifier(notifier);
                return Err(ClientError::fail_with_code(
                    ErrorCode::Failed,
                    "Client was released during init",
                ));
            }
            connection.notifier = Some(notifier);
        }

        let inner = self.clone();
        let submitted = Task::spawn(&format!("{}-connect", service.name), move || {
            inner.connect_and_bind(epoch)
        })
        .and_then(|task| self.task_queue.submit(task));

        if let Err(err) = submitted {
            error!(
                "{}:{} - unable to start connecting: {err}",
                QMI_CLIENT_TAG, QMI_CLIENT_FN_INIT_TAG
            );
            self.abandon_init(epoch);
            return Err(err);
        }
        Ok(())
    }

    /// Undoes a partial init of `epoch`
    fn abandon_init(&self, epoch: u64) {
        let notifier = {
            let mut connection = self.connection.lock();
            if connection.epoch != epoch {
                return;
            }
            connection.epoch += 1;
            connection.descriptor = None;
            connection.notifier.take()
        };
        if let Some(notifier) = notifier {
            self.transport.release_notifier(notifier);
        }
    }

    /// Connects and binds the session unless the client of `epoch` is already connected,
    /// failed or released
    ///
    /// While another attempt is under way this only leaves a note for it, so that it tries
    /// again should the service have gone away in between.
    fn connect_and_bind(self: &Arc<Self>, epoch: u64) {
        let service = {
            let mut connection = self.connection.lock();
            let Some(service) = connection.descriptor.clone() else {
                return;
            };
            if connection.epoch != epoch {
                return;
            }
            if connection.connecting {
                trace!(
                    "{}:{} - already connecting",
                    QMI_CLIENT_TAG,
                    QMI_CLIENT_FN_CONNECT_TAG
                );
                connection.arrived_while_connecting = true;
                return;
            }
            let idle = connection.handle.is_none()
                && matches!(
                    connection.state,
                    ServiceState::Uninitialized | ServiceState::Unavailable
                );
            if !idle {
                trace!(
                    "{}:{} - nothing to do in state {:?}",
                    QMI_CLIENT_TAG,
                    QMI_CLIENT_FN_CONNECT_TAG,
                    connection.state
                );
                return;
            }
            connection.set_connecting(true);
            service
        };

        let handle = match self.transport.connect(&service, self.event_sink(epoch)) {
            Ok(handle) => handle,
            Err(err) => {
                let next = if err.is_recoverable() {
                    ServiceState::Unavailable
                } else {
                    ServiceState::Failed
                };
                warn!(
                    "{}:{} - connecting to {} failed: {err}",
                    QMI_CLIENT_TAG, QMI_CLIENT_FN_CONNECT_TAG, service.name
                );

                let (status, retry) = {
                    let mut connection = self.connection.lock();
                    if connection.epoch != epoch {
                        return;
                    }
                    let retry = connection.arrived_while_connecting && err.is_recoverable();
                    connection.set_connecting(false);
                    (self.transition(&mut connection, next), retry)
                };
                self.notify_status_listeners(status);
                if retry {
                    self.connect_and_bind(epoch);
                }
                return;
            }
        };

        {
            let mut connection = self.connection.lock();
            if connection.epoch != epoch {
                drop(connection);
                debug!(
                    "{}:{} - released while connecting, dropping {handle:?}",
                    QMI_CLIENT_TAG, QMI_CLIENT_FN_CONNECT_TAG
                );
                self.transport.release(handle);
                return;
            }
            if connection.lost_while_connecting {
                let retry = connection.arrived_while_connecting;
                connection.set_connecting(false);
                let status = self.transition(&mut connection, ServiceState::Unavailable);
                drop(connection);
                debug!(
                    "{}:{} - service went away while connecting, dropping {handle:?}",
                    QMI_CLIENT_TAG, QMI_CLIENT_FN_CONNECT_TAG
                );
                self.transport.release(handle);
                self.notify_status_listeners(status);
                if retry {
                    self.connect_and_bind(epoch);
                }
                return;
            }
            connection.handle = Some(handle);
        }

        let bound = self.bind_session(&service, handle);

        let (status, stale_handle) = {
            let mut connection = self.connection.lock();
            if connection.epoch != epoch {
                return;
            }
            let retry = connection.arrived_while_connecting;
            connection.set_connecting(false);
            if connection.handle != Some(handle) {
                // The connection broke while binding; whoever took it releases it
                drop(connection);
                if retry {
                    self.connect_and_bind(epoch);
                }
                return;
            }
            match bound {
                Ok(()) => (self.transition(&mut connection, ServiceState::Available), None),
                Err(err) => {
                    warn!(
                        "{}:{} - binding {} failed: {err}",
                        QMI_CLIENT_TAG, QMI_CLIENT_FN_CONNECT_TAG, service.name
                    );
                    connection.handle = None;
                    (
                        self.transition(&mut connection, ServiceState::Unavailable),
                        Some(handle),
                    )
                }
            }
        };

        if let Some(stale_handle) = stale_handle {
            self.transport.release(stale_handle);
        }
        self.notify_status_listeners(status);
    }

    fn bind_session(
        &self,
        service: &ServiceDescriptor,
        handle: TransportHandle,
    ) -> Result<(), ClientError> {
        let Some(binder) = self.session_binder.read().clone() else {
            return Ok(());
        };

        let session = BoundSession {
            transport: self.transport.as_ref(),
            handle,
            service,
            sync_timeout: self.options.sync_timeout,
        };
        panic::catch_unwind(AssertUnwindSafe(|| binder.bind(&session))).unwrap_or_else(|payload| {
            Err(ClientError::fail_with_code(
                ErrorCode::Failed,
                format!("Session binder panicked: {}", panic_message(payload.as_ref())),
            ))
        })
    }

    /// Drops the current connection after the service went away or the connection broke
    ///
    /// With `handle` set, only acts if that is still the current connection.
    fn connection_lost(
        &self,
        epoch: u64,
        handle: Option<TransportHandle>,
        cause: Option<TransportError>,
    ) {
        let (status, lost_handle) = {
            let mut connection = self.connection.lock();
            if connection.epoch != epoch || connection.state == ServiceState::Failed {
                return;
            }
            if handle.is_none() && connection.connecting && connection.handle.is_none() {
                // The attempt under way must not bring up a connection to the departed service
                connection.lost_while_connecting = true;
                connection.arrived_while_connecting = false;
            }
            if handle.is_some() && connection.handle != handle {
                trace!(
                    "{}:{} - {handle:?} is stale",
                    QMI_CLIENT_TAG,
                    QMI_CLIENT_FN_CONNECTION_LOST_TAG
                );
                return;
            }

            let next = match cause {
                Some(err) if !err.is_recoverable() => ServiceState::Failed,
                _ => ServiceState::Unavailable,
            };
            let lost_handle = connection.handle.take();
            (self.transition(&mut connection, next), lost_handle)
        };

        if let Some(lost_handle) = lost_handle {
            debug!(
                "{}:{} - releasing {lost_handle:?}",
                QMI_CLIENT_TAG, QMI_CLIENT_FN_CONNECTION_LOST_TAG
            );
            self.transport.release(lost_handle);
        }
        self.notify_status_listeners(status);
    }

    /// Runs lifecycle handling off the transport's thread
    fn spawn_lifecycle<F>(self: &Arc<Self>, what: &str, f: F)
    where
        F: FnOnce(Arc<Self>) + Send + 'static,
    {
        let inner = self.clone();
        let submitted = Task::spawn(&format!("qmi-{what}"), move || f(inner))
            .and_then(|task| self.task_queue.submit(task));
        if let Err(err) = submitted {
            error!(
                "{}:{} - unable to handle {what} event: {err}",
                QMI_CLIENT_TAG, QMI_CLIENT_FN_CONNECTION_LOST_TAG
            );
        }
    }

    /// Moves to `next`, waking every readiness waiter
    ///
    /// Returns what to report to status listeners once the lock is released, `None` if the
    /// state did not change.
    fn transition(&self, connection: &mut Connection, next: ServiceState) -> Option<ServiceStatus> {
        let previous = connection.state;
        if previous == next {
            return None;
        }

        connection.state = next;
        info!(
            "{}:transition - {previous:?} -> {next:?}",
            QMI_CLIENT_TAG
        );
        match next {
            ServiceState::Available => connection.resolve_ready_waiters(true),
            ServiceState::Failed | ServiceState::Uninitialized => {
                connection.resolve_ready_waiters(false)
            }
            ServiceState::Unavailable => {}
        }
        self.state_changed.notify_all();

        next.as_status()
    }

    fn notify_status_listeners(&self, status: Option<ServiceStatus>) {
        let Some(status) = status else {
            return;
        };

        for listener in self.storage.status_listeners().get_listeners() {
            let notified =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_service_status_change(status)));
            if let Err(payload) = notified {
                error!(
                    "{}:{} - listener panicked: {}",
                    QMI_CLIENT_TAG,
                    QMI_CLIENT_FN_NOTIFY_TAG,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn available_handle(&self) -> Result<TransportHandle, ClientError> {
        let connection = self.connection.lock();
        match (connection.state, connection.handle) {
            (ServiceState::Available, Some(handle)) => Ok(handle),
            (state, _) => Err(ClientError::fail_with_code(
                ErrorCode::Failed,
                format!("Service is not available, state: {state:?}"),
            )),
        }
    }

    fn send_async(
        &self,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        callback: Option<ResponseCallback>,
        user_data: UserData,
    ) -> Result<TransactionId, ClientError> {
        let handle = self.available_handle()?;

        let transaction_id = match callback {
            Some(callback) => self
                .storage
                .callbacks()
                .add_fn::<AsyncResponse, _>(callback),
            None => INVALID_TRANSACTION_ID,
        };
        trace!(
            "{}:{} - {message_id:#06x} transaction: {transaction_id}",
            QMI_CLIENT_TAG,
            QMI_CLIENT_FN_SEND_ASYNC_TAG
        );

        let record = CorrelationRecord::new(transaction_id, user_data);
        if let Err(err) =
            self.transport
                .send_async(handle, message_id, request, max_response_len, record)
        {
            if transaction_id != INVALID_TRANSACTION_ID {
                self.storage
                    .callbacks()
                    .find_and_remove_callback(transaction_id);
            }
            warn!(
                "{}:{} - {message_id:#06x} rejected: {err}",
                QMI_CLIENT_TAG, QMI_CLIENT_FN_SEND_ASYNC_TAG
            );
            return Err(ClientError::from_transport(
                err,
                format!("Unable to send {message_id:#06x}"),
            ));
        }

        Ok(transaction_id)
    }

    fn send_sync(
        &self,
        message_id: MessageId,
        request: &[u8],
        max_response_len: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, ClientError> {
        let handle = self.available_handle()?;
        let timeout = timeout.unwrap_or(self.options.sync_timeout);

        self.transport
            .send_sync(handle, message_id, request, max_response_len, timeout)
            .map_err(|err| {
                warn!(
                    "{}:{} - {message_id:#06x} failed: {err}",
                    QMI_CLIENT_TAG, QMI_CLIENT_FN_SEND_SYNC_TAG
                );
                ClientError::from_transport(err, format!("Request {message_id:#06x} failed"))
            })
    }

    fn wait_for_ready(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut connection = self.connection.lock();
        let releases = connection.releases;

        loop {
            match connection.state {
                ServiceState::Available => return true,
                ServiceState::Failed => return false,
                ServiceState::Uninitialized | ServiceState::Unavailable => {}
            }
            if connection.releases != releases {
                return false;
            }

            match deadline {
                None => self.state_changed.wait(&mut connection),
                Some(deadline) => {
                    if self
                        .state_changed
                        .wait_until(&mut connection, deadline)
                        .timed_out()
                    {
                        return connection.state == ServiceState::Available;
                    }
                }
            }
        }
    }

    fn release(&self) {
        let (handle, notifier) = {
            let mut connection = self.connection.lock();
            connection.epoch += 1;
            connection.releases += 1;
            connection.descriptor = None;
            connection.set_connecting(false);
            connection.state = ServiceState::Uninitialized;
            connection.resolve_ready_waiters(false);
            self.state_changed.notify_all();
            (connection.handle.take(), connection.notifier.take())
        };

        if let Some(notifier) = notifier {
            self.transport.release_notifier(notifier);
        }
        if let Some(handle) = handle {
            self.transport.release(handle);
        }

        self.task_queue.drain();
        let evicted = self.storage.callbacks().clear();
        debug!(
            "{}:{} - released, {evicted} outstanding callbacks dropped",
            QMI_CLIENT_TAG, QMI_CLIENT_FN_RELEASE_TAG
        );
    }
}
