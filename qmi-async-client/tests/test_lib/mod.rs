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

#![allow(dead_code)]

use log::trace;
use parking_lot::Mutex;
use qmi_async_client::{
    ClientError, ClientOptions, CorrelationRecord, ErrorCode, EventClass, IndicationCodec,
    IndicationListener, MessageId, NotifierHandle, ServiceDescriptor, ServiceEvent,
    ServiceStatus, ServiceStatusListener, Transport, TransportClient, TransportError,
    TransportEvents, TransportHandle,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn before_test() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const READY_TIMEOUT: Duration = Duration::from_secs(2);

pub const SIGNAL_INDICATION: MessageId = 0x51;
pub const SERVING_SYSTEM_INDICATION: MessageId = 0x24;
pub const SIGNAL_CLASS: EventClass = 0;
pub const SERVING_SYSTEM_CLASS: EventClass = 3;

/// Polls `predicate` until it holds or `timeout` passes
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut predicate: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

pub fn nas_service() -> ServiceDescriptor {
    ServiceDescriptor::new("nas", 0x0003, 0x0001)
}

/// A request the [MockTransport] accepted and has not answered yet
pub struct PendingRequest {
    pub handle: TransportHandle,
    pub message_id: MessageId,
    pub request: Vec<u8>,
    pub record: CorrelationRecord,
    events: Arc<dyn TransportEvents>,
}

#[derive(Default)]
struct MockState {
    next_handle: usize,
    connections: HashMap<TransportHandle, Arc<dyn TransportEvents>>,
    /// Every connection ever made, released or not
    history: HashMap<TransportHandle, Arc<dyn TransportEvents>>,
    current: Option<TransportHandle>,
    notifiers: HashMap<NotifierHandle, Arc<dyn TransportEvents>>,
    pending: Vec<PendingRequest>,
    failing_connects: VecDeque<TransportError>,
    remove_during_next_connect: bool,
    failing_sends: VecDeque<TransportError>,
    sync_responses: HashMap<MessageId, Result<Vec<u8>, TransportError>>,
    sync_requests: Vec<(MessageId, Vec<u8>)>,
    released: Vec<TransportHandle>,
    released_notifiers: Vec<NotifierHandle>,
    connects: usize,
}

/// A [Transport] driven by the test
///
/// Every event is delivered on the calling thread, outside the mock's own lock.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_connect(&self, error: TransportError) {
        self.state.lock().failing_connects.push_back(error);
    }

    /// The next connect reports the service gone before it returns
    pub fn remove_during_next_connect(&self) {
        self.state.lock().remove_during_next_connect = true;
    }

    pub fn fail_next_send(&self, error: TransportError) {
        self.state.lock().failing_sends.push_back(error);
    }

    pub fn set_sync_response(&self, message_id: MessageId, response: Result<Vec<u8>, TransportError>) {
        self.state.lock().sync_responses.insert(message_id, response);
    }

    pub fn sync_requests(&self) -> Vec<(MessageId, Vec<u8>)> {
        self.state.lock().sync_requests.clone()
    }

    pub fn current_handle(&self) -> Option<TransportHandle> {
        self.state.lock().current
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn released(&self) -> Vec<TransportHandle> {
        self.state.lock().released.clone()
    }

    pub fn released_notifiers(&self) -> Vec<NotifierHandle> {
        self.state.lock().released_notifiers.clone()
    }

    pub fn live_notifiers(&self) -> usize {
        self.state.lock().notifiers.len()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn take_pending(&self) -> Vec<PendingRequest> {
        std::mem::take(&mut self.state.lock().pending)
    }

    /// Answers `request` the way the transport's response thread would
    pub fn respond(
        &self,
        request: PendingRequest,
        payload: &[u8],
        transport_error: Option<TransportError>,
    ) {
        let PendingRequest {
            handle,
            message_id,
            record,
            events,
            ..
        } = request;
        events.on_async_response(handle, message_id, payload, record, transport_error);
    }

    /// Delivers a response for `record` on the current connection, whether or not it was ever sent
    pub fn deliver_response(&self, message_id: MessageId, payload: &[u8], record: CorrelationRecord) {
        let Some((handle, events)) = self.current_events() else {
            return;
        };
        events.on_async_response(handle, message_id, payload, record, None);
    }

    pub fn indicate(&self, message_id: MessageId, payload: &[u8]) {
        let Some((handle, events)) = self.current_events() else {
            return;
        };
        events.on_indication(handle, message_id, payload);
    }

    /// Delivers an indication tagged with `handle`, even one already released
    pub fn indicate_on(&self, handle: TransportHandle, message_id: MessageId, payload: &[u8]) {
        let Some(events) = self.state.lock().history.get(&handle).cloned() else {
            return;
        };
        events.on_indication(handle, message_id, payload);
    }

    /// The current connection breaks with `error`
    pub fn fail_connection(&self, error: TransportError) {
        let Some((handle, events)) = self.current_events() else {
            return;
        };
        events.on_error(handle, error);
    }

    pub fn server_removed(&self) {
        self.service_event(ServiceEvent::ServerRemoved);
    }

    pub fn server_arrived(&self) {
        self.service_event(ServiceEvent::ServerArrived);
    }

    fn service_event(&self, event: ServiceEvent) {
        let notifiers: Vec<_> = self
            .state
            .lock()
            .notifiers
            .iter()
            .map(|(handle, events)| (*handle, events.clone()))
            .collect();
        for (notifier, events) in notifiers {
            events.on_service_event(notifier, event);
        }
    }

    fn current_events(&self) -> Option<(TransportHandle, Arc<dyn TransportEvents>)> {
        let state = self.state.lock();
        let handle = state.current?;
        state
            .connections
            .get(&handle)
            .map(|events| (handle, events.clone()))
    }
}

impl Transport for MockTransport {
    fn register_notifier(
        &self,
        _service: &ServiceDescriptor,
        events: Arc<dyn TransportEvents>,
    ) -> Result<NotifierHandle, TransportError> {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let notifier = NotifierHandle(state.next_handle);
        state.notifiers.insert(notifier, events);
        Ok(notifier)
    }

    fn release_notifier(&self, notifier: NotifierHandle) {
        let mut state = self.state.lock();
        state.notifiers.remove(&notifier);
        state.released_notifiers.push(notifier);
    }

    fn connect(
        &self,
        service: &ServiceDescriptor,
        events: Arc<dyn TransportEvents>,
    ) -> Result<TransportHandle, TransportError> {
        let (handle, removed) = {
            let mut state = self.state.lock();
            state.connects += 1;
            if let Some(error) = state.failing_connects.pop_front() {
                return Err(error);
            }

            state.next_handle += 1;
            let handle = TransportHandle(state.next_handle);
            state.connections.insert(handle, events.clone());
            state.history.insert(handle, events);
            state.current = Some(handle);
            (handle, std::mem::take(&mut state.remove_during_next_connect))
        };
        trace!("MockTransport:connect - {} as {handle:?}", service.name);

        if removed {
            self.server_removed();
            // Lifecycle handling runs on its own thread
            thread::sleep(Duration::from_millis(200));
        }
        Ok(handle)
    }

    fn send_async(
        &self,
        handle: TransportHandle,
        message_id: MessageId,
        request: &[u8],
        _max_response_len: usize,
        record: CorrelationRecord,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.failing_sends.pop_front() {
            return Err(error);
        }
        let Some(events) = state.connections.get(&handle).cloned() else {
            return Err(TransportError::InvalidClient);
        };

        state.pending.push(PendingRequest {
            handle,
            message_id,
            request: request.to_vec(),
            record,
            events,
        });
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
        let response = {
            let mut state = self.state.lock();
            if !state.connections.contains_key(&handle) {
                return Err(TransportError::InvalidClient);
            }
            state.sync_requests.push((message_id, request.to_vec()));
            state.sync_responses.get(&message_id).cloned()
        };

        match response {
            Some(Ok(mut payload)) => {
                payload.truncate(max_response_len);
                Ok(payload)
            }
            Some(Err(error)) => Err(error),
            None => {
                thread::sleep(timeout);
                Err(TransportError::Timeout)
            }
        }
    }

    fn release(&self, handle: TransportHandle) {
        let mut state = self.state.lock();
        if state.connections.remove(&handle).is_some() {
            state.released.push(handle);
        }
        if state.current == Some(handle) {
            state.current = None;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestIndication {
    pub message_id: MessageId,
    pub payload: Vec<u8>,
}

/// Maps the signal and serving system indications onto their classes; empty payloads do not
/// decode
pub struct TestCodec;

impl IndicationCodec for TestCodec {
    type Indication = TestIndication;

    fn event_class(&self, message_id: MessageId) -> Option<EventClass> {
        match message_id {
            SIGNAL_INDICATION => Some(SIGNAL_CLASS),
            SERVING_SYSTEM_INDICATION => Some(SERVING_SYSTEM_CLASS),
            _ => None,
        }
    }

    fn decode(&self, message_id: MessageId, payload: &[u8]) -> Result<TestIndication, ClientError> {
        if payload.is_empty() {
            return Err(ClientError::fail_with_code(
                ErrorCode::InvalidParam,
                "Empty indication",
            ));
        }
        Ok(TestIndication {
            message_id,
            payload: payload.to_vec(),
        })
    }
}

pub fn new_client(transport: &Arc<MockTransport>) -> TransportClient<TestCodec> {
    let transport: Arc<dyn Transport> = transport.clone();
    TransportClient::new(transport, TestCodec, ClientOptions::default())
}

/// A client that has connected to [nas_service]
pub fn ready_client(transport: &Arc<MockTransport>) -> TransportClient<TestCodec> {
    let client = new_client(transport);
    client.init(nas_service()).unwrap();
    assert!(client.wait_for_ready(Some(READY_TIMEOUT)));
    client
}

#[derive(Default)]
pub struct StatusRecorder {
    statuses: Mutex<Vec<ServiceStatus>>,
}

impl StatusRecorder {
    pub fn statuses(&self) -> Vec<ServiceStatus> {
        self.statuses.lock().clone()
    }
}

impl ServiceStatusListener for StatusRecorder {
    fn on_service_status_change(&self, status: ServiceStatus) {
        self.statuses.lock().push(status);
    }
}

#[derive(Default)]
pub struct IndicationRecorder {
    seen: Mutex<Vec<TestIndication>>,
}

impl IndicationRecorder {
    pub fn seen(&self) -> Vec<TestIndication> {
        self.seen.lock().clone()
    }
}

impl IndicationListener<TestIndication> for IndicationRecorder {
    fn on_indication(&self, indication: &TestIndication) {
        self.seen.lock().push(indication.clone());
    }
}

pub struct PanickingListener;

impl IndicationListener<TestIndication> for PanickingListener {
    fn on_indication(&self, _indication: &TestIndication) {
        panic!("listener failure");
    }
}
