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

use crate::client_config::ClientConfig;
use crate::error::{ClientError, ErrorCode};
use crate::listeners::IndicationCodec;
use crate::transport::Transport;
use crate::transport_client::TransportClient;
use log::{debug, trace};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

const CLIENT_FACTORY_TAG: &str = "ClientFactory";

/// Creates clients for configured services and hands out the live one for a service while
/// anybody still holds it
///
/// Meant to be built once per process and shared; it keeps no strong reference to a client.
pub struct ClientFactory {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    clients: Mutex<HashMap<String, Weak<dyn Any + Send + Sync>>>,
}

impl ClientFactory {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config_path(
        transport: Arc<dyn Transport>,
        config_path: &Path,
    ) -> Result<Self, ClientError> {
        if !config_path.exists() {
            return Err(ClientError::fail_with_code(
                ErrorCode::NoSuch,
                format!("Configuration file not found at: {}", config_path.display()),
            ));
        }
        Ok(Self::new(transport, ClientConfig::from_path(config_path)?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The client for `service_name`, initialized on first use
    ///
    /// `make_codec` only runs when a new client is created. A live client that one of its
    /// holders released is initialized again before it is handed out. Fails with [ErrorCode::NoSuch]
    /// for a service missing from the configuration and with [ErrorCode::InvalidParam] if the
    /// live client of that service was created with another codec type.
    pub fn get_client<C, F>(
        &self,
        service_name: &str,
        make_codec: F,
    ) -> Result<Arc<TransportClient<C>>, ClientError>
    where
        C: IndicationCodec,
        F: FnOnce() -> C,
    {
        let mut clients = self.clients.lock();

        let service = self.config.service_descriptor(service_name).ok_or_else(|| {
            ClientError::fail_with_code(
                ErrorCode::NoSuch,
                format!("Service {service_name} is not configured"),
            )
        })?;

        if let Some(existing) = clients.get(service_name).and_then(Weak::upgrade) {
            trace!(
                "{}:get_client - reusing client of {service_name}",
                CLIENT_FACTORY_TAG
            );
            let client = existing.downcast::<TransportClient<C>>().map_err(|_| {
                ClientError::fail_with_code(
                    ErrorCode::InvalidParam,
                    format!("Client of {service_name} uses a different codec"),
                )
            })?;
            if client.service().is_none() {
                debug!(
                    "{}:get_client - client of {service_name} was released, initializing again",
                    CLIENT_FACTORY_TAG
                );
                if let Err(err) = client.init(service) {
                    if err.code() != ErrorCode::Already {
                        return Err(err);
                    }
                }
            }
            return Ok(client);
        }

        let client = Arc::new(TransportClient::new(
            self.transport.clone(),
            make_codec(),
            self.config.client_options(),
        ));
        client.init(service)?;

        let erased: Arc<dyn Any + Send + Sync> = client.clone();
        clients.insert(service_name.to_string(), Arc::downgrade(&erased));
        debug!(
            "{}:get_client - created client of {service_name}",
            CLIENT_FACTORY_TAG
        );
        Ok(client)
    }

    /// Forgets the clients nobody holds any more, returning their service names
    pub fn released_clients(&self) -> Vec<String> {
        let mut released = Vec::new();
        self.clients.lock().retain(|name, client| {
            let live = client.strong_count() > 0;
            if !live {
                released.push(name.clone());
            }
            live
        });
        released.sort();
        released
    }
}
