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

use crate::error::{ClientError, ErrorCode};
use crate::transport::ServiceDescriptor;
use crate::transport_client::{ClientOptions, DEFAULT_SYNC_TIMEOUT};
use crate::{InstanceId, ServiceId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(deserialize_with = "deserialize_hex_u16")]
    pub service: ServiceId,
    #[serde(deserialize_with = "deserialize_hex_u16")]
    pub instance: InstanceId,
}

impl ServiceConfig {
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(&self.name, self.service, self.instance)
    }
}

/// Which services a process talks to and how
///
/// ```json
/// {
///     "sync_timeout_ms": 3000,
///     "services": [
///         { "name": "nas", "service": "0x0003", "instance": "0x0001" }
///     ]
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

fn default_sync_timeout_ms() -> u64 {
    DEFAULT_SYNC_TIMEOUT.as_millis() as u64
}

fn deserialize_hex_u16<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let hex_str = String::deserialize(deserializer)?;
    u16::from_str_radix(hex_str.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

fn read_json_file(file_path: &Path) -> Result<String, ClientError> {
    let mut content = String::new();
    File::open(file_path)
        .and_then(|mut file| file.read_to_string(&mut content))
        .map_err(|e| {
            ClientError::fail_with_code(
                ErrorCode::InvalidParam,
                format!("Failed to read {}: {e}", file_path.display()),
            )
        })?;
    Ok(content)
}

impl ClientConfig {
    pub fn from_path(file_path: &Path) -> Result<Self, ClientError> {
        let content = read_json_file(file_path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ClientError> {
        let config: ClientConfig = serde_json::from_str(content).map_err(|e| {
            ClientError::fail_with_code(
                ErrorCode::InvalidParam,
                format!("Failed to parse client config: {e}"),
            )
        })?;
        debug!(
            "ClientConfig:from_json_str - {} services, sync timeout {}ms",
            config.services.len(),
            config.sync_timeout_ms
        );
        Ok(config)
    }

    /// Looks up the service configured under `name`
    pub fn service_descriptor(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services
            .iter()
            .find(|service| service.name == name)
            .map(ServiceConfig::descriptor)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            sync_timeout: Duration::from_millis(self.sync_timeout_ms),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sync_timeout_ms: default_sync_timeout_ms(),
            services: Vec::new(),
        }
    }
}
