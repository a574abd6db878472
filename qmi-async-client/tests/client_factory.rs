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

pub mod test_lib;

#[cfg(test)]
mod tests {
    use crate::test_lib::{self, MockTransport, TestCodec, READY_TIMEOUT};
    use qmi_async_client::{
        ClientConfig, ClientError, ClientFactory, ErrorCode, EventClass, IndicationCodec,
        MessageId, Transport,
    };
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"{
        "sync_timeout_ms": 250,
        "services": [
            { "name": "nas", "service": "0x0003", "instance": "0x0001" },
            { "name": "dms", "service": "0x0002", "instance": "0x0000" }
        ]
    }"#;

    /// A codec with nothing in common with [TestCodec]
    struct SilentCodec;

    impl IndicationCodec for SilentCodec {
        type Indication = ();

        fn event_class(&self, _message_id: MessageId) -> Option<EventClass> {
            None
        }

        fn decode(&self, _message_id: MessageId, _payload: &[u8]) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn factory(transport: &Arc<MockTransport>) -> ClientFactory {
        let transport: Arc<dyn Transport> = transport.clone();
        ClientFactory::new(transport, ClientConfig::from_json_str(CONFIG).unwrap())
    }

    #[test]
    fn test_live_client_is_shared() {
        test_lib::before_test();

        let transport = MockTransport::new();
        let factory = factory(&transport);

        let first = factory.get_client("nas", || TestCodec).unwrap();
        let second = factory
            .get_client("nas", || -> TestCodec { panic!("codec built for a live client") })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.wait_for_ready(Some(READY_TIMEOUT)));
        assert_eq!(transport.connects(), 1);

        let dms = factory.get_client("dms", || TestCodec).unwrap();
        assert!(!Arc::ptr_eq(&first, &dms));
        assert_eq!(dms.service().unwrap().service_id, 0x0002);
    }

    #[test]
    fn test_unknown_service() {
        test_lib::before_test();

        let transport = MockTransport::new();
        let factory = factory(&transport);

        let err = factory.get_client("wds", || TestCodec).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoSuch);
        assert_eq!(transport.connects(), 0);
    }

    #[test]
    fn test_codec_mismatch() {
        test_lib::before_test();

        let transport = MockTransport::new();
        let factory = factory(&transport);

        let _nas = factory.get_client("nas", || TestCodec).unwrap();
        let err = factory.get_client("nas", || SilentCodec).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParam);
    }

    #[test]
    fn test_dropped_client_is_recreated() {
        test_lib::before_test();

        let transport = MockTransport::new();
        let factory = factory(&transport);

        let client = factory.get_client("nas", || TestCodec).unwrap();
        assert!(client.wait_for_ready(Some(READY_TIMEOUT)));
        let holder = client.clone();
        drop(client);
        assert!(factory.released_clients().is_empty());

        drop(holder);
        assert_eq!(transport.live_notifiers(), 0);
        assert_eq!(factory.released_clients(), vec!["nas".to_string()]);
        assert!(factory.released_clients().is_empty());

        let client = factory.get_client("nas", || TestCodec).unwrap();
        assert!(client.wait_for_ready(Some(READY_TIMEOUT)));
        assert_eq!(transport.connects(), 2);
    }

    #[test]
    fn test_released_client_is_initialized_again() {
        test_lib::before_test();

        let transport = MockTransport::new();
        let factory = factory(&transport);

        let client = factory.get_client("nas", || TestCodec).unwrap();
        assert!(client.wait_for_ready(Some(READY_TIMEOUT)));
        client.release();
        assert_eq!(client.service(), None);

        let again = factory.get_client("nas", || TestCodec).unwrap();
        assert!(Arc::ptr_eq(&client, &again));
        assert_eq!(again.service().map(|service| service.service_id), Some(0x0003));
        assert!(again.wait_for_ready(Some(READY_TIMEOUT)));
        assert_eq!(transport.connects(), 2);
    }

    #[test]
    fn test_from_config_path() {
        test_lib::before_test();

        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(CONFIG.as_bytes())
            .expect("Failed to write temp file");
        file.flush().expect("Failed to flush temp file");

        let transport: Arc<dyn Transport> = MockTransport::new();
        let factory = ClientFactory::from_config_path(transport.clone(), file.path()).unwrap();
        assert_eq!(
            factory.config().client_options().sync_timeout,
            Duration::from_millis(250)
        );

        let missing =
            ClientFactory::from_config_path(transport, Path::new("/nonexistent/qmi-client.json"));
        assert_eq!(missing.err().map(|e| e.code()), Some(ErrorCode::NoSuch));
    }
}
