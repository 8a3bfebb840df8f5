// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the local network transport using wiremock.

use std::time::Duration;

use hearthlink::transport::{ConnectParams, LocalNetworkConfig};
use hearthlink::{
    ConnectionPhase, DeviceId, DispatchOutcome, Error, Home, HomeConfig, LogAction, TransportError,
    TransportKind,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn device_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    server
}

fn params(server: &MockServer) -> ConnectParams {
    let address = server.address();
    ConnectParams::LocalNetwork(
        LocalNetworkConfig::new(address.ip().to_string()).with_port(address.port()),
    )
}

fn live_home() -> Home {
    Home::new(HomeConfig::new().with_demo_mode(false))
}

/// Returns the `q` values of every command request, oldest first.
async fn sent_commands(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/command")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

async fn wait_for_commands(server: &MockServer, count: usize) -> Vec<String> {
    for _ in 0..100 {
        let sent = sent_commands(server).await;
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    sent_commands(server).await
}

// ============================================================================
// Handshake
// ============================================================================

mod handshake {
    use super::*;

    #[tokio::test]
    async fn connects_and_logs_endpoint() {
        let server = device_server().await;
        let home = live_home();

        let state = home.connect(params(&server)).await.unwrap();

        assert_eq!(state.phase, ConnectionPhase::Connected);
        assert_eq!(state.transport, Some(TransportKind::LocalNetwork));
        assert_eq!(state.endpoint.as_deref(), Some("127.0.0.1"));

        let entry = &home.activity()[0];
        assert_eq!(entry.action, LogAction::Connected);
        assert_eq!(entry.details.as_deref(), Some("via Wi-Fi to 127.0.0.1"));
    }

    #[tokio::test]
    async fn any_status_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let home = live_home();
        assert!(home.connect(params(&server)).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_address_fails_without_network() {
        let home = live_home();

        let result = home
            .connect(ConnectParams::local_network("300.1.1.1"))
            .await;

        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::InvalidAddress(_)))
        ));
        let state = home.connection();
        assert_eq!(state.phase, ConnectionPhase::Error);
        assert_eq!(state.error.as_deref(), Some("invalid address: 300.1.1.1"));
        assert_eq!(home.activity()[0].action, LogAction::Error);
    }

    #[tokio::test]
    async fn unreachable_host_fails_handshake() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let home = live_home();

        let result = home
            .connect(ConnectParams::LocalNetwork(
                LocalNetworkConfig::new("127.0.0.1")
                    .with_port(port)
                    .with_handshake_timeout(Duration::from_millis(300)),
            ))
            .await;

        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::HandshakeFailed(_)))
        ));
        assert!(!home.connection().connected);
    }
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[tokio::test]
    async fn power_command_is_sent_as_query() {
        let server = device_server().await;
        Mock::given(method("GET"))
            .and(path("/command"))
            .and(query_param("q", "L1:ON"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let home = live_home();
        home.connect(params(&server)).await.unwrap();

        let outcome = home.set_power(&DeviceId::from("1"), true).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert!(home.device(&DeviceId::from("1")).unwrap().is_on);
        assert_eq!(home.activity()[0].action, LogAction::PowerOn);
    }

    #[tokio::test]
    async fn failed_write_rolls_back() {
        let server = device_server().await;
        Mock::given(method("GET"))
            .and(path("/command"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let home = live_home();
        home.connect(params(&server)).await.unwrap();
        let fan = DeviceId::from("2");

        let outcome = home.set_power(&fan, true).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::RolledBack);
        assert!(!home.device(&fan).unwrap().is_on);

        let entry = &home.activity()[0];
        assert_eq!(entry.action, LogAction::Error);
        assert_eq!(entry.device_name, "Ceiling Fan");
        assert_eq!(entry.details.as_deref(), Some("Connection failed"));

        let state = home.connection();
        assert!(state.connected);
        assert_eq!(
            state.error.as_deref(),
            Some("HTTP 500 - Internal Server Error")
        );
    }

    #[tokio::test]
    async fn level_burst_is_throttled() {
        let server = device_server().await;
        Mock::given(method("GET"))
            .and(path("/command"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let home = live_home();
        home.connect(params(&server)).await.unwrap();
        let light = DeviceId::from("1");

        for value in [0, 25, 50, 75, 100] {
            home.set_value(&light, value).unwrap();
        }
        assert_eq!(home.device(&light).unwrap().value.value(), 100);

        let sent = wait_for_commands(&server, 2).await;
        // Let any stray write land before asserting the count
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(sent, ["L1:VAL:0", "L1:VAL:100"]);
        assert_eq!(sent_commands(&server).await.len(), 2);
    }

    #[tokio::test]
    async fn level_is_clamped_before_sending() {
        let server = device_server().await;
        Mock::given(method("GET"))
            .and(path("/command"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let home = live_home();
        home.connect(params(&server)).await.unwrap();

        home.set_value(&DeviceId::from("4"), 250).unwrap();

        assert_eq!(wait_for_commands(&server, 1).await, ["A1:VAL:100"]);
    }

    #[tokio::test]
    async fn demo_mode_keeps_commands_local() {
        let server = device_server().await;
        let home = live_home();
        home.connect(params(&server)).await.unwrap();
        home.set_demo_mode(true);

        let outcome = home.set_power(&DeviceId::from("3"), true).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Applied);
        assert!(sent_commands(&server).await.is_empty());
    }

    #[tokio::test]
    async fn nothing_is_sent_after_disconnect() {
        let server = device_server().await;
        let home = live_home();
        home.connect(params(&server)).await.unwrap();

        assert!(home.disconnect().await);
        let outcome = home.set_power(&DeviceId::from("1"), true).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Applied);
        assert!(sent_commands(&server).await.is_empty());
        assert_eq!(home.connection().phase, ConnectionPhase::Idle);
    }
}
