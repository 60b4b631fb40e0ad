//! End-to-end tests of the device binding.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use futures::StreamExt;
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;

use aquanode_device::mock::RecordingIndicators;
use aquanode_device::{
    Device, DeviceProfile, DeviceRuntime, FlowMode, Level, ResourceConfig,
    ResourceHandle, Snapshot, WriteRequest,
};
use aquanode_gateway::{create_router, GatewayConfig, GatewayState};

fn operational_device(profile: DeviceProfile) -> Device {
    let mut device = Device::new(profile.device_class());
    device.mark_connected().unwrap();
    device.mark_registered().unwrap();
    device
}

fn spawn_state(profile: DeviceProfile, config: ResourceConfig) -> (GatewayState, ResourceHandle) {
    let (handle, _task) = DeviceRuntime::spawn(config, Arc::new(RecordingIndicators::new()));
    let state = GatewayState::new(
        handle.clone(),
        operational_device(profile),
        GatewayConfig::default(),
    );
    (state, handle)
}

fn test_server(profile: DeviceProfile) -> TestServer {
    let (state, _) = spawn_state(profile, profile.resource_config());
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn health_and_status() {
    let server = test_server(DeviceProfile::Co2Dispenser);

    let health: Value = server.get("/health").await.json();
    assert_eq!(health["status"], "healthy");

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["device"], "CO2Dispenser");
    assert_eq!(status["phase"], "operational");
    assert_eq!(status["resource"], "co2Dispenser/tank");
    assert_eq!(status["supports_stop"], false);
    assert!(status["registered_at"].is_string());
}

#[tokio::test]
async fn read_uses_two_decimal_levels() {
    let server = test_server(DeviceProfile::Co2Dispenser);

    let response = server.get("/co2Dispenser/tank").await;
    response.assert_status_ok();
    response.assert_text(r#"{"level":2400.00,"mode":"off"}"#);
}

#[tokio::test]
async fn write_sets_mode_and_rate() {
    let server = test_server(DeviceProfile::Co2Dispenser);

    server
        .put("/co2Dispenser/tank")
        .form(&[("mode", "on")])
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let snapshot: Snapshot = server.get("/co2Dispenser/tank").await.json();
    assert_eq!(snapshot.mode, FlowMode::On);

    server
        .put("/co2Dispenser/tank")
        .form(&[("decrement", "12.5")])
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn partially_valid_write_succeeds() {
    let server = test_server(DeviceProfile::Co2Dispenser);

    server
        .put("/co2Dispenser/tank")
        .form(&[("mode", "on"), ("value", "-5")])
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let snapshot: Snapshot = server.get("/co2Dispenser/tank").await.json();
    assert_eq!(snapshot.mode, FlowMode::On);
}

#[tokio::test]
async fn repeated_form_fields_keep_the_first_value() {
    let server = test_server(DeviceProfile::Co2Dispenser);

    server
        .put("/co2Dispenser/tank")
        .form(&[("mode", "on"), ("value", "5"), ("decrement", "5"), ("mode", "off")])
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let snapshot: Snapshot = server.get("/co2Dispenser/tank").await.json();
    assert_eq!(snapshot.mode, FlowMode::On);
}

#[tokio::test]
async fn invalid_write_is_bad_request() {
    let server = test_server(DeviceProfile::Co2Dispenser);

    let response = server
        .put("/co2Dispenser/tank")
        .form(&[("mode", "sideways")])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");

    let snapshot: Snapshot = server.get("/co2Dispenser/tank").await.json();
    assert_eq!(snapshot.mode, FlowMode::Off);
}

#[tokio::test]
async fn delete_depends_on_profile() {
    let server = test_server(DeviceProfile::Co2Dispenser);
    let response = server.delete("/co2Dispenser/tank").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "method_not_allowed");

    let server = test_server(DeviceProfile::Co2DispenserScaled);
    server
        .put("/co2Dispenser/tank")
        .form(&[("mode", "on")])
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete("/co2Dispenser/tank")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Locked until refilled
    server
        .put("/co2Dispenser/tank")
        .form(&[("mode", "on")])
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let snapshot: Snapshot = server.get("/co2Dispenser/tank").await.json();
    assert_eq!(snapshot.mode, FlowMode::Off);
}

#[tokio::test]
async fn button_press_refills_after_forced_stop() {
    let server = test_server(DeviceProfile::Co2DispenserScaled);

    let idle: Value = server
        .post("/co2Dispenser/tank/button")
        .json(&serde_json::json!({ "held_seconds": 10 }))
        .await
        .json();
    assert_eq!(idle["refilled"], false);
    assert_eq!(idle["refill_needed"], false);

    server
        .delete("/co2Dispenser/tank")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let short: Value = server
        .post("/co2Dispenser/tank/button")
        .json(&serde_json::json!({ "held_seconds": 1 }))
        .await
        .json();
    assert_eq!(short["refilled"], false);
    assert_eq!(short["refill_needed"], true);
    assert_eq!(short["required_seconds"], 5);

    let long: Value = server
        .post("/co2Dispenser/tank/button")
        .json(&serde_json::json!({ "held_seconds": 5 }))
        .await
        .json();
    assert_eq!(long["refilled"], true);
    assert_eq!(long["snapshot"]["mode"], "on");
}

#[tokio::test]
async fn other_paths_are_not_served() {
    let server = test_server(DeviceProfile::OsmoticWaterTank);
    server
        .get("/co2Dispenser/tank")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn observe_streams_current_state_then_notifications() {
    let mut config = DeviceProfile::Co2Dispenser.resource_config();
    config.tick_interval_seconds = 1;
    let (state, handle) = spawn_state(DeviceProfile::Co2Dispenser, config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let (mut socket, _) = connect_async(format!("ws://{addr}/co2Dispenser/tank/observe"))
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let first: Snapshot = serde_json::from_str(&first.into_text().unwrap()).unwrap();
    assert_eq!(first.level, Level::from_units(2400));

    handle
        .write(WriteRequest::mode("on").with_rate("500"))
        .await
        .unwrap();

    let frame = timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let notification: Snapshot = serde_json::from_str(&frame.into_text().unwrap()).unwrap();
    assert_eq!(notification.level, Level::from_units(1900));
    assert_eq!(notification.mode, FlowMode::Off);
}
