use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::store::{Actuator, SensorReadings, SharedStore};

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/update_sensors", post(update_sensors))
        .route("/api/temperature", get(temperature))
        .route("/api/light_intensity", get(light_intensity))
        .route("/api/presence", get(presence))
        .route("/api/led", post(set_led))
        .route("/api/fan", post(set_fan))
        .route("/api/devices", get(devices))
        .route("/api/status", get(api_status))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

async fn index() -> &'static str {
    "Welcome to house IoT system"
}

// ---------------------------------------------------------------------------
// Sensor push
// ---------------------------------------------------------------------------

async fn update_sensors(
    State(store): State<SharedStore>,
    payload: Result<Json<SensorReadings>, JsonRejection>,
) -> impl IntoResponse {
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("rejected sensor push: {rejection}");
            store
                .record_error(format!("bad sensor push: {rejection}"))
                .await;
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid sensor data" })),
            );
        }
    };

    if let Some(light) = update.light_intensity {
        if !(0.0..=100.0).contains(&light) {
            warn!(light, "rejected sensor push: light_intensity out of range");
            store
                .record_error(format!("light_intensity {light} out of range"))
                .await;
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid light_intensity" })),
            );
        }
    }

    let led = store.apply_update(update).await;
    info!(
        temp = ?update.temperature,
        light = ?update.light_intensity,
        presence = ?update.presence,
        led = ?led,
        "sensor push applied"
    );

    (
        StatusCode::OK,
        Json(json!({ "message": "Sensor data updated" })),
    )
}

// ---------------------------------------------------------------------------
// Sensor queries
// ---------------------------------------------------------------------------

async fn temperature(State(store): State<SharedStore>) -> impl IntoResponse {
    let readings = store.readings().await;
    Json(json!({ "temperature": readings.temperature }))
}

async fn light_intensity(State(store): State<SharedStore>) -> impl IntoResponse {
    let readings = store.readings().await;
    Json(json!({ "light_intensity": readings.light_intensity }))
}

async fn presence(State(store): State<SharedStore>) -> impl IntoResponse {
    let readings = store.readings().await;
    Json(json!({ "presence": readings.presence }))
}

// ---------------------------------------------------------------------------
// Actuator commands
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ActuatorCommand {
    state: bool,
}

async fn set_led(
    State(store): State<SharedStore>,
    payload: Result<Json<ActuatorCommand>, JsonRejection>,
) -> impl IntoResponse {
    actuator_command(store, Actuator::Led, payload).await
}

async fn set_fan(
    State(store): State<SharedStore>,
    payload: Result<Json<ActuatorCommand>, JsonRejection>,
) -> impl IntoResponse {
    actuator_command(store, Actuator::Fan, payload).await
}

async fn actuator_command(
    store: SharedStore,
    which: Actuator,
    payload: Result<Json<ActuatorCommand>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Json(command) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(device = which.name(), "rejected command: {rejection}");
            store
                .record_error(format!("bad {} command: {rejection}", which.name()))
                .await;
            let error = match which {
                Actuator::Led => "Invalid LED state",
                Actuator::Fan => "Invalid fan state",
            };
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": error })));
        }
    };

    let updated = store.set_actuator(which, command.state).await;
    info!(device = which.name(), on = command.state, "command applied");

    let body = match which {
        Actuator::Led => json!({ "led": updated.led }),
        Actuator::Fan => json!({ "fan": updated.fan }),
    };
    (StatusCode::OK, Json(body))
}

// ---------------------------------------------------------------------------
// Device + status queries
// ---------------------------------------------------------------------------

async fn devices(State(store): State<SharedStore>) -> impl IntoResponse {
    Json(store.actuators().await)
}

async fn api_status(State(store): State<SharedStore>) -> impl IntoResponse {
    Json(store.status().await)
}

// ---------------------------------------------------------------------------
// Server entry-point
// ---------------------------------------------------------------------------

pub async fn serve(store: SharedStore, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "web api listening");

    axum::serve(listener, router(store))
        .await
        .context("web server error")
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RoomStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_store() -> SharedStore {
        Arc::new(RoomStore::new(20.0, 5.0))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(store: &SharedStore, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(Arc::clone(store)).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(store: &SharedStore, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(store, req).await;
        let value = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    // -- Root ---------------------------------------------------------------

    #[tokio::test]
    async fn index_serves_welcome_text() {
        let store = test_store();
        let (status, body) = send(&store, get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Welcome to house IoT system");
    }

    // -- Sensor queries -----------------------------------------------------

    #[tokio::test]
    async fn sensors_start_unknown() {
        let store = test_store();

        let (status, body) = send_json(&store, get_req("/api/temperature")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "temperature": null }));

        let (_, body) = send_json(&store, get_req("/api/light_intensity")).await;
        assert_eq!(body, serde_json::json!({ "light_intensity": null }));

        let (_, body) = send_json(&store, get_req("/api/presence")).await;
        assert_eq!(body, serde_json::json!({ "presence": null }));
    }

    // -- Sensor push --------------------------------------------------------

    #[tokio::test]
    async fn push_acks_and_is_readable() {
        let store = test_store();
        let (status, body) = send_json(
            &store,
            post_json(
                "/api/update_sensors",
                json!({ "temperature": 22.5, "light_intensity": 60.0, "presence": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Sensor data updated" }));

        let (_, body) = send_json(&store, get_req("/api/temperature")).await;
        assert_eq!(body, json!({ "temperature": 22.5 }));
        let (_, body) = send_json(&store, get_req("/api/presence")).await;
        assert_eq!(body, json!({ "presence": true }));
    }

    #[tokio::test]
    async fn partial_push_clears_missing_fields() {
        let store = test_store();
        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "temperature": 30.0 })),
        )
        .await;
        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": 50.0 })),
        )
        .await;

        let (_, body) = send_json(&store, get_req("/api/temperature")).await;
        assert_eq!(body, json!({ "temperature": null }));
    }

    #[tokio::test]
    async fn push_with_unknown_extra_fields_still_acks() {
        let store = test_store();
        let (status, _) = send_json(
            &store,
            post_json(
                "/api/update_sensors",
                json!({ "light_intensity": 50.0, "humidity": 40.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn push_rejects_ill_typed_fields() {
        let store = test_store();
        let (status, body) = send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": "bright" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid sensor data");
    }

    #[tokio::test]
    async fn push_rejects_out_of_range_light() {
        let store = test_store();

        for bad in [150.0, -5.0] {
            let (status, body) = send_json(
                &store,
                post_json("/api/update_sensors", json!({ "light_intensity": bad })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid light_intensity");
        }

        // The rejected pushes changed nothing.
        let (_, body) = send_json(&store, get_req("/api/light_intensity")).await;
        assert_eq!(body, json!({ "light_intensity": null }));
    }

    // -- Policy through the boundary ------------------------------------------

    #[tokio::test]
    async fn dark_push_turns_led_on_bright_push_turns_it_off() {
        let store = test_store();

        send_json(
            &store,
            post_json(
                "/api/update_sensors",
                json!({ "light_intensity": 10.0, "presence": true }),
            ),
        )
        .await;
        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body, json!({ "led": true, "fan": false }));

        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": 50.0 })),
        )
        .await;
        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body, json!({ "led": false, "fan": false }));
    }

    #[tokio::test]
    async fn threshold_boundary_is_strict() {
        let store = test_store();

        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": 19.9 })),
        )
        .await;
        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body["led"], true);

        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": 20.0 })),
        )
        .await;
        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body["led"], false);
    }

    #[tokio::test]
    async fn push_without_light_leaves_led_alone() {
        let store = test_store();

        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": 10.0 })),
        )
        .await;
        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "presence": false })),
        )
        .await;

        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body["led"], true);
    }

    // -- Actuator commands ----------------------------------------------------

    #[tokio::test]
    async fn led_command_roundtrip() {
        let store = test_store();
        let (status, body) =
            send_json(&store, post_json("/api/led", json!({ "state": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "led": true }));

        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body, json!({ "led": true, "fan": false }));
    }

    #[tokio::test]
    async fn fan_command_roundtrip() {
        let store = test_store();
        let (status, body) =
            send_json(&store, post_json("/api/fan", json!({ "state": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "fan": true }));

        let (_, body) = send_json(&store, post_json("/api/fan", json!({ "state": false }))).await;
        assert_eq!(body, json!({ "fan": false }));
    }

    #[tokio::test]
    async fn led_rejects_non_boolean_state() {
        let store = test_store();
        let (status, body) =
            send_json(&store, post_json("/api/led", json!({ "state": "yes" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid LED state" }));

        // No state change happened.
        let (_, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(body, json!({ "led": false, "fan": false }));
    }

    #[tokio::test]
    async fn fan_rejects_non_boolean_state() {
        let store = test_store();
        let (status, body) = send_json(&store, post_json("/api/fan", json!({ "state": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid fan state" }));
    }

    #[tokio::test]
    async fn led_rejects_missing_state_field() {
        let store = test_store();
        let (status, body) = send_json(&store, post_json("/api/led", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid LED state");
    }

    #[tokio::test]
    async fn led_rejects_empty_body() {
        let store = test_store();
        let req = Request::builder()
            .method("POST")
            .uri("/api/led")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(&store, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid LED state");
    }

    #[tokio::test]
    async fn led_get_is_not_allowed() {
        let store = test_store();
        let (status, _) = send(&store, get_req("/api/led")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    // -- Devices + status -----------------------------------------------------

    #[tokio::test]
    async fn devices_default_to_off() {
        let store = test_store();
        let (status, body) = send_json(&store, get_req("/api/devices")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "led": false, "fan": false }));
    }

    #[tokio::test]
    async fn status_reflects_activity() {
        let store = test_store();

        let (_, body) = send_json(&store, get_req("/api/status")).await;
        assert_eq!(body["last_push"], serde_json::Value::Null);
        assert_eq!(body["light_threshold_pct"], 20.0);
        assert_eq!(body["panel_light_threshold_pct"], 5.0);

        send_json(
            &store,
            post_json("/api/update_sensors", json!({ "light_intensity": 10.0 })),
        )
        .await;

        let (_, body) = send_json(&store, get_req("/api/status")).await;
        assert!(body["last_push"].is_string());
        assert_eq!(body["devices"]["led"], true);
        assert!(!body["events"].as_array().unwrap().is_empty());
    }

    // -- CORS -----------------------------------------------------------------

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let store = test_store();
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/devices")
            .header(header::ORIGIN, "http://panel.local")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = router(Arc::clone(&store)).oneshot(req).await.unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
