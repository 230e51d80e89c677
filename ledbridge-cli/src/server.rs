//! HTTP front-end.
//!
//! Three routes:
//!
//! - `GET /` connects if needed and renders the control page
//! - `POST /` dispatches a `command` form field
//! - `GET /api/status` reports the connection flag and LED state as JSON
//!
//! Device problems never become HTTP errors; they show up as the page message.

use anyhow::Context;
use axum::{
    Form, Json, Router,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use ledbridge::{Command, ConnectOutcome, LedSnapshot, LinkHandle, LinkStatus};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::config::PostMode;
use crate::page::IndexPage;

const CONNECTED: &str = "Connected to Arduino";
const NOT_CONNECTED: &str = "Could not connect to Arduino";
const INVALID_COMMAND: &str = "Invalid command";
const STATE_UNKNOWN: &str = "LED state unknown";

#[derive(Clone)]
struct AppState {
    link: LinkHandle,
    post_mode: PostMode,
}

/// Build the application router.
pub fn router(link: LinkHandle, post_mode: PostMode) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/api/status", get(status))
        .with_state(AppState { link, post_mode })
}

/// Serve `app` on `addr` until Ctrl-C.
pub async fn run(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Couldn't bind on {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Display-only parameters carried by the post-redirect.
#[derive(Debug, Default, Deserialize)]
struct IndexQuery {
    last_command: Option<String>,
    message: Option<String>,
    led1: Option<String>,
    led2: Option<String>,
    led3: Option<String>,
}

impl IndexQuery {
    fn led_states(&self, current: LedSnapshot) -> LedSnapshot {
        let flag = |value: Option<&str>, fallback: bool| value.map_or(fallback, |v| v == "true");
        LedSnapshot {
            led1: flag(self.led1.as_deref(), current.led1),
            led2: flag(self.led2.as_deref(), current.led2),
            led3: flag(self.led3.as_deref(), current.led3),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResultQuery<'a> {
    last_command: &'a str,
    message: &'a str,
    led1: bool,
    led2: bool,
    led3: bool,
}

#[derive(Debug, Deserialize)]
struct CommandForm {
    command: Option<String>,
}

async fn index(
    State(state): State<AppState>,
    query: Result<Query<IndexQuery>, QueryRejection>,
) -> Html<String> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => {
            debug!("Ignoring query string: {e}");
            IndexQuery::default()
        },
    };

    let connect_message = match state
        .link
        .ensure_connected()
        .await
    {
        Ok(ConnectOutcome::AlreadyConnected) => None,
        Ok(ConnectOutcome::Connected(_)) => Some(CONNECTED.to_string()),
        Ok(ConnectOutcome::Failed(reason)) => {
            debug!("Connect on page load failed: {reason}");
            Some(NOT_CONNECTED.to_string())
        },
        Err(e) => Some(e.to_string()),
    };

    let current = current_leds(&state.link).await;
    let page = if query.message.is_some() {
        IndexPage {
            led_states: query.led_states(current),
            message: query.message,
            last_command: query.last_command,
        }
    } else {
        IndexPage {
            led_states: query.led_states(current),
            message: connect_message,
            last_command: None,
        }
    };

    Html(page.render())
}

async fn submit(
    State(state): State<AppState>,
    form: Result<Form<CommandForm>, FormRejection>,
) -> Response {
    let token = form
        .ok()
        .and_then(|Form(form)| form.command);
    let Some(command) = token
        .as_deref()
        .and_then(|t| t.parse::<Command>().ok())
    else {
        warn!("Rejected command {token:?}");
        let page = IndexPage {
            message: Some(INVALID_COMMAND.to_string()),
            last_command: None,
            led_states: current_leds(&state.link).await,
        };
        return Html(page.render()).into_response();
    };

    let dispatched = match state
        .link
        .dispatch(command)
        .await
    {
        Ok(dispatched) => dispatched,
        Err(e) => {
            error!("Dispatch of {command} failed: {e}");
            let page = IndexPage {
                message: Some(format!("{e} ({STATE_UNKNOWN})")),
                last_command: Some(command.to_string()),
                led_states: LedSnapshot::default(),
            };
            return Html(page.render()).into_response();
        },
    };

    let message = dispatched
        .outcome
        .to_string();
    let last_command = dispatched
        .command
        .to_string();
    let page = IndexPage {
        message: Some(message),
        last_command: Some(last_command),
        led_states: dispatched.led_states,
    };

    match state.post_mode {
        PostMode::Render => Html(page.render()).into_response(),
        PostMode::Redirect => match redirect_query(&page) {
            Ok(query) => Redirect::to(&format!("/?{query}")).into_response(),
            Err(e) => {
                error!("Failed to encode redirect: {e}");
                Html(page.render()).into_response()
            },
        },
    }
}

fn redirect_query(page: &IndexPage) -> Result<String, serde_urlencoded::ser::Error> {
    serde_urlencoded::to_string(ResultQuery {
        last_command: page
            .last_command
            .as_deref()
            .unwrap_or_default(),
        message: page
            .message
            .as_deref()
            .unwrap_or_default(),
        led1: page.led_states.led1,
        led2: page.led_states.led2,
        led3: page.led_states.led3,
    })
}

async fn status(State(state): State<AppState>) -> Result<Json<LinkStatus>, (StatusCode, String)> {
    state
        .link
        .status()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn current_leds(link: &LinkHandle) -> LedSnapshot {
    match link.status().await {
        Ok(status) => status.led_states,
        Err(e) => {
            error!("Status unavailable: {e}");
            LedSnapshot::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use ledbridge::mock::ScriptedDevice;
    use ledbridge::{DeviceLink, LinkConfig};
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(device: &ScriptedDevice, post_mode: PostMode) -> Router {
        let config = LinkConfig::default().with_delays(Duration::ZERO, Duration::ZERO);
        let link = LinkHandle::spawn(DeviceLink::new(device.clone(), config)).unwrap();
        router(link, post_mode)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone()
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn status_json(app: &Router) -> serde_json::Value {
        let response = send(app, get("/api/status")).await;
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn location_params(response: &Response) -> HashMap<String, String> {
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        let query = location
            .strip_prefix("/?")
            .unwrap();
        serde_urlencoded::from_str(query).unwrap()
    }

    #[tokio::test]
    async fn test_status_before_any_connection() {
        let app = app(&ScriptedDevice::arduino(), PostMode::Redirect);
        let json = status_json(&app).await;
        assert_eq!(
            json,
            serde_json::json!({
                "connected": false,
                "led_states": {"1": false, "2": false, "3": false}
            })
        );
    }

    #[tokio::test]
    async fn test_index_connects_once() {
        let device = ScriptedDevice::arduino();
        let app = app(&device, PostMode::Redirect);

        let first = body_text(send(&app, get("/")).await).await;
        assert!(first.contains("Connected to Arduino"));

        let second = body_text(send(&app, get("/")).await).await;
        assert!(!second.contains("Connected to Arduino"));
        assert_eq!(device.open_count(), 1);
        assert_eq!(status_json(&app).await["connected"], true);
    }

    #[tokio::test]
    async fn test_index_without_device() {
        let app = app(&ScriptedDevice::absent(), PostMode::Redirect);
        let response = send(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Could not connect to Arduino"));
    }

    #[tokio::test]
    async fn test_invalid_command_never_reaches_device() {
        let device = ScriptedDevice::arduino();
        let app = app(&device, PostMode::Redirect);

        for body in ["command=blink", "command=ON1", "command=", "other=on1", ""] {
            let response = send(&app, post_form(body)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_text(response).await.contains("Invalid command"));
        }
        assert_eq!(device.open_count(), 0);
        assert!(device.written_lines().is_empty());
    }

    #[tokio::test]
    async fn test_post_renders_reply_in_place() {
        let device = ScriptedDevice::arduino().with_reply("OK\n");
        let app = app(&device, PostMode::Render);

        let response = send(&app, post_form("command=on1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Command &#x27;on1&#x27; result: OK"));

        let json = status_json(&app).await;
        assert_eq!(json["led_states"]["1"], true);
        assert_eq!(json["led_states"]["2"], false);
        assert_eq!(device.written_lines(), vec!["on1"]);
    }

    #[tokio::test]
    async fn test_post_redirects_with_outcome() {
        let device = ScriptedDevice::arduino();
        let app = app(&device, PostMode::Redirect);

        send(&app, post_form("command=on2")).await;
        let response = send(&app, post_form("command=off2")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let params = location_params(&response);
        assert_eq!(params["last_command"], "off2");
        assert_eq!(params["message"], "Command sent (no response)");
        assert_eq!(params["led1"], "false");
        assert_eq!(params["led2"], "false");
        assert_eq!(params["led3"], "false");
        assert_eq!(status_json(&app).await["led_states"]["2"], false);
    }

    #[tokio::test]
    async fn test_post_without_device_leaves_state() {
        let device = ScriptedDevice::absent();
        let app = app(&device, PostMode::Redirect);

        let response = send(&app, post_form("command=on3")).await;
        let params = location_params(&response);
        assert_eq!(params["message"], "Connection failed");
        assert_eq!(params["led3"], "false");
        assert_eq!(status_json(&app).await["led_states"]["3"], false);
    }

    #[tokio::test]
    async fn test_index_displays_redirect_parameters() {
        let app = app(&ScriptedDevice::arduino(), PostMode::Redirect);

        let response = send(
            &app,
            get("/?last_command=on1&message=OK&led1=true&led2=false&led3=false"),
        )
        .await;
        let body = body_text(response).await;
        assert!(body.contains("Command &#x27;on1&#x27; result: OK"));
        assert!(!body.contains("Connected to Arduino"));
        assert_eq!(body.matches("lamp on").count(), 1);

        // Display only: state is untouched
        assert_eq!(status_json(&app).await["led_states"]["1"], false);
    }

    /// Backend whose enumeration panics, taking the device worker down.
    struct CrashingBackend;

    impl ledbridge::SerialBackend for CrashingBackend {
        fn list_ports(&self) -> ledbridge::Result<Vec<ledbridge::PortInfo>> {
            panic!("enumeration crashed");
        }

        fn open(
            &self,
            _config: &ledbridge::SerialConfig,
        ) -> ledbridge::Result<Box<dyn ledbridge::Port>> {
            panic!("open crashed");
        }
    }

    #[tokio::test]
    async fn test_stopped_worker_reports_unknown_state() {
        let link = LinkHandle::spawn(DeviceLink::new(CrashingBackend, LinkConfig::default())).unwrap();
        let app = router(link, PostMode::Render);

        let response = send(&app, post_form("command=on1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("LED state unknown"));

        let response = send(&app, get("/api/status")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
