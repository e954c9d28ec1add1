mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    controller::{Command, Controller, JournalEntry, Outcome},
    error::SettlementError,
    scenario::Scenario,
    settlement::{SettlementSnapshot, TileReport},
};

const JOURNAL_TAIL: usize = 20;

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub seed: u64,
    pub tile_size: u32,
    pub snapshot: SettlementSnapshot,
    pub journal: Vec<JournalEntry>,
}

#[derive(Clone, Serialize)]
pub struct ActionResponse {
    pub outcome: Outcome,
    pub message: String,
    pub snapshot: SettlementSnapshot,
}

#[derive(Clone)]
pub struct AppState {
    controller: Arc<Mutex<Controller>>,
    broadcaster: broadcast::Sender<String>,
    tile_size: u32,
}

impl AppState {
    pub fn new(controller: Controller, tile_size: u32) -> Self {
        let (broadcaster, _) = broadcast::channel::<String>(512);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            broadcaster,
            tile_size,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcaster.subscribe()
    }

    fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::TileOutOfRange { .. } => ApiError::BadRequest(err.to_string()),
            SettlementError::UnknownCommand(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub host: String,
    pub port: u16,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/styles.css", get(styles))
        .route("/app.js", get(script))
        .route("/api/state", get(latest_state))
        .route("/api/actions/:action", post(run_action))
        .route("/api/tiles/:row/:col", get(inspect_tile))
        .route("/api/events", get(stream_events))
        .with_state(Arc::new(state))
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        host,
        port,
    } = config;

    let controller = Controller::from_scenario(&scenario);
    let state = AppState::new(controller, scenario.map.tile_size);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(scenario = %scenario.name, "settlement UI live at http://{addr} (Ctrl+C to stop)");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down web UI");
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        assets::STYLES_CSS,
    )
}

async fn script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        assets::APP_JS,
    )
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let controller = state.controller();
    Json(StateEnvelope {
        scenario: controller.scenario_name().to_string(),
        seed: controller.seed(),
        tile_size: state.tile_size,
        snapshot: controller.snapshot(),
        journal: controller.recent_journal(JOURNAL_TAIL),
    })
}

async fn run_action(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let command: Command = action.parse()?;
    if !command.is_mutating() {
        return Err(ApiError::NotFound(format!("unknown action: {action}")));
    }

    let mut controller = state.controller();
    let broadcaster = &state.broadcaster;
    let outcome = controller.apply_with_hook(command, |snapshot| {
        match serde_json::to_string(&snapshot) {
            // No subscribers is not an error.
            Ok(payload) => {
                let _ = broadcaster.send(payload);
            }
            Err(err) => warn!("failed to encode snapshot: {err}"),
        }
    })?;

    Ok(Json(ActionResponse {
        message: outcome.to_string(),
        outcome,
        snapshot: controller.snapshot(),
    }))
}

async fn inspect_tile(
    State(state): State<Arc<AppState>>,
    Path((row, col)): Path<(i64, i64)>,
) -> Result<Json<TileReport>, ApiError> {
    let outcome = state
        .controller()
        .apply(Command::InspectTile { row, col })?;
    match outcome {
        Outcome::Inspected(report) => Ok(Json(report)),
        other => Err(ApiError::BadRequest(format!("unexpected outcome: {other}"))),
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileKind;

    fn app_state() -> Arc<AppState> {
        let scenario = Scenario {
            seed: Some(9),
            ..Scenario::default()
        };
        Arc::new(AppState::new(Controller::from_scenario(&scenario), 40))
    }

    #[tokio::test]
    async fn action_updates_state_and_broadcasts() {
        let state = app_state();
        let mut rx = state.subscribe();

        let Json(response) = run_action(State(state.clone()), Path("hunt-food".into()))
            .await
            .unwrap();

        assert_eq!(response.snapshot.resources.food, 12);
        assert_eq!(response.message, "gathered 2 food, now 12");

        let payload = rx.try_recv().unwrap();
        assert!(payload.contains("\"food\":12"));

        let Json(envelope) = latest_state(State(state)).await;
        assert_eq!(envelope.snapshot.resources.food, 12);
        assert_eq!(envelope.journal.len(), 1);
    }

    #[tokio::test]
    async fn unaffordable_build_does_not_broadcast() {
        let state = app_state();
        let mut rx = state.subscribe();

        let Json(response) = run_action(State(state.clone()), Path("build-hut".into()))
            .await
            .unwrap();

        assert_eq!(response.snapshot.max_population, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_and_inspect_actions_are_not_found() {
        let state = app_state();

        let err = run_action(State(state.clone()), Path("dance".into()))
            .await
            .err();
        assert!(matches!(err, Some(ApiError::NotFound(_))));

        let err = run_action(State(state), Path("inspect:1,1".into()))
            .await
            .err();
        assert!(matches!(err, Some(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn tile_inspection() {
        let state = app_state();

        let Json(report) = inspect_tile(State(state.clone()), Path((3, 4))).await.unwrap();
        assert_eq!((report.tile.row, report.tile.col), (3, 4));
        let expected = state.controller().snapshot().tiles[3][4];
        assert_eq!(report.tile.kind, expected);

        let err = inspect_tile(State(state), Path((10, 0))).await.err();
        assert!(matches!(err, Some(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn event_stream_carries_snapshot_after_action() {
        let state = app_state();
        let mut body = stream_events(State(state.clone()))
            .await
            .into_response()
            .into_body()
            .into_data_stream();

        let Json(response) = run_action(State(state), Path("gather-wood".into()))
            .await
            .unwrap();
        assert_eq!(response.snapshot.hut.wood, 10);

        let chunk = body.next().await.unwrap().unwrap();
        let event = String::from_utf8_lossy(&chunk);
        assert!(event.starts_with("data: "), "unexpected event {event}");
        assert!(event.contains("\"wood\":1"));
        assert!(event.contains("\"population_display\":\"1/1\""));
    }

    #[test]
    fn snapshot_serializes_tile_names() {
        let state = app_state();
        let snapshot = state.controller().snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let kinds = [TileKind::Grass, TileKind::Forest, TileKind::Rock, TileKind::Water];
        assert!(kinds.iter().any(|k| json.contains(&format!("\"{}\"", k.as_str()))));
    }
}
