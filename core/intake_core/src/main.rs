use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use intake_core::{
    build_report,
    catalog::Catalog,
    config::{EngineConfig, Thresholds, TrendWindow, PRESETS},
    entry::EntryForm,
    export, next_participant_id,
    parse::bounded_or,
    quality::{self, DEFAULT_OUTLIER_MG},
    timefmt,
    trends::{self, BinStats, PeriodSummary, ShortTermAlert},
    DailyRecord, Participant, ParticipantId, RecordStore, Sensitivity, SqliteStore, StoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 17600;
const DEFAULT_AGE: u8 = 20;

#[derive(Parser, Debug)]
#[command(name = "intake_core", version)]
struct Args {
    /// Listen address.
    ///
    /// Accepts:
    /// - ip:port (recommended), e.g. 127.0.0.1:17600
    /// - ip (implies port 17600), e.g. 127.0.0.1
    #[arg(long, default_value = "127.0.0.1:17600")]
    listen: String,

    /// SQLite database path.
    #[arg(long, default_value = "./data/intake-core.db")]
    db: PathBuf,

    /// Engine preset used when the database has no stored configuration yet
    /// (standard, compact, insights).
    #[arg(long, default_value = "standard")]
    preset: String,
}

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<SqliteStore>>,
    config: Arc<Mutex<EngineConfig>>,
}

#[derive(Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

#[derive(Serialize)]
struct ErrResponse {
    ok: bool,
    error: &'static str,
}

#[derive(Deserialize)]
struct RangeQuery {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

#[derive(Deserialize)]
struct RecordsQuery {
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    threshold_mg: Option<u32>,
}

#[derive(Deserialize)]
struct SettingsUpdate {
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    catalog: Option<Catalog>,
    #[serde(default)]
    thresholds: Option<ThresholdsPatch>,
    #[serde(default)]
    trend: Option<TrendWindowPatch>,
    #[serde(default)]
    correlations: Option<bool>,
}

/// Any subset of [`Thresholds`]; absent fields keep their current value.
#[derive(Deserialize)]
struct ThresholdsPatch {
    level_low_below: Option<f64>,
    level_high_above: Option<f64>,
    late_hour: Option<u8>,
    late_min_total: Option<f64>,
    short_sleep_hours: Option<f64>,
    high_total: Option<f64>,
    alert_band_min: Option<f64>,
    alert_band_max: Option<f64>,
    amplify_score: Option<u8>,
    amplify_min_total: Option<f64>,
    high_sensitivity_ceiling: Option<f64>,
    low_sensitivity_ceiling: Option<f64>,
}

impl ThresholdsPatch {
    fn apply(self, t: &mut Thresholds) {
        if let Some(v) = self.level_low_below {
            t.level_low_below = v;
        }
        if let Some(v) = self.level_high_above {
            t.level_high_above = v;
        }
        if let Some(v) = self.late_hour {
            t.late_hour = v;
        }
        if let Some(v) = self.late_min_total {
            t.late_min_total = v;
        }
        if let Some(v) = self.short_sleep_hours {
            t.short_sleep_hours = v;
        }
        if let Some(v) = self.high_total {
            t.high_total = v;
        }
        if let Some(v) = self.alert_band_min {
            t.alert_band_min = v;
        }
        if let Some(v) = self.alert_band_max {
            t.alert_band_max = v;
        }
        if let Some(v) = self.amplify_score {
            t.amplify_score = v;
        }
        if let Some(v) = self.amplify_min_total {
            t.amplify_min_total = v;
        }
        if let Some(v) = self.high_sensitivity_ceiling {
            t.high_sensitivity_ceiling = v;
        }
        if let Some(v) = self.low_sensitivity_ceiling {
            t.low_sensitivity_ceiling = v;
        }
    }
}

#[derive(Deserialize)]
struct TrendWindowPatch {
    window_days: Option<usize>,
    min_records: Option<usize>,
    pattern_min_days: Option<usize>,
    bin_min_records: Option<usize>,
}

impl TrendWindowPatch {
    fn apply(self, w: &mut TrendWindow) {
        if let Some(v) = self.window_days {
            w.window_days = v;
        }
        if let Some(v) = self.min_records {
            w.min_records = v;
        }
        if let Some(v) = self.pattern_min_days {
            w.pattern_min_days = v;
        }
        if let Some(v) = self.bin_min_records {
            w.bin_min_records = v;
        }
    }
}

/// `current` with `req` layered on top: a preset replaces everything first, then each given
/// field overrides. The result must validate.
fn merge_settings(current: &EngineConfig, req: SettingsUpdate) -> Result<EngineConfig, &'static str> {
    let mut config = match req.preset.as_deref() {
        Some(name) => EngineConfig::preset(name).ok_or("invalid_preset")?,
        None => current.clone(),
    };
    if let Some(v) = req.catalog {
        config.catalog = v;
    }
    if let Some(patch) = req.thresholds {
        patch.apply(&mut config.thresholds);
    }
    if let Some(patch) = req.trend {
        patch.apply(&mut config.trend);
    }
    if let Some(v) = req.correlations {
        config.correlations = v;
    }
    config.validate()?;
    Ok(config)
}

#[derive(Deserialize)]
struct ParticipantCreate {
    /// Generated when absent.
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    age: Option<Value>,
    #[serde(default)]
    sex: Option<String>,
    #[serde(default)]
    sensitivity: Option<String>,
    #[serde(default)]
    screen_time_evening: Option<String>,
    #[serde(default)]
    sport: Option<bool>,
}

#[derive(Deserialize)]
struct ParticipantDeleteRequest {
    participant_id: String,
    #[serde(default)]
    delete_records: bool,
}

#[derive(Serialize)]
struct ParticipantDeleted {
    participant_id: ParticipantId,
    records_deleted: usize,
}

#[derive(Deserialize)]
struct RecordDeleteRequest {
    participant_id: String,
    date: String,
}

#[derive(Serialize)]
struct Dashboard {
    participant_id: ParticipantId,
    summary: PeriodSummary,
    alert: ShortTermAlert,
    bins: Vec<BinStats>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_core=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let defaults = EngineConfig::preset(&args.preset).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown --preset '{}'. Expected one of: {}",
            args.preset,
            PRESETS.join(", ")
        )
    })?;

    let mut store = SqliteStore::open(&args.db)?;
    let config = store.load_or_init_config(&defaults, OffsetDateTime::now_utc())?;

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        config: Arc::new(Mutex::new(config)),
    };

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(health))
        .route("/catalog", get(get_catalog))
        .route(
            "/settings",
            get(get_settings).post(post_settings).options(options_ok),
        )
        .route(
            "/participants",
            get(get_participants)
                .post(post_participant)
                .options(options_ok),
        )
        .route("/participants/next_id", get(get_next_id))
        .route(
            "/participants/delete",
            post(post_participant_delete).options(options_ok),
        )
        .route("/participants/:id/records", get(get_participant_records))
        .route("/participants/:id/report", get(get_participant_report))
        .route("/participants/:id/dashboard", get(get_participant_dashboard))
        .route("/records", post(post_record).options(options_ok))
        .route("/records/delete", post(post_record_delete).options(options_ok))
        .route("/quality", get(get_quality))
        .route("/export/csv", get(get_export_csv))
        .with_state(state)
        .layer(cors);

    let addr = parse_listen(&args.listen)?;
    info!("Core listening on http://{addr}");
    info!("DB: {}", args.db.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn parse_listen(input: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Some((host, port_str)) = input.rsplit_once(':') {
        if host == "localhost" {
            let port: u16 = port_str.parse().map_err(|_| {
                anyhow::anyhow!(
                    "invalid --listen '{}': bad port. Example: 127.0.0.1:{}",
                    input,
                    DEFAULT_PORT
                )
            })?;
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), port));
        }
    }

    if input == "localhost" {
        return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), DEFAULT_PORT));
    }

    Err(anyhow::anyhow!(
        "invalid --listen '{}'. Use ip:port (e.g. 127.0.0.1:{}) or ip (e.g. 127.0.0.1).",
        input,
        DEFAULT_PORT
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

async fn options_ok() -> impl IntoResponse {
    StatusCode::OK
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(OkResponse {
        ok: true,
        data: Some(data),
    })
    .into_response()
}

fn fail(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrResponse { ok: false, error })).into_response()
}

fn store_failure(op: &str, err: StoreError) -> Response {
    let status = match &err {
        StoreError::DuplicateKey { .. } => StatusCode::CONFLICT,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Sql(_) | StoreError::Io(_) | StoreError::Corrupt { .. } => {
            error!("{op} failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    fail(status, err.code())
}

/// Empty strings count as "no bound".
fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<(Option<Date>, Option<Date>), Response> {
    let bound = |s: Option<&str>| -> Result<Option<Date>, Response> {
        match s.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => timefmt::parse_day(s)
                .map(Some)
                .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "invalid_date")),
        }
    };
    Ok((bound(start)?, bound(end)?))
}

fn parse_participant(raw: &str) -> Result<ParticipantId, Response> {
    ParticipantId::parse(raw).ok_or_else(|| fail(StatusCode::BAD_REQUEST, "invalid_participant_id"))
}

#[derive(Serialize)]
struct HealthInfo {
    service: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(OkResponse {
        ok: true,
        data: Some(HealthInfo {
            service: "intake_core",
            version: env!("CARGO_PKG_VERSION"),
        }),
    })
}

async fn get_catalog(State(state): State<AppState>) -> Response {
    let catalog = { state.config.lock().await.catalog.clone() };
    ok(catalog)
}

async fn get_settings(State(state): State<AppState>) -> Response {
    let config = { state.config.lock().await.clone() };
    ok(config)
}

async fn post_settings(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let req: SettingsUpdate = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "invalid_json"),
    };

    let mut guard = state.config.lock().await;
    let config = match merge_settings(&guard, req) {
        Ok(c) => c,
        Err(code) => {
            warn!("settings rejected: {code}");
            return fail(StatusCode::BAD_REQUEST, code);
        }
    };

    {
        let mut store = state.store.lock().await;
        if let Err(err) = store.save_config(&config, OffsetDateTime::now_utc()) {
            return store_failure("save_config", err);
        }
    }

    *guard = config.clone();
    info!("settings updated");
    ok(config)
}

async fn get_participants(State(state): State<AppState>) -> Response {
    let store = state.store.lock().await;
    match store.list_participants() {
        Ok(v) => ok(v),
        Err(err) => store_failure("list_participants", err),
    }
}

async fn get_next_id(State(state): State<AppState>) -> Response {
    let store = state.store.lock().await;
    match store.list_participants() {
        Ok(v) => ok(next_participant_id(v.iter().map(|p| &p.participant_id))),
        Err(err) => store_failure("list_participants", err),
    }
}

async fn post_participant(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let req: ParticipantCreate = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "invalid_json"),
    };

    let mut store = state.store.lock().await;
    let participant_id = match req.participant_id.as_deref() {
        Some(raw) => match parse_participant(raw) {
            Ok(id) => id,
            Err(resp) => return resp,
        },
        None => match store.list_participants() {
            Ok(v) => next_participant_id(v.iter().map(|p| &p.participant_id)),
            Err(err) => return store_failure("list_participants", err),
        },
    };

    let participant = Participant {
        participant_id,
        age: bounded_or(req.age.as_ref(), DEFAULT_AGE, 10, 100),
        sex: req.sex.filter(|s| !s.trim().is_empty()),
        sensitivity: req.sensitivity.as_deref().and_then(Sensitivity::parse),
        screen_time_evening: req.screen_time_evening.filter(|s| !s.trim().is_empty()),
        sport: req.sport,
        created_at: OffsetDateTime::now_utc(),
    };
    match store.append_participant(participant.clone()) {
        Ok(()) => {
            info!("participant {} registered", participant.participant_id);
            ok(participant)
        }
        Err(err) => store_failure("append_participant", err),
    }
}

async fn post_participant_delete(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let req: ParticipantDeleteRequest = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "invalid_json"),
    };
    let participant_id = match parse_participant(&req.participant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut store = state.store.lock().await;
    match store.delete_participant(&participant_id, req.delete_records) {
        Ok(records_deleted) => {
            info!("participant {participant_id} deleted ({records_deleted} records removed)");
            ok(ParticipantDeleted {
                participant_id,
                records_deleted,
            })
        }
        Err(err) => store_failure("delete_participant", err),
    }
}

async fn get_participant_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<RangeQuery>,
) -> Response {
    let participant_id = match parse_participant(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let (start, end) = match parse_range(q.start.as_deref(), q.end.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let store = state.store.lock().await;
    match store.list_records(&participant_id) {
        Ok(records) => ok(trends::select_range(&records, start, end)),
        Err(err) => store_failure("list_records", err),
    }
}

async fn get_participant_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<RangeQuery>,
) -> Response {
    let participant_id = match parse_participant(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let (start, end) = match parse_range(q.start.as_deref(), q.end.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let (participant, history) = {
        let store = state.store.lock().await;
        let participant = match store.get_participant(&participant_id) {
            Ok(v) => v,
            Err(err) => return store_failure("get_participant", err),
        };
        match store.list_records(&participant_id) {
            Ok(records) => (participant, records),
            Err(err) => return store_failure("list_records", err),
        }
    };
    let config = { state.config.lock().await.clone() };
    ok(build_report(participant.as_ref(), &history, start, end, &config))
}

async fn get_participant_dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<RangeQuery>,
) -> Response {
    let participant_id = match parse_participant(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let (start, end) = match parse_range(q.start.as_deref(), q.end.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let history = {
        let store = state.store.lock().await;
        match store.list_records(&participant_id) {
            Ok(v) => v,
            Err(err) => return store_failure("list_records", err),
        }
    };
    let config = { state.config.lock().await.clone() };
    let records = trends::select_range(&history, start, end);
    ok(Dashboard {
        participant_id,
        summary: trends::period_summary(&records, &config.thresholds),
        alert: trends::short_term_alert(&records, &config.thresholds),
        bins: trends::bin_by_level(&records, &config.thresholds),
    })
}

async fn post_record(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let form: EntryForm = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "invalid_json"),
    };
    let catalog = { state.config.lock().await.catalog.clone() };
    let record = match form.derive(&catalog, OffsetDateTime::now_utc()) {
        Ok(r) => r,
        Err(err) => {
            warn!("entry rejected: {err}");
            return fail(StatusCode::BAD_REQUEST, err.code());
        }
    };

    let mut store = state.store.lock().await;
    match store.append_record(record.clone()) {
        Ok(()) => ok(record),
        Err(err) => store_failure("append_record", err),
    }
}

async fn post_record_delete(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let req: RecordDeleteRequest = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "invalid_json"),
    };
    let participant_id = match parse_participant(&req.participant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(date) = timefmt::parse_day(&req.date) else {
        return fail(StatusCode::BAD_REQUEST, "invalid_date");
    };

    let mut store = state.store.lock().await;
    match store.delete_record(&participant_id, date) {
        Ok(()) => ok(intake_core::model::record_key(&participant_id, date)),
        Err(err) => store_failure("delete_record", err),
    }
}

/// One participant's records when `participant_id` is given, otherwise everyone's; always
/// limited to the requested date range.
async fn load_records(state: &AppState, q: &RecordsQuery) -> Result<Vec<DailyRecord>, Response> {
    let (start, end) = parse_range(q.start.as_deref(), q.end.as_deref())?;
    let participant_id = match q.participant_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(parse_participant(raw)?),
        None => None,
    };

    let store = state.store.lock().await;
    let mut records = match &participant_id {
        Some(id) => store.list_records(id),
        None => store.list_all_records(),
    }
    .map_err(|err| store_failure("list_records", err))?;
    records.retain(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e));
    Ok(records)
}

async fn get_quality(State(state): State<AppState>, Query(q): Query<RecordsQuery>) -> Response {
    let records = match load_records(&state, &q).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let threshold = q.threshold_mg.unwrap_or(DEFAULT_OUTLIER_MG);
    ok(quality::outliers(&records, threshold))
}

async fn get_export_csv(State(state): State<AppState>, Query(q): Query<RecordsQuery>) -> Response {
    let records = match load_records(&state, &q).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let csv = export::records_csv(&records);
    (
        StatusCode::OK,
        [("content-type", "text/csv; charset=utf-8")],
        csv,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_listen_accepts_common_forms() {
        assert_eq!(
            parse_listen("127.0.0.1:18000").unwrap(),
            "127.0.0.1:18000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(parse_listen("0.0.0.0").unwrap().port(), DEFAULT_PORT);
        assert_eq!(
            parse_listen("localhost:9000").unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(parse_listen("localhost").unwrap().port(), DEFAULT_PORT);
        assert!(parse_listen("localhost:http").is_err());
        assert!(parse_listen("example.com:80").is_err());
    }

    #[test]
    fn parse_range_treats_blank_as_open() {
        let (start, end) = parse_range(Some(" "), Some("2026-02-15")).ok().unwrap();
        assert!(start.is_none());
        assert_eq!(end, timefmt::parse_day("2026-02-15"));
        assert!(parse_range(Some("15/02/2026"), None).is_err());
    }

    #[test]
    fn store_errors_map_to_http_status() {
        let resp = store_failure("t", StoreError::DuplicateKey { key: "P001@2026-02-15".into() });
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = store_failure("t", StoreError::NotFound { key: "P001".into() });
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = store_failure("t", StoreError::Corrupt { details: "x".into() });
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn test_state(config: EngineConfig) -> AppState {
        AppState {
            store: Arc::new(Mutex::new(SqliteStore::open_in_memory().unwrap())),
            config: Arc::new(Mutex::new(config)),
        }
    }

    #[test]
    fn merge_settings_layers_nested_fields_over_current() {
        let current = EngineConfig::preset("compact").unwrap();
        let req: SettingsUpdate = serde_json::from_value(serde_json::json!({
            "thresholds": { "high_total": 250 },
            "trend": { "min_records": 4 }
        }))
        .unwrap();
        let merged = merge_settings(&current, req).unwrap();
        assert_eq!(merged.thresholds.high_total, 250.0);
        assert_eq!(merged.thresholds.late_hour, 16, "compact value kept");
        assert_eq!(merged.trend.min_records, 4);
        assert_eq!(merged.trend.window_days, 7);
        assert_eq!(merged.catalog, current.catalog);

        let req: SettingsUpdate = serde_json::from_value(serde_json::json!({ "preset": "bogus" })).unwrap();
        assert_eq!(merge_settings(&current, req).err(), Some("invalid_preset"));
    }

    #[tokio::test]
    async fn post_settings_applies_nested_partial_update() {
        let state = test_state(EngineConfig::default());
        let resp = post_settings(
            State(state.clone()),
            Json(serde_json::json!({ "thresholds": { "late_hour": 16 } })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let config = state.config.lock().await.clone();
        assert_eq!(config.thresholds.late_hour, 16);
        assert_eq!(config.thresholds.high_total, Thresholds::default().high_total);

        let stored = state
            .store
            .lock()
            .await
            .load_or_init_config(&EngineConfig::default(), OffsetDateTime::now_utc())
            .unwrap();
        assert_eq!(stored, config);
    }

    #[tokio::test]
    async fn post_settings_rejects_degenerate_trend_and_keeps_config() {
        let state = test_state(EngineConfig::default());
        let resp = post_settings(
            State(state.clone()),
            Json(serde_json::json!({ "trend": { "pattern_min_days": 0 } })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(*state.config.lock().await, EngineConfig::default());
    }
}
