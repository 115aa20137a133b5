//! HTTP surface and request orchestration
//!
//! Pipeline per request: shared-secret auth → parse → validate → price
//! action + risk assessment (pure) → cache lookup → oracle proposal →
//! filter chain → cache write → notifier. Parsing/oracle failures are
//! recovered into conservative holds; only structural and auth failures
//! surface as request errors.

use crate::cache::{fingerprint, AnalysisCache};
use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::filters::{run_chain, FilterContext, FilterRule};
use crate::notifier::TelegramNotifier;
use crate::oracle::{render_prompt, OracleClient, OracleVerdict, PromptContext};
use crate::price_action::detect;
use crate::risk::assess;
use crate::validator::{resolve_timeframe, validate};
use analyst_types::{
    AnalysisRequest, AnalysisResponse, Direction, ResponseMeta, Signal, TradingSession, TrendBias,
};
use chrono::{Timelike, Utc};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const API_KEY_HEADER: &str = "x-api-key";

/// Shared service state, constructed once in `main` and passed by
/// reference to every request handler.
pub struct AppState {
    pub config: AnalystConfig,
    pub cache: AnalysisCache,
    pub oracle: OracleClient,
    pub notifier: Arc<TelegramNotifier>,
    pub chain: Vec<Box<dyn FilterRule>>,
    pub started: Instant,
}

/// Run the HTTP server until the task is cancelled.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.listen_port));

    let make_svc = make_service_fn(move |_conn| {
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = Arc::clone(&state);
                handle_request(req, state)
            }))
        }
    });

    info!("Analyst service listening on http://{}", addr);
    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}

async fn handle_request(
    req: Request<Body>,
    state: Arc<AppState>,
) -> std::result::Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%method, path, "request received");

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") => health_response(&state),
        (Method::POST, "/analyze") => match handle_analyze(req, &state).await {
            Ok(analysis) => json_response(StatusCode::OK, &analysis),
            Err(err) => error_response(err),
        },
        (_, "/analyze") => error_response(AnalystError::MethodNotAllowed),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": "not found" }),
        ),
    };

    Ok(response)
}

async fn handle_analyze(req: Request<Body>, state: &AppState) -> Result<AnalysisResponse> {
    authorize(&state.config.api_token, header_value(&req, API_KEY_HEADER))?;

    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| AnalystError::validation("body", format!("unreadable body: {}", e)))?;
    let request: AnalysisRequest = serde_json::from_slice(&body)
        .map_err(|e| AnalystError::validation("body", format!("malformed JSON: {}", e)))?;

    let timeframe = resolve_timeframe(&request.timeframe)?;
    let profile = state.config.profile_for(timeframe);
    validate(&request, &profile)?;

    // Validated above; re-borrow the pieces the pipeline needs.
    let candle = request
        .ohlc
        .ok_or_else(|| AnalystError::validation("ohlc", "missing OHLC data"))?;
    let levels = request
        .key_levels
        .ok_or_else(|| AnalystError::validation("keyLevels", "missing key levels"))?;
    let higher = request
        .higher_tf
        .as_ref()
        .ok_or_else(|| AnalystError::validation("higherTF", "missing higher timeframe trends"))?;
    let h1_trend: TrendBias = higher.h1_trend.parse().unwrap_or(TrendBias::Neutral);
    let d1_trend: TrendBias = higher.d1_trend.parse().unwrap_or(TrendBias::Neutral);

    let context = request.market_context.clone().unwrap_or_default();
    let news_active = context.has_active_news(&request.symbol, state.config.news_window_minutes);
    let session = context
        .session
        .as_deref()
        .and_then(|s| s.parse::<TradingSession>().ok())
        .unwrap_or_else(|| TradingSession::from_utc_hour(Utc::now().hour()));
    let session_active = state.config.active_sessions.contains(&session);

    let report = detect(&candle, &request.prev_candles, &levels, &profile);
    let envelope = assess(&candle, &request.prev_candles, &levels, &profile);

    let meta = ResponseMeta {
        session: session.to_string(),
        atr: envelope.atr,
        news_risk: news_active,
        patterns: report.patterns(),
        risk_reward: envelope.risk_reward_ratio,
    };

    let key = fingerprint(&request.symbol, timeframe, &candle);
    if let Some(cached) = state.cache.get(&key) {
        debug!(symbol = %request.symbol, %timeframe, "serving cached signal");
        return Ok(AnalysisResponse {
            signal: cached,
            meta,
        });
    }

    let prompt = render_prompt(&PromptContext {
        symbol: &request.symbol,
        timeframe,
        candle: &candle,
        indicators: &request.indicators,
        volume: request.volume,
        avg_volume: request.avg_volume,
        levels: &levels,
        h1_trend,
        d1_trend,
        session,
        price_action: &report,
        envelope: &envelope,
        min_risk_reward: profile.min_risk_reward,
        volume_spike_mult: profile.volume_spike_mult,
    });

    let verdict = state.oracle.propose(&prompt).await?;

    let filter_ctx = FilterContext {
        timeframe,
        profile: &profile,
        candle: &candle,
        indicators: &request.indicators,
        volume: request.volume,
        avg_volume: request.avg_volume,
        price_action: &report,
        envelope: &envelope,
        h1_trend,
        d1_trend,
        news_active,
        session,
        session_active,
    };

    let signal = decide(verdict, &state.chain, &filter_ctx);
    info!(
        symbol = %request.symbol,
        %timeframe,
        direction = %signal.direction,
        confidence = %signal.confidence,
        "analysis complete"
    );

    state.cache.put(&key, signal.clone(), news_active);

    if state.notifier.is_enabled() {
        let notifier = Arc::clone(&state.notifier);
        let symbol = request.symbol.clone();
        let outbound = signal.clone();
        tokio::spawn(async move {
            notifier.send_alert(&symbol, timeframe, &outbound).await;
        });
    }

    Ok(AnalysisResponse { signal, meta })
}

/// Turn the oracle's verdict into the final signal: unrecognized output is
/// recovered into an annotated hold, recognized output runs the filter
/// chain, and directional results always leave with a complete
/// entry/stop/target set.
pub fn decide(
    verdict: OracleVerdict,
    chain: &[Box<dyn FilterRule>],
    ctx: &FilterContext,
) -> Signal {
    let proposed = match verdict {
        OracleVerdict::Recognized(signal) => signal,
        OracleVerdict::Unrecognized { error, raw } => {
            warn!(error, bytes = raw.len(), "oracle output unusable, holding");
            Signal::safe_hold(format!("Could not interpret oracle response ({})", error))
        }
    };

    let mut signal = run_chain(chain, proposed, ctx);

    if signal.direction.is_directional() {
        let (stop, target) = match signal.direction {
            Direction::Buy => (ctx.envelope.stop_buy, ctx.envelope.target_buy),
            _ => (ctx.envelope.stop_sell, ctx.envelope.target_sell),
        };
        signal.entry.get_or_insert(ctx.candle.close);
        signal.stop_loss.get_or_insert(stop);
        signal.take_profit.get_or_insert(target);
    }

    signal
}

fn authorize(expected: &str, provided: Option<&str>) -> Result<()> {
    // An empty configured token disables auth (development mode); main
    // logs a warning at startup.
    if expected.is_empty() {
        return Ok(());
    }
    match provided {
        Some(token) if token == expected => Ok(()),
        _ => Err(AnalystError::Auth),
    }
}

fn header_value<'a>(req: &'a Request<Body>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn health_response(state: &AppState) -> Response<Body> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "status": "healthy",
            "service": "signal-analyst",
            "uptime_seconds": state.started.elapsed().as_secs(),
            "cached_entries": state.cache.len(),
        }),
    )
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let payload = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap_or_default()
}

fn error_response(err: AnalystError) -> Response<Body> {
    let status = err.status();
    let body = match &err {
        AnalystError::Validation { field, message } => {
            serde_json::json!({ "error": message, "field": field })
        }
        AnalystError::Auth => serde_json::json!({ "error": "unauthorized" }),
        AnalystError::MethodNotAllowed => serde_json::json!({ "error": "method not allowed" }),
        other => {
            error!(error = %other, "request failed");
            serde_json::json!({ "error": "processing failed" })
        }
    };
    json_response(status, &body)
}
