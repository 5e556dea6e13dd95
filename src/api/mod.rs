use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::core::{
    Allocation, Catalog, Contribution, ContributionFrequency, CoreError, DiversificationAnalysis,
    Eligibility, GoalSolveConfig, GoalTarget, Holding, InterestMethod, PortfolioSummary,
    ProjectionRow, RateDecay, Recommendation, allocate_greedy, allocation_gain,
    analyze_diversification, blended_rate, evaluate_portfolio, generate_projection,
    generate_projection_with_contributions, recommend, solve_goal_capital,
};

const MAX_MONTHS: i64 = 600;
const GAIN_HORIZON_DAYS: u32 = 360;

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiInterestMethod {
    #[serde(alias = "simple_interest", alias = "simple-interest")]
    Simple,
    #[serde(alias = "compuesto", alias = "compound_interest", alias = "compound-interest")]
    Compound,
}

impl From<ApiInterestMethod> for InterestMethod {
    fn from(value: ApiInterestMethod) -> Self {
        match value {
            ApiInterestMethod::Simple => InterestMethod::Simple,
            ApiInterestMethod::Compound => InterestMethod::Compound,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFrequency {
    #[serde(alias = "semanal")]
    Weekly,
    #[serde(alias = "quincenal", alias = "fortnightly")]
    Biweekly,
    #[serde(alias = "mensual")]
    Monthly,
}

impl From<ApiFrequency> for ContributionFrequency {
    fn from(value: ApiFrequency) -> Self {
        match value {
            ApiFrequency::Weekly => ContributionFrequency::Weekly,
            ApiFrequency::Biweekly => ContributionFrequency::Biweekly,
            ApiFrequency::Monthly => ContributionFrequency::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalPeriod {
    #[serde(alias = "annually", alias = "yearly")]
    Annual,
    #[serde(alias = "month")]
    Monthly,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    principal: Option<f64>,
    annual_rate: Option<f64>,
    method: Option<ApiInterestMethod>,
    months: Option<i64>,
    rate_decay_per_quarter: Option<f64>,
    rate_floor: Option<f64>,
    contribution: Option<f64>,
    contribution_frequency: Option<ApiFrequency>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EligibilityPayload {
    capabilities: BTreeSet<String>,
    excluded_institutions: BTreeSet<String>,
}

impl From<EligibilityPayload> for Eligibility {
    fn from(value: EligibilityPayload) -> Self {
        Eligibility {
            capabilities: value.capabilities,
            excluded_institutions: value.excluded_institutions,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AllocatePayload {
    capital: Option<f64>,
    #[serde(flatten)]
    eligibility: EligibilityPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GoalPayload {
    target_gain: Option<f64>,
    period: Option<ApiGoalPeriod>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
    #[serde(flatten)]
    eligibility: EligibilityPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldingPayload {
    institution: String,
    product: String,
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PortfolioPayload {
    months: Option<u32>,
    holdings: Vec<HoldingPayload>,
}

#[derive(Debug)]
struct ProjectionRequest {
    principal: f64,
    annual_rate: f64,
    method: InterestMethod,
    months: i64,
    decay: RateDecay,
    contribution: Option<Contribution>,
}

#[derive(Debug)]
struct GoalRequest {
    target: GoalTarget,
    config: GoalSolveConfig,
    eligibility: Eligibility,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    method: InterestMethod,
    months: i64,
    final_total: f64,
    total_interest: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_contributions: Option<f64>,
    rows: Vec<ProjectionRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocateResponse {
    capital: f64,
    eligible_products: usize,
    blended_rate: f64,
    annual_gain: f64,
    allocation: Allocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioResponse {
    #[serde(flatten)]
    summary: PortfolioSummary,
    diversification: Option<DiversificationAnalysis>,
    recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/catalog", get(catalog_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/allocate", post(allocate_handler))
        .route("/api/goal", post(goal_handler))
        .route("/api/portfolio", post(portfolio_handler))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(port: u16, catalog: Catalog) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let institutions = catalog.institutions().len();
    let app = router(AppState::new(catalog));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, institutions, "SOFIPO simulator API listening");

    axum::serve(listener, app).await
}

async fn healthz() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn catalog_handler(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, state.catalog.as_ref())
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

fn projection_handler_impl(payload: ProjectionPayload) -> Response {
    let request = match projection_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };

    let rows = match request.contribution {
        Some(contribution) => generate_projection_with_contributions(
            request.principal,
            request.annual_rate,
            request.method,
            request.months,
            contribution,
            request.decay,
        ),
        None => generate_projection(
            request.principal,
            request.annual_rate,
            request.method,
            request.months,
            request.decay,
        ),
    };
    match rows {
        Ok(rows) => json_response(
            StatusCode::OK,
            build_projection_response(request.method, request.months, rows),
        ),
        Err(e) => core_error_response(e),
    }
}

async fn allocate_handler(
    State(state): State<AppState>,
    Json(payload): Json<AllocatePayload>,
) -> Response {
    let Some(capital) = payload.capital else {
        return bad_request("capital is required");
    };
    let eligible = state.catalog.eligible_products(&payload.eligibility.into());
    let allocation = match allocate_greedy(&eligible, capital) {
        Ok(allocation) => allocation,
        Err(e) => return core_error_response(e),
    };
    let (blended, gain) = match (
        blended_rate(&allocation, GAIN_HORIZON_DAYS),
        allocation_gain(&allocation, GAIN_HORIZON_DAYS),
    ) {
        (Ok(rate), Ok(gain)) => (rate, gain),
        (Err(e), _) | (_, Err(e)) => return core_error_response(e),
    };

    json_response(
        StatusCode::OK,
        AllocateResponse {
            capital,
            eligible_products: eligible.len(),
            blended_rate: blended,
            annual_gain: gain,
            allocation,
        },
    )
}

async fn goal_handler(State(state): State<AppState>, Json(payload): Json<GoalPayload>) -> Response {
    let request = match goal_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    let eligible = state.catalog.eligible_products(&request.eligibility);
    match solve_goal_capital(&eligible, request.target, request.config) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(e) => core_error_response(e),
    }
}

async fn portfolio_handler(
    State(state): State<AppState>,
    Json(payload): Json<PortfolioPayload>,
) -> Response {
    let months = payload.months.unwrap_or(12);
    if i64::from(months) > MAX_MONTHS {
        return bad_request(&format!("months must be <= {MAX_MONTHS}"));
    }

    let mut holdings = Vec::with_capacity(payload.holdings.len());
    for h in payload.holdings {
        match state.catalog.product(&h.institution, &h.product) {
            Ok(product) => holdings.push(Holding {
                product: product.clone(),
                amount: h.amount,
            }),
            Err(e) => return core_error_response(e),
        }
    }

    let summary = match evaluate_portfolio(&holdings, months) {
        Ok(summary) => summary,
        Err(e) => return core_error_response(e),
    };
    let diversification = analyze_diversification(&holdings);
    let recommendations = diversification
        .as_ref()
        .map(|analysis| recommend(analysis, summary.weighted_rate, &state.catalog))
        .unwrap_or_default();

    json_response(
        StatusCode::OK,
        PortfolioResponse {
            summary,
            diversification,
            recommendations,
        },
    )
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn bad_request(msg: &str) -> Response {
    tracing::warn!(error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn core_error_response(err: CoreError) -> Response {
    let status = match err {
        CoreError::UnknownProduct { .. } => StatusCode::NOT_FOUND,
        CoreError::NoEligibleProducts => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::InvalidInput(_) | CoreError::InvalidCatalog(_) => StatusCode::BAD_REQUEST,
    };
    tracing::warn!(error = %err, status = status.as_u16(), "calculation failed");
    error_response(status, &err.to_string())
}

fn projection_request_from_payload(payload: ProjectionPayload) -> Result<ProjectionRequest, String> {
    let months = payload.months.unwrap_or(12);
    if months > MAX_MONTHS {
        return Err(format!("months must be <= {MAX_MONTHS}"));
    }

    let mut decay = RateDecay::per_quarter(payload.rate_decay_per_quarter.unwrap_or(0.0));
    if let Some(floor) = payload.rate_floor {
        decay.floor = floor;
    }

    let contribution = match (payload.contribution, payload.contribution_frequency) {
        (Some(amount), frequency) => Some(Contribution {
            amount,
            frequency: frequency.map_or(ContributionFrequency::Monthly, Into::into),
        }),
        (None, Some(_)) => {
            return Err("contributionFrequency requires contribution".to_string());
        }
        (None, None) => None,
    };

    Ok(ProjectionRequest {
        principal: payload.principal.unwrap_or(50_000.0),
        annual_rate: payload.annual_rate.unwrap_or(15.0),
        method: payload.method.map_or(InterestMethod::Compound, Into::into),
        months,
        decay,
        contribution,
    })
}

fn goal_request_from_payload(payload: GoalPayload) -> Result<GoalRequest, String> {
    let Some(gain) = payload.target_gain else {
        return Err("targetGain is required".to_string());
    };
    let target = match payload.period.unwrap_or(ApiGoalPeriod::Annual) {
        ApiGoalPeriod::Annual => GoalTarget::Annual(gain),
        ApiGoalPeriod::Monthly => GoalTarget::Monthly(gain),
    };

    let mut config = GoalSolveConfig::default();
    if let Some(v) = payload.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        if v > 200 {
            return Err("maxIterations must be <= 200".to_string());
        }
        config.max_iterations = v;
    }

    Ok(GoalRequest {
        target,
        config,
        eligibility: payload.eligibility.into(),
    })
}

fn build_projection_response(
    method: InterestMethod,
    months: i64,
    rows: Vec<ProjectionRow>,
) -> ProjectionResponse {
    let last = rows.last();
    ProjectionResponse {
        method,
        months,
        final_total: last.map_or(0.0, |r| r.total),
        total_interest: last.map_or(0.0, |r| r.interest),
        total_contributions: last.and_then(|r| r.contributions),
        rows,
    }
}
