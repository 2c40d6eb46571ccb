use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::ServeArgs;
use crate::labels::LabelTable;
use crate::model::{Country, FastTextModel};
use crate::normalize::normalize;
use crate::predict::{PREDICT_K, PredictResponse, predict_resolved};
use crate::sheets;
use crate::storage::{StoragePaths, file_present_nonempty};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
struct AppState {
    labels: Arc<LabelTable>,
    default_model: Arc<Mutex<FastTextModel>>,
    country_models: Arc<HashMap<Country, Mutex<FastTextModel>>>,
    api_key: Arc<String>,
    meta: ServiceMeta,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceMeta {
    label_count: usize,
    data_rows: usize,
    provision_rows: usize,
    countries: Vec<&'static str>,
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let paths = StoragePaths::new(&opts.data_dir);

    for required in [
        paths.data_sheet(),
        paths.provision_sheet(),
        paths.default_model(),
    ] {
        if !file_present_nonempty(&required) {
            return Err(anyhow!("Missing required input at {}", required.display()));
        }
    }
    for country in Country::ALL {
        let path = paths.country_model(country);
        if !file_present_nonempty(&path) {
            return Err(anyhow!(
                "Missing {} model at {}",
                country.code(),
                path.display()
            ));
        }
    }

    let api_key = std::env::var("API_KEY")
        .context("API_KEY must be set (shared secret for /api/predict)")?;

    let data = sheets::load_data_records(&paths.data_sheet()).context("load data sheet")?;
    let provisions =
        sheets::load_provision_records(&paths.provision_sheet()).context("load provision sheet")?;
    tracing::info!(
        "Loaded {} data rows, {} provision rows",
        data.len(),
        provisions.len()
    );

    let labels = LabelTable::build(&data, &provisions);
    tracing::info!("Label table ready: {} entries", labels.len());
    if labels.is_empty() {
        tracing::warn!("Label table is empty; predictions will surface raw identifiers");
    }

    let default_path = paths.default_model();
    let default_model = FastTextModel::load(&default_path)
        .with_context(|| format!("load {}", default_path.display()))?;
    tracing::info!("Default model loaded: {}", default_path.display());

    let mut country_models = HashMap::new();
    for country in Country::ALL {
        let path = paths.country_model(country);
        let model =
            FastTextModel::load(&path).with_context(|| format!("load {}", path.display()))?;
        tracing::info!("{} model loaded: {}", country.code(), path.display());
        country_models.insert(country, Mutex::new(model));
    }

    let meta = ServiceMeta {
        label_count: labels.len(),
        data_rows: data.len(),
        provision_rows: provisions.len(),
        countries: Country::ALL.map(Country::code).to_vec(),
    };

    let state = AppState {
        labels: Arc::new(labels),
        default_model: Arc::new(Mutex::new(default_model)),
        country_models: Arc::new(country_models),
        api_key: Arc::new(api_key),
        meta,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/predict", post(api_predict_default))
        .route("/api/predict", post(api_predict_country))
        .route("/api/stats", get(api_stats))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn api_stats(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.meta)
}

#[derive(Debug, Deserialize)]
struct DefaultPredictRequest {
    text: String,
}

/// Single-model route kept for clients of the legacy deployment. The text
/// goes to the model without normalization, matching that deployment.
async fn api_predict_default(
    State(st): State<AppState>,
    Json(req): Json<DefaultPredictRequest>,
) -> impl IntoResponse {
    let model = st.default_model.lock().await;
    match predict_resolved(&*model, &st.labels, &req.text, PREDICT_K) {
        Ok(predictions) => Json(PredictResponse { predictions }).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CountryPredictRequest {
    provider_provision: String,
    country_code: String,
}

#[derive(Debug, Serialize)]
struct SoftError {
    error: String,
}

async fn api_predict_country(
    State(st): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CountryPredictRequest>,
) -> impl IntoResponse {
    if let Err(denied) = check_api_key(&headers, &st.api_key) {
        return denied;
    }

    // An unknown country is reported in the body under a success status;
    // existing clients key off the `error` field, not the HTTP code.
    let Some(country) = Country::parse(&req.country_code) else {
        return Json(unsupported_country(&req.country_code)).into_response();
    };
    let Some(model) = st.country_models.get(&country) else {
        return Json(unsupported_country(&req.country_code)).into_response();
    };

    let text = normalize(&req.provider_provision);
    let model = model.lock().await;
    match predict_resolved(&*model, &st.labels, &text, PREDICT_K) {
        Ok(predictions) => Json(PredictResponse { predictions }).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

fn unsupported_country(code: &str) -> SoftError {
    let expected = Country::ALL.map(Country::code).join(", ");
    SoftError {
        error: format!("unsupported country_code {code:?}; expected one of {expected}"),
    }
}

fn check_api_key(headers: &HeaderMap, expected: &str) -> Result<(), axum::response::Response> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided == expected {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(SoftError {
                error: "invalid or missing api key".to_string(),
            }),
        )
            .into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_country_names_the_valid_set() {
        let err = unsupported_country("XX");
        assert!(err.error.contains("\"XX\""));
        assert!(err.error.contains("CL, COL, MX"));
    }

    #[test]
    fn api_key_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(check_api_key(&headers, "secret").is_err());

        headers.insert(API_KEY_HEADER, "wrong".parse().unwrap());
        assert!(check_api_key(&headers, "secret").is_err());

        headers.insert(API_KEY_HEADER, "secret".parse().unwrap());
        assert!(check_api_key(&headers, "secret").is_ok());
    }
}
