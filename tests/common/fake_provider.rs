//! Fake listing provider
//!
//! Serves `/properties` the way the real provider does (basic auth, `limit`
//! query parameter, JSON array body) and hosts listing photos under
//! `/photos/{name}`. Photo names containing "broken" answer 404.

use super::constants::*;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
enum Behavior {
    Listings(Vec<Value>),
    Status(u16),
    Hang,
}

struct ProviderState {
    behavior: Mutex<Behavior>,
    last_limit: AtomicUsize,
    requests: AtomicUsize,
}

#[derive(Deserialize)]
struct PropertiesQuery {
    limit: Option<usize>,
}

pub struct FakeProvider {
    pub base_url: String,
    state: Arc<ProviderState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeProvider {
    /// Spawns a provider with no listings on a random port
    pub async fn spawn() -> Self {
        let state = Arc::new(ProviderState {
            behavior: Mutex::new(Behavior::Listings(Vec::new())),
            last_limit: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/properties", get(properties))
            .route("/photos/{name}", get(photo))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake provider");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake provider failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// URL of a photo hosted by this provider
    pub fn photo_url(&self, name: &str) -> String {
        format!("{}/photos/{}", self.base_url, name)
    }

    /// A provider record with the given id and photos
    pub fn listing(&self, id: &str, photos: &[&str]) -> Value {
        let photos: Vec<String> = photos.iter().map(|p| self.photo_url(p)).collect();
        json!({
            "listingId": id,
            "mlsId": 1005192,
            "listPrice": 250000.0,
            "remarks": format!("Listing {}", id),
            "photos": photos,
            "address": {
                "full": format!("{} Main St", id),
                "streetNumber": 12,
                "streetName": "Main St",
                "city": "Houston",
                "state": "Texas",
                "postalCode": "77096"
            },
            "property": {
                "type": "RES",
                "bedrooms": 3,
                "bathrooms": 2,
                "area": 1200,
                "yearBuilt": 1994,
                "lotSize": "0.25"
            }
        })
    }

    pub fn set_listings(&self, listings: Vec<Value>) {
        *self.state.behavior.lock().unwrap() = Behavior::Listings(listings);
    }

    pub fn fail_with_status(&self, status: u16) {
        *self.state.behavior.lock().unwrap() = Behavior::Status(status);
    }

    /// Never answer `/properties`
    pub fn hang(&self) {
        *self.state.behavior.lock().unwrap() = Behavior::Hang;
    }

    /// `limit` of the most recent `/properties` request
    pub fn last_limit(&self) -> usize {
        self.state.last_limit.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn properties(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Query(query): Query<PropertiesQuery>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Basic "))
        .unwrap_or(false);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    state.last_limit.store(limit, Ordering::SeqCst);

    let behavior = state.behavior.lock().unwrap().clone();
    match behavior {
        Behavior::Listings(listings) => {
            Json(listings.into_iter().take(limit).collect::<Vec<_>>()).into_response()
        }
        Behavior::Status(status) => StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

async fn photo(Path(name): Path<String>) -> Response {
    if name.contains("broken") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if name.ends_with(".png") {
        ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response()
    } else {
        ([(header::CONTENT_TYPE, "image/jpeg")], JPEG_BYTES).into_response()
    }
}
