//! Shared fixtures for integration tests: an in-process car catalog provider
//! and the car contract interactions.

#![allow(dead_code)]

use accord::{Interaction, InteractionBuilder, MatchRule, RequestExpectation, ResponseExpectation};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: String,
}

/// How the catalog treats a create without an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Correct,
    /// Accepts a missing id and answers 201
    AcceptsMissingId,
}

/// In-memory car catalog: `GET /cars`, `GET /cars/:id`, `POST /cars`.
pub struct CarProvider {
    pub base_url: String,
    shutdown: tokio::sync::broadcast::Sender<()>,
}

impl Drop for CarProvider {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

pub async fn start_car_provider(behavior: Behavior) -> CarProvider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cars = Arc::new(RwLock::new(BTreeMap::from([(
        "1".to_string(),
        Car {
            id: "1".to_string(),
            title: "BMW".to_string(),
            color: "Black".to_string(),
        },
    )])));
    let (shutdown, mut shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    let Ok((stream, _)) = result else { continue };
                    let cars = Arc::clone(&cars);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let cars = Arc::clone(&cars);
                            async move { handle(req, cars, behavior).await }
                        });
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await;
                    });
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    });

    CarProvider {
        base_url: format!("http://{addr}"),
        shutdown,
    }
}

async fn handle(
    req: Request<Incoming>,
    cars: Arc<RwLock<BTreeMap<String, Car>>>,
    behavior: Behavior,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();

    let response = match (method, path.as_str()) {
        (Method::GET, "/cars") => {
            let all: Vec<Car> = cars.read().values().cloned().collect();
            reply(StatusCode::OK, json!(all))
        }
        (Method::GET, p) if p.starts_with("/cars/") => {
            let id = &p["/cars/".len()..];
            match cars.read().get(id) {
                Some(car) => reply(StatusCode::OK, json!(car)),
                None => reply(
                    StatusCode::NOT_FOUND,
                    json!({"message": "Requested car is not found"}),
                ),
            }
        }
        (Method::POST, "/cars") => match serde_json::from_slice::<Car>(&body) {
            Ok(car) if car.id.is_empty() && behavior == Behavior::Correct => reply(
                StatusCode::BAD_REQUEST,
                json!({"message": "ID must not be empty"}),
            ),
            Ok(car) => {
                cars.write().insert(car.id.clone(), car.clone());
                reply(StatusCode::CREATED, json!(car))
            }
            Err(_) => reply(
                StatusCode::BAD_REQUEST,
                json!({"message": "Invalid car payload"}),
            ),
        },
        _ => reply(StatusCode::NOT_FOUND, json!({"message": "Not found"})),
    };
    Ok(response)
}

fn reply(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(CONTENT_TYPE),
    );
    response
}

// =============================================================================
// Car contract
// =============================================================================

/// One row of the data-driven consumer suite.
pub struct Case {
    pub state: &'static str,
    pub description: &'static str,
    pub request: RequestExpectation,
    pub response: ResponseExpectation,
}

fn content_type() -> MatchRule {
    MatchRule::regex(CONTENT_TYPE, r"application\/json").unwrap()
}

fn color() -> MatchRule {
    MatchRule::regex("Yellow", r"\w+").unwrap()
}

fn valid_car() -> serde_json::Value {
    json!({"id": "30", "title": "Toyota", "color": "Yellow"})
}

fn invalid_car() -> serde_json::Value {
    json!({"id": "", "title": "Kia", "color": ""})
}

fn get_car(example_path: &str) -> RequestExpectation {
    RequestExpectation::new("GET", MatchRule::regex(example_path, "/cars/[0-9]+").unwrap())
        .header("Content-Type", content_type())
}

fn post_car(body: serde_json::Value) -> RequestExpectation {
    RequestExpectation::new("POST", MatchRule::regex("/cars", "/cars").unwrap())
        .header("Content-Type", content_type())
        .body(body)
}

fn respond(status: u16, body: impl Into<accord::ExpectationNode>) -> ResponseExpectation {
    ResponseExpectation::new(status)
        .header("Content-Type", content_type())
        .body(body)
}

/// The six car catalog interactions.
pub fn car_cases() -> Vec<Case> {
    vec![
        Case {
            state: "Validate the whole response body",
            description: "A POST request",
            request: post_car(valid_car()),
            response: respond(201, valid_car()),
        },
        Case {
            state: "Validate the whole response body",
            description: "A GET request",
            request: get_car("/cars/1"),
            response: respond(200, json!({"id": "1", "title": "BMW", "color": "Black"})),
        },
        Case {
            state: "Validate title and color",
            description: "A GET request",
            request: get_car("/cars/1"),
            response: respond(
                200,
                accord::ExpectationNode::object([
                    ("title", "BMW".into()),
                    ("color", color().into()),
                ]),
            ),
        },
        Case {
            state: "Validate title and color",
            description: "A POST request",
            request: post_car(valid_car()),
            response: respond(
                201,
                accord::ExpectationNode::object([
                    ("title", "Toyota".into()),
                    ("color", color().into()),
                ]),
            ),
        },
        Case {
            state: "Validate error message",
            description: "A GET request with invalid ID",
            request: get_car("/cars/9999"),
            response: respond(404, json!({"message": "Requested car is not found"})),
        },
        Case {
            state: "Validate error message",
            description: "A POST request with no ID provided",
            request: post_car(invalid_car()),
            response: respond(400, json!({"message": "ID must not be empty"})),
        },
    ]
}

pub fn car_interactions() -> Vec<Interaction> {
    car_cases()
        .into_iter()
        .map(|case| {
            InteractionBuilder::new()
                .given(case.state)
                .upon_receiving(case.description)
                .with_request(case.request)
                .will_respond_with(case.response)
                .build()
                .unwrap()
        })
        .collect()
}
