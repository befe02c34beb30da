use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;

/// A scriptable stand-in for the remote LMS: a real HTTP server answering
/// the token endpoint and the web-service endpoint with canned bodies.
pub struct LmsStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
    _handle: tokio::task::JoinHandle<()>,
}

/// One request the stub has received, with the parameters tests care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeenRequest {
    /// A credential exchange against the token endpoint.
    Token {
        username: Option<String>,
        service: Option<String>,
    },
    /// A web-service call.
    Rest {
        function: Option<String>,
        wstoken: Option<String>,
        field: Option<String>,
    },
}

impl LmsStub {
    pub fn builder() -> LmsStubBuilder {
        LmsStubBuilder::default()
    }

    /// Everything the stub has received so far, in arrival order.
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The functions of the web-service calls received so far.
    pub fn rest_functions(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                SeenRequest::Rest { function, .. } => function,
                SeenRequest::Token { .. } => None,
            })
            .collect()
    }
}

pub struct LmsStubBuilder {
    token_status: StatusCode,
    token_body: String,
    site_info_body: String,
    users_body: String,
}

impl Default for LmsStubBuilder {
    fn default() -> Self {
        Self {
            token_status: StatusCode::OK,
            token_body: serde_json::json!({"token": "T1"}).to_string(),
            site_info_body: serde_json::json!({"userid": 7, "username": "bob"}).to_string(),
            users_body: serde_json::json!([{
                "id": 7,
                "fullname": "Bob Jones",
                "email": "bob@x.org",
                "username": "bob",
            }])
            .to_string(),
        }
    }
}

impl LmsStubBuilder {
    pub fn token(mut self, body: serde_json::Value) -> Self {
        self.token_body = body.to_string();
        self
    }

    /// A raw token response body, for serving things that are not JSON.
    pub fn token_raw(mut self, body: &str) -> Self {
        self.token_body = body.to_string();
        self
    }

    pub fn token_status(mut self, status: StatusCode) -> Self {
        self.token_status = status;
        self
    }

    pub fn site_info(mut self, body: serde_json::Value) -> Self {
        self.site_info_body = body.to_string();
        self
    }

    pub fn users(mut self, body: serde_json::Value) -> Self {
        self.users_body = body.to_string();
        self
    }

    pub async fn start(self) -> LmsStub {
        let state = StubState {
            token_status: self.token_status,
            token_body: self.token_body,
            site_info_body: self.site_info_body,
            users_body: self.users_body,
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let requests = state.requests.clone();

        let app = Router::new()
            .route("/login/token.php", post(token))
            .route("/webservice/rest/server.php", get(rest))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        LmsStub {
            base_url: format!("http://{address}"),
            requests,
            _handle: handle,
        }
    }
}

#[derive(Clone)]
struct StubState {
    token_status: StatusCode,
    token_body: String,
    site_info_body: String,
    users_body: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

async fn token(State(state): State<StubState>, Form(params): Form<HashMap<String, String>>) -> (StatusCode, String) {
    state.requests.lock().unwrap().push(SeenRequest::Token {
        username: params.get("username").cloned(),
        service: params.get("service").cloned(),
    });

    (state.token_status, state.token_body.clone())
}

async fn rest(State(state): State<StubState>, Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
    let function = params.get("wsfunction").cloned();

    state.requests.lock().unwrap().push(SeenRequest::Rest {
        function: function.clone(),
        wstoken: params.get("wstoken").cloned(),
        field: params.get("field").cloned(),
    });

    match function.as_deref() {
        Some("core_webservice_get_site_info") => (StatusCode::OK, state.site_info_body.clone()),
        Some("core_user_get_users_by_field") => (StatusCode::OK, state.users_body.clone()),
        _ => (StatusCode::BAD_REQUEST, String::new()),
    }
}
