mod lms_stub;

use std::net::SocketAddr;
use std::time::Duration;

use config::Config;
use indoc::formatdoc;
use server::ServeConfig;
use tokio::net::TcpListener;

pub use lms_stub::{LmsStub, LmsStubBuilder, SeenRequest};

/// Minimal gateway configuration delegating to the given remote base URL.
pub fn gateway_config(base_url: &str) -> String {
    formatdoc! {r#"
        [lms]
        base_url = "{base_url}"
    "#}
}

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the given TOML configuration
    pub async fn start(config_toml: &str) -> Self {
        // Parse the configuration from TOML
        let config: Config = toml::from_str(config_toml).unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
        };

        // Start the server in a background task
        let handle = tokio::spawn(async move {
            // Drop the listener so the server can bind to the address
            drop(listener);

            if let Err(e) = server::serve(serve_config).await {
                eprintln!("Server failed to start: {e}");
            }
        });

        let client = TestClient::new(format!("http://{address}"));

        // Wait until the server answers; any status code will do
        let mut retries = 50;
        loop {
            match client.client.get(format!("{}/", client.base_url)).send().await {
                Ok(_) => break,
                Err(_) if retries > 0 => {
                    retries -= 1;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(e) => {
                    eprintln!("Server did not come up: {e}");
                    std::process::exit(1);
                }
            }
        }

        TestServer {
            client,
            address,
            _handle: handle,
        }
    }
}
