use agent_backend::adapters::health_handler::HealthHandler;
use agent_backend::application::AgentService;
use agent_backend::persistence::DataStore;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: DataStore,
}

impl TestServer {
    pub async fn new() -> Self {
        let store = DataStore::in_memory().await.unwrap();

        let agent_service = Arc::new(AgentService::new(store.agents().clone()));
        let health_handler = Arc::new(HealthHandler::new(store.clone()));

        let app = agent_backend::create_app(agent_service, health_handler);

        // Start server on random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to be ready
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestServer { addr, store }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}
