use super::common;

use common::test_server::TestServer;
use serde_json::{json, Value};

#[tokio::test]
async fn test_agent_lifecycle_over_http() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/agents"))
        .json(&json!({
            "name": "Researcher",
            "userPromptTemplate": "Summarize {{topic}}",
            "modelConfig": {"provider": "openai"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    let agent_url = server.url(&format!("/api/agents/{}", id));

    let response = client.head(&agent_url).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .put(&agent_url)
        .json(&json!({"status": "published", "description": "Reads papers"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["status"], "published");
    assert_eq!(updated["description"], "Reads papers");
    assert_eq!(updated["userPromptTemplate"], "Summarize {{topic}}");
    assert_eq!(updated["modelConfig"]["provider"], "openai");

    let response = client
        .get(server.url("/api/agents/status/published"))
        .send()
        .await
        .unwrap();
    let published: Vec<Value> = response.json().await.unwrap();
    assert_eq!(published.len(), 1);

    let response = client.delete(&agent_url).send().await.unwrap();
    assert_eq!(response.status(), 204);

    let response = client.head(&agent_url).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.get(&agent_url).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains(&id.to_string()));
}

#[tokio::test]
async fn test_cors_headers_on_simple_request() {
    let server = TestServer::new().await;

    let response = reqwest::Client::new()
        .get(server.url("/api/agents"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
