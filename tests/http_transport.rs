use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use async_trait::async_trait;
use calculator_mcp::core::dispatch::{SessionId, SessionStub};
use calculator_mcp::core::server::{self, AppState};
use calculator_mcp::{DispatchError, FrontDoor, ServerInfo, SessionNamespace};
use serde_json::{Value, json};

fn front_door() -> FrontDoor {
    server::build_front_door(ServerInfo {
        name: "Authless Calculator".into(),
        version: "1.0.0".into(),
    })
}

macro_rules! app {
    ($door:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState {
                    server_name: "Authless Calculator".into(),
                }))
                .app_data(web::Data::new($door))
                .configure(server::routes),
        )
        .await
    };
}

fn rpc(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    rpc(id, "tools/call", json!({"name": name, "arguments": arguments}))
}

#[actix_rt::test]
async fn health_reports_service_name() {
    let app = app!(front_door());
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "ok", "service": "Authless Calculator"}));
}

#[actix_rt::test]
async fn arithmetic_scenarios_over_http() {
    let app = app!(front_door());
    let cases = [
        (tool_call(1, "add", json!({"a": 2, "b": 3})), "5"),
        (
            tool_call(2, "calculate", json!({"operation": "multiply", "a": 4, "b": 5})),
            "20",
        ),
        (
            tool_call(3, "calculate", json!({"operation": "divide", "a": 10, "b": 0})),
            "Error: Cannot divide by zero",
        ),
        (
            tool_call(4, "calculate", json!({"operation": "subtract", "a": 2, "b": 5})),
            "-3",
        ),
    ];

    for (request, expected) in cases {
        let id = request["id"].clone();
        let req = test::TestRequest::post()
            .uri("/mcp")
            .set_json(&request)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], id);
        assert_eq!(
            body["result"]["content"],
            json!([{"type": "text", "text": expected}]),
            "request {request}"
        );
        assert_eq!(body["result"]["isError"], false);
    }
}

#[actix_rt::test]
async fn root_path_accepts_rpc_too() {
    let app = app!(front_door());
    let req = test::TestRequest::post()
        .uri("/")
        .set_json(rpc(1, "tools/list", json!({})))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<_> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["add", "calculate"]);
}

#[actix_rt::test]
async fn protocol_errors_are_json_rpc_errors() {
    let app = app!(front_door());

    let req = test::TestRequest::post()
        .uri("/mcp")
        .set_json(tool_call(5, "power", json!({"a": 2, "b": 8})))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["error"]["code"], -32601);

    let req = test::TestRequest::post()
        .uri("/mcp")
        .set_json(tool_call(6, "calculate", json!({"operation": "divide", "a": 1})))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["error"]["code"], -32602);
    assert!(body.get("result").is_none());

    let req = test::TestRequest::post()
        .uri("/mcp")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"jsonrpc\": \"2.0\", \"id\": 7,")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["error"]["code"], -32700);
}

#[actix_rt::test]
async fn notifications_are_accepted_without_body() {
    let app = app!(front_door());
    let req = test::TestRequest::post()
        .uri("/mcp")
        .set_json(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = test::read_body(resp).await;
    assert!(body.is_empty());
}

#[actix_rt::test]
async fn requests_reach_the_same_session() {
    let door = front_door();
    let first = door.resolve().await.unwrap();
    let app = app!(door.clone());

    let req = test::TestRequest::post()
        .uri("/mcp")
        .set_json(rpc(1, "initialize", json!({})))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"]["serverInfo"]["version"], "1.0.0");

    let second = door.resolve().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

struct Offline;

#[async_trait]
impl SessionNamespace for Offline {
    fn id_from_name(&self, name: &str) -> SessionId {
        SessionId::from_name(name)
    }

    async fn get(&self, _id: &SessionId) -> Result<Arc<SessionStub>, DispatchError> {
        Err(DispatchError::Addressing {
            name: "mcp-agent".into(),
            reason: "namespace offline".into(),
        })
    }
}

#[actix_rt::test]
async fn dispatch_failure_is_a_server_error() {
    let app = app!(FrontDoor::new(Arc::new(Offline)));
    let req = test::TestRequest::post()
        .uri("/mcp")
        .set_json(rpc(1, "ping", json!({})))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
