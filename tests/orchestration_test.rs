mod support;

use std::sync::Mutex;

use serde_json::{Value, json};
use toolchat::prelude::*;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{done_event, sse_body, text_event, tool_call_event, tool_listing};

fn sse(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test]
async fn weather_question_runs_one_tool_round_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/mcp/list-tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_listing()))
        .mount(&server)
        .await;

    let tools = ToolsConfig::new(
        format!("{}/api/mcp/list-tools", server.uri()),
        format!("{}/api/mcp/call-tool", server.uri()),
    );
    let mut catalog = ToolCatalog::fetch(&reqwest::Client::new(), &tools)
        .await
        .expect("catalog");
    catalog.select("weather/forecast");
    let forecast_id = catalog.id_for("weather", "forecast").unwrap().to_string();

    // Second round: the history now carries the tool result.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("tool_call_id"))
        .respond_with(sse(sse_body(&[
            text_event("It is "),
            text_event("sunny in Paris."),
            done_event(),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // First round: the model asks for the forecast, arguments split in two deltas.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(sse(sse_body(&[
            tool_call_event(0, Some("call_abc"), Some(&forecast_id), ""),
            tool_call_event(0, None, None, "{\"city\":"),
            tool_call_event(0, None, None, "\"Paris\"}"),
            done_event(),
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/call-tool/weather"))
        .and(query_param("tool_name", "forecast"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"city": "Paris", "sky": "sunny"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let model = ModelConfig::new(format!("{}/v1", server.uri()), "test-model").with_api_key("test-key");
    let orchestrator = Orchestrator::http(model, tools);

    let updates = Mutex::new(0usize);
    let observer = |_: &Conversation| *updates.lock().unwrap() += 1;

    let mut conversation = Conversation::new();
    let summary = orchestrator
        .send(&mut conversation, "Weather in Paris?", &catalog, &observer)
        .await
        .expect("run");

    assert_eq!(summary.rounds.len(), 2);
    assert!(!summary.round_limit_reached);
    assert!(*updates.lock().unwrap() > 4);

    let messages = conversation.messages();
    assert_eq!(messages.len(), 4);

    let call = &messages[1].as_assistant().unwrap().tool_calls[0];
    assert_eq!(call.id, "call_abc");
    assert_eq!(call.function.name, forecast_id);

    let tool = messages[2].as_tool().unwrap();
    assert_eq!(tool.tool_call_id, "call_abc");
    assert_eq!(tool.tool_name.as_deref(), Some("forecast"));
    let result: Value = serde_json::from_str(&tool.content).unwrap();
    assert_eq!(result["sky"], "sunny");

    assert_eq!(messages[3].content(), "It is sunny in Paris.");

    let groups = conversation.display_groups();
    assert_eq!(groups.len(), 2);
    let views: Vec<_> = groups[1].tool_calls().collect();
    assert_eq!(views.len(), 1);
    assert!(!views[0].is_pending());
    assert!(matches!(
        groups[1].items.last(),
        Some(DisplayItem::Assistant { content, streaming: false, .. }) if content == "It is sunny in Paris."
    ));

    // The tool gateway received the parsed arguments.
    let requests = server.received_requests().await.unwrap();
    let tool_request = requests
        .iter()
        .find(|r| r.url.path() == "/api/mcp/call-tool/weather")
        .unwrap();
    let body: Value = serde_json::from_slice(&tool_request.body).unwrap();
    assert_eq!(body, json!({"city": "Paris"}));

    // The first completion request advertised the selected tool under its id.
    let first_completion = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .unwrap();
    let body: Value = serde_json::from_slice(&first_completion.body).unwrap();
    assert_eq!(body["stream"], true);
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"][0]["function"]["name"], forecast_id);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_completion_marks_the_turn_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "invalid api key"}})),
        )
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::http(
        ModelConfig::new(server.uri(), "test-model").with_api_key("wrong"),
        ToolsConfig::default(),
    );
    let mut conversation = Conversation::new();

    let err = orchestrator
        .send(&mut conversation, "hi", &ToolCatalog::new(), &NoopObserver)
        .await
        .unwrap_err();

    match &err {
        ChatError::ApiError { code, details, .. } => {
            assert_eq!(*code, 401);
            assert_eq!(
                details.as_ref().unwrap()["error"]["message"],
                "invalid api key"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());

    let reply = conversation.messages()[1].as_assistant().unwrap();
    assert!(reply.content.starts_with("Error: "));
    assert!(reply.error.is_some());
    assert!(!reply.processing_chat_response);
}

#[tokio::test]
async fn unreachable_tool_gateway_is_reported_to_the_model() {
    let server = MockServer::start().await;

    let mut catalog = ToolCatalog::new();
    let read_id = catalog.insert(
        "files",
        ToolSpec {
            name: "read".into(),
            description: "Read a file".into(),
            input_schema: json!({"type": "object"}),
        },
    );
    catalog.select_all();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("tool_call_id"))
        .respond_with(sse(sse_body(&[text_event("The file could not be read."), done_event()])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse(sse_body(&[
            tool_call_event(0, Some("call_1"), Some(&read_id), "{\"path\":\"/etc/motd\"}"),
            done_event(),
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/call-tool/files"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "server offline"})))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::http(
        ModelConfig::new(server.uri(), "test-model"),
        ToolsConfig::new(format!("{}/list", server.uri()), format!("{}/call-tool", server.uri())),
    );
    let mut conversation = Conversation::new();
    orchestrator
        .send(&mut conversation, "read motd", &catalog, &NoopObserver)
        .await
        .expect("tool failures do not fail the run");

    let tool = conversation.messages()[2].as_tool().unwrap();
    assert!(tool.is_error);
    let payload: Value = serde_json::from_str(&tool.content).unwrap();
    assert_eq!(payload, json!({"error": "server offline"}));
    assert_eq!(conversation.last().unwrap().content(), "The file could not be read.");

    // The failure went back to the model as a tool message.
    let requests = server.received_requests().await.unwrap();
    let second = requests
        .iter()
        .filter(|r| r.url.path() == "/chat/completions")
        .nth(1)
        .unwrap();
    let body: Value = serde_json::from_slice(&second.body).unwrap();
    assert_eq!(body["messages"][2]["role"], "tool");
    assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
}
