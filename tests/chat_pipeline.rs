mod common;

use argo_insight::chat::prompts::static_fallback_text;
use argo_insight::chat::{ChatRequest, ChatService, ConversationTurn, Role};
use argo_insight::config::{ChatConfig, ChatMode};
use argo_insight::db::{MeasurementStore, QueryParam};
use argo_insight::llm::TextGenerator;
use common::{rows, StubGenerator, StubStore};
use serde_json::json;
use std::sync::Arc;

fn keyword_service(store: Arc<StubStore>) -> ChatService {
    let config = ChatConfig {
        mode: ChatMode::Keyword,
        ..ChatConfig::default()
    };
    ChatService::from_config(&config, store as Arc<dyn MeasurementStore>, None).unwrap()
}

fn model_service(store: Arc<StubStore>, generator: Arc<StubGenerator>) -> ChatService {
    let config = ChatConfig {
        mode: ChatMode::Model,
        ..ChatConfig::default()
    };
    ChatService::from_config(
        &config,
        store as Arc<dyn MeasurementStore>,
        Some(generator as Arc<dyn TextGenerator>),
    )
    .unwrap()
}

#[tokio::test]
async fn test_all_floats_keyword_answer() {
    let store = Arc::new(StubStore::with_rows(rows(json!([
        { "platform_id": "1900816" },
        { "platform_id": "1901740" },
        { "platform_id": "2902746" }
    ]))));
    let service = keyword_service(store.clone());

    let response = service
        .handle(ChatRequest::new("Show me all available floats"))
        .await
        .unwrap();

    assert_eq!(
        response.sql_query.as_deref(),
        Some("SELECT DISTINCT platform_id FROM floats ORDER BY platform_id")
    );
    assert_eq!(response.results_count, 3);
    assert_eq!(response.data.len(), 3);
    for id in ["1900816", "1901740", "2902746"] {
        assert!(response.response.contains(id), "missing {} in {}", id, response.response);
    }
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_keyword_pipeline_is_repeatable() {
    let store = Arc::new(StubStore::with_rows(rows(json!([{ "avg_temp": 11.5 }]))));
    let service = keyword_service(store.clone());
    let question = "What's the average temperature for float 1900816?";

    let first = service.handle(ChatRequest::new(question)).await.unwrap();
    let second = service.handle(ChatRequest::new(question)).await.unwrap();

    assert_eq!(first.sql_query, second.sql_query);
    assert_eq!(first.data, second.data);
    assert_eq!(first.response, "The average temperature for float 1900816 is 11.50°C.");

    let calls = store.calls();
    assert_eq!(calls[0].1, vec![QueryParam::from("1900816")]);
    assert_eq!(calls[0], calls[1]);
}

#[tokio::test]
async fn test_destructive_model_sql_is_never_executed() {
    let store = Arc::new(StubStore::with_rows(rows(json!([{ "platform_id": "1" }]))));
    let generator = Arc::new(StubGenerator::new(
        "```sql\nDROP TABLE floats;\n```",
        "unused",
        "I can help with float data questions.",
    ));
    let service = model_service(store.clone(), generator.clone());

    let response = service
        .handle(ChatRequest::new("Please delete everything"))
        .await
        .unwrap();

    assert!(store.calls().is_empty());
    assert_eq!(response.sql_query, None);
    assert_eq!(response.results_count, 0);
    assert!(response.data.is_empty());
    assert_eq!(response.response, "I can help with float data questions.");
    // SQL prompt, then fallback prompt; no explanation request.
    assert_eq!(generator.prompts().len(), 2);
}

#[tokio::test]
async fn test_store_failure_uses_static_fallback() {
    let store = Arc::new(StubStore::failing());
    let service = keyword_service(store.clone());

    let response = service
        .handle(ChatRequest::new("Show me all available floats"))
        .await
        .unwrap();

    assert_eq!(store.calls().len(), 1);
    assert_eq!(response.sql_query, None);
    assert_eq!(response.results_count, 0);
    assert_eq!(response.response, static_fallback_text());
}

#[tokio::test]
async fn test_history_is_returned_with_new_turns() {
    let history = vec![
        ConversationTurn::user("Show me all available floats"),
        ConversationTurn::assistant("I found 3 unique floats."),
    ];

    for store in [StubStore::with_rows(rows(json!([{ "platform_id": "1" }]))), StubStore::failing()] {
        let service = keyword_service(Arc::new(store));
        let response = service
            .handle(ChatRequest::new("Show me the temperature range for all floats").with_history(history.clone()))
            .await
            .unwrap();

        let turns = &response.conversation_history;
        assert_eq!(turns.len(), 4);
        assert_eq!(&turns[..2], history.as_slice());
        assert_eq!(turns[2], ConversationTurn::user("Show me the temperature range for all floats"));
        assert_eq!(turns[3].role, Role::Assistant);
        assert_eq!(turns[3].content, response.response);
    }
}

#[tokio::test]
async fn test_model_pipeline_explains_rows() {
    let store = Arc::new(StubStore::with_rows(rows(json!([
        { "platform_id": "1900816", "latitude": -12.5, "longitude": 101.25 }
    ]))));
    let generator = Arc::new(StubGenerator::new(
        "SQL: SELECT platform_id, latitude, longitude FROM floats WHERE platform_id = '1900816' ORDER BY measurement_date DESC LIMIT 1",
        "  Float 1900816 was last seen near 12.5°S, 101.25°E.  ",
        "unused",
    ));
    let service = model_service(store.clone(), generator.clone());

    let history = vec![ConversationTurn::user("hello"), ConversationTurn::assistant("hi")];
    let response = service
        .handle(ChatRequest::new("Where is float 1900816 now?").with_history(history))
        .await
        .unwrap();

    assert_eq!(response.response, "Float 1900816 was last seen near 12.5°S, 101.25°E.");
    assert!(response.sql_query.unwrap().starts_with("SELECT platform_id, latitude"));
    assert_eq!(response.results_count, 1);

    let prompts = generator.prompts();
    assert!(prompts[0].contains("Where is float 1900816 now?"));
    assert!(prompts[0].contains("hello"));
}

#[tokio::test]
async fn test_empty_result_reports_no_data() {
    let store = Arc::new(StubStore::default());
    let generator = Arc::new(StubGenerator::new(
        "SELECT * FROM floats WHERE platform_id = '0000000'",
        "unused",
        "unused",
    ));
    let service = model_service(store, generator.clone());

    let response = service
        .handle(ChatRequest::new("Data for float 0000000"))
        .await
        .unwrap();

    assert_eq!(
        response.response,
        "I couldn't find any data matching your query \"Data for float 0000000\". \
         The SQL query executed was: SELECT * FROM floats WHERE platform_id = '0000000'"
    );
    assert_eq!(response.results_count, 0);
    // No explanation requested for an empty result.
    assert_eq!(generator.prompts().len(), 1);
}

#[tokio::test]
async fn test_literal_containing_denylisted_word_is_rejected() {
    let store = Arc::new(StubStore::with_rows(rows(json!([{ "platform_id": "1" }]))));
    let generator = Arc::new(StubGenerator::new(
        "SELECT * FROM floats WHERE platform_id = 'update'",
        "unused",
        "fallback",
    ));
    let service = model_service(store.clone(), generator);

    let response = service.handle(ChatRequest::new("anything")).await.unwrap();

    assert!(store.calls().is_empty());
    assert_eq!(response.response, "fallback");
}

#[tokio::test]
async fn test_sql_generation_failure_uses_fallback() {
    let store = Arc::new(StubStore::with_rows(rows(json!([{ "platform_id": "1900816" }]))));
    let generator = Arc::new(StubGenerator::failing_sql("Try asking about a specific float."));
    let service = model_service(store.clone(), generator);

    let history = vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")];
    let response = service
        .handle(ChatRequest::new("Where is float 1900816?").with_history(history))
        .await
        .unwrap();

    assert!(store.calls().is_empty());
    assert_eq!(response.response, "Try asking about a specific float.");
    assert_eq!(response.sql_query, None);
    assert_eq!(response.results_count, 0);
    assert!(response.data.is_empty());
    assert_eq!(response.conversation_history.len(), 4);
    assert_eq!(response.conversation_history[2], ConversationTurn::user("Where is float 1900816?"));
    assert_eq!(
        response.conversation_history[3],
        ConversationTurn::assistant("Try asking about a specific float.")
    );
}

#[tokio::test]
async fn test_explanation_failure_drops_rows_and_uses_fallback() {
    let store = Arc::new(StubStore::with_rows(rows(json!([
        { "platform_id": "1900816" },
        { "platform_id": "1901740" }
    ]))));
    let generator = Arc::new(StubGenerator::failing_explanation(
        "SELECT DISTINCT platform_id FROM floats ORDER BY platform_id",
        "Here is what I can tell you about ARGO floats.",
    ));
    let service = model_service(store.clone(), generator.clone());

    let response = service
        .handle(ChatRequest::new("List the floats"))
        .await
        .unwrap();

    assert_eq!(store.calls().len(), 1);
    assert_eq!(response.response, "Here is what I can tell you about ARGO floats.");
    assert_eq!(response.sql_query, None);
    assert_eq!(response.results_count, 0);
    assert!(response.data.is_empty());
    assert_eq!(response.conversation_history.len(), 2);
    // SQL, explanation, fallback
    assert_eq!(generator.prompts().len(), 3);
}

#[tokio::test]
async fn test_missing_message_is_bad_request() {
    let service = keyword_service(Arc::new(StubStore::default()));
    let err = service.handle(ChatRequest::new("   ")).await.unwrap_err();
    assert_eq!(err.code(), "bad_request");
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_model_mode_requires_generator() {
    let config = ChatConfig {
        mode: ChatMode::Model,
        ..ChatConfig::default()
    };
    let store: Arc<dyn MeasurementStore> = Arc::new(StubStore::default());
    let err = ChatService::from_config(&config, store, None).err().unwrap();
    assert_eq!(err.code(), "config_error");
}
