//! Session lifecycle tests against a scripted in-process backend

mod support;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use prompt_polyfill::prelude::*;
use serde_json::json;
use support::{Reply, ScriptedBackend};

async fn session_with(backend: &ScriptedBackend, options: CreateOptions) -> LanguageModel {
    LanguageModel::create(Arc::new(backend.clone()), options)
        .await
        .expect("create session")
}

fn number_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { "n": { "type": "integer" } },
        "required": ["n"]
    })
}

#[tokio::test]
async fn system_prompt_stays_out_of_history() {
    let backend = ScriptedBackend::conversational();
    let mut session = session_with(
        &backend,
        CreateOptions::new().with_initial_prompts(vec![PromptMessage::system("You are terse.")]),
    )
    .await;

    let answer = session.prompt("2+2?", PromptOptions::new()).await.unwrap();
    assert!(answer.contains('4'));

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text(), "2+2?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].text(), answer);

    assert_eq!(session.system_instruction(), Some("You are terse."));
    let configs = backend.configs();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].system_instruction.as_deref(), Some("You are terse."));
    let requests = backend.requests();
    assert!(requests[0].turns.iter().all(|t| t.role != Role::System));
}

#[tokio::test]
async fn initial_prompts_seed_history_and_usage() {
    let backend = ScriptedBackend::conversational();
    let session = session_with(
        &backend,
        CreateOptions::new().with_initial_prompts(vec![
            PromptMessage::system("Be brief."),
            PromptMessage::user("Hello"),
            PromptMessage::assistant("Hi!"),
        ]),
    )
    .await;

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].role, Role::Assistant);
    assert!(session.input_usage() > 0);
}

#[tokio::test]
async fn history_carries_context_between_prompts() {
    let backend = ScriptedBackend::conversational();
    let mut session = session_with(&backend, CreateOptions::new()).await;

    session
        .prompt("My name is Ann.", PromptOptions::new())
        .await
        .unwrap();
    let answer = session
        .prompt("What is my name?", PromptOptions::new())
        .await
        .unwrap();

    assert!(answer.contains("Ann"));
    assert_eq!(session.history().len(), 4);
    assert_eq!(backend.requests()[1].turns.len(), 3);
}

#[tokio::test]
async fn clones_have_independent_history() {
    let backend = ScriptedBackend::conversational();
    let mut original = session_with(&backend, CreateOptions::new()).await;
    original
        .prompt("My name is Ann.", PromptOptions::new())
        .await
        .unwrap();

    let mut copy = original.clone_session(CloneOptions::new()).await.unwrap();
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.history(), original.history());
    assert_eq!(copy.input_usage(), original.input_usage());

    let answer = copy
        .prompt("What is my name?", PromptOptions::new())
        .await
        .unwrap();
    assert!(answer.contains("Ann"));
    assert_eq!(copy.history().len(), 4);
    assert_eq!(original.history().len(), 2);
    // provider session reused
    assert_eq!(backend.sessions_created(), 1);
}

#[tokio::test]
async fn clone_with_new_sampling_creates_provider_session() {
    let backend = ScriptedBackend::constant("ok");
    let original = session_with(&backend, CreateOptions::new().with_top_k(5)).await;

    let copy = original
        .clone_session(CloneOptions::new().with_temperature(0.2))
        .await
        .unwrap();
    assert_eq!(copy.temperature(), 0.2);
    assert_eq!(copy.top_k(), 5);
    assert_eq!(original.temperature(), 1.0);

    let configs = backend.configs();
    assert_eq!(configs.len(), 2);
    assert_eq!(configs[1].temperature, 0.2);
    assert_eq!(configs[1].top_k, 5);

    let err = original
        .clone_session(CloneOptions::new().with_top_k(0))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::InvalidParameter(_)));
}

#[tokio::test]
async fn destroyed_session_rejects_every_operation() {
    let backend = ScriptedBackend::constant("ok");
    let mut session = session_with(&backend, CreateOptions::new()).await;
    session.prompt("hi", PromptOptions::new()).await.unwrap();

    session.destroy();
    session.destroy();
    assert!(session.is_destroyed());
    assert!(session.history().is_empty());

    let err = session.prompt("hi", PromptOptions::new()).await.unwrap_err();
    assert!(matches!(err, LlmError::InvalidState(_)));
    assert!(matches!(
        session.prompt_streaming("hi", PromptOptions::new()).await.err(),
        Some(LlmError::InvalidState(_))
    ));
    assert!(matches!(
        session.append("hi", PromptOptions::new()).await,
        Err(LlmError::InvalidState(_))
    ));
    assert!(matches!(
        session.measure_input_usage("hi", PromptOptions::new()).await,
        Err(LlmError::InvalidState(_))
    ));
    assert!(matches!(
        session.clone_session(CloneOptions::new()).await,
        Err(LlmError::InvalidState(_))
    ));
    assert_eq!(backend.generate_calls(), 1);
}

#[tokio::test]
async fn input_usage_never_decreases() {
    let backend = ScriptedBackend::constant("ok");
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let mut last = session.input_usage();
    for text in ["one", "two two", "three three three"] {
        session.prompt(text, PromptOptions::new()).await.unwrap();
        assert!(session.input_usage() > last);
        last = session.input_usage();
    }
    session.append("more", PromptOptions::new()).await.unwrap();
    assert!(session.input_usage() > last);
}

#[tokio::test]
async fn quota_overflow_fires_once_and_generation_proceeds() {
    let backend = ScriptedBackend::constant("ok");
    let mut session = session_with(&backend, CreateOptions::new().with_input_quota(10)).await;
    let mut events = session.subscribe();

    let answer = session
        .prompt("x".repeat(100), PromptOptions::new())
        .await
        .unwrap();
    assert_eq!(answer, "ok");

    let event = events.try_recv().expect("overflow event");
    assert_eq!(
        event,
        SessionEvent::QuotaOverflow {
            input_usage: 25,
            input_quota: 10,
        }
    );

    session.prompt("again", PromptOptions::new()).await.unwrap();
    assert!(events.try_recv().is_err());
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn aborted_signal_never_reaches_the_backend() {
    let backend = ScriptedBackend::constant("ok");
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let err = session
        .prompt("hi", PromptOptions::new().with_signal(AbortSignal::aborted()))
        .await
        .unwrap_err();
    assert!(err.is_abort());
    assert_eq!(backend.generate_calls(), 0);
    assert!(session.history().is_empty());

    let err = LanguageModel::create(
        Arc::new(backend.clone()),
        CreateOptions::new().with_signal(AbortSignal::aborted()),
    )
    .await
    .unwrap_err();
    assert!(err.is_abort());
    assert_eq!(backend.sessions_created(), 1);
}

#[tokio::test]
async fn abort_during_prompt_leaves_history_untouched() {
    let backend = ScriptedBackend::new(|_| Reply::Hang);
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let controller = AbortController::new();
    let trigger = controller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.abort();
    });

    let err = session
        .prompt("hi", PromptOptions::new().with_signal(controller.signal()))
        .await
        .unwrap_err();
    assert!(err.is_abort());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn streaming_commits_on_completion() {
    let backend =
        ScriptedBackend::new(|_| Reply::Chunks(vec!["Hel".to_string(), "lo".to_string()]));
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let mut stream = session
        .prompt_streaming("greet me", PromptOptions::new())
        .await
        .unwrap();
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.unwrap());
    }
    drop(stream);

    assert_eq!(chunks, vec!["Hel", "lo"]);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].text(), "Hello");
}

#[tokio::test]
async fn streaming_abort_commits_nothing() {
    let backend = ScriptedBackend::new(|_| Reply::ChunksThenHang(vec!["partial".to_string()]));
    let mut session = session_with(&backend, CreateOptions::new()).await;
    let controller = AbortController::new();

    let mut stream = session
        .prompt_streaming(
            "tell me a story",
            PromptOptions::new().with_signal(controller.signal()),
        )
        .await
        .unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
    controller.abort();
    assert!(stream.next().await.unwrap().unwrap_err().is_abort());
    assert!(stream.next().await.is_none());
    drop(stream);

    assert!(session.history().is_empty());
    // usage was accounted before the stream opened
    assert!(session.input_usage() > 0);
}

#[tokio::test]
async fn streaming_error_commits_nothing() {
    let backend = ScriptedBackend::new(|_| {
        Reply::ChunksThenError(
            vec!["a".to_string()],
            LlmError::StreamError("connection reset".to_string()),
        )
    });
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let results: Vec<_> = session
        .prompt_streaming("hi", PromptOptions::new())
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 2);
    assert!(matches!(results[1], Err(LlmError::StreamError(_))));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn provider_failure_propagates_without_commit() {
    let backend = ScriptedBackend::new(|_| Reply::Error(LlmError::api_error(503, "overloaded")));
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let err = session.prompt("hi", PromptOptions::new()).await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn append_extends_history_without_generating() {
    let backend = ScriptedBackend::conversational();
    let mut session = session_with(&backend, CreateOptions::new()).await;

    session
        .append("My name is Ann.", PromptOptions::new())
        .await
        .unwrap();
    assert_eq!(session.history().len(), 1);
    assert_eq!(backend.generate_calls(), 0);

    let answer = session
        .prompt("What is my name?", PromptOptions::new())
        .await
        .unwrap();
    assert!(answer.contains("Ann"));
}

#[tokio::test]
async fn measuring_usage_changes_nothing() {
    let backend = ScriptedBackend::constant("ok");
    let session = session_with(&backend, CreateOptions::new()).await;

    let tokens = session
        .measure_input_usage("abcdefgh", PromptOptions::new())
        .await
        .unwrap();
    assert_eq!(tokens, 2);
    assert_eq!(session.input_usage(), 0);
    assert!(session.history().is_empty());

    let counted = backend.counted();
    assert_eq!(counted.len(), 1);
    assert_eq!(counted[0].len(), 1);
    assert_eq!(counted[0][0].text(), "abcdefgh");
}

#[tokio::test]
async fn structured_output_is_validated() {
    let backend = ScriptedBackend::constant(r#"{"n": 4}"#);
    let mut session = session_with(
        &backend,
        CreateOptions::new().with_response_constraint(number_schema()),
    )
    .await;

    let answer = session.prompt("2+2?", PromptOptions::new()).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&answer).unwrap();
    assert_eq!(value["n"], 4);
    assert_eq!(
        backend.requests()[0].response_constraint,
        Some(number_schema())
    );
}

#[tokio::test]
async fn nonconforming_response_is_a_parse_error() {
    let backend = ScriptedBackend::constant(r#"{"n": "four"}"#);
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let err = session
        .prompt(
            "2+2?",
            PromptOptions::new().with_response_constraint(number_schema()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ParseError(_)));
    assert!(session.history().is_empty());

    // without a constraint the same text is accepted
    session.prompt("2+2?", PromptOptions::new()).await.unwrap();
    assert_eq!(backend.requests()[1].response_constraint, None);
}

#[tokio::test]
async fn prompt_constraint_overrides_session_constraint() {
    let override_schema = json!({ "type": "string" });
    let backend = ScriptedBackend::constant(r#""four""#);
    let mut session = session_with(
        &backend,
        CreateOptions::new().with_response_constraint(number_schema()),
    )
    .await;

    session
        .prompt(
            "2+2?",
            PromptOptions::new().with_response_constraint(override_schema.clone()),
        )
        .await
        .unwrap();
    assert_eq!(
        backend.requests()[0].response_constraint,
        Some(override_schema)
    );
}

#[tokio::test]
async fn invalid_schema_is_rejected_at_creation() {
    let backend = ScriptedBackend::constant("ok");
    let err = LanguageModel::create(
        Arc::new(backend.clone()),
        CreateOptions::new().with_response_constraint(json!({ "type": 12 })),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LlmError::InvalidParameter(_)));
    assert_eq!(backend.sessions_created(), 0);
}

#[tokio::test]
async fn system_message_in_prompt_is_unsupported() {
    let backend = ScriptedBackend::constant("ok");
    let mut session = session_with(&backend, CreateOptions::new()).await;

    let err = session
        .prompt(
            vec![PromptMessage::system("new rules"), PromptMessage::user("hi")],
            PromptOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::UnsupportedOperation(_)));
    assert_eq!(backend.generate_calls(), 0);
}

#[tokio::test]
async fn sampling_parameters_are_range_checked() {
    let backend = ScriptedBackend::constant("ok").with_params(ModelParams {
        default_temperature: 0.8,
        max_temperature: 1.0,
        default_top_k: 40,
        max_top_k: 64,
    });

    let err = LanguageModel::create(
        Arc::new(backend.clone()),
        CreateOptions::new().with_temperature(1.5),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LlmError::InvalidParameter(_)));

    let session = session_with(&backend, CreateOptions::new()).await;
    assert_eq!(session.temperature(), 0.8);
    assert_eq!(session.top_k(), 40);
}

#[tokio::test]
async fn availability_and_params_come_from_the_backend() {
    let backend = ScriptedBackend::constant("ok").with_availability(Availability::Downloadable);
    let options = AvailabilityOptions {
        expected_inputs: vec![ExpectedInput::image()],
        expected_outputs: Vec::new(),
    };
    assert_eq!(
        LanguageModel::availability(&backend, &options).await,
        Availability::Downloadable
    );
    assert_eq!(LanguageModel::params(&backend), ModelParams::default());
}
