mod helpers;

use std::time::Duration;

use helpers::test_client;
use sacola::suggest::{Phase, SuggestionDebouncer, SuggestionState, DEBOUNCE_INTERVAL};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn debouncer(server: &MockServer) -> SuggestionDebouncer {
    SuggestionDebouncer::new(test_client(&format!("{}/api", server.uri())))
}

async fn mount_suggestions(server: &MockServer, texto: &str, sugestoes: &[&str], delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/api/lembrancas/sugerir"))
        .and(body_json(json!({ "texto": texto })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "sugestoes": sugestoes }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn burst_of_keystrokes_sends_one_request() {
    let server = MockServer::start().await;
    mount_suggestions(&server, "abc", &["Comprar abacate"], Duration::ZERO).await;

    let debouncer = debouncer(&server);
    let first = debouncer.submit_text("a");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = debouncer.submit_text("ab");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let third = debouncer.submit_text("abc");
    assert_eq!(debouncer.current().phase, Phase::Pending);
    assert!(debouncer.current().loading);

    let last = third.last().await.unwrap();
    assert_eq!(last.phase, Phase::Resolved);
    assert_eq!(last.results, vec!["Comprar abacate".to_string()]);
    assert!(!last.loading);

    // Superseded submissions end without ever reaching a terminal state.
    assert_eq!(first.last().await.unwrap().phase, Phase::Pending);
    assert_eq!(second.last().await.unwrap().phase, Phase::Pending);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({ "texto": "abc" }));
    assert_eq!(debouncer.current(), last);
}

#[tokio::test]
async fn late_response_for_older_input_is_ignored() {
    let server = MockServer::start().await;
    mount_suggestions(&server, "a", &["resposta velha"], Duration::from_millis(1500)).await;
    mount_suggestions(&server, "abc", &["resposta nova"], Duration::ZERO).await;

    let debouncer = debouncer(&server);
    let mut older = debouncer.submit_text("a");
    assert_eq!(older.next().await.unwrap().phase, Phase::Pending);
    assert_eq!(older.next().await.unwrap().phase, Phase::InFlight);

    let newer = debouncer.submit_text("abc");
    let resolved = newer.last().await.unwrap();
    assert_eq!(resolved.results, vec!["resposta nova".to_string()]);

    // Wait for the older request to come back and be discarded.
    assert_eq!(older.next().await, None);
    assert_eq!(debouncer.current().phase, Phase::Resolved);
    assert_eq!(debouncer.current().results, vec!["resposta nova".to_string()]);
}

#[tokio::test]
async fn clearing_input_cancels_pending_query() {
    let server = MockServer::start().await;
    mount_suggestions(&server, "abc", &["x"], Duration::ZERO).await;

    let debouncer = debouncer(&server);
    let pending = debouncer.submit_text("abc");
    let mut cleared = debouncer.submit_text("");

    assert_eq!(debouncer.current(), SuggestionState::default());
    assert_eq!(cleared.next().await, Some(SuggestionState::default()));
    assert_eq!(cleared.next().await, None);

    pending.last().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(debouncer.current().phase, Phase::Idle);
}

#[tokio::test]
async fn failed_request_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/lembrancas/sugerir"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({"detail": "IA indisponível"})),
        )
        .mount(&server)
        .await;

    let debouncer = debouncer(&server);
    let state = debouncer.submit_text("viagem").last().await.unwrap();

    assert_eq!(state.phase, Phase::Failed);
    assert!(state.results.is_empty());
    assert!(state.error.unwrap().contains("IA indisponível"));
}

#[tokio::test]
async fn subscribers_see_applied_states() {
    let server = MockServer::start().await;
    mount_suggestions(&server, "livro", &["Ler Dom Casmurro"], Duration::ZERO).await;

    let debouncer = debouncer(&server);
    let mut watcher = debouncer.subscribe();
    let stream = debouncer.submit_text("livro");

    tokio::time::timeout(DEBOUNCE_INTERVAL * 5, async {
        loop {
            watcher.changed().await.unwrap();
            if watcher.borrow_and_update().phase == Phase::Resolved {
                break;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(stream.last().await.unwrap().results, vec!["Ler Dom Casmurro".to_string()]);
}
