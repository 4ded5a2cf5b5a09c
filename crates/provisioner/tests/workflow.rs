use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use http::StatusCode;
use provisioner::client::{BasicClient, RequestQueue};
use provisioner::common::http_client::HttpClient;
use provisioner::types::{AccountRequest, ServerConfig, Username, ValidationError};
use provisioner::{
    ProvisionError, ProvisionErrorKind, ProvisioningSession, ProvisioningWorkflow, SuggestionState,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

type Handler = dyn Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync;
type Latency = dyn Fn(&str, &Value) -> Duration + Send + Sync;

/// Answers each call by action name and records what was sent, in arrival
/// order.
#[derive(Clone)]
struct MockServer {
    handler: Arc<Handler>,
    latency: Arc<Latency>,
    log: Arc<Mutex<Vec<(String, Value)>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockServer {
    fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            latency: Arc::new(|_, _| Duration::ZERO),
            log: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&str, &Value) -> Duration + Send + Sync + 'static,
    {
        self.latency = Arc::new(latency);
        self
    }

    /// Mimics the reference server: `first.last` then `flast`.
    fn happy() -> Self {
        Self::new(happy_path)
    }

    async fn actions(&self) -> Vec<String> {
        self.log.lock().await.iter().map(|(a, _)| a.clone()).collect()
    }

    async fn bodies(&self, action: &str) -> Vec<Value> {
        self.log
            .lock()
            .await
            .iter()
            .filter(|(a, _)| a == action)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

fn happy_path(action: &str, body: &Value) -> (StatusCode, Value) {
    match action {
        "config" => (
            StatusCode::OK,
            json!({
                "domain": "example.org",
                "numberOfSuggestions": "2",
                "suggestedUsernamesTimeout": "120"
            }),
        ),
        "suggest" => {
            let first = body["firstname"].as_str().unwrap_or_default().to_lowercase();
            let last = body["lastname"].as_str().unwrap_or_default().to_lowercase();
            let initial: String = first.chars().take(1).collect();
            (
                StatusCode::OK,
                json!([format!("{first}.{last}"), format!("{initial}{last}")]),
            )
        }
        "select" => (StatusCode::OK, json!({"message": "Usernames unlocked."})),
        "create" => (StatusCode::OK, json!({"message": "User created successfully."})),
        other => (StatusCode::NOT_FOUND, json!({"errorMessage": format!("no such action {other}")})),
    }
}

impl HttpClient for MockServer {
    type Error = std::convert::Infallible;
    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>,
    > + Send {
        let server = self.clone();
        async move {
            let action = request
                .uri()
                .path()
                .strip_prefix("/rest/")
                .expect("provisioning path")
                .to_owned();
            let body: Value = if request.body().is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(request.body()).expect("json body")
            };
            let now = server.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            server.max_in_flight.fetch_max(now, Ordering::SeqCst);
            server.log.lock().await.push((action.clone(), body.clone()));

            let delay = (server.latency)(&action, &body);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            let (status, reply) = (server.handler)(&action, &body);

            server.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(http::Response::builder()
                .status(status)
                .body(serde_json::to_vec(&reply).unwrap())
                .unwrap())
        }
    }
}

fn config() -> ServerConfig {
    ServerConfig {
        domain: "example.org".into(),
        number_of_suggestions: 2,
        suggested_usernames_timeout: 120,
    }
}

fn workflow(server: &MockServer) -> ProvisioningWorkflow<BasicClient<MockServer>> {
    let base = url::Url::parse("http://localhost:8080").unwrap();
    ProvisioningWorkflow::new(BasicClient::with_client(server.clone(), base), config())
}

fn person(first: &str, last: &str) -> AccountRequest {
    AccountRequest::builder()
        .first_name(first)
        .last_name(last)
        .password("eightchar")
        .build()
}

#[tokio::test]
async fn empty_name_is_skipped_without_calls() {
    let server = MockServer::happy();
    let workflow = workflow(&server);

    let err = workflow
        .provision_one(&person("", "Lovelace"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::Skipped { field: "firstname" }));
    let err = workflow.provision_one(&person("Ada", " ")).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Skipped { field: "lastname" }));

    assert!(server.actions().await.is_empty());
}

#[tokio::test]
async fn invalid_fields_are_rejected_without_calls() {
    let server = MockServer::happy();
    let workflow = workflow(&server);

    let mut short = person("Ada", "Lovelace");
    short.password = "short".into();
    let err = workflow.provision_one(&short).await.unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Validation(ValidationError::PasswordTooShort)
    ));

    let long = person(&"a".repeat(61), "Lovelace");
    let err = workflow.provision_one(&long).await.unwrap_err();
    assert_eq!(err.kind(), ProvisionErrorKind::Validation);

    assert!(server.actions().await.is_empty());
}

#[tokio::test]
async fn provisions_ada_end_to_end() {
    let server = MockServer::happy();
    let base = url::Url::parse("http://localhost:8080").unwrap();
    let workflow = ProvisioningWorkflow::connect(BasicClient::with_client(server.clone(), base))
        .await
        .unwrap();
    assert_eq!(workflow.config(), &config());

    let account = workflow
        .provision_one(&person("Ada", "Lovelace"))
        .await
        .unwrap();
    assert_eq!(account.username, Username::new_static("ada.lovelace"));
    assert_eq!(account.domain, "example.org");
    assert_eq!(account.email(), "ada.lovelace@example.org");

    assert_eq!(
        server.actions().await,
        vec!["config", "suggest", "select", "create"]
    );
    assert_eq!(
        server.bodies("suggest").await,
        vec![json!({"firstname": "Ada", "lastname": "Lovelace"})]
    );
    assert_eq!(
        server.bodies("select").await,
        vec![json!({"username": "ada.lovelace", "suggestions": ["ada.lovelace", "alovelace"]})]
    );
    assert_eq!(
        server.bodies("create").await,
        vec![json!({
            "username": "ada.lovelace",
            "firstname": "Ada",
            "lastname": "Lovelace",
            "password": "eightchar"
        })]
    );
}

#[tokio::test]
async fn batch_reports_every_row_in_order() {
    let server = MockServer::happy();
    let workflow = workflow(&server);
    let requests = vec![
        person("Ada", "Lovelace"),
        person("Charles", "Babbage"),
        person("Grace", ""),
        person("Alan", "Turing"),
        person("Edsger", "Dijkstra"),
    ];

    let results = workflow.provision_batch(&requests).await;
    assert_eq!(results.len(), 5);

    let skipped: Vec<_> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Err(e) if e.is_skipped()))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(skipped, vec![2]);

    let usernames: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|a| a.username.to_string())
        .collect();
    assert_eq!(
        usernames,
        vec!["ada.lovelace", "charles.babbage", "alan.turing", "edsger.dijkstra"]
    );

    // lanes are independent: no release calls, one suggest per valid row
    assert_eq!(server.bodies("suggest").await.len(), 4);
    assert!(
        server
            .bodies("select")
            .await
            .iter()
            .all(|b| b["username"] != "")
    );
}

#[tokio::test(start_paused = true)]
async fn expired_selection_never_reaches_create() {
    let server = MockServer::happy();
    let workflow = workflow(&server);
    let ada = person("Ada", "Lovelace");

    let set = workflow.suggest(&ada).await.unwrap();
    let username = set.first().unwrap().clone();
    let selected = workflow.select(&username, &set).await.unwrap();
    assert_eq!(workflow.state().await, SuggestionState::Selected);

    tokio::time::advance(Duration::from_secs(121)).await;

    let err = workflow.create(&selected, &ada).await.unwrap_err();
    assert!(matches!(err, ProvisionError::ExpiredSuggestions));
    assert_eq!(server.actions().await, vec!["suggest", "select"]);
    assert_eq!(workflow.state().await, SuggestionState::Expired);
}

#[tokio::test(start_paused = true)]
async fn select_rejects_stale_and_expired_sets() {
    let server = MockServer::happy();
    let workflow = workflow(&server);
    let ada = person("Ada", "Lovelace");

    let first = workflow.suggest(&ada).await.unwrap();
    let second = workflow.suggest(&ada).await.unwrap();
    assert!(second.generation() > first.generation());

    let err = workflow
        .select(first.first().unwrap(), &first)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::StaleSuggestions));

    let stranger = Username::new_static("someone.else");
    let err = workflow.select(&stranger, &second).await.unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Validation(ValidationError::NotSuggested(_))
    ));

    tokio::time::advance(Duration::from_secs(120)).await;
    assert_eq!(workflow.state().await, SuggestionState::Expired);
    let err = workflow
        .select(second.first().unwrap(), &second)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::ExpiredSuggestions));

    // only the release between the two suggest calls went out
    assert_eq!(server.actions().await, vec!["suggest", "select", "suggest"]);
}

#[tokio::test]
async fn resuggest_releases_the_previous_set_first() {
    let server = MockServer::happy();
    let workflow = workflow(&server);

    workflow.suggest(&person("Ada", "Lovelace")).await.unwrap();
    assert_eq!(workflow.state().await, SuggestionState::Valid);
    workflow.suggest(&person("Ada", "Byron")).await.unwrap();

    assert_eq!(server.actions().await, vec!["suggest", "select", "suggest"]);
    assert_eq!(
        server.bodies("select").await,
        vec![json!({"username": "", "suggestions": ["ada.lovelace", "alovelace"]})]
    );

    // explicit release of the current set
    assert!(workflow.release().await.unwrap());
    assert!(!workflow.release().await.unwrap());
    assert_eq!(workflow.state().await, SuggestionState::Unrequested);
    assert_eq!(
        server.bodies("select").await[1],
        json!({"username": "", "suggestions": ["ada.byron", "abyron"]})
    );
}

#[tokio::test]
async fn failed_release_does_not_block_new_suggestions() {
    let server = MockServer::new(|action, body| match action {
        "select" => (StatusCode::OK, json!({"errorMessage": "Unlock failed."})),
        _ => happy_path(action, body),
    });
    let workflow = workflow(&server);

    workflow.suggest(&person("Ada", "Lovelace")).await.unwrap();
    let set = workflow.suggest(&person("Ada", "Lovelace")).await.unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(workflow.state().await, SuggestionState::Valid);
}

#[tokio::test]
async fn error_message_maps_to_remote_even_on_200() {
    let server = MockServer::new(|action, body| match action {
        "create" => (
            StatusCode::OK,
            json!({"errorMessage": "User ada.lovelace already exists."}),
        ),
        _ => happy_path(action, body),
    });
    let workflow = workflow(&server);

    let err = workflow
        .provision_one(&person("Ada", "Lovelace"))
        .await
        .unwrap_err();
    match err {
        ProvisionError::Remote(remote) => {
            assert_eq!(remote.message(), "User ada.lovelace already exists.");
            assert_eq!(remote.status, StatusCode::OK);
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_or_empty_suggest_returns_to_unrequested() {
    let server = MockServer::new(|action, body| match (action, body["lastname"].as_str()) {
        ("suggest", Some("Nobody")) => (StatusCode::OK, json!([])),
        ("suggest", Some("Broken")) => (StatusCode::INTERNAL_SERVER_ERROR, json!("oops")),
        _ => happy_path(action, body),
    });
    let workflow = workflow(&server);

    let err = workflow.suggest(&person("Ada", "Nobody")).await.unwrap_err();
    assert!(matches!(err, ProvisionError::NoSuggestions));
    assert_eq!(workflow.state().await, SuggestionState::Unrequested);

    let err = workflow.suggest(&person("Ada", "Broken")).await.unwrap_err();
    assert_eq!(err.kind(), ProvisionErrorKind::Transport);
    assert_eq!(workflow.state().await, SuggestionState::Unrequested);
}

#[tokio::test(start_paused = true)]
async fn huge_server_timeout_is_accepted() {
    let server = MockServer::happy();
    let base = url::Url::parse("http://localhost:8080").unwrap();
    let mut config = config();
    config.suggested_usernames_timeout = u64::MAX;
    let workflow = ProvisioningWorkflow::new(BasicClient::with_client(server.clone(), base), config);

    let account = workflow
        .provision_one(&person("Ada", "Lovelace"))
        .await
        .unwrap();
    assert_eq!(account.email(), "ada.lovelace@example.org");

    let set = workflow.suggest(&person("Ada", "Byron")).await.unwrap();
    tokio::time::advance(Duration::from_secs(86_400)).await;
    assert!(!set.is_expired());
    assert_eq!(workflow.state().await, SuggestionState::Valid);
}

#[tokio::test]
async fn interactive_session_runs_over_the_queue() {
    let server = MockServer::happy();
    let base = url::Url::parse("http://localhost:8080").unwrap();
    let queue = RequestQueue::with_client(server.clone(), base);
    let session = ProvisioningSession::connect(queue.clone()).await.unwrap();
    assert_eq!(session.domain(), "example.org");

    let ada = person("Ada", "Lovelace");
    session.suggest(&person("Ada", "Byron")).await.unwrap();
    let set = session.suggest(&ada).await.unwrap();
    let selected = session.select(set.first().unwrap(), &set).await.unwrap();
    let account = session.create(&selected, &ada).await.unwrap();
    assert_eq!(account.email(), "ada.lovelace@example.org");

    assert_eq!(
        server.actions().await,
        vec!["config", "suggest", "select", "suggest", "select", "create"]
    );
    assert_eq!(
        server.bodies("select").await[0],
        json!({"username": "", "suggestions": ["ada.byron", "abyron"]})
    );
    assert_eq!(server.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn overlapping_suggest_releases_the_superseded_set() {
    // the first call answers last
    let server = MockServer::happy().with_latency(|action, body| {
        match (action, body["lastname"].as_str()) {
            ("suggest", Some("Lovelace")) => Duration::from_millis(50),
            ("suggest", _) => Duration::from_millis(10),
            _ => Duration::ZERO,
        }
    });
    let workflow = workflow(&server);

    let lovelace = person("Ada", "Lovelace");
    let byron = person("Ada", "Byron");
    let (first, second) = tokio::join!(
        workflow.suggest(&lovelace),
        workflow.suggest(&byron),
    );
    assert!(matches!(first, Err(ProvisionError::StaleSuggestions)));
    let second = second.unwrap();
    assert_eq!(second.first().unwrap(), "ada.byron");
    assert_eq!(workflow.state().await, SuggestionState::Valid);
    assert_eq!(workflow.session().current().await, Some(second));

    assert_eq!(server.actions().await, vec!["suggest", "suggest", "select"]);
    assert_eq!(
        server.bodies("select").await,
        vec![json!({"username": "", "suggestions": ["ada.lovelace", "alovelace"]})]
    );
}
