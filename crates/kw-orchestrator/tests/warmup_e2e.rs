//! End-to-end warm-up tests
//!
//! Drives the full orchestrator sequence against an axum stub of the
//! control API and an in-memory kernel.

#![cfg(unix)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use kw_core::config::{ServerCommand, WarmupConfig};
use kw_core::store::{KERNEL_ID_FILE, SESSION_INFO_FILE};
use kw_core::traits::{IopubChannel, KernelChannels, KernelConnector, ShellChannel};
use kw_core::{ChannelError, SessionStore, WarmupError, WarmupPhase};
use kw_orchestrator::{ExecutionResult, HttpStatusProbe, Orchestrator, SessionBootstrapper};
use kw_protocol::{ConnectionInfo, Message, MessageType};

/// Stub control API state
#[derive(Clone)]
struct Stub {
    status_calls: Arc<AtomicU32>,
    unavailable_for: u32,
    execution_state: &'static str,
    posted: Arc<Mutex<Option<Value>>>,
}

impl Stub {
    fn new(unavailable_for: u32, execution_state: &'static str) -> Self {
        Self {
            status_calls: Arc::new(AtomicU32::new(0)),
            unavailable_for,
            execution_state,
            posted: Arc::new(Mutex::new(None)),
        }
    }
}

async fn status(State(stub): State<Stub>) -> StatusCode {
    let call = stub.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call <= stub.unavailable_for {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn create_session(
    State(stub): State<Stub>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *stub.posted.lock().unwrap() = Some(body.clone());
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "sess-1",
            "path": body["path"],
            "name": body["name"],
            "type": body["type"],
            "kernel": {
                "id": "abc123",
                "name": body["kernel"]["name"],
                "last_activity": "2024-01-01T00:00:00.000000Z",
                "execution_state": stub.execution_state,
                "connections": 0
            }
        })),
    )
}

/// Serve the stub on an ephemeral port and return its base URL
async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/api/status", get(status))
        .route("/api/sessions", post(create_session))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Kernel that replies `reply_after` after each request
struct ScriptedKernel {
    reply_after: Option<Duration>,
    status: &'static str,
}

struct ScriptedShell {
    reply_after: Option<Duration>,
    status: &'static str,
    pending: Option<Message>,
}

#[async_trait]
impl ShellChannel for ScriptedShell {
    async fn send(&mut self, message: Message) -> Result<(), ChannelError> {
        self.pending = Some(message);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message, ChannelError> {
        let (Some(delay), Some(request)) = (self.reply_after, self.pending.take()) else {
            return std::future::pending().await;
        };
        tokio::time::sleep(delay).await;

        let mut content = json!({"status": self.status, "execution_count": 1});
        if self.status == "error" {
            content["ename"] = json!("ModuleNotFoundError");
            content["evalue"] = json!("No module named 'seaborn'");
        }
        Ok(Message::reply_to(&request, MessageType::ExecuteReply, content))
    }

    async fn close(self: Box<Self>) -> Result<(), ChannelError> {
        Ok(())
    }
}

struct ScriptedIopub {
    sent: usize,
}

#[async_trait]
impl IopubChannel for ScriptedIopub {
    async fn recv(&mut self) -> Result<Message, ChannelError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.sent += 1;
        let state = if self.sent % 2 == 1 { "busy" } else { "idle" };
        Ok(Message::new("kernel", MessageType::Status, json!({"execution_state": state})))
    }
}

#[async_trait]
impl KernelConnector for ScriptedKernel {
    async fn connect(&self, _info: &ConnectionInfo) -> Result<KernelChannels, ChannelError> {
        Ok(KernelChannels {
            session: "e2e".to_string(),
            shell: Box::new(ScriptedShell {
                reply_after: self.reply_after,
                status: self.status,
                pending: None,
            }),
            iopub: Box::new(ScriptedIopub { sent: 0 }),
        })
    }
}

fn write_connection_file(runtime: &Path) {
    std::fs::create_dir_all(runtime).unwrap();
    std::fs::write(
        runtime.join("kernel-x.json"),
        r#"{
            "ip": "127.0.0.1",
            "transport": "tcp",
            "shell_port": 50001,
            "iopub_port": 50002,
            "stdin_port": 50003,
            "control_port": 50004,
            "hb_port": 50005,
            "key": "a0436f6c-1916-498b-8eb9-e81ab9368e84",
            "signature_scheme": "hmac-sha256",
            "kernel_name": "python3"
        }"#,
    )
    .unwrap();
}

fn test_config(base_url: String, dir: &Path) -> WarmupConfig {
    WarmupConfig {
        base_url,
        poll_interval: Duration::from_millis(10),
        artifact_dir: dir.join("jupyter"),
        runtime_dir: dir.join("runtime"),
        execute_timeout: Duration::from_secs(60),
        grace_period: Duration::ZERO,
        server: ServerCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 0".to_string()],
        },
        ..WarmupConfig::default()
    }
}

fn orchestrator(
    config: WarmupConfig,
    kernel: ScriptedKernel,
) -> Orchestrator<HttpStatusProbe, ScriptedKernel> {
    let client = reqwest::Client::new();
    let probe = HttpStatusProbe::new(client.clone(), config.status_url());
    Orchestrator::new(config, client, probe, kernel, CancellationToken::new())
}

#[tokio::test]
async fn test_full_warmup_sequence() {
    let dir = tempfile::TempDir::new().unwrap();
    let stub = Stub::new(2, "starting");
    let base_url = spawn_stub(stub.clone()).await;
    write_connection_file(&dir.path().join("runtime"));

    let mut orchestrator = orchestrator(
        test_config(base_url, dir.path()),
        ScriptedKernel {
            reply_after: Some(Duration::from_millis(50)),
            status: "ok",
        },
    );

    let summary = orchestrator.run().await.unwrap();
    let report = &summary.report;

    assert_eq!(report.readiness.attempts, 3);
    assert!(report.readiness.elapsed >= Duration::from_millis(20));
    assert_eq!(stub.status_calls.load(Ordering::SeqCst), 3);

    assert_eq!(report.kernel_id().as_str(), "abc123");
    assert_eq!(report.connection_file, dir.path().join("runtime").join("kernel-x.json"));

    match &report.execution {
        ExecutionResult::Completed(outcome) => {
            assert_eq!(outcome.status(), Some("ok"));
            assert_eq!(outcome.reply.parent_msg_id(), Some(&outcome.msg_id));
            assert!(outcome.elapsed >= Duration::from_millis(50));
        }
        other => panic!("expected a completed execution, got {:?}", other),
    }

    assert!(summary.exit_status.success());
    assert_eq!(orchestrator.phase(), WarmupPhase::Terminated);

    let artifacts = dir.path().join("jupyter");
    assert_eq!(std::fs::read_to_string(artifacts.join(KERNEL_ID_FILE)).unwrap(), "abc123");
    let info: Value =
        serde_json::from_str(&std::fs::read_to_string(artifacts.join(SESSION_INFO_FILE)).unwrap())
            .unwrap();
    assert_eq!(info["kernel"]["id"], "abc123");

    let posted = stub.posted.lock().unwrap().clone().unwrap();
    assert_eq!(posted["type"], "notebook");
    assert_eq!(posted["kernel"]["name"], "python3");
    assert_eq!(posted["name"], "default");
}

#[tokio::test]
async fn test_error_reply_still_counts_as_warmed() {
    let dir = tempfile::TempDir::new().unwrap();
    let base_url = spawn_stub(Stub::new(0, "starting")).await;
    write_connection_file(&dir.path().join("runtime"));

    let mut orchestrator = orchestrator(
        test_config(base_url, dir.path()),
        ScriptedKernel {
            reply_after: Some(Duration::from_millis(10)),
            status: "error",
        },
    );

    let summary = orchestrator.run().await.unwrap();
    match &summary.report.execution {
        ExecutionResult::Completed(outcome) => assert_eq!(outcome.status(), Some("error")),
        other => panic!("expected a completed execution, got {:?}", other),
    }
}

#[tokio::test]
async fn test_execution_timeout_is_not_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let base_url = spawn_stub(Stub::new(0, "starting")).await;
    write_connection_file(&dir.path().join("runtime"));

    let mut config = test_config(base_url, dir.path());
    config.execute_timeout = Duration::from_millis(200);
    let mut orchestrator = orchestrator(
        config,
        ScriptedKernel {
            reply_after: None,
            status: "ok",
        },
    );

    let summary = orchestrator.run().await.unwrap();
    assert!(matches!(
        summary.report.execution,
        ExecutionResult::TimedOut(t) if t == Duration::from_millis(200)
    ));
    assert_eq!(orchestrator.phase(), WarmupPhase::Terminated);
}

#[tokio::test]
async fn test_shutdown_while_waiting_on_server_is_cancelled() {
    let dir = tempfile::TempDir::new().unwrap();
    let base_url = spawn_stub(Stub::new(0, "starting")).await;
    write_connection_file(&dir.path().join("runtime"));

    let mut config = test_config(base_url, dir.path());
    config.server = ServerCommand {
        program: "sleep".to_string(),
        args: vec!["5".to_string()],
    };
    let client = reqwest::Client::new();
    let probe = HttpStatusProbe::new(client.clone(), config.status_url());
    let cancel = CancellationToken::new();
    let kernel = ScriptedKernel {
        reply_after: Some(Duration::from_millis(10)),
        status: "ok",
    };
    let mut orchestrator = Orchestrator::new(config, client, probe, kernel, cancel.clone());

    let kernel_id = dir.path().join("jupyter").join(KERNEL_ID_FILE);
    tokio::spawn(async move {
        // Warm-up is done once the kernel ID is persisted
        while !kernel_id.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let err = orchestrator.run().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(matches!(
        err,
        WarmupError::Cancelled {
            phase: WarmupPhase::Draining
        }
    ));
    assert_eq!(orchestrator.phase(), WarmupPhase::Terminated);
}

#[tokio::test]
async fn test_missing_connection_file_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let base_url = spawn_stub(Stub::new(0, "starting")).await;

    let mut orchestrator = orchestrator(
        test_config(base_url, dir.path()),
        ScriptedKernel {
            reply_after: Some(Duration::from_millis(10)),
            status: "ok",
        },
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(
        err,
        WarmupError::AmbiguousOrMissingConnection { found: 0, .. }
    ));
    assert_eq!(orchestrator.phase(), WarmupPhase::Terminated);
    // The session was created before discovery failed
    assert!(dir.path().join("jupyter").join(KERNEL_ID_FILE).exists());
}

#[tokio::test]
async fn test_stale_connection_files_are_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let base_url = spawn_stub(Stub::new(0, "starting")).await;
    let runtime = dir.path().join("runtime");
    write_connection_file(&runtime);
    std::fs::write(runtime.join("kernel-stale.json"), "{}").unwrap();

    let mut orchestrator = orchestrator(
        test_config(base_url, dir.path()),
        ScriptedKernel {
            reply_after: Some(Duration::from_millis(10)),
            status: "ok",
        },
    );

    assert!(matches!(
        orchestrator.run().await,
        Err(WarmupError::AmbiguousOrMissingConnection { found: 2, .. })
    ));
}

#[tokio::test]
async fn test_non_starting_kernel_is_protocol_violation() {
    let dir = tempfile::TempDir::new().unwrap();
    let stub = Stub::new(0, "idle");
    let base_url = spawn_stub(stub).await;
    let store = SessionStore::new(dir.path().join("jupyter"));

    let bootstrapper = SessionBootstrapper::new(
        reqwest::Client::new(),
        format!("{}/api/sessions", base_url),
        store,
    );
    let request = kw_core::SessionRequest::notebook("/home/user", "python3", "default");

    match bootstrapper.create_session(&request).await {
        Err(WarmupError::ProtocolViolation { status, body, .. }) => {
            assert_eq!(status, 201);
            assert!(body.contains("\"execution_state\":\"idle\""));
        }
        other => panic!("expected a protocol violation, got {:?}", other),
    }
    assert!(!bootstrapper.store().kernel_id_path().exists());
}

#[tokio::test]
async fn test_session_without_kernel_is_protocol_violation() {
    let app = Router::new().route(
        "/api/sessions",
        post(|| async { (StatusCode::CREATED, Json(json!({"id": "sess-1"}))) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let dir = tempfile::TempDir::new().unwrap();
    let bootstrapper = SessionBootstrapper::new(
        reqwest::Client::new(),
        format!("http://{}/api/sessions", addr),
        SessionStore::new(dir.path()),
    );
    let request = kw_core::SessionRequest::notebook("/home/user", "python3", "default");

    assert!(matches!(
        bootstrapper.create_session(&request).await,
        Err(WarmupError::ProtocolViolation { .. })
    ));
}
