//! Session bridge integration tests
//!
//! Runs the real server on a loopback port with a scripted process launcher
//! and drives it with a WebSocket client.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use dc_core::config::ConsoleConfig;
use dc_core::error::{LaunchError, SessionError};
use dc_core::traits::{ProcessControl, ProcessInput, ProcessLauncher, ProcessOutput, SpawnedProcess};
use dc_core::ContainerId;
use dc_protocol::{Frame, InitRequest, TerminalSize};
use dc_server::auth::fingerprint;
use dc_server::bridge::CLOSE_TIMEOUT;
use dc_server::{AppState, ConsoleServer};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// What the scripted process observed
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Launched(String),
    Input(Vec<u8>),
    Resize(TerminalSize),
    Terminate,
}

#[derive(Default)]
struct EventLog(Mutex<Vec<Event>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, event: &Event) -> usize {
        self.snapshot().iter().filter(|e| *e == event).count()
    }

    async fn wait_for(&self, event: Event) {
        let found = timeout(WAIT, async {
            while !self.snapshot().contains(&event) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(
            found.is_ok(),
            "timed out waiting for {:?}, saw {:?}",
            event,
            self.snapshot()
        );
    }
}

struct ScriptedOutput(mpsc::Receiver<Bytes>);

#[async_trait]
impl ProcessOutput for ScriptedOutput {
    async fn read_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        Ok(self.0.recv().await)
    }
}

struct RecordingInput(Arc<EventLog>);

#[async_trait]
impl ProcessInput for RecordingInput {
    async fn write_all(&mut self, data: Bytes) -> std::io::Result<()> {
        self.0.push(Event::Input(data.to_vec()));
        Ok(())
    }
}

struct RecordingControl(Arc<EventLog>);

#[async_trait]
impl ProcessControl for RecordingControl {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        self.0.push(Event::Resize(size));
        Ok(())
    }

    async fn terminate(&self) -> Result<Option<i32>, SessionError> {
        self.0.push(Event::Terminate);
        Ok(Some(0))
    }
}

/// Launcher handing out a scripted process whose output the test controls
#[derive(Default)]
struct ScriptedLauncher {
    events: Arc<EventLog>,
    output: Mutex<Option<mpsc::Sender<Bytes>>>,
    fail: bool,
}

impl ScriptedLauncher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    async fn output(&self) -> mpsc::Sender<Bytes> {
        timeout(WAIT, async {
            loop {
                if let Some(tx) = self.output.lock().unwrap().clone() {
                    return tx;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("process was never launched")
    }

    /// Drop the output sender so the process appears to exit
    fn exit(&self) {
        self.output.lock().unwrap().take();
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedLauncher {
    async fn launch(&self, container: &ContainerId) -> Result<SpawnedProcess, LaunchError> {
        self.events.push(Event::Launched(container.to_string()));
        if self.fail {
            return Err(LaunchError::Spawn {
                container: container.to_string(),
                reason: "no such container".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(16);
        *self.output.lock().unwrap() = Some(tx);
        Ok(SpawnedProcess {
            output: Box::new(ScriptedOutput(rx)),
            input: Box::new(RecordingInput(Arc::clone(&self.events))),
            control: Arc::new(RecordingControl(Arc::clone(&self.events))),
        })
    }
}

struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    launcher: Arc<ScriptedLauncher>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(config: ConsoleConfig) -> Self {
        Self::start_with(config, ScriptedLauncher::default()).await
    }

    async fn start_with(config: ConsoleConfig, launcher: ScriptedLauncher) -> Self {
        let launcher = Arc::new(launcher);
        let state = Arc::new(AppState::new(config, launcher.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = ConsoleServer::new(Arc::clone(&state));
        let handle = tokio::spawn(async move { server.serve(listener).await });

        Self {
            addr,
            state,
            launcher,
            handle,
        }
    }

    fn events(&self) -> &EventLog {
        &self.launcher.events
    }

    async fn connect(&self) -> Client {
        let url = format!("ws://{}/ws", self.addr);
        let (client, response) = tokio_tungstenite::connect_async(url).await.unwrap();
        let server = response.headers().get("server").unwrap().to_str().unwrap();
        assert!(server.starts_with("docker-console/"));
        client
    }

    /// Connect and authenticate as container `c_id`
    async fn attach(&self, c_id: &str) -> Client {
        let mut client = self.connect().await;
        let init = InitRequest::new("task", "7", c_id, fingerprint("task", "7", c_id));
        send_frame(&mut client, init.to_frame()).await;
        client
    }
}

async fn send_frame(client: &mut Client, frame: Frame) {
    let message = match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data.to_vec()),
    };
    client.send(message).await.unwrap();
}

/// Next data or close message; `None` once the stream has ended
async fn next_message(client: &mut Client) -> Option<Message> {
    timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(message)) => return Some(message),
                Some(Err(_)) | None => return None,
            }
        }
    })
    .await
    .expect("timed out waiting for a message")
}

async fn next_text(client: &mut Client) -> String {
    match next_message(client).await {
        Some(Message::Text(text)) => text,
        other => panic!("expected a text frame, got {:?}", other),
    }
}

/// Assert the connection closes, returning the close code if one was sent
async fn expect_closed(client: &mut Client) -> Option<u16> {
    match next_message(client).await {
        Some(Message::Close(frame)) => frame.map(|f| u16::from(f.code)),
        None => None,
        other => panic!("expected the connection to close, got {:?}", other),
    }
}

/// Consume title, preferences and (by default) reconnect messages
async fn skip_greeting(client: &mut Client, reconnect: bool) {
    assert!(next_text(client).await.starts_with('2'));
    assert!(next_text(client).await.starts_with('3'));
    if reconnect {
        assert!(next_text(client).await.starts_with('4'));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_greeting_sent_in_order() {
    let mut config = ConsoleConfig::default();
    config.title_format = "{container}@{hostname} pid {pid}".to_string();
    config.preferences.font_size = Some(14);
    config.reconnect_time = Duration::from_secs(7);
    let server = TestServer::start(config).await;

    let mut client = server.attach("web").await;

    let title = next_text(&mut client).await;
    assert_eq!(title, format!("2web@{} pid 4242", server.state.hostname));

    let prefs = next_text(&mut client).await;
    let prefs = prefs.strip_prefix('3').unwrap();
    let prefs: serde_json::Value = serde_json::from_str(prefs).unwrap();
    assert_eq!(prefs["font-size"], 14);

    assert_eq!(next_text(&mut client).await, "47");
    assert_eq!(
        server.events().snapshot(),
        vec![Event::Launched("web".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconnect_disabled_skips_message() {
    let mut config = ConsoleConfig::default();
    config.enable_reconnect = false;
    let server = TestServer::start(config).await;

    let mut client = server.attach("web").await;
    skip_greeting(&mut client, false).await;

    server.launcher.output().await.send(Bytes::from_static(b"$ ")).await.unwrap();
    assert_eq!(
        next_message(&mut client).await,
        Some(Message::Binary(b"$ ".to_vec()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejects_wrong_fingerprint() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.connect().await;

    let init = InitRequest::new("task", "7", "web", fingerprint("task", "8", "web"));
    send_frame(&mut client, init.to_frame()).await;

    assert_eq!(next_text(&mut client).await, "Auth is not allowed!");
    expect_closed(&mut client).await;
    assert!(server.events().snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejects_missing_client_id() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.connect().await;

    let init = InitRequest::new("task", "7", "", fingerprint("task", "7", ""));
    send_frame(&mut client, init.to_frame()).await;

    assert_eq!(next_text(&mut client).await, "Parameter is error !");
    expect_closed(&mut client).await;
    assert!(server.events().snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejects_malformed_init() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.connect().await;

    client.send(Message::Text("not json".to_string())).await.unwrap();

    assert_eq!(next_text(&mut client).await, "Parameter is error !");
    expect_closed(&mut client).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_launch_failure_closes_silently() {
    let server =
        TestServer::start_with(ConsoleConfig::default(), ScriptedLauncher::failing()).await;

    let mut client = server.attach("missing").await;

    expect_closed(&mut client).await;
    assert_eq!(
        server.events().snapshot(),
        vec![Event::Launched("missing".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_output_relayed_in_order() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    let output = server.launcher.output().await;
    for chunk in ["one ", "two ", "three"] {
        output.send(Bytes::from(chunk)).await.unwrap();
    }

    let mut received = Vec::new();
    while received.len() < b"one two three".len() {
        match next_message(&mut client).await {
            Some(Message::Binary(data)) => received.extend(data),
            other => panic!("expected output, got {:?}", other),
        }
    }
    assert_eq!(received, b"one two three");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_input_forwarded_verbatim() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    client.send(Message::Text("0ls -la\r".to_string())).await.unwrap();
    server.events().wait_for(Event::Input(b"ls -la\r".to_vec())).await;

    client.send(Message::Binary(vec![0x1b, 0x5b, 0x41])).await.unwrap();
    server.events().wait_for(Event::Input(vec![0x1b, 0x5b, 0x41])).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_known_credentials_open_session() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.connect().await;
    client
        .send(Message::Text(
            r#"{"t_id":"A","s_id":"B","c_id":"C","md5":"3510e0bfa31ada47a9b76fc9ba9dff17"}"#
                .to_string(),
        ))
        .await
        .unwrap();
    skip_greeting(&mut client, true).await;

    client.send(Message::Text("0ls\n".to_string())).await.unwrap();
    server.events().wait_for(Event::Input(b"ls\n".to_vec())).await;
    assert_eq!(
        server.events().snapshot(),
        vec![
            Event::Launched("C".to_string()),
            Event::Input(b"ls\n".to_vec())
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_read_only_session_drops_input() {
    let mut config = ConsoleConfig::default();
    config.permit_write = false;
    let server = TestServer::start(config).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    client.send(Message::Text("0rm -rf /\r".to_string())).await.unwrap();
    client.send(Message::Text("1".to_string())).await.unwrap();

    // Frames are handled in order, so the pong means the input was seen
    assert_eq!(next_text(&mut client).await, "1");
    assert!(!server
        .events()
        .snapshot()
        .iter()
        .any(|e| matches!(e, Event::Input(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_answered_with_pong() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    client.send(Message::Text("1".to_string())).await.unwrap();
    assert_eq!(next_text(&mut client).await, "1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pong_and_output_frames_stay_whole() {
    const CHUNKS: usize = 50;
    const CHUNK_LEN: usize = 512;
    const PINGS: usize = 20;

    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    let output = server.launcher.output().await;
    let producer = tokio::spawn(async move {
        for _ in 0..CHUNKS {
            output.send(Bytes::from(vec![b'x'; CHUNK_LEN])).await.unwrap();
        }
    });
    for _ in 0..PINGS {
        client.send(Message::Text("1".to_string())).await.unwrap();
    }

    let (mut pongs, mut bytes) = (0, 0);
    while pongs < PINGS || bytes < CHUNKS * CHUNK_LEN {
        match next_message(&mut client).await {
            Some(Message::Text(text)) => {
                assert_eq!(text, "1");
                pongs += 1;
            }
            Some(Message::Binary(data)) => {
                assert!(data.iter().all(|&b| b == b'x'));
                bytes += data.len();
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
    assert_eq!(bytes, CHUNKS * CHUNK_LEN);
    producer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resize_reaches_process() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    client
        .send(Message::Text(r#"2{"columns":120,"rows":40}"#.to_string()))
        .await
        .unwrap();
    server
        .events()
        .wait_for(Event::Resize(TerminalSize::new(40, 120)))
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resize_applied_before_following_input() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("A").await;
    skip_greeting(&mut client, true).await;

    client
        .send(Message::Text(r#"2{"columns":120,"rows":40}"#.to_string()))
        .await
        .unwrap();
    client.send(Message::Text("0ls\n".to_string())).await.unwrap();
    server.events().wait_for(Event::Input(b"ls\n".to_vec())).await;

    assert_eq!(
        server.events().snapshot(),
        vec![
            Event::Launched("A".to_string()),
            Event::Resize(TerminalSize::new(40, 120)),
            Event::Input(b"ls\n".to_vec()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_process_exit_closes_connection() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    server.launcher.output().await;
    server.launcher.exit();

    expect_closed(&mut client).await;
    server.events().wait_for(Event::Terminate).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.events().count(&Event::Terminate), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_close_terminates_process_once() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;
    let output = server.launcher.output().await;

    client.close(None).await.unwrap();
    server.events().wait_for(Event::Terminate).await;

    // The process side ending afterwards must not tear down twice
    drop(output);
    server.launcher.exit();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.events().count(&Event::Terminate), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_message_type_closes_with_code() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    client.send(Message::Text("9oops".to_string())).await.unwrap();

    assert_eq!(
        expect_closed(&mut client).await,
        Some(u16::from(CloseCode::Unsupported))
    );
    server.events().wait_for(Event::Terminate).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bad_resize_closes_with_code() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    client.send(Message::Text("2{rows:".to_string())).await.unwrap();

    assert_eq!(expect_closed(&mut client).await, Some(1003));
    assert!(!server
        .events()
        .snapshot()
        .iter()
        .any(|e| matches!(e, Event::Resize(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_tears_down_sessions() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    server.state.shutdown.cancel();

    expect_closed(&mut client).await;
    server.events().wait_for(Event::Terminate).await;
    let result = timeout(WAIT, server.handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_teardown_finishes_when_client_stops_reading() {
    let server = TestServer::start(ConsoleConfig::default()).await;
    let mut client = server.attach("web").await;
    skip_greeting(&mut client, true).await;

    // Flood output while the client never reads, so the socket backs up
    let output = server.launcher.output().await;
    let producer = tokio::spawn(async move {
        let chunk = Bytes::from(vec![b'x'; 64 * 1024]);
        while output.send(chunk.clone()).await.is_ok() {}
    });
    tokio::time::sleep(Duration::from_millis(500)).await;

    server.state.shutdown.cancel();
    server.events().wait_for(Event::Terminate).await;

    let drained = timeout(CLOSE_TIMEOUT + Duration::from_secs(2), async {
        while !server.state.sessions.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "session stuck closing a stalled connection");

    producer.abort();
    drop(client);
}
