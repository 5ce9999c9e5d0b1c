use super::*;
use crate::test_support::{MemoryDialer, accept, test_config};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse};

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

async fn next_event(signals: &mut mpsc::UnboundedReceiver<Signal>, transport: &mut Transport) -> TransportEvent {
    loop {
        let signal = timeout(Duration::from_secs(1), signals.recv())
            .await
            .expect("signal timed out")
            .expect("signal channel closed");
        if let Some(event) = transport.accept(signal) {
            return event;
        }
    }
}

fn new_transport() -> (
    Transport,
    mpsc::UnboundedReceiver<Signal>,
    Arc<MemoryDialer>,
    mpsc::UnboundedReceiver<crate::test_support::ServerConn>,
) {
    new_transport_with_timeout(DIAL_TIMEOUT)
}

fn new_transport_with_timeout(dial_timeout: Duration) -> (
    Transport,
    mpsc::UnboundedReceiver<Signal>,
    Arc<MemoryDialer>,
    mpsc::UnboundedReceiver<crate::test_support::ServerConn>,
) {
    let (dialer, accepted) = MemoryDialer::new();
    let dialer = Arc::new(dialer);
    let (signals_tx, signals) = mpsc::unbounded_channel();
    let transport = Transport::new(Arc::clone(&dialer) as Arc<dyn Dialer>, signals_tx, dial_timeout);
    (transport, signals, dialer, accepted)
}

#[test]
fn direct_endpoint_targets_server_port() {
    let endpoint = Endpoint::for_credentials(&test_config().credentials);
    assert_eq!(endpoint.url, "ws://203.0.113.7:28082");
    assert_eq!(endpoint.origin, None);
    assert!(endpoint.headers.is_empty());
}

#[test]
fn relay_endpoint_rewrites_target_and_headers() {
    let mut credentials = test_config().credentials;
    credentials.use_facepunch_proxy = true;

    let endpoint = Endpoint::for_credentials(&credentials);
    assert_eq!(endpoint.url, "wss://companion-rust.facepunch.com/game/203.0.113.7/28082");
    assert_eq!(endpoint.origin.as_deref(), Some("https://companion-rust.facepunch.com"));

    let header = |name: &HeaderName| {
        endpoint
            .headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(header(&CACHE_CONTROL), Some("no-cache"));
    assert_eq!(header(&PRAGMA), Some("no-cache"));
    assert!(header(&USER_AGENT).is_some_and(|ua| ua.starts_with("Mozilla/5.0")));
}

#[tokio::test]
async fn open_reports_connecting_then_connected() {
    let (mut transport, mut signals, dialer, _accepted) = new_transport();
    transport.open(Endpoint::for_credentials(&test_config().credentials));

    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Connecting);
    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Connected);
    assert_eq!(dialer.dials(), 1);
    assert!(transport.is_open());
}

#[tokio::test]
async fn send_fails_before_connected() {
    let (mut transport, _signals, dialer, _accepted) = new_transport();
    let _release = dialer.hold_next();
    transport.open(Endpoint::for_credentials(&test_config().credentials));

    assert_eq!(transport.send(vec![1, 2, 3]), Err(TransportError::NotConnected));
}

#[tokio::test]
async fn send_without_link_fails() {
    let (transport, _signals, _dialer, _accepted) = new_transport();
    assert_eq!(transport.send(vec![1]), Err(TransportError::NotConnected));
}

#[tokio::test]
async fn frames_flow_both_ways() {
    let (mut transport, mut signals, _dialer, mut accepted) = new_transport();
    transport.open(Endpoint::for_credentials(&test_config().credentials));
    let _ = next_event(&mut signals, &mut transport).await;
    let _ = next_event(&mut signals, &mut transport).await;
    let mut server = accept(&mut accepted).await;

    transport.send(vec![0xca, 0xfe]).expect("send");
    let received = timeout(Duration::from_secs(1), server.from_client.recv())
        .await
        .expect("server recv timed out")
        .expect("link closed");
    assert_eq!(received, vec![0xca, 0xfe]);

    server.send_raw(vec![0xbe, 0xef]);
    assert_eq!(
        next_event(&mut signals, &mut transport).await,
        TransportEvent::Frame(vec![0xbe, 0xef])
    );
}

#[tokio::test]
async fn dial_failure_reports_error_then_disconnected() {
    let (mut transport, mut signals, dialer, _accepted) = new_transport();
    dialer.fail_next(TransportError::WebSocket("connection refused".to_owned()));
    transport.open(Endpoint::for_credentials(&test_config().credentials));

    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Connecting);
    assert_eq!(
        next_event(&mut signals, &mut transport).await,
        TransportEvent::Error(TransportError::WebSocket("connection refused".to_owned()))
    );
    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Disconnected);
    assert!(!transport.is_open());
}

#[tokio::test(start_paused = true)]
async fn hung_dial_times_out() {
    let (mut transport, mut signals, dialer, _accepted) = new_transport_with_timeout(Duration::from_millis(500));
    let _release = dialer.hold_next();
    transport.open(Endpoint::for_credentials(&test_config().credentials));

    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Connecting);
    assert_eq!(
        next_event(&mut signals, &mut transport).await,
        TransportEvent::Error(TransportError::DialTimeout(Duration::from_millis(500)))
    );
    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Disconnected);
    assert!(!transport.is_open());
}

#[tokio::test]
async fn remote_close_reports_disconnected() {
    let (mut transport, mut signals, _dialer, mut accepted) = new_transport();
    transport.open(Endpoint::for_credentials(&test_config().credentials));
    let _ = next_event(&mut signals, &mut transport).await;
    let _ = next_event(&mut signals, &mut transport).await;

    let server = accept(&mut accepted).await;
    drop(server);

    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Disconnected);
    assert_eq!(transport.send(vec![1]), Err(TransportError::NotConnected));
}

#[tokio::test]
async fn reopen_ignores_signals_from_previous_link() {
    let (mut transport, mut signals, dialer, mut accepted) = new_transport();
    let first = transport.open(Endpoint::for_credentials(&test_config().credentials));
    let _ = next_event(&mut signals, &mut transport).await;
    let _ = next_event(&mut signals, &mut transport).await;
    let _first_server = accept(&mut accepted).await;

    let second = transport.open(Endpoint::for_credentials(&test_config().credentials));
    assert!(second > first);

    let stale = Signal { generation: first, event: TransportEvent::Disconnected };
    assert_eq!(transport.accept(stale), None);
    assert!(transport.is_open());

    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Connecting);
    assert_eq!(next_event(&mut signals, &mut transport).await, TransportEvent::Connected);
    assert_eq!(dialer.dials(), 2);
}

#[tokio::test]
async fn close_drops_active_link() {
    let (mut transport, mut signals, _dialer, _accepted) = new_transport();
    let generation = transport.open(Endpoint::for_credentials(&test_config().credentials));
    let _ = next_event(&mut signals, &mut transport).await;

    transport.close();
    assert!(!transport.is_open());
    let late = Signal { generation, event: TransportEvent::Connected };
    assert_eq!(transport.accept(late), None);
}

fn header(request: &HandshakeRequest, name: &HeaderName) -> Option<String> {
    request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
}

#[tokio::test]
async fn ws_dialer_speaks_binary_frames_with_relay_headers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (headers_tx, headers_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.expect("accept");
        let callback = move |request: &HandshakeRequest, response: HandshakeResponse| {
            let seen = [ORIGIN, USER_AGENT, PRAGMA, CACHE_CONTROL].map(|name| header(request, &name));
            let _ = headers_tx.send(seen);
            Ok::<_, ErrorResponse>(response)
        };
        let mut socket = tokio_tungstenite::accept_hdr_async(tcp, callback).await.expect("handshake");

        socket.send(Message::Text("ignored".into())).await.expect("send text");
        socket.send(Message::Binary(vec![1, 2, 3].into())).await.expect("send binary");
        socket.next().await.expect("client frame").expect("read")
    });

    let mut credentials = test_config().credentials;
    credentials.use_facepunch_proxy = true;
    let endpoint = Endpoint { url: format!("ws://{addr}"), ..Endpoint::for_credentials(&credentials) };
    let Link { mut sink, mut stream } = WsDialer.dial(&endpoint).await.expect("dial");

    let first = timeout(Duration::from_secs(5), stream.next()).await.expect("frame timed out");
    assert_eq!(first, Some(Ok(vec![1, 2, 3])));

    let [origin, user_agent, pragma, cache_control] = headers_rx.await.expect("headers");
    assert_eq!(origin.as_deref(), Some("https://companion-rust.facepunch.com"));
    assert!(user_agent.is_some_and(|ua| ua.ends_with("rustmarkets/1.0")));
    assert_eq!(pragma.as_deref(), Some("no-cache"));
    assert_eq!(cache_control.as_deref(), Some("no-cache"));

    sink.send(vec![9, 9]).await.expect("client send");
    let received = timeout(Duration::from_secs(5), server).await.expect("server timed out").expect("server task");
    assert_eq!(received, Message::Binary(vec![9, 9].into()));
}
