//! Tests against a real listener.

use std::time::Duration;

use request_governor::config::AuditFormat;
use request_governor::{GovernorConfig, HttpServer, Shutdown};
use tokio::net::TcpListener;

mod common;

async fn start(config: GovernorConfig) -> (String, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, common::echo_app()).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (format!("http://{}", addr), shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_peer_address_is_rate_limited() {
    let mut config = common::quiet_config();
    config.temporal.enabled = false;
    config.rate_limit.max_requests = 2;
    let (base, shutdown) = start(config).await;
    let client = client();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let res = client
            .post(format!("{}/api/messages/send/", base))
            .send()
            .await
            .expect("server unreachable");
        statuses.push(res.status().as_u16());
        if res.status() == 429 {
            assert_eq!(res.headers()["retry-after"], "60");
        }
    }
    assert_eq!(statuses, vec![200, 200, 429]);

    // A different forwarded address is a different client.
    let res = client
        .post(format!("{}/api/messages/send/", base))
        .header("X-Forwarded-For", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "handled POST /api/messages/send/");

    shutdown.trigger();
}

#[tokio::test]
async fn test_audit_log_records_rejected_requests_too() {
    let path = std::env::temp_dir().join(format!("governor-audit-{}.log", uuid::Uuid::new_v4()));
    let mut config = GovernorConfig::default();
    config.temporal.enabled = false;
    config.rate_limit.max_requests = 1;
    config.audit.sink_path = path.to_string_lossy().into_owned();
    config.audit.format = AuditFormat::Json;
    let (base, shutdown) = start(config).await;
    let client = client();

    for _ in 0..2 {
        client
            .post(format!("{}/api/messages/", base))
            .send()
            .await
            .unwrap();
    }
    shutdown.trigger();

    // Lines reach the file from the background writer.
    let mut contents = String::new();
    for _ in 0..100 {
        contents = std::fs::read_to_string(&path).unwrap_or_default();
        if contents.lines().count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line["user"], "Anonymous");
        assert_eq!(line["path"], "/api/messages/");
        assert_eq!(line["method"], "POST");
        assert_eq!(line["client"], "127.0.0.1");
    }
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_unwritable_audit_sink_does_not_fail_requests() {
    let mut config = common::quiet_config();
    config.temporal.enabled = false;
    config.audit.enabled = true;
    config.audit.sink_path = std::env::temp_dir()
        .join(format!("no-such-dir-{}", uuid::Uuid::new_v4()))
        .join("requests.log")
        .to_string_lossy()
        .into_owned();
    let (base, shutdown) = start(config).await;

    let res = client().get(format!("{}/api/conversations/", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
}
