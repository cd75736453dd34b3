use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Config with every path under `dir` and the status server on `port`.
fn config_in(dir: &Path, port: u16) -> String {
    format!(
        r#"
[storage]
data_dir = "{dir}/cache"
history_file = "{dir}/cache/history.json"
weather_file = "{dir}/cache/weather_cache.json"
registry_file = "{dir}/webhook_playlists.json"
greetings_dir = "{dir}/greetings"
log_dir = "{dir}/logs"

[catalog]
base_url = "http://127.0.0.1:9"

[server]
enabled = true
host = "127.0.0.1"
port = {port}
"#,
        dir = dir.display(),
        port = port
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn command(config_path: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_tunecast"));
    cmd.env("TUNECAST_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true);
    cmd
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_start_serves_health_and_status() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("webhook_playlists.json"),
        r#"{"http://127.0.0.1:9/hook": ["1"]}"#,
    )
    .unwrap();
    let port = get_available_port();
    let config = write_config(&config_in(dir.path(), port));

    let mut server = command(config.path()).spawn().expect("Failed to spawn");
    assert!(wait_for_server(port, 100).await, "Server did not start in time");

    let client = Client::new();
    let status: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/status", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["dispatcher"]["destinations"], 1);
    assert!(status["scheduler"]["state"].is_string());

    server.kill().await.unwrap();
}

#[tokio::test]
async fn test_missing_registry_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&config_in(dir.path(), get_available_port()));

    let output = timeout(
        Duration::from_secs(30),
        command(config.path()).arg("push").arg("morning").output(),
    )
    .await
    .expect("Process did not exit")
    .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("registry"));
    assert!(dir.path().join("webhook_playlists.example.json").exists());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[schedule]
checkpoints = [{ hour = 10, minute = 0, slot = "morning" }]
"#,
    );

    let output = timeout(Duration::from_secs(30), command(config.path()).output())
        .await
        .expect("Process did not exit")
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("validation"));
}
