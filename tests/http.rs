use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Today {
    cups: f64,
    coding_minutes: u64,
    mood: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    id: Option<String>,
    date: String,
    cups: f64,
    coding_minutes: u64,
    mood: String,
    notes: String,
}

#[derive(Debug, Deserialize)]
struct WrapUp {
    entry: Entry,
    today: Today,
    backup: String,
}

struct TestServer {
    base_url: String,
    child: Child,
    _data_dir: TempDir,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::{Once, OnceLock};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);
    static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

    /// The shared server lives in a static and is never dropped, so the
    /// child and its data directory are cleaned up at process exit.
    pub fn register(pid: u32, data_dir: PathBuf) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            let _ = DATA_DIR.set(data_dir);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
                libc::waitpid(pid, std::ptr::null_mut(), 0);
            }
        }
        if let Some(dir) = DATA_DIR.get() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/today")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_dir = tempfile::Builder::new()
        .prefix("coffee_to_code_http_")
        .tempdir()
        .expect("create data dir");
    let child = Command::new(env!("CARGO_BIN_EXE_coffee_to_code"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", data_dir.path())
        .env_remove("FIREBASE_PROJECT_ID")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id(), data_dir.path().to_path_buf());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        child,
        _data_dir: data_dir,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn post_json<T: for<'de> Deserialize<'de>>(
    client: &Client,
    url: String,
    body: serde_json::Value,
) -> T {
    let response = client.post(url).json(&body).send().await.unwrap();
    assert!(response.status().is_success(), "status {}", response.status());
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_coffee_and_coding_update_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before: Today = client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let after_coffee: Today = post_json(
        &client,
        format!("{}/api/today/coffee", server.base_url),
        serde_json::json!({ "size": "Small" }),
    )
    .await;
    assert_eq!(after_coffee.cups, ((before.cups + 1.0) * 10.0).round() / 10.0);

    let after_coding: Today = post_json(
        &client,
        format!("{}/api/today/coding", server.base_url),
        serde_json::json!({ "minutes": "25", "type": "Bugfix" }),
    )
    .await;
    assert_eq!(after_coding.coding_minutes, before.coding_minutes + 25);
}

#[tokio::test]
async fn http_rejects_bad_minutes_and_blank_mood() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/today/coding", server.base_url))
        .json(&serde_json::json!({ "minutes": -10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/today/mood", server.base_url))
        .json(&serde_json::json!({ "mood": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn http_wrap_up_archives_the_day() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let reset: Today = post_json(&client, format!("{base}/api/today/reset"), serde_json::json!({})).await;
    assert_eq!(reset.cups, 0.0);

    post_json::<Today>(&client, format!("{base}/api/today/coffee"), serde_json::json!({ "size": "Medium" })).await;
    post_json::<Today>(&client, format!("{base}/api/today/coding"), serde_json::json!({ "minutes": 45 })).await;

    let wrap: WrapUp = post_json(&client, format!("{base}/api/today/wrap-up"), serde_json::json!({})).await;
    assert_eq!(wrap.entry.cups, 1.5);
    assert_eq!(wrap.entry.coding_minutes, 45);
    assert_eq!(wrap.entry.mood, "😐");
    assert_eq!(wrap.entry.notes, "");
    assert_eq!(wrap.entry.id, None);
    assert!(!wrap.entry.date.is_empty());
    assert_eq!(wrap.backup, "skipped");
    assert_eq!(
        wrap.today,
        Today {
            cups: 0.0,
            coding_minutes: 0,
            mood: "😐".to_string()
        }
    );

    let history: Vec<Entry> = client
        .get(format!("{base}/api/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0].date, wrap.entry.date);
    assert_eq!(history[0].cups, 1.5);

    let response = client.delete(format!("{base}/api/history")).send().await.unwrap();
    assert!(response.status().is_success());
    let history: Vec<Entry> = client
        .get(format!("{base}/api/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn http_backup_reports_disabled_without_project() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let body: serde_json::Value = Client::new()
        .get(format!("{}/api/backup", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["remote"], "disabled");

    let insights: serde_json::Value = Client::new()
        .get(format!("{}/api/insights", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(insights["last_7_days"].as_array().map(Vec::len), Some(7));
}
