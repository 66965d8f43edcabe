use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    routing::get,
};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const REJECTED_FREQUENCY: &str = "0 = Reject me";

/// Stand-in for the spreadsheet macro: GET returns `{ data: rows }`, POST
/// appends a row built from either a form or a JSON body.
#[derive(Clone)]
struct FakeSheet {
    url: String,
    rows: Arc<StdMutex<Vec<Value>>>,
}

impl FakeSheet {
    fn rows(&self) -> Vec<Value> {
        self.rows.lock().unwrap().clone()
    }
}

async fn sheet_read(State(rows): State<Arc<StdMutex<Vec<Value>>>>) -> Json<Value> {
    let rows = rows.lock().unwrap().clone();
    Json(json!({ "data": rows }))
}

async fn sheet_write(State(rows): State<Arc<StdMutex<Vec<Value>>>>, request: Request) -> Json<Value> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let mut row = if is_json {
        let Json(row) = Json::<Value>::from_request(request, &()).await.unwrap();
        row
    } else {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .unwrap();
        row_from_pairs(pairs)
    };
    row["_encoding"] = json!(if is_json { "json" } else { "form" });

    if row["frequency"] == REJECTED_FREQUENCY {
        return Json(json!({ "status": "error", "message": "Sheet is locked" }));
    }
    rows.lock().unwrap().push(row);
    Json(json!({ "result": "success" }))
}

fn row_from_pairs(pairs: Vec<(String, String)>) -> Value {
    let mut row = Map::new();
    let mut genres = Vec::new();
    for (key, value) in pairs {
        if key == "genre" {
            genres.push(Value::String(value));
        } else {
            row.insert(key, Value::String(value));
        }
    }
    row.insert("genres".to_string(), Value::Array(genres));
    Value::Object(row)
}

/// Runs on its own thread so it outlives the runtime of any single test.
fn spawn_sheet(seed: Vec<Value>) -> FakeSheet {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind sheet port");
    listener.set_nonblocking(true).expect("nonblocking sheet listener");
    let url = format!("http://{}/exec", listener.local_addr().unwrap());
    let rows = Arc::new(StdMutex::new(seed));

    let app = Router::new()
        .route("/exec", get(sheet_read).post(sheet_write))
        .with_state(Arc::clone(&rows));
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("sheet runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("sheet listener");
            axum::serve(listener, app).await.expect("sheet server");
        });
    });

    FakeSheet { url, rows }
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

struct Fixture {
    server: TestServer,
    sheet: FakeSheet,
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static FIXTURE: Lazy<Mutex<Option<Arc<Fixture>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
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
            }
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
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/stats")).send().await {
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

async fn spawn_server(endpoint: &str, encoding: &str) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_music_survey"))
        .env("PORT", port.to_string())
        .env("SURVEY_ENDPOINT", endpoint)
        .env("SURVEY_WRITE_ENCODING", encoding)
        .env("SURVEY_TIMEOUT_SECS", "2")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_fixture() -> Arc<Fixture> {
    let mut guard = FIXTURE.lock().await;
    if let Some(fixture) = guard.as_ref() {
        return Arc::clone(fixture);
    }
    let sheet = spawn_sheet(vec![
        json!({ "frequency": "2", "genres": ["Hiphop"] }),
        json!({ "frequency": "2", "genres": ["Hiphop", "Indie"], "listen_reason": "gym" }),
    ]);
    let server = spawn_server(&sheet.url, "form").await;
    #[cfg(unix)]
    cleanup::register(server.child.id());

    let fixture = Arc::new(Fixture { server, sheet });
    *guard = Some(Arc::clone(&fixture));
    fixture
}

async fn stats(client: &Client, base_url: &str) -> Value {
    client
        .get(format!("{base_url}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn count_of(chart: &Value, label: &str) -> u64 {
    let labels = chart["labels"].as_array().unwrap();
    labels
        .iter()
        .position(|l| l == label)
        .and_then(|idx| chart["values"][idx].as_u64())
        .unwrap_or(0)
}

#[tokio::test]
async fn http_startup_load_tallies_existing_rows() {
    let _guard = TEST_LOCK.lock().await;
    let fixture = shared_fixture().await;
    let client = Client::new();

    let view = stats(&client, &fixture.server.base_url).await;
    assert_eq!(count_of(&view["frequency_chart"], "2"), 2);
    assert_eq!(count_of(&view["genre_chart"], "Hiphop"), 2);
    assert_eq!(count_of(&view["genre_chart"], "Indie"), 1);
}

#[tokio::test]
async fn http_index_renders_the_page() {
    let _guard = TEST_LOCK.lock().await;
    let fixture = shared_fixture().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/", fixture.server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains(r#"id="music-form""#));
    assert!(html.contains("gym"));
}

#[tokio::test]
async fn http_submit_reaches_sheet_and_updates_view() {
    let _guard = TEST_LOCK.lock().await;
    let fixture = shared_fixture().await;
    let client = Client::new();

    let before = stats(&client, &fixture.server.base_url).await;
    let rows_before = fixture.sheet.rows().len();

    let response = client
        .post(format!("{}/api/submit", fixture.server.base_url))
        .json(&json!({
            "frequency": "3 = A few times a week",
            "genres": ["Ballad", "K-pop"],
            "listen_reason": "relaxation",
            "rec_song": "Spring Day"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result: Value = response.json().await.unwrap();

    let rows = fixture.sheet.rows();
    assert_eq!(rows.len(), rows_before + 1);
    let row = rows.last().unwrap();
    assert_eq!(row["_encoding"], "form");
    assert_eq!(row["genres"], json!(["Ballad", "K-pop"]));
    assert_eq!(row["frequency"], "3 = A few times a week");
    assert_eq!(row["rec_song"], "Spring Day");

    let view = &result["view"];
    assert_eq!(
        count_of(&view["genre_chart"], "Ballad"),
        count_of(&before["genre_chart"], "Ballad") + 1
    );
    assert_eq!(
        count_of(&view["frequency_chart"], "A few times a week"),
        count_of(&before["frequency_chart"], "A few times a week") + 1
    );
    assert!(view["recommendations"][0].as_str().unwrap().contains("Spring Day"));
}

#[tokio::test]
async fn http_rejected_submission_surfaces_store_message() {
    let _guard = TEST_LOCK.lock().await;
    let fixture = shared_fixture().await;
    let client = Client::new();
    let rows_before = fixture.sheet.rows().len();

    let response = client
        .post(format!("{}/api/submit", fixture.server.base_url))
        .json(&json!({ "frequency": REJECTED_FREQUENCY, "genres": ["Rock"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.text().await.unwrap().contains("Sheet is locked"));
    assert_eq!(fixture.sheet.rows().len(), rows_before);
}

#[tokio::test]
async fn http_invalid_submission_is_not_forwarded() {
    let _guard = TEST_LOCK.lock().await;
    let fixture = shared_fixture().await;
    let client = Client::new();
    let rows_before = fixture.sheet.rows().len();

    let response = client
        .post(format!("{}/api/submit", fixture.server.base_url))
        .json(&json!({ "frequency": "", "genres": ["Rock"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fixture.sheet.rows().len(), rows_before);
}

#[tokio::test]
async fn http_json_encoding_posts_a_json_body() {
    let sheet = spawn_sheet(Vec::new());
    let server = spawn_server(&sheet.url, "json").await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/submit", server.base_url))
        .json(&json!({ "frequency": "1 = Rarely", "genres": ["Jazz"], "genre_other": "Bossa nova" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows = sheet.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["_encoding"], "json");
    assert_eq!(rows[0]["genres"], json!(["Jazz"]));
    assert_eq!(rows[0]["genre_other"], "Bossa nova");
}

#[tokio::test]
async fn http_unreachable_store_keeps_page_usable() {
    let endpoint = format!("http://127.0.0.1:{}/exec", pick_free_port());
    let server = spawn_server(&endpoint, "form").await;
    let client = Client::new();

    let response = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains("Could not load the survey results."));
    assert!(html.contains("frequency-chart"));

    let response = client
        .post(format!("{}/api/submit", server.base_url))
        .json(&json!({ "frequency": "4 = Every day", "genres": ["Rock"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
