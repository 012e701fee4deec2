use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Totals {
    total_spend: f64,
    total_leads: u64,
    average_cost_per_lead: f64,
}

#[derive(Debug, Deserialize)]
struct DailyTotal {
    day: String,
    spend: f64,
}

#[derive(Debug, Deserialize)]
struct ClientSummary {
    client: String,
    spend: f64,
    leads: u64,
    cost_per_lead: f64,
    target: f64,
    exceeds_target: bool,
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    today: String,
    totals: Totals,
    series: Vec<DailyTotal>,
    ranking: Vec<ClientSummary>,
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FilterOptionsResponse {
    clients: Vec<String>,
    managers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LoadReport {
    total_rows: usize,
    loaded_rows: usize,
    skipped_rows: usize,
    undated_rows: usize,
}

struct TestServer {
    base_url: String,
    data_path: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.data_path);
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for &pid in pids.iter() {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

const SEED_ROWS: &str = r#"[
  {"campanha": "Leads Jan", "gasto": 100, "leads": 5, "period_start": "2024-01-01", "cliente": "Loja A", "gestor": "Bia", "cpl_meta": 10},
  {"campanha": "Remarketing", "gasto": "50", "leads": "0", "period_start": "2024-01-01", "cliente": " Loja A ", "gestor": "Bia"},
  {"campanha": "Topo", "gasto": 20, "leads": 2, "period_start": "2024-01-02", "cliente": "Loja B", "gestor": "Caio", "cpl_meta": 30},
  {"campanha": "Sem data", "gasto": "abc", "leads": 1, "period_start": "", "cliente": "Loja C", "gestor": "Caio"}
]"#;

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("ads_dashboard_http_{}_{}.json", std::process::id(), nanos));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
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

async fn spawn_server(rows: &str) -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    std::fs::write(&data_path, rows).expect("write seed data");

    let child = Command::new(env!("CARGO_BIN_EXE_ads_dashboard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", &data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_path,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(SEED_ROWS).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn dashboard(client: &Client, base_url: &str, query: &str) -> DashboardResponse {
    client
        .get(format!("{base_url}/api/dashboard?{query}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_dashboard_without_filters() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let body = dashboard(&client, &server.base_url, "today=2024-01-02").await;

    assert_eq!(body.today, "2024-01-02");
    assert_eq!(body.records.len(), 3);
    assert_eq!(body.totals.total_spend, 170.0);
    assert_eq!(body.totals.total_leads, 7);
    assert!((body.totals.average_cost_per_lead - 170.0 / 7.0).abs() < 1e-9);

    let days: Vec<(&str, f64)> = body.series.iter().map(|p| (p.day.as_str(), p.spend)).collect();
    assert_eq!(days, [("2024-01-01", 150.0), ("2024-01-02", 20.0)]);

    let ranking: Vec<&str> = body.ranking.iter().map(|c| c.client.as_str()).collect();
    assert_eq!(ranking, ["Loja A", "Loja B"]);
    let loja_a = &body.ranking[0];
    assert_eq!(loja_a.spend, 150.0);
    assert_eq!(loja_a.leads, 5);
    assert_eq!(loja_a.cost_per_lead, 30.0);
    assert_eq!(loja_a.target, 10.0);
    assert!(loja_a.exceeds_target);
    assert!(!body.ranking[1].exceeds_target);
}

#[tokio::test]
async fn http_dashboard_with_window_and_manager() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let body = dashboard(
        &client,
        &server.base_url,
        "today=2024-01-02&last_n_days=0&manager=Caio",
    )
    .await;

    assert_eq!(body.records.len(), 1);
    assert_eq!(body.totals.total_spend, 20.0);
    let ranking: Vec<(&str, f64)> = body
        .ranking
        .iter()
        .map(|c| (c.client.as_str(), c.spend))
        .collect();
    assert_eq!(ranking, [("Loja B", 20.0)]);
}

#[tokio::test]
async fn http_dashboard_rejects_bad_dates() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/dashboard?start=yesterday", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_filters_follow_manager() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let all: FilterOptionsResponse = client
        .get(format!("{}/api/filters", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.clients, ["Loja A", "Loja B"]);
    assert_eq!(all.managers, ["Bia", "Caio"]);

    let bia: FilterOptionsResponse = client
        .get(format!("{}/api/filters?manager=Bia", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bia.clients, ["Loja A"]);
}

#[tokio::test]
async fn http_reload_replaces_snapshot() {
    let server = spawn_server(SEED_ROWS).await;
    let client = Client::new();

    std::fs::write(
        &server.data_path,
        r#"[{"campaign": "Only one", "spend": 9, "leads": 3, "period_start": "2024-02-01", "client": "Loja Z"}, 7]"#,
    )
    .unwrap();

    let response = client
        .post(format!("{}/api/reload", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let report: LoadReport = response.json().await.unwrap();
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.loaded_rows, 1);
    assert_eq!(report.skipped_rows, 1);
    assert_eq!(report.undated_rows, 0);

    let body = dashboard(&client, &server.base_url, "").await;
    assert_eq!(body.records.len(), 1);
    assert_eq!(body.totals.total_spend, 9.0);
    let ranking: Vec<&str> = body.ranking.iter().map(|c| c.client.as_str()).collect();
    assert_eq!(ranking, ["Loja Z"]);
}
