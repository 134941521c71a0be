//! End-to-end pipeline runs against mock SGLang servers.

use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use vinfer_models::ExclusionReason;
use vinfer_pipeline::{Pipeline, PipelineConfig, PipelineOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(videos: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("videos")).unwrap();
        for name in videos {
            std::fs::write(dir.path().join("videos").join(name), b"fake video").unwrap();
        }
        Self { dir }
    }

    fn results(&self) -> std::path::PathBuf {
        self.dir.path().join("results")
    }

    /// Config YAML with `models` spliced in; directories point into the temp dir.
    fn config(&self, models: &str) -> PipelineConfig {
        let yaml = format!(
            "models:\n{models}\ninference:\n  timeout: 1\ndirectories:\n  videos: {videos}\n  results: {results}\n",
            videos = self.dir.path().join("videos").display(),
            results = self.results().display(),
        );
        PipelineConfig::from_yaml_str(&yaml, "test.yaml").unwrap()
    }
}

fn model_entry(name: &str, server: &MockServer, enabled: bool) -> String {
    let addr = server.address();
    format!(
        "  - name: {name}\n    model_path: org/{name}\n    host: {host}\n    port: {port}\n    enabled: {enabled}\n",
        host = addr.ip(),
        port = addr.port(),
    )
}

async fn sglang_server(content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .mount(&server)
        .await;
    server
}

fn options() -> PipelineOptions {
    PipelineOptions::default().with_health_timeout(Duration::from_millis(500))
}

fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

fn posts(requests: &[wiremock::Request]) -> usize {
    requests
        .iter()
        .filter(|r| r.url.path() == "/v1/chat/completions")
        .count()
}

#[tokio::test]
async fn test_enabled_model_only_one_row_per_video() {
    let ws = Workspace::new(&["a.mp4", "b.mp4"]);
    let enabled = sglang_server("Final Count: 3").await;
    let disabled = sglang_server("never").await;

    let config = ws.config(&format!(
        "{}{}",
        model_entry("enabled", &enabled, true),
        model_entry("disabled", &disabled, false)
    ));
    let summary = Pipeline::new(config, options()).unwrap().run().await.unwrap();

    assert_eq!(summary.video_count, 2);
    assert_eq!(summary.model_count, 1);
    assert_eq!(summary.result_count, 2);
    assert_eq!(summary.disabled_models().collect::<Vec<_>>(), vec!["disabled"]);

    for file in ["a_mp4_results.csv", "b_mp4_results.csv"] {
        let rows = read_rows(&ws.results().join(file));
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "enabled");
        assert_eq!(&rows[0][4], "success");
        assert_eq!(&rows[0][5], "Final Count: 3");
    }

    assert_eq!(posts(&disabled.received_requests().await.unwrap()), 0);
}

#[tokio::test]
async fn test_videos_sharing_a_stem_get_their_own_files() {
    let ws = Workspace::new(&["a.avi", "a.mp4"]);
    let server = sglang_server("ok").await;

    let summary = Pipeline::new(ws.config(&model_entry("m", &server, true)), options())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.result_count, 2);

    for (file, video) in [("a_avi_results.csv", "a.avi"), ("a_mp4_results.csv", "a.mp4")] {
        let rows = read_rows(&ws.results().join(file));
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], video);
    }
}

#[tokio::test]
async fn test_unreachable_model_gets_no_attempts() {
    let ws = Workspace::new(&["a.mp4"]);
    let up = sglang_server("ok").await;
    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&down)
        .await;

    let config = ws.config(&format!(
        "{}{}",
        model_entry("up", &up, true),
        model_entry("down", &down, true)
    ));
    let summary = Pipeline::new(config, options()).unwrap().run().await.unwrap();

    assert_eq!(summary.result_count, 1);
    assert!(summary.tally("down").is_none());
    assert_eq!(summary.unreachable_models().collect::<Vec<_>>(), vec!["down"]);
    assert!(matches!(
        &summary.excluded[0].reason,
        ExclusionReason::Unreachable(detail) if detail.contains("503")
    ));
    assert_eq!(posts(&down.received_requests().await.unwrap()), 0);

    let rows = read_rows(&ws.results().join("a_mp4_results.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][2], "up");
}

#[tokio::test]
async fn test_rerun_appends_rows() {
    let ws = Workspace::new(&["a.mp4"]);
    let server = sglang_server("ok").await;
    let models = model_entry("m", &server, true);

    for _ in 0..2 {
        Pipeline::new(ws.config(&models), options())
            .unwrap()
            .run()
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(ws.results().join("a_mp4_results.csv")).unwrap();
    assert_eq!(content.matches("timestamp,video_name").count(), 1);
    assert_eq!(read_rows(&ws.results().join("a_mp4_results.csv")).len(), 2);
}

#[tokio::test]
async fn test_reenabling_model_keeps_existing_rows() {
    let ws = Workspace::new(&["a.mp4"]);
    let first = sglang_server("first").await;
    let second = sglang_server("second").await;

    let run = |models: String| {
        let config = ws.config(&models);
        async move { Pipeline::new(config, options()).unwrap().run().await.unwrap() }
    };

    run(format!(
        "{}{}",
        model_entry("first", &first, true),
        model_entry("second", &second, false)
    ))
    .await;
    run(format!(
        "{}{}",
        model_entry("first", &first, true),
        model_entry("second", &second, true)
    ))
    .await;

    let rows = read_rows(&ws.results().join("a_mp4_results.csv"));
    let models: Vec<&str> = rows.iter().map(|r| &r[2]).collect();
    assert_eq!(models, vec!["first", "first", "second"]);
}

#[tokio::test]
async fn test_timeout_becomes_error_row() {
    let ws = Workspace::new(&["slow.mp4"]);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let summary = Pipeline::new(ws.config(&model_entry("m", &server, true)), options())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(summary.tally("m").unwrap().failures, 1);

    let rows = read_rows(&ws.results().join("slow_mp4_results.csv"));
    assert_eq!(&rows[0][4], "error");
    assert_eq!(&rows[0][5], "");
    assert!(rows[0][6].contains("timed out"));
}

#[tokio::test]
async fn test_missing_videos_dir_is_fatal() {
    let ws = Workspace::new(&[]);
    let server = sglang_server("ok").await;
    let config = ws.config(&model_entry("m", &server, true));
    std::fs::remove_dir(ws.dir.path().join("videos")).unwrap();

    let err = Pipeline::new(config, options())
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}
