//! Integration Tests for the HTTP surface
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

mod common;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use sdkwork_voice::audio::AudioOutput;
    use sdkwork_voice::model::Device;
    use sdkwork_voice::server::{create_router, ServerConfig, ServerState};
    use sdkwork_voice::training::{
        DetachedProcess, ProcessLauncher, ProcessOutcome, ProcessSpec, TrainingConfig,
    };

    use crate::common::{write_bundle, CountingLoader};

    struct StubLauncher {
        preprocess_ok: bool,
    }

    #[async_trait]
    impl ProcessLauncher for StubLauncher {
        async fn run(&self, _spec: &ProcessSpec) -> io::Result<ProcessOutcome> {
            Ok(ProcessOutcome {
                success: self.preprocess_ok,
                code: Some(if self.preprocess_ok { 0 } else { 2 }),
            })
        }

        fn spawn_detached(&self, _spec: &ProcessSpec) -> io::Result<DetachedProcess> {
            Ok(DetachedProcess {
                pid: None,
                completion: Box::pin(async { Ok::<bool, io::Error>(true) }),
            })
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        state: Arc<ServerState>,
        loader: Arc<CountingLoader>,
    }

    impl Harness {
        fn router(&self) -> Router {
            create_router(Arc::clone(&self.state))
        }

        fn assets(&self) -> std::path::PathBuf {
            self.dir.path().join("model_assets")
        }
    }

    fn config_in(root: &Path) -> ServerConfig {
        fs::write(root.join("default_config.yml"), "model_name: base\n").unwrap();
        ServerConfig {
            assets_root: root.join("model_assets"),
            device: Device::Cpu,
            limit: 20,
            training: TrainingConfig {
                data_root: root.join("Data"),
                assets_root: root.join("model_assets"),
                default_config_path: root.join("default_config.yml"),
                active_config_path: root.join("config.yml"),
                ..TrainingConfig::default()
            },
            ..ServerConfig::default()
        }
    }

    fn harness_with(loader: Arc<CountingLoader>, preprocess_ok: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(&dir.path().join("model_assets"), "alice");

        let state = Arc::new(ServerState::new(
            config_in(dir.path()),
            loader.clone(),
            Arc::new(StubLauncher { preprocess_ok }),
        ));
        state.bootstrap().unwrap();
        Harness { dir, state, loader }
    }

    fn harness() -> Harness {
        harness_with(CountingLoader::new(), true)
    }

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(router: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(router, method, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn assert_invalid(body: &Value, loc: &[&str]) {
        let detail = &body["detail"][0];
        assert_eq!(detail["type"], "invalid_params");
        let got: Vec<&str> = detail["loc"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(got, loc);
    }

    fn multipart(fields: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
        let boundary = "----voice-test-boundary";
        let mut body = Vec::new();
        for (name, file_name, content) in fields {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: audio/wav\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        (format!("multipart/form-data; boundary={}", boundary), body)
    }

    async fn post_train(router: Router, fields: &[(&str, Option<&str>, &[u8])]) -> (StatusCode, Value) {
        let (content_type, body) = multipart(fields);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/train")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    // ==================== /voice ====================

    #[tokio::test]
    async fn test_voice_returns_wav() {
        let h = harness();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/voice?text=hello&speaker_name=sou&style=Happy")
            .body(Body::empty())
            .unwrap();
        let response = h.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let audio = AudioOutput::decode_wav(&body).unwrap();
        assert_eq!(audio.sample_rate, crate::common::SAMPLE_RATE);

        let requests = h.loader.requests();
        assert_eq!(requests[0].speaker_id, 1);
        assert_eq!(requests[0].style, "Happy");
        assert_eq!(requests[0].params.text, "hello");
    }

    #[tokio::test]
    async fn test_voice_get_is_accepted() {
        let h = harness();
        let (status, _) = send(h.router(), Method::GET, "/voice?text=hello").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_voice_resolution_errors_are_422() {
        let h = harness();
        let cases = [
            ("/voice?text=hi&model_id=1", "model_id"),
            ("/voice?text=hi&model_name=zed", "model_name"),
            ("/voice?text=hi&speaker_id=9", "speaker_id"),
            ("/voice?text=hi&speaker_name=kei", "speaker_name"),
            ("/voice?text=hi&style=unknown_style", "style"),
            ("/voice?text=hi&speaker_name=", "speaker_name"),
            ("/voice?text=hi&style=", "style"),
        ];
        for (uri, param) in cases {
            let (status, body) = send_json(h.router(), Method::POST, uri).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
            assert_invalid(&body, &["query", param]);
        }
        assert_eq!(h.loader.load_count(), 0);
    }

    #[tokio::test]
    async fn test_voice_text_validation() {
        let h = harness();

        let (status, body) = send_json(h.router(), Method::POST, "/voice").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_invalid(&body, &["query", "text"]);

        let long = "a".repeat(21);
        let (status, body) =
            send_json(h.router(), Method::POST, &format!("/voice?text={}", long)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_invalid(&body, &["query", "text"]);
    }

    #[tokio::test]
    async fn test_voice_malformed_number_is_422() {
        let h = harness();
        let (status, body) = send_json(h.router(), Method::POST, "/voice?text=hi&model_id=abc").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"][0], "query");
    }

    #[tokio::test]
    async fn test_voice_encoding() {
        let h = harness();
        let (status, _) =
            send(h.router(), Method::POST, "/voice?text=a%2520b&encoding=utf-8").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.loader.requests()[0].params.text, "a b");

        let (status, body) =
            send_json(h.router(), Method::POST, "/voice?text=abc&encoding=shift_jis").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_invalid(&body, &["query", "encoding"]);
    }

    #[tokio::test]
    async fn test_voice_inference_failure_is_500() {
        let h = harness_with(CountingLoader::failing_inference(), true);
        let (status, body) = send_json(h.router(), Method::POST, "/voice?text=hi").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("detail").is_none());
    }

    // ==================== /models ====================

    #[tokio::test]
    async fn test_models_info() {
        let h = harness();
        let (status, body) = send_json(h.router(), Method::GET, "/models/info").await;
        assert_eq!(status, StatusCode::OK);

        let entry = &body["0"];
        assert_eq!(entry["device"], "cpu");
        assert_eq!(entry["sampling_rate"], crate::common::SAMPLE_RATE);
        assert_eq!(entry["generation"], h.state.cache().snapshot().number());
        assert_eq!(entry["spk2id"]["sou"], 1);
        assert_eq!(entry["id2spk"]["0"], "nao");
        assert_eq!(entry["style2id"]["Neutral"], 0);
        assert!(entry["model_path"].as_str().unwrap().ends_with(".safetensors"));
        assert!(entry["config_path"].as_str().unwrap().ends_with("config.json"));
    }

    #[tokio::test]
    async fn test_models_refresh_picks_up_new_bundle() {
        let h = harness();
        write_bundle(&h.assets(), "bob");

        let (status, body) = send_json(h.router(), Method::POST, "/models/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_object().unwrap().len(), 2);

        let (status, _) = send(h.router(), Method::POST, "/voice?text=hi&model_name=bob").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_500_and_keeps_models() {
        let h = harness();
        let broken = h.assets().join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("b.safetensors"), b"w").unwrap();
        fs::write(broken.join("config.json"), "{oops").unwrap();
        fs::write(broken.join("style_vectors.npy"), b"npy").unwrap();

        let (status, _) = send(h.router(), Method::POST, "/models/refresh").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, body) = send_json(h.router(), Method::GET, "/models/info").await;
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    // ==================== /train ====================

    #[tokio::test]
    async fn test_train_submission_and_status() {
        let h = harness();
        let (status, body) = post_train(
            h.router(),
            &[
                ("name", None, b"test1"),
                ("transcript", None, b"hello world"),
                ("file", Some("voice.wav"), b"RIFFdata"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().unwrap().to_string();

        let transcript =
            fs::read_to_string(h.dir.path().join("Data").join(&id).join("esd.list")).unwrap();
        assert_eq!(transcript, "voice.wav|test1|JP|hello world");

        let (status, job) = send_json(h.router(), Method::GET, &format!("/train/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["id"], id.as_str());

        let (status, _) = send_json(h.router(), Method::GET, "/train/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_train_failure_reports_stage() {
        let h = harness_with(CountingLoader::new(), false);
        let (status, body) = post_train(
            h.router(),
            &[
                ("name", None, b"test1"),
                ("transcript", None, b"hello world"),
                ("file", Some("voice.wav"), b"RIFFdata"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "err!");
        assert_eq!(body["stage"], "preprocessing");
    }

    #[tokio::test]
    async fn test_train_missing_field() {
        let h = harness();
        let (status, body) = post_train(h.router(), &[("name", None, b"test1")]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_invalid(&body, &["body", "transcript"]);
    }

    // ==================== tools / status / health ====================

    #[tokio::test]
    async fn test_get_audio() {
        let h = harness();
        let wav_path = h.dir.path().join("clip.wav");
        fs::write(&wav_path, AudioOutput::encode_wav(&[0.0, 0.5, -0.5], 22050).unwrap()).unwrap();
        let txt_path = h.dir.path().join("clip.txt");
        fs::write(&txt_path, "text").unwrap();

        let (status, body) = send(
            h.router(),
            Method::GET,
            &format!("/tools/get_audio?path={}", wav_path.display()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..4], b"RIFF");

        let (status, body) = send_json(
            h.router(),
            Method::GET,
            &format!("/tools/get_audio?path={}", txt_path.display()),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_invalid(&body, &["query", "path"]);

        let (status, _) =
            send_json(h.router(), Method::GET, "/tools/get_audio?path=/no/such/file.wav").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_status_lists_cpu() {
        let h = harness();
        let (status, body) = send_json(h.router(), Method::GET, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["devices"][0], "cpu");
        assert!(body["memory_total"].as_u64().unwrap() > 0);
        assert!(body["gpu"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_generation() {
        let h = harness();
        send(h.router(), Method::GET, "/models/info").await;
        send(h.router(), Method::POST, "/voice").await;

        let (status, body) = send_json(h.router(), Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_count"], 1);
        assert_eq!(body["loaded_models"], 0);
        assert_eq!(body["requests"]["total"], 2);
        assert_eq!(body["requests"]["client_errors"], 1);
        assert_eq!(body["requests"]["server_errors"], 0);
    }
}
