//! Integration Tests for request resolution and synthesis
//!
//! - model_id bounds and model_name precedence
//! - speaker and style resolution
//! - idempotence and stale-but-consistent resolution across refresh
//! - pipeline: lazy load, parameter forwarding, error classes

mod common;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use sdkwork_voice::model::{Device, Generation, ModelCache, ModelRegistry};
    use sdkwork_voice::synthesis::{
        Language, ModelQuery, RequestResolver, SynthesisParams, SynthesisPipeline, DEFAULT_STYLE,
    };
    use sdkwork_voice::{ResolveError, TtsError};

    use crate::common::{write_bundle, CountingLoader};

    fn cache_with(names: &[&str]) -> (tempfile::TempDir, Arc<ModelCache>, Arc<CountingLoader>) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            write_bundle(dir.path(), name);
        }
        let loader = CountingLoader::new();
        let cache = Arc::new(ModelCache::new(loader.clone(), Device::Cpu));
        cache.refresh_from(&ModelRegistry::new(dir.path())).unwrap();
        (dir, cache, loader)
    }

    fn index_of(generation: &Generation, name: &str) -> usize {
        generation.indices_named(name)[0]
    }

    // ==================== Model selection ====================

    #[test]
    fn test_every_valid_model_id_resolves_to_its_bundle() {
        let (_dir, cache, _) = cache_with(&["alice", "bob", "carol"]);
        let generation = cache.snapshot();

        for i in 0..generation.len() {
            let resolved =
                RequestResolver::resolve(&generation, &ModelQuery::new().model_id(i as i64))
                    .unwrap();
            assert_eq!(resolved.bundle.index(), i);
        }
    }

    #[test]
    fn test_model_id_one_past_end_fails() {
        let (_dir, cache, _) = cache_with(&["alice", "bob"]);
        let generation = cache.snapshot();

        let err = RequestResolver::resolve(&generation, &ModelQuery::new().model_id(2)).unwrap_err();
        assert_eq!(err, ResolveError::ModelIdNotFound(2));
        assert_eq!(err.param(), "model_id");
        assert_eq!(err.to_string(), "model_id=2 not found");

        // the bounds check runs even when a valid name is supplied
        let err = RequestResolver::resolve(
            &generation,
            &ModelQuery::new().model_id(2).model_name("alice"),
        )
        .unwrap_err();
        assert_eq!(err, ResolveError::ModelIdNotFound(2));
    }

    #[test]
    fn test_negative_model_id_fails() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let err = RequestResolver::resolve(&cache.snapshot(), &ModelQuery::new().model_id(-1))
            .unwrap_err();
        assert_eq!(err, ResolveError::ModelIdNotFound(-1));
    }

    #[test]
    fn test_empty_generation_never_resolves() {
        let cache = ModelCache::new(CountingLoader::new(), Device::Cpu);
        let err = RequestResolver::resolve(&cache.snapshot(), &ModelQuery::new()).unwrap_err();
        assert_eq!(err, ResolveError::ModelIdNotFound(0));
    }

    #[test]
    fn test_model_name_overrides_model_id() {
        let (_dir, cache, _) = cache_with(&["alice", "bob"]);
        let generation = cache.snapshot();
        let bob = index_of(&generation, "bob");
        let other = 1 - bob;

        let resolved = RequestResolver::resolve(
            &generation,
            &ModelQuery::new().model_name("bob").model_id(other as i64),
        )
        .unwrap();
        assert_eq!(resolved.bundle.index(), bob);
        assert_eq!(resolved.bundle.name(), "bob");
    }

    #[test]
    fn test_unknown_model_name() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let err = RequestResolver::resolve(&cache.snapshot(), &ModelQuery::new().model_name("zed"))
            .unwrap_err();
        assert_eq!(err, ResolveError::ModelNameNotFound("zed".to_string()));
        assert_eq!(err.param(), "model_name");
    }

    #[test]
    fn test_empty_model_name_falls_back_to_id() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let resolved = RequestResolver::resolve(&cache.snapshot(), &ModelQuery::new().model_name(""))
            .unwrap();
        assert_eq!(resolved.bundle.index(), 0);
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), "dup");
        let discovered = ModelRegistry::new(dir.path()).refresh().unwrap();
        let twice = vec![discovered[0].clone(), discovered[0].clone()];

        let cache = ModelCache::new(CountingLoader::new(), Device::Cpu);
        let generation = cache.rebuild(twice);

        let err = RequestResolver::resolve(&generation, &ModelQuery::new().model_name("dup"))
            .unwrap_err();
        assert_eq!(err, ResolveError::ModelNameAmbiguous("dup".to_string()));
        assert_eq!(err.to_string(), "model_name=dup is ambiguous");

        // numeric selection still works
        assert!(RequestResolver::resolve(&generation, &ModelQuery::new().model_id(1)).is_ok());
    }

    // ==================== Speaker and style ====================

    #[test]
    fn test_speaker_name_overrides_speaker_id() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let resolved = RequestResolver::resolve(
            &cache.snapshot(),
            &ModelQuery::new().speaker_name("sou").speaker_id(0),
        )
        .unwrap();
        assert_eq!(resolved.speaker_id, 1);
    }

    #[test]
    fn test_unknown_speakers() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let generation = cache.snapshot();

        let err = RequestResolver::resolve(&generation, &ModelQuery::new().speaker_name("kei"))
            .unwrap_err();
        assert_eq!(err, ResolveError::SpeakerNameNotFound("kei".to_string()));
        assert_eq!(err.param(), "speaker_name");

        let err = RequestResolver::resolve(&generation, &ModelQuery::new().speaker_id(7)).unwrap_err();
        assert_eq!(err, ResolveError::SpeakerIdNotFound(7));
        assert_eq!(err.param(), "speaker_id");
    }

    #[test]
    fn test_style_defaults_and_validation() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let generation = cache.snapshot();

        let resolved = RequestResolver::resolve(&generation, &ModelQuery::new()).unwrap();
        assert_eq!(resolved.style, DEFAULT_STYLE);

        let resolved =
            RequestResolver::resolve(&generation, &ModelQuery::new().style("Happy")).unwrap();
        assert_eq!(resolved.style, "Happy");

        let err = RequestResolver::resolve(&generation, &ModelQuery::new().style("unknown_style"))
            .unwrap_err();
        assert_eq!(err, ResolveError::StyleNotFound("unknown_style".to_string()));
        assert_eq!(err.param(), "style");
    }

    #[test]
    fn test_checks_stop_at_first_failure() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let generation = cache.snapshot();

        // bad speaker and bad style: the speaker is reported
        let err = RequestResolver::resolve(
            &generation,
            &ModelQuery::new().speaker_id(9).style("unknown_style"),
        )
        .unwrap_err();
        assert_eq!(err.param(), "speaker_id");

        // bad model id wins over everything
        let err = RequestResolver::resolve(
            &generation,
            &ModelQuery::new().model_id(5).speaker_id(9).style("unknown_style"),
        )
        .unwrap_err();
        assert_eq!(err.param(), "model_id");
    }

    #[test]
    fn test_empty_speaker_name_is_not_found() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let err = RequestResolver::resolve(&cache.snapshot(), &ModelQuery::new().speaker_name(""))
            .unwrap_err();
        assert_eq!(err, ResolveError::SpeakerNameNotFound(String::new()));
        assert_eq!(err.to_string(), "speaker_name= not found");
    }

    #[test]
    fn test_empty_style_is_not_found() {
        let (_dir, cache, _) = cache_with(&["alice"]);
        let err = RequestResolver::resolve(&cache.snapshot(), &ModelQuery::new().style(""))
            .unwrap_err();
        assert_eq!(err, ResolveError::StyleNotFound(String::new()));
        assert_eq!(err.to_string(), "style= not found");
    }

    // ==================== Idempotence and refresh ====================

    #[test]
    fn test_resolution_is_idempotent() {
        let (_dir, cache, _) = cache_with(&["alice", "bob"]);
        let generation = cache.snapshot();
        let query = ModelQuery::new().model_name("bob").speaker_name("nao").style("Happy");

        let first = RequestResolver::resolve(&generation, &query).unwrap();
        let second = RequestResolver::resolve(&generation, &query).unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first.bundle, &second.bundle));
    }

    #[test]
    fn test_resolved_request_outlives_refresh() {
        let (dir, cache, _) = cache_with(&["alice"]);
        let pipeline = SynthesisPipeline::new(Arc::clone(&cache), 1);
        let resolved = pipeline.resolve(&ModelQuery::new().model_name("alice")).unwrap();
        let weights = resolved.bundle.paths().weights.clone();

        fs::remove_dir_all(dir.path().join("alice")).unwrap();
        write_bundle(dir.path(), "zoe");
        cache.refresh_from(&ModelRegistry::new(dir.path())).unwrap();

        assert_eq!(resolved.bundle.name(), "alice");
        assert_eq!(resolved.bundle.paths().weights, weights);
        assert_eq!(
            pipeline.resolve(&ModelQuery::new().model_name("alice")).unwrap_err(),
            ResolveError::ModelNameNotFound("alice".to_string())
        );
    }

    // ==================== Pipeline ====================

    #[tokio::test]
    async fn test_synthesize_loads_lazily_and_forwards_params() {
        let (_dir, cache, loader) = cache_with(&["alice"]);
        let pipeline = SynthesisPipeline::new(cache, 1);

        let resolved = pipeline
            .resolve(&ModelQuery::new().speaker_name("sou").style("Happy"))
            .unwrap();
        assert_eq!(loader.load_count(), 0);

        let params = SynthesisParams::new("こんにちは")
            .with_language(Language::JP)
            .with_assist_text(Some("楽しい".to_string()), 0.5);
        let audio = pipeline.synthesize(&resolved, &params).await.unwrap();
        pipeline.synthesize(&resolved, &params).await.unwrap();

        assert_eq!(loader.load_count(), 1);
        assert_eq!(audio.sample_rate, crate::common::SAMPLE_RATE);
        assert!(!audio.samples.is_empty());

        let requests = loader.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].speaker_id, 1);
        assert_eq!(requests[0].style, "Happy");
        assert_eq!(requests[0].params, params);
        assert!(requests[0].params.use_assist_text);
    }

    #[tokio::test]
    async fn test_run_reports_resolution_as_client_error() {
        let (_dir, cache, loader) = cache_with(&["alice"]);
        let pipeline = SynthesisPipeline::new(cache, 1);

        let err = pipeline
            .run(&ModelQuery::new().style("nope"), &SynthesisParams::new("x"))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, TtsError::Resolve(ResolveError::StyleNotFound(_))));
        assert_eq!(loader.load_count(), 0);
    }

    #[tokio::test]
    async fn test_inference_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), "alice");
        let loader = CountingLoader::failing_inference();
        let cache = Arc::new(ModelCache::new(loader, Device::Cpu));
        cache.refresh_from(&ModelRegistry::new(dir.path())).unwrap();
        let pipeline = SynthesisPipeline::new(cache, 1);

        let err = pipeline
            .run(&ModelQuery::new(), &SynthesisParams::new("x"))
            .await
            .unwrap_err();
        assert!(!err.is_client_error());
        assert!(matches!(err, TtsError::Inference { .. }));
        assert_eq!(pipeline.available_permits(), 1);
    }
}
