//! End-to-end pipeline tests against fake analyzer processes

use pretty_assertions::assert_eq;
use serde_json::json;
use smell_foundation::{PipelineError, SmellConfig, SmellKind};
use smell_pipeline::AnalysisPipeline;
use smell_test_support::helpers::single_file_request;
use smell_test_support::mocks::successful_run;
use smell_test_support::{mock_analyzer, FakeAnalyzer, RequestBuilder, TestPipeline};
use std::sync::Arc;
use std::time::Duration;

fn long_method_document() -> serde_json::Value {
    json!({
        "LongMethod": {
            "count": 1,
            "items": [{
                "file": "main.py",
                "lineStart": 1,
                "lineEnd": 60,
                "message": "Method 'main' has 60 lines"
            }]
        }
    })
}

#[tokio::test]
async fn test_default_config_fills_every_active_kind() {
    let fake = FakeAnalyzer::recording(&long_method_document());
    let harness = TestPipeline::with_fake(&fake);

    let response = harness.pipeline.run(single_file_request()).await.unwrap();

    assert_eq!(response.active_smells, SmellKind::ALL.to_vec());
    assert_eq!(response.findings.len(), 6);
    assert_eq!(response.findings[&SmellKind::LongMethod].count, 1);
    assert_eq!(
        response.findings.values().filter(|g| g.count == 0).count(),
        5
    );

    // Analyzer saw one staged path and all six kinds enabled
    let args = fake.recorded_args();
    assert_eq!(args.len(), 2);
    assert!(args[0].ends_with("main.py"));
    let config = fake.recorded_config().unwrap();
    for kind in SmellKind::ALL {
        assert_eq!(config[kind.as_str()], true);
    }

    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_only_wins_over_toggle() {
    let fake = FakeAnalyzer::recording(&json!({ "MagicNumbers": { "count": 0, "items": [] } }));
    let harness = TestPipeline::with_fake(&fake);
    let request = RequestBuilder::new()
        .file("a.py", "x = 42")
        .toggle("MagicNumbers", false)
        .only(&["MagicNumbers"])
        .build();

    let response = harness.pipeline.run(request).await.unwrap();
    assert_eq!(response.active_smells, vec![SmellKind::MagicNumbers]);
    assert_eq!(fake.recorded_config().unwrap()["GodClass"], false);
}

#[tokio::test]
async fn test_exclude_removes_kind_and_drops_its_findings() {
    let fake = FakeAnalyzer::emitting(&json!({
        "GodClass": { "count": 1, "items": [{
            "file": "a.py", "lineStart": 1, "lineEnd": 400, "message": "huge"
        }] }
    }));
    let harness = TestPipeline::with_fake(&fake);
    let request = RequestBuilder::new()
        .file("a.py", "class A: pass")
        .exclude(&["GodClass"])
        .build();

    let response = harness.pipeline.run(request).await.unwrap();
    assert_eq!(response.active_smells.len(), 5);
    assert!(!response.findings.contains_key(&SmellKind::GodClass));
}

#[tokio::test]
async fn test_nonzero_exit_fails_and_removes_workspace() {
    let fake = FakeAnalyzer::exiting(2, "Traceback: boom");
    let harness = TestPipeline::with_fake(&fake);

    let err = harness.pipeline.run(single_file_request()).await.unwrap_err();
    match &err {
        PipelineError::AnalyzerExitFailure { code, stderr } => {
            assert_eq!(*code, Some(2));
            assert!(stderr.contains("boom"));
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(err.to_body().details.as_deref(), Some("Exit code: 2"));

    let stats = harness.pipeline.stager().stats();
    assert_eq!(stats.staged(), 1);
    assert_eq!(stats.torn_down(), 1);
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_empty_active_set_short_circuits() {
    let mut analyzer = mock_analyzer();
    analyzer.expect_invoke().never();
    let harness = TestPipeline::with_defaults(Arc::new(analyzer), SmellConfig::all(false));

    let response = harness.pipeline.run(single_file_request()).await.unwrap();
    assert!(response.active_smells.is_empty());
    assert!(response.findings.is_empty());
    assert_eq!(harness.pipeline.stager().stats().staged(), 0);
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_no_files_rejected_before_staging() {
    let mut analyzer = mock_analyzer();
    analyzer.expect_invoke().never();
    let harness = TestPipeline::new(Arc::new(analyzer));

    let err = harness
        .pipeline
        .run(RequestBuilder::new().build())
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.to_body().error, "No code provided");
    assert_eq!(harness.pipeline.stager().stats().staged(), 0);
}

#[tokio::test]
async fn test_traversal_name_rejected_before_staging() {
    let mut analyzer = mock_analyzer();
    analyzer.expect_invoke().never();
    let harness = TestPipeline::new(Arc::new(analyzer));

    let request = RequestBuilder::new().file("../escape.py", "x = 1").build();
    let err = harness.pipeline.run(request).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_timeout_kills_analyzer_and_cleans_up() {
    let fake = FakeAnalyzer::hanging();
    let harness = TestPipeline::with_fake(&fake);

    let err = harness.pipeline.run(single_file_request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::AnalyzerTimeout { timeout_ms: 500 }));
    assert_eq!(err.to_body().error, "Analysis timed out");
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_missing_analyzer_is_start_failure() {
    let analyzer = smell_pipeline::ProcessAnalyzer::new(&["/nonexistent/detector".to_string()]).unwrap();
    let harness = TestPipeline::new(Arc::new(analyzer));

    let err = harness.pipeline.run(single_file_request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::AnalyzerStartFailure { .. }));
    assert_eq!(harness.pipeline.stager().stats().torn_down(), 1);
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_garbage_output_is_invalid_with_raw_details() {
    let fake = FakeAnalyzer::garbage("not json at all");
    let harness = TestPipeline::with_fake(&fake);

    let err = harness.pipeline.run(single_file_request()).await.unwrap_err();
    let body = err.to_body();
    assert_eq!(body.error, "Invalid analysis output");
    assert!(body.details.unwrap().contains("not json at all"));
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_findings_are_relabelled_to_submitted_names() {
    let mut analyzer = mock_analyzer();
    analyzer.expect_invoke().times(1).returning(|files, _config| {
        let document = json!({
            "FeatureEnvy": { "items": [{
                "file": files[0].display().to_string(),
                "lineStart": 3,
                "lineEnd": 8,
                "message": "uses other.x too much",
                "snippet": "return other.x + other.y"
            }] }
        });
        Ok(successful_run(document.to_string()))
    });
    let harness = TestPipeline::new(Arc::new(analyzer));

    let request = RequestBuilder::new()
        .file("envy.py", "def f(other):\n    return other.x + other.y\n")
        .only(&["FeatureEnvy"])
        .build();
    let response = harness.pipeline.run(request).await.unwrap();

    let item = &response.findings[&SmellKind::FeatureEnvy].items[0];
    assert_eq!(item.file, "envy.py");
    assert_eq!(item.snippet.as_deref(), Some("return other.x + other.y"));
}

#[tokio::test]
async fn test_reject_unknown_kinds_when_configured() {
    let mut analyzer = mock_analyzer();
    analyzer.expect_invoke().never();
    let harness = TestPipeline::new(Arc::new(analyzer));
    let pipeline: AnalysisPipeline = harness.pipeline.clone().with_reject_unknown(true);

    let request = RequestBuilder::new()
        .file("a.py", "pass")
        .exclude(&["Spaghetti"])
        .build();
    let err = pipeline.run(request).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("Spaghetti"));
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_workspaces() {
    let fake = FakeAnalyzer::emitting(&json!({}));
    let harness = TestPipeline::with_fake(&fake);

    let runs = (0..8).map(|i| {
        let pipeline = harness.pipeline.clone();
        let request = RequestBuilder::new()
            .file(&format!("f{}.py", i), "pass")
            .build();
        tokio::spawn(async move { pipeline.run(request).await })
    });
    for handle in runs.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    let stats = harness.pipeline.stager().stats();
    assert_eq!(stats.staged(), 8);
    assert_eq!(stats.torn_down(), 8);
    assert!(harness.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_cancelled_request_removes_workspace() {
    let fake = FakeAnalyzer::hanging();
    let harness = TestPipeline::with_fake(&fake);

    let pipeline = harness.pipeline.clone();
    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(100),
        pipeline.run(single_file_request()),
    )
    .await;
    assert!(outcome.is_err());

    assert_eq!(harness.pipeline.stager().stats().live(), 0);
    assert!(harness.leftover_workspaces().is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_cancelled_request_kills_analyzer() {
    let fake = FakeAnalyzer::hanging_with_pid();
    let analyzer = fake
        .process_analyzer()
        .with_timeout(Duration::from_secs(30));
    let harness = TestPipeline::new(Arc::new(analyzer));

    let pipeline = harness.pipeline.clone();
    let request = tokio::spawn(async move { pipeline.run(single_file_request()).await });

    let pid = fake
        .wait_for_pid(Duration::from_secs(5))
        .await
        .expect("analyzer recorded its pid");
    assert!(smell_test_support::process_alive(pid));

    request.abort();
    assert!(request.await.unwrap_err().is_cancelled());

    assert!(smell_test_support::wait_for_exit(pid, Duration::from_secs(3)).await);
    assert_eq!(harness.pipeline.stager().stats().live(), 0);
    assert!(harness.leftover_workspaces().is_empty());
}
