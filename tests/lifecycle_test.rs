//! Lifecycle integration tests.
//!
//! Drives [`Coordinator::process_asset`](framekeeper::lifecycle::Coordinator)
//! with fake collaborators over a temporary directory layout (via
//! [`TestHarness`]) and checks where each file ends up, the terminal state,
//! and what the audit log recorded.

mod common;

use std::sync::Arc;

use common::{
    collaborators, files_in, happy_collaborators, FakeDigester, FakeEncoder, FakeInspector,
    FakeValidator, TestHarness,
};
use framekeeper::audit::{AuditLog, Severity};
use framekeeper::config::{
    DerivedDisposition, MismatchPolicy, SourceDisposition, StaleDerivedPolicy,
};
use framekeeper::lifecycle::{Coordinator, TerminalState};
use framekeeper_av::{ClampRange, DigestOptions, InspectField};
use framekeeper_common::{CodecFamily, Crop};

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conformant_match_stores_derived_and_deletes_source() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let mut coordinator = harness.coordinator(happy_collaborators());

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::Succeeded);
    assert_eq!(terminal.exit_code(), 0);
    assert!(!source.exists(), "source should be deleted after success");
    assert_eq!(files_in(&harness.config.paths.success), vec!["N_1234.mov"]);
    assert!(files_in(&harness.config.paths.transcode).is_empty());
    assert!(files_in(&harness.config.paths.failure).is_empty());

    let audit = coordinator.audit();
    assert_eq!(audit.count(Severity::Error), 0);
    assert_eq!(audit.count(Severity::Critical), 0);
    assert!(audit.contains("SD 4:3 PAL interlaced"));
    assert!(audit.contains("frames match (3 frames)"));
    assert!(audit.contains("source deleted"));
    assert!(audit.contains("attempt finished: succeeded"));
}

#[tokio::test]
async fn success_can_relocate_source_to_completed() {
    let mut harness = TestHarness::new();
    let completed = harness.path("completed");
    harness.config.paths.completed = Some(completed.clone());
    harness.config.lifecycle.source_on_success = SourceDisposition::Relocate;
    let source = harness.add_source("N_1234.mkv");
    let mut coordinator = harness.coordinator(happy_collaborators());

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::Succeeded);
    assert!(!source.exists());
    assert_eq!(files_in(&completed), vec!["N_1234.mkv"]);
    assert_eq!(
        std::fs::read_to_string(completed.join("N_1234.mkv")).unwrap(),
        "source:N_1234.mkv"
    );
}

#[tokio::test]
async fn source_survives_when_completed_slot_is_occupied() {
    let mut harness = TestHarness::new();
    let completed = harness.path("completed");
    harness.config.paths.completed = Some(completed.clone());
    harness.config.lifecycle.source_on_success = SourceDisposition::Relocate;
    std::fs::create_dir_all(&completed).unwrap();
    std::fs::write(completed.join("N_1234.mkv"), "earlier source").unwrap();
    let source = harness.add_source("N_1234.mkv");
    let mut coordinator = harness.coordinator(happy_collaborators());

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::Succeeded);
    assert_eq!(files_in(&harness.config.paths.success), vec!["N_1234.mov"]);
    assert_eq!(
        std::fs::read_to_string(&source).unwrap(),
        "source:N_1234.mkv"
    );
    assert_eq!(
        std::fs::read_to_string(completed.join("N_1234.mkv")).unwrap(),
        "earlier source"
    );
    assert_eq!(coordinator.audit().count(Severity::Critical), 1);
    assert!(!coordinator.audit().contains("source moved to"));
}

#[tokio::test]
async fn derived_suffix_names_the_stored_asset() {
    let mut harness = TestHarness::new();
    harness.config.target.derived_suffix = "_v210".to_string();
    let source = harness.add_source("N_1234_01of02.mkv");
    let mut coordinator = harness.coordinator(happy_collaborators());

    assert_eq!(
        coordinator.process_asset(&source).await,
        TerminalState::Succeeded
    );
    assert_eq!(
        files_in(&harness.config.paths.success),
        vec!["N_1234_01of02_v210.mov"]
    );
}

// ---------------------------------------------------------------------------
// Resolution and encode failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn encode_failure_leaves_source_untouched() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let encoder = Arc::new(FakeEncoder::failing());
    let tools = collaborators(
        FakeInspector::pal_sd(),
        encoder.clone(),
        FakeDigester::matching(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedResolution);
    assert_eq!(encoder.call_count(), 1);
    assert_eq!(
        std::fs::read_to_string(&source).unwrap(),
        "source:N_1234.mkv"
    );
    assert!(files_in(&harness.config.paths.success).is_empty());
    assert!(files_in(&harness.config.paths.transcode).is_empty());
    assert_eq!(coordinator.audit().count(Severity::Error), 1);
    assert!(coordinator.audit().contains("exit status: 1"));
}

#[tokio::test]
async fn probe_failure_is_a_resolution_failure() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let encoder = Arc::new(FakeEncoder::default());
    let tools = collaborators(
        FakeInspector::failing(),
        encoder.clone(),
        FakeDigester::matching(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    assert_eq!(
        coordinator.process_asset(&source).await,
        TerminalState::FailedResolution
    );
    assert_eq!(encoder.call_count(), 0);
    assert!(source.exists());
    assert!(coordinator.audit().contains("probe failed"));
}

#[tokio::test]
async fn unrecognised_field_order_never_reaches_the_encoder() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let encoder = Arc::new(FakeEncoder::default());
    let tools = collaborators(
        FakeInspector::pal_sd().with(InspectField::ScanOrder, "MBAFF"),
        encoder.clone(),
        FakeDigester::matching(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedResolution);
    assert_eq!(encoder.call_count(), 0);
    assert!(source.exists());
    assert!(coordinator.audit().contains("MBAFF"));
}

#[tokio::test]
async fn uncovered_profile_fails_resolution() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd().with(InspectField::DisplayAspectRatio, "5:4"),
        Arc::new(FakeEncoder::default()),
        FakeDigester::matching(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    assert_eq!(
        coordinator.process_asset(&source).await,
        TerminalState::FailedResolution
    );
    assert!(source.exists());
    assert_eq!(coordinator.audit().count(Severity::Error), 1);
}

// ---------------------------------------------------------------------------
// Stale derived assets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_derived_blocks_by_default() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let stale = harness.config.paths.transcode.join("N_1234.mov");
    std::fs::write(&stale, "left over").unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let tools = collaborators(
        FakeInspector::pal_sd(),
        encoder.clone(),
        FakeDigester::matching(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedResolution);
    assert_eq!(encoder.call_count(), 0);
    assert_eq!(std::fs::read_to_string(&stale).unwrap(), "left over");
    assert!(source.exists());
    assert!(coordinator.audit().contains("output already exists"));
}

#[tokio::test]
async fn stale_derived_removed_when_configured() {
    let mut harness = TestHarness::new();
    harness.config.lifecycle.stale_derived = StaleDerivedPolicy::Remove;
    let source = harness.add_source("N_1234.mkv");
    std::fs::write(harness.config.paths.transcode.join("N_1234.mov"), "left over").unwrap();
    let mut coordinator = harness.coordinator(happy_collaborators());

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::Succeeded);
    assert!(coordinator.audit().contains("removed stale derived asset"));
    let stored = harness.config.paths.success.join("N_1234.mov");
    assert_ne!(std::fs::read_to_string(stored).unwrap(), "left over");
}

#[tokio::test]
async fn derived_path_that_is_the_source_is_refused() {
    let mut harness = TestHarness::new();
    harness.config.target.codec = CodecFamily::Ffv1;
    harness.config.lifecycle.stale_derived = StaleDerivedPolicy::Remove;
    harness.config.paths.transcode = harness.path("failure/../arrivals");
    let source = harness.add_source("N_1234.mkv");
    let encoder = Arc::new(FakeEncoder::default());
    let tools = collaborators(
        FakeInspector::pal_sd().with(InspectField::MatrixCoefficients, "BT.470 System B/G"),
        encoder.clone(),
        FakeDigester::matching(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedResolution);
    assert_eq!(encoder.call_count(), 0);
    assert_eq!(
        std::fs::read_to_string(&source).unwrap(),
        "source:N_1234.mkv"
    );
    assert!(coordinator.audit().contains("is the source itself"));
    assert!(!coordinator.audit().contains("removed stale derived asset"));
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cropped_source_is_digested_over_the_encoded_window() {
    let mut harness = TestHarness::new();
    harness.config.verify.clamp_low = 16;
    harness.config.verify.clamp_high = 1000;
    let source = harness.add_source("N_1234.mkv");
    let digester = FakeDigester::matching();
    let requests = digester.requests();
    let tools = collaborators(
        FakeInspector::pal_sd().with(InspectField::Height, "608 pixels"),
        Arc::new(FakeEncoder::default()),
        digester,
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    assert_eq!(
        coordinator.process_asset(&source).await,
        TerminalState::Succeeded
    );

    let clamp = ClampRange::new(16, 1000).unwrap();
    let crop = Crop {
        width: 720,
        height: 576,
        x: 0,
        y: 32,
    };
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, source);
    assert_eq!(requests[0].1, DigestOptions::new(clamp).with_crop(Some(crop)));
    assert_eq!(
        requests[1].0,
        harness.config.paths.transcode.join("N_1234.mov")
    );
    assert_eq!(requests[1].1, DigestOptions::new(clamp));
}

#[tokio::test]
async fn frame_mismatch_sends_source_to_review() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::new(&["d1", "d2", "d3"], &["d1", "d2", "d4"]),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedVerification);
    assert_eq!(terminal.exit_code(), 10);
    assert!(!source.exists());
    assert_eq!(files_in(&harness.config.paths.review), vec!["N_1234.mkv"]);
    assert_eq!(files_in(&harness.config.paths.failure), vec!["N_1234.mov"]);
    assert!(files_in(&harness.config.paths.success).is_empty());

    let audit = coordinator.audit();
    assert!(audit.contains("1 of 3 positions differ"));
    assert!(audit.contains("frame 2 (source 0.080s, derived 0.080s)"));
    assert_eq!(audit.count(Severity::Warning), 2);
}

#[tokio::test]
async fn frame_count_difference_is_a_mismatch() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::new(&["d1", "d2", "d3"], &["d1", "d2"]),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    assert_eq!(
        coordinator.process_asset(&source).await,
        TerminalState::FailedVerification
    );
    assert!(coordinator
        .audit()
        .contains("source has 3 frames, derived has 2"));
}

#[tokio::test]
async fn retry_policy_keeps_mismatched_source_in_arrivals() {
    let mut harness = TestHarness::new();
    harness.config.lifecycle.on_mismatch = MismatchPolicy::Retry;
    harness.config.lifecycle.failed_derived = DerivedDisposition::Delete;
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::new(&["d1", "d2", "d3"], &["d1", "d2", "d4"]),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedVerification);
    assert!(source.exists());
    assert!(files_in(&harness.config.paths.review).is_empty());
    assert!(files_in(&harness.config.paths.failure).is_empty());
    assert!(files_in(&harness.config.paths.transcode).is_empty());
    assert!(coordinator.audit().contains("derived asset deleted"));
}

#[tokio::test]
async fn digest_failure_keeps_source_in_arrivals() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::failing(),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedVerification);
    assert!(source.exists());
    assert!(files_in(&harness.config.paths.review).is_empty());
    assert_eq!(files_in(&harness.config.paths.failure), vec!["N_1234.mov"]);
    assert!(coordinator.audit().contains("timed out"));
}

#[tokio::test]
async fn manifests_archived_with_outcome_prefix() {
    let mut harness = TestHarness::new();
    let manifests = harness.path("manifests");
    harness.config.paths.manifests = Some(manifests.clone());

    let matched = harness.add_source("N_1.mkv");
    let mut coordinator = harness.coordinator(happy_collaborators());
    assert_eq!(
        coordinator.process_asset(&matched).await,
        TerminalState::Succeeded
    );

    let mismatched = harness.add_source("N_2.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::new(&["d1"], &["d2"]),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);
    assert_eq!(
        coordinator.process_asset(&mismatched).await,
        TerminalState::FailedVerification
    );

    assert_eq!(
        files_in(&manifests),
        vec![
            "N_1.mkv.framemd5",
            "N_1.mov.framemd5",
            "failed_N_2.mkv.framemd5",
            "failed_N_2.mov.framemd5",
        ]
    );
    let text = std::fs::read_to_string(manifests.join("failed_N_2.mkv.framemd5")).unwrap();
    assert!(text.contains("#tb 0: 1/25"));
    assert!(text.ends_with("d1\n"));
}

#[tokio::test]
async fn retried_mismatches_keep_every_manifest() {
    let mut harness = TestHarness::new();
    let manifests = harness.path("manifests");
    harness.config.paths.manifests = Some(manifests.clone());
    harness.config.lifecycle.on_mismatch = MismatchPolicy::Retry;
    harness.config.lifecycle.failed_derived = DerivedDisposition::Delete;
    let source = harness.add_source("N_2.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::new(&["d1"], &["d2"]),
        FakeValidator::pass(),
    );
    let mut coordinator = harness.coordinator(tools);

    for _ in 0..2 {
        assert_eq!(
            coordinator.process_asset(&source).await,
            TerminalState::FailedVerification
        );
    }

    assert_eq!(
        files_in(&manifests),
        vec![
            "failed_N_2.mkv.framemd5",
            "failed_N_2.mkv_1.framemd5",
            "failed_N_2.mov.framemd5",
            "failed_N_2.mov_1.framemd5",
        ]
    );
    assert_eq!(coordinator.audit().count(Severity::Warning), 4);
}

// ---------------------------------------------------------------------------
// Conformance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conformance_failure_relocates_derived_and_keeps_source() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::matching(),
        FakeValidator::fail("range error"),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedConformance);
    assert_eq!(terminal.exit_code(), 11);
    assert!(source.exists());
    assert_eq!(files_in(&harness.config.paths.failure), vec!["N_1234.mov"]);
    assert!(files_in(&harness.config.paths.success).is_empty());
    assert!(coordinator.audit().contains("range error"));
}

#[tokio::test]
async fn indeterminate_conformance_never_succeeds() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let tools = collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::matching(),
        FakeValidator::indeterminate("mediaconch timed out"),
    );
    let mut coordinator = harness.coordinator(tools);

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedConformance);
    assert!(source.exists());
    assert!(files_in(&harness.config.paths.success).is_empty());
    assert!(coordinator
        .audit()
        .contains("indeterminate: mediaconch timed out"));
}

#[tokio::test]
async fn repeated_conformance_failures_stay_retryable() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let encoder = Arc::new(FakeEncoder::default());
    let tools = collaborators(
        FakeInspector::pal_sd(),
        encoder.clone(),
        FakeDigester::matching(),
        FakeValidator::fail("range error"),
    );
    let mut coordinator = harness.coordinator(tools);

    for _ in 0..3 {
        assert_eq!(
            coordinator.process_asset(&source).await,
            TerminalState::FailedConformance
        );
        assert!(files_in(&harness.config.paths.transcode).is_empty());
    }

    assert_eq!(encoder.call_count(), 3);
    assert!(source.exists());
    assert_eq!(
        files_in(&harness.config.paths.failure),
        vec!["N_1234.mov", "N_1234_1.mov", "N_1234_2.mov"]
    );
    assert_eq!(coordinator.audit().count(Severity::Critical), 0);
}

// ---------------------------------------------------------------------------
// Relocation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn occupied_success_slot_is_a_relocation_failure() {
    let harness = TestHarness::new();
    let source = harness.add_source("N_1234.mkv");
    let occupant = harness.config.paths.success.join("N_1234.mov");
    std::fs::write(&occupant, "earlier delivery").unwrap();
    let mut coordinator = harness.coordinator(happy_collaborators());

    let terminal = coordinator.process_asset(&source).await;

    assert_eq!(terminal, TerminalState::FailedRelocation);
    assert_eq!(terminal.exit_code(), 13);
    assert!(source.exists(), "source must survive an unconfirmed delivery");
    assert_eq!(
        std::fs::read_to_string(&occupant).unwrap(),
        "earlier delivery"
    );
    assert_eq!(files_in(&harness.config.paths.transcode), vec!["N_1234.mov"]);
    assert_eq!(coordinator.audit().count(Severity::Critical), 2);
}

// ---------------------------------------------------------------------------
// Preflight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assets_outside_arrivals_are_skipped() {
    let harness = TestHarness::new();
    let stray = harness.path("N_1234.mkv");
    std::fs::write(&stray, "stray").unwrap();
    let mut coordinator = harness.coordinator(happy_collaborators());

    assert_eq!(
        coordinator.process_asset(&stray).await,
        TerminalState::Skipped
    );
    assert!(stray.exists());
    assert!(coordinator.audit().entries().is_empty());
}

#[tokio::test]
async fn unaccepted_or_missing_assets_are_skipped() {
    let harness = TestHarness::new();
    let wrong_extension = harness.add_source("N_1234.mov");
    let missing = harness.config.paths.arrivals.join("N_9999.mkv");
    let mut coordinator = harness.coordinator(happy_collaborators());

    assert_eq!(
        coordinator.process_asset(&wrong_extension).await,
        TerminalState::Skipped
    );
    assert_eq!(
        coordinator.process_asset(&missing).await,
        TerminalState::Skipped
    );
    assert!(wrong_extension.exists());
    assert!(files_in(&harness.config.paths.transcode).is_empty());
}

// ---------------------------------------------------------------------------
// Audit sink
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audit_log_file_records_every_step() {
    let harness = TestHarness::new();
    let log_path = harness.path("logs/framekeeper.log");
    let source = harness.add_source("N_1234.mkv");
    let mut coordinator = Coordinator::new(
        Arc::new(harness.config.clone()),
        happy_collaborators(),
        AuditLog::to_file(&log_path),
    );

    coordinator.process_asset(&source).await;

    let text = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), coordinator.audit().entries().len());
    assert!(lines
        .iter()
        .all(|l| l.split('\t').count() == 4 && l.contains("\tN_1234.mkv\t")));
    assert!(lines[0].contains("\tINFO\t"));
    assert!(lines.last().unwrap().ends_with("attempt finished: succeeded"));
}
