//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which lays out the pipeline's role directories in
//! a temporary root, and fake collaborators whose answers each test chooses.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use framekeeper::audit::AuditLog;
use framekeeper::config::Config;
use framekeeper::lifecycle::{Collaborators, Coordinator};
use framekeeper_av::{
    ConformanceVerdict, DigestOptions, EncodingEngine, Error, FrameDigestManifest, FrameDigester,
    InspectField, MediaInspector, PolicyValidator, Result,
};
use framekeeper_common::EncodeParameters;

/// Temporary pipeline root with arrivals, transcode, success, failure and
/// review directories, and a config pointing at them.
pub struct TestHarness {
    pub root: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let dir = |name: &str| {
            let path = root.path().join(name);
            std::fs::create_dir_all(&path).expect("failed to create role dir");
            path
        };

        let mut config = Config::default();
        config.paths.arrivals = dir("arrivals");
        config.paths.transcode = dir("transcode");
        config.paths.success = dir("success");
        config.paths.failure = dir("failure");
        config.paths.review = dir("review");

        let policy = dir("policies").join("pal.xml");
        std::fs::write(&policy, "<policy/>").expect("failed to write policy");
        config.policy.documents = vec![policy];

        Self { root, config }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Drop a source asset into arrivals.
    pub fn add_source(&self, name: &str) -> PathBuf {
        let path = self.config.paths.arrivals.join(name);
        std::fs::write(&path, format!("source:{}", name)).expect("failed to write source");
        path
    }

    pub fn coordinator(&self, tools: Collaborators) -> Coordinator {
        Coordinator::new(Arc::new(self.config.clone()), tools, AuditLog::in_memory())
    }
}

/// Names of the files directly inside `dir`, sorted.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// ============================================================================
// Fake collaborators
// ============================================================================

/// Inspector answering from a fixed table.
pub struct FakeInspector {
    answers: HashMap<InspectField, String>,
    fail: bool,
}

impl FakeInspector {
    /// A 576-line 4:3 PAL interlaced tape.
    pub fn pal_sd() -> Self {
        let answers = [
            (InspectField::ColourPrimaries, "BT.601 PAL"),
            (InspectField::MatrixCoefficients, "BT.601"),
            (InspectField::ScanType, "Interlaced"),
            (InspectField::ScanOrder, "TFF"),
            (InspectField::FrameRate, "25.000"),
            (InspectField::DisplayAspectRatio, "4:3"),
            (InspectField::Height, "576"),
        ]
        .into_iter()
        .map(|(field, value)| (field, value.to_string()))
        .collect();
        Self {
            answers,
            fail: false,
        }
    }

    pub fn with(mut self, field: InspectField, value: &str) -> Self {
        self.answers.insert(field, value.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            answers: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl MediaInspector for FakeInspector {
    fn name(&self) -> &'static str {
        "fake inspector"
    }

    async fn inspect(&self, _path: &Path, field: InspectField) -> Result<String> {
        if self.fail {
            return Err(Error::tool_not_found("mediainfo"));
        }
        Ok(self.answers.get(&field).cloned().unwrap_or_default())
    }
}

/// Encoder that writes a small file, or fails like a non-zero exit.
#[derive(Default)]
pub struct FakeEncoder {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EncodingEngine for FakeEncoder {
    fn name(&self) -> &'static str {
        "fake encoder"
    }

    async fn encode(&self, input: &Path, params: &EncodeParameters, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::tool_failed("ffmpeg", "exit status: 1"));
        }
        if output.exists() {
            return Err(Error::OutputExists {
                path: output.to_path_buf(),
            });
        }
        let body = format!("{}:{}", params.preset, std::fs::read_to_string(input)?);
        std::fs::write(output, body)?;
        Ok(())
    }
}

/// Digester returning one manifest for files in an `arrivals` directory and
/// another for everything else.
pub struct FakeDigester {
    source: Vec<String>,
    derived: Vec<String>,
    fail: bool,
    seen: DigestRequests,
}

/// Every `(path, options)` a digester was asked for, in order.
pub type DigestRequests = Arc<Mutex<Vec<(PathBuf, DigestOptions)>>>;

impl FakeDigester {
    pub fn new(source: &[&str], derived: &[&str]) -> Self {
        Self {
            source: source.iter().map(|s| s.to_string()).collect(),
            derived: derived.iter().map(|s| s.to_string()).collect(),
            fail: false,
            seen: DigestRequests::default(),
        }
    }

    /// Handle on the requests this digester receives.
    pub fn requests(&self) -> DigestRequests {
        Arc::clone(&self.seen)
    }

    /// Identical manifests.
    pub fn matching() -> Self {
        let frames = ["d41d8cd9", "0cc175b9", "92eb5ffe"];
        Self::new(&frames, &frames)
    }

    pub fn failing() -> Self {
        Self {
            source: Vec::new(),
            derived: Vec::new(),
            fail: true,
            seen: DigestRequests::default(),
        }
    }
}

pub fn manifest_text(digests: &[String]) -> String {
    let mut text = String::from("#format: frame checksums\n#tb 0: 1/25\n");
    for (i, d) in digests.iter().enumerate() {
        text.push_str(&format!("0, {i}, {i}, 1, 1658880, {d}\n"));
    }
    text
}

#[async_trait]
impl FrameDigester for FakeDigester {
    fn name(&self) -> &'static str {
        "fake digester"
    }

    async fn manifest(&self, path: &Path, options: &DigestOptions) -> Result<FrameDigestManifest> {
        self.seen
            .lock()
            .unwrap()
            .push((path.to_path_buf(), *options));
        if self.fail {
            return Err(Error::Timeout {
                tool: "ffmpeg".to_string(),
                timeout: std::time::Duration::from_secs(1),
            });
        }
        let in_arrivals = path
            .parent()
            .and_then(|p| p.file_name())
            .is_some_and(|n| n == "arrivals");
        let digests = if in_arrivals { &self.source } else { &self.derived };
        FrameDigestManifest::parse(&manifest_text(digests))
    }
}

/// Validator returning the same verdict for every policy.
pub struct FakeValidator(pub ConformanceVerdict);

impl FakeValidator {
    pub fn pass() -> Self {
        Self(ConformanceVerdict::Pass)
    }

    pub fn fail(diagnostics: &str) -> Self {
        Self(ConformanceVerdict::Fail {
            diagnostics: diagnostics.to_string(),
        })
    }

    pub fn indeterminate(reason: &str) -> Self {
        Self(ConformanceVerdict::Indeterminate {
            reason: reason.to_string(),
        })
    }
}

#[async_trait]
impl PolicyValidator for FakeValidator {
    fn name(&self) -> &'static str {
        "fake validator"
    }

    async fn validate(&self, _path: &Path, _policy: &Path) -> ConformanceVerdict {
        self.0.clone()
    }
}

/// Bundle fakes into collaborators, keeping a handle on the encoder.
pub fn collaborators(
    inspector: FakeInspector,
    encoder: Arc<FakeEncoder>,
    digester: FakeDigester,
    validator: FakeValidator,
) -> Collaborators {
    Collaborators {
        inspector: Arc::new(inspector),
        encoder,
        digester: Arc::new(digester),
        validator: Arc::new(validator),
    }
}

/// Everything succeeds.
pub fn happy_collaborators() -> Collaborators {
    collaborators(
        FakeInspector::pal_sd(),
        Arc::new(FakeEncoder::default()),
        FakeDigester::matching(),
        FakeValidator::pass(),
    )
}
