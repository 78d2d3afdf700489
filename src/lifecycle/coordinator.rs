//! Drives one source asset from arrival to a terminal state.

use super::failure::Failure;
use super::relocate::{
    delete_confirmed, relocate, relocate_numbered, write_numbered, RelocationError,
};
use super::state::{Asset, LifecycleState, TerminalState};
use crate::audit::AuditLog;
use crate::config::{
    Config, DerivedDisposition, MismatchPolicy, SourceDisposition, StaleDerivedPolicy,
};
use crate::resolver::resolve;
use framekeeper_av::{
    check_conformance, probe_profile, verify, ClampRange, ConformanceVerdict, DigestOptions,
    EncodingEngine, FfmpegEncoder, FfmpegFrameMd5, FrameDigester, MediaConchValidator,
    MediaInfoInspector, MediaInspector, PolicyValidator, ToolRegistry, ToolsConfig, Verification,
    VerificationVerdict,
};
use framekeeper_common::{paths, EncodeParameters};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Divergent frames listed individually in the audit log.
const MAX_LOGGED_DIVERGENCES: usize = 50;

/// The external collaborators a coordinator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub inspector: Arc<dyn MediaInspector>,
    pub encoder: Arc<dyn EncodingEngine>,
    pub digester: Arc<dyn FrameDigester>,
    pub validator: Arc<dyn PolicyValidator>,
}

impl Collaborators {
    /// CLI-backed collaborators using discovered tool paths.
    pub fn from_registry(registry: &ToolRegistry, tools: &ToolsConfig) -> Self {
        let ffmpeg = registry.path_or_name("ffmpeg");
        Self {
            inspector: Arc::new(MediaInfoInspector::new(
                registry.path_or_name("mediainfo"),
                tools.probe_timeout,
            )),
            encoder: Arc::new(FfmpegEncoder::new(ffmpeg.clone(), tools.encode_timeout)),
            digester: Arc::new(FfmpegFrameMd5::new(ffmpeg, tools.digest_timeout)),
            validator: Arc::new(MediaConchValidator::new(
                registry.path_or_name("mediaconch"),
                tools.validate_timeout,
            )),
        }
    }
}

/// Sole owner of lifecycle transitions and of every file move or delete.
pub struct Coordinator {
    config: Arc<Config>,
    tools: Collaborators,
    audit: AuditLog,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, tools: Collaborators, audit: AuditLog) -> Self {
        Self {
            config,
            tools,
            audit,
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Process one source asset end to end.
    ///
    /// Never retries within an invocation: a source left in arrivals is
    /// picked up again by a later run.
    pub async fn process_asset(&mut self, source: &Path) -> TerminalState {
        if let Some(reason) = self.preflight(source) {
            tracing::info!("Skipping {:?}: {}", source, reason);
            return TerminalState::Skipped;
        }

        let mut asset = Asset::source(source.to_path_buf());
        let name = asset.name();
        self.audit.info(&name, format!("arrived at {}", source.display()));

        let state = self.run(&mut asset, &name).await;
        let terminal = state.terminal().unwrap_or(TerminalState::FailedResolution);
        self.audit.info(&name, format!("attempt finished: {}", terminal));
        terminal
    }

    fn preflight(&self, source: &Path) -> Option<String> {
        let config = &self.config;
        if !source.is_file() {
            return Some("not a regular file".to_string());
        }
        if !paths::has_extension(source, &config.target.accepted_extensions) {
            return Some(format!(
                "extension not in {:?}",
                config.target.accepted_extensions
            ));
        }
        if !paths::is_within(&paths::resolve(source), &paths::resolve(&config.paths.arrivals)) {
            return Some(format!("not inside {:?}", config.paths.arrivals));
        }
        None
    }

    fn transition(&self, asset: &mut Asset, next: LifecycleState) {
        if let Err(e) = asset.advance(next) {
            tracing::error!("{}: {}", asset.name(), e);
            return;
        }
        tracing::debug!("{} -> {}", asset.name(), next);
    }

    fn transition_both(&self, source: &mut Asset, derived: &mut Asset, next: LifecycleState) {
        self.transition(source, next);
        self.transition(derived, next);
    }

    fn report(&mut self, name: &str, failure: &Failure) {
        self.audit.record(failure.severity(), name, failure.to_string());
    }

    fn abort(&mut self, asset: &mut Asset, name: &str, failure: Failure) -> LifecycleState {
        self.report(name, &failure);
        self.transition(asset, LifecycleState::FailedResolution);
        asset.state
    }

    async fn run(&mut self, asset: &mut Asset, name: &str) -> LifecycleState {
        let config = Arc::clone(&self.config);
        let source = asset.path.clone();
        let family = config.target.codec;

        // Arrived: probe and resolve
        let profile = match probe_profile(self.tools.inspector.as_ref(), &source).await {
            Ok(profile) => profile,
            Err(e) => return self.abort(asset, name, Failure::Probe(e)),
        };
        self.audit.info(name, format!("probed: {}", profile.summary()));

        let params = match resolve(&profile, family) {
            Ok(params) => params,
            Err(e) => return self.abort(asset, name, Failure::Resolution(e)),
        };
        asset.family = Some(family);
        self.audit.info(
            name,
            format!("resolved {} preset '{}'", family, params.preset),
        );

        let derived = match paths::derived_path(
            &source,
            &config.paths.transcode,
            &config.target.derived_suffix,
            params.container,
        ) {
            Ok(path) => path,
            Err(e) => {
                let err = framekeeper_av::Error::InvalidInput(e.to_string());
                return self.abort(asset, name, Failure::Encode(err));
            }
        };

        if paths::resolve(&derived) == paths::resolve(&source) {
            let err = framekeeper_av::Error::InvalidInput(format!(
                "derived path {} is the source itself",
                derived.display()
            ));
            return self.abort(asset, name, Failure::Encode(err));
        }

        if let Err(failure) = self.clear_stale(name, &derived) {
            return self.abort(asset, name, failure);
        }

        // Transcoding
        self.transition(asset, LifecycleState::Transcoding);
        if let Err(failure) = self.encode(name, &source, &params, &derived).await {
            return self.abort(asset, name, failure);
        }

        let mut output = Asset::derived(derived.clone(), family);
        let state = self.verify_and_check(asset, &mut output, name, &params).await;
        tracing::debug!("{}: derived {} ended {}", name, output.name(), output.state);
        state
    }

    /// From Verifying onwards both assets move together.
    async fn verify_and_check(
        &mut self,
        asset: &mut Asset,
        output: &mut Asset,
        name: &str,
        params: &EncodeParameters,
    ) -> LifecycleState {
        let config = Arc::clone(&self.config);
        let source = asset.path.clone();
        let derived = output.path.clone();

        // Verifying
        self.transition_both(asset, output, LifecycleState::Verifying);
        let verification = match self.verify_frames(name, &source, params, &derived).await {
            Ok(verification) => verification,
            Err(failure) => {
                self.report(name, &failure);
                self.dispose_failed_derived(name, &derived);
                self.transition_both(asset, output, LifecycleState::FailedVerification);
                return asset.state;
            }
        };
        self.archive_manifests(name, &source, &derived, &verification);

        match verification.verdict {
            VerificationVerdict::Match { frames } => {
                self.audit.info(name, format!("frames match ({} frames)", frames));
            }
            VerificationVerdict::Mismatch {
                source_frames,
                derived_frames,
                divergent,
            } => {
                let failure = Failure::VerificationMismatch {
                    frames: source_frames.max(derived_frames),
                    divergent: divergent.len(),
                };
                self.report(name, &failure);
                self.audit.warning(
                    name,
                    format!(
                        "source has {} frames, derived has {}; divergent: {}",
                        source_frames,
                        derived_frames,
                        describe_divergences(&divergent)
                    ),
                );
                self.dispose_failed_derived(name, &derived);
                self.dispose_mismatched_source(name, &source);
                self.transition_both(asset, output, LifecycleState::FailedVerification);
                return asset.state;
            }
        }

        // ConformanceChecking
        self.transition_both(asset, output, LifecycleState::ConformanceChecking);
        let verdict = check_conformance(
            self.tools.validator.as_ref(),
            &derived,
            &config.policy.documents,
        )
        .await;

        let diagnostics = match verdict {
            ConformanceVerdict::Pass => {
                self.audit.info(name, "conformance pass");
                let next = self.succeed(name, &source, &derived);
                self.transition_both(asset, output, next);
                return asset.state;
            }
            ConformanceVerdict::Fail { diagnostics } => diagnostics,
            ConformanceVerdict::Indeterminate { reason } => format!("indeterminate: {}", reason),
        };

        self.report(name, &Failure::Conformance(diagnostics));
        self.dispose_failed_derived(name, &derived);
        self.audit
            .info(name, format!("source left in place: {}", source.display()));
        self.transition_both(asset, output, LifecycleState::FailedConformance);
        asset.state
    }

    fn clear_stale(&mut self, name: &str, derived: &Path) -> Result<(), Failure> {
        if std::fs::symlink_metadata(derived).is_err() {
            return Ok(());
        }
        match self.config.lifecycle.stale_derived {
            StaleDerivedPolicy::Block => Err(Failure::Encode(framekeeper_av::Error::OutputExists {
                path: derived.to_path_buf(),
            })),
            StaleDerivedPolicy::Remove => {
                delete_confirmed(derived)?;
                self.audit.warning(
                    name,
                    format!("removed stale derived asset {}", derived.display()),
                );
                Ok(())
            }
        }
    }

    async fn encode(
        &mut self,
        name: &str,
        source: &Path,
        params: &EncodeParameters,
        derived: &Path,
    ) -> Result<(), Failure> {
        let started = Instant::now();
        self.tools
            .encoder
            .encode(source, params, derived)
            .await
            .map_err(Failure::Encode)?;
        self.audit.info(
            name,
            format!(
                "encoded {} with {} in {:.1}s",
                derived.display(),
                self.tools.encoder.name(),
                started.elapsed().as_secs_f64()
            ),
        );
        Ok(())
    }

    async fn verify_frames(
        &mut self,
        name: &str,
        source: &Path,
        params: &EncodeParameters,
        derived: &Path,
    ) -> Result<Verification, Failure> {
        let verify_config = &self.config.verify;
        let clamp = ClampRange::new(verify_config.clamp_low, verify_config.clamp_high)
            .map_err(Failure::Digest)?;
        // The encode cropped the picture; digest the same window of the source.
        let source_options = DigestOptions::new(clamp).with_crop(params.crop);
        let derived_options = DigestOptions::new(clamp);

        let started = Instant::now();
        let verification = verify(
            self.tools.digester.as_ref(),
            source,
            &source_options,
            derived,
            &derived_options,
        )
        .await
        .map_err(Failure::Digest)?;

        self.audit.info(
            name,
            format!(
                "digested {} + {} frames in {:.1}s",
                verification.source_manifest.len(),
                verification.derived_manifest.len(),
                started.elapsed().as_secs_f64()
            ),
        );
        Ok(verification)
    }

    fn archive_manifests(
        &mut self,
        name: &str,
        source: &Path,
        derived: &Path,
        verification: &Verification,
    ) {
        let Some(dir) = self.config.paths.manifests.clone() else {
            return;
        };
        let prefix = if verification.verdict.is_match() {
            ""
        } else {
            "failed_"
        };

        // Earlier attempts keep their manifests; later ones get numbered names.
        for (asset, manifest) in [
            (source, &verification.source_manifest),
            (derived, &verification.derived_manifest),
        ] {
            let file_name = manifest_name(prefix, asset);
            match write_numbered(&dir, &file_name, manifest.raw_text().as_bytes()) {
                Ok(path) => tracing::debug!("{}: archived {:?}", name, path),
                Err(e) => {
                    self.audit
                        .warning(name, format!("could not archive frame manifests: {}", e));
                    return;
                }
            }
        }
    }

    fn dispose_failed_derived(&mut self, name: &str, derived: &Path) {
        if !derived.exists() {
            return;
        }
        let outcome = match self.config.lifecycle.failed_derived {
            DerivedDisposition::Relocate => relocate_numbered(derived, &self.config.paths.failure)
                .map(|dest| format!("derived asset moved to {}", dest.display())),
            DerivedDisposition::Delete => {
                delete_confirmed(derived).map(|()| "derived asset deleted".to_string())
            }
        };
        match outcome {
            Ok(message) => self.audit.info(name, message),
            Err(e) => self.report(name, &Failure::Filesystem(e)),
        }
    }

    fn dispose_mismatched_source(&mut self, name: &str, source: &Path) {
        match self.config.lifecycle.on_mismatch {
            MismatchPolicy::Retry => {
                self.audit
                    .info(name, "source left in arrivals for another attempt");
            }
            MismatchPolicy::Review => match relocate_numbered(source, &self.config.paths.review) {
                Ok(dest) => self
                    .audit
                    .info(name, format!("source moved to review: {}", dest.display())),
                Err(e) => self.report(name, &Failure::Filesystem(e)),
            },
        }
    }

    /// Store the derived asset, then let go of the source. The source is only
    /// touched once the derived asset is confirmed at the success location.
    fn succeed(&mut self, name: &str, source: &Path, derived: &Path) -> LifecycleState {
        let stored = match relocate(derived, &self.config.paths.success) {
            Ok(dest) => dest,
            Err(e) => {
                self.report(name, &Failure::Filesystem(e));
                self.audit.critical(
                    name,
                    format!(
                        "success relocation unconfirmed; source {} and derived {} left in place",
                        source.display(),
                        derived.display()
                    ),
                );
                return LifecycleState::FailedRelocation;
            }
        };
        self.audit
            .info(name, format!("derived asset stored at {}", stored.display()));

        let disposed = match self.config.lifecycle.source_on_success {
            SourceDisposition::Delete => {
                delete_confirmed(source).map(|()| "source deleted".to_string())
            }
            SourceDisposition::Relocate => match self.config.paths.completed.clone() {
                Some(dir) => relocate(source, &dir)
                    .map(|dest| format!("source moved to {}", dest.display())),
                None => Err(RelocationError::Unconfirmed {
                    path: source.to_path_buf(),
                    reason: "no completed directory configured".to_string(),
                }),
            },
        };
        match disposed {
            Ok(message) => self.audit.info(name, message),
            // The derived asset is safe; the source stays for an operator.
            Err(e) => self.report(name, &Failure::Filesystem(e)),
        }
        LifecycleState::Succeeded
    }
}

fn manifest_name(prefix: &str, asset: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(prefix);
    name.push(asset.file_name().unwrap_or_default());
    name.push(".framemd5");
    PathBuf::from(name)
}

fn describe_divergences(divergent: &[framekeeper_av::Divergence]) -> String {
    let mut listed: Vec<String> = divergent
        .iter()
        .take(MAX_LOGGED_DIVERGENCES)
        .map(|d| d.to_string())
        .collect();
    if divergent.len() > MAX_LOGGED_DIVERGENCES {
        listed.push(format!(
            "and {} more",
            divergent.len() - MAX_LOGGED_DIVERGENCES
        ));
    }
    listed.join("; ")
}
