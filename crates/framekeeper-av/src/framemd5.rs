//! Frame equivalence verification.
//!
//! Both assets are decoded to per-frame digest manifests after a clamp of the
//! luma and chroma planes: codewords below [`ClampRange::low`] or above
//! [`ClampRange::high`] are forced to the bound. Lossless capture keeps the
//! out-of-range codewords a capture chain writes, while the target encoder may
//! clip them, so unclamped digests would differ for equivalent pictures.
//!
//! Manifests are compared positionally and by digest only. Header lines and
//! timing fields never participate in the comparison; timestamps are kept
//! solely to report where divergence happened.

use crate::command::ToolCommand;
use crate::{Error, Result};
use async_trait::async_trait;
use framekeeper_common::Crop;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inclusive range that sample values are clamped into before digesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampRange {
    pub low: u16,
    pub high: u16,
}

impl Default for ClampRange {
    /// 10-bit codewords 0-3 and 1020-1023 are forced into range.
    fn default() -> Self {
        Self { low: 4, high: 1019 }
    }
}

impl ClampRange {
    pub fn new(low: u16, high: u16) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidInput(format!(
                "clamp range must have low < high, got {}..={}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    /// Clamp one sample.
    ///
    /// The pipeline never calls this: ffmpeg applies the same clamp through
    /// [`lutyuv_filter`](Self::lutyuv_filter). This and
    /// [`digest_planes`](Self::digest_planes) are the in-process reference
    /// for that filter, used to pin its behaviour in tests and benchmarks.
    #[inline]
    pub fn apply(&self, value: u16) -> u16 {
        value.clamp(self.low, self.high)
    }

    /// ffmpeg `lut` expression clamping `val`, with commas escaped for a
    /// filtergraph.
    pub fn lut_expression(&self) -> String {
        format!(
            "if(gt(val\\,{high})\\,{high}\\,if(lt(val\\,{low})\\,{low}\\,val))",
            low = self.low,
            high = self.high
        )
    }

    /// `lutyuv` filter applying the clamp identically to all three planes.
    pub fn lutyuv_filter(&self) -> String {
        let expr = self.lut_expression();
        format!("lutyuv=y={expr}:u={expr}:v={expr}")
    }

    /// SHA-256 (hex) over the clamped samples of a decoded frame's planes,
    /// little-endian. Reference only; manifests come from ffmpeg's framemd5
    /// muxer.
    pub fn digest_planes(&self, planes: &[&[u16]]) -> String {
        let mut hasher = Sha256::new();
        for plane in planes {
            for &sample in plane.iter() {
                hasher.update(self.apply(sample).to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// How an asset is decoded before digesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigestOptions {
    pub clamp: ClampRange,
    /// Crop applied before the clamp, matching a crop the encode applied.
    pub crop: Option<Crop>,
}

impl DigestOptions {
    pub fn new(clamp: ClampRange) -> Self {
        Self { clamp, crop: None }
    }

    pub fn with_crop(mut self, crop: Option<Crop>) -> Self {
        self.crop = crop;
        self
    }

    /// The video filter chain for the decode.
    pub fn filter_chain(&self) -> String {
        match self.crop {
            Some(crop) => format!("crop={},{}", crop, self.clamp.lutyuv_filter()),
            None => self.clamp.lutyuv_filter(),
        }
    }
}

/// One frame's entry in a digest manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDigest {
    /// Position in the manifest, from 0.
    pub index: usize,
    pub stream: u32,
    pub pts: i64,
    /// Presentation time in seconds, when the stream's time base is known.
    pub timestamp: Option<f64>,
    pub digest: String,
}

/// Ordered per-frame digests of one asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameDigestManifest {
    pub frames: Vec<FrameDigest>,
    raw: String,
}

impl FrameDigestManifest {
    /// Parse ffmpeg `framemd5` output.
    ///
    /// `#` lines are header metadata; `#tb <stream>: <num>/<den>` lines supply
    /// time bases. Data lines are `stream, dts, pts, duration, size, hash`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut time_bases: HashMap<u32, (i64, i64)> = HashMap::new();
        let mut frames = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                if let Some((stream, tb)) = parse_time_base(header) {
                    time_bases.insert(stream, tb);
                }
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 4 {
                return Err(Error::parse_error(
                    "framemd5",
                    format!("line {}: expected at least 4 fields, got {:?}", line_no + 1, line),
                ));
            }

            let bad = |what: &str| {
                Error::parse_error("framemd5", format!("line {}: bad {}", line_no + 1, what))
            };
            let stream: u32 = fields[0].parse().map_err(|_| bad("stream index"))?;
            // Version 2+ manifests carry pts in the third field; older ones only dts.
            let pts_field = if fields.len() >= 6 { fields[2] } else { fields[1] };
            let pts: i64 = pts_field.parse().map_err(|_| bad("timestamp"))?;
            let digest = fields[fields.len() - 1].to_lowercase();
            if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(bad("digest"));
            }

            let timestamp = time_bases
                .get(&stream)
                .map(|&(num, den)| pts as f64 * num as f64 / den as f64);

            frames.push(FrameDigest {
                index: frames.len(),
                stream,
                pts,
                timestamp,
                digest,
            });
        }

        Ok(Self {
            frames,
            raw: text.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The manifest text as the digester produced it.
    pub fn raw_text(&self) -> &str {
        &self.raw
    }
}

fn parse_time_base(header: &str) -> Option<(u32, (i64, i64))> {
    let rest = header.trim().strip_prefix("tb")?;
    let (stream, ratio) = rest.split_once(':')?;
    let (num, den) = ratio.trim().split_once('/')?;
    let den: i64 = den.trim().parse().ok()?;
    if den == 0 {
        return None;
    }
    Some((stream.trim().parse().ok()?, (num.trim().parse().ok()?, den)))
}

/// A position at which the two manifests disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub index: usize,
    /// Source timestamp in seconds; `None` if the source has no frame here or
    /// no time base.
    pub source_timestamp: Option<f64>,
    pub derived_timestamp: Option<f64>,
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ts = |t: Option<f64>| match t {
            Some(t) => format!("{:.3}s", t),
            None => "-".to_string(),
        };
        write!(
            f,
            "frame {} (source {}, derived {})",
            self.index,
            ts(self.source_timestamp),
            ts(self.derived_timestamp)
        )
    }
}

/// Outcome of comparing two manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum VerificationVerdict {
    Match {
        frames: usize,
    },
    Mismatch {
        source_frames: usize,
        derived_frames: usize,
        /// Every divergent position, in order. Positions present in only one
        /// manifest are included.
        divergent: Vec<Divergence>,
    },
}

impl VerificationVerdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Positional, digest-only comparison.
pub fn compare_manifests(
    source: &FrameDigestManifest,
    derived: &FrameDigestManifest,
) -> VerificationVerdict {
    let longest = source.len().max(derived.len());
    let divergent: Vec<Divergence> = (0..longest)
        .filter_map(|i| {
            let s = source.frames.get(i);
            let d = derived.frames.get(i);
            match (s, d) {
                (Some(s), Some(d)) if s.digest == d.digest => None,
                _ => Some(Divergence {
                    index: i,
                    source_timestamp: s.and_then(|f| f.timestamp),
                    derived_timestamp: d.and_then(|f| f.timestamp),
                }),
            }
        })
        .collect();

    if divergent.is_empty() {
        VerificationVerdict::Match {
            frames: source.len(),
        }
    } else {
        VerificationVerdict::Mismatch {
            source_frames: source.len(),
            derived_frames: derived.len(),
            divergent,
        }
    }
}

/// Something that can produce a clamped frame digest manifest for an asset.
#[async_trait]
pub trait FrameDigester: Send + Sync {
    /// Human-readable name of this digester (e.g. "ffmpeg framemd5").
    fn name(&self) -> &'static str;

    async fn manifest(&self, path: &Path, options: &DigestOptions) -> Result<FrameDigestManifest>;
}

/// Both manifests of one verification, kept for archival.
#[derive(Debug, Clone)]
pub struct Verification {
    pub verdict: VerificationVerdict,
    pub source_manifest: FrameDigestManifest,
    pub derived_manifest: FrameDigestManifest,
}

/// Digest both assets and compare them.
///
/// An empty source manifest is refused: matching nothing against nothing would
/// certify an asset that was never decoded.
pub async fn verify(
    digester: &dyn FrameDigester,
    source: &Path,
    source_options: &DigestOptions,
    derived: &Path,
    derived_options: &DigestOptions,
) -> Result<Verification> {
    let source_manifest = digester.manifest(source, source_options).await?;
    if source_manifest.is_empty() {
        return Err(Error::parse_error(
            digester.name(),
            format!("no frames decoded from {}", source.display()),
        ));
    }
    let derived_manifest = digester.manifest(derived, derived_options).await?;
    let verdict = compare_manifests(&source_manifest, &derived_manifest);

    Ok(Verification {
        verdict,
        source_manifest,
        derived_manifest,
    })
}

/// Digester backed by ffmpeg's `framemd5` muxer.
#[derive(Debug, Clone)]
pub struct FfmpegFrameMd5 {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegFrameMd5 {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

/// The ffmpeg argument vector producing a clamped manifest on stdout.
/// Audio, subtitle and data streams are excluded.
pub fn framemd5_args(path: &Path, options: &DigestOptions) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-i".into(),
        path.to_string_lossy().into_owned(),
        "-an".into(),
        "-sn".into(),
        "-dn".into(),
        "-vf".into(),
        options.filter_chain(),
        "-f".into(),
        "framemd5".into(),
        "-".into(),
    ]
}

#[async_trait]
impl FrameDigester for FfmpegFrameMd5 {
    fn name(&self) -> &'static str {
        "ffmpeg framemd5"
    }

    async fn manifest(&self, path: &Path, options: &DigestOptions) -> Result<FrameDigestManifest> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let output = ToolCommand::new(self.program.clone())
            .args(framemd5_args(path, options))
            .timeout(self.timeout)
            .execute()
            .await?;

        let manifest = FrameDigestManifest::parse(&output.stdout)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("{} frames digested from {}", manifest.len(), path.display());

        Ok(manifest)
    }
}
