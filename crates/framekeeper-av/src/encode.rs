//! Transcode execution.
//!
//! [`FfmpegEncoder`] renders [`EncodeParameters`] into a single ffmpeg
//! invocation. It never overwrites: the output path is claimed with an
//! exclusive create before ffmpeg starts, ffmpeg writes a staging file beside
//! it with `-n`, and the staging file replaces only our own claim.

use crate::command::ToolCommand;
use crate::{Error, Result};
use async_trait::async_trait;
use framekeeper_common::EncodeParameters;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Something that can produce a derived asset from a source asset.
#[async_trait]
pub trait EncodingEngine: Send + Sync {
    /// Human-readable name of this engine (e.g. "ffmpeg").
    fn name(&self) -> &'static str;

    /// Encode `input` into `output` as described by `params`.
    ///
    /// On success `output` exists and is non-empty. On failure no partial
    /// output is left at `output`.
    async fn encode(&self, input: &Path, params: &EncodeParameters, output: &Path) -> Result<()>;
}

/// Encoding engine backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

/// Claim `output` by creating it exclusively. Only the creator may replace or
/// remove it afterwards.
fn reserve(output: &Path) -> Result<()> {
    match OpenOptions::new().write(true).create_new(true).open(output) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::OutputExists {
            path: output.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Where ffmpeg writes while `output` is reserved.
fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// The ffmpeg argument vector for one encode.
pub fn encode_args(input: &Path, params: &EncodeParameters, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-map".into(),
        "0".into(),
    ];

    if params.drop_data_streams {
        args.push("-dn".into());
    }

    if !params.container_flags.is_empty() {
        args.push("-movflags".into());
        args.push(
            params
                .container_flags
                .iter()
                .map(|flag| format!("+{}", flag.trim_start_matches('+')))
                .collect(),
        );
    }

    args.push("-c:v".into());
    args.push(params.video_codec.clone());
    args.extend(params.codec_options.iter().cloned());

    if let Some(ref colour) = params.colour {
        args.extend([
            "-color_primaries".to_string(),
            colour.primaries.ffmpeg_name().to_string(),
            "-color_trc".to_string(),
            colour.transfer.clone(),
            "-colorspace".to_string(),
            colour.matrix.ffmpeg_name().to_string(),
            "-color_range".to_string(),
            if colour.limited_range { "tv" } else { "pc" }.to_string(),
        ]);
    }

    if let Some(ref tag) = params.encoder_tag {
        args.push("-metadata:s:v:0".into());
        args.push(format!("encoder={}", tag));
    }

    let filters = params.video_filters();
    if !filters.is_empty() {
        args.push("-vf".into());
        args.push(filters.join(","));
    }

    // Audio is carried across untouched; it takes no part in verification.
    args.push("-c:a".into());
    args.push("copy".into());

    args.push("-f".into());
    args.push(params.container.ffmpeg_format().into());
    args.push("-n".into());
    args.push(output.to_string_lossy().into_owned());

    args
}

#[async_trait]
impl EncodingEngine for FfmpegEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn encode(&self, input: &Path, params: &EncodeParameters, output: &Path) -> Result<()> {
        if !input.exists() {
            return Err(Error::file_not_found(input));
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        reserve(output)?;

        // Holding the reservation makes any staging file a leftover of ours.
        let staging = staging_path(output);
        if staging.exists() {
            if let Err(e) = std::fs::remove_file(&staging) {
                let _ = std::fs::remove_file(output);
                return Err(e.into());
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Encoding {} -> {} with preset '{}'",
            input.display(),
            output.display(),
            params.preset
        );

        let outcome = ToolCommand::new(self.program.clone())
            .args(encode_args(input, params, &staging))
            .timeout(self.timeout)
            .execute()
            .await
            .and_then(|_| match std::fs::metadata(&staging) {
                Ok(meta) if meta.len() > 0 => Ok(()),
                _ => Err(Error::MissingOutput {
                    path: output.to_path_buf(),
                }),
            })
            .and_then(|()| std::fs::rename(&staging, output).map_err(Error::from));

        if let Err(e) = outcome {
            for path in [staging.as_path(), output] {
                if !path.exists() {
                    continue;
                }
                if let Err(_cleanup) = std::fs::remove_file(path) {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        "Could not remove partial output {}: {}",
                        path.display(),
                        _cleanup
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }
}
