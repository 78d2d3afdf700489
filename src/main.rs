mod cli;

use framekeeper::{
    audit::AuditLog,
    config::{self, Config},
    control,
    lifecycle::{Collaborators, Coordinator, TerminalState},
    resolver,
};
use framekeeper_av::{
    check_conformance, encode::encode_args, probe_profile, verify, ClampRange, ConformanceVerdict,
    DigestOptions, FfmpegFrameMd5, MediaConchValidator, MediaInfoInspector, ToolRegistry,
    VerificationVerdict,
};
use framekeeper_common::{paths, CodecFamily};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "framekeeper=trace,framekeeper_av=debug,framekeeper_common=debug".to_string()
        } else {
            "framekeeper=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process { input } => {
            let code = runtime()?.block_on(process(&input, config_path))?;
            std::process::exit(code);
        }
        Commands::Probe { file, json } => runtime()?.block_on(probe_file(&file, json, config_path)),
        Commands::Resolve { file, codec } => {
            runtime()?.block_on(resolve_file(&file, codec, config_path))
        }
        Commands::Verify { source, derived } => {
            runtime()?.block_on(verify_files(&source, &derived, config_path))
        }
        Commands::Check { file, policy } => {
            runtime()?.block_on(check_file(&file, policy, config_path))
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate { config: file } => {
            let path = file.or_else(|| cli.config.clone());
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("framekeeper {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn registry(config: &Config) -> ToolRegistry {
    ToolRegistry::discover(&config.tools)
}

async fn process(input: &Path, config_path: Option<&Path>) -> Result<i32> {
    let config = config::load_config_or_default(config_path)?;
    config::validate_config(&config)?;

    if let Some(ref gate) = config.control {
        if !control::run_permitted(gate)? {
            tracing::info!(
                "Processing disabled by '{}' in {:?}; leaving {:?} untouched",
                gate.key,
                gate.file,
                input
            );
            return Ok(TerminalState::Skipped.exit_code());
        }
    }

    let tools = Collaborators::from_registry(&registry(&config), &config.tools);
    let audit = match config.paths.audit_log {
        Some(ref path) => AuditLog::to_file(path),
        None => AuditLog::in_memory(),
    };

    let mut coordinator = Coordinator::new(Arc::new(config), tools, audit);
    let terminal = coordinator.process_asset(input).await;

    println!("{}: {}", input.display(), terminal);
    Ok(terminal.exit_code())
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let config = config::load_config_or_default(config_path)?;
    let inspector = MediaInfoInspector::new(
        registry(&config).require("mediainfo")?.to_path_buf(),
        config.tools.probe_timeout,
    );

    let profile = probe_profile(&inspector, file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("File: {}", file.display());
        println!("Height: {}", profile.height);
        println!("Aspect ratio: {}", profile.aspect_ratio);
        println!("Field order: {}", profile.field_order);
        println!("Frame rate: {}", profile.frame_rate);
        println!("Colour primaries: {}", profile.colour_primaries);
        println!("Matrix coefficients: {}", profile.matrix_coefficients);

        let unknown = profile.unknown_fields();
        if !unknown.is_empty() {
            println!("\nUnrecognised: {}", unknown.join(", "));
        }
    }

    Ok(())
}

async fn resolve_file(
    file: &Path,
    codec: Option<CodecFamily>,
    config_path: Option<&Path>,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let config = config::load_config_or_default(config_path)?;
    let family = codec.unwrap_or(config.target.codec);
    let inspector = MediaInfoInspector::new(
        registry(&config).require("mediainfo")?.to_path_buf(),
        config.tools.probe_timeout,
    );

    let profile = probe_profile(&inspector, file).await?;
    println!("Profile: {}", profile.summary());

    let params = resolver::resolve(&profile, family)?;
    let output = paths::derived_path(
        file,
        &config.paths.transcode,
        &config.target.derived_suffix,
        params.container,
    )?;

    println!("Preset: {} ({})", params.preset, family);
    println!("Output: {}", output.display());
    println!("\nffmpeg {}", encode_args(file, &params, &output).join(" "));

    Ok(())
}

async fn verify_files(source: &Path, derived: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let clamp = ClampRange::new(config.verify.clamp_low, config.verify.clamp_high)?;
    let digester = FfmpegFrameMd5::new(
        registry(&config).require("ffmpeg")?.to_path_buf(),
        config.tools.digest_timeout,
    );
    let options = DigestOptions::new(clamp);

    let verification = verify(&digester, source, &options, derived, &options).await?;

    match verification.verdict {
        VerificationVerdict::Match { frames } => {
            println!("✓ Frames match ({} frames)", frames);
            Ok(())
        }
        VerificationVerdict::Mismatch {
            source_frames,
            derived_frames,
            divergent,
        } => {
            println!(
                "✗ Frames differ: source {} frames, derived {} frames",
                source_frames, derived_frames
            );
            for d in divergent.iter().take(20) {
                println!("  {}", d);
            }
            if divergent.len() > 20 {
                println!("  ... and {} more", divergent.len() - 20);
            }
            anyhow::bail!("{} divergent frame positions", divergent.len())
        }
    }
}

async fn check_file(
    file: &Path,
    policies: Vec<std::path::PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let policies = if policies.is_empty() {
        config.policy.documents.clone()
    } else {
        policies
    };
    if policies.is_empty() {
        anyhow::bail!("No policy documents given or configured");
    }

    let validator = MediaConchValidator::new(
        registry(&config).require("mediaconch")?.to_path_buf(),
        config.tools.validate_timeout,
    );

    match check_conformance(&validator, file, &policies).await {
        ConformanceVerdict::Pass => {
            println!("✓ {} conforms", file.display());
            Ok(())
        }
        ConformanceVerdict::Fail { diagnostics } => {
            println!("{}", diagnostics);
            anyhow::bail!("{} does not conform", file.display())
        }
        ConformanceVerdict::Indeterminate { reason } => {
            anyhow::bail!("No conformance verdict for {}: {}", file.display(), reason)
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = registry(&config).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg, mediainfo and mediaconch are all required.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Target codec: {}", config.target.codec);
            println!("  Arrivals: {}", config.paths.arrivals.display());
            println!("  Success: {}", config.paths.success.display());
            println!("  Policies: {}", config.policy.documents.len());
            println!(
                "  Stale derived: {:?}, on mismatch: {:?}",
                config.lifecycle.stale_derived, config.lifecycle.on_mismatch
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Target codec: {}", config.target.codec);
            println!("  Arrivals: {}", config.paths.arrivals.display());
        }
    }

    Ok(())
}
