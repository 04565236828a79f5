mod cli;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use framewright::state::AppState;
use framewright::{coordinator, subtitles};
use fw_core::config::Config;
use fw_core::{SourceFlags, SpatialFormat, VideoId, VideoRef};
use fw_ocr::ScriptFamily;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. Respect RUST_LOG if set, otherwise use defaults
    // based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "framewright=trace,fw_media=trace,fw_pgs=trace,fw_ocr=debug,fw_av=debug,fw_db=debug"
                .to_string()
        } else {
            "framewright=debug,fw_ocr=info,fw_av=info,fw_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Refresh {
            input,
            id,
            spatial,
            replace,
        } => rt.block_on(refresh(
            &input,
            id.as_deref(),
            spatial.as_deref(),
            replace,
            cli.config.as_deref(),
        )),
        Commands::Subtitles {
            input,
            language,
            from,
            to,
            output,
        } => rt.block_on(convert_subtitles(
            &input,
            &language,
            from,
            to,
            output.as_deref(),
            cli.config.as_deref(),
        )),
        Commands::Models { all, family } => rt.block_on(download_models(
            all,
            family.as_deref(),
            cli.config.as_deref(),
        )),
        Commands::PatchInit {
            input,
            format,
            output,
        } => patch_init(&input, &format, output.as_deref()),
        Commands::CheckTools => rt.block_on(check_tools(cli.config.as_deref())),
    }
}

/// A cancellation token that fires on ctrl-c.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling");
            trigger.cancel();
        }
    });
    token
}

async fn refresh(
    input: &Path,
    id: Option<&str>,
    spatial: Option<&str>,
    replace: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }
    let state = AppState::new(config)?;

    tracing::info!("Probing {:?}", input);
    let probe = fw_av::probe::probe_video(&state.tools, input).await?;
    if probe.video_stream_count == 0 {
        anyhow::bail!("No video stream in {:?}", input);
    }

    let spatial_format = match spatial {
        Some(tag) => SpatialFormat::from_tag(tag),
        None => input
            .file_name()
            .map(|n| SpatialFormat::from_filename(&n.to_string_lossy()))
            .unwrap_or(SpatialFormat::None),
    };

    let video = VideoRef {
        id: match id {
            Some(raw) => raw.parse::<VideoId>()?,
            None => VideoId::new(),
        },
        path: input.canonicalize()?,
        spatial_format,
        width: probe.width,
        height: probe.height,
        duration: probe.duration,
        flags: SourceFlags::default(),
    };

    println!(
        "Refreshing {} ({}x{}, {:.0?}, spatial: {})",
        video.id, video.width, video.height, video.duration, video.spatial_format
    );

    let cancel = interrupt_token();
    coordinator::refresh_video(&state, &video, replace, &cancel).await?;

    let conn = fw_db::get_conn(&state.db)?;
    for row in fw_db::queries::trickplay_infos::list_for_item(&conn, video.id)? {
        println!(
            "  trickplay {}px: {} thumbnails in {} tiles, {} b/s peak",
            row.width,
            row.thumbnail_count,
            row.tile_count(),
            row.bandwidth
        );
    }
    if let Some(row) = fw_db::queries::iframe_playlists::get(&conn, video.id)? {
        println!(
            "  iframe {}x{}: {} segments, {} b/s peak",
            row.width, row.height, row.segment_count, row.bandwidth
        );
    }
    Ok(())
}

async fn convert_subtitles(
    input: &Path,
    language: &str,
    from: Option<f64>,
    to: Option<f64>,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let state = AppState::new(config)?;
    let cancel = interrupt_token();

    // Make sure the models for this language are installed first.
    if let Some(family) = ScriptFamily::from_language(language) {
        state.models.ensure(family, &cancel).await?;
    }

    let file = std::fs::File::open(input)?;
    let reader = std::io::BufReader::new(file);

    let track = match (from, to) {
        (Some(from), Some(to)) => {
            subtitles::convert_range(
                &state,
                reader,
                language,
                (Duration::from_secs_f64(from), Duration::from_secs_f64(to)),
                &cancel,
            )
            .await?
        }
        _ => subtitles::convert_full(&state, reader, language, &cancel).await?,
    };

    let srt = track.to_srt();
    match output {
        Some(path) => {
            std::fs::write(path, &srt)?;
            println!("{} events written to {:?}", track.events.len(), path);
        }
        None => print!("{srt}"),
    }
    Ok(())
}

async fn download_models(
    all: bool,
    family: Option<&str>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let state = AppState::new(config)?;
    let cancel = interrupt_token();

    match family {
        Some(name) => {
            let family = ScriptFamily::from_language(name)
                .or_else(|| {
                    ScriptFamily::ALL
                        .into_iter()
                        .find(|f| f.dir_name() == name.to_ascii_lowercase())
                })
                .ok_or_else(|| anyhow::anyhow!("Unknown script family: {name}"))?;
            state.models.ensure(family, &cancel).await?;
            println!("Models for {family} installed");
        }
        None if all => {
            state.models.ensure_all(&cancel).await?;
            println!("Models for all script families installed");
        }
        None => {
            state.models.ensure_common(&cancel).await?;
            println!("Common models (latin, cjk) installed");
        }
    }
    Ok(())
}

fn patch_init(input: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let spatial = SpatialFormat::from_tag(format);
    if spatial == SpatialFormat::None {
        anyhow::bail!("'{format}' is not a spatial format tag");
    }

    let buf = std::fs::read(input)?;
    let patched = fw_media::patch_init_segment(&buf, spatial)?;

    let dest: PathBuf = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("vexu.mp4"),
    };
    std::fs::write(&dest, &patched)?;
    println!(
        "Patched {} -> {} ({} -> {} bytes)",
        input.display(),
        dest.display(),
        buf.len(),
        patched.len()
    );
    Ok(())
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let registry = fw_av::ToolRegistry::discover(&config.tools);

    let mut all_ok = true;
    for info in registry.check_all().await {
        let status = if info.available { "ok" } else { "MISSING" };
        let version = info.version.as_deref().unwrap_or("-");
        println!("{:10} {:8} {}", info.name, status, version);
        all_ok &= info.available;
    }

    if !all_ok {
        anyhow::bail!("Some required tools are missing");
    }
    Ok(())
}
