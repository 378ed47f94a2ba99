use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use flicker_core::{
    init_logging, AppDirs, Config, ExternalAudioStream, Playlist, ProviderDescriptor,
    SubtitlesStream,
};
use flicker_plugin::{LoadReport, LoadedProvider, ProviderHandler, Session};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "flicker", version, about = "Media session provider host")]
struct Cli {
    /// Keep config and logs under this directory instead of the per-user ones
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List built-in providers, their capabilities and anything that was skipped
    Providers,
    /// Open an input and run it through the whole session lifecycle
    Open(OpenCommand),
}

#[derive(Debug, Parser, Clone)]
struct OpenCommand {
    /// File, directory or file:// URL to open
    input: String,
    /// Playlist item to open instead of the suggested one
    #[arg(long)]
    item: Option<usize>,
    /// Subtitles file to open alongside the item
    #[arg(long)]
    subtitles: Option<String>,
    /// Print the session as JSON
    #[arg(long)]
    json: bool,
}

/// What one `open` run produced.
#[derive(Debug, Serialize)]
struct SessionReport {
    provider: String,
    selected: Option<usize>,
    scraped: usize,
    external_audio: Option<ExternalAudioStream>,
    subtitles: Option<SubtitlesStream>,
    playlist: Playlist,
}

fn builtin_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        filesystem_provider::descriptor(),
        filesystem_provider::subtitles_descriptor(),
        stream_selector::descriptor(),
    ]
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = match &cli.root {
        Some(root) => AppDirs::rooted_at(root),
        None => AppDirs::discover()?,
    };
    let config = Config::load_or_default(&dirs)?;
    let mut logging = config.logging.clone();
    if matches!(&cli.command, Command::Open(open) if open.json) {
        logging.stdout = false;
    }
    let _logging = init_logging(&logging, &dirs)?;

    let mut handler = ProviderHandler::new(&builtin_descriptors(), &config.plugins);
    let result = match &cli.command {
        Command::Providers => {
            print_providers(handler.providers(), handler.load_report());
            Ok(())
        }
        Command::Open(open) => run_session(&mut handler, open).and_then(|report| {
            if open.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_session(&report);
            }
            Ok(())
        }),
    };

    let teardown = handler.teardown();
    if !teardown.failures.is_empty() {
        tracing::warn!(
            handler = handler.id(),
            failed = teardown.failures.len(),
            attempted = teardown.attempted,
            "some providers failed to release"
        );
    }

    result
}

fn run_session(handler: &mut ProviderHandler, open: &OpenCommand) -> Result<SessionReport> {
    let mut session = Session::new();

    handler.on_initializing(&mut session);
    handler.on_initialized(&mut session);
    handler.playlist_mut().set_input(open.input.clone());
    let opened = handler.open(&mut session)?;
    handler.on_playlist_completed();

    let index = match open.item {
        Some(index) => index,
        None => handler.suggest_item().unwrap_or(0),
    };
    let items = handler.playlist().len();
    handler
        .playlist_mut()
        .select_index(index)
        .ok_or_else(|| anyhow!("item {index} is out of range, the playlist has {items} items"))?;

    handler.on_initializing_switch();
    handler.open_item(&session)?;
    handler.on_initialized_switch();

    let external_audio = handler.suggest_external_audio();
    let subtitles = open
        .subtitles
        .as_deref()
        .map(|url| handler.open_subtitles(&mut session, url))
        .transpose()?;
    let scraped = handler.scrape_playlist()?;

    tracing::info!(
        handler = handler.id(),
        provider = %opened.provider,
        items = opened.items,
        selected = index,
        "session ready"
    );
    Ok(SessionReport {
        provider: opened.provider,
        selected: handler.playlist().selected_index(),
        scraped,
        external_audio,
        subtitles,
        playlist: handler.playlist().clone(),
    })
}

fn print_providers(providers: &[LoadedProvider], report: &LoadReport) {
    if providers.is_empty() {
        println!("No providers loaded.");
    }

    for provider in providers {
        println!("Provider: {} {}", provider.name(), provider.version());
        println!("  implementation: {}", provider.implementation());
        let kinds = provider.capabilities().kinds();
        if kinds.is_empty() {
            println!("  capabilities: (none)");
        } else {
            for kind in kinds {
                println!("  - {kind}");
            }
        }
    }

    for skipped in &report.skipped {
        println!("Skipped: {} ({skipped})", skipped.provider_name());
    }
}

fn print_session(report: &SessionReport) {
    println!(
        "Opened by '{}': {} item(s), {} scraped",
        report.provider,
        report.playlist.len(),
        report.scraped
    );
    for item in report.playlist.items() {
        let marker = if Some(item.index) == report.selected {
            "*"
        } else {
            " "
        };
        let by = item
            .artist
            .as_deref()
            .map(|artist| format!(" - {artist}"))
            .unwrap_or_default();
        println!("{marker} [{}] {}{by}", item.index, item.title);
    }
    if let Some(audio) = &report.external_audio {
        println!("External audio: {}", audio.url);
    }
    if let Some(subtitles) = &report.subtitles {
        println!("Subtitles: {} ({})", subtitles.url, subtitles.format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use flicker_core::PluginsConfig;
    use flicker_plugin::{CapabilityKind, DispatchError};
    use std::fs;
    use tempfile::tempdir;

    fn handler() -> ProviderHandler {
        ProviderHandler::new(&builtin_descriptors(), &PluginsConfig::default())
    }

    fn open_command(input: &str) -> OpenCommand {
        OpenCommand {
            input: input.to_string(),
            item: None,
            subtitles: None,
            json: false,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn open_parses_flags() {
        let cli = Cli::parse_from(["flicker", "open", "/media", "--item", "2", "--json"]);
        match cli.command {
            Command::Open(open) => {
                assert_eq!(open.input, "/media");
                assert_eq!(open.item, Some(2));
                assert!(open.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn builtins_cover_open_and_suggestions() {
        let handler = handler();
        assert!(handler.load_report().is_clean());
        assert_eq!(
            handler.index().names(CapabilityKind::Open),
            vec!["filesystem"]
        );
        assert_eq!(
            handler.index().names(CapabilityKind::OpenSubtitles),
            vec!["sidecar-subtitles"]
        );
        assert_eq!(
            handler.index().names(CapabilityKind::SuggestVideoStream),
            vec!["preferred-stream"]
        );
    }

    #[test]
    fn session_opens_the_requested_item() {
        let dir = tempdir().unwrap();
        for name in ["ep1.mkv", "ep2.mkv", "ep2.en.srt"] {
            fs::write(dir.path().join(name), b"fake").unwrap();
        }
        let mut handler = handler();
        let mut open = open_command(&dir.path().to_string_lossy());
        open.item = Some(1);
        open.subtitles = Some(dir.path().join("ep2.en.srt").to_string_lossy().to_string());

        let report = run_session(&mut handler, &open).unwrap();
        assert_eq!(report.provider, "filesystem");
        assert_eq!(report.selected, Some(1));
        assert_eq!(report.scraped, 2);
        assert_eq!(report.subtitles.unwrap().language.as_deref(), Some("en"));

        let json = serde_json::to_value(&report.playlist).unwrap();
        assert_eq!(json["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn out_of_range_item_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("only.mp3"), b"fake").unwrap();
        let mut handler = handler();
        let mut open = open_command(&dir.path().to_string_lossy());
        open.item = Some(5);

        let err = run_session(&mut handler, &open).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn unknown_inputs_have_no_provider() {
        let mut handler = handler();
        let err = run_session(&mut handler, &open_command("https://example.com/live"))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DispatchError>(),
            Some(&DispatchError::NoProvider)
        );
    }
}
