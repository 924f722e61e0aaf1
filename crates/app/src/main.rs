use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;
use inkfolio_application::{AppContext, load_gallery};
use inkfolio_core::{ImageSource, LayoutPreference, Settings};
use inkfolio_engine::ImageLister;
use inkfolio_server::{HttpImageSource, Server, Site};
use inkfolio_ui::{Ui, UiExit};

#[derive(Parser, Debug)]
#[command(name = "inkfolio", version, about = "Tattoo portfolio flipbook: web service and terminal viewer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the site and the gallery API
    Serve(ServeArgs),
    /// Browse the portfolio as a book in the terminal
    View(ViewArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Settings file (default: settings.json in the config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Settings file (default: settings.json in the config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Image directory or http:// address of a running service
    #[arg(long, value_name = "DIR|URL")]
    source: Option<String>,
    /// Page layout: auto, single, spread or four
    #[arg(long)]
    layout: Option<LayoutPreference>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_dirs =
        ProjectDirs::from("dev", "inkstories", "inkfolio").context("resolve project dirs")?;

    match cli.command {
        Commands::Serve(args) => {
            init_logging(None)?;
            let settings = load_settings(args.config.as_deref(), &project_dirs)?;
            serve(settings)
        }
        Commands::View(args) => {
            let data_dir = project_dirs.data_dir();
            fs::create_dir_all(data_dir)
                .with_context(|| format!("create data dir {}", data_dir.display()))?;
            init_logging(Some(&data_dir.join("inkfolio.log")))?;
            let mut settings = load_settings(args.config.as_deref(), &project_dirs)?;
            if let Some(layout) = args.layout {
                settings.layout = layout;
            }
            view(settings, args.source.as_deref())
        }
    }
}

/// Logs to stderr, or to `log_file` when the terminal belongs to the viewer.
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load_settings(config: Option<&Path>, project_dirs: &ProjectDirs) -> anyhow::Result<Settings> {
    let mut settings = match config {
        Some(path) => {
            log::info!("settings: {}", path.display());
            read_settings(path)?
        }
        None => {
            let config_dir = project_dirs.config_dir();
            fs::create_dir_all(config_dir)
                .with_context(|| format!("create config dir {}", config_dir.display()))?;
            let path = config_dir.join("settings.json");
            if path.exists() {
                log::info!("settings: {}", path.display());
                read_settings(&path)?
            } else {
                log::info!("writing default settings to {}", path.display());
                let settings = Settings::default();
                write_settings(&path, &settings)?;
                settings
            }
        }
    };
    settings.apply_port_override(std::env::var("PORT").ok().as_deref());
    settings.normalize();
    Ok(settings)
}

fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn write_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(settings).context("encode settings")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))
}

fn serve(settings: Settings) -> anyhow::Result<()> {
    let lister = ImageLister::new(settings.images_path(), settings.public_prefix.clone());
    log::info!(
        "site root {}, gallery {} at {}",
        settings.site_root,
        lister.dir().display(),
        lister.public_prefix()
    );
    let site = Site::new(&settings.site_root, lister);
    let server = Server::bind(("0.0.0.0", settings.port), site)?;
    server.run()
}

fn open_source(spec: Option<&str>, settings: &Settings) -> anyhow::Result<Box<dyn ImageSource>> {
    match spec {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(Box::new(HttpImageSource::parse(url)?))
        }
        Some(dir) => Ok(Box::new(ImageLister::new(dir, settings.public_prefix.clone()))),
        None => Ok(Box::new(ImageLister::new(
            settings.images_path(),
            settings.public_prefix.clone(),
        ))),
    }
}

fn view(settings: Settings, source: Option<&str>) -> anyhow::Result<()> {
    let source = open_source(source, &settings)?;
    log::info!("viewing gallery from {}", source.describe());
    let gallery = load_gallery(source.as_ref(), &settings.fallback_gallery);
    let mut ctx = AppContext::new(settings).with_gallery(source.describe(), gallery);

    loop {
        let mut ui = Ui::new(ctx, source.as_ref());
        let outcome = ui.run()?;
        ctx = outcome.ctx;

        match outcome.exit {
            UiExit::Quit => break,
            UiExit::Reload => {
                log::info!("reloading gallery from {}", source.describe());
                let gallery = load_gallery(source.as_ref(), &ctx.settings.fallback_gallery);
                ctx = ctx.with_gallery(source.describe(), gallery);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_view_options() {
        let cli = Cli::try_parse_from([
            "inkfolio",
            "view",
            "--source",
            "http://localhost:3000",
            "--layout",
            "four",
        ])
        .unwrap();
        let Commands::View(args) = cli.command else {
            panic!("expected view");
        };
        assert_eq!(args.source.as_deref(), Some("http://localhost:3000"));
        assert_eq!(args.layout, Some(LayoutPreference::Four));
    }

    #[test]
    fn cli_rejects_unknown_layout() {
        assert!(Cli::try_parse_from(["inkfolio", "view", "--layout", "triple"]).is_err());
    }

    #[test]
    fn settings_file_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"port": 8080, "flip_ms": 500}"#).unwrap();
        let settings = read_settings(&path).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.flip_ms, 500);
        assert_eq!(settings.dwell_ms, 1000);
    }

    #[test]
    fn explicit_config_is_read_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inkfolio.json");
        fs::write(&path, r#"{"flip_ms": 0, "swipe_threshold": 0}"#).unwrap();
        let project_dirs = ProjectDirs::from("dev", "inkstories", "inkfolio").unwrap();
        let settings = load_settings(Some(&path), &project_dirs).unwrap();
        assert_eq!(settings.flip_ms, 1);
        assert_eq!(settings.swipe_threshold, 1);
    }

    #[test]
    fn settings_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.images_dir = "gallery".to_string();
        write_settings(&path, &settings).unwrap();
        assert_eq!(read_settings(&path).unwrap().images_dir, "gallery");
    }

    #[test]
    fn sources_pick_http_or_directory() {
        let settings = Settings::default();
        let remote = open_source(Some("http://127.0.0.1:3000"), &settings).unwrap();
        assert_eq!(remote.describe(), "http://127.0.0.1:3000");
        let local = open_source(Some("photos"), &settings).unwrap();
        assert!(local.describe().contains("photos"));
        assert!(open_source(Some("https://example.com"), &settings).is_err());
    }
}
