use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use docassist::api::{ApiClient, ProgressFn};
use docassist::backend::Backend;
use docassist::chart::{self, ChartEvent, ChartPayload, ChartViewer};
use docassist::chat::ChatWindow;
use docassist::config::Config;
use docassist::files;
use docassist::mock::MockBackend;
use docassist::notify::{Level, Notifier};
use docassist::state::now_millis;
use docassist::upload::{UploadEvent, UploadPanel};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "docassist")]
#[command(about = "Upload documents, chat about them and explore charts from the terminal")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Use the built-in mock backend instead of a server
    #[arg(long, global = true)]
    mock: bool,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload up to 5 documents (directories are expanded one level)
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a single question and print the reply
    Ask {
        message: String,
    },
    /// Generate a chart from a prompt
    Chart {
        prompt: String,
    },
    /// Show or update the saved configuration
    Config {
        /// Save a new default base URL
        #[arg(long)]
        default_base_url: Option<String>,
        /// Save whether the mock backend is used by default
        #[arg(long)]
        default_mock: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}: {}", "Could not read config, using defaults".yellow(), e);
        Config::new()
    });

    match cli.command {
        None => {
            let backend = build_backend(cli.base_url.as_deref(), cli.mock, &config);
            run_tui(backend).await?
        }
        Some(Commands::Upload { ref paths }) => {
            let backend = build_backend(cli.base_url.as_deref(), cli.mock, &config);
            upload_command(&backend, paths).await?
        }
        Some(Commands::Ask { ref message }) => {
            let backend = build_backend(cli.base_url.as_deref(), cli.mock, &config);
            ask_command(&backend, message).await?
        }
        Some(Commands::Chart { ref prompt }) => {
            let backend = build_backend(cli.base_url.as_deref(), cli.mock, &config);
            chart_command(&backend, prompt).await?
        }
        Some(Commands::Config {
            default_base_url,
            default_mock,
        }) => config_command(config, default_base_url, default_mock)?,
    }

    Ok(())
}

/// Log to a file under the config dir; the TUI owns the terminal.
/// Logging is skipped if the file can't be opened.
fn init_logging(verbose: bool) {
    let Ok(dir) = Config::get_config_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("docassist.log"))
    else {
        return;
    };

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .try_init();
}

fn build_backend(base_url: Option<&str>, mock: bool, config: &Config) -> Backend {
    if config.resolve_mock(mock) {
        tracing::info!("using mock backend");
        Backend::Mock(MockBackend::new(config.mock_latency()))
    } else {
        let url = config.resolve_base_url(base_url);
        tracing::info!(%url, "using http backend");
        Backend::Http(ApiClient::new(&url))
    }
}

async fn run_tui(backend: Backend) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(backend);
    startup_notices(&mut app);
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

fn startup_notices(app: &mut App) {
    if let Backend::Mock(_) = app.backend {
        app.notifier.info("Using mock backend", Some("Responses are simulated locally.".into()));
    }
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// Print and drop every queued notification
fn print_notifications(notifier: &mut Notifier) {
    for item in notifier.active() {
        let title = match item.level {
            Level::Success => item.title.green().bold(),
            Level::Info => item.title.cyan().bold(),
            Level::Warning => item.title.yellow().bold(),
            Level::Error => item.title.red().bold(),
        };
        match &item.description {
            Some(description) => eprintln!("{} {}", title, description.dimmed()),
            None => eprintln!("{}", title),
        }
    }
    notifier.dismiss_all();
}

fn print_chart(payload: &ChartPayload) {
    println!("\n{}", "📊 Chart Visualization".bold().blue());
    match payload {
        ChartPayload::Image(url) => println!("Image: {}", url.cyan().underline()),
        ChartPayload::Series(series) if series.is_empty() => {
            println!("{}", "No chart data available".dimmed())
        }
        ChartPayload::Series(series) => {
            let keys: Vec<String> = series
                .data
                .datasets
                .iter()
                .enumerate()
                .map(|(i, ds)| chart::dataset_key(ds, i))
                .fold(Vec::new(), |mut acc, key| {
                    if !acc.contains(&key) {
                        acc.push(key);
                    }
                    acc
                });

            println!("Type: {}", series.kind.as_str().bold());
            println!(
                "{:<12}{}",
                "",
                keys.iter().map(|k| format!("{:>12}", k)).collect::<String>().bold()
            );
            for record in chart::to_records(&series.data) {
                let cells: String = keys
                    .iter()
                    .map(|k| match record.value(k) {
                        Some(v) => format!("{:>12}", v),
                        None => format!("{:>12}", "-"),
                    })
                    .collect();
                println!("{}{}", format!("{:<12}", record.name).yellow(), cells);
            }
        }
    }
}

async fn upload_command(backend: &Backend, paths: &[PathBuf]) -> Result<()> {
    let mut notifier = Notifier::default();
    let mut panel = UploadPanel::new();

    let selected = files::select_paths(paths);
    panel.add_files(selected, &mut notifier);
    print_notifications(&mut notifier);

    for file in panel.files() {
        println!(
            "  {} {} {} {}",
            file.icon(),
            file.name.bold(),
            file.type_label().dimmed(),
            format!("{} KB", file.size_kb()).dimmed()
        );
    }

    let Some(selection) = panel.begin_upload(&mut notifier) else {
        print_notifications(&mut notifier);
        bail!("no supported files to upload");
    };

    println!("⬆️  Uploading to {}", backend.display_name().bold());
    let progress: ProgressFn = Arc::new(|pct: u8| {
        eprint!("\r{} {:>3}%", "Uploading...".cyan(), pct);
    });
    let result = backend.upload_files(&selection, Some(progress)).await;
    eprintln!();

    let event = panel.finish_upload(result, &mut notifier);
    print_notifications(&mut notifier);

    match event {
        Some(UploadEvent::Completed { file_ids, .. }) => {
            for id in file_ids {
                println!("  • {}", id.green());
            }
            Ok(())
        }
        None => bail!("upload failed"),
    }
}

async fn ask_command(backend: &Backend, message: &str) -> Result<()> {
    let mut notifier = Notifier::default();
    let mut chat = ChatWindow::new();
    chat.input.set(message);

    let Some(request) = chat.submit(now_millis()) else {
        bail!("message is empty");
    };

    println!("🤖 Asking {}...\n", backend.display_name().bold().magenta());
    let result = backend.send_chat_message(&request.message, &request.history).await;
    chat.receive(result, &mut notifier);

    if !notifier.is_empty() {
        print_notifications(&mut notifier);
        bail!("chat request failed");
    }

    if let Some(reply) = chat.messages().last() {
        println!("{}", "Response:".bold().green());
        println!("{}", reply.content);
    }

    if let Some(extras) = chat.attachments() {
        if let Some(payload) = extras.chart {
            print_chart(payload);
        }
        if !extras.follow_ups.is_empty() {
            println!("\n{}", docassist::suggestions::CAPTION.bold().blue());
            for question in extras.follow_ups {
                println!("  • {}", question.text);
            }
        }
    }

    Ok(())
}

async fn chart_command(backend: &Backend, prompt: &str) -> Result<()> {
    let mut notifier = Notifier::default();
    let mut viewer = ChartViewer::new();
    viewer.prompt.set(prompt);

    let Some(prompt) = viewer.begin_regenerate(&mut notifier) else {
        print_notifications(&mut notifier);
        bail!("no chart prompt given");
    };

    let result = backend.generate_chart(&prompt, None).await;
    let event = viewer.finish_regenerate(result, &mut notifier);
    let failed = notifier.active().iter().any(|n| n.level == Level::Error);
    print_notifications(&mut notifier);

    match event {
        Some(ChartEvent::Regenerated(payload)) => {
            print_chart(&payload);
            Ok(())
        }
        None if failed => bail!("chart generation failed"),
        None => {
            println!("{}", "The backend returned no chart data".yellow());
            Ok(())
        }
    }
}

fn config_command(mut config: Config, base_url: Option<String>, mock: Option<bool>) -> Result<()> {
    let path = Config::get_config_path()?;

    if base_url.is_none() && mock.is_none() {
        println!("\n{}", "⚙️  Configuration".bold().blue());
        println!("{}", "=".repeat(30).dimmed());
        println!("File:     {}", path.display().to_string().dimmed());
        println!("Base URL: {}", config.resolve_base_url(None).green());
        println!("Mock:     {}", config.resolve_mock(false).to_string().green());
        println!("Latency:  {} ms", config.mock_latency().as_millis().to_string().green());
        return Ok(());
    }

    if let Some(url) = base_url {
        config.base_url = Some(url);
    }
    if let Some(mock) = mock {
        config.mock = Some(mock);
    }
    config.save()?;
    tracing::info!(path = %path.display(), "config saved");
    println!("{} {}", "Saved".green().bold(), path.display());
    Ok(())
}
