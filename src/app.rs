use std::future::Future;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::backend::{BackendError, HttpBackend, HttpOptions, SearchBackend};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::navigation::{MemoryHistory, NavigationAdapter, NavigationSnapshot};
use crate::output::{self, OutputFormat};
use crate::query::Category;
use crate::session::{SearchSession, SessionOptions, DEFAULT_RESULTS_PER_PAGE};

fn print_banner() {
    const BANNER: &str = r#"
    ____                 __                            __
   / __/___ ___________ / /_ ________  ____ ___________/ /_
  / /_/ __ `/ ___/ _ \/ __/ ___/ _ \/ __ `/ ___/ ___/ __ \
 / __/ /_/ / /__/  __/ /_(__  )  __/ /_/ / /  / /__/ / / /
/_/  \__,_/\___/\___/\__/____/\___/\__,_/_/   \___/_/ /_/
           faceted search session client
    "#;
    println!("{}", BANNER);
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    verbose: u8,
    http: HttpOptions,
    results_per_page: u32,
    location: String,
    tags: Vec<String>,
    interactive: bool,
    no_color: bool,
    force_color: bool,
    output: Option<String>,
    output_format: OutputFormat,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let defaults = HttpOptions::default();
    let query_url = args.query_url.or(cfg.query_url).unwrap_or(defaults.query_url);
    reqwest::Url::parse(&query_url).map_err(|e| format!("invalid query_url '{query_url}': {e}"))?;
    let app_url = args.app_url.or(cfg.app_url);
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(defaults.timeout_seconds);
    let proxy = args.proxy.or(cfg.proxy);
    let header = args.header.or(cfg.header);
    if let Some(raw) = header.as_deref() {
        crate::backend::parse_header(raw).map_err(|e| e.to_string())?;
    }

    let results_per_page = args
        .size
        .or(cfg.results_per_page)
        .unwrap_or(DEFAULT_RESULTS_PER_PAGE);
    if results_per_page == 0 {
        return Err("invalid results_per_page, expected positive integer".to_string());
    }

    let location = match args.location {
        Some(location) => location,
        None => NavigationSnapshot {
            query: args.query.unwrap_or_default(),
            filter: args.filter.filter(|f| !f.trim().is_empty()),
            page: args.page,
        }
        .to_location(),
    };

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text or json"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        verbose: args.verbose,
        http: HttpOptions {
            query_url,
            app_url,
            timeout_seconds: timeout,
            proxy,
            header,
        },
        results_per_page,
        location,
        tags: args.tag,
        interactive: args.interactive || cfg.interactive.unwrap_or(false),
        no_color,
        force_color: args.color,
        output,
        output_format,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Search(String),
    Filter(Option<String>),
    Tag(String),
    Next,
    Prev,
    Back,
    Forward,
    Claim(String),
    Show,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("'{word}' expects {what}"))
            } else {
                Ok(rest.to_string())
            }
        };
        match word.to_lowercase().as_str() {
            "q" | "search" => Ok(Command::Search(rest.to_string())),
            "f" | "filter" => Ok(Command::Filter(
                Some(rest.to_string()).filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("total")),
            )),
            "t" | "tag" => required("a tag name").map(Command::Tag),
            "n" | "next" => Ok(Command::Next),
            "p" | "prev" => Ok(Command::Prev),
            "b" | "back" => Ok(Command::Back),
            "forward" => Ok(Command::Forward),
            "claim" => required("a result id").map(Command::Claim),
            "" | "s" | "show" => Ok(Command::Show),
            "h" | "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  q <text>        search for text (resets to page 1)");
    println!("  f [alias]       filter by category alias, no alias for Total");
    println!("  t <tag>         narrow the query by a tag");
    println!("  n / p           next / previous page");
    println!("  back / forward  move through history");
    println!("  claim <id>      claim a result");
    println!("  show            print the current page");
    println!("  quit            leave the session");
}

fn init_tracing(verbose: u8) {
    let directive = match verbose {
        0 => "facetsearch=error",
        1 => "facetsearch=debug",
        _ => "facetsearch=trace,reqwest=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn with_spinner<F, T>(label: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

fn print_page<B, N>(session: &mut SearchSession<B, N>, format: OutputFormat)
where
    B: SearchBackend,
    N: NavigationAdapter,
{
    if session.take_scroll_request() {
        println!("{}", "-".repeat(60).dimmed());
    }
    if let Some(message) = session.status().current() {
        println!("{}", message.render());
    }
    let view = session.view();
    let record = output::build_record(session.state(), &view);
    let rendered = output::render(&record, format);
    print!("{}", String::from_utf8_lossy(&rendered));
}

async fn run_command<B>(
    session: &mut SearchSession<B, MemoryHistory>,
    command: Command,
) -> Result<(), BackendError>
where
    B: SearchBackend,
{
    match command {
        Command::Search(text) => {
            session.set_query(text);
            with_spinner("searching", session.submit()).await
        }
        Command::Filter(alias) => {
            let category = match alias {
                Some(alias) => session
                    .state()
                    .category_by_alias(&alias)
                    .cloned()
                    .unwrap_or_else(|| Category::from_filter_alias(&alias)),
                None => Category::total(0),
            };
            with_spinner("searching", session.filter_by(category)).await
        }
        Command::Tag(tag) => with_spinner("searching", session.add_tag(tag)).await,
        Command::Next => with_spinner("searching", session.next_page()).await,
        Command::Prev => with_spinner("searching", session.prev_page()).await,
        Command::Back => {
            if !session.navigation_mut().back() {
                println!(":: no earlier entry");
            }
            Ok(())
        }
        Command::Forward => {
            if !session.navigation_mut().forward() {
                println!(":: no later entry");
            }
            Ok(())
        }
        Command::Claim(id) => {
            let url = with_spinner("claiming", session.claim(&id)).await?;
            format_kv_line("Redirect", &url);
            Ok(())
        }
        Command::Show | Command::Help | Command::Quit => Ok(()),
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.force_color {
        colored::control::set_override(true);
    } else if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    format_kv_line("Endpoint", &run.http.query_url);
    format_kv_line("Location", &run.location);
    format_kv_line("Page size", &run.results_per_page.to_string());
    format_kv_line("Interactive", format_bool(run.interactive));
    println!();

    let backend = HttpBackend::new(&run.http).map_err(|e| e.to_string())?;
    let (nav_tx, mut nav_rx) = mpsc::unbounded_channel();
    let mut history = MemoryHistory::new();
    history.on_change(nav_tx);

    let options = SessionOptions {
        results_per_page: run.results_per_page,
    };
    let mut session = SearchSession::new(options, backend, history);

    let _ = with_spinner("searching", session.load_initial(&run.location)).await;
    for tag in run.tags.iter() {
        let _ = with_spinner("searching", session.add_tag(tag.as_str())).await;
    }
    print_page(&mut session, run.output_format);

    if run.interactive {
        print_help();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                biased;
                Some(event) = nav_rx.recv() => {
                    match with_spinner("searching", session.handle_navigation_change()).await {
                        Ok(false) => {}
                        _ => {
                            format_kv_line("Location", &event.location);
                            print_page(&mut session, run.output_format);
                        }
                    }
                }
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => return Err(format!("failed to read stdin: {e}")),
                    };
                    let command = match Command::parse(&line) {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{}", e.yellow());
                            continue;
                        }
                    };
                    match command {
                        Command::Quit => break,
                        Command::Help => print_help(),
                        Command::Back | Command::Forward => {
                            let _ = run_command(&mut session, command).await;
                        }
                        other => {
                            let _ = run_command(&mut session, other).await;
                            print_page(&mut session, run.output_format);
                        }
                    }
                }
            }
        }
    }

    if let Some(path) = run.output.as_deref() {
        let view = session.view();
        let record = output::build_record(session.state(), &view);
        tokio::fs::write(path, output::render(&record, run.output_format))
            .await
            .map_err(|e| format!("failed to write output file '{path}': {e}"))?;
        format_kv_line("Saved", path);
    }

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => {
                config::ensure_default_config_file(&path)?;
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
