use std::cmp;
use std::error::Error;
use std::path::PathBuf;

use abbreve_rs::clipboard::SystemClipboard;
use abbreve_rs::config::DEFAULT_ORIGIN;
use abbreve_rs::form::{COPIED_LABEL, FEEDBACK_FORM_URL, ISSUE_TRACKER_URL};
use abbreve_rs::{
    BundledDictionary, LookupConfig, LookupForm, LookupSession, LookupView, SHARE_PARAM, SourceConfig,
};
use atty::Stream;
use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Url;
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "abbreve", about = "Look up slang in the Abbreve dictionary", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Origin that share links point at.
    #[arg(long, global = true, env = "ABBREVE_ORIGIN", default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// Where dictionary entries are read from.
    #[arg(long, global = true, env = "ABBREVE_SOURCE", value_enum, default_value_t = SourceKind::Bundled)]
    source: SourceKind,

    /// Directory of `<term>.json` files, for `--source dir`.
    #[arg(long, global = true, env = "ABBREVE_DICTIONARY_DIR")]
    dictionary_dir: Option<PathBuf>,

    /// Base URL serving `<term>.json` resources, for `--source http`.
    #[arg(long, global = true, env = "ABBREVE_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceKind {
    Bundled,
    Dir,
    Http,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a slang term.
    Lookup {
        /// Term to look up; several words are joined with spaces.
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Print the share link for a term.
    Share {
        term: String,
        /// Also copy the link to the system clipboard.
        #[arg(long)]
        copy: bool,
    },
    /// Open a share link (`https://…/?share=idk` or `share=idk`) and show its entry.
    Open { link: String },
    /// List terms in the bundled dictionary.
    List {
        /// Only list terms starting with this prefix.
        #[arg(long, default_value = "")]
        prefix: String,
        /// Maximum number of terms to list.
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Search line by line; `:copy` copies the share link, `:quit` exits.
    Interactive {
        /// Share link to open before reading input.
        #[arg(long)]
        link: Option<String>,
    },
    /// Serve the lookup page and dictionary resources over HTTP.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, env = "ABBREVE_ADDR", default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
    },
}

impl Cli {
    fn lookup_config(&self) -> Result<LookupConfig, Box<dyn Error>> {
        let source = match self.source {
            SourceKind::Bundled => SourceConfig::Bundled,
            SourceKind::Dir => SourceConfig::Directory(
                self.dictionary_dir
                    .clone()
                    .ok_or("`--source dir` needs --dictionary-dir")?,
            ),
            SourceKind::Http => SourceConfig::Http(
                self.base_url
                    .clone()
                    .ok_or("`--source http` needs --base-url")?,
            ),
        };
        Ok(LookupConfig {
            origin: self.origin.clone(),
            source,
            ..LookupConfig::default()
        })
    }
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.command);
    let config = cli.lookup_config()?;
    let as_json = cli.json;
    match cli.command {
        Command::Lookup { words } => handle_lookup(words.join(" "), &config, as_json).await,
        Command::Share { term, copy } => handle_share(term, copy, &config, as_json),
        Command::Open { link } => handle_open(link, &config, as_json).await,
        Command::List { prefix, limit } => handle_list(prefix, limit, as_json),
        Command::Interactive { link } => handle_interactive(link, config, as_json).await,
        #[cfg(feature = "web")]
        Command::Serve { addr } => {
            let web_config = abbreve_rs::web::WebConfig {
                addr,
                origin: config.origin,
                source: config.source,
                feedback_delay: config.feedback_delay,
            };
            abbreve_rs::web::serve(web_config).await?;
            Ok(())
        }
    }
}

fn init_tracing(command: &Command) {
    let default_level = match command {
        #[cfg(feature = "web")]
        Command::Serve { .. } => "abbreve_rs=info,abbreve=info,tower_http=info",
        _ => "abbreve_rs=warn,abbreve=warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn handle_lookup(
    term: String,
    config: &LookupConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let source = config.source.open()?;
    let mut form = LookupForm::new();
    form.edit(&term);
    form.submit(source.as_ref()).await;
    print_view(&form.view(&config.origin), as_json)
}

fn handle_share(
    term: String,
    copy: bool,
    config: &LookupConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut form = LookupForm::new();
    form.edit(&term);
    let link = form.share_link(&config.origin);
    let copied = copy
        && SystemClipboard::new()
            .and_then(|mut clipboard| form.copy_share_link(&config.origin, &mut clipboard))
            .map_err(|err| warn!(error = %err, "share link not copied"))
            .is_ok();

    if as_json {
        let payload = json!({ "term": form.term().as_str(), "share_link": link.as_str(), "copied": copied });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if copied {
        println!("{link} ({COPIED_LABEL})");
    } else {
        println!("{link}");
    }
    Ok(())
}

async fn handle_open(link: String, config: &LookupConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    let source = config.source.open()?;
    let share = share_from_link(&link)?;
    let mut form = LookupForm::new();
    if form.open(share.as_deref(), source.as_ref()).await.is_none() {
        return Err(format!("No `share` term found in {link:?}").into());
    }
    print_view(&form.view(&config.origin), as_json)
}

/// Decoded `share` value of a link given as a full URL, `?share=…` or `share=…`.
fn share_from_link(link: &str) -> Result<Option<String>, Box<dyn Error>> {
    let link = link.trim();
    let base = Url::parse(DEFAULT_ORIGIN)?;
    let url = if link.contains("://") || link.starts_with('?') {
        base.join(link)?
    } else {
        base.join(&format!("?{link}"))?
    };
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == SHARE_PARAM)
        .map(|(_, value)| value.into_owned()))
}

fn handle_list(prefix: String, limit: usize, as_json: bool) -> Result<(), Box<dyn Error>> {
    let prefix = prefix.to_lowercase();
    let limit = cmp::max(1, limit);
    let terms = BundledDictionary::prefix(&prefix, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "total": BundledDictionary::len(),
            "results": terms,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if terms.is_empty() {
        println!("No terms start with \"{prefix}\".");
        return Ok(());
    }
    let width = terms.iter().map(|term| term.len()).max().unwrap_or(4);
    for term in &terms {
        let definition = BundledDictionary::entry(term)
            .and_then(|entry| entry.definition())
            .unwrap_or("");
        println!("{term:<width$}  {definition}");
    }
    Ok(())
}

async fn handle_interactive(
    link: Option<String>,
    config: LookupConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let session = LookupSession::new(config.source.open()?, &config);
    let mut clipboard: Option<SystemClipboard> = None;

    if let Some(link) = link {
        let share = share_from_link(&link)?;
        if let Some(read) = session.arrive(share.as_deref()) {
            read.await?;
        }
        print_view(&session.view(), as_json)?;
    }
    if !as_json {
        println!("Type a slang and press Enter. `:copy` copies the share link, `:quit` exits.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" | ":q" => break,
            ":copy" => {
                if clipboard.is_none() {
                    match SystemClipboard::new() {
                        Ok(system) => clipboard = Some(system),
                        Err(err) => {
                            warn!(error = %err, "share link not copied");
                            continue;
                        }
                    }
                }
                if let Some(target) = clipboard.as_mut() {
                    if let Ok(link) = session.copy_share_link(target) {
                        println!("{COPIED_LABEL}: {link}");
                    }
                }
            }
            _ => {
                session.edit(&line);
                if !session.can_submit() {
                    println!("Already showing \"{}\"; edit the term to search again.", line.trim());
                    continue;
                }
                if let Some(read) = session.submit() {
                    read.await?;
                }
                print_view(&session.view(), as_json)?;
            }
        }
    }
    Ok(())
}

fn print_view(view: &LookupView, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }
    match view.state {
        "loaded" => {
            if let Some(definition) = &view.definition {
                render_emphasis(definition);
            }
            if let Some(alternatives) = &view.alternatives {
                println!("{alternatives}");
            }
            if let Some(link) = &view.share_link {
                println!("Share: {link}");
            }
        }
        "not_found" => {
            if let Some(message) = view.message {
                println!("{message}");
            }
            println!("1. You can help us add this by creating a github issue: {ISSUE_TRACKER_URL}");
            println!(
                "2. Or, you could fill out this feedback form and we will address the issue: {FEEDBACK_FORM_URL}"
            );
        }
        "loading" => println!("Searching…"),
        _ => {
            if let Some(message) = view.message {
                println!("{message}");
            }
        }
    }
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn render_emphasis(text: &str) {
    if stdout_is_tty() {
        let (width, _) = terminal_size();
        let skin = MadSkin::default();
        let markdown = format!("**{}**", text.trim());
        let formatted = FmtText::from(&skin, &markdown, Some(width.max(40) as usize));
        print!("{formatted}");
    } else {
        println!("{text}");
    }
}
