use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use finsight::api::ApiClient;
use finsight::marker::{self, Segment};
use finsight::models::{Citation, Role};
use finsight::{AppConfig, SessionController};

#[derive(Parser, Debug)]
#[command(name = "finsight")]
#[command(about = "Chat with a financial PDF through the FinSight backend")]
struct Cli {
    /// Backend API base URL; overrides FINSIGHT_API_BASE.
    #[arg(long)]
    api_base: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let api_base = cli.api_base.unwrap_or(config.api_base);

    let api = ApiClient::new(api_base.clone());
    print_health(&api).await;

    let mut session = SessionController::new(api);

    println!("FinSight terminal client, backend at {api_base}");
    println!("Upload a PDF with /upload <path>, then ask questions. /help lists commands.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let (command, arg) = match rest.split_once(' ') {
                Some((command, arg)) => (command, arg.trim()),
                None => (rest, ""),
            };
            match command {
                "upload" => upload(&mut session, arg).await,
                "open" => open_chunk(&mut session, arg).await,
                "recent" => show_recent(&session),
                "doc" => show_document(&session),
                "log" => show_log(&session),
                "reset" => reset(&mut session).await,
                "help" => show_help(),
                "quit" | "exit" => break,
                other => println!("unknown command /{other}; /help lists commands"),
            }
        } else {
            ask(&mut session, line).await;
        }
    }

    Ok(())
}

async fn print_health(api: &ApiClient) {
    match api.health().await {
        Ok(health) => {
            let generation = if health.groq_available {
                "answer generation available"
            } else {
                "answer generation unavailable"
            };
            println!("backend {}, {}", health.status, generation);
        }
        Err(err) => {
            println!("backend unreachable: {err}");
            println!("start the FinSight backend, or point --api-base at a running one");
        }
    }
}

async fn upload(session: &mut SessionController, path_arg: &str) {
    if path_arg.is_empty() {
        println!("usage: /upload <path-to-pdf>");
        return;
    }

    let path = Path::new(path_arg);
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        println!("only .pdf files are supported");
        return;
    }
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        println!("invalid path {path_arg}");
        return;
    };

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("could not read {path_arg}: {err}");
            return;
        }
    };

    println!("uploading {filename}...");
    match session.upload(filename, bytes).await {
        Ok(Some(document)) => println!(
            "indexed {}: {} pages, {} chunks",
            document.name, document.page_count, document.chunk_count
        ),
        Ok(None) => {}
        Err(err) => println!("error: {err}"),
    }
}

async fn ask(session: &mut SessionController, question: &str) {
    match session.ask(question).await {
        Ok(Some(message)) => {
            println!();
            println!("{}", render_answer(&message.content));
            if let Some(citations) = &message.citations {
                println!("sources: {}", format_citation_list(citations));
            }
            println!();
        }
        Ok(None) => {}
        Err(err) => println!("error: {err}"),
    }
}

async fn open_chunk(session: &mut SessionController, arg: &str) {
    let Ok(chunk_id) = arg.parse::<u32>() else {
        println!("usage: /open <chunk-id>");
        return;
    };

    match session.open_citation(chunk_id).await {
        Ok(chunk) => {
            println!();
            println!("chunk {} (page {}):", chunk.chunk_id, chunk.page);
            println!("{}", chunk.text);
            println!();
        }
        Err(err) => println!("error: {err}"),
    }
    session.dismiss_chunk();
}

fn show_recent(session: &SessionController) {
    let entries = session.recent();
    if entries.is_empty() {
        println!("no recent citations yet");
        return;
    }
    for entry in entries {
        println!(
            "[page {}, chunk {}] {}",
            entry.citation.page, entry.citation.chunk_id, entry.snippet
        );
    }
}

fn show_log(session: &SessionController) {
    let messages = session.messages();
    if messages.is_empty() {
        println!("no messages yet");
        return;
    }
    for message in messages {
        match message.role {
            Role::User => println!("{}: {}", message.role.as_str(), message.content),
            Role::Assistant => {
                println!("{}: {}", message.role.as_str(), render_answer(&message.content))
            }
        }
    }
}

fn show_document(session: &SessionController) {
    match session.document() {
        Some(document) => println!(
            "{}: {} pages, {} chunks, uploaded {}",
            document.name,
            document.page_count,
            document.chunk_count,
            document.uploaded_at.format("%b %-d, %Y")
        ),
        None => println!("no document uploaded; use /upload <path>"),
    }
}

async fn reset(session: &mut SessionController) {
    match session.reset().await {
        Ok(()) => println!("session cleared; upload a new PDF to continue"),
        Err(err) => println!("error: {err}"),
    }
}

fn show_help() {
    println!("  /upload <path>    upload a PDF and index it");
    println!("  /open <chunk-id>  show the full text behind a citation");
    println!("  /recent           recently cited chunks");
    println!("  /doc              current document");
    println!("  /log              conversation so far");
    println!("  /reset            clear the conversation and document");
    println!("  /quit             exit");
    println!("anything else is sent as a question about the document");
}

fn render_answer(answer: &str) -> String {
    let mut out = String::new();
    for segment in marker::segment_text(answer) {
        match segment {
            Segment::Plain(text) => out.push_str(text),
            Segment::Citation { citation, .. } => {
                out.push_str(&format!(
                    "[page {}, chunk {}]",
                    citation.page, citation.chunk_id
                ));
            }
        }
    }
    out
}

fn format_citation_list(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|citation| format!("page {} chunk {}", citation.page, citation.chunk_id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
