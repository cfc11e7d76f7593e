//! folio - ebook pagination from the command line

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use folio::{Document, EngineConfig, Format, Metadata, Page, TocItem};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Paginate EPUB, FB2 and plain-text books", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio book.epub                  Show metadata and page count
    folio book.fb2 --toc             Print the table of contents
    folio book.epub --page 12        Print page 12 as HTML
    folio book.txt --search whale    List pages mentioning \"whale\"")]
struct Cli {
    /// Input file (EPUB, FB2, FB2.ZIP or TXT)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Print the table of contents
    #[arg(short, long)]
    toc: bool,

    /// Print one page (1-based, as in the table of contents)
    #[arg(short, long, value_name = "N")]
    page: Option<usize>,

    /// List pages containing QUERY, ignoring case
    #[arg(short, long, value_name = "QUERY")]
    search: Option<String>,

    /// Target visible characters per page
    #[arg(long, value_name = "N", default_value_t = folio::config::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Suppress log messages
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    file: &'a str,
    format: Format,
    metadata: &'a Metadata,
    pages: usize,
    toc_entries: usize,
}

#[derive(Serialize)]
struct SearchReport<'a> {
    query: &'a str,
    /// 0-based page indices
    pages: Vec<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = EngineConfig::default().with_page_size(cli.page_size);
    let doc = Document::open_with_config(&cli.input, &config).map_err(|e| e.to_string())?;

    let mut shown = false;
    if cli.toc {
        show_toc(doc.toc(), cli.json)?;
        shown = true;
    }
    if let Some(number) = cli.page {
        let page = number
            .checked_sub(1)
            .and_then(|i| doc.page(i))
            .ok_or_else(|| format!("page {number} out of range 1..={}", doc.page_count()))?;
        show_page(page, cli.json)?;
        shown = true;
    }
    if let Some(query) = &cli.search {
        show_search(&doc, query, cli.json)?;
        shown = true;
    }
    if !shown {
        show_info(&cli.input, &doc, cli.json)?;
    }

    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn show_info(path: &str, doc: &Document, json: bool) -> Result<(), String> {
    if json {
        return print_json(&Summary {
            file: path,
            format: doc.format(),
            metadata: doc.metadata(),
            pages: doc.page_count(),
            toc_entries: doc.toc().len(),
        });
    }

    let meta = doc.metadata();
    println!("File: {path}");
    println!("Format: {}", doc.format());
    println!("Title: {}", meta.title);
    if !meta.authors.is_empty() {
        println!("Authors: {}", meta.authors.join(", "));
    }
    if !meta.language.is_empty() {
        println!("Language: {}", meta.language);
    }
    println!("Pages: {}", doc.page_count());
    println!("TOC entries: {}", doc.toc().len());

    Ok(())
}

fn show_toc(toc: &[TocItem], json: bool) -> Result<(), String> {
    if json {
        return print_json(&toc);
    }
    for item in toc {
        let indent = "  ".repeat(item.level.saturating_sub(1));
        println!("{indent}{} .... {}", item.title, item.page);
    }
    Ok(())
}

fn show_page(page: &Page, json: bool) -> Result<(), String> {
    if json {
        return print_json(page);
    }
    println!("{}", page.markup());
    Ok(())
}

fn show_search(doc: &Document, query: &str, json: bool) -> Result<(), String> {
    let pages = doc.search(query);
    if json {
        return print_json(&SearchReport { query, pages });
    }
    if pages.is_empty() {
        println!("No matches for {query:?}");
    }
    for index in pages {
        let text = doc.page(index).map(Page::text).unwrap_or_default();
        let snippet: String = text.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(80).collect();
        println!("page {}: {snippet}", index + 1);
    }
    Ok(())
}
