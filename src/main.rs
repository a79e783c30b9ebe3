mod extract;
mod fetch;
mod locale;
mod npc;
mod settings;
mod sql;
mod writer;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use locale::Locale;

#[derive(Parser)]
#[command(name = "wh_scraper", about = "Scrape wowhead npc pages into SQL dumps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a range of npc listview pages and write one .sql file
    Run {
        /// Locale to scrape (en, fr, de, es, ru)
        #[arg(short, long, default_value = "en")]
        locale: Locale,
        /// First creature entry
        #[arg(long, default_value = "1")]
        start: u32,
        /// Last creature entry
        #[arg(long)]
        end: Option<u32>,
        /// Output file (overrides settings)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write semantics: update, insert, insert-ignore, replace
        #[arg(short, long)]
        query_kind: Option<String>,
    },
    /// Parse one saved page file and print its statement block
    Parse {
        /// Path to a saved page (raw HTML/JS)
        file: PathBuf,
        /// Locale the page was saved from
        #[arg(short, long, default_value = "en")]
        locale: Locale,
        /// Write semantics override
        #[arg(short, long)]
        query_kind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = settings::load()?;

    match cli.command {
        Commands::Run {
            locale,
            start,
            end,
            output,
            query_kind,
        } => {
            if let Some(kind) = query_kind {
                settings.query_kind = kind;
            }
            if let Some(path) = output {
                settings.output = path.display().to_string();
            }
            // Surface a bad query kind before any page is fetched.
            npc::creature_batch(locale, &settings)?;

            let end = end.unwrap_or(fetch::MAX_ENTRY);
            anyhow::ensure!(start <= end, "start {} is past end {}", start, end);

            let path = PathBuf::from(&settings.output);
            let mut out = writer::SqlFile::create(&path)?;
            println!(
                "Scraping entries {}..={} ({:?}) -> {}",
                start,
                end,
                locale,
                path.display()
            );

            let stats = fetch::scrape_streaming(&settings, locale, start, end, &mut out).await?;
            let blocks = out.blocks_written();
            let path = out.finish()?;
            println!(
                "Done: {} pages ({} ok, {} errors), {} statement blocks -> {}",
                stats.total,
                stats.ok,
                stats.errors,
                blocks,
                path.display()
            );
        }
        Commands::Parse {
            file,
            locale,
            query_kind,
        } => {
            if let Some(kind) = query_kind {
                settings.query_kind = kind;
            }
            let page = std::fs::read_to_string(&file)?;
            let item = npc::parse_page(&page, 0, locale, &settings)?;
            if item.sql.is_empty() {
                println!("-- no records in {}", file.display());
            } else {
                print!("{}", item.sql);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    Ok(())
}
