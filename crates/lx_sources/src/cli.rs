use clap::{Args, Subcommand};
use lx_core::{Article, Category, Result};

use crate::manager::FetchManager;
use crate::media::{MediaOptions, MediaOutcome, MediaService};
use crate::normalize::is_placeholder;

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SourceCommands {
    /// Top headlines, optionally for one category
    Headlines {
        /// business, technology, science, health, entertainment, sports, politics or general
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "us")]
        country: String,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },
    /// Free-text article search
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },
    /// Google News feed for a topic
    Topic {
        #[arg(default_value = "world news")]
        topic: String,
    },
    /// Per-source quota usage
    Usage,
    /// Look up an illustrative photo or video
    Media {
        title: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long)]
        video: bool,
    },
}

pub fn format_article(article: &Article) -> String {
    let image = if is_placeholder(&article.image_url) { "🖼️ " } else { "📷" };
    format!(
        "{} [{}] {} ({}) {}",
        image,
        article.category,
        article.title,
        article.source,
        article.published_at.format("%Y-%m-%d %H:%M")
    )
}

fn print_articles(articles: &[Article]) {
    println!("Found {} articles", articles.len());
    for article in articles {
        println!("{}", format_article(article));
        if !article.url.is_empty() {
            println!("    {}", article.url);
        }
    }
}

pub async fn handle_command(args: SourceArgs, manager: &FetchManager, media: &MediaService) -> Result<()> {
    match args.command {
        SourceCommands::Headlines {
            category,
            country,
            page_size,
        } => {
            let category = category.as_deref().map(Category::parse);
            let articles = manager.fetch_top_headlines(category, &country, page_size).await;
            print_articles(&articles);
        }
        SourceCommands::Search { query, page_size } => {
            let articles = manager.search_articles(&query, page_size).await;
            print_articles(&articles);
        }
        SourceCommands::Topic { topic } => {
            let articles = manager.fetch_topic(&topic).await;
            print_articles(&articles);
        }
        SourceCommands::Usage => {
            for usage in manager.usage_stats().await {
                let state = if usage.active { "✅" } else { "⛔" };
                println!(
                    "{} {:<12} {}/{} calls left, resets {}",
                    state,
                    usage.name,
                    usage.remaining_calls,
                    usage.daily_limit,
                    usage.reset_time.format("%Y-%m-%d %H:%M UTC")
                );
                if let Some(limiter) = usage.rate_limiter {
                    println!(
                        "    limiter: {} requests left, delay {}ms{}",
                        limiter.remaining_requests,
                        limiter.current_delay,
                        if limiter.is_throttling { " (throttling)" } else { "" }
                    );
                }
            }
        }
        SourceCommands::Media { title, category, video } => {
            let options = MediaOptions {
                enabled: true,
                prefer_video: video,
                ..MediaOptions::default()
            };
            match media.resolve(&title, &category, &options).await {
                MediaOutcome::Found(asset) => {
                    println!("🎞️ {:?} {} ({}x{})", asset.kind, asset.url, asset.width, asset.height);
                    if let Some(by) = asset.attribution {
                        println!("    by {}", by);
                    }
                }
                MediaOutcome::NotFound => println!("No media found"),
                MediaOutcome::Disabled => println!("Media lookup disabled"),
                MediaOutcome::Failed { attempts, error } => {
                    eprintln!("Media lookup failed after {} attempts: {}", attempts, error);
                }
            }
        }
    }
    Ok(())
}
