//! Deterministic placeholder articles served when every upstream fails.

use chrono::{Duration, Utc};
use lx_core::{Article, Category};

use crate::normalize::placeholder_image;

const SAMPLE_SOURCE: &str = "Luxora Times";

fn titles_for(category: &Category) -> &'static [&'static str] {
    match category {
        Category::Business => &[
            "Market Analysis: Tech Stocks Show Strong Performance",
            "Global Economy Outlook for Next Quarter",
            "Cryptocurrency Market Trends and Analysis",
            "Banking Sector Updates and Regulatory Changes",
            "Startup Funding Reaches New Heights",
        ],
        Category::Technology => &[
            "AI Breakthrough in Machine Learning Research",
            "New Smartphone Technology Revolutionizes Industry",
            "Cybersecurity Threats and Protection Strategies",
            "Cloud Computing Adoption Accelerates",
            "Tech Giants Announce Major Partnerships",
        ],
        Category::Science => &[
            "Climate Change Research Shows New Findings",
            "Space Exploration Mission Achieves Milestone",
            "Medical Research Breakthrough in Treatment",
            "Environmental Conservation Efforts Expand",
            "Scientific Discovery Changes Understanding",
        ],
        Category::Health => &[
            "New Treatment Options for Common Conditions",
            "Public Health Initiative Shows Positive Results",
            "Mental Health Awareness Campaign Launches",
            "Medical Technology Advances Patient Care",
            "Health Research Reveals Important Insights",
        ],
        Category::Sports => &[
            "Championship Finals Draw Record Viewership",
            "Athlete Breaks Long-Standing Record",
            "Sports Technology Enhances Performance",
            "International Tournament Announces Schedule",
            "Team Management Changes Announced",
        ],
        Category::Entertainment => &[
            "Film Industry Celebrates Award Season",
            "Music Festival Lineup Announced",
            "Streaming Platform Launches New Content",
            "Celebrity News and Industry Updates",
            "Entertainment Technology Innovations",
        ],
        Category::Politics => &[
            "Legislative Session Opens With Packed Agenda",
            "Election Commission Publishes New Guidelines",
            "Coalition Talks Continue Into Second Week",
            "Policy Debate Centers on Infrastructure Spending",
            "Diplomatic Summit Concludes With Joint Statement",
        ],
        Category::General | Category::Custom(_) => &[
            "Breaking News: Major Development Announced",
            "Local Community Initiative Gains Support",
            "Weather Update: Seasonal Changes Expected",
            "Transportation Updates Affect Daily Commute",
            "Educational Programs Show Positive Results",
        ],
    }
}

fn sample_article(title: String, category: &Category, index: usize) -> Article {
    let name = category.as_str();
    Article {
        id: format!("fallback-{}-{}", name, index),
        image_url: placeholder_image(&title),
        title,
        description: format!(
            "This is a sample {} article. The full content would be available from the original source.",
            name
        ),
        content: format!(
            "This is a sample {} article with detailed content. In a real scenario, this would contain the full article text from the news source.",
            name
        ),
        url: format!("https://example.com/news/{}/{}", name, index),
        published_at: Utc::now() - Duration::hours(index as i64),
        source: SAMPLE_SOURCE.to_string(),
        category: category.clone(),
    }
}

/// Exactly `count` articles for the category, cycling its title list.
pub fn headlines(category: &Category, count: usize) -> Vec<Article> {
    let titles = titles_for(category);
    (0..count)
        .map(|i| sample_article(titles[i % titles.len()].to_string(), category, i))
        .collect()
}

/// Exactly `count` general articles, each title prefixed with the query.
pub fn search(query: &str, count: usize) -> Vec<Article> {
    let query = query.trim();
    headlines(&Category::General, count)
        .into_iter()
        .enumerate()
        .map(|(i, mut article)| {
            article.id = format!("fallback-search-{}", i);
            article.title = format!("{} - {}", query, article.title);
            article.description = format!("Search result for \"{}\": {}", query, article.description);
            article.image_url = placeholder_image(&article.title);
            article
        })
        .collect()
}

const TOPIC_STORIES: [(&str, &str, &str); 6] = [
    (
        "Global Markets See Significant Gains Amid Economic Recovery",
        "Stock markets around the world are experiencing substantial growth as economic indicators show strong recovery trends.",
        "Financial Times",
    ),
    (
        "Tech Giants Announce New AI Initiatives",
        "Major technology companies have unveiled ambitious artificial intelligence projects aimed at transforming various industries.",
        "Tech Insider",
    ),
    (
        "Climate Summit Produces Landmark Agreement",
        "World leaders have reached a consensus on aggressive carbon reduction targets during the latest international climate conference.",
        "Environmental Report",
    ),
    (
        "Healthcare Breakthrough: New Treatment Shows Promise",
        "Researchers have developed a novel therapeutic approach that demonstrates significant efficacy in clinical trials.",
        "Medical Journal",
    ),
    (
        "Global Supply Chain Issues Begin to Ease",
        "After months of disruption, international logistics networks are showing signs of normalization and improved efficiency.",
        "Business Daily",
    ),
    (
        "Entertainment Industry Embraces New Distribution Models",
        "Major studios and production companies are adapting to changing consumer preferences with innovative content delivery strategies.",
        "Entertainment Weekly",
    ),
];

/// Six generic stories tagged with the topic.
pub fn topic(topic: &str) -> Vec<Article> {
    let category = Category::parse(topic);
    TOPIC_STORIES
        .iter()
        .enumerate()
        .map(|(i, (title, summary, source))| Article {
            id: format!("fallback-topic-{}", i + 1),
            title: title.to_string(),
            description: summary.to_string(),
            content: summary.to_string(),
            url: format!("https://example.com/news/{}", i + 1),
            image_url: placeholder_image(title),
            published_at: Utc::now(),
            source: source.to_string(),
            category: category.clone(),
        })
        .collect()
}
