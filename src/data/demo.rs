//! Built-in demo dataset: Danish club news plus a short intraday price path

use chrono::{DateTime, Duration, Utc};

use super::market::PriceQuote;
use super::news::RawArticle;

fn article(
    title: &str,
    description: &str,
    content: &str,
    url: &str,
    source: &str,
    published_at: DateTime<Utc>,
) -> RawArticle {
    RawArticle {
        title: title.to_string(),
        description: Some(description.to_string()),
        content: Some(content.to_string()),
        url: url.to_string(),
        source: source.to_string(),
        published_at: Some(published_at),
    }
}

/// Articles used when no real news source returned anything
pub fn demo_articles(now: DateTime<Utc>) -> Vec<RawArticle> {
    vec![
        article(
            "Brøndby-fadæse: Ydmyget i Island",
            "Brøndby står over for en vanskelig opgave i Conference League-kvalifikationen, efter klubben torsdag aften led et ydmygende 3-0-nederlag ude mod Víkingur Reykjavík.",
            "Brøndby har ryggen mod muren i Conference League-kvalifikationen. Torsdag aften skuffede klubben stort i Island og tabte 3-0 til Víkingur Reykjavík.",
            "https://bold.dk/fodbold/nyheder/brondby-fadaese-ydmyget-i-island/",
            "Bold.dk",
            now - Duration::days(3),
        ),
        article(
            "Fans lavede ballade i Island - nu reagerer Brøndby-direktør",
            "Brøndby-direktør reagerer på fan-ballade under Conference League-kamp i Island.",
            "Brøndby-direktør reagerer på de danske fans opførsel under kampen i Island.",
            "https://sport.tv2.dk/fodbold/2025-08-08-fans-lavede-ballade-i-island-nu-reagerer-broendby-direktoer",
            "TV2 Sport",
            now - Duration::days(2),
        ),
        article(
            "Forløsning for Brøndby: Endelig succes",
            "Brøndby har endelig fået den tiltrængte forløsning efter en periode med udfordringer.",
            "Efter en periode med udfordringer har Brøndby endelig fået den tiltrængte forløsning. Klubben har kæmpet sig gennem vanskelighederne.",
            "https://bold.dk/fodbold/klubber/broendby-if/nyheder/forlosning-for-brondby-det-har-vaeret-svaert",
            "Bold.dk",
            now - Duration::days(1),
        ),
        article(
            "Brøndby kæmper sig til fantastisk sejr",
            "Brøndby kæmpede sig til en fantastisk sejr mod rivalerne i en spændende kamp.",
            "Brøndby viste stærk karakter og kæmpede sig til en fantastisk sejr. Det var en fremragende præstation.",
            "https://example.com/brondby-sejr",
            "Tipsbladet",
            now - Duration::hours(6),
        ),
        article(
            "Brøndby talent stråler i træning",
            "Ungt Brøndby-talent viser lovende tegn i træning og imponerer trænerne.",
            "Det unge talent stråler i træning og viser fremtidig potentiale. Trænerne er begejstrede.",
            "https://example.com/brondby-talent",
            "Brøndby IF",
            now - Duration::hours(8),
        ),
        article(
            "Brøndby møder udfordringer i transfervindue",
            "Klubben står over for vanskelige udfordringer i det nuværende transfervindue.",
            "Brøndby møder svære udfordringer i transfervinduet. Det bliver en vanskelig tid for klubben.",
            "https://example.com/brondby-transfer",
            "BT Sport",
            now - Duration::hours(12),
        ),
        article(
            "Brøndby sikrer sig vigtig sejr i pokalen",
            "Brøndby sikrede sig en vigtig sejr i pokalturneringen og avancerede til næste runde.",
            "Brøndby sikrede sig en afgørende sejr i pokalturneringen. Det var en vigtig dag for klubben.",
            "https://example.com/brondby-pokal",
            "Ekstra Bladet",
            now - Duration::hours(18),
        ),
    ]
}

/// Hourly quotes over the last `hours`, ending with a sharp rise on heavy volume
pub fn demo_quotes(now: DateTime<Utc>, hours: i64) -> Vec<PriceQuote> {
    let mut quotes = Vec::new();
    let mut price: f64 = 0.72;
    let mut volume: i64 = 40_000;

    for step in (0..hours).rev() {
        let timestamp = now - Duration::hours(step);
        let change = if step == 0 {
            6.5
        } else {
            // small deterministic drift
            ((step % 5) as f64 - 2.0) * 0.4
        };
        let open = price;
        price *= 1.0 + change / 100.0;
        if step == 0 {
            volume *= 3;
        } else {
            volume = 40_000 + (step % 7) * 2_500;
        }

        quotes.push(PriceQuote {
            timestamp,
            price,
            volume,
            open,
            high: open.max(price) * 1.005,
            low: open.min(price) * 0.995,
            close: price,
            change_percent: Some(change),
        });
    }

    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RelevanceScorer;

    #[test]
    fn test_demo_articles_are_relevant_and_unique() {
        let now = Utc::now();
        let articles = demo_articles(now);
        let scorer = RelevanceScorer::default();
        let mut urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        urls.dedup();
        assert_eq!(urls.len(), articles.len());
        assert!(articles
            .iter()
            .all(|a| scorer.is_relevant(&format!("{} {}", a.title, a.description.as_deref().unwrap_or("")))));
    }

    #[test]
    fn test_demo_quotes_are_ascending() {
        let quotes = demo_quotes(Utc::now(), 24);
        assert_eq!(quotes.len(), 24);
        assert!(quotes.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(quotes.last().and_then(|q| q.change_percent), Some(6.5));
    }
}
