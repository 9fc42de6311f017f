use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use nh_core::{Article, ArticleFilter, ArticleStorage, Error, Result, Topic};
use serde::Serialize;
use crate::config::DashboardConfig;
use crate::highlights::has_keyword;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub featured: Vec<Article>,
    pub others: Vec<Article>,
}

/// Midnight UTC of `day`, or of the day before `now` when none is given.
pub fn since_or_yesterday(day: Option<NaiveDate>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let day = match day {
        Some(day) => day,
        None => now
            .date_naive()
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| Error::Input("Date out of range".to_string()))?,
    };
    day.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::Input(format!("Invalid date {}", day)))
}

/// Most recently featured articles of `topic` ingested since `since`.
pub async fn featured_articles(
    store: &dyn ArticleStorage,
    topic: Topic,
    since: DateTime<Utc>,
    config: &DashboardConfig,
) -> Result<Vec<Article>> {
    let mut featured = store
        .find(&ArticleFilter::all().topic(topic).since(since).featured(true))
        .await?;
    featured.sort_by(|a, b| b.featured_at.cmp(&a.featured_at));
    featured.truncate(config.featured_limit);
    Ok(featured)
}

/// Display score: keyword boost on the title plus a bump for known duplicates.
pub fn display_score(article: &Article, config: &DashboardConfig) -> usize {
    let mut score = 0;
    if has_keyword(&article.title, &config.keywords) {
        score += config.keyword_boost;
    }
    if article.duplicate_cluster_id.is_some() {
        score += config.duplicate_boost;
    }
    score
}

/// Non-featured articles of `topic` ingested since `since`, best display score first.
pub async fn other_articles(
    store: &dyn ArticleStorage,
    topic: Topic,
    since: DateTime<Utc>,
    config: &DashboardConfig,
) -> Result<Vec<Article>> {
    let mut others = store
        .find(&ArticleFilter::all().topic(topic).since(since).featured(false))
        .await?;
    others.sort_by_cached_key(|a| std::cmp::Reverse(display_score(a, config)));
    others.truncate(config.others_limit);
    Ok(others)
}

pub async fn dashboard(
    store: &dyn ArticleStorage,
    topic: Topic,
    since: DateTime<Utc>,
    config: &DashboardConfig,
) -> Result<DashboardView> {
    Ok(DashboardView {
        featured: featured_articles(store, topic, since, config).await?,
        others: other_articles(store, topic, since, config).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nh_core::FieldUpdate;
    use nh_storage::InMemoryStorage;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    fn article(id: &str, title: &str, ingested: DateTime<Utc>) -> Article {
        Article::new(title, "", format!("http://test.com/{}", id), "test")
            .with_id(id)
            .with_topic(Topic::Finance)
            .with_ingested_at(ingested)
    }

    fn featured(id: &str, at: DateTime<Utc>) -> Article {
        let mut a = article(id, "Featured story", day(10));
        a.is_featured = true;
        a.featured_at = Some(at);
        a
    }

    #[tokio::test]
    async fn test_featured_newest_first_and_limited() {
        let store = InMemoryStorage::with_articles(vec![
            featured("f1", day(10)),
            featured("f2", day(10) + Duration::hours(3)),
            featured("f3", day(10) + Duration::hours(1)),
            featured("f4", day(10) + Duration::hours(2)),
            article("n1", "Plain", day(10)),
        ]);
        let result = featured_articles(&store, Topic::Finance, day(9), &DashboardConfig::default())
            .await
            .unwrap();
        let ids: Vec<&str> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["f2", "f4", "f3"]);
    }

    #[tokio::test]
    async fn test_others_ordering_and_recency() {
        let mut dup = article("dup", "Markets steady", day(10));
        dup.duplicate_cluster_id = Some(2);
        let store = InMemoryStorage::with_articles(vec![
            article("plain", "Quiet session", day(10)),
            dup,
            article("hot", "Exclusive: bank merger", day(10)),
            article("stale", "BREAKING: old news", day(1)),
            featured("f1", day(10)),
        ]);
        let result = other_articles(&store, Topic::Finance, day(9), &DashboardConfig::default())
            .await
            .unwrap();
        let ids: Vec<&str> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["hot", "dup", "plain"]);
    }

    #[tokio::test]
    async fn test_dashboard_does_not_mutate() {
        let store = InMemoryStorage::with_articles(vec![featured("f1", day(10)), article("n1", "BREAKING", day(10))]);
        store.update_by_id("n1", &[FieldUpdate::DuplicateCluster(0)]).await.unwrap();
        let before = store.find(&ArticleFilter::all()).await.unwrap();

        let view = dashboard(&store, Topic::Finance, day(9), &DashboardConfig::default()).await.unwrap();
        assert_eq!(view.featured.len(), 1);
        assert_eq!(view.others.len(), 1);
        assert_eq!(store.find(&ArticleFilter::all()).await.unwrap(), before);
    }

    #[test]
    fn test_since_or_yesterday() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap();
        assert_eq!(since_or_yesterday(None, now).unwrap(), Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        let day = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(since_or_yesterday(day, now).unwrap(), Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_display_score_matches_title_only() {
        let config = DashboardConfig::default();
        let mut a = Article::new("Calm", "breaking news in the body", "u", "s");
        assert_eq!(display_score(&a, &config), 0);
        a.title = "CONFIRMED: deal".to_string();
        a.duplicate_cluster_id = Some(0);
        assert_eq!(display_score(&a, &config), 6);
    }
}
