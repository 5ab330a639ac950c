//! PostgreSQL storage implementation.
//!
//! Production backend for the central cache and the per-kind annotation
//! tables. Batch paths are single statements: reads bind identifier
//! arrays with `= ANY`, the batch upsert zips column arrays through
//! `UNNEST`, and GC deletes against an `UNNEST` of the keep-set. This is
//! load-bearing - the sync handlers move tens to hundreds of rows per
//! request and per-row round trips would dominate everything but the
//! upstream fetch itself.
//!
//! Schema lives in `packages/server/migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::traits::{AnnotationStore, PodcastCache};
use crate::types::{
    Annotation, AnnotationInput, CacheStatistics, CachedPodcast, ConsumerKind,
    DemographicsSnapshot, PodcastRecord, PodcastSnapshot,
};

/// Postgres-backed central cache.
#[derive(Clone)]
pub struct PostgresPodcastStore {
    pool: PgPool,
}

impl PostgresPodcastStore {
    /// Wrap an existing connection pool (the server shares one pool
    /// across stores).
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape; JSONB payloads are decoded into typed fields on read.
#[derive(FromRow)]
struct PodcastRow {
    id: Uuid,
    upstream_id: String,
    name: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    url: Option<String>,
    publisher: Option<String>,
    categories: serde_json::Value,
    language: Option<String>,
    region: Option<String>,
    episode_count: Option<i32>,
    last_episode_at: Option<DateTime<Utc>>,
    is_active: Option<bool>,
    has_guests: Option<bool>,
    has_sponsors: Option<bool>,
    ratings: serde_json::Value,
    audience_size: Option<i64>,
    reach_score: Option<i32>,
    contact_email: Option<String>,
    website: Option<String>,
    social_links: Option<serde_json::Value>,
    rss_url: Option<String>,
    demographics: Option<serde_json::Value>,
    demographics_episodes_analyzed: Option<i32>,
    demographics_fetched_at: Option<DateTime<Utc>>,
    last_fetched_at: DateTime<Utc>,
    fetch_count: i64,
    cache_hit_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PodcastRow> for CachedPodcast {
    fn from(row: PodcastRow) -> Self {
        let demographics = match (row.demographics, row.demographics_fetched_at) {
            (Some(breakdown), Some(fetched_at)) => Some(DemographicsSnapshot {
                episodes_analyzed: row.demographics_episodes_analyzed,
                breakdown,
                fetched_at,
            }),
            _ => None,
        };

        CachedPodcast {
            id: row.id,
            snapshot: PodcastSnapshot {
                upstream_id: row.upstream_id,
                name: row.name,
                description: row.description,
                image_url: row.image_url,
                url: row.url,
                publisher: row.publisher,
                categories: serde_json::from_value(row.categories).unwrap_or_default(),
                language: row.language,
                region: row.region,
                episode_count: row.episode_count,
                last_episode_at: row.last_episode_at,
                is_active: row.is_active,
                has_guests: row.has_guests,
                has_sponsors: row.has_sponsors,
                ratings: serde_json::from_value(row.ratings).unwrap_or_default(),
                audience_size: row.audience_size,
                reach_score: row.reach_score,
                contact_email: row.contact_email,
                website: row.website,
                social_links: row.social_links,
                rss_url: row.rss_url,
            },
            demographics,
            last_fetched_at: row.last_fetched_at,
            fetch_count: row.fetch_count,
            cache_hit_count: row.cache_hit_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn storage_err(e: sqlx::Error) -> CacheError {
    CacheError::Storage(Box::new(e))
}

const UPSERT_SQL: &str = r#"
    INSERT INTO podcast_cache (
        upstream_id, name, description, image_url, url, publisher,
        categories, language, region, episode_count, last_episode_at,
        is_active, has_guests, has_sponsors, ratings, audience_size,
        reach_score, contact_email, website, social_links, rss_url,
        demographics, demographics_episodes_analyzed, demographics_fetched_at
    )
    SELECT * FROM UNNEST(
        $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[],
        $7::jsonb[], $8::text[], $9::text[], $10::int[], $11::timestamptz[],
        $12::bool[], $13::bool[], $14::bool[], $15::jsonb[], $16::bigint[],
        $17::int[], $18::text[], $19::text[], $20::jsonb[], $21::text[],
        $22::jsonb[], $23::int[], $24::timestamptz[]
    )
    ON CONFLICT (upstream_id) DO UPDATE SET
        name = EXCLUDED.name,
        description = EXCLUDED.description,
        image_url = EXCLUDED.image_url,
        url = EXCLUDED.url,
        publisher = EXCLUDED.publisher,
        categories = EXCLUDED.categories,
        language = EXCLUDED.language,
        region = EXCLUDED.region,
        episode_count = EXCLUDED.episode_count,
        last_episode_at = EXCLUDED.last_episode_at,
        is_active = EXCLUDED.is_active,
        has_guests = EXCLUDED.has_guests,
        has_sponsors = EXCLUDED.has_sponsors,
        ratings = EXCLUDED.ratings,
        audience_size = EXCLUDED.audience_size,
        reach_score = EXCLUDED.reach_score,
        contact_email = EXCLUDED.contact_email,
        website = EXCLUDED.website,
        social_links = EXCLUDED.social_links,
        rss_url = EXCLUDED.rss_url,
        demographics = EXCLUDED.demographics,
        demographics_episodes_analyzed = EXCLUDED.demographics_episodes_analyzed,
        demographics_fetched_at = EXCLUDED.demographics_fetched_at,
        last_fetched_at = NOW(),
        fetch_count = podcast_cache.fetch_count + 1,
        updated_at = NOW()
    RETURNING *
"#;

impl PostgresPodcastStore {
    /// Run the multi-row upsert. One statement regardless of batch size.
    async fn upsert_rows(&self, records: &[PodcastRecord]) -> sqlx::Result<Vec<CachedPodcast>> {
        let n = records.len();
        let mut upstream_ids = Vec::with_capacity(n);
        let mut names = Vec::with_capacity(n);
        let mut descriptions = Vec::with_capacity(n);
        let mut image_urls = Vec::with_capacity(n);
        let mut urls = Vec::with_capacity(n);
        let mut publishers = Vec::with_capacity(n);
        let mut categories = Vec::with_capacity(n);
        let mut languages = Vec::with_capacity(n);
        let mut regions = Vec::with_capacity(n);
        let mut episode_counts = Vec::with_capacity(n);
        let mut last_episode_ats = Vec::with_capacity(n);
        let mut is_actives = Vec::with_capacity(n);
        let mut has_guests = Vec::with_capacity(n);
        let mut has_sponsors = Vec::with_capacity(n);
        let mut ratings = Vec::with_capacity(n);
        let mut audience_sizes = Vec::with_capacity(n);
        let mut reach_scores = Vec::with_capacity(n);
        let mut contact_emails = Vec::with_capacity(n);
        let mut websites = Vec::with_capacity(n);
        let mut social_links = Vec::with_capacity(n);
        let mut rss_urls = Vec::with_capacity(n);
        let mut demographics = Vec::with_capacity(n);
        let mut demo_episodes = Vec::with_capacity(n);
        let mut demo_fetched_ats = Vec::with_capacity(n);

        for record in records {
            let s = &record.snapshot;
            upstream_ids.push(s.upstream_id.clone());
            names.push(s.name.clone());
            descriptions.push(s.description.clone());
            image_urls.push(s.image_url.clone());
            urls.push(s.url.clone());
            publishers.push(s.publisher.clone());
            categories.push(serde_json::to_value(&s.categories).unwrap_or_default());
            languages.push(s.language.clone());
            regions.push(s.region.clone());
            episode_counts.push(s.episode_count);
            last_episode_ats.push(s.last_episode_at);
            is_actives.push(s.is_active);
            has_guests.push(s.has_guests);
            has_sponsors.push(s.has_sponsors);
            ratings.push(serde_json::to_value(&s.ratings).unwrap_or_default());
            audience_sizes.push(s.audience_size);
            reach_scores.push(s.reach_score);
            contact_emails.push(s.contact_email.clone());
            websites.push(s.website.clone());
            social_links.push(s.social_links.clone());
            rss_urls.push(s.rss_url.clone());
            demographics.push(record.demographics.as_ref().map(|d| d.breakdown.clone()));
            demo_episodes.push(record.demographics.as_ref().and_then(|d| d.episodes_analyzed));
            demo_fetched_ats.push(record.demographics.as_ref().map(|d| d.fetched_at));
        }

        let rows: Vec<PodcastRow> = sqlx::query_as(UPSERT_SQL)
            .bind(&upstream_ids)
            .bind(&names)
            .bind(&descriptions)
            .bind(&image_urls)
            .bind(&urls)
            .bind(&publishers)
            .bind(&categories)
            .bind(&languages)
            .bind(&regions)
            .bind(&episode_counts)
            .bind(&last_episode_ats)
            .bind(&is_actives)
            .bind(&has_guests)
            .bind(&has_sponsors)
            .bind(&ratings)
            .bind(&audience_sizes)
            .bind(&reach_scores)
            .bind(&contact_emails)
            .bind(&websites)
            .bind(&social_links)
            .bind(&rss_urls)
            .bind(&demographics)
            .bind(&demo_episodes)
            .bind(&demo_fetched_ats)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CachedPodcast::from).collect())
    }
}

#[async_trait]
impl PodcastCache for PostgresPodcastStore {
    async fn get_by_upstream_ids(&self, ids: &[String]) -> Result<Vec<CachedPodcast>> {
        let rows: Vec<PodcastRow> =
            sqlx::query_as("SELECT * FROM podcast_cache WHERE upstream_id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?;

        Ok(rows.into_iter().map(CachedPodcast::from).collect())
    }

    async fn upsert_one(&self, record: &PodcastRecord) -> Result<CachedPodcast> {
        let mut rows = self
            .upsert_rows(std::slice::from_ref(record))
            .await
            .map_err(storage_err)?;
        rows.pop()
            .ok_or_else(|| CacheError::storage("upsert returned no row"))
    }

    async fn upsert_batch(&self, records: &[PodcastRecord]) -> Result<Vec<CachedPodcast>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        self.upsert_rows(records)
            .await
            .map_err(|e| CacheError::BatchWrite {
                identifiers: records
                    .iter()
                    .map(|r| r.upstream_id().to_string())
                    .collect(),
                source: Box::new(e),
            })
    }

    async fn record_hits(&self, ids: &[String]) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE podcast_cache
             SET cache_hit_count = cache_hit_count + 1
             WHERE upstream_id = ANY($1)",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected())
    }

    async fn statistics(&self, stale_days: i64) -> Result<CacheStatistics> {
        let (total_podcasts, total_fetches, total_cache_hits, with_demographics): (
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            "SELECT total_podcasts, total_fetches, total_cache_hits, with_demographics
             FROM podcast_cache_statistics",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        let (fresh, stale): (i64, i64) = sqlx::query_as(
            "SELECT
                COUNT(*) FILTER (WHERE last_fetched_at >= NOW() - make_interval(days => $1)),
                COUNT(*) FILTER (WHERE last_fetched_at <  NOW() - make_interval(days => $1))
             FROM podcast_cache",
        )
        .bind(stale_days as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(CacheStatistics {
            total_podcasts,
            total_fetches,
            total_cache_hits,
            with_demographics,
            fresh,
            stale,
        })
    }

    async fn sweep_older_than(&self, horizon_days: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM podcast_cache
             WHERE last_fetched_at < NOW() - make_interval(days => $1)",
        )
        .bind(horizon_days as i32)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected())
    }
}

/// Postgres-backed annotation store, scoped to one consumer kind's table.
#[derive(Clone)]
pub struct PostgresAnnotationStore {
    pool: PgPool,
    table: &'static str,
}

impl PostgresAnnotationStore {
    pub fn new(pool: PgPool, kind: ConsumerKind) -> Self {
        // Fixed table names per kind; never interpolated from input.
        let table = match kind {
            ConsumerKind::Client => "client_podcast_analysis",
            ConsumerKind::Prospect => "prospect_podcast_analysis",
            ConsumerKind::Outreach => "outreach_podcast_analysis",
        };
        Self { pool, table }
    }
}

#[derive(FromRow)]
struct AnnotationRow {
    id: Uuid,
    consumer_id: String,
    podcast_id: Uuid,
    clean_description: Option<String>,
    fit_reasons: Option<serde_json::Value>,
    pitch_angles: Option<serde_json::Value>,
    analyzed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnnotationRow> for Annotation {
    fn from(row: AnnotationRow) -> Self {
        Annotation {
            id: row.id,
            consumer_id: row.consumer_id,
            podcast_id: row.podcast_id,
            clean_description: row.clean_description,
            fit_reasons: row
                .fit_reasons
                .and_then(|v| serde_json::from_value(v).ok()),
            pitch_angles: row
                .pitch_angles
                .and_then(|v| serde_json::from_value(v).ok()),
            analyzed_at: row.analyzed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AnnotationStore for PostgresAnnotationStore {
    async fn get_for_consumer(
        &self,
        consumer_id: &str,
        podcast_ids: &[Uuid],
    ) -> Result<Vec<Annotation>> {
        let rows: Vec<AnnotationRow> = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE consumer_id = $1 AND podcast_id = ANY($2)",
            self.table
        ))
        .bind(consumer_id)
        .bind(podcast_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Annotation::from).collect())
    }

    async fn needs_analysis(&self, consumer_id: &str, podcast_id: Uuid) -> Result<bool> {
        let analyzed_at: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(&format!(
            "SELECT analyzed_at FROM {} WHERE consumer_id = $1 AND podcast_id = $2",
            self.table
        ))
        .bind(consumer_id)
        .bind(podcast_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(match analyzed_at {
            None => true,
            Some(at) => at.is_none(),
        })
    }

    async fn upsert(&self, input: &AnnotationInput) -> Result<Annotation> {
        let fit_reasons = input
            .analysis
            .as_ref()
            .map(|a| serde_json::to_value(&a.fit_reasons).unwrap_or_default());
        let pitch_angles = input
            .analysis
            .as_ref()
            .map(|a| serde_json::to_value(&a.pitch_angles).unwrap_or_default());

        let row: AnnotationRow = sqlx::query_as(&format!(
            "INSERT INTO {} (consumer_id, podcast_id, clean_description, fit_reasons, pitch_angles, analyzed_at)
             VALUES ($1, $2, $3, $4, $5, NOW())
             ON CONFLICT (consumer_id, podcast_id) DO UPDATE SET
                clean_description = EXCLUDED.clean_description,
                fit_reasons = EXCLUDED.fit_reasons,
                pitch_angles = EXCLUDED.pitch_angles,
                analyzed_at = EXCLUDED.analyzed_at,
                updated_at = NOW()
             RETURNING *",
            self.table
        ))
        .bind(&input.consumer_id)
        .bind(input.podcast_id)
        .bind(input.analysis.as_ref().map(|a| a.clean_description.clone()))
        .bind(fit_reasons)
        .bind(pitch_angles)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.into())
    }

    async fn retain_only(&self, consumer_id: &str, podcast_ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(&format!(
            "DELETE FROM {}
             WHERE consumer_id = $1
               AND podcast_id NOT IN (SELECT * FROM UNNEST($2::uuid[]))",
            self.table
        ))
        .bind(consumer_id)
        .bind(podcast_ids)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected())
    }
}
