//! User progress: kompeito earned, reviews posted, places visited
//!
//! `ProfileStore` is an explicit object created once on launch and handed to
//! whatever needs it. It owns the cached profile and writes every change back
//! to the key-value store in a single call.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::services::{Clock, KeyValueStore, StoreError};

pub const PROFILE_KEY: &str = "user_profile";
pub const REVIEWS_KEY: &str = "reviews_data";
pub const REVIEWED_PLACES_KEY: &str = "reviewed_places";
pub const KOMPEITO_COUNT_KEY: &str = "kompeito_count";

/// Kompeito awarded for a review unless configured otherwise
pub const DEFAULT_KOMPEITO_PER_REVIEW: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub join_date: DateTime<Utc>,
    pub total_reviews: u64,
    pub total_kompeito: u64,
    /// Number of distinct places reviewed
    pub reviewed_places: u64,
    pub monthly_reviews: u64,
    pub last_month_reset: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            join_date: now,
            total_reviews: 0,
            total_kompeito: 0,
            reviewed_places: 0,
            monthly_reviews: 0,
            last_month_reset: now,
        }
    }

    /// Zero the monthly counter when `now` is in a later calendar month
    fn roll_month(&mut self, now: DateTime<Utc>) -> bool {
        let last = self.last_month_reset;
        if last.year() == now.year() && last.month() == now.month() {
            return false;
        }
        self.monthly_reviews = 0;
        self.last_month_reset = now;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub place_id: String,
    pub review_id: String,
    pub timestamp: DateTime<Utc>,
    pub kompeito: u64,
}

pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    default_username: String,
    profile: Mutex<UserProfile>,
}

impl ProfileStore {
    /// Load (or create) the profile; call once at startup
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        default_username: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let default_username = default_username.into();
        let now = clock.now();
        let this = Self {
            store,
            clock,
            profile: Mutex::new(UserProfile::new(default_username.clone(), now)),
            default_username,
        };
        this.refresh().await?;
        Ok(this)
    }

    /// Re-read the profile from storage, applying the monthly rollover
    pub async fn refresh(&self) -> Result<UserProfile, StoreError> {
        let mut cached = self.profile.lock().await;
        let now = self.clock.now();

        let stored: Option<UserProfile> = self.read_json(PROFILE_KEY).await?;
        let mut profile = match stored {
            Some(profile) => profile,
            None => {
                info!("Creating profile for {}", self.default_username);
                UserProfile::new(self.default_username.clone(), now)
            }
        };
        profile.total_kompeito = self.read_kompeito_count().await?;
        if profile.roll_month(now) {
            info!("New month, monthly review count reset");
        }

        self.store
            .set(PROFILE_KEY, serde_json::to_string(&profile)?)
            .await?;
        *cached = profile.clone();
        Ok(profile)
    }

    pub async fn profile(&self) -> UserProfile {
        self.profile.lock().await.clone()
    }

    /// Record a review of `place_id` and award `kompeito`
    pub async fn add_review(&self, place_id: &str, kompeito: u64) -> Result<UserProfile, StoreError> {
        let mut cached = self.profile.lock().await;
        let now = self.clock.now();

        let mut reviews: Vec<ReviewRecord> = self.read_json(REVIEWS_KEY).await?.unwrap_or_default();
        reviews.push(ReviewRecord {
            place_id: place_id.to_string(),
            review_id: format!("review_{}", now.timestamp_millis()),
            timestamp: now,
            kompeito,
        });

        let mut places: Vec<String> = self
            .read_json(REVIEWED_PLACES_KEY)
            .await?
            .unwrap_or_default();
        if !places.iter().any(|p| p == place_id) {
            places.push(place_id.to_string());
        }

        let mut profile = cached.clone();
        profile.roll_month(now);
        profile.total_reviews += 1;
        profile.total_kompeito += kompeito;
        profile.reviewed_places = places.len() as u64;
        profile.monthly_reviews += 1;

        let entries = [
            (REVIEWS_KEY, serde_json::to_string(&reviews)?),
            (REVIEWED_PLACES_KEY, serde_json::to_string(&places)?),
            (KOMPEITO_COUNT_KEY, profile.total_kompeito.to_string()),
            (PROFILE_KEY, serde_json::to_string(&profile)?),
        ];
        self.store.set_many(&entries).await?;

        info!(
            "Review of {} recorded: +{} kompeito ({} total)",
            place_id, kompeito, profile.total_kompeito
        );
        *cached = profile.clone();
        Ok(profile)
    }

    pub async fn reviews(&self) -> Result<Vec<ReviewRecord>, StoreError> {
        Ok(self.read_json(REVIEWS_KEY).await?.unwrap_or_default())
    }

    pub async fn reviewed_places(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read_json(REVIEWED_PLACES_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn is_place_reviewed(&self, place_id: &str) -> Result<bool, StoreError> {
        Ok(self.reviewed_places().await?.iter().any(|p| p == place_id))
    }

    /// Wipe all progress and start a fresh profile
    pub async fn reset_stats(&self) -> Result<UserProfile, StoreError> {
        self.store
            .remove_many(&[PROFILE_KEY, REVIEWS_KEY, REVIEWED_PLACES_KEY, KOMPEITO_COUNT_KEY])
            .await?;
        info!("Profile statistics reset");
        self.refresh().await
    }

    async fn read_kompeito_count(&self) -> Result<u64, StoreError> {
        let raw = self.store.get(KOMPEITO_COUNT_KEY).await?;
        Ok(match raw {
            Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
                warn!("Ignoring malformed kompeito count {:?}: {}", raw, e);
                0
            }),
            None => 0,
        })
    }

    /// Read a JSON value; malformed data is logged and treated as absent
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", key, e);
                Ok(None)
            }
        }
    }
}
