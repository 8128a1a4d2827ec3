use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Planned,
    Watching,
    Completed,
    Dropped,
}

impl WatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Watching => "watching",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }

    /// A personal rating only makes sense once the user has started watching.
    pub fn allows_rating(self) -> bool {
        !matches!(self, Self::Planned)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Rating,
    ReleaseYear,
    Popularity,
    Title,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::ReleaseYear => "release_year",
            Self::Popularity => "popularity",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

pub const DEFAULT_YEAR_MIN: i32 = 1900;
pub const DEFAULT_RATING_MIN: f64 = 1.0;

/// Field set of the filter endpoint. Kept in memory while searching so that
/// clearing the search box brings the previous filters back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFilter {
    pub genre_id: Option<i64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub rating_min: Option<f64>,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
}

impl Default for MovieFilter {
    fn default() -> Self {
        Self {
            genre_id: None,
            year_min: Some(DEFAULT_YEAR_MIN),
            year_max: None,
            rating_min: Some(DEFAULT_RATING_MIN),
            sort_by: SortField::Rating,
            sort_direction: SortDirection::Desc,
        }
    }
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(alias = "total")]
    pub total_items: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub pages: Option<u32>,
}

/// List projection of a movie as returned by search and filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub media_type: MediaType,
    pub release_year: i32,
    pub rating: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub display_rating: Option<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub personal_status: Option<WatchStatus>,
    #[serde(default)]
    pub personal_rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreRef {
    pub name: String,
    pub tmdb_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreLink {
    pub genre: GenreRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub tmdb_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastEntry {
    pub role_name: String,
    pub actor: ActorSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub media_type: MediaType,
    pub release_year: i32,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    pub rating: f64,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub number_of_seasons: Option<String>,
    #[serde(default)]
    pub number_of_episodes: Option<String>,
    #[serde(default)]
    pub actors: Vec<CastEntry>,
    #[serde(default)]
    pub genres: Vec<GenreLink>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl MovieDetail {
    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|g| g.genre.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: i64,
    pub tmdb_id: i64,
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub deathday: Option<NaiveDate>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

/// Minimal movie fields embedded in a progress entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub title: String,
    pub media_type: MediaType,
    pub release_year: i32,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub movie_id: Option<i64>,
    pub status: WatchStatus,
    #[serde(default)]
    pub personal_rating: Option<u8>,
    pub movie: MovieSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub nickname: String,
    pub role: String,
    #[serde(default)]
    pub planned: Vec<ProgressEntry>,
    #[serde(default)]
    pub watching: Vec<ProgressEntry>,
    #[serde(default)]
    pub completed: Vec<ProgressEntry>,
    #[serde(default)]
    pub dropped: Vec<ProgressEntry>,
}

impl UserProfile {
    pub fn entries(&self, status: WatchStatus) -> &[ProgressEntry] {
        match status {
            WatchStatus::Planned => &self.planned,
            WatchStatus::Watching => &self.watching,
            WatchStatus::Completed => &self.completed,
            WatchStatus::Dropped => &self.dropped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
            && self.watching.is_empty()
            && self.completed.is_empty()
            && self.dropped.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    pub nickname: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProgressUpdate {
    pub status: Option<WatchStatus>,
    pub personal_rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewDraft {
    pub review_text: String,
    pub review_type: ReviewType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub review_text: String,
    pub review_type: ReviewType,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// The API emits both offset-aware and naive timestamps; naive ones are UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
