use crate::config::{ClientConfig, Endpoints};
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::models::{
    Actor, Genre, Movie, MovieDetail, MovieFilter, Page, ProgressUpdate, Review, ReviewDraft,
    TokenPair, UserAccount, UserProfile,
};
use crate::request::RequestDescriptor;
use crate::session::SessionManager;
use crate::storage::KeyValueStore;
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;

pub const MAX_PERSONAL_RATING: u8 = 10;

/// Typed entry points for every remote call the client makes. Everything is
/// routed through one [`RequestExecutor`], so credentials and retry behave the
/// same for all of them.
#[derive(Clone)]
pub struct CatalogApi {
    executor: Arc<RequestExecutor>,
    endpoints: Endpoints,
}

fn segment(id: impl Display) -> String {
    urlencoding::encode(&id.to_string()).into_owned()
}

fn join(base: &str, parts: &[&str]) -> String {
    let mut path = base.trim_end_matches('/').to_string();
    for part in parts {
        path.push('/');
        path.push_str(part);
    }
    path
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// JSON body for the progress upsert. A rating is only carried when a status
/// other than `planned` is set.
pub fn progress_payload(update: ProgressUpdate) -> Result<Value, ApiError> {
    let rating = match update.status {
        Some(status) if status.allows_rating() => update.personal_rating,
        _ => None,
    };
    if let Some(rating) = rating {
        if !(1..=MAX_PERSONAL_RATING).contains(&rating) {
            return Err(ApiError::Validation(format!(
                "personal rating must be between 1 and {MAX_PERSONAL_RATING}, got {rating}"
            )));
        }
    }
    Ok(json!({
        "status": update.status.map(|s| s.as_str()),
        "personal_rating": rating,
    }))
}

impl CatalogApi {
    /// Builds the full stack (session, executor) over `store` from `config`.
    pub fn connect(config: &ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let http = config
            .http_client()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let base = config
            .base_url()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let refresh_url = Self::endpoint_url(&base, &config.endpoints.refresh)?;
        let session = SessionManager::load(store, http.clone(), refresh_url)?;
        let executor = RequestExecutor::with_client(http, config, session)?;
        Ok(Self::new(Arc::new(executor), config.endpoints.clone()))
    }

    pub fn new(executor: Arc<RequestExecutor>, endpoints: Endpoints) -> Self {
        Self {
            executor,
            endpoints,
        }
    }

    fn endpoint_url(base: &reqwest::Url, endpoint: &str) -> Result<reqwest::Url, ApiError> {
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), endpoint);
        reqwest::Url::parse(&joined)
            .map_err(|e| ApiError::Validation(format!("invalid endpoint {endpoint:?}: {e}")))
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn session(&self) -> &SessionManager {
        self.executor.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub async fn register(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
    ) -> Result<UserAccount, ApiError> {
        require("email", email)?;
        require("nickname", nickname)?;
        require("password", password)?;
        let descriptor = RequestDescriptor::post(&self.endpoints.register).json(json!({
            "email": email.trim(),
            "nickname": nickname.trim(),
            "password": password,
        }));
        let account: UserAccount = self.executor.execute_as(&descriptor).await?;
        info!(nickname = %account.nickname, "account registered");
        Ok(account)
    }

    /// Exchanges credentials for a token pair and installs it as the session.
    /// `login` is an email or a nickname.
    pub async fn login(&self, login: &str, password: &str) -> Result<(), ApiError> {
        require("login", login)?;
        require("password", password)?;
        let descriptor = RequestDescriptor::post(&self.endpoints.login)
            .form([("username", login.trim()), ("password", password)]);
        let pair: TokenPair = self.executor.execute_as(&descriptor).await?;
        if pair.access_token.trim().is_empty() {
            return Err(ApiError::Protocol(
                "login response carried an empty access token".to_string(),
            ));
        }
        self.session()
            .set_tokens(&pair.access_token, pair.refresh_token.as_deref())?;
        info!("logged in");
        Ok(())
    }

    /// Local only: the server keeps no session to invalidate.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session().clear()?;
        info!("logged out");
        Ok(())
    }

    pub async fn genres(&self) -> Result<Vec<Genre>, ApiError> {
        self.executor
            .execute_as(&RequestDescriptor::get(&self.endpoints.genres))
            .await
    }

    pub async fn movie(&self, id: i64) -> Result<MovieDetail, ApiError> {
        let path = join(&self.endpoints.movies, &[&segment(id)]);
        self.executor.execute_as(&RequestDescriptor::get(path)).await
    }

    pub async fn search_movies(
        &self,
        text: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Movie>, ApiError> {
        require("search text", text)?;
        let descriptor = RequestDescriptor::get(&self.endpoints.movie_search)
            .param("search", text)
            .param("page", page.max(1))
            .param("page_size", page_size.max(1));
        self.executor.execute_as(&descriptor).await
    }

    pub async fn filter_movies(
        &self,
        filter: &MovieFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Movie>, ApiError> {
        let descriptor = RequestDescriptor::get(&self.endpoints.movie_filter)
            .param("page", page.max(1))
            .param("page_size", page_size.max(1))
            .opt_param("genre_ids", filter.genre_id)
            .opt_param("year_min", filter.year_min)
            .opt_param("year_max", filter.year_max)
            .opt_param("rating_min", filter.rating_min)
            .param("sort_by", filter.sort_by.as_str())
            .param("sort_direction", filter.sort_direction.as_str());
        self.executor.execute_as(&descriptor).await
    }

    pub async fn actor(&self, id: i64) -> Result<Actor, ApiError> {
        let path = join(&self.endpoints.actors, &[&segment(id)]);
        self.executor.execute_as(&RequestDescriptor::get(path)).await
    }

    pub async fn actor_movies(&self, id: i64) -> Result<Vec<Movie>, ApiError> {
        let path = join(&self.endpoints.actors, &[&segment(id), "movies"]);
        self.executor.execute_as(&RequestDescriptor::get(path)).await
    }

    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.executor
            .execute_as(&RequestDescriptor::get(&self.endpoints.profile))
            .await
    }

    pub async fn save_progress(&self, movie_id: i64, update: ProgressUpdate) -> Result<Value, ApiError> {
        let body = progress_payload(update)?;
        let path = join(&self.endpoints.movies, &[&segment(movie_id), "progress"]);
        self.executor
            .execute(&RequestDescriptor::post(path).json(body))
            .await
    }

    fn reviews_path(&self, movie_id: i64) -> String {
        join(&self.endpoints.reviews, &[&segment(movie_id), "reviews"])
    }

    fn review_body(draft: &ReviewDraft) -> Result<Value, ApiError> {
        require("review text", &draft.review_text)?;
        Ok(json!({
            "review_text": draft.review_text.trim(),
            "review_type": draft.review_type,
        }))
    }

    pub async fn create_review(&self, movie_id: i64, draft: &ReviewDraft) -> Result<Review, ApiError> {
        let descriptor = RequestDescriptor::post(self.reviews_path(movie_id)).json(Self::review_body(draft)?);
        self.executor.execute_as(&descriptor).await
    }

    pub async fn update_review(&self, movie_id: i64, draft: &ReviewDraft) -> Result<Review, ApiError> {
        let descriptor = RequestDescriptor::patch(self.reviews_path(movie_id)).json(Self::review_body(draft)?);
        self.executor.execute_as(&descriptor).await
    }

    /// Deletes the caller's own review, or the one named by `review_id`
    /// (moderation).
    pub async fn delete_review(&self, movie_id: i64, review_id: Option<i64>) -> Result<(), ApiError> {
        let descriptor =
            RequestDescriptor::delete(self.reviews_path(movie_id)).opt_param("review_id", review_id);
        self.executor.execute(&descriptor).await?;
        Ok(())
    }
}
