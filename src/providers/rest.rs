use crate::core::backend::ExpenseBackend;
use crate::core::error::ApiError;
use crate::core::filters::ExpenseFilters;
use crate::core::models::{
    AuthSession, Category, CategoryUpdate, Credentials, Currency, CurrencyUpdate, Expense,
    ExpensePage, ExpenseSummary, ExpenseUpdate, GoogleAuthRequest, NewCategory, NewCurrency,
    NewExpense, SignupRequest, User,
};
use crate::core::session::SessionStore;
use crate::core::validation;
use crate::providers::envelope::{self, Envelope};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = "spendlog/0.1";

/// Client for the expense tracker's REST API.
///
/// Every request carries the session's bearer token when one is stored. A 401
/// from any endpoint ends the session before the error is returned.
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl RestBackend {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::Transport(format!("invalid URL for {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Envelope<Value>, ApiError> {
        let url = self.url(path, query)?;
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = self.session.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let parsed = if text.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(body) => Some(envelope::from_body(body)),
                Err(e) => {
                    debug!(error = %e, body = %text, "Response body is not JSON");
                    None
                }
            }
        };

        if status == StatusCode::UNAUTHORIZED && self.session.clear() {
            warn!("Backend rejected the session token; signed out");
        }

        if !status.is_success() {
            let (message, errors) = parsed
                .map(|e| (e.message, e.errors.unwrap_or_default()))
                .unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
                errors,
            });
        }

        let envelope = match parsed {
            Some(envelope) => envelope,
            None if text.trim().is_empty() => Envelope::empty(),
            None => return Err(ApiError::Decode(format!("non-JSON body from {path}"))),
        };

        if !envelope.success {
            return Err(ApiError::Logical {
                status: status.as_u16(),
                message: envelope.message,
                errors: envelope.errors.unwrap_or_default(),
            });
        }
        Ok(envelope)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Envelope<Value>, ApiError> {
        self.send(Method::GET, path, query, None).await
    }

    async fn write<P: Serialize>(
        &self,
        method: Method,
        path: &str,
        payload: &P,
    ) -> Result<Envelope<Value>, ApiError> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send(method, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, &[], None).await.map(|_| ())
    }

    fn store_token(&self, auth: &AuthSession) {
        if let Err(e) = self.session.set(auth.token.clone()) {
            warn!(error = %e, "Signed in, but the session could not be persisted");
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, ApiError> {
        let envelope = self.write(Method::POST, "/api/auth/signup", request).await?;
        required(envelope.data, "user")
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn signin(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        let envelope = self
            .write(Method::POST, "/api/auth/signin", credentials)
            .await?;
        let auth: AuthSession = required(envelope.data, "session")?;
        self.store_token(&auth);
        Ok(auth)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn google_auth(&self, request: &GoogleAuthRequest) -> Result<AuthSession, ApiError> {
        let envelope = self.write(Method::POST, "/api/auth/google", request).await?;
        let auth: AuthSession = required(envelope.data, "session")?;
        self.store_token(&auth);
        Ok(auth)
    }

    /// Ends the local session. The backend keeps no session state to revoke.
    pub fn logout(&self) -> bool {
        self.session.clear()
    }

    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<User, ApiError> {
        if !self.session.is_signed_in() {
            return Err(ApiError::NotAuthenticated);
        }
        let envelope = self.get("/api/auth/profile", &[]).await?;
        required(envelope.data, "user")
    }

    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let envelope = self.get("/api/categories", &[]).await?;
        Ok(envelope::categories(envelope.data))
    }

    #[instrument(skip(self, payload))]
    pub async fn create_category(
        &self,
        payload: NewCategory,
    ) -> Result<Option<Category>, ApiError> {
        let payload = validation::new_category(payload)?;
        let envelope = self.write(Method::POST, "/api/categories", &payload).await?;
        Ok(written(envelope.data, "category"))
    }

    #[instrument(skip(self, payload))]
    pub async fn update_category(
        &self,
        id: i64,
        payload: CategoryUpdate,
    ) -> Result<Option<Category>, ApiError> {
        let payload = validation::category_update(payload)?;
        let path = format!("/api/categories/{id}");
        let envelope = self.write(Method::PUT, &path, &payload).await?;
        Ok(written(envelope.data, "category"))
    }

    /// Expenses linked to the category are left in place with their
    /// `categoryId` unchanged.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/categories/{id}")).await
    }

    #[instrument(skip(self))]
    pub async fn currencies(&self) -> Result<Vec<Currency>, ApiError> {
        let envelope = self.get("/api/currencies", &[]).await?;
        Ok(envelope::currencies(envelope.data))
    }

    #[instrument(skip(self, payload))]
    pub async fn create_currency(
        &self,
        payload: NewCurrency,
    ) -> Result<Option<Currency>, ApiError> {
        let payload = validation::new_currency(payload)?;
        let envelope = self.write(Method::POST, "/api/currencies", &payload).await?;
        Ok(written(envelope.data, "currency"))
    }

    #[instrument(skip(self, payload))]
    pub async fn update_currency(
        &self,
        id: i64,
        payload: CurrencyUpdate,
    ) -> Result<Option<Currency>, ApiError> {
        let payload = validation::currency_update(payload)?;
        let path = format!("/api/currencies/{id}");
        let envelope = self.write(Method::PUT, &path, &payload).await?;
        Ok(written(envelope.data, "currency"))
    }

    #[instrument(skip(self))]
    pub async fn delete_currency(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/currencies/{id}")).await
    }

    #[instrument(skip(self))]
    pub async fn expenses(&self, filters: &ExpenseFilters) -> Result<ExpensePage, ApiError> {
        let envelope = self.get("/api/expenses", &filters.list_query()).await?;
        Ok(envelope::expense_page(envelope))
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, filters: &ExpenseFilters) -> Result<ExpenseSummary, ApiError> {
        let envelope = self
            .get("/api/expenses/summary", &filters.date_query())
            .await?;
        Ok(envelope::summary(envelope.data))
    }

    #[instrument(skip(self, payload))]
    pub async fn create_expense(
        &self,
        payload: NewExpense,
    ) -> Result<Option<Expense>, ApiError> {
        let payload = validation::new_expense(payload)?;
        let envelope = self.write(Method::POST, "/api/expenses", &payload).await?;
        Ok(written(envelope.data, "expense"))
    }

    #[instrument(skip(self, payload))]
    pub async fn update_expense(
        &self,
        id: i64,
        payload: ExpenseUpdate,
    ) -> Result<Option<Expense>, ApiError> {
        let payload = validation::expense_update(payload)?;
        let path = format!("/api/expenses/{id}");
        let envelope = self.write(Method::PUT, &path, &payload).await?;
        Ok(written(envelope.data, "expense"))
    }

    #[instrument(skip(self))]
    pub async fn delete_expense(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/expenses/{id}")).await
    }
}

/// The record echoed back by a successful write. Some backends confirm with
/// `success` alone, so a missing record is not an error.
fn written<T: DeserializeOwned>(data: Option<Value>, key: &str) -> Option<T> {
    let record = data.and_then(|value| envelope::unwrap_object(value, key));
    if record.is_none() {
        debug!("Write succeeded without returning the {key}");
    }
    record
}

/// Pulls a single record out of `data`, failing when it is absent.
fn required<T: DeserializeOwned>(data: Option<Value>, key: &str) -> Result<T, ApiError> {
    data.and_then(|value| envelope::unwrap_object(value, key))
        .ok_or_else(|| ApiError::Decode(format!("response is missing {key}")))
}

#[async_trait]
impl ExpenseBackend for RestBackend {
    async fn fetch_summary(&self, filters: &ExpenseFilters) -> Result<ExpenseSummary, ApiError> {
        self.summary(filters).await
    }

    async fn fetch_expenses(&self, filters: &ExpenseFilters) -> Result<ExpensePage, ApiError> {
        self.expenses(filters).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.categories().await
    }

    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ApiError> {
        self.currencies().await
    }
}
