use reqwest::multipart::{Form, Part};
use serde_json::json;

use storyfeed_types::{AuthToken, Email, Password, StoryItem};

use crate::envelope::{LoginBody, NoBody, StoryListBody};
use crate::transport::send_and_decode;
use crate::{ApiConfig, ApiError, LoginResult, PageQuery, StoryApi, StoryUpload};

const PHOTO_MIME: &str = "image/jpeg";

/// [`StoryApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStoryApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStoryApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .https_only(config.https_only())
            .user_agent(concat!("storyfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config.base_url()))
    }

    /// Use an existing client (shared connection pool).
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl StoryApi for HttpStoryApi {
    async fn login(&self, email: &Email, password: &Password) -> Result<LoginResult, ApiError> {
        tracing::debug!(email = %email, "Logging in");
        let request = self.client.post(self.endpoint("login")).json(&json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        }));
        let body: LoginBody = send_and_decode(request, "login").await?;
        Ok(body.login_result)
    }

    async fn register(&self, name: &str, email: &Email, password: &Password) -> Result<(), ApiError> {
        tracing::debug!(email = %email, "Registering account");
        let request = self.client.post(self.endpoint("register")).json(&json!({
            "name": name,
            "email": email.as_str(),
            "password": password.expose_secret(),
        }));
        let _: NoBody = send_and_decode(request, "register").await?;
        Ok(())
    }

    async fn list_stories(
        &self,
        query: PageQuery,
        token: &AuthToken,
    ) -> Result<Vec<StoryItem>, ApiError> {
        let mut params: Vec<(&str, String)> = vec![("page", query.page.to_string())];
        if let Some(size) = query.size {
            params.push(("size", size.to_string()));
        }
        params.push(("location", query.location.query_value().to_string()));

        let request = self
            .client
            .get(self.endpoint("stories"))
            .query(&params)
            .bearer_auth(token.expose_secret());
        let body: StoryListBody = send_and_decode(request, "stories").await?;
        Ok(body.list_story)
    }

    async fn create_story(&self, token: &AuthToken, upload: StoryUpload) -> Result<(), ApiError> {
        let StoryUpload {
            description,
            file_name,
            image,
        } = upload;
        tracing::debug!(file_name = %file_name, bytes = image.len(), "Uploading story");

        let photo = Part::bytes(image)
            .file_name(file_name)
            .mime_str(PHOTO_MIME)
            .map_err(|e| ApiError::Network(format!("invalid photo part: {e}")))?;
        let form = Form::new().text("description", description).part("photo", photo);

        let request = self
            .client
            .post(self.endpoint("stories"))
            .bearer_auth(token.expose_secret())
            .multipart(form);
        let _: NoBody = send_and_decode(request, "stories").await?;
        Ok(())
    }
}
