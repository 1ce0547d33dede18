//! Reqwest-backed mining API client.
//!
//! This adapter owns transport details only: URL construction, timeouts,
//! JSON decoding and the mapping of error payloads back into
//! [`BackendError`] values the session can act on.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::client::{BackendError, MiningBackend};
use crate::domain::ports::{
    ClaimMiningResponse, CreateUserRequest, CreateUserResponse, PurchaseReceipt,
};
use crate::domain::{
    BoostDefinition, BoostDefinitionId, BoostGrant, Error, ErrorCode, ExternalId, ReferralRecord,
    User, UserId,
};

const API_PREFIX: [&str; 2] = ["api", "v1"];
const DEFAULT_USER_AGENT: &str = "pointminer-client/0.1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseBody {
    boost_definition_id: BoostDefinitionId,
}

/// Mining backend adapter speaking JSON over HTTP.
pub struct HttpMiningBackend {
    client: Client,
    base: Url,
}

impl HttpMiningBackend {
    /// Build an adapter for the API rooted at `base` with a per-request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        build_endpoint(&self.base, segments)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref())
            .map_err(|error| BackendError::decode(format!("invalid JSON payload: {error}")))
    }
}

fn build_endpoint(base: &Url, segments: &[&str]) -> Result<Url, BackendError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| BackendError::transport(format!("base URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(API_PREFIX)
        .extend(segments);
    Ok(url)
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::timeout(error.to_string())
    } else {
        BackendError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> BackendError {
    if let Ok(error) = serde_json::from_slice::<Error>(body) {
        return BackendError::rejected(error.code(), error.message());
    }
    let message = format!("status {}", status.as_u16());
    match status {
        StatusCode::NOT_FOUND => BackendError::rejected(ErrorCode::NotFound, message),
        StatusCode::CONFLICT => BackendError::rejected(ErrorCode::Conflict, message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::timeout(message),
        _ if status.is_client_error() => BackendError::rejected(ErrorCode::InvalidRequest, message),
        _ => BackendError::transport(message),
    }
}

#[async_trait]
impl MiningBackend for HttpMiningBackend {
    async fn lookup_user(&self, external_id: &ExternalId) -> Result<Option<User>, BackendError> {
        let url = self.endpoint(&["users", "by-external-id", external_id.as_ref()])?;
        match self.send::<User>(self.client.get(url)).await {
            Ok(user) => Ok(Some(user)),
            Err(error) if error.code() == Some(ErrorCode::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_user(
        &self,
        request: &CreateUserRequest,
    ) -> Result<CreateUserResponse, BackendError> {
        let url = self.endpoint(&["users"])?;
        self.send(self.client.post(url).json(request)).await
    }

    async fn find_user(&self, user_id: &UserId) -> Result<User, BackendError> {
        let id = user_id.to_string();
        let url = self.endpoint(&["users", &id])?;
        self.send(self.client.get(url)).await
    }

    async fn claim_mining(&self, user_id: &UserId) -> Result<ClaimMiningResponse, BackendError> {
        let id = user_id.to_string();
        let url = self.endpoint(&["users", &id, "mining", "claim"])?;
        self.send(self.client.post(url)).await
    }

    async fn boost_catalog(&self) -> Result<Vec<BoostDefinition>, BackendError> {
        let url = self.endpoint(&["boosts"])?;
        self.send(self.client.get(url)).await
    }

    async fn list_active_boosts(
        &self,
        user_id: &UserId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<BoostGrant>, BackendError> {
        let id = user_id.to_string();
        let mut url = self.endpoint(&["users", &id, "boosts"])?;
        if let Some(as_of) = as_of {
            url.query_pairs_mut()
                .append_pair("asOf", &as_of.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        self.send(self.client.get(url)).await
    }

    async fn purchase_boost(
        &self,
        user_id: &UserId,
        boost_definition_id: BoostDefinitionId,
    ) -> Result<PurchaseReceipt, BackendError> {
        let id = user_id.to_string();
        let url = self.endpoint(&["users", &id, "boosts"])?;
        let body = PurchaseBody {
            boost_definition_id,
        };
        self.send(self.client.post(url).json(&body)).await
    }

    async fn list_referrals(&self, user_id: &UserId) -> Result<Vec<ReferralRecord>, BackendError> {
        let id = user_id.to_string();
        let url = self.endpoint(&["users", &id, "referrals"])?;
        self.send(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the non-network helpers.

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn base(raw: &str) -> Url {
        Url::parse(raw).expect("valid base URL")
    }

    #[rstest]
    #[case("http://localhost:8080", "http://localhost:8080/api/v1/boosts")]
    #[case("http://localhost:8080/", "http://localhost:8080/api/v1/boosts")]
    #[case("https://mine.test/proxy/", "https://mine.test/proxy/api/v1/boosts")]
    fn endpoints_nest_under_the_base_path(#[case] root: &str, #[case] expected: &str) {
        let url = build_endpoint(&base(root), &["boosts"]).expect("endpoint");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    fn external_ids_are_percent_encoded() {
        let url = build_endpoint(&base("http://localhost"), &["users", "by-external-id", "a/b c"])
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "http://localhost/api/v1/users/by-external-id/a%2Fb%20c"
        );
    }

    #[rstest]
    fn cannot_be_a_base_urls_are_rejected() {
        let error = build_endpoint(&base("mailto:ops@mine.test"), &["boosts"])
            .expect_err("mailto has no path");
        assert!(matches!(error, BackendError::Transport { .. }));
    }

    #[rstest]
    fn error_payloads_keep_their_domain_code() {
        let body = json!({ "code": "insufficient_funds", "message": "balance too low" });
        let error = map_status_error(
            StatusCode::PAYMENT_REQUIRED,
            body.to_string().as_bytes(),
        );
        assert_eq!(
            error,
            BackendError::rejected(ErrorCode::InsufficientFunds, "balance too low")
        );
    }

    #[rstest]
    #[case(StatusCode::NOT_FOUND, Some(ErrorCode::NotFound))]
    #[case(StatusCode::BAD_REQUEST, Some(ErrorCode::InvalidRequest))]
    #[case(StatusCode::BAD_GATEWAY, None)]
    fn opaque_bodies_fall_back_to_the_status(
        #[case] status: StatusCode,
        #[case] code: Option<ErrorCode>,
    ) {
        let error = map_status_error(status, b"<html>proxy error</html>");
        assert_eq!(error.code(), code);
    }

    #[rstest]
    fn gateway_timeouts_are_timeouts() {
        let error = map_status_error(StatusCode::GATEWAY_TIMEOUT, b"");
        assert!(matches!(error, BackendError::Timeout { .. }));
    }
}
