//! services/booking/src/adapters/http.rs
//!
//! This module contains the marketplace adapter, which is the concrete
//! implementation of the `MarketplaceService` port from the `core` crate.
//! It handles all interactions with the tutoring marketplace REST API
//! using `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use tutorboard_core::domain::{
    BookingConfirmation, CreditBalance, Session, SessionStatus, Teacher,
};
use tutorboard_core::ports::{AuthContext, MarketplaceService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `MarketplaceService` port.
///
/// Requests are single-shot: loads are re-triggered by the user, and a
/// booking submission must never be duplicated, so nothing here retries.
#[derive(Clone)]
pub struct HttpMarketplaceAdapter {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn AuthContext>,
}

impl HttpMarketplaceAdapter {
    /// Creates a new `HttpMarketplaceAdapter` for one API base URL.
    pub fn new(base_url: String, auth: Arc<dyn AuthContext>) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PortError::Unexpected(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn token(&self) -> PortResult<String> {
        self.auth.bearer_token().ok_or(PortError::Unauthorized)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> PortResult<T> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("HTTP request failed: {e}")))?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> PortResult<T> {
        let token = self.token()?;
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("HTTP request failed: {e}")))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> PortResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to read response body: {e}")))?;
        debug!(status = %status, "marketplace response received");

        if status.is_success() {
            serde_json::from_str(&body)
                .map_err(|e| PortError::Unexpected(format!("failed to parse API response: {e}")))
        } else {
            Err(Self::map_error(status, &body))
        }
    }

    /// Maps a non-2xx response onto the port error taxonomy. A refusal with
    /// an `{"error": ...}` body keeps the server's message word for word,
    /// because that message is what gets shown next to the booking control.
    fn map_error(status: StatusCode, body: &str) -> PortError {
        let server_message = serde_json::from_str::<ErrorRecord>(body)
            .ok()
            .map(|record| record.error);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
            StatusCode::NOT_FOUND => PortError::NotFound(
                server_message.unwrap_or_else(|| "resource not found".to_string()),
            ),
            _ => match server_message {
                Some(message) => PortError::Rejected(message),
                None => PortError::Unexpected(format!("API returned {status}: {body}")),
            },
        }
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct ErrorRecord {
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: Uuid,
    teacher_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    price_credits: u32,
    #[serde(default)]
    meeting_link: Option<String>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        // Anything unrecognized is treated as not bookable.
        let status = match self.status.as_str() {
            "open" => SessionStatus::Open,
            "booked" => SessionStatus::Booked,
            _ => SessionStatus::Cancelled,
        };
        Session {
            id: self.id,
            teacher_id: self.teacher_id,
            start_at: self.start_at,
            end_at: self.end_at,
            status,
            price_credits: self.price_credits,
            meeting_link: self.meeting_link,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeacherRecord {
    id: Uuid,
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    rating_avg: f32,
    #[serde(default)]
    rating_count: u32,
    #[serde(default)]
    followers_count: u32,
    #[serde(default)]
    avatar_url: Option<String>,
}
impl TeacherRecord {
    fn to_domain(self) -> Teacher {
        Teacher {
            id: self.id,
            name: self.name,
            country: self.country,
            bio: self.bio,
            rating_avg: self.rating_avg,
            rating_count: self.rating_count,
            followers_count: self.followers_count,
            avatar_url: self.avatar_url,
        }
    }
}

#[derive(Deserialize)]
struct BalanceRecord {
    balance: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingRecord {
    booking_id: Uuid,
    session: SessionRecord,
}

//=========================================================================================
// `MarketplaceService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MarketplaceService for HttpMarketplaceAdapter {
    async fn list_teachers(&self) -> PortResult<Vec<Teacher>> {
        let records: Vec<TeacherRecord> = self.get_json("/teachers", &[]).await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_open_sessions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        teacher_id: Option<Uuid>,
    ) -> PortResult<Vec<Session>> {
        let mut query = vec![
            ("status".to_string(), "open".to_string()),
            ("from".to_string(), from.to_rfc3339()),
            ("to".to_string(), to.to_rfc3339()),
        ];
        if let Some(teacher_id) = teacher_id {
            query.push(("teacherId".to_string(), teacher_id.to_string()));
        }

        let records: Vec<SessionRecord> = self.get_json("/sessions", &query).await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn credit_balance(&self) -> PortResult<CreditBalance> {
        let record: BalanceRecord = self.get_json("/credits/balance", &[]).await?;
        Ok(CreditBalance {
            balance: record.balance,
        })
    }

    async fn create_booking(&self, session_id: Uuid) -> PortResult<BookingConfirmation> {
        let body = serde_json::json!({ "sessionId": session_id });
        let record: BookingRecord = self.post_json("/bookings", &body).await?;
        Ok(BookingConfirmation {
            booking_id: record.booking_id,
            session: record.session.to_domain(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::StaticTokenAuth;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_adapter(base_url: &str) -> HttpMarketplaceAdapter {
        HttpMarketplaceAdapter::new(
            base_url.to_string(),
            Arc::new(StaticTokenAuth::new(Some("test-token".to_string()))),
        )
        .unwrap()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let from = "2024-06-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        (from, from + chrono::Duration::days(30))
    }

    fn session_json(id: &Uuid, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "teacherId": Uuid::from_u128(7),
            "startAt": "2024-06-10T14:00:00Z",
            "endAt": "2024-06-10T14:50:00Z",
            "status": status,
            "priceCredits": 12
        })
    }

    #[tokio::test]
    async fn list_open_sessions_sends_window_and_auth() {
        let server = MockServer::start().await;
        let id = Uuid::from_u128(1);

        Mock::given(method("GET"))
            .and(path("/sessions"))
            .and(query_param("status", "open"))
            .and(query_param("from", "2024-06-01T00:00:00+00:00"))
            .and(query_param("to", "2024-07-01T00:00:00+00:00"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([
                    session_json(&id, "open")
                ])),
            )
            .mount(&server)
            .await;

        let (from, to) = window();
        let sessions = test_adapter(&server.uri())
            .list_open_sessions(from, to, None)
            .await
            .unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].status, SessionStatus::Open);
        assert_eq!(sessions[0].price_credits, 12);
        assert_eq!(sessions[0].meeting_link, None);
    }

    #[tokio::test]
    async fn list_open_sessions_passes_the_teacher_filter() {
        let server = MockServer::start().await;
        let teacher_id = Uuid::from_u128(7);

        Mock::given(method("GET"))
            .and(path("/sessions"))
            .and(query_param("teacherId", teacher_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let (from, to) = window();
        let sessions = test_adapter(&server.uri())
            .list_open_sessions(from, to, Some(teacher_id))
            .await
            .unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn non_open_statuses_survive_decoding_for_the_caller_to_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                session_json(&Uuid::from_u128(1), "open"),
                session_json(&Uuid::from_u128(2), "booked"),
                session_json(&Uuid::from_u128(3), "something-new"),
            ])))
            .mount(&server)
            .await;

        let (from, to) = window();
        let sessions = test_adapter(&server.uri())
            .list_open_sessions(from, to, None)
            .await
            .unwrap();

        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[1].status, SessionStatus::Booked);
        // Unknown statuses decode to a non-bookable state instead of failing.
        assert_eq!(sessions[2].status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn list_teachers_decodes_profiles() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/teachers"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": Uuid::from_u128(7),
                "name": "Ana Silva",
                "country": "Brazil",
                "bio": "Conversational Portuguese.",
                "ratingAvg": 4.8,
                "ratingCount": 120,
                "followersCount": 54,
                "avatarUrl": "https://img.example/ana.png"
            }])))
            .mount(&server)
            .await;

        let teachers = test_adapter(&server.uri()).list_teachers().await.unwrap();
        assert_eq!(teachers.len(), 1);
        assert_eq!(teachers[0].name, "Ana Silva");
        assert_eq!(teachers[0].rating_count, 120);
        assert_eq!(
            teachers[0].avatar_url.as_deref(),
            Some("https://img.example/ana.png")
        );
    }

    #[tokio::test]
    async fn credit_balance_decodes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/credits/balance"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"balance": 42})),
            )
            .mount(&server)
            .await;

        let balance = test_adapter(&server.uri()).credit_balance().await.unwrap();
        assert_eq!(balance.balance, 42);
    }

    #[tokio::test]
    async fn create_booking_returns_the_meeting_link() {
        let server = MockServer::start().await;
        let session_id = Uuid::from_u128(1);

        let mut booked = session_json(&session_id, "booked");
        booked["meetingLink"] = serde_json::json!("https://meet.example/abc");

        Mock::given(method("POST"))
            .and(path("/bookings"))
            .and(header("authorization", "Bearer test-token"))
            .and(wiremock::matchers::body_json(
                serde_json::json!({"sessionId": session_id}),
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "bookingId": Uuid::from_u128(100),
                "session": booked
            })))
            .mount(&server)
            .await;

        let confirmation = test_adapter(&server.uri())
            .create_booking(session_id)
            .await
            .unwrap();

        assert_eq!(confirmation.booking_id, Uuid::from_u128(100));
        assert_eq!(
            confirmation.session.meeting_link.as_deref(),
            Some("https://meet.example/abc")
        );
    }

    #[tokio::test]
    async fn create_booking_surfaces_the_server_refusal_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bookings"))
            .respond_with(ResponseTemplate::new(409).set_body_json(
                serde_json::json!({"error": "slot no longer available"}),
            ))
            .mount(&server)
            .await;

        let result = test_adapter(&server.uri())
            .create_booking(Uuid::from_u128(1))
            .await;

        match result {
            Err(PortError::Rejected(message)) => {
                assert_eq!(message, "slot no longer available");
            }
            other => panic!("expected a rejection, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_token_maps_to_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/credits/balance"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                serde_json::json!({"error": "token expired"}),
            ))
            .mount(&server)
            .await;

        let result = test_adapter(&server.uri()).credit_balance().await;
        assert!(matches!(result, Err(PortError::Unauthorized)));
    }

    #[tokio::test]
    async fn missing_token_never_reaches_the_network() {
        let server = MockServer::start().await;
        let adapter = HttpMarketplaceAdapter::new(
            server.uri(),
            Arc::new(StaticTokenAuth::new(None)),
        )
        .unwrap();

        let result = adapter.list_teachers().await;
        assert!(matches!(result, Err(PortError::Unauthorized)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
