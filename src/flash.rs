//! One-shot user notices carried across a redirect.
//!
//! Messages are queued in a cookie holding base64-encoded JSON. The next
//! rendered page drains them and clears the cookie.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Cookie holding queued messages.
pub const FLASH_COOKIE_NAME: &str = "drumbeat_messages";

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

/// A single queued notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Extractor and response part for flash messages.
///
/// Handlers take a `Flash`, queue messages on it and return it alongside
/// their redirect so the cookie is written.
#[derive(Debug, Clone)]
pub struct Flash {
    jar: CookieJar,
}

impl Flash {
    pub fn from_jar(jar: CookieJar) -> Self {
        Self { jar }
    }

    /// Queue a message of the given level.
    pub fn push(self, level: Level, message: impl Into<String>) -> Self {
        let mut queued = self.queued();
        queued.push(FlashMessage::new(level, message));
        let cookie = Cookie::build((FLASH_COOKIE_NAME, encode(&queued)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        Self {
            jar: self.jar.add(cookie),
        }
    }

    pub fn info(self, message: impl Into<String>) -> Self {
        self.push(Level::Info, message)
    }

    pub fn success(self, message: impl Into<String>) -> Self {
        self.push(Level::Success, message)
    }

    pub fn error(self, message: impl Into<String>) -> Self {
        self.push(Level::Error, message)
    }

    /// Take every queued message and clear the cookie.
    pub fn drain(self) -> (Self, Vec<FlashMessage>) {
        let queued = self.queued();
        if queued.is_empty() && self.jar.get(FLASH_COOKIE_NAME).is_none() {
            return (self, queued);
        }

        let expired = Cookie::build((FLASH_COOKIE_NAME, ""))
            .path("/")
            .max_age(time::Duration::seconds(0))
            .build();
        (
            Self {
                jar: self.jar.add(expired),
            },
            queued,
        )
    }

    fn queued(&self) -> Vec<FlashMessage> {
        self.jar
            .get(FLASH_COOKIE_NAME)
            .map(|c| decode(c.value()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state).await?;
        Ok(Self { jar })
    }
}

impl IntoResponseParts for Flash {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}

/// Encode messages into a cookie-safe value.
pub fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cookie value; anything malformed reads as no messages.
pub fn decode(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}
