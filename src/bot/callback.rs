//! Inline button payloads.
//!
//! Every button carries `"{tag}|{media_type}|{id}"`, e.g. `req|movie|438631`.
//! Telegram limits callback data to 64 bytes, which this format stays far
//! below.

use crate::overseerr::MediaType;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tag for "request download" buttons
pub const REQUEST_TAG: &str = "req";
/// Tag for "show recommendations" buttons
pub const RECOMMENDATIONS_TAG: &str = "rec";

const SEPARATOR: char = '|';

/// What a button press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    /// Create (and approve) a request
    Request,
    /// Show recommendations for the title
    Recommendations,
}

impl CallbackKind {
    /// Payload tag for this action
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Request => REQUEST_TAG,
            Self::Recommendations => RECOMMENDATIONS_TAG,
        }
    }
}

/// A decoded button payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackAction {
    /// Requested action
    pub kind: CallbackKind,
    /// Media type of the title
    pub media_type: MediaType,
    /// TMDb id of the title
    pub media_id: u64,
}

/// Why a payload could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackParseError {
    /// Not one of our tags; the press is ignored
    #[error("unknown callback action: {0}")]
    UnknownAction(String),
    /// Known tag but not three fields
    #[error("malformed callback payload: {0}")]
    Malformed(String),
    /// Known tag with an unsupported media type
    #[error("unsupported media type in callback: {0}")]
    MediaType(String),
    /// Known tag with a non-numeric id
    #[error("invalid identifier in callback: {0}")]
    InvalidId(String),
}

impl CallbackAction {
    /// Builds a request action
    #[must_use]
    pub const fn request(media_type: MediaType, media_id: u64) -> Self {
        Self {
            kind: CallbackKind::Request,
            media_type,
            media_id,
        }
    }

    /// Builds a recommendations action
    #[must_use]
    pub const fn recommendations(media_type: MediaType, media_id: u64) -> Self {
        Self {
            kind: CallbackKind::Recommendations,
            media_type,
            media_id,
        }
    }

    /// Encodes the action as button callback data
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.kind.tag(),
            self.media_type.as_str(),
            self.media_id
        )
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut parts = data.splitn(3, SEPARATOR);
        let tag = parts.next().unwrap_or_default();
        let kind = match tag {
            REQUEST_TAG => CallbackKind::Request,
            RECOMMENDATIONS_TAG => CallbackKind::Recommendations,
            _ => return Err(CallbackParseError::UnknownAction(data.to_string())),
        };

        let (Some(media_type), Some(media_id)) = (parts.next(), parts.next()) else {
            return Err(CallbackParseError::Malformed(data.to_string()));
        };

        let media_type = media_type
            .parse::<MediaType>()
            .map_err(|_| CallbackParseError::MediaType(media_type.to_string()))?;
        let media_id = media_id
            .parse::<u64>()
            .map_err(|_| CallbackParseError::InvalidId(media_id.to_string()))?;

        Ok(Self {
            kind,
            media_type,
            media_id,
        })
    }
}

/// Decodes a payload, remembering which action it targeted on failure.
///
/// # Errors
///
/// Returns the parse error together with the recognized action kind, if any.
pub fn decode(data: &str) -> Result<CallbackAction, (Option<CallbackKind>, CallbackParseError)> {
    let kind = match data.split(SEPARATOR).next() {
        Some(REQUEST_TAG) => Some(CallbackKind::Request),
        Some(RECOMMENDATIONS_TAG) => Some(CallbackKind::Recommendations),
        _ => None,
    };
    data.parse().map_err(|e| (kind, e))
}
