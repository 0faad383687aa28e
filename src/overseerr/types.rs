//! Wire and domain types for the Overseerr API.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media Overseerr can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Feature film
    Movie,
    /// TV series
    Tv,
}

impl MediaType {
    /// Path segment / wire value for this media type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// Human readable label used in captions
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv series",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known media type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type: {0}")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(UnknownMediaType(other.to_string())),
        }
    }
}

/// Library availability of a title, following Overseerr's `MediaStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No media info or status 1
    Unknown,
    /// Requested, awaiting approval
    Pending,
    /// Approved and downloading
    Processing,
    /// Some seasons/episodes are in the library
    PartiallyAvailable,
    /// Fully in the library
    Available,
}

impl Availability {
    /// Maps a numeric `MediaStatus` code; anything past 5 counts as available
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            i64::MIN..=1 => Self::Unknown,
            2 => Self::Pending,
            3 => Self::Processing,
            4 => Self::PartiallyAvailable,
            _ => Self::Available,
        }
    }

    /// Whether the title is already in the library (partially counts)
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::PartiallyAvailable | Self::Available)
    }
}

/// `mediaInfo.status` may be numeric or a status name
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StatusValue {
    Code(i64),
    Name(String),
}

impl StatusValue {
    fn availability(&self) -> Availability {
        match self {
            Self::Code(code) => Availability::from_code(*code),
            Self::Name(name) if name.eq_ignore_ascii_case("AVAILABLE") => Availability::Available,
            Self::Name(_) => Availability::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MediaInfo {
    #[serde(default)]
    status: Option<StatusValue>,
}

/// Raw result record as returned by search and recommendation endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// TMDb id
    pub id: Option<u64>,
    /// `movie`, `tv` or `person`
    #[serde(alias = "media_type")]
    pub media_type: Option<String>,
    /// Movie title
    pub title: Option<String>,
    /// TV series name
    pub name: Option<String>,
    /// Movie release date
    #[serde(alias = "release_date")]
    pub release_date: Option<String>,
    /// TV first air date
    #[serde(alias = "first_air_date")]
    pub first_air_date: Option<String>,
    /// Poster path relative to the image base
    #[serde(alias = "poster_path")]
    pub poster_path: Option<String>,
    #[serde(default)]
    media_info: Option<MediaInfo>,
}

/// Paged result envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultPage {
    /// Result records on this page
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

/// A renderable search or recommendation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultItem {
    /// TMDb id
    pub id: u64,
    /// Movie or TV
    pub media_type: MediaType,
    /// Display title
    pub title: String,
    /// Four digit year, if known
    pub year: Option<String>,
    /// Poster path relative to the image base
    pub poster_path: Option<String>,
    /// Library availability
    pub availability: Availability,
}

impl ResultRecord {
    /// Converts the record into a [`SearchResultItem`].
    ///
    /// `fallback_type` is used when the record carries no media type.
    /// Returns `None` for records without an id or with a media type other
    /// than movie/tv (people, collections).
    #[must_use]
    pub fn into_item(self, fallback_type: MediaType) -> Option<SearchResultItem> {
        let id = self.id?;
        let media_type = match self.media_type.as_deref() {
            None => fallback_type,
            Some(raw) => raw.parse().ok()?,
        };

        let year = non_blank(self.release_date)
            .or_else(|| non_blank(self.first_air_date))
            .filter(|date| date.len() >= 4)
            .and_then(|date| date.get(..4).map(ToString::to_string));

        let availability = self
            .media_info
            .and_then(|info| info.status)
            .map_or(Availability::Unknown, |status| status.availability());

        Some(SearchResultItem {
            id,
            media_type,
            title: non_blank(self.title)
                .or_else(|| non_blank(self.name))
                .unwrap_or_else(|| "(untitled)".to_string()),
            year,
            poster_path: self.poster_path.filter(|p| !p.is_empty()),
            availability,
        })
    }
}

/// Empty and whitespace-only strings count as missing
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// External identifiers attached to a details response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIds {
    /// IMDb id, e.g. `tt1160419`
    #[serde(alias = "imdb_id")]
    pub imdb_id: Option<String>,
}

/// A video linked from a details response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedVideo {
    /// Full watch URL
    pub url: Option<String>,
    /// Hosting site, e.g. `YouTube`
    pub site: Option<String>,
    /// `Trailer`, `Teaser`, `Clip`, ...
    #[serde(rename = "type")]
    pub video_type: Option<String>,
}

/// Subset of `/movie/{id}` and `/tv/{id}` used for caption enrichment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDetails {
    /// External ids
    #[serde(default, alias = "external_ids")]
    pub external_ids: Option<ExternalIds>,
    /// Trailers and other videos
    #[serde(default, deserialize_with = "null_as_empty")]
    pub related_videos: Vec<RelatedVideo>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl MediaDetails {
    /// IMDb title page, when an IMDb id is known
    #[must_use]
    pub fn imdb_url(&self) -> Option<String> {
        self.external_ids
            .as_ref()
            .and_then(|ids| ids.imdb_id.as_deref())
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://www.imdb.com/title/{id}"))
    }

    /// Best YouTube video: a trailer, else a teaser, else any YouTube video
    #[must_use]
    pub fn trailer_url(&self) -> Option<String> {
        let youtube = || {
            self.related_videos
                .iter()
                .filter(|v| v.site.as_deref() == Some("YouTube"))
                .filter(|v| v.url.is_some())
        };

        ["Trailer", "Teaser"]
            .iter()
            .find_map(|wanted| youtube().find(|v| v.video_type.as_deref() == Some(*wanted)))
            .or_else(|| youtube().next())
            .and_then(|v| v.url.clone())
    }
}

/// Rotten Tomatoes scores from `/{type}/{id}/ratings`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RottenTomatoesRating {
    /// Rotten Tomatoes page
    pub url: Option<String>,
    /// Tomatometer percentage
    pub critics_score: Option<u32>,
    /// Popcornmeter percentage
    pub audience_score: Option<u32>,
}

/// Extra caption data gathered from details and ratings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaEnrichment {
    /// IMDb title page
    pub imdb_url: Option<String>,
    /// Rotten Tomatoes scores
    pub rotten_tomatoes: Option<RottenTomatoesRating>,
    /// YouTube trailer
    pub trailer_url: Option<String>,
}

impl MediaEnrichment {
    /// Combines a details response with optional ratings
    #[must_use]
    pub fn from_parts(details: &MediaDetails, ratings: Option<RottenTomatoesRating>) -> Self {
        Self {
            imdb_url: details.imdb_url(),
            rotten_tomatoes: ratings,
            trailer_url: details.trailer_url(),
        }
    }

    /// True when nothing worth rendering was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imdb_url.is_none()
            && self.trailer_url.is_none()
            && self
                .rotten_tomatoes
                .as_ref()
                .is_none_or(|rt| rt.critics_score.is_none() && rt.audience_score.is_none())
    }
}

/// Seasons to include in a TV request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonSelection {
    /// Every season
    All,
}

/// Body of `POST /api/v1/request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    /// TMDb id
    pub media_id: u64,
    /// Movie or TV
    pub media_type: MediaType,
    /// Present only for 4K requests
    #[serde(rename = "is4k", skip_serializing_if = "Option::is_none")]
    pub is_4k: Option<bool>,
    /// Present only for TV requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<SeasonSelection>,
}

impl RequestPayload {
    /// Builds the request body for a title
    #[must_use]
    pub fn new(media_type: MediaType, media_id: u64, is_4k: bool) -> Self {
        Self {
            media_id,
            media_type,
            is_4k: is_4k.then_some(true),
            seasons: (media_type == MediaType::Tv).then_some(SeasonSelection::All),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NestedRequest {
    id: Option<u64>,
}

/// Response of `POST /api/v1/request`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedRequest {
    id: Option<u64>,
    #[serde(default)]
    request: Option<NestedRequest>,
}

impl CreatedRequest {
    /// Request id, top level or nested under `request`
    #[must_use]
    pub fn request_id(&self) -> Option<u64> {
        self.id.or_else(|| self.request.as_ref().and_then(|r| r.id))
    }
}
