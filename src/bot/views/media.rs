//! Search result UI components
//!
//! Contains captions, inline keyboards, and text messages for the search,
//! recommendation and request flows.

use crate::bot::callback::CallbackAction;
use crate::overseerr::{MediaEnrichment, MediaType, SearchResultItem};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Maximum number of result messages sent per search or recommendation list
pub const MAX_RESULTS: usize = 10;

/// Link used when ratings exist but carry no page URL
const ROTTEN_TOMATOES_FALLBACK_URL: &str = "https://www.rottentomatoes.com/";

// ─────────────────────────────────────────────────────────────────────────────
// Button labels
// ─────────────────────────────────────────────────────────────────────────────

/// Label of the request button
pub const DOWNLOAD_LABEL: &str = "⏬ Download";
/// Label of the recommendations button
pub const RECOMMENDATIONS_LABEL: &str = "👀 Recommendations";

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for user-facing texts
pub trait MediaView {
    /// Reply to `/start`
    fn welcome_message() -> &'static str;

    /// Reply to `/start` from someone other than the owner
    fn restricted_to_owner() -> &'static str;

    /// Text message was blank
    fn empty_query() -> &'static str;

    /// Search returned nothing usable
    fn no_results() -> &'static str;

    /// Recommendations list is empty
    fn no_recommendations() -> &'static str;

    /// Callback carried a bad id
    fn invalid_identifier() -> &'static str;

    /// Request created
    fn request_submitted() -> &'static str;

    /// Search failed upstream
    fn search_error(error: &str) -> String;

    /// Recommendations failed upstream
    fn recommendations_error(error: &str) -> String;

    /// Request creation failed upstream
    fn request_error(error: &str) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default English implementation of `MediaView`
pub struct DefaultMediaView;

impl MediaView for DefaultMediaView {
    fn welcome_message() -> &'static str {
        "Send a movie or TV title."
    }

    fn restricted_to_owner() -> &'static str {
        "This bot is restricted to the owner."
    }

    fn empty_query() -> &'static str {
        "Empty query. Please enter a title."
    }

    fn no_results() -> &'static str {
        "No results found."
    }

    fn no_recommendations() -> &'static str {
        "No recommendations found."
    }

    fn invalid_identifier() -> &'static str {
        "Invalid identifier."
    }

    fn request_submitted() -> &'static str {
        "Request submitted and approved ✅"
    }

    fn search_error(error: &str) -> String {
        format!("Overseerr search error: {error}")
    }

    fn recommendations_error(error: &str) -> String {
        format!("Recommendations error: {error}")
    }

    fn request_error(error: &str) -> String {
        format!("Request error: {error}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// An inline button attached to a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    /// Visible label
    pub label: &'static str,
    /// Payload decoded on press
    pub action: CallbackAction,
}

/// A result ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItem {
    /// HTML caption
    pub caption: String,
    /// Absolute poster URL
    pub poster_url: Option<String>,
    /// Buttons in a single row
    pub buttons: Vec<ActionButton>,
}

impl RenderedItem {
    /// Telegram keyboard for the buttons, `None` when there are none
    #[must_use]
    pub fn keyboard(&self) -> Option<InlineKeyboardMarkup> {
        if self.buttons.is_empty() {
            return None;
        }
        let row = self
            .buttons
            .iter()
            .map(|button| InlineKeyboardButton::callback(button.label, button.action.encode()))
            .collect::<Vec<_>>();
        Some(InlineKeyboardMarkup::new(vec![row]))
    }
}

/// Builds the base caption: title, type, year and library status.
///
/// # Examples
///
/// ```
/// use overseerr_bot::bot::views::build_caption;
/// use overseerr_bot::overseerr::{Availability, MediaType, SearchResultItem};
///
/// let item = SearchResultItem {
///     id: 438631,
///     media_type: MediaType::Movie,
///     title: "Dune".to_string(),
///     year: Some("2021".to_string()),
///     poster_path: None,
///     availability: Availability::Unknown,
/// };
/// let caption = build_caption(&item);
/// assert!(caption.starts_with("<b>Dune</b> - (movie)"));
/// assert!(caption.contains("Year - 2021"));
/// ```
#[must_use]
pub fn build_caption(item: &SearchResultItem) -> String {
    let available = item.availability.is_available();
    let (icon, status) = if available {
        ("✅", "in library")
    } else {
        ("❌", "not in library")
    };

    let mut lines = vec![format!(
        "<b>{}</b> - ({})",
        html_escape::encode_text(&item.title),
        item.media_type.label()
    )];
    if let Some(year) = &item.year {
        lines.push(format!("Year - {year}"));
    }
    lines.push(String::new());
    lines.push(format!("{icon} Status: {status}"));
    lines.join("\n")
}

/// Appends IMDb, Rotten Tomatoes and trailer links to a caption.
#[must_use]
pub fn append_enrichment(caption: &str, enrichment: &MediaEnrichment) -> String {
    let mut parts = vec![caption.to_string(), String::new()];

    if let Some(imdb_url) = &enrichment.imdb_url {
        parts.push(link(imdb_url, "IMDb"));
    }

    if let Some(rt) = &enrichment.rotten_tomatoes {
        let url = rt.url.as_deref().unwrap_or(ROTTEN_TOMATOES_FALLBACK_URL);
        if let Some(score) = rt.critics_score {
            parts.push(link(url, &format!("🍅 Tomatometer : {score}%")));
        }
        if let Some(score) = rt.audience_score {
            parts.push(link(url, &format!("🍿 Popcorn: {score}%")));
        }
    }

    if let Some(trailer) = &enrichment.trailer_url {
        parts.push(String::new());
        parts.push(link(trailer, "🎬 Trailer"));
    }

    parts.join("\n")
}

fn link(url: &str, label: &str) -> String {
    format!(
        "<a href=\"{}\">{label}</a>",
        html_escape::encode_double_quoted_attribute(url)
    )
}

/// Buttons for an item: download unless already available, recommendations
/// for movie/tv.
#[must_use]
pub fn build_buttons(item: &SearchResultItem) -> Vec<ActionButton> {
    let mut buttons = Vec::with_capacity(2);
    if !item.availability.is_available() {
        buttons.push(ActionButton {
            label: DOWNLOAD_LABEL,
            action: CallbackAction::request(item.media_type, item.id),
        });
    }
    if matches!(item.media_type, MediaType::Movie | MediaType::Tv) {
        buttons.push(ActionButton {
            label: RECOMMENDATIONS_LABEL,
            action: CallbackAction::recommendations(item.media_type, item.id),
        });
    }
    buttons
}

/// Absolute poster URL for an item
#[must_use]
pub fn poster_url(image_base: &str, item: &SearchResultItem) -> Option<String> {
    item.poster_path
        .as_deref()
        .map(|path| format!("{}{path}", image_base.trim_end_matches('/')))
}

/// Renders one item, with optional enrichment appended to the caption.
#[must_use]
pub fn render_item(
    item: &SearchResultItem,
    image_base: &str,
    enrichment: Option<&MediaEnrichment>,
) -> RenderedItem {
    let base = build_caption(item);
    let caption = match enrichment {
        Some(extra) if !extra.is_empty() => append_enrichment(&base, extra),
        _ => base,
    };

    RenderedItem {
        caption,
        poster_url: poster_url(image_base, item),
        buttons: build_buttons(item),
    }
}

/// The slice of results that will actually be displayed
#[must_use]
pub fn displayed(items: &[SearchResultItem]) -> &[SearchResultItem] {
    &items[..items.len().min(MAX_RESULTS)]
}
