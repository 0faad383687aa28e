use anyhow::Result;
use async_trait::async_trait;
use overseerr_bot::bot::handlers::{handle_callback, handle_query};
use overseerr_bot::bot::transport::ChatTransport;
use overseerr_bot::bot::views::{RenderedItem, DOWNLOAD_LABEL, RECOMMENDATIONS_LABEL};
use overseerr_bot::overseerr::{
    Availability, CreatedRequest, MediaDetails, MediaService, MediaType, OverseerrError,
    RottenTomatoesRating, SearchResultItem,
};
use serde_json::json;
use std::sync::Mutex;

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// In-memory Overseerr that serves fixed search results and records requests.
#[derive(Default)]
struct FakeOverseerr {
    results: Vec<SearchResultItem>,
    requests: Mutex<Vec<(MediaType, u64, bool)>>,
    approvals: Mutex<Vec<u64>>,
}

#[async_trait]
impl MediaService for FakeOverseerr {
    async fn search(&self, _query: &str) -> Result<Vec<SearchResultItem>, OverseerrError> {
        Ok(self.results.clone())
    }

    async fn recommendations(
        &self,
        _media_type: MediaType,
        _media_id: u64,
    ) -> Result<Vec<SearchResultItem>, OverseerrError> {
        Ok(Vec::new())
    }

    async fn create_request(
        &self,
        media_type: MediaType,
        media_id: u64,
        is_4k: bool,
    ) -> Result<CreatedRequest, OverseerrError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((media_type, media_id, is_4k));
        }
        serde_json::from_value(json!({ "request": { "id": 42 } }))
            .map_err(|e| OverseerrError::Json(e.to_string()))
    }

    async fn approve_request(&self, request_id: u64, _is_4k: bool) -> Result<(), OverseerrError> {
        if let Ok(mut approvals) = self.approvals.lock() {
            approvals.push(request_id);
        }
        Ok(())
    }

    async fn details(
        &self,
        _media_type: MediaType,
        _media_id: u64,
    ) -> Result<MediaDetails, OverseerrError> {
        Ok(MediaDetails::default())
    }

    async fn ratings(
        &self,
        _media_type: MediaType,
        _media_id: u64,
    ) -> Result<Option<RottenTomatoesRating>, OverseerrError> {
        Ok(None)
    }
}

/// Collects everything the bot would have sent.
#[derive(Default)]
struct RecordingChat {
    texts: Mutex<Vec<String>>,
    items: Mutex<Vec<RenderedItem>>,
    cleared: Mutex<usize>,
}

impl RecordingChat {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn items(&self) -> Vec<RenderedItem> {
        self.items.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for RecordingChat {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.texts
            .lock()
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .push(text.to_string());
        Ok(())
    }

    async fn send_item(&self, item: &RenderedItem) -> Result<()> {
        self.items
            .lock()
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .push(item.clone());
        Ok(())
    }

    async fn clear_keyboard(&self) -> Result<()> {
        *self.cleared.lock().map_err(|e| anyhow::anyhow!("{e}"))? += 1;
        Ok(())
    }
}

fn title(id: u64, name: &str, year: &str, availability: Availability) -> SearchResultItem {
    SearchResultItem {
        id,
        media_type: MediaType::Movie,
        title: name.to_string(),
        year: Some(year.to_string()),
        poster_path: Some(format!("/{id}.jpg")),
        availability,
    }
}

#[tokio::test]
async fn test_dune_search_renders_two_messages() -> Result<()> {
    let service = FakeOverseerr {
        results: vec![
            title(438_631, "Dune", "2021", Availability::Unknown),
            title(841, "Dune", "1984", Availability::Pending),
        ],
        ..FakeOverseerr::default()
    };
    let chat = RecordingChat::default();

    handle_query(&service, &chat, IMAGE_BASE, "Dune").await?;

    let items = chat.items();
    assert_eq!(items.len(), 2);
    for (item, year) in items.iter().zip(["2021", "1984"]) {
        assert!(item.caption.contains("<b>Dune</b>"));
        assert!(item.caption.contains(year));
        let labels: Vec<_> = item.buttons.iter().map(|b| b.label).collect();
        assert_eq!(labels, [DOWNLOAD_LABEL, RECOMMENDATIONS_LABEL]);
    }
    assert_eq!(
        items[0].poster_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/438631.jpg")
    );
    assert!(chat.texts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_available_title_has_no_download_button() -> Result<()> {
    let service = FakeOverseerr {
        results: vec![title(27_205, "Inception", "2010", Availability::Available)],
        ..FakeOverseerr::default()
    };
    let chat = RecordingChat::default();

    handle_query(&service, &chat, IMAGE_BASE, "Inception").await?;

    let items = chat.items();
    assert_eq!(items.len(), 1);
    assert!(items[0].caption.contains("✅ Status: in library"));
    assert!(items[0].buttons.iter().all(|b| b.label != DOWNLOAD_LABEL));
    Ok(())
}

#[tokio::test]
async fn test_download_press_creates_and_approves_request() -> Result<()> {
    let service = FakeOverseerr::default();
    let chat = RecordingChat::default();

    handle_callback(&service, &chat, true, IMAGE_BASE, "req|tv|1399").await?;

    let requests = service.requests.lock().map(|r| r.clone()).unwrap_or_default();
    assert_eq!(requests, vec![(MediaType::Tv, 1399, true)]);
    let approvals = service.approvals.lock().map(|a| a.clone()).unwrap_or_default();
    assert_eq!(approvals, vec![42]);
    assert_eq!(chat.cleared.lock().map(|c| *c).unwrap_or_default(), 1);
    assert_eq!(chat.texts(), vec!["Request submitted and approved ✅"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_recommendations_reply() -> Result<()> {
    let service = FakeOverseerr::default();
    let chat = RecordingChat::default();

    handle_callback(&service, &chat, false, IMAGE_BASE, "rec|movie|438631").await?;

    assert_eq!(chat.texts(), vec!["No recommendations found."]);
    assert!(chat.items().is_empty());
    Ok(())
}
