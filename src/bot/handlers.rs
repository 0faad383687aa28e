use crate::bot::callback::{self, CallbackAction, CallbackKind};
use crate::bot::transport::{ChatTransport, TelegramTransport};
use crate::bot::views::{displayed, render_item, DefaultMediaView, MediaView};
use crate::bot::UnauthorizedCache;
use crate::config::Settings;
use crate::overseerr::{MediaEnrichment, MediaService, SearchResultItem};
use anyhow::Result;
use futures_util::future::join_all;
use std::sync::Arc;
use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands};
use tracing::{debug, error, info, warn};

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Check bot health
    #[command(description = "Check bot health.")]
    Healthcheck,
    /// Show unauthorized-access statistics
    #[command(description = "Show bot statistics.")]
    Stats,
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);
    info!("User {user_id} ({user_name}) initiated /start command.");

    bot.send_message(msg.chat.id, DefaultMediaView::welcome_message())
        .await?;
    Ok(())
}

/// Replies to a stranger's `/start` on an owner-only bot, at most once per
/// cooldown window.
///
/// # Errors
///
/// Never fails; send errors are logged.
pub async fn restricted(bot: Bot, msg: Message, cache: Arc<UnauthorizedCache>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);

    if cache.should_send(user_id, &user_name).await {
        info!("⛔️ /start from non-owner {user_id} ({user_name}). Sending restriction notice.");
        match bot
            .send_message(msg.chat.id, DefaultMediaView::restricted_to_owner())
            .await
        {
            Ok(_) => cache.mark_sent(user_id).await,
            Err(e) => error!("Failed to send restriction notice to {user_id}: {e}"),
        }
    }
    Ok(())
}

/// Healthcheck handler
///
/// # Errors
///
/// Returns an error if the healthcheck response cannot be sent.
pub async fn healthcheck(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Healthcheck command received from user {user_id}.");
    bot.send_message(msg.chat.id, "OK").await?;
    Ok(())
}

/// Stats handler - shows unauthorized cache metrics
///
/// # Errors
///
/// Returns an error if the stats response cannot be sent.
pub async fn stats(bot: Bot, msg: Message, cache: Arc<UnauthorizedCache>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Stats command received from user {user_id}.");

    let text = format!(
        "<b>📊 Bot Statistics</b>\n\n{}",
        html_escape::encode_text(&cache.stats_text())
    );
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handles a plain text message as a search query.
///
/// # Errors
///
/// Returns an error only if a plain reply cannot be delivered.
pub async fn handle_text_message(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
    service: Arc<dyn MediaService>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = get_user_id_safe(&msg);
    info!("Search query from user {user_id}: {text}");

    let transport = TelegramTransport::new(bot, msg.chat.id);
    handle_query(
        service.as_ref(),
        &transport,
        settings.image_base_url(),
        text,
    )
    .await
}

/// Handles an inline button press.
///
/// The press is always acknowledged first; presses from users other than
/// the owner stop there.
///
/// # Errors
///
/// Returns an error only if a plain reply cannot be delivered.
pub async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    settings: Arc<Settings>,
    service: Arc<dyn MediaService>,
) -> Result<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query: {e}");
    }

    let user_id = q.from.id.0.cast_signed();
    if !settings.user_access().allows(user_id) {
        info!("Ignoring callback from unauthorized user {user_id}");
        return Ok(());
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        debug!("Callback {data} has no message attached; ignoring");
        return Ok(());
    };

    info!("Callback from user {user_id}: {data}");
    let transport =
        TelegramTransport::new(bot, message.chat().id).with_source_message(message.id());
    handle_callback(
        service.as_ref(),
        &transport,
        settings.request_4k(),
        settings.image_base_url(),
        data,
    )
    .await
}

/// Runs a search and replies with the results.
///
/// # Errors
///
/// Returns an error only if a plain reply cannot be delivered.
pub async fn handle_query(
    service: &dyn MediaService,
    transport: &dyn ChatTransport,
    image_base: &str,
    text: &str,
) -> Result<()> {
    let query = text.trim();
    if query.is_empty() {
        return transport.send_text(DefaultMediaView::empty_query()).await;
    }

    match service.search(query).await {
        Ok(items) if items.is_empty() => transport.send_text(DefaultMediaView::no_results()).await,
        Ok(items) => {
            send_results(service, transport, image_base, &items).await;
            Ok(())
        }
        Err(e) => {
            warn!("Search for '{query}' failed: {e}");
            transport
                .send_text(&DefaultMediaView::search_error(&e.to_string()))
                .await
        }
    }
}

/// Decodes a button payload and performs the action it names.
///
/// # Errors
///
/// Returns an error only if a plain reply cannot be delivered.
pub async fn handle_callback(
    service: &dyn MediaService,
    transport: &dyn ChatTransport,
    is_4k: bool,
    image_base: &str,
    data: &str,
) -> Result<()> {
    let action = match callback::decode(data) {
        Ok(action) => action,
        Err((None, e)) => {
            debug!("Ignoring callback: {e}");
            return Ok(());
        }
        Err((Some(kind), e)) => {
            warn!("Bad callback payload: {e}");
            if kind == CallbackKind::Request {
                clear_keyboard_logged(transport).await;
            }
            return transport
                .send_text(DefaultMediaView::invalid_identifier())
                .await;
        }
    };

    match action.kind {
        CallbackKind::Request => submit_request(service, transport, action, is_4k).await,
        CallbackKind::Recommendations => {
            show_recommendations(service, transport, image_base, action).await
        }
    }
}

async fn submit_request(
    service: &dyn MediaService,
    transport: &dyn ChatTransport,
    action: CallbackAction,
    is_4k: bool,
) -> Result<()> {
    let CallbackAction {
        media_type,
        media_id,
        ..
    } = action;

    let created = match service.create_request(media_type, media_id, is_4k).await {
        Ok(created) => created,
        Err(e) => {
            warn!("Request for {media_type} {media_id} failed: {e}");
            return transport
                .send_text(&DefaultMediaView::request_error(&e.to_string()))
                .await;
        }
    };

    match created.request_id() {
        Some(request_id) => {
            if let Err(e) = service.approve_request(request_id, is_4k).await {
                warn!("Approving request {request_id} failed: {e}");
            }
        }
        None => warn!("Request for {media_type} {media_id} returned no id; skipping approval"),
    }

    clear_keyboard_logged(transport).await;
    transport
        .send_text(DefaultMediaView::request_submitted())
        .await
}

async fn show_recommendations(
    service: &dyn MediaService,
    transport: &dyn ChatTransport,
    image_base: &str,
    action: CallbackAction,
) -> Result<()> {
    match service
        .recommendations(action.media_type, action.media_id)
        .await
    {
        Ok(items) if items.is_empty() => {
            transport
                .send_text(DefaultMediaView::no_recommendations())
                .await
        }
        Ok(items) => {
            send_results(service, transport, image_base, &items).await;
            Ok(())
        }
        Err(e) => {
            warn!(
                "Recommendations for {} {} failed: {e}",
                action.media_type, action.media_id
            );
            transport
                .send_text(&DefaultMediaView::recommendations_error(&e.to_string()))
                .await
        }
    }
}

async fn clear_keyboard_logged(transport: &dyn ChatTransport) {
    if let Err(e) = transport.clear_keyboard().await {
        warn!("Failed to remove inline keyboard: {e}");
    }
}

/// Sends up to `MAX_RESULTS` items, one message each.
///
/// Enrichment for all displayed items is fetched concurrently before
/// sending; a failed send is logged and the rest still go out.
pub async fn send_results(
    service: &dyn MediaService,
    transport: &dyn ChatTransport,
    image_base: &str,
    items: &[SearchResultItem],
) {
    let shown = displayed(items);
    let enrichments = join_all(shown.iter().map(|item| fetch_enrichment(service, item))).await;

    for (item, enrichment) in shown.iter().zip(enrichments) {
        let rendered = render_item(item, image_base, enrichment.as_ref());
        if let Err(e) = transport.send_item(&rendered).await {
            error!("Failed to send result {} {}: {e}", item.media_type, item.id);
        }
    }
}

async fn fetch_enrichment(
    service: &dyn MediaService,
    item: &SearchResultItem,
) -> Option<MediaEnrichment> {
    let (media_type, media_id) = (item.media_type, item.id);
    let (details, ratings) = tokio::join!(
        service.details(media_type, media_id),
        service.ratings(media_type, media_id)
    );

    let details = match details {
        Ok(details) => details,
        Err(e) => {
            debug!("No details for {media_type} {media_id}: {e}");
            return None;
        }
    };
    let ratings = ratings.unwrap_or_else(|e| {
        debug!("No ratings for {media_type} {media_id}: {e}");
        None
    });
    Some(MediaEnrichment::from_parts(&details, ratings))
}
