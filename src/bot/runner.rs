use crate::bot::handlers::{self, get_user_id_safe, Command};
use crate::bot::UnauthorizedCache;
use crate::config::{
    get_unauthorized_cache_max_size, get_unauthorized_cache_ttl, get_unauthorized_cooldown,
    Settings, UserAccess,
};
use crate::overseerr::{MediaService, OverseerrClient};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};

/// Run the Telegram bot until Ctrl-C.
pub async fn run_bot(settings: Arc<Settings>) {
    let service = init_media_service(&settings);

    let bot = Bot::new(settings.telegram_bot_token.clone());
    let unauthorized_cache = init_unauthorized_cache();
    let handler = setup_handler();

    match settings.user_access() {
        UserAccess::Everyone => info!("No owner configured; the bot answers everyone."),
        UserAccess::Owner(id) => info!("Bot restricted to owner {id}."),
        UserAccess::Nobody => error!("OWNER_TELEGRAM_USER_ID is not a valid id; nobody is authorized."),
    }
    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, service, unauthorized_cache])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_media_service(settings: &Settings) -> Arc<dyn MediaService> {
    match OverseerrClient::from_settings(settings) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to initialize Overseerr client: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_unauthorized_cache() -> Arc<UnauthorizedCache> {
    let cooldown = get_unauthorized_cooldown();
    let ttl = get_unauthorized_cache_ttl();
    let max_size = get_unauthorized_cache_max_size();

    info!(
        "Initializing UnauthorizedCache (cooldown: {}s, ttl: {}s, max_size: {})",
        cooldown, ttl, max_size
    );

    Arc::new(UnauthorizedCache::new(cooldown, ttl, max_size))
}

fn is_authorized(msg: &Message, settings: &Settings) -> bool {
    settings.user_access().allows(get_user_id_safe(msg))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::filter(|msg: Message, settings: Arc<Settings>| {
                        is_authorized(&msg, &settings)
                    })
                    .branch(
                        dptree::entry()
                            .filter_command::<Command>()
                            .endpoint(handle_command),
                    )
                    .branch(
                        dptree::filter(|msg: Message| {
                            msg.text().is_some_and(|text| !text.starts_with('/'))
                        })
                        .endpoint(handle_text),
                    ),
                )
                .branch(
                    // Strangers only ever get the restriction notice for /start
                    dptree::entry()
                        .filter_command::<Command>()
                        .branch(dptree::case![Command::Start].endpoint(handle_unauthorized)),
                ),
        )
}

async fn handle_unauthorized(
    bot: Bot,
    msg: Message,
    cache: Arc<UnauthorizedCache>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::restricted(bot, msg, cache).await {
        error!("Restriction notice error: {}", e);
    }
    respond(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    cache: Arc<UnauthorizedCache>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg).await,
        Command::Healthcheck => handlers::healthcheck(bot, msg).await,
        Command::Stats => handlers::stats(bot, msg, cache).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
    service: Arc<dyn MediaService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text_message(bot, msg, settings, service).await {
        error!("Search handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    settings: Arc<Settings>,
    service: Arc<dyn MediaService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_callback_query(bot, q, settings, service).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
