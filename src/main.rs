use std::{error::Error, sync::Arc};

use api::{BookingApi, HttpApi};
use catalog::Catalog;
use config::Config;
use handlers::{handle_callback_query, handle_message, BotContext};
mod api;
mod captcha;
mod catalog;
mod config;
mod controller;
mod errors;
mod handlers;
mod models;
mod session;
mod workflow;
use teloxide::{
    dispatching::UpdateFilterExt,
    prelude::*,
    types::{CallbackQuery, Message},
};

extern crate pretty_env_logger;
#[macro_use] extern crate log;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    pretty_env_logger::init();
    let config = Config::from_env()?;
    let api: Arc<dyn BookingApi> = Arc::new(HttpApi::new(&config)?);
    info!("Booking API at {}", config.api_url);

    let bot = Bot::from_env();
    let ctx = BotContext::new(api, Catalog::default());

    let handler = dptree::entry()
    .branch(
        Update::filter_message().endpoint({
        let ctx = ctx.clone();

        move |bot: Bot, msg: Message| {
            let ctx = ctx.clone();

            async move {
                if let Err(e) = handle_message(bot, msg, ctx).await {
                    error!("Message handler failed: {}", e);
                }
                respond(())
            }
        }
    }))
    .branch(Update::filter_callback_query().endpoint({
        let ctx = ctx.clone();

        move |q: CallbackQuery, bot: Bot| {
            let ctx = ctx.clone();

            async move {
                if let Err(e) = handle_callback_query(bot, q, ctx).await {
                    error!("Callback handler failed: {}", e);
                }
                respond(())
            }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}
