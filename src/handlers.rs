use log::{error, info};
use std::{collections::HashMap, error::Error, sync::Arc};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, ReplyMarkup},
};
use tokio::sync::{mpsc, Mutex};

use crate::api::BookingApi;
use crate::catalog::Catalog;
use crate::controller::{Controller, Event};
use crate::errors::{ValidationError, WorkflowError};
use crate::models::{BookingDuration, ServiceType};
use crate::session::AuthMode;
use crate::workflow::{Selection, View, DATE_FORMAT, TIME_FORMAT};

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

// Which free-text field the next message of the chat fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InputStep {
    #[default]
    Idle,
    Email,
    Password,
    ConfirmPassword,
    Captcha,
    CustomerName,
    Date,
    Time,
    Notes,
    Feedback,
}

#[derive(Clone)]
pub struct ChatSession {
    controller: Controller,
    step: Arc<Mutex<InputStep>>,
}

impl ChatSession {
    async fn take_step(&self) -> InputStep {
        std::mem::take(&mut *self.step.lock().await)
    }

    async fn await_input(&self, step: InputStep) {
        *self.step.lock().await = step;
    }
}

/// Shared by every update: the backend client and one controller per chat.
#[derive(Clone)]
pub struct BotContext {
    api: Arc<dyn BookingApi>,
    catalog: Catalog,
    sessions: Arc<Mutex<HashMap<i64, ChatSession>>>,
}

impl BotContext {
    pub fn new(api: Arc<dyn BookingApi>, catalog: Catalog) -> Self {
        BotContext {
            api,
            catalog,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn session(&self, bot: &Bot, chat_id: ChatId) -> ChatSession {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(chat_id.0)
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(forward_events(bot.clone(), chat_id, self.catalog, rx));
                ChatSession {
                    controller: Controller::new(self.api.clone(), self.catalog).with_events(tx),
                    step: Arc::new(Mutex::new(InputStep::Idle)),
                }
            })
            .clone()
    }
}

async fn forward_events(bot: Bot, chat_id: ChatId, catalog: Catalog, mut events: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = events.recv().await {
        match event {
            Event::RedirectedToServices => {
                if let Err(e) = show_services(&bot, chat_id, &catalog).await {
                    error!("Failed to show services after redirect: {}", e);
                }
            }
        }
    }
}

pub async fn handle_message(bot: Bot, msg: Message, ctx: BotContext) -> HandlerResult {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or("").to_string();
    let chat = ctx.session(&bot, chat_id).await;
    let c = &chat.controller;

    match text.as_str() {
        "/start" => {
            chat.await_input(InputStep::Idle).await;
            if c.is_authenticated().await {
                show_view(&bot, chat_id, c).await?;
            } else {
                start_auth(&bot, chat_id, &chat).await?;
            }
            return Ok(());
        }
        "/logout" => {
            chat.await_input(InputStep::Idle).await;
            c.logout().await;
            bot.send_message(chat_id, "You have been logged out.").await?;
            start_auth(&bot, chat_id, &chat).await?;
            return Ok(());
        }
        _ => {}
    }

    match chat.take_step().await {
        InputStep::Email => {
            c.set_email(&text).await;
            chat.await_input(InputStep::Password).await;
            bot.send_message(chat_id, "Enter your password:").await?;
        }
        InputStep::Password => {
            c.set_password(&text).await;
            forget_secret(&bot, &msg).await;
            if c.state().await.auth().mode == AuthMode::Signup {
                chat.await_input(InputStep::ConfirmPassword).await;
                bot.send_message(chat_id, "Confirm your password:").await?;
            } else {
                ask_captcha(&bot, chat_id, &chat).await?;
            }
        }
        InputStep::ConfirmPassword => {
            c.set_confirm_password(&text).await;
            forget_secret(&bot, &msg).await;
            ask_captcha(&bot, chat_id, &chat).await?;
        }
        InputStep::Captcha => {
            c.set_captcha_answer(&text).await;
            let (mode, email, password, confirm) = {
                let state = c.state().await;
                let auth = state.auth();
                (auth.mode, auth.email.clone(), auth.password.clone(), auth.confirm_password.clone())
            };
            let pending = bot
                .send_message(chat_id, if mode == AuthMode::Signup { "Signing up..." } else { "Logging in..." })
                .await?;
            let outcome = match mode {
                AuthMode::Login => c.login(&email, &password).await,
                AuthMode::Signup => c.signup(&email, &password, &confirm).await,
            };
            match outcome {
                Ok(session) => {
                    info!("Chat {} authenticated as {}", chat_id.0, session.user_id);
                    bot.edit_message_text(chat_id, pending.id, "✓ Welcome to ProBooking!").await?;
                    show_home(&bot, chat_id, c).await?;
                }
                Err(e) => {
                    bot.edit_message_text(chat_id, pending.id, e.to_string()).await?;
                    match e {
                        WorkflowError::Validation(ValidationError::MissingCaptcha)
                        | WorkflowError::Validation(ValidationError::WrongCaptcha) => {
                            ask_captcha(&bot, chat_id, &chat).await?
                        }
                        WorkflowError::Busy => {}
                        _ => start_auth(&bot, chat_id, &chat).await?,
                    }
                }
            }
        }
        InputStep::CustomerName => match c.set_customer_name(&text).await {
            Ok(_) => show_booking_form(&bot, chat_id, c).await?,
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        InputStep::Date => match c.set_date(&text).await {
            Ok(()) => show_booking_form(&bot, chat_id, c).await?,
            Err(e @ WorkflowError::Validation(_)) => {
                chat.await_input(InputStep::Date).await;
                notify(&bot, chat_id, &e).await?
            }
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        InputStep::Time => match c.set_time(&text).await {
            Ok(()) => show_booking_form(&bot, chat_id, c).await?,
            Err(e @ WorkflowError::Validation(_)) => {
                chat.await_input(InputStep::Time).await;
                notify(&bot, chat_id, &e).await?
            }
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        InputStep::Notes => match c.set_notes(&text).await {
            Ok(()) => show_booking_form(&bot, chat_id, c).await?,
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        InputStep::Feedback => {
            let pending = bot.send_message(chat_id, "Submitting...").await?;
            match c.submit_feedback(&text).await {
                Ok(thanks) => {
                    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                        "Return to Services",
                        "booking:return",
                    )]]);
                    bot.edit_message_text(
                        chat_id,
                        pending.id,
                        format!("{}\nRedirecting to services in 2 seconds...", thanks),
                    )
                    .reply_markup(keyboard)
                    .await?;
                }
                Err(e) => {
                    if matches!(e, WorkflowError::Validation(ValidationError::EmptyFeedback)) {
                        chat.await_input(InputStep::Feedback).await;
                    }
                    bot.edit_message_text(chat_id, pending.id, e.to_string()).await?;
                }
            }
        }
        InputStep::Idle => {
            if c.is_authenticated().await {
                show_view(&bot, chat_id, c).await?;
            } else {
                start_auth(&bot, chat_id, &chat).await?;
            }
        }
    }

    Ok(())
}

pub async fn handle_callback_query(bot: Bot, q: CallbackQuery, ctx: BotContext) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let (Some(msg), Some(data)) = (q.message.as_ref(), q.data.as_deref()) else {
        return Ok(());
    };
    let chat_id = msg.chat().id;
    let chat = ctx.session(&bot, chat_id).await;
    let c = &chat.controller;

    match data {
        "auth:toggle" => {
            c.toggle_auth_mode().await;
            start_auth(&bot, chat_id, &chat).await?;
        }
        "captcha:refresh" => {
            c.refresh_captcha().await;
            ask_captcha(&bot, chat_id, &chat).await?;
        }
        "logout" => {
            chat.await_input(InputStep::Idle).await;
            c.logout().await;
            bot.send_message(chat_id, "You have been logged out.").await?;
            start_auth(&bot, chat_id, &chat).await?;
        }
        "nav:home" => match c.go_home().await {
            Ok(()) => show_home(&bot, chat_id, c).await?,
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        "nav:services" => match c.go_services().await {
            Ok(()) => show_services(&bot, chat_id, c.catalog()).await?,
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        "nav:booking" => match c.go_booking().await {
            Ok(()) => show_booking_form(&bot, chat_id, c).await?,
            Err(e) => notify(&bot, chat_id, &e).await?,
        },
        "field:name" => {
            chat.await_input(InputStep::CustomerName).await;
            bot.send_message(chat_id, "Your name (letters and spaces only):").await?;
        }
        "field:date" => {
            chat.await_input(InputStep::Date).await;
            bot.send_message(chat_id, "Booking date (YYYY-MM-DD):").await?;
        }
        "field:time" => {
            chat.await_input(InputStep::Time).await;
            bot.send_message(chat_id, "Booking time (HH:MM):").await?;
        }
        "field:notes" => {
            chat.await_input(InputStep::Notes).await;
            bot.send_message(chat_id, "Additional notes:").await?;
        }
        "booking:confirm" => {
            let pending = bot.send_message(chat_id, "Confirming...").await?;
            match c.confirm_booking().await {
                Ok(booking) => {
                    bot.delete_message(chat_id, pending.id).await?;
                    info!("Chat {} booked {}", chat_id.0, booking.booking_id);
                    show_booking_form(&bot, chat_id, c).await?;
                }
                Err(e) => {
                    bot.edit_message_text(chat_id, pending.id, e.to_string()).await?;
                }
            }
        }
        "booking:cancel" => {
            chat.await_input(InputStep::Idle).await;
            c.cancel_booking().await;
            show_home(&bot, chat_id, c).await?;
        }
        "booking:return" => {
            chat.await_input(InputStep::Idle).await;
            c.return_to_services().await;
            show_services(&bot, chat_id, c.catalog()).await?;
        }
        "feedback:write" => {
            chat.await_input(InputStep::Feedback).await;
            bot.send_message(chat_id, "Write your feedback...").await?;
        }
        _ if data.starts_with("pro:") => match parse_id(data) {
            Some(id) => match c.select_professional(id).await {
                Ok(_) => show_booking_form(&bot, chat_id, c).await?,
                Err(e) => notify(&bot, chat_id, &e).await?,
            },
            None => error!("Malformed callback data: {}", data),
        },
        _ if data.starts_with("service:") => match parse_id(data) {
            Some(id) => match c.select_service(id).await {
                Ok(_) => show_booking_form(&bot, chat_id, c).await?,
                Err(e) => notify(&bot, chat_id, &e).await?,
            },
            None => error!("Malformed callback data: {}", data),
        },
        _ if data.starts_with("duration:") => {
            match data.split(':').nth(1).and_then(BookingDuration::from_code) {
                Some(duration) => match c.set_duration(duration).await {
                    Ok(()) => show_booking_form(&bot, chat_id, c).await?,
                    Err(e) => notify(&bot, chat_id, &e).await?,
                },
                None => error!("Malformed callback data: {}", data),
            }
        }
        _ if data.starts_with("type:") => {
            match data.split(':').nth(1).and_then(ServiceType::from_code) {
                Some(service_type) => match c.set_service_type(service_type).await {
                    Ok(()) => show_booking_form(&bot, chat_id, c).await?,
                    Err(e) => notify(&bot, chat_id, &e).await?,
                },
                None => error!("Malformed callback data: {}", data),
            }
        }
        _ => {}
    }

    Ok(())
}

fn parse_id(data: &str) -> Option<u32> {
    data.split(':').nth(1)?.parse().ok()
}

async fn notify(bot: &Bot, chat_id: ChatId, e: &WorkflowError) -> HandlerResult {
    bot.send_message(chat_id, e.to_string()).await?;
    Ok(())
}

// Credentials should not linger in the chat history.
async fn forget_secret(bot: &Bot, msg: &Message) {
    if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
        error!("Could not delete credential message: {}", e);
    }
}

async fn start_auth(bot: &Bot, chat_id: ChatId, chat: &ChatSession) -> HandlerResult {
    let state = chat.controller.state().await;
    let (title, other) = match state.auth().mode {
        AuthMode::Login => ("Login", "Don't have an account? Sign Up"),
        AuthMode::Signup => ("Sign Up", "Already have an account? Login"),
    };
    let mut text = format!("ProBooking\nProfessional Services Booking Platform\n\n{}: enter your email address:", title);
    if let Some(err) = &state.auth().error {
        text.push_str(&format!("\n\n⚠️ {}", err));
    }
    drop(state);

    chat.await_input(InputStep::Email).await;
    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(other, "auth:toggle")]]);
    bot.send_message(chat_id, text)
        .reply_markup(ReplyMarkup::InlineKeyboard(keyboard))
        .await?;
    Ok(())
}

async fn ask_captcha(bot: &Bot, chat_id: ChatId, chat: &ChatSession) -> HandlerResult {
    let question = chat.controller.state().await.auth().captcha.question();
    chat.await_input(InputStep::Captcha).await;
    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔄 Refresh",
        "captcha:refresh",
    )]]);
    bot.send_message(chat_id, format!("CAPTCHA: {}", question))
        .reply_markup(ReplyMarkup::InlineKeyboard(keyboard))
        .await?;
    Ok(())
}

fn nav_row(has_selection: bool) -> Vec<InlineKeyboardButton> {
    let mut row = vec![
        InlineKeyboardButton::callback("Home", "nav:home"),
        InlineKeyboardButton::callback("Services", "nav:services"),
    ];
    if has_selection {
        row.push(InlineKeyboardButton::callback("Booking", "nav:booking"));
    }
    row.push(InlineKeyboardButton::callback("Logout", "logout"));
    row
}

async fn show_view(bot: &Bot, chat_id: ChatId, c: &Controller) -> HandlerResult {
    let view = c.state().await.workflow().view();
    match view {
        View::Home => show_home(bot, chat_id, c).await,
        View::Services => show_services(bot, chat_id, c.catalog()).await,
        View::Booking => show_booking_form(bot, chat_id, c).await,
    }
}

async fn show_home(bot: &Bot, chat_id: ChatId, c: &Controller) -> HandlerResult {
    let mut text = String::from("Find & Hire the Right Professional\n\nAvailable Professionals:\n");
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for pro in c.catalog().professionals() {
        text.push_str(&format!(
            "\n{}\nProfession: {}\nLocation: {}\nRating: ⭐ {:.1}\n",
            pro.name, pro.profession, pro.location, pro.rating
        ));
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("Book Now: {}", pro.name),
            format!("pro:{}", pro.id),
        )]);
    }
    let has_selection = c.state().await.workflow().selection().is_some();
    keyboard.push(nav_row(has_selection));

    bot.send_message(chat_id, text)
        .reply_markup(ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(keyboard)))
        .await?;
    Ok(())
}

async fn show_services(bot: &Bot, chat_id: ChatId, catalog: &Catalog) -> HandlerResult {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut text = String::from("Our Services\n");
    for service in catalog.services() {
        let owner = catalog
            .professional(service.professional_id)
            .map(|p| p.name)
            .unwrap_or("unknown");
        text.push_str(&format!("\n{} {} — {} (by {})", service.icon, service.name, service.description, owner));
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("{} {}", service.icon, service.name),
            format!("service:{}", service.id),
        )]);
    }
    keyboard.push(nav_row(false));

    bot.send_message(chat_id, text)
        .reply_markup(ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(keyboard)))
        .await?;
    Ok(())
}

async fn show_booking_form(bot: &Bot, chat_id: ChatId, c: &Controller) -> HandlerResult {
    let rendered = {
        let state = c.state().await;
        let workflow = state.workflow();
        workflow
            .selection()
            .map(|selection| render_booking_form(selection, workflow.redirect_pending()))
    };
    match rendered {
        Some((text, keyboard)) => {
            bot.send_message(chat_id, text)
                .reply_markup(ReplyMarkup::InlineKeyboard(keyboard))
                .await?;
        }
        None => {
            bot.send_message(chat_id, WorkflowError::NoSelection.to_string()).await?;
        }
    }
    Ok(())
}

fn render_booking_form(selection: &Selection, redirecting: bool) -> (String, InlineKeyboardMarkup) {
    let draft = &selection.draft;
    let or_blank = |v: Option<String>| v.unwrap_or_else(|| "—".to_string());

    let mut text = format!(
        "Book Appointment with {}\n\nName: {}\nDate: {}\nTime: {}\nDuration: {}\nService Type: {}\nNotes: {}",
        selection.professional.name,
        if draft.customer_name.is_empty() { "—" } else { draft.customer_name.as_str() },
        or_blank(draft.date.map(|d| d.format(DATE_FORMAT).to_string())),
        or_blank(draft.time.map(|t| t.format(TIME_FORMAT).to_string())),
        draft.duration.label(),
        draft.service_type.label(),
        if draft.notes.is_empty() { "—" } else { draft.notes.as_str() },
    );

    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = vec![
        vec![
            InlineKeyboardButton::callback("✏️ Name", "field:name"),
            InlineKeyboardButton::callback("📅 Date", "field:date"),
            InlineKeyboardButton::callback("🕒 Time", "field:time"),
            InlineKeyboardButton::callback("📝 Notes", "field:notes"),
        ],
        BookingDuration::ALL
            .iter()
            .map(|d| {
                let mark = if *d == draft.duration { "• " } else { "" };
                InlineKeyboardButton::callback(format!("{}{}", mark, d.code()), format!("duration:{}", d.code()))
            })
            .collect(),
        ServiceType::ALL
            .iter()
            .map(|t| {
                let mark = if *t == draft.service_type { "• " } else { "" };
                InlineKeyboardButton::callback(format!("{}{}", mark, t.label()), format!("type:{}", t.code()))
            })
            .collect(),
    ];

    let confirm_label = if selection.booking_in_flight { "Confirming..." } else { "Confirm Booking" };
    keyboard.push(vec![
        InlineKeyboardButton::callback(confirm_label, "booking:confirm"),
        InlineKeyboardButton::callback("✕ Cancel", "booking:cancel"),
    ]);

    if let Some(summary) = selection.summary() {
        text.push_str(&format!("\n\n{}\n\nGive Your Suggestions", summary));
        keyboard.push(vec![InlineKeyboardButton::callback("💬 Submit Feedback", "feedback:write")]);
    }
    if let Some(message) = &selection.feedback_message {
        text.push_str(&format!("\n\n{}", message));
        if redirecting {
            text.push_str("\nRedirecting to services in 2 seconds...");
        }
        keyboard.push(vec![InlineKeyboardButton::callback("Return to Services", "booking:return")]);
    }
    keyboard.push(nav_row(true));

    (text, InlineKeyboardMarkup::new(keyboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingResult;
    use crate::workflow::Workflow;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn callback_ids_parse() {
        assert_eq!(parse_id("pro:3"), Some(3));
        assert_eq!(parse_id("service:12"), Some(12));
        assert_eq!(parse_id("pro:x"), None);
        assert_eq!(parse_id("pro"), None);
    }

    #[test]
    fn nav_row_hides_booking_without_selection() {
        let labels = |row: Vec<InlineKeyboardButton>| row.into_iter().map(|b| b.text).collect::<Vec<_>>();
        assert_eq!(labels(nav_row(false)), vec!["Home", "Services", "Logout"]);
        assert_eq!(labels(nav_row(true)), vec!["Home", "Services", "Booking", "Logout"]);
    }

    fn callbacks(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn booking_form_grows_feedback_controls() {
        let mut workflow = Workflow::default();
        let selection = workflow.select(Catalog::default().professional(1).unwrap());
        selection.set_customer_name("Rajesh Kumar 2");
        selection.set_duration(BookingDuration::TwoHours);

        let (text, markup) = render_booking_form(selection, false);
        assert!(text.starts_with("Book Appointment with Rajesh Kumar"));
        assert!(text.contains("Name: Rajesh Kumar"));
        assert!(text.contains("Date: —"));
        let data = callbacks(&markup);
        assert!(data.contains(&"booking:confirm".to_string()));
        assert!(!data.contains(&"feedback:write".to_string()));
        assert!(markup.inline_keyboard[1].iter().any(|b| b.text == "• 2"));

        selection.set_date("2026-10-20").unwrap();
        selection.set_time("10:00").unwrap();
        selection.result = Some(BookingResult { booking_id: "b-1".into() });
        let (text, markup) = render_booking_form(selection, false);
        assert!(text.contains("Booking confirmed with Rajesh Kumar on 2026-10-20 at 10:00"));
        assert!(callbacks(&markup).contains(&"feedback:write".to_string()));

        selection.feedback_message = Some("Thank you for your valuable feedback!".into());
        let (text, markup) = render_booking_form(selection, true);
        assert!(text.contains("Redirecting to services in 2 seconds..."));
        assert!(callbacks(&markup).contains(&"booking:return".to_string()));

        let (text, _) = render_booking_form(selection, false);
        assert!(text.contains("Thank you for your valuable feedback!"));
        assert!(!text.contains("Redirecting"));
    }
}
