//! View-state controller tying the auth form, the booking workflow and the remote
//! client together.
//!
//! State sits behind an `Arc<Mutex<_>>`. Each remote operation validates and marks
//! itself busy under the lock, releases it for the network round trip, then re-locks
//! to apply the outcome. A response whose selection has since been replaced is dropped.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::time::sleep;

use crate::api::BookingApi;
use crate::catalog::Catalog;
use crate::errors::{ValidationError, WorkflowError};
use crate::models::{BookingDuration, BookingResult, Professional, ServiceType, Session};
use crate::session::{AuthForm, AuthMode};
use crate::workflow::{Workflow, FEEDBACK_THANKS};

pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    RedirectedToServices,
}

#[derive(Debug, Default)]
pub struct AppState {
    auth: AuthForm,
    session: Option<Session>,
    workflow: Workflow,
}

impl AppState {
    pub fn auth(&self) -> &AuthForm {
        &self.auth
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    fn require_session(&self) -> Result<(), WorkflowError> {
        match self.session {
            Some(_) => Ok(()),
            None => Err(WorkflowError::NotAuthenticated),
        }
    }
}

#[derive(Clone)]
pub struct Controller {
    state: Arc<Mutex<AppState>>,
    api: Arc<dyn BookingApi>,
    catalog: Catalog,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl Controller {
    pub fn new(api: Arc<dyn BookingApi>, catalog: Catalog) -> Self {
        Controller {
            state: Arc::new(Mutex::new(AppState::default())),
            api,
            catalog,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read access for rendering. Do not hold the guard across a controller call.
    pub async fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.session().is_some()
    }

    // Auth form

    pub async fn set_email(&self, email: &str) {
        self.state.lock().await.auth.email = email.to_string();
    }

    pub async fn set_password(&self, password: &str) {
        self.state.lock().await.auth.password = password.to_string();
    }

    pub async fn set_confirm_password(&self, password: &str) {
        self.state.lock().await.auth.confirm_password = password.to_string();
    }

    pub async fn set_captcha_answer(&self, answer: &str) {
        self.state.lock().await.auth.captcha.answer = answer.to_string();
    }

    pub async fn refresh_captcha(&self) {
        self.state.lock().await.auth.refresh_captcha();
    }

    pub async fn toggle_auth_mode(&self) -> AuthMode {
        let mut state = self.state.lock().await;
        state.auth.toggle_mode();
        state.auth.mode
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.auth.mode = AuthMode::Login;
            state.auth.email = email.to_string();
            state.auth.password = password.to_string();
        }
        self.submit_auth().await
    }

    pub async fn signup(&self, email: &str, password: &str, confirm_password: &str) -> Result<Session, WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.auth.mode = AuthMode::Signup;
            state.auth.email = email.to_string();
            state.auth.password = password.to_string();
            state.auth.confirm_password = confirm_password.to_string();
        }
        self.submit_auth().await
    }

    /// Submits the auth form in its current mode.
    async fn submit_auth(&self) -> Result<Session, WorkflowError> {
        let (mode, credentials) = {
            let mut state = self.state.lock().await;
            if state.auth.submitting {
                return Err(WorkflowError::Busy);
            }
            state.auth.error = None;
            let credentials = match state.auth.validate() {
                Ok(credentials) => credentials,
                Err(e) => {
                    state.auth.error = Some(e.to_string());
                    return Err(e.into());
                }
            };
            state.auth.submitting = true;
            (state.auth.mode, credentials)
        };

        let result = match mode {
            AuthMode::Login => self.api.login(&credentials).await,
            AuthMode::Signup => self.api.signup(&credentials).await,
        };

        let mut state = self.state.lock().await;
        state.auth.submitting = false;
        let user_id = if result.success { result.user_id() } else { None };
        match user_id {
            Some(user_id) => {
                let session = Session { user_id };
                state.session = Some(session.clone());
                state.auth.complete();
                state.workflow.reset();
                info!("✓ User {} authenticated ({:?})", session.user_id, mode);
                Ok(session)
            }
            None => {
                let message = result.error_message(mode.failure_message());
                warn!("{:?} rejected: {}", mode, message);
                state.auth.error = Some(message.clone());
                Err(WorkflowError::Remote(message))
            }
        }
    }

    pub async fn logout(&self) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.session.take() {
            info!("User {} logged out", session.user_id);
        }
        state.auth.reset();
        state.workflow.reset();
    }

    // Navigation

    pub async fn go_home(&self) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.require_session()?;
        state.workflow.go_home();
        Ok(())
    }

    pub async fn go_services(&self) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.require_session()?;
        state.workflow.go_services();
        Ok(())
    }

    pub async fn go_booking(&self) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.require_session()?;
        state.workflow.go_booking()
    }

    pub async fn select_professional(&self, professional_id: u32) -> Result<&'static Professional, WorkflowError> {
        let professional = self
            .catalog
            .professional(professional_id)
            .ok_or(WorkflowError::UnknownProfessional(professional_id))?;
        let mut state = self.state.lock().await;
        state.require_session()?;
        state.workflow.select(professional);
        Ok(professional)
    }

    pub async fn select_service(&self, service_id: u32) -> Result<&'static Professional, WorkflowError> {
        let professional = self
            .catalog
            .professional_for_service(service_id)
            .ok_or(WorkflowError::UnknownService(service_id))?;
        self.select_professional(professional.id).await
    }

    pub async fn cancel_booking(&self) {
        self.state.lock().await.workflow.cancel_booking();
    }

    pub async fn return_to_services(&self) {
        self.state.lock().await.workflow.return_to_services();
    }

    // Booking form

    /// Stores the sanitized name and returns it.
    pub async fn set_customer_name(&self, raw: &str) -> Result<String, WorkflowError> {
        let mut state = self.state.lock().await;
        Ok(state.workflow.selection_mut()?.set_customer_name(raw).to_string())
    }

    pub async fn set_date(&self, raw: &str) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.workflow.selection_mut()?.set_date(raw)?;
        Ok(())
    }

    pub async fn set_time(&self, raw: &str) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.workflow.selection_mut()?.set_time(raw)?;
        Ok(())
    }

    pub async fn set_duration(&self, duration: BookingDuration) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.workflow.selection_mut()?.set_duration(duration);
        Ok(())
    }

    pub async fn set_service_type(&self, service_type: ServiceType) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.workflow.selection_mut()?.set_service_type(service_type);
        Ok(())
    }

    pub async fn set_notes(&self, notes: &str) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.workflow.selection_mut()?.set_notes(notes);
        Ok(())
    }

    pub async fn confirm_booking(&self) -> Result<BookingResult, WorkflowError> {
        let (selection_id, request) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let selection = state
                .workflow
                .selection_mut()
                .map_err(|_| ValidationError::IncompleteBooking)?;
            if selection.booking_in_flight {
                return Err(WorkflowError::Busy);
            }
            let request = selection.booking_request(state.session.as_ref())?;
            selection.booking_in_flight = true;
            (selection.id, request)
        };

        let result = self.api.create_booking(&request).await;

        let mut state = self.state.lock().await;
        let Some(selection) = state.workflow.current_selection(selection_id) else {
            warn!("Dropping booking response for a closed form");
            return Err(WorkflowError::Superseded);
        };
        selection.booking_in_flight = false;
        match result.booking_id().filter(|_| result.success) {
            Some(booking_id) => {
                info!("✓ Booking confirmed with ID: {}", booking_id);
                let booking = BookingResult { booking_id };
                selection.result = Some(booking.clone());
                selection.feedback_message = None;
                Ok(booking)
            }
            None => {
                let message = result.error_message("Booking failed");
                warn!("Booking rejected: {}", message);
                Err(WorkflowError::Remote(message))
            }
        }
    }

    // Feedback

    /// Stores `text` as the feedback draft and submits it. A failed submission keeps the draft.
    pub async fn submit_feedback(&self, text: &str) -> Result<String, WorkflowError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyFeedback.into());
        }
        let (selection_id, request) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let selection = state
                .workflow
                .selection_mut()
                .map_err(|_| ValidationError::MissingBookingContext)?;
            if selection.feedback_in_flight {
                return Err(WorkflowError::Busy);
            }
            selection.feedback = text.to_string();
            let request = selection.feedback_request(state.session.as_ref())?;
            selection.feedback_in_flight = true;
            (selection.id, request)
        };

        let result = self.api.submit_feedback(&request).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(selection) = state.workflow.current_selection(selection_id) else {
            warn!("Dropping feedback response for a closed form");
            return Err(WorkflowError::Superseded);
        };
        selection.feedback_in_flight = false;
        if !result.success {
            let message = result.error_message("Feedback submission failed");
            warn!("Feedback rejected: {}", message);
            return Err(WorkflowError::Remote(message));
        }
        info!("✓ Feedback saved for booking: {}", request.booking_id);
        selection.feedback.clear();
        selection.feedback_message = Some(FEEDBACK_THANKS.to_string());
        self.schedule_redirect(&mut state.workflow);
        Ok(FEEDBACK_THANKS.to_string())
    }

    fn schedule_redirect(&self, workflow: &mut Workflow) {
        let ticket = workflow.redirect_ticket();
        // Weak so a torn-down controller is not kept alive by its own timer.
        let state = Arc::downgrade(&self.state);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            sleep(REDIRECT_DELAY).await;
            let Some(shared) = state.upgrade() else {
                return;
            };
            let mut state = shared.lock().await;
            if state.workflow.finish_redirect(ticket) {
                info!("Redirected to services");
                if let Some(events) = events {
                    let _ = events.send(Event::RedirectedToServices);
                }
            }
        });
        workflow.arm_redirect(ticket, handle);
    }
}
