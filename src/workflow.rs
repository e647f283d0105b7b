use chrono::{NaiveDate, NaiveTime};
use tokio::task::JoinHandle;

use crate::errors::{ValidationError, WorkflowError};
use crate::models::{
    BookingDraft, BookingDuration, BookingResult, NewBooking, NewFeedback, Professional, ServiceType, Session,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const FEEDBACK_THANKS: &str = "Thank you for your valuable feedback!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Services,
    Booking,
}

/// Keeps ASCII letters and whitespace, drops everything else.
pub fn sanitize_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect()
}

/// The professional being booked together with everything tied to that choice.
#[derive(Debug)]
pub struct Selection {
    pub id: u64,
    pub professional: &'static Professional,
    pub draft: BookingDraft,
    pub result: Option<BookingResult>,
    pub feedback: String,
    pub feedback_message: Option<String>,
    pub booking_in_flight: bool,
    pub feedback_in_flight: bool,
}

impl Selection {
    fn new(id: u64, professional: &'static Professional) -> Self {
        Selection {
            id,
            professional,
            draft: BookingDraft::default(),
            result: None,
            feedback: String::new(),
            feedback_message: None,
            booking_in_flight: false,
            feedback_in_flight: false,
        }
    }

    pub fn set_customer_name(&mut self, raw: &str) -> &str {
        self.draft.customer_name = sanitize_name(raw);
        &self.draft.customer_name
    }

    pub fn set_date(&mut self, raw: &str) -> Result<NaiveDate, ValidationError> {
        let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(raw.trim().to_string()))?;
        self.draft.date = Some(date);
        Ok(date)
    }

    pub fn set_time(&mut self, raw: &str) -> Result<NaiveTime, ValidationError> {
        let time = NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
            .map_err(|_| ValidationError::InvalidTime(raw.trim().to_string()))?;
        self.draft.time = Some(time);
        Ok(time)
    }

    pub fn set_duration(&mut self, duration: BookingDuration) {
        self.draft.duration = duration;
    }

    pub fn set_service_type(&mut self, service_type: ServiceType) {
        self.draft.service_type = service_type;
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.draft.notes = notes.to_string();
    }

    pub fn booking_request(&self, session: Option<&Session>) -> Result<NewBooking, ValidationError> {
        let draft = &self.draft;
        let name = draft.customer_name.trim();
        match (session, draft.date, draft.time) {
            (Some(session), Some(date), Some(time)) if !name.is_empty() && !session.user_id.is_empty() => {
                Ok(NewBooking {
                    user_id: session.user_id.clone(),
                    customer_name: name.to_string(),
                    professional_id: self.professional.id,
                    professional_name: self.professional.name.to_string(),
                    date: date.format(DATE_FORMAT).to_string(),
                    time: time.format(TIME_FORMAT).to_string(),
                    duration: draft.duration,
                    service_type: draft.service_type,
                    notes: draft.notes.clone(),
                })
            }
            _ => Err(ValidationError::IncompleteBooking),
        }
    }

    pub fn feedback_request(&self, session: Option<&Session>) -> Result<NewFeedback, ValidationError> {
        if self.feedback.trim().is_empty() {
            return Err(ValidationError::EmptyFeedback);
        }
        match (&self.result, session) {
            (Some(result), Some(session)) => Ok(NewFeedback {
                booking_id: result.booking_id.clone(),
                user_id: session.user_id.clone(),
                message: self.feedback.clone(),
            }),
            _ => Err(ValidationError::MissingBookingContext),
        }
    }

    /// Confirmation banner, available once the booking went through.
    pub fn summary(&self) -> Option<String> {
        self.result.as_ref()?;
        let draft = &self.draft;
        let when = match (draft.date, draft.time) {
            (Some(date), Some(time)) => format!(" on {} at {}", date.format(DATE_FORMAT), time.format(TIME_FORMAT)),
            _ => String::new(),
        };
        let mut text = format!(
            "🎉 Booking confirmed with {}{} ({})!\nService Type: {}",
            self.professional.name,
            when,
            draft.duration.label(),
            draft.service_type.label()
        );
        if !draft.notes.is_empty() {
            text.push_str(&format!("\nNotes: {}", draft.notes));
        }
        Some(text)
    }
}

#[derive(Debug)]
struct PendingRedirect {
    ticket: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct Workflow {
    view: View,
    selection: Option<Selection>,
    redirect: Option<PendingRedirect>,
    next_id: u64,
}

impl Workflow {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> Result<&mut Selection, WorkflowError> {
        self.selection.as_mut().ok_or(WorkflowError::NoSelection)
    }

    /// The selection a request was issued for, if it is still current.
    pub fn current_selection(&mut self, id: u64) -> Option<&mut Selection> {
        self.selection.as_mut().filter(|s| s.id == id)
    }

    pub fn redirect_pending(&self) -> bool {
        self.redirect.is_some()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn select(&mut self, professional: &'static Professional) -> &mut Selection {
        self.cancel_redirect();
        let id = self.next_id();
        self.view = View::Booking;
        self.selection.insert(Selection::new(id, professional))
    }

    pub fn go_home(&mut self) {
        self.clear_to(View::Home);
    }

    pub fn go_services(&mut self) {
        self.abandon_redirect();
        self.view = View::Services;
    }

    pub fn go_booking(&mut self) -> Result<(), WorkflowError> {
        if self.selection.is_none() {
            return Err(WorkflowError::NoSelection);
        }
        self.abandon_redirect();
        self.view = View::Booking;
        Ok(())
    }

    pub fn cancel_booking(&mut self) {
        self.clear_to(View::Home);
    }

    pub fn return_to_services(&mut self) {
        self.clear_to(View::Services);
    }

    pub fn reset(&mut self) {
        self.clear_to(View::Home);
    }

    fn clear_to(&mut self, view: View) {
        self.cancel_redirect();
        self.view = view;
        self.selection = None;
    }

    pub fn cancel_redirect(&mut self) -> bool {
        match self.redirect.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    // Navigating away keeps the selection, so the announcement of a redirect that
    // will no longer happen has to go with it.
    fn abandon_redirect(&mut self) {
        if self.cancel_redirect() {
            if let Some(selection) = self.selection.as_mut() {
                selection.feedback_message = None;
            }
        }
    }

    /// Reserves a ticket for a redirect task spawned right after.
    pub fn redirect_ticket(&mut self) -> u64 {
        self.cancel_redirect();
        self.next_id()
    }

    pub fn arm_redirect(&mut self, ticket: u64, handle: JoinHandle<()>) {
        self.cancel_redirect();
        self.redirect = Some(PendingRedirect { ticket, handle });
    }

    /// Runs from inside the redirect task. Returns false when the ticket went stale.
    pub fn finish_redirect(&mut self, ticket: u64) -> bool {
        if self.redirect.as_ref().map(|p| p.ticket) != Some(ticket) {
            return false;
        }
        // Detach rather than abort: this is the task's own handle.
        self.redirect = None;
        self.view = View::Services;
        self.selection = None;
        true
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        self.cancel_redirect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn pro(id: u32) -> &'static Professional {
        Catalog::default().professional(id).unwrap()
    }

    fn session() -> Session {
        Session { user_id: "u-1".into() }
    }

    #[test]
    fn sanitize_strips_digits_and_symbols() {
        assert_eq!(sanitize_name("John123!"), "John");
        assert_eq!(sanitize_name("Rajesh Kumar 2"), "Rajesh Kumar ");
        assert_eq!(sanitize_name("Zoë  O'Brien"), "Zo  OBrien");
        assert_eq!(sanitize_name("Zoë Ωmega"), "Zo mega");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["John123!", "John", "a-b_c d", "  ", "🙂 Ana 42", "Priya\tSharma"] {
            let once = sanitize_name(raw);
            assert_eq!(sanitize_name(&once), once);
        }
    }

    #[test]
    fn selecting_opens_booking_with_fresh_draft() {
        let mut wf = Workflow::default();
        wf.select(pro(1)).set_customer_name("Old Name");
        let sel = wf.select(pro(2));
        assert_eq!(sel.professional.id, 2);
        assert_eq!(sel.draft, BookingDraft::default());
        assert_eq!(wf.view(), View::Booking);
    }

    #[test]
    fn booking_view_needs_selection() {
        let mut wf = Workflow::default();
        assert_eq!(wf.go_booking(), Err(WorkflowError::NoSelection));
        assert_eq!(wf.view(), View::Home);

        wf.select(pro(3));
        wf.go_services();
        assert!(wf.selection().is_some());
        assert_eq!(wf.go_booking(), Ok(()));

        wf.go_home();
        assert!(wf.selection().is_none());
    }

    #[test]
    fn cancel_and_return_clear_state() {
        let mut wf = Workflow::default();
        wf.select(pro(1)).result = Some(BookingResult { booking_id: "b".into() });
        wf.cancel_booking();
        assert_eq!(wf.view(), View::Home);
        assert!(wf.selection().is_none());

        wf.select(pro(1));
        wf.return_to_services();
        assert_eq!(wf.view(), View::Services);
        assert!(wf.selection().is_none());
    }

    #[test]
    fn date_and_time_are_parsed() {
        let mut wf = Workflow::default();
        let sel = wf.select(pro(1));
        assert!(sel.set_date("2026-10-20").is_ok());
        assert_eq!(sel.set_date("20/10/2026"), Err(ValidationError::InvalidDate("20/10/2026".into())));
        assert_eq!(sel.draft.date, NaiveDate::from_ymd_opt(2026, 10, 20));
        assert!(sel.set_time("25:00").is_err());
        assert!(sel.set_time(" 09:30 ").is_ok());
    }

    #[test]
    fn booking_request_requires_every_field() {
        let mut wf = Workflow::default();
        let sel = wf.select(pro(1));
        let s = session();
        assert_eq!(sel.booking_request(Some(&s)), Err(ValidationError::IncompleteBooking));
        sel.set_customer_name("Rajesh");
        sel.set_date("2026-10-20").unwrap();
        assert_eq!(sel.booking_request(Some(&s)), Err(ValidationError::IncompleteBooking));
        sel.set_time("09:30").unwrap();
        assert_eq!(sel.booking_request(None), Err(ValidationError::IncompleteBooking));
        sel.set_customer_name("123 ");
        assert_eq!(sel.booking_request(Some(&s)), Err(ValidationError::IncompleteBooking));

        sel.set_customer_name("Rajesh");
        let req = sel.booking_request(Some(&s)).unwrap();
        assert_eq!(req.professional_name, "Rajesh Kumar");
        assert_eq!(req.date, "2026-10-20");
        assert_eq!(req.time, "09:30");
        assert_eq!(req.duration, BookingDuration::OneHour);
        assert_eq!(req.service_type, ServiceType::Standard);
    }

    #[test]
    fn feedback_request_checks_text_then_context() {
        let mut wf = Workflow::default();
        let sel = wf.select(pro(1));
        let s = session();
        sel.feedback = "  ".into();
        assert_eq!(sel.feedback_request(Some(&s)), Err(ValidationError::EmptyFeedback));
        sel.feedback = "Great!".into();
        assert_eq!(sel.feedback_request(Some(&s)), Err(ValidationError::MissingBookingContext));
        sel.result = Some(BookingResult { booking_id: "b-9".into() });
        assert_eq!(sel.feedback_request(None), Err(ValidationError::MissingBookingContext));
        let req = sel.feedback_request(Some(&s)).unwrap();
        assert_eq!(req.booking_id, "b-9");
        assert_eq!(req.message, "Great!");
    }

    #[test]
    fn summary_lists_optional_notes() {
        let mut wf = Workflow::default();
        let sel = wf.select(pro(4));
        assert!(sel.summary().is_none());
        sel.set_date("2026-10-20").unwrap();
        sel.set_time("14:00").unwrap();
        sel.set_duration(BookingDuration::HalfDay);
        sel.result = Some(BookingResult { booking_id: "b".into() });
        let text = sel.summary().unwrap();
        assert!(text.contains("Kavita Singh on 2026-10-20 at 14:00 (Half Day (4 Hours))"));
        assert!(!text.contains("Notes"));
        sel.set_notes("Bring a ladder");
        assert!(sel.summary().unwrap().ends_with("Notes: Bring a ladder"));
    }

    #[tokio::test]
    async fn navigation_aborts_pending_redirect() {
        let mut wf = Workflow::default();
        wf.select(pro(1));
        let ticket = wf.redirect_ticket();
        let handle = tokio::spawn(std::future::pending::<()>());
        wf.arm_redirect(ticket, handle);
        assert!(wf.redirect_pending());

        wf.go_services();
        assert!(!wf.redirect_pending());
        assert!(!wf.finish_redirect(ticket));
        assert!(wf.selection().is_some());
    }

    #[tokio::test]
    async fn leaving_before_redirect_drops_its_announcement() {
        let mut wf = Workflow::default();
        let sel = wf.select(pro(1));
        sel.result = Some(BookingResult { booking_id: "b-1".into() });
        sel.feedback_message = Some(FEEDBACK_THANKS.into());
        let ticket = wf.redirect_ticket();
        wf.arm_redirect(ticket, tokio::spawn(std::future::pending::<()>()));

        wf.go_services();
        assert_eq!(wf.go_booking(), Ok(()));
        let sel = wf.selection().unwrap();
        assert!(sel.feedback_message.is_none());
        assert!(sel.summary().is_some());
    }
}
