use thiserror::Error;

/// Local form validation failures. The display text is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your email")]
    MissingEmail,
    #[error("Please enter your password")]
    MissingPassword,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please answer the CAPTCHA")]
    MissingCaptcha,
    #[error("Incorrect CAPTCHA answer. Try again.")]
    WrongCaptcha,
    #[error("Please fill all fields before booking.")]
    IncompleteBooking,
    #[error("Please write your suggestion.")]
    EmptyFeedback,
    #[error("Booking or user information missing.")]
    MissingBookingContext,
    #[error("Invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid time `{0}`, expected HH:MM")]
    InvalidTime(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Remote(String),
    #[error("A request is already in progress, please wait.")]
    Busy,
    #[error("Please log in first.")]
    NotAuthenticated,
    #[error("Select a professional first.")]
    NoSelection,
    #[error("Unknown professional #{0}")]
    UnknownProfessional(u32),
    #[error("Unknown service #{0}")]
    UnknownService(u32),
    #[error("The booking form changed while the request was in flight.")]
    Superseded,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_URL is not a valid URL: {0}")]
    InvalidApiUrl(#[from] url::ParseError),
    #[error("API_URL `{0}` cannot serve as a base for endpoint paths")]
    NotABaseUrl(String),
    #[error("HTTP_TIMEOUT_SECS must be a whole number of seconds, got `{0}`")]
    InvalidTimeout(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
