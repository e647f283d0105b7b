use crate::captcha::{CaptchaChallenge, CaptchaCheck};
use crate::errors::ValidationError;
use crate::models::Credentials;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
}

impl AuthMode {
    pub fn failure_message(&self) -> &'static str {
        match self {
            AuthMode::Login => "Login failed",
            AuthMode::Signup => "Signup failed",
        }
    }
}

/// Login/signup form shown while no session exists.
#[derive(Debug, Clone)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub captcha: CaptchaChallenge,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for AuthForm {
    fn default() -> Self {
        AuthForm {
            mode: AuthMode::Login,
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            captcha: CaptchaChallenge::generate(),
            error: None,
            submitting: false,
        }
    }
}

impl AuthForm {
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        self.error = None;
        self.refresh_captcha();
    }

    pub fn refresh_captcha(&mut self) {
        self.captcha = CaptchaChallenge::generate();
    }

    /// Local checks in display order. A wrong CAPTCHA answer replaces the challenge.
    pub fn validate(&mut self) -> Result<Credentials, ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        if self.password.trim().is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        if self.mode == AuthMode::Signup {
            if self.password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ValidationError::PasswordTooShort);
            }
            if self.password != self.confirm_password {
                return Err(ValidationError::PasswordMismatch);
            }
        }
        match self.captcha.check() {
            CaptchaCheck::Correct => {}
            CaptchaCheck::Missing => return Err(ValidationError::MissingCaptcha),
            CaptchaCheck::Wrong => {
                self.refresh_captcha();
                return Err(ValidationError::WrongCaptcha);
            }
        }
        Ok(Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }

    /// Called once the backend accepted the credentials.
    pub fn complete(&mut self) {
        self.email.clear();
        self.password.clear();
        self.confirm_password.clear();
        self.error = None;
        self.mode = AuthMode::Login;
        self.refresh_captcha();
    }

    pub fn reset(&mut self) {
        *self = AuthForm::default();
    }
}
