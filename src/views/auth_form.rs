use tracing::info;

use super::{FormPhase, Route};
use crate::error::{ClientError, ValidationError};
use crate::models::user::{SignUpMetadata, SignUpRequest};
use crate::notify::{Notice, Notifier};
use crate::session::AuthSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    phase: FormPhase,
}

impl AuthForm {
    pub fn sign_in() -> Self {
        Self::default()
    }

    pub fn sign_up() -> Self {
        Self {
            mode: AuthMode::SignUp,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.phase = FormPhase::default();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if self.mode == AuthMode::SignUp && self.full_name.trim().is_empty() {
            missing.push("full_name");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }

    /// Returns the screen to show next. Sign-up that still needs email
    /// confirmation keeps the user on [`Route::Auth`].
    pub async fn submit(
        &mut self,
        session: &AuthSession,
        notifier: &dyn Notifier,
        email_redirect_to: Option<String>,
    ) -> Result<Route, ClientError> {
        if let Err(err) = self.validate() {
            notifier.notify(Notice::error(
                "Missing Information",
                "Please fill in all required fields",
            ));
            self.phase = FormPhase::Idle {
                error: Some(err.to_string()),
            };
            return Err(err.into());
        }

        self.phase = FormPhase::Submitting;
        let email = self.email.trim().to_string();

        let result = match self.mode {
            AuthMode::SignIn => session
                .sign_in(&email, &self.password)
                .await
                .map(|_| {
                    notifier.notify(Notice::info("Welcome back!", "You have signed in."));
                    Route::Home
                })
                .map_err(|err| ("Sign in failed", err)),
            AuthMode::SignUp => {
                let phone = Some(self.phone.trim().to_string()).filter(|p| !p.is_empty());
                let request = SignUpRequest {
                    email,
                    password: self.password.clone(),
                    metadata: SignUpMetadata {
                        full_name: self.full_name.trim().to_string(),
                        phone,
                    },
                    email_redirect_to,
                };
                session
                    .sign_up(request)
                    .await
                    .map(|outcome| {
                        if outcome.session.is_some() {
                            Route::Home
                        } else {
                            info!(user_id = %outcome.user.id, "sign-up awaiting email confirmation");
                            notifier.notify(Notice::info(
                                "Account created successfully!",
                                "Please check your email to verify your account.",
                            ));
                            Route::Auth
                        }
                    })
                    .map_err(|err| ("Sign up failed", err))
            }
        };

        match result {
            Ok(route) => {
                let mode = self.mode;
                *self = AuthForm {
                    mode,
                    ..AuthForm::default()
                };
                Ok(route)
            }
            Err((title, err)) => {
                notifier.notify(Notice::error(title, err.to_string()));
                self.phase = FormPhase::Idle {
                    error: Some(err.to_string()),
                };
                Err(err.into())
            }
        }
    }
}
