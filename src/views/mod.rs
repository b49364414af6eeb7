//! Screen-level state: form state machines, navigation targets and the
//! feed/map list helpers. Rendering lives in the front end.

pub mod auth_form;
pub mod feed;
pub mod report_form;

use serde::Serialize;

/// Bottom navigation tabs plus the sign-in screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Map,
    Report,
    Profile,
    Auth,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Map => "/map",
            Route::Report => "/report",
            Route::Profile => "/profile",
            Route::Auth => "/auth",
        }
    }

    /// Where a screen sends the user given their sign-in state.
    pub fn guard(self, signed_in: bool) -> Route {
        match (self, signed_in) {
            (Route::Auth, true) => Route::Home,
            (Route::Auth, false) => Route::Auth,
            (_, false) => Route::Auth,
            (route, true) => route,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPhase {
    Idle { error: Option<String> },
    Submitting,
}

impl Default for FormPhase {
    fn default() -> Self {
        FormPhase::Idle { error: None }
    }
}

impl FormPhase {
    pub fn is_submitting(&self) -> bool {
        matches!(self, FormPhase::Submitting)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FormPhase::Idle { error } => error.as_deref(),
            FormPhase::Submitting => None,
        }
    }
}
