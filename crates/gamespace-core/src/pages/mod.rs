//! Form state and submit handlers for the account pages.
//!
//! Each form owns its field values and the last error message to display.
//! A successful submit returns the `Route` to navigate to next.

pub mod login;
pub mod register;

pub use login::LoginForm;
pub use register::RegisterForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login/",
            Route::Register => "/register/",
        }
    }
}
