//! HTTP routes.

pub mod flow;
pub mod health;
pub mod index;
pub mod registration;
pub mod token;

pub use flow::{
    CallbackParams, callback_handler, login_authorization_code_handler,
    login_client_credentials_handler, logout_handler, refresh_handler, revoke_handler,
};
pub use health::health_routes;
pub use index::{index_handler, not_found_handler};
pub use registration::{
    RegistrationForm, SuccessResponse, get_registration_handler, put_registration_handler,
    submit_registration_handler,
};
pub use token::{get_token_handler, put_token_handler};
