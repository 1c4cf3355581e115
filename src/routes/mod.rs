pub mod auth;
pub mod csrf;
pub mod health;
pub mod metrics;
pub mod oauth;
pub mod session;
