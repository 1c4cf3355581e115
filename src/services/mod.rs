pub mod cookies;
pub mod csrf;
pub mod metrics;
pub mod oauth;
pub mod redirect;
pub mod session;
pub mod token;
