use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    pub static ref GUARD_DECISIONS_COUNTER: CounterVec = register_counter_vec!(
        "guard_decisions_total",
        "Route guard outcomes on protected paths",
        &["decision"]
    ).unwrap();

    pub static ref CSRF_REJECTIONS_COUNTER: CounterVec = register_counter_vec!(
        "csrf_rejections_total",
        "State-changing requests refused by the CSRF guard",
        &["reason"]
    ).unwrap();

    pub static ref OAUTH_INITIATIONS_COUNTER: CounterVec = register_counter_vec!(
        "oauth_initiations_total",
        "OAuth sign-in attempts by provider and outcome",
        &["provider", "status"]
    ).unwrap();
}
