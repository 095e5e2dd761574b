// Alert system module: dedup, escalation and classification of trading alerts.
//
// Architecture:
// - model.rs: Identities, events and the escalation policy
// - cooldown.rs: Drops redelivered raw events within the cooldown window
// - timers.rs: Cancellable timer queue used by the engine
// - engine.rs: Escalation state machine (one session per alert identity)
// - triggers.rs: Decides which posted notifications are trading alerts

pub mod cooldown;
pub mod engine;
pub mod model;
pub mod timers;
pub mod triggers;
