pub mod addresses;
pub mod auth;
pub mod bulk;
pub mod chain_events;
pub mod comments;
pub mod communities;
pub mod error;
pub mod invites;
pub mod middleware;
pub mod notifications;
pub mod reactions;
pub mod subscriptions;
pub mod threads;
