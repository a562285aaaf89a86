//! HTTP route handlers
//!
//! Thin JSON adapters over the services. Domain verdicts pass through
//! as `{ok: ...}` bodies with status 200; only structural failures
//! (bad token, malformed body) map to error statuses.

pub mod api;
pub mod health;

pub use api::{
    handle_burn_ticket, handle_create_transfer_code, handle_dev_signin, handle_get_pick,
    handle_get_saved, handle_list_events, handle_log_event, handle_mint_ticket,
    handle_redeem_transfer_code, handle_set_saved,
};
pub use health::{health_check, version_info};
