//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};

use crate::{
    AppState, Error,
    account::get_accounts_endpoint,
    auth::{auth_guard, post_log_in, post_log_out},
    contact::get_contacts_endpoint,
    endpoints,
    notification::{get_notifications_endpoint, update_notification_endpoint},
    p2p::send_p2p_endpoint,
    piggy::{
        create_piggy_bank_endpoint, delete_piggy_bank_endpoint, get_piggy_banks_endpoint,
        piggy_transfer_endpoint,
    },
    report::get_report_summary_endpoint,
    settings::{get_settings_endpoint, update_settings_endpoint},
    split::{
        add_member_endpoint, create_group_endpoint, delete_group_endpoint, get_groups_endpoint,
        remove_member_endpoint, split_group_endpoint,
    },
    transaction::get_transactions_endpoint,
};

/// Return a router with all the app's routes.
///
/// Every route except log in and log out requires a valid auth cookie.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(endpoints::ACCOUNTS, get(get_accounts_endpoint))
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(endpoints::CONTACTS, get(get_contacts_endpoint))
        .route(
            endpoints::GROUPS,
            get(get_groups_endpoint).post(create_group_endpoint),
        )
        .route(endpoints::GROUP, delete(delete_group_endpoint))
        .route(endpoints::GROUP_MEMBERS, post(add_member_endpoint))
        .route(endpoints::GROUP_MEMBER, delete(remove_member_endpoint))
        .route(endpoints::GROUP_SPLIT, post(split_group_endpoint))
        .route(endpoints::P2P_SEND, post(send_p2p_endpoint))
        .route(endpoints::PIGGY_BANKS, get(get_piggy_banks_endpoint))
        .route(endpoints::PIGGY_CREATE, post(create_piggy_bank_endpoint))
        .route(endpoints::PIGGY_TRANSFER, post(piggy_transfer_endpoint))
        .route(endpoints::PIGGY, delete(delete_piggy_bank_endpoint))
        .route(endpoints::NOTIFICATIONS, get(get_notifications_endpoint))
        .route(endpoints::NOTIFICATION, put(update_notification_endpoint))
        .route(endpoints::REPORT_SUMMARY, get(get_report_summary_endpoint))
        .route(
            endpoints::SETTINGS,
            get(get_settings_endpoint).put(update_settings_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
