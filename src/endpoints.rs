//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/p2p/groups/{group_id}', use `format_endpoint`.

/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for listing the accounts of the current user.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route for querying the transaction history of the current user.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for listing the contacts of the current user.
pub const CONTACTS: &str = "/api/contacts";
/// The route for listing and creating split groups.
pub const GROUPS: &str = "/api/p2p/groups";
/// The route for deleting a split group.
pub const GROUP: &str = "/api/p2p/groups/{group_id}";
/// The route for adding a member to a split group.
pub const GROUP_MEMBERS: &str = "/api/p2p/groups/{group_id}/members";
/// The route for removing a member from a split group.
pub const GROUP_MEMBER: &str = "/api/p2p/groups/{group_id}/members/{member_id}";
/// The route for splitting an amount among the members of a group.
pub const GROUP_SPLIT: &str = "/api/p2p/groups/{group_id}/split";
/// The route for sending money to a contact.
pub const P2P_SEND: &str = "/api/p2p/send";
/// The route for listing piggy banks.
pub const PIGGY_BANKS: &str = "/api/piggy-banks";
/// The route for creating a piggy bank.
pub const PIGGY_CREATE: &str = "/api/piggy/create";
/// The route for moving money between an account and a piggy bank.
pub const PIGGY_TRANSFER: &str = "/api/piggy/transfer";
/// The route for deleting a piggy bank.
pub const PIGGY: &str = "/api/piggy/{piggy_id}";
/// The route for listing notifications.
pub const NOTIFICATIONS: &str = "/api/notifications";
/// The route for updating the status of a notification.
pub const NOTIFICATION: &str = "/api/notifications/{notification_id}";
/// The route for the income and spending report.
pub const REPORT_SUMMARY: &str = "/api/reports/summary";
/// The route for reading and changing the settings of the current user.
pub const SETTINGS: &str = "/api/settings";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// Paths with more than one parameter can be formatted by calling this
/// function once per parameter, left to right.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::CONTACTS);
        assert_endpoint_is_valid_uri(endpoints::GROUPS);
        assert_endpoint_is_valid_uri(endpoints::P2P_SEND);
        assert_endpoint_is_valid_uri(endpoints::PIGGY_BANKS);
        assert_endpoint_is_valid_uri(endpoints::PIGGY_CREATE);
        assert_endpoint_is_valid_uri(endpoints::PIGGY_TRANSFER);
        assert_endpoint_is_valid_uri(endpoints::NOTIFICATIONS);
        assert_endpoint_is_valid_uri(endpoints::REPORT_SUMMARY);
        assert_endpoint_is_valid_uri(endpoints::SETTINGS);

        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::GROUP, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::GROUP_MEMBERS, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::GROUP_SPLIT, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::PIGGY, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::NOTIFICATION, 1));
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());

        // Parameter with single word should also work.
        let formatted_path = format_endpoint("/hello/{world}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint("/hello/{world}/bye", 1);

        assert_eq!(formatted_path, "/hello/1/bye");
    }

    #[test]
    fn two_parameters_are_formatted_left_to_right() {
        let formatted_path = format_endpoint(
            &format_endpoint(endpoints::GROUP_MEMBER, 3),
            7,
        );

        assert_eq!(formatted_path, "/api/p2p/groups/3/members/7");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
