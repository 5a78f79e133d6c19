//! The API endpoints URIs.

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/login";
/// The page for changing the account password.
pub const CHANGE_PASSWORD_VIEW: &str = "/change-password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/login";
/// The route for changing the account password.
pub const CHANGE_PASSWORD_API: &str = "/api/change-password";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/logout";
