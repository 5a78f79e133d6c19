//! The dashboard: the landing page for logged-in users, showing the account
//! card, the activation card and the paginated transaction history.

mod handlers;
mod view;

pub use handlers::get_dashboard_page;
