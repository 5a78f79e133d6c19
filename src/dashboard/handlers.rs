//! Defines the route handler for the dashboard page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState,
    auth::Session,
    transaction::{
        KindFilter, SortDirection, SortField, apply, get_transactions_for_account, project,
    },
};

use super::view::dashboard_view;

/// The state needed to render the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The list view state, parsed from the dashboard URL.
///
/// Every parameter is optional so a bare `/dashboard` renders the default
/// view: all transactions, newest first, page one. Filter and sort links
/// always carry `page=1`, while pagination links carry the current filter
/// and sort, so reloading the page never resets it but changing the view
/// does.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    /// The category filter to apply.
    pub filter: Option<KindFilter>,
    /// The column to sort by.
    pub sort: Option<SortField>,
    /// The direction to sort in.
    pub dir: Option<SortDirection>,
    /// The 1-based page number; clamped by the list pipeline.
    pub page: Option<usize>,
}

/// Display the dashboard page for the logged-in account.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let raw_transactions = match get_transactions_for_account(
        session.account_id,
        &state
            .db_connection
            .lock()
            .expect("Could not acquire database lock"),
    ) {
        Ok(transactions) => transactions,
        Err(error) => return error.into_response(),
    };

    let transactions: Vec<_> = raw_transactions.iter().map(project).collect();

    let filter = query.filter.unwrap_or_default();
    let sort_field = query.sort.unwrap_or_default();
    let sort_direction = query.dir.unwrap_or_default();
    let requested_page = query.page.unwrap_or(1);

    let page = apply(
        &transactions,
        filter,
        sort_field,
        sort_direction,
        requested_page,
    );

    dashboard_view(&session, &page, filter, sort_field, sort_direction).into_response()
}

#[cfg(test)]
mod dashboard_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
    };
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        PasswordHash,
        account::{AccountId, NewAccount, create_account},
        auth::Session,
        db::initialize,
        transaction::{NewTransaction, create_transaction},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{DashboardQuery, DashboardState, get_dashboard_page};

    fn get_test_state() -> (DashboardState, Session) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let account = create_account(
            NewAccount {
                fname: Some("Jane".to_owned()),
                lname: Some("Doe".to_owned()),
                email: "jane@example.com".to_owned(),
                phone: None,
                nic: None,
                amount: Some("150.00".to_owned()),
                card_url: Some("https://cards.example.com/jane.png".to_owned()),
                password_hash: PasswordHash::from_raw_password("hunter2", 4).unwrap(),
            },
            &connection,
        )
        .expect("Could not create test account");

        let session = Session::for_account(&account);

        (
            DashboardState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            session,
        )
    }

    fn seed_transactions(state: &DashboardState, account_id: AccountId, count: i64) {
        let connection = state.db_connection.lock().unwrap();
        let now = OffsetDateTime::now_utc();

        for i in 0..count {
            let (tag, amount) = if i % 3 == 0 {
                ("Top Up", format!("{}", 100 + i))
            } else {
                ("Purchase", format!("{}.50", 10 + i))
            };

            create_transaction(
                NewTransaction {
                    account_id,
                    tag: tag.to_owned(),
                    amount,
                    created_at: now - Duration::days(i),
                },
                &connection,
            )
            .expect("Could not create test transaction");
        }
    }

    async fn render_dashboard(
        state: DashboardState,
        session: Session,
        query: DashboardQuery,
    ) -> scraper::Html {
        let response =
            get_dashboard_page(State(state), Extension(session), Query(query)).await;

        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        document
    }

    fn select_texts(document: &scraper::Html, selector: &str) -> Vec<String> {
        let selector = scraper::Selector::parse(selector).unwrap();
        document
            .select(&selector)
            .map(|element| element.text().collect::<String>().trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn dashboard_greets_the_account_holder() {
        let (state, session) = get_test_state();

        let document = render_dashboard(state, session, DashboardQuery::default()).await;

        let header_text = select_texts(&document, "header");
        assert!(
            header_text
                .iter()
                .any(|text| text.contains("Welcome back, Jane Doe")),
            "want welcome message in header, got {header_text:?}"
        );
    }

    #[tokio::test]
    async fn dashboard_shows_activation_card_image() {
        let (state, session) = get_test_state();

        let document = render_dashboard(state, session, DashboardQuery::default()).await;

        let img_selector = scraper::Selector::parse("img[alt='Activation card']").unwrap();
        let images: Vec<_> = document.select(&img_selector).collect();
        assert_eq!(images.len(), 1, "want 1 activation card image");
        assert_eq!(
            images[0].value().attr("src"),
            Some("https://cards.example.com/jane.png")
        );
    }

    #[tokio::test]
    async fn dashboard_shows_placeholder_without_activation_card() {
        let (state, mut session) = get_test_state();
        session.card_url = None;

        let document = render_dashboard(state, session, DashboardQuery::default()).await;

        let img_selector = scraper::Selector::parse("img[alt='Activation card']").unwrap();
        assert_eq!(document.select(&img_selector).count(), 0);

        let body_text = select_texts(&document, "body");
        assert!(
            body_text
                .iter()
                .any(|text| text.contains("No activation card on file.")),
        );
    }

    #[tokio::test]
    async fn dashboard_renders_first_page_of_transactions() {
        let (state, session) = get_test_state();
        seed_transactions(&state, session.account_id, 12);

        let document = render_dashboard(state, session, DashboardQuery::default()).await;

        let row_selector = scraper::Selector::parse("tbody tr").unwrap();
        let rows = document.select(&row_selector).count();
        assert_eq!(rows, 10, "want a full page of 10 rows, got {rows}");
    }

    #[tokio::test]
    async fn dashboard_renders_trailing_page_of_transactions() {
        let (state, session) = get_test_state();
        seed_transactions(&state, session.account_id, 12);

        let document = render_dashboard(
            state,
            session,
            DashboardQuery {
                page: Some(2),
                ..Default::default()
            },
        )
        .await;

        let row_selector = scraper::Selector::parse("tbody tr").unwrap();
        let rows = document.select(&row_selector).count();
        assert_eq!(rows, 2, "want the 2 leftover rows, got {rows}");
    }

    #[tokio::test]
    async fn dashboard_filters_by_category() {
        let (state, session) = get_test_state();
        seed_transactions(&state, session.account_id, 9);

        let document = render_dashboard(
            state,
            session,
            DashboardQuery {
                filter: Some(crate::transaction::KindFilter::TopUp),
                ..Default::default()
            },
        )
        .await;

        let badge_texts = select_texts(&document, "tbody tr td span");
        assert!(
            badge_texts.iter().any(|text| text.contains("Top-up")),
            "want top-up rows, got {badge_texts:?}"
        );
        assert!(
            !badge_texts.iter().any(|text| text.contains("Purchase")),
            "purchases must be filtered out, got {badge_texts:?}"
        );
    }

    #[tokio::test]
    async fn dashboard_shows_empty_state_without_transactions() {
        let (state, session) = get_test_state();

        let document = render_dashboard(state, session, DashboardQuery::default()).await;

        let body_text = select_texts(&document, "body");
        assert!(
            body_text
                .iter()
                .any(|text| text.contains("No transactions found")),
        );
    }

    #[tokio::test]
    async fn active_sort_header_link_toggles_direction() {
        let (state, session) = get_test_state();
        seed_transactions(&state, session.account_id, 3);

        // Default view sorts by date descending, so the date header link
        // must select ascending and the other headers must reset to
        // descending, all back on page 1.
        let document = render_dashboard(state, session, DashboardQuery::default()).await;

        let link_selector = scraper::Selector::parse("thead a[href]").unwrap();
        let hrefs: Vec<&str> = document
            .select(&link_selector)
            .filter_map(|link| link.value().attr("href"))
            .collect();

        assert!(
            hrefs
                .iter()
                .any(|href| href.contains("sort=date") && href.contains("dir=asc")),
            "want a toggled date link, got {hrefs:?}"
        );
        assert!(
            hrefs
                .iter()
                .any(|href| href.contains("sort=amount") && href.contains("dir=desc")),
            "want a descending amount link, got {hrefs:?}"
        );
        assert!(
            hrefs.iter().all(|href| href.contains("page=1")),
            "sort links must reset pagination, got {hrefs:?}"
        );
    }

    #[tokio::test]
    async fn pagination_links_preserve_filter_and_sort() {
        let (state, session) = get_test_state();
        seed_transactions(&state, session.account_id, 35);

        let document = render_dashboard(
            state,
            session,
            DashboardQuery {
                filter: Some(crate::transaction::KindFilter::Purchase),
                sort: Some(crate::transaction::SortField::Amount),
                dir: Some(crate::transaction::SortDirection::Ascending),
                page: Some(2),
                ..Default::default()
            },
        )
        .await;

        let nav_selector = scraper::Selector::parse("nav[aria-label='Pagination'] a[href]").unwrap();
        let hrefs: Vec<&str> = document
            .select(&nav_selector)
            .filter_map(|link| link.value().attr("href"))
            .collect();

        assert!(!hrefs.is_empty(), "want pagination links");
        assert!(
            hrefs
                .iter()
                .all(|href| href.contains("filter=Purchase")
                    && href.contains("sort=amount")
                    && href.contains("dir=asc")),
            "pagination links must preserve the view state, got {hrefs:?}"
        );
    }
}
