//! Loads the stored uploader's records, applies an optional search query and writes
//! `UserData.xlsx` and `UserData.pdf` to `EXPORT_DIR`.
//!
//! Usage: `records_export [query]`

use std::path::PathBuf;
use std::time::Instant;

use contactsheet::config::ClientConfig;
use contactsheet::view::client::HttpRecordsClient;
use contactsheet::view::{LoadState, TableView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "contactsheet=info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = ClientConfig::from_env();
    let client = HttpRecordsClient::new(&config.api_base_url);

    let mut view = TableView::new();
    view.load(&client, config.upload_users_id.as_deref()).await;
    match view.state() {
        LoadState::NotLoggedIn => anyhow::bail!("User not logged in (set UPLOAD_USERS_ID)"),
        LoadState::Failed(message) => anyhow::bail!("{message}"),
        _ => {}
    }

    if let Some(query) = std::env::args().nth(1) {
        view.set_query(&query);
    }

    loop {
        println!("Page {} of {}", view.page(), view.total_pages());
        for r in view.page_items() {
            println!(
                "{:>5}  {:<24} {:<32} {:<14} {:<8} {}",
                r.id,
                r.name.as_deref().unwrap_or(""),
                r.email,
                r.contact_no,
                r.gender.as_deref().unwrap_or(""),
                r.address.as_deref().unwrap_or(""),
            );
        }
        if !view.has_next() {
            break;
        }
        view.next_page();
    }

    let written = view.export_spreadsheet(&config.export_dir, Instant::now());
    report(&view, written);
    let written = view.export_pdf(&config.export_dir, Instant::now());
    report(&view, written);

    Ok(())
}

fn report(view: &TableView, written: Option<PathBuf>) {
    if let Some(notice) = view.notice() {
        println!("{}", notice.text);
    }
    if let Some(path) = written {
        println!("wrote {}", path.display());
    }
}
