use std::sync::Arc;

use scenario_runner::chromium::Chromium;
use scenario_runner::pages::Pages;
use scenario_runner::{ConfigStore, SessionManager};

/// Drives a real headless Chromium against a data: URL.
/// Marked ignored because it needs a local Chrome/Chromium install.
#[tokio::test]
#[ignore]
async fn chromium_reads_and_fills_a_page() {
    let chrome = std::env::var_os("CHROME_PATH").map(Into::into);
    let config = Arc::new(ConfigStore::from_ini("[UI]\nbrowserType = chromium\n"));
    let mut session = SessionManager::new(Arc::new(Chromium::new(chrome)), config);

    let html = "data:text/html,<div><h2>To Do</h2><h3>Buy milk</h3></div>\
                <input id='username'/><button><h2>Web Application</h2></button>";
    {
        let mut pages = Pages::new(&mut session);
        pages.navigate(html, false).await.unwrap();

        let items = pages.list_items_in_section("todo").await.unwrap();
        assert_eq!(items, vec!["Buy milk"]);

        pages.fill_username("qa@example.com").await.unwrap();
        pages.navigate_to_section("Web Application").await.unwrap();
    }

    session.close().await;
    assert!(session.is_empty());
}
