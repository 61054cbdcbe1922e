mod support;

use std::sync::Arc;

use scenario_runner::locators::{self, login, Column};
use scenario_runner::pages::Pages;
use scenario_runner::{RunnerError, SessionManager};
use support::FakeBrowser;

fn manager(fake: &FakeBrowser) -> SessionManager {
    SessionManager::new(Arc::new(fake.clone()), FakeBrowser::config())
}

#[tokio::test]
async fn operations_acquire_a_page_lazily() {
    let fake = FakeBrowser::new();
    let mut session = manager(&fake);

    Pages::new(&mut session).navigate("http://portal.test/board", false).await.unwrap();

    assert_eq!(fake.count("page.open"), 1);
    assert_eq!(fake.count("goto:http://portal.test/board"), 1);
    assert_eq!(fake.count("ready"), 0);
}

#[tokio::test]
async fn login_page_endpoint_comes_from_config() {
    let fake = FakeBrowser::new();
    let mut session = manager(&fake);
    let mut pages = Pages::new(&mut session);

    assert_eq!(pages.login_endpoint().unwrap(), "http://portal.test/");
    pages.navigate_to_login_page().await.unwrap();

    let events = fake.events();
    let goto = events.iter().position(|e| e == "goto:http://portal.test/").unwrap();
    assert_eq!(events[goto + 1], "ready");
}

#[tokio::test]
async fn fill_requires_exactly_one_element() {
    let fake = FakeBrowser::new();
    let mut session = manager(&fake);
    let mut pages = Pages::new(&mut session);

    let err = pages.fill_username("qa@example.com").await.unwrap_err();
    assert!(matches!(err, RunnerError::ElementNotFound { found: 0, .. }));

    fake.set_texts(login::username_input(), &[""]);
    pages.fill_username("qa@example.com").await.unwrap();
    assert_eq!(fake.count("fill:css=#username=qa@example.com"), 1);

    fake.set_texts(login::sign_in_button(), &["Sign in", "Help"]);
    let err = pages.click_login_button().await.unwrap_err();
    assert!(matches!(err, RunnerError::ElementNotFound { found: 2, .. }));
}

#[tokio::test]
async fn click_failure_is_not_interactable() {
    let fake = FakeBrowser::new();
    fake.set_texts(login::sign_in_button(), &["Sign in"]);
    fake.make_unclickable(login::sign_in_button());
    let mut session = manager(&fake);

    let err = Pages::new(&mut session).click_login_button().await.unwrap_err();
    assert!(matches!(err, RunnerError::ElementNotInteractable { locator, .. } if locator == "xpath=//button"));
}

#[tokio::test]
async fn navigate_to_section_clicks_single_match() {
    let fake = FakeBrowser::new();
    fake.set_texts(locators::section_button("Web Application"), &["Web Application"]);
    let mut session = manager(&fake);

    Pages::new(&mut session).navigate_to_section("Web Application").await.unwrap();
    assert_eq!(fake.count("click:xpath=//button[.//h2"), 1);
}

#[tokio::test]
async fn navigate_to_section_rejects_missing_and_ambiguous() {
    let fake = FakeBrowser::new();
    let mut session = manager(&fake);

    let err = Pages::new(&mut session).navigate_to_section("Mobile").await.unwrap_err();
    assert!(matches!(err, RunnerError::SectionNotFound { matches: 0, .. }));

    fake.set_texts(locators::section_button("Web Application"), &["Web Application", "Web Application"]);
    let err = Pages::new(&mut session).navigate_to_section("Web Application").await.unwrap_err();
    assert!(matches!(err, RunnerError::SectionNotFound { matches: 2, .. }));
    assert_eq!(fake.count("click:"), 0);
}

#[tokio::test]
async fn list_items_in_visual_order() {
    let fake = FakeBrowser::new();
    fake.set_texts(Column::Todo.item_titles(), &["Buy  milk", " Call plumber "]);
    let mut session = manager(&fake);

    let items = Pages::new(&mut session).list_items_in_section("todo").await.unwrap();
    assert_eq!(items, vec!["Buy milk", "Call plumber"]);
}

#[tokio::test]
async fn list_items_rejects_unknown_section() {
    let fake = FakeBrowser::new();
    let mut session = manager(&fake);

    let err = Pages::new(&mut session).list_items_in_section("backlog").await.unwrap_err();
    assert!(matches!(err, RunnerError::UnknownSection(name) if name == "backlog"));
}

#[tokio::test]
async fn item_tags_are_trimmed_in_dom_order() {
    let fake = FakeBrowser::new();
    fake.set_texts(Column::Done.item_title("Ship release"), &["Ship release"]);
    fake.set_texts(Column::Done.item_tags("Ship release"), &[" backend ", "", "urgent", "   "]);
    let mut session = manager(&fake);

    let tags = Pages::new(&mut session).get_item_tags("done", "Ship release").await.unwrap();
    assert_eq!(tags, vec!["backend", "urgent"]);
}

#[tokio::test]
async fn item_tags_require_matching_card() {
    let fake = FakeBrowser::new();
    let mut session = manager(&fake);

    let err = Pages::new(&mut session).get_item_tags("done", "Ship release").await.unwrap_err();
    assert!(matches!(err, RunnerError::ItemNotFound { title, .. } if title == "Ship release"));
}
