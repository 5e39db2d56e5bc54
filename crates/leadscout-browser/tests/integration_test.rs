use leadscout_browser::{
    BrowserActions, BrowserEngine, BrowserLauncher, ChromiumLauncher, EngineOptions, PageSession,
};

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let mut engine = BrowserEngine::new().await.expect("create browser engine");
    engine.shutdown().await.expect("shutdown");
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation() {
    let mut engine = BrowserEngine::new().await.unwrap();

    let result = engine.navigate("https://example.com").await;
    assert!(result.is_ok(), "Navigation failed");

    let html = engine.content().await.unwrap();
    assert!(html.contains("Example Domain"));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_launcher_session_close() {
    let launcher = ChromiumLauncher::new(EngineOptions::default());
    let mut session = launcher.launch().await.unwrap();

    let html = session.fetch_html("https://example.com").await.unwrap();
    assert!(html.contains("Example Domain"));

    session.close().await.unwrap();
    assert!(session.fetch_html("https://example.com").await.is_err());
}
