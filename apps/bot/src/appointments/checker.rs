use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{flows, AppointmentChecker, CheckError, CheckResult};
use crate::domain::dates::{match_preferred, AvailableDates};
use crate::domain::job::{ServiceOption, ServiceType};
use crate::infrastructure::browser::{
    Browser, BrowserPage, BrowserResult, LaunchOptions, Proxy, ProxyPool,
};

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1",
];

const LOCALES: [&str; 3] = ["es-ES", "en-US", "en-GB"];

/// Timing knobs of the checker
#[derive(Debug, Clone)]
pub struct CheckerSettings {
    /// Budget of every page load and element wait
    pub page_timeout: Duration,
    pub navigation_retries: u32,
    pub navigation_backoff: Duration,
    /// Bounds of the random pause between attempts
    pub min_attempt_delay: Duration,
    pub max_attempt_delay: Duration,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(60),
            navigation_retries: 3,
            navigation_backoff: Duration::from_secs(2),
            min_attempt_delay: Duration::from_secs(1),
            max_attempt_delay: Duration::from_secs(5),
        }
    }
}

impl CheckerSettings {
    fn attempt_delay(&self) -> Duration {
        let min = self.min_attempt_delay.as_secs_f64();
        let max = self.max_attempt_delay.as_secs_f64().max(min);
        Duration::from_secs_f64(rand::thread_rng().gen_range(min..=max))
    }
}

/// Browser session that is closed on drop unless closed explicitly
struct OpenSession {
    page: Arc<dyn BrowserPage>,
    closed: bool,
}

impl OpenSession {
    fn new(page: Box<dyn BrowserPage>) -> Self {
        Self {
            page: Arc::from(page),
            closed: false,
        }
    }

    fn page(&self) -> &dyn BrowserPage {
        self.page.as_ref()
    }

    async fn close(mut self) {
        self.closed = true;
        close_page(self.page.as_ref()).await;
    }
}

impl Drop for OpenSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let page = Arc::clone(&self.page);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!("Closing browser session of an abandoned check");
                runtime.spawn(async move { close_page(page.as_ref()).await });
            }
            Err(_) => tracing::warn!("No runtime left to close browser session"),
        }
    }
}

async fn close_page(page: &dyn BrowserPage) {
    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "Failed to close browser session");
    }
}

/// Checks availability by driving a real browser through the booking site
///
/// The first attempt goes out directly, later ones through a proxy read
/// from `proxy_file`. Proxy failures are counted per check.
pub struct BrowserAppointmentChecker {
    browser: Arc<dyn Browser>,
    proxy_file: PathBuf,
    settings: CheckerSettings,
}

impl BrowserAppointmentChecker {
    pub fn new(
        browser: Arc<dyn Browser>,
        proxy_file: impl Into<PathBuf>,
        settings: CheckerSettings,
    ) -> Self {
        Self {
            browser,
            proxy_file: proxy_file.into(),
            settings,
        }
    }

    fn launch_options(&self, proxy: Option<Proxy>) -> LaunchOptions {
        let mut rng = rand::thread_rng();
        LaunchOptions {
            proxy,
            user_agent: USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0]).to_string(),
            locale: LOCALES.choose(&mut rng).unwrap_or(&LOCALES[0]).to_string(),
            timeout: self.settings.page_timeout,
        }
    }

    /// One browser session; the session is closed even if the check is cancelled
    async fn attempt(
        &self,
        option: ServiceOption,
        proxy: Option<Proxy>,
    ) -> BrowserResult<Option<Vec<String>>> {
        let session = OpenSession::new(self.browser.open(&self.launch_options(proxy)).await?);
        let result = self.run_flow(session.page(), option).await;
        session.close().await;
        result
    }

    async fn run_flow(
        &self,
        page: &dyn BrowserPage,
        option: ServiceOption,
    ) -> BrowserResult<Option<Vec<String>>> {
        self.navigate(page, option.url()).await?;
        match option.service_type() {
            ServiceType::Certificate => {
                flows::certificate(page, option, self.settings.page_timeout).await
            }
            ServiceType::Menores => flows::menores(page, option, self.settings.page_timeout).await,
        }
    }

    async fn navigate(&self, page: &dyn BrowserPage, url: &str) -> BrowserResult<()> {
        tracing::info!(url, "Navigating");
        let retries = self.settings.navigation_retries.max(1);
        let mut tries = 0;
        loop {
            tries += 1;
            match page.goto(url).await {
                Ok(()) => return Ok(()),
                Err(e) if tries < retries => {
                    tracing::warn!(retry = tries, retries, error = %e, "Navigation retry");
                    tokio::time::sleep(self.settings.navigation_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl AppointmentChecker for BrowserAppointmentChecker {
    async fn check(
        &self,
        option: ServiceOption,
        preferred_date: Option<&str>,
        max_attempts: u32,
    ) -> CheckResult<AvailableDates> {
        tracing::info!(option = %option, "Checking appointments");
        let max_attempts = max_attempts.max(1);
        let mut proxies = ProxyPool::new(&self.proxy_file);

        for attempt in 1..=max_attempts {
            let proxy = if attempt > 1 {
                proxies.next().await
            } else {
                None
            };
            tracing::info!(
                attempt,
                max_attempts,
                proxy = ?proxy.as_ref().map(ToString::to_string),
                "Checking attempt"
            );

            match self.attempt(option, proxy.clone()).await {
                Ok(Some(dates)) => return Ok(match_preferred(dates, preferred_date)),
                Ok(None) => tracing::info!(attempt, "No results found in this attempt, will try again"),
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Error checking appointments");
                    if let Some(proxy) = &proxy {
                        proxies.mark_failed(proxy);
                    }
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.settings.attempt_delay()).await;
            }
        }

        tracing::error!(max_attempts, "Failed to check appointments after all attempts");
        Err(CheckError::Exhausted(max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::testing::{ScriptedBrowser, ScriptedPage};
    use crate::domain::job::value_objects::MENORES_URL;
    use crate::infrastructure::browser::Locator;
    use std::io::Write;

    fn quick_settings() -> CheckerSettings {
        CheckerSettings {
            page_timeout: Duration::from_secs(1),
            navigation_retries: 3,
            navigation_backoff: Duration::from_secs(2),
            min_attempt_delay: Duration::from_secs(1),
            max_attempt_delay: Duration::from_secs(5),
        }
    }

    fn certificate_page() -> ScriptedPage {
        ScriptedPage::new()
            .with(
                Locator::text("Solicitar certificación de Nacimiento"),
                "cert",
                "Solicitar certificación de Nacimiento",
            )
            .with(Locator::css("#bktContinue"), "continue", "")
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_goes_without_proxy() {
        let page = certificate_page().marked_dates(&["14/05/2025", "20/05/2025"]);
        let browser = ScriptedBrowser::new(page.clone());
        let checker = BrowserAppointmentChecker::new(
            Arc::new(browser.clone()),
            "/nonexistent/proxy.txt",
            quick_settings(),
        );

        let dates = checker
            .check(ServiceOption::BirthCertificate, Some("15/05/2025"), 5)
            .await
            .unwrap();

        assert_eq!(
            dates,
            AvailableDates::Closest {
                closest: "14/05/2025".to_string(),
                others: vec!["20/05/2025".to_string()],
            }
        );
        assert_eq!(browser.launches(), vec![None]);
        assert!(page.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_attempts_rotate_proxies_then_exhaust() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.1:8080\n10.0.0.2:8080").unwrap();

        let page = ScriptedPage::new().failing_navigation();
        let browser = ScriptedBrowser::new(page.clone());
        let checker = BrowserAppointmentChecker::new(
            Arc::new(browser.clone()),
            file.path(),
            quick_settings(),
        );

        let err = checker
            .check(ServiceOption::Menores(crate::domain::job::ChildCount::One), None, 3)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckError::Exhausted(3)));
        let launches = browser.launches();
        assert_eq!(launches.len(), 3);
        assert_eq!(launches[0], None);
        assert!(launches[1].is_some());
        assert!(launches[2].is_some());
        assert_ne!(launches[1], launches[2]);

        // Every attempt retried navigation three times
        assert_eq!(page.visited(), vec![MENORES_URL.to_string(); 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn proxy_failures_do_not_carry_over_to_next_check() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.1:8080").unwrap();

        let browser = ScriptedBrowser::new(ScriptedPage::new().failing_navigation());
        let checker = BrowserAppointmentChecker::new(
            Arc::new(browser.clone()),
            file.path(),
            quick_settings(),
        );
        let proxy = Proxy::parse("10.0.0.1:8080");

        // Direct attempt, then the only proxy fails until it is skipped
        let option = ServiceOption::Menores(crate::domain::job::ChildCount::One);
        assert!(checker.check(option, None, 5).await.is_err());
        assert_eq!(
            browser.launches(),
            vec![None, proxy.clone(), proxy.clone(), proxy.clone(), None]
        );

        assert!(checker.check(option, None, 2).await.is_err());
        assert_eq!(browser.launches()[5..], [None, proxy]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_option_tries_again() {
        // Menores landing page without any service option
        let page = ScriptedPage::new().with(
            Locator::text(ServiceOption::MENORES_GENERAL_LABEL),
            "menores",
            ServiceOption::MENORES_GENERAL_LABEL,
        );
        let browser = ScriptedBrowser::new(page);
        let checker = BrowserAppointmentChecker::new(
            Arc::new(browser.clone()),
            "/nonexistent/proxy.txt",
            quick_settings(),
        );

        let result = checker.check(ServiceOption::MenoresGeneral, None, 2).await;
        assert!(matches!(result, Err(CheckError::Exhausted(2))));
        assert_eq!(browser.launches().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_check_still_closes_session() {
        let page = certificate_page()
            .marked_dates(&["14/05/2025"])
            .slow_navigation(Duration::from_secs(45));
        let browser = ScriptedBrowser::new(page.clone());
        let checker = BrowserAppointmentChecker::new(
            Arc::new(browser.clone()),
            "/nonexistent/proxy.txt",
            quick_settings(),
        );

        let result = crate::appointments::check_within(
            &checker,
            ServiceOption::BirthCertificate,
            None,
            5,
            Duration::from_secs(30),
        )
        .await;

        assert!(matches!(result, Err(CheckError::TimedOut(_))));
        assert_eq!(browser.launches().len(), 1);
        // Let the spawned close run
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(page.is_closed());
    }

    #[test]
    fn attempt_delay_stays_in_bounds() {
        let settings = CheckerSettings::default();
        for _ in 0..50 {
            let delay = settings.attempt_delay();
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(5));
        }
    }
}
