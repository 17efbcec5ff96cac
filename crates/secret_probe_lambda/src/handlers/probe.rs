use std::time::Instant;

use secret_probe_core::config::ProbeConfig;
use secret_probe_core::contract::{DbCredentials, QueryRows, DEFAULT_DB_PORT, HEALTH_CHECK_QUERY};
use secret_probe_core::error::ProbeError;
use tracing::{error, info};

use crate::adapters::database::{ConnectTarget, DatabaseConnector, DatabaseSession};
use crate::adapters::secrets::SecretSource;

/// Fetches the database secret, connects, runs the health-check query and
/// returns its rows.
///
/// Secret failures come back as [`ProbeError::SecretRetrieval`] or
/// [`ProbeError::SecretDecode`] before any connection is attempted. Database
/// failures come back as [`ProbeError::Connect`] or [`ProbeError::Query`].
/// A session that was opened is closed exactly once before this returns.
pub fn handle_probe(
    config: &ProbeConfig,
    secrets: &impl SecretSource,
    connector: &impl DatabaseConnector,
) -> Result<QueryRows, ProbeError> {
    let started_at = Instant::now();
    info!(
        component = "probe_handler",
        event = "probe_started",
        secret_id = %config.secret_id,
        host = %config.host,
    );

    let request = config.secret_request();
    let secret = secrets.get_secret_string(&request).map_err(|message| {
        error!(
            component = "probe_handler",
            event = "secret_fetch_failed",
            error = %message,
        );
        ProbeError::SecretRetrieval(message)
    })?;
    info!(component = "probe_handler", event = "secret_fetched");

    let credentials = DbCredentials::from_secret_string(&secret).inspect_err(|error| {
        error!(
            component = "probe_handler",
            event = "secret_decode_failed",
            error = %error,
        );
    })?;
    drop(secret);

    let target = ConnectTarget {
        host: &config.host,
        port: DEFAULT_DB_PORT,
        user: credentials.username.as_deref(),
        password: credentials.password.as_deref(),
    };
    let session = connector.connect(&target).map_err(|message| {
        error!(
            component = "probe_handler",
            event = "connect_failed",
            host = %config.host,
            port = DEFAULT_DB_PORT,
            error = %message,
        );
        ProbeError::Connect(message)
    })?;

    let mut session = SessionGuard::new(session);
    let outcome = session.fetch_all(HEALTH_CHECK_QUERY);
    session.release();

    let rows = outcome.map_err(|message| {
        error!(
            component = "probe_handler",
            event = "query_failed",
            error = %message,
        );
        ProbeError::Query(message)
    })?;

    info!(
        component = "probe_handler",
        event = "probe_completed",
        rows = rows.len(),
        duration_ms = started_at.elapsed().as_millis() as u64,
    );
    Ok(rows)
}

/// Owns an open session and closes it on `release` or, failing that, on drop.
struct SessionGuard {
    session: Option<Box<dyn DatabaseSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn DatabaseSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn fetch_all(&mut self, sql: &str) -> Result<QueryRows, String> {
        match self.session.as_mut() {
            Some(session) => session.fetch_all(sql),
            None => Err("session already released".to_string()),
        }
    }

    fn release(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            info!(component = "probe_handler", event = "session_released");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.close_once();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use secret_probe_core::contract::SecretRequest;
    use secret_probe_core::error::FailureDisposition;
    use serde_json::json;

    use super::*;

    struct FakeSecrets {
        response: Result<String, String>,
        requests: Mutex<Vec<SecretRequest>>,
    }

    impl FakeSecrets {
        fn returning(secret: &str) -> Self {
            Self {
                response: Ok(secret.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<SecretRequest> {
            self.requests.lock().expect("poisoned mutex").clone()
        }
    }

    impl SecretSource for FakeSecrets {
        fn get_secret_string(&self, request: &SecretRequest) -> Result<String, String> {
            self.requests
                .lock()
                .expect("poisoned mutex")
                .push(request.clone());
            self.response.clone()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct SeenTarget {
        host: String,
        port: u16,
        user: Option<String>,
        password: Option<String>,
    }

    #[derive(Clone, Copy)]
    enum SessionBehavior {
        Succeed,
        FailQuery,
    }

    struct FakeConnector {
        connect_error: Option<String>,
        behavior: SessionBehavior,
        targets: Mutex<Vec<SeenTarget>>,
        closes: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn new(behavior: SessionBehavior) -> Self {
            Self {
                connect_error: None,
                behavior,
                targets: Mutex::new(Vec::new()),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn refusing(message: &str) -> Self {
            Self {
                connect_error: Some(message.to_string()),
                ..Self::new(SessionBehavior::Succeed)
            }
        }

        fn targets(&self) -> Vec<SeenTarget> {
            self.targets.lock().expect("poisoned mutex").clone()
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl DatabaseConnector for FakeConnector {
        fn connect(
            &self,
            target: &ConnectTarget<'_>,
        ) -> Result<Box<dyn DatabaseSession>, String> {
            self.targets
                .lock()
                .expect("poisoned mutex")
                .push(SeenTarget {
                    host: target.host.to_string(),
                    port: target.port,
                    user: target.user.map(str::to_string),
                    password: target.password.map(str::to_string),
                });

            if let Some(message) = &self.connect_error {
                return Err(message.clone());
            }

            Ok(Box::new(FakeSession {
                behavior: self.behavior,
                closes: Arc::clone(&self.closes),
            }))
        }
    }

    struct FakeSession {
        behavior: SessionBehavior,
        closes: Arc<AtomicUsize>,
    }

    impl DatabaseSession for FakeSession {
        fn fetch_all(&mut self, sql: &str) -> Result<QueryRows, String> {
            assert_eq!(sql, "select 1");
            match self.behavior {
                SessionBehavior::Succeed => Ok(vec![vec![json!(1)]]),
                SessionBehavior::FailQuery => Err("server closed the connection".to_string()),
            }
        }

        fn close(self: Box<Self>) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_config() -> ProbeConfig {
        ProbeConfig {
            secret_id: "prod/db".to_string(),
            host: "db.internal".to_string(),
            version_id: None,
            version_stage: None,
            secrets_endpoint_url: None,
        }
    }

    const SECRET: &str = r#"{"username":"probe","password":"hunter2"}"#;

    #[test]
    fn returns_single_row_for_health_check() {
        let secrets = FakeSecrets::returning(SECRET);
        let connector = FakeConnector::new(SessionBehavior::Succeed);

        let rows = handle_probe(&sample_config(), &secrets, &connector).expect("probe should pass");

        assert_eq!(rows, vec![vec![json!(1)]]);
        assert_eq!(connector.close_count(), 1);
    }

    #[test]
    fn connects_to_configured_host_on_fixed_port_with_secret_credentials() {
        let secrets = FakeSecrets::returning(SECRET);
        let connector = FakeConnector::new(SessionBehavior::Succeed);

        handle_probe(&sample_config(), &secrets, &connector).expect("probe should pass");

        assert_eq!(
            connector.targets(),
            vec![SeenTarget {
                host: "db.internal".to_string(),
                port: 5432,
                user: Some("probe".to_string()),
                password: Some("hunter2".to_string()),
            }]
        );
    }

    #[test]
    fn secret_request_omits_unset_selectors() {
        let secrets = FakeSecrets::returning(SECRET);
        let connector = FakeConnector::new(SessionBehavior::Succeed);
        let config = ProbeConfig {
            version_stage: Some("AWSCURRENT".to_string()),
            ..sample_config()
        };

        handle_probe(&config, &secrets, &connector).expect("probe should pass");

        let requests = secrets.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].secret_id, "prod/db");
        assert!(requests[0].version_id.is_none());
        assert_eq!(requests[0].version_stage.as_deref(), Some("AWSCURRENT"));
    }

    #[test]
    fn secret_failure_propagates_without_connecting() {
        let secrets = FakeSecrets::failing("AccessDeniedException");
        let connector = FakeConnector::new(SessionBehavior::Succeed);

        let error =
            handle_probe(&sample_config(), &secrets, &connector).expect_err("probe should fail");

        assert_eq!(
            error,
            ProbeError::SecretRetrieval("AccessDeniedException".to_string())
        );
        assert_eq!(error.disposition(), FailureDisposition::Propagate);
        assert!(connector.targets().is_empty());
        assert_eq!(connector.close_count(), 0);
    }

    #[test]
    fn malformed_secret_propagates_without_connecting() {
        let secrets = FakeSecrets::returning("not-json");
        let connector = FakeConnector::new(SessionBehavior::Succeed);

        let error =
            handle_probe(&sample_config(), &secrets, &connector).expect_err("probe should fail");

        assert!(matches!(error, ProbeError::SecretDecode(_)));
        assert_eq!(error.disposition(), FailureDisposition::Propagate);
        assert!(connector.targets().is_empty());
    }

    #[test]
    fn secret_without_credentials_connects_with_absent_login() {
        let secrets = FakeSecrets::returning(r#"{"engine":"postgres"}"#);
        let connector = FakeConnector::new(SessionBehavior::Succeed);

        handle_probe(&sample_config(), &secrets, &connector).expect("probe should pass");

        let targets = connector.targets();
        assert_eq!(targets.len(), 1);
        assert!(targets[0].user.is_none());
        assert!(targets[0].password.is_none());
    }

    #[test]
    fn connect_failure_terminates_with_nothing_to_close() {
        let secrets = FakeSecrets::returning(SECRET);
        let connector = FakeConnector::refusing("connection refused");

        let error =
            handle_probe(&sample_config(), &secrets, &connector).expect_err("probe should fail");

        assert_eq!(error, ProbeError::Connect("connection refused".to_string()));
        assert_eq!(error.disposition(), FailureDisposition::Terminate);
        assert_eq!(connector.close_count(), 0);
    }

    #[test]
    fn query_failure_terminates_after_closing_session_once() {
        let secrets = FakeSecrets::returning(SECRET);
        let connector = FakeConnector::new(SessionBehavior::FailQuery);

        let error =
            handle_probe(&sample_config(), &secrets, &connector).expect_err("probe should fail");

        assert!(matches!(error, ProbeError::Query(_)));
        assert_eq!(error.disposition(), FailureDisposition::Terminate);
        assert_eq!(connector.close_count(), 1);
    }

    #[test]
    fn guard_closes_session_on_drop_when_not_released() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = SessionGuard::new(Box::new(FakeSession {
                behavior: SessionBehavior::Succeed,
                closes: Arc::clone(&closes),
            }));
            guard.fetch_all("select 1").expect("query should pass");
        }

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
