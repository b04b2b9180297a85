use std::sync::Arc;

use anyhow::{bail, Context, Result};
use backoffice_core::notify::TokioScheduler;
use backoffice_core::{
    Config, CredentialStore, Gateway, GatewayError, Method, NotificationKind, NotificationQueue,
    NotificationRecord, OutgoingRequest, Response,
};
use tracing::debug;

/// Everything a command needs: config, the shared gateway and the queue.
pub struct App {
    config: Config,
    credentials: Arc<CredentialStore>,
    gateway: Gateway,
    notifications: NotificationQueue<TokioScheduler>,
}

impl App {
    /// Build the process-wide gateway and queue. Requires a tokio runtime.
    pub fn new() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let credentials = Arc::new(CredentialStore::from_config(&config)?);
        let gateway =
            Gateway::new(&config, credentials.clone()).context("Failed to build HTTP client")?;
        let notifications =
            NotificationQueue::new(TokioScheduler::current()?, config.notification_lifetime());

        Ok(Self {
            config,
            credentials,
            gateway,
            notifications,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn login(&self) -> Result<()> {
        let token = rpassword::prompt_password("Token: ")?;
        if token.trim().is_empty() {
            bail!("No token entered");
        }
        self.credentials.store(&token)?;
        eprintln!("Token stored ({:?} backend)", self.config.credential_backend);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.credentials.clear()?;
        eprintln!("Token removed");
        Ok(())
    }

    pub fn show_config(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        Ok(())
    }

    /// Fire all GETs at once; completions are reported in whatever order they arrive.
    pub async fn get_all(&self, targets: &[String]) -> Result<()> {
        let requests = targets.iter().map(|target| async move {
            let result = self.gateway.get(target).await;
            self.report(&Method::GET, target, result)
        });
        let failures = futures::future::join_all(requests)
            .await
            .into_iter()
            .filter(|ok| !ok)
            .count();
        self.finish(failures).await
    }

    pub async fn delete(&self, target: &str) -> Result<()> {
        let result = self.gateway.delete(target).await;
        let ok = self.report(&Method::DELETE, target, result);
        self.finish(usize::from(!ok)).await
    }

    pub async fn send(&self, method: Method, target: &str, body: serde_json::Value) -> Result<()> {
        let result = self
            .gateway
            .dispatch(OutgoingRequest::new(method.clone(), target).json(body))
            .await;
        let ok = self.report(&method, target, result);
        self.finish(usize::from(!ok)).await
    }

    /// Print the response body and enqueue a notification for the outcome.
    fn report(
        &self,
        method: &Method,
        target: &str,
        result: Result<Response, GatewayError>,
    ) -> bool {
        match result {
            Ok(response) => {
                let body = response.text();
                if !body.is_empty() {
                    println!("{}", body);
                }
                let id = self.notifications.success(format!(
                    "{} {}: {}",
                    method,
                    target,
                    response.status()
                ));
                self.print_notification(id);
                true
            }
            Err(e) => {
                debug!(error = ?e, "Request failed");
                let id = self
                    .notifications
                    .error(format!("{} {}: {}", method, target, user_message(&e)));
                self.print_notification(id);
                false
            }
        }
    }

    fn print_notification(&self, id: backoffice_core::NotificationId) {
        if let Some(record) = self.notifications.snapshot().into_iter().find(|r| r.id == id) {
            eprintln!("{}", format_notification(&record));
        }
    }

    /// Let the notifications run out their lifetime before exiting.
    async fn finish(&self, failures: usize) -> Result<()> {
        let mut updates = self.notifications.subscribe();
        updates
            .wait_for(|records| records.is_empty())
            .await
            .context("Notification queue closed unexpectedly")?;

        if failures > 0 {
            bail!("{} request(s) failed", failures);
        }
        Ok(())
    }
}

fn format_notification(record: &NotificationRecord) -> String {
    let marker = match record.kind {
        NotificationKind::Success => "✓",
        NotificationKind::Error => "✗",
        NotificationKind::Warning => "!",
        NotificationKind::Info => "i",
    };
    format!("{} [{}] {}", marker, record.kind, record.message)
}

/// Simplify common errors for the user
fn user_message(error: &GatewayError) -> String {
    match error {
        GatewayError::Timeout(_) => "The server took too long to respond".to_string(),
        GatewayError::Network(_) => {
            "Could not reach the server. Check your connection.".to_string()
        }
        GatewayError::Unauthorized { .. } => {
            "Not signed in, or the token has expired. Run `backoffice login`.".to_string()
        }
        GatewayError::AccessDenied { .. } => "You don't have permission to do that".to_string(),
        GatewayError::NotFound { .. } => "Not found".to_string(),
        GatewayError::RateLimited { .. } => {
            "Too many requests - please wait and try again".to_string()
        }
        other => other.to_string(),
    }
}
