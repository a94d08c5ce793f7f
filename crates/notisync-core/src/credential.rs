// ── Credential signal ──
//
// The identity provider's view of the current token, as a watch channel.
// `None` means logged out.

use tokio::sync::watch;

use notisync_api::Credential;

/// Owner side of the credential signal consumed by the engine and the
/// REST client.
#[derive(Debug)]
pub struct CredentialSource {
    tx: watch::Sender<Option<Credential>>,
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource {
    /// Start logged out.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let source = Self::new();
        source.login(token);
        source
    }

    /// Publish a token. Re-publishing the same token notifies nobody.
    pub fn login(&self, token: impl Into<String>) {
        let credential = Credential::new(token);
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&credential) {
                return false;
            }
            *current = Some(credential);
            true
        });
    }

    pub fn logout(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Credential> {
        self.tx.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.tx.borrow().is_some()
    }
}
