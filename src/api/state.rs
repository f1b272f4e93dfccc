use std::sync::Arc;

use crate::audit::AccessRecorder;
use crate::gateway::AccessKeyGateway;
use crate::oauth::OAuthClient;
use crate::session::SessionManager;

/// Where the browser is sent after the OAuth callback, and how cookies are set.
#[derive(Clone, Debug)]
pub struct GatewaySettings {
    pub app_url: String,
    pub login_url: String,
    pub cookie_secure: bool,
}

impl GatewaySettings {
    /// Cookies are only marked `Secure` when the application is served over HTTPS.
    #[must_use]
    pub fn new(app_url: &str, login_url: &str) -> Self {
        Self {
            app_url: app_url.to_string(),
            login_url: login_url.to_string(),
            cookie_secure: app_url.starts_with("https://"),
        }
    }
}

/// Process-wide state, built once at startup and shared by every handler.
#[derive(Debug)]
pub struct GatewayState {
    sessions: Arc<SessionManager>,
    recorder: AccessRecorder,
    access_key: Option<AccessKeyGateway>,
    oauth: Option<OAuthClient>,
    settings: GatewaySettings,
}

impl GatewayState {
    #[must_use]
    pub fn new(
        sessions: Arc<SessionManager>,
        recorder: AccessRecorder,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            sessions,
            recorder,
            access_key: None,
            oauth: None,
            settings,
        }
    }

    #[must_use]
    pub fn with_access_key(mut self, gateway: AccessKeyGateway) -> Self {
        self.access_key = Some(gateway);
        self
    }

    #[must_use]
    pub fn with_oauth(mut self, client: OAuthClient) -> Self {
        self.oauth = Some(client);
        self
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn recorder(&self) -> &AccessRecorder {
        &self.recorder
    }

    #[must_use]
    pub fn access_key(&self) -> Option<&AccessKeyGateway> {
        self.access_key.as_ref()
    }

    #[must_use]
    pub fn oauth(&self) -> Option<&OAuthClient> {
        self.oauth.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }
}
