//! Authentication state and the silent refresh timer

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ClientResult,
    models::{LoginRequest, LoginResponse, RefreshResponse, ResetPasswordRequest, SignupRequest, UserSummary},
};

/// Delay between silent refreshes
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(5 * 60);

/// The account calls an [`AuthContext`] drives
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn signup(&self, request: &SignupRequest) -> ClientResult<String>;
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse>;
    async fn refresh(&self) -> ClientResult<RefreshResponse>;
    async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<String>;
    async fn logout(&self) -> ClientResult<String>;
}

/// Who is logged in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginStatus {
    pub logged_in: bool,
    pub user_id: Option<Uuid>,
    pub user_name: String,
    pub access_token: Option<String>,
}

/// Client side authentication state
///
/// Clones share state. While logged in, a timer re-runs the refresh every
/// [`DEFAULT_REFRESH_DELAY`]; a failed refresh logs the user out locally.
#[derive(Clone)]
pub struct AuthContext {
    api: Arc<dyn AuthApi>,
    status: Arc<RwLock<LoginStatus>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    refresh_delay: Duration,
}

impl AuthContext {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self::with_refresh_delay(api, DEFAULT_REFRESH_DELAY)
    }

    pub fn with_refresh_delay(api: Arc<dyn AuthApi>, refresh_delay: Duration) -> Self {
        Self {
            api,
            status: Arc::new(RwLock::new(LoginStatus::default())),
            timer: Arc::new(Mutex::new(None)),
            refresh_delay,
        }
    }

    pub async fn status(&self) -> LoginStatus {
        self.status.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.status.read().await.logged_in
    }

    pub async fn signup(&self, request: &SignupRequest) -> ClientResult<String> {
        self.api.signup(request).await
    }

    pub async fn login(&self, request: &LoginRequest) -> ClientResult<String> {
        let response = self.api.login(request).await?;
        self.sign_in(response.user, response.token).await;
        self.start_refresh_timer().await;
        Ok(response.message)
    }

    /// Refresh the access token and re-arm the timer
    ///
    /// On failure the local session is dropped and the error returned.
    pub async fn refresh(&self) -> ClientResult<()> {
        if let Err(e) = self.renew().await {
            self.clear_refresh_timer().await;
            return Err(e);
        }
        self.start_refresh_timer().await;
        Ok(())
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<String> {
        self.api.reset_password(request).await
    }

    pub async fn logout(&self) -> ClientResult<String> {
        let message = self.api.logout().await?;
        self.clear_refresh_timer().await;
        self.sign_out().await;
        info!("Logged out");
        Ok(message)
    }

    /// Arm the silent refresh; does nothing while a timer is running
    pub async fn start_refresh_timer(&self) {
        let mut timer = self.timer.lock().await;
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let context = self.clone();
        let delay = self.refresh_delay;
        *timer = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                if context.renew().await.is_err() {
                    break;
                }
            }
        }));
    }

    pub async fn clear_refresh_timer(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }
    }

    pub async fn is_refresh_timer_active(&self) -> bool {
        self.timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn renew(&self) -> ClientResult<()> {
        match self.api.refresh().await {
            Ok(response) => {
                self.sign_in(response.user, response.token).await;
                Ok(())
            }
            Err(e) => {
                if self.is_logged_in().await {
                    warn!("You have been logged out due to expired token: {}", e);
                }
                self.sign_out().await;
                Err(e)
            }
        }
    }

    async fn sign_in(&self, user: UserSummary, token: String) {
        *self.status.write().await = LoginStatus {
            logged_in: true,
            user_id: Some(user.id),
            user_name: user.name,
            access_token: Some(token),
        };
    }

    async fn sign_out(&self) {
        *self.status.write().await = LoginStatus::default();
    }
}
