//! Authentication providers
//!
//! Providers attach credentials to outgoing requests and decide what happens
//! when the server rejects them.

use super::refresher::TokenRefresher;
use super::types::{AuthStamp, Credential};
use crate::error::{Error, Result};
use crate::transport::WireRequest;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Capability to authenticate requests
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Attach credentials to a request that requires them
    ///
    /// Requests with `requires_auth == false` are left untouched and get
    /// `AuthStamp::Anonymous`.
    async fn decorate(&self, request: &mut WireRequest) -> Result<AuthStamp>;

    /// React to a 401 for a request decorated with `stamp`
    ///
    /// `Ok(())` means the request may be sent once more with the current
    /// credential. Errors are terminal.
    async fn handle_rejection(&self, stamp: &AuthStamp) -> Result<()>;
}

/// Set `Authorization: Bearer <token>` on a request
fn attach_bearer(request: &mut WireRequest, token: &str) -> Result<()> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| Error::authentication("Access token is not a valid header value"))?;
    value.set_sensitive(true);
    request.headers.insert(AUTHORIZATION, value);
    Ok(())
}

// ============================================================================
// No Auth
// ============================================================================

/// Provider that never attaches credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn decorate(&self, _request: &mut WireRequest) -> Result<AuthStamp> {
        Ok(AuthStamp::Anonymous)
    }

    async fn handle_rejection(&self, _stamp: &AuthStamp) -> Result<()> {
        Err(Error::authentication("Request rejected and no credentials are configured"))
    }
}

// ============================================================================
// Static Bearer
// ============================================================================

/// Fixed bearer token; rejections are final
#[derive(Clone)]
pub struct StaticBearer {
    token: String,
}

impl StaticBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticBearer").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthProvider for StaticBearer {
    async fn decorate(&self, request: &mut WireRequest) -> Result<AuthStamp> {
        if !request.requires_auth {
            return Ok(AuthStamp::Anonymous);
        }
        attach_bearer(request, &self.token)?;
        Ok(AuthStamp::Credential {
            generation: 0,
            epoch: 0,
        })
    }

    async fn handle_rejection(&self, _stamp: &AuthStamp) -> Result<()> {
        Err(Error::authentication("Bearer token was rejected"))
    }
}

// ============================================================================
// Refreshable Bearer
// ============================================================================

/// Completion of one refresh: new generation, or the failure message
type SharedRefresh = Shared<BoxFuture<'static, std::result::Result<u64, String>>>;

/// A refresh that failed, and the requests it answers for
struct RefreshFailure {
    generation: u64,
    /// Epoch once the failure was recorded; stamps older than this raced it
    epoch: u64,
    message: String,
}

/// State behind the single-flight refresh slot
#[derive(Default)]
struct RefreshSlot {
    credential: Option<Credential>,
    /// Bumped on every successful refresh
    generation: u64,
    /// Bumped on every completed refresh, successful or not
    epoch: u64,
    in_flight: Option<SharedRefresh>,
    failed: Option<RefreshFailure>,
}

/// Bearer token that is refreshed on rejection or expiry, one refresh at a time
#[derive(Clone)]
pub struct RefreshableBearer {
    state: Arc<Mutex<RefreshSlot>>,
    refresher: Arc<dyn TokenRefresher>,
}

impl RefreshableBearer {
    /// Create a provider with no credential yet; the first request fetches one
    pub fn new(refresher: impl TokenRefresher + 'static) -> Self {
        Self::from_slot(RefreshSlot::default(), Arc::new(refresher))
    }

    /// Create a provider starting from an existing credential
    pub fn with_credential(credential: Credential, refresher: impl TokenRefresher + 'static) -> Self {
        let slot = RefreshSlot {
            credential: Some(credential),
            ..RefreshSlot::default()
        };
        Self::from_slot(slot, Arc::new(refresher))
    }

    fn from_slot(slot: RefreshSlot, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state: Arc::new(Mutex::new(slot)),
            refresher,
        }
    }

    /// Current credential
    pub async fn credential(&self) -> Option<Credential> {
        self.state.lock().await.credential.clone()
    }

    /// Number of successful refreshes so far
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Install a credential obtained elsewhere, clearing any refresh failure
    pub async fn set_credential(&self, credential: Credential) {
        let mut slot = self.state.lock().await;
        slot.credential = Some(credential);
        slot.generation += 1;
        slot.epoch += 1;
        slot.failed = None;
    }

    /// Join the refresh for `generation`, starting it if nobody has
    ///
    /// Returns `None` when the credential has already moved past
    /// `generation`, so the caller can retry right away. A caller whose
    /// `epoch` predates a failed refresh of the same generation shares that
    /// failure; anyone else gets a fresh attempt.
    fn join_refresh(
        &self,
        slot: &mut RefreshSlot,
        generation: u64,
        epoch: u64,
    ) -> Result<Option<SharedRefresh>> {
        if slot.generation > generation {
            return Ok(None);
        }
        if let Some(failure) = &slot.failed {
            if failure.generation == generation && epoch < failure.epoch {
                return Err(Error::authentication(failure.message.clone()));
            }
        }
        if let Some(in_flight) = &slot.in_flight {
            debug!("Joining in-flight token refresh (generation {generation})");
            return Ok(Some(in_flight.clone()));
        }

        debug!("Starting token refresh (generation {generation})");
        let refresh = self.start_refresh(slot.credential.clone());
        slot.in_flight = Some(refresh.clone());
        Ok(Some(refresh))
    }

    /// Spawn the refresh so it finishes even if every waiter goes away
    fn start_refresh(&self, current: Option<Credential>) -> SharedRefresh {
        let state = Arc::clone(&self.state);
        let refresher = Arc::clone(&self.refresher);

        let task = tokio::spawn(async move {
            let outcome = refresher.refresh(current.as_ref()).await;

            let mut slot = state.lock().await;
            slot.in_flight = None;
            slot.epoch += 1;
            match outcome {
                Ok(credential) => {
                    slot.credential = Some(credential);
                    slot.generation += 1;
                    slot.failed = None;
                    debug!("Token refresh succeeded (generation {})", slot.generation);
                    Ok(slot.generation)
                }
                Err(e) => {
                    let message = match e {
                        Error::Authentication { message } => message,
                        other => other.to_string(),
                    };
                    warn!("Token refresh failed: {message}");
                    slot.failed = Some(RefreshFailure {
                        generation: slot.generation,
                        epoch: slot.epoch,
                        message: message.clone(),
                    });
                    Err(message)
                }
            }
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(format!("Token refresh task failed: {e}")))
        }
        .boxed()
        .shared()
    }

    /// Valid access token and the stamp describing it, refreshing first if needed
    async fn current_token(&self) -> Result<(String, AuthStamp)> {
        let waiter = {
            let mut slot = self.state.lock().await;
            if let Some(credential) = slot.credential.as_ref().filter(|c| !c.is_expired()) {
                return Ok((credential.access_token.clone(), slot.stamp()));
            }
            let (generation, epoch) = (slot.generation, slot.epoch);
            self.join_refresh(&mut slot, generation, epoch)?
        };

        if let Some(waiter) = waiter {
            waiter.await.map_err(Error::authentication)?;
        }

        let slot = self.state.lock().await;
        slot.credential
            .as_ref()
            .map(|c| (c.access_token.clone(), slot.stamp()))
            .ok_or_else(|| Error::authentication("No credential available"))
    }
}

impl RefreshSlot {
    fn stamp(&self) -> AuthStamp {
        AuthStamp::Credential {
            generation: self.generation,
            epoch: self.epoch,
        }
    }
}

impl std::fmt::Debug for RefreshableBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshableBearer").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthProvider for RefreshableBearer {
    async fn decorate(&self, request: &mut WireRequest) -> Result<AuthStamp> {
        if !request.requires_auth {
            return Ok(AuthStamp::Anonymous);
        }
        let (token, stamp) = self.current_token().await?;
        attach_bearer(request, &token)?;
        Ok(stamp)
    }

    async fn handle_rejection(&self, stamp: &AuthStamp) -> Result<()> {
        let AuthStamp::Credential { generation, epoch } = *stamp else {
            return Err(Error::authentication("Request was sent without credentials"));
        };

        let waiter = {
            let mut slot = self.state.lock().await;
            self.join_refresh(&mut slot, generation, epoch)?
        };

        if let Some(waiter) = waiter {
            waiter.await.map_err(Error::authentication)?;
        }
        Ok(())
    }
}
