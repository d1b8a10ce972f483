//! The tenant manager: which tenants the user belongs to, which one is
//! selected, and requests scoped to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostdash_protocol::{
    Codec, CreateTenantRequest, ExternalOrganization, JsonCodec,
    OrganizationList, ProtocolError, Tenant, TenantConfig, TenantEnvelope,
    TenantId, TenantList, endpoints,
};
use hostdash_session::{SessionError, SessionManager, keys};
use hostdash_transport::{ApiRequest, HttpTransport, TENANT_HEADER};
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::{TenantError, TenantOptions, TenantState};

/// Manages tenant membership and the current-tenant pointer.
///
/// Every backend call goes through the session's
/// [`api_request`](SessionManager::api_request), so tenant operations get
/// bearer attachment and the refresh-and-retry behavior for free.
///
/// The current tenant is persisted under [`keys::CURRENT_TENANT`]; the
/// tenant list and the available organizations live in memory only.
pub struct TenantManager<T: HttpTransport> {
    session: Arc<SessionManager<T>>,
    options: TenantOptions,
    codec: JsonCodec,
    state: Mutex<TenantState>,
}

impl<T: HttpTransport> TenantManager<T> {
    pub fn new(session: Arc<SessionManager<T>>, options: TenantOptions) -> Self {
        Self {
            session,
            options,
            codec: JsonCodec,
            state: Mutex::new(TenantState::default()),
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn session(&self) -> &Arc<SessionManager<T>> {
        &self.session
    }

    pub fn options(&self) -> &TenantOptions {
        &self.options
    }

    pub fn snapshot(&self) -> TenantState {
        self.lock().clone()
    }

    pub fn current_tenant(&self) -> Option<Tenant> {
        self.lock().current.clone()
    }

    pub fn current_tenant_id(&self) -> Option<TenantId> {
        self.lock().current_id().cloned()
    }

    pub fn tenants(&self) -> Vec<Tenant> {
        self.lock().tenants.clone()
    }

    pub fn available_organizations(&self) -> Vec<ExternalOrganization> {
        self.lock().available_organizations.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    // -- Membership -------------------------------------------------------

    /// Fetches the user's tenants, replacing the list.
    ///
    /// # Errors
    /// Any request error. The previous list is kept.
    pub async fn fetch_user_tenants(&self) -> Result<Vec<Tenant>, TenantError> {
        self.update(TenantState::begin);

        let TenantList { tenants } = self
            .request(ApiRequest::get(endpoints::TENANTS), "Failed to fetch tenants")
            .await?;
        tracing::debug!(count = tenants.len(), "tenants fetched");
        self.update(|s| {
            s.tenants = tenants.clone();
            s.is_loading = false;
        });
        Ok(tenants)
    }

    /// Fetches the external organizations the user could bind.
    ///
    /// When the backend reports the user's provider credential as missing,
    /// a hard navigation to the re-authentication route is scheduled after
    /// [`TenantOptions::reauth_delay`]. There is no retry.
    ///
    /// # Errors
    /// [`TenantError::ExternalCredentialMissing`] in the case above,
    /// otherwise any request error.
    pub async fn fetch_available_organizations(
        &self,
    ) -> Result<Vec<ExternalOrganization>, TenantError> {
        self.update(TenantState::begin);

        let request = ApiRequest::get(endpoints::AVAILABLE_ORGANIZATIONS);
        match self.session.api_request::<OrganizationList>(request).await {
            Ok(OrganizationList { guilds }) => {
                self.update(|s| {
                    s.available_organizations = guilds.clone();
                    s.is_loading = false;
                });
                Ok(guilds)
            }
            Err(err) if err.code() == Some(endpoints::EXTERNAL_CREDENTIAL_MISSING) => {
                tracing::warn!("provider credential missing, scheduling re-authentication");
                let err = TenantError::ExternalCredentialMissing(err);
                self.record_error(&err, "");
                self.schedule_reauthentication();
                Err(err)
            }
            Err(err) => {
                let err = TenantError::from(err);
                tracing::error!(error = %err, "failed to fetch available organizations");
                self.record_error(&err, "Failed to fetch available guilds");
                Err(err)
            }
        }
    }

    /// Binds an external organization as a new tenant and selects it.
    ///
    /// # Errors
    /// Any request error. Nothing is selected.
    pub async fn create_tenant(&self, organization_id: &str) -> Result<Tenant, TenantError> {
        self.update(TenantState::begin);

        let body = serde_json::to_value(CreateTenantRequest {
            guild_id: organization_id.to_string(),
        })
        .map_err(|e| SessionError::from(ProtocolError::Encode(e)))?;
        let request = ApiRequest::post(endpoints::TENANTS).json(body);

        let TenantEnvelope { tenant } =
            self.request(request, "Failed to create tenant").await?;

        tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "tenant created");
        self.update(|s| {
            s.tenants.push(tenant.clone());
            s.is_loading = false;
        });
        self.store_current(Some(&tenant));
        Ok(tenant)
    }

    /// Fetches a single tenant. State is not changed beyond the loading
    /// and error flags.
    ///
    /// # Errors
    /// Any request error.
    pub async fn fetch_tenant(&self, id: &TenantId) -> Result<Tenant, TenantError> {
        self.update(TenantState::begin);

        let TenantEnvelope { tenant } = self
            .request(ApiRequest::get(endpoints::tenant(id)), "Failed to fetch tenant")
            .await?;

        self.update(|s| s.is_loading = false);
        Ok(tenant)
    }

    /// Fetches a tenant and makes it current without navigating. Used when
    /// the route names a different tenant than the one selected.
    ///
    /// # Errors
    /// Any request error. The current tenant is left as it was.
    pub async fn adopt_tenant(&self, id: &TenantId) -> Result<Tenant, TenantError> {
        let tenant = self.fetch_tenant(id).await?;
        tracing::info!(tenant_id = %tenant.id, "adopting tenant from route");
        self.store_current(Some(&tenant));
        Ok(tenant)
    }

    /// Replaces a tenant's configuration.
    ///
    /// The list entry and, if it is the current tenant, the persisted
    /// current pointer are patched with `config`.
    ///
    /// # Errors
    /// Any request error. Local state is not touched.
    pub async fn update_tenant_config(
        &self,
        id: &TenantId,
        config: TenantConfig,
    ) -> Result<(), TenantError> {
        self.update(TenantState::begin);

        let body = serde_json::to_value(&config)
            .map_err(|e| SessionError::from(ProtocolError::Encode(e)))?;
        let request = ApiRequest::put(endpoints::tenant_config(id)).json(body);
        self.request::<IgnoredAny>(request, "Failed to update tenant config")
            .await?;

        let current = self.update(|s| {
            s.is_loading = false;
            if let Some(entry) = s.tenants.iter_mut().find(|t| &t.id == id) {
                entry.config = config.clone();
            }
            match s.current.as_mut() {
                Some(current) if &current.id == id => {
                    current.config = config;
                    Some(current.clone())
                }
                _ => None,
            }
        });
        if let Some(current) = current {
            self.persist_current(&current);
        }

        tracing::info!(tenant_id = %id, "tenant config updated");
        Ok(())
    }

    /// Asks the backend to resynchronize a tenant with its external
    /// organization.
    ///
    /// # Errors
    /// Any request error.
    pub async fn sync_tenant(&self, id: &TenantId) -> Result<(), TenantError> {
        self.update(TenantState::begin);

        self.request::<IgnoredAny>(
            ApiRequest::post(endpoints::tenant_sync(id)),
            "Failed to sync tenant data",
        )
        .await?;

        self.update(|s| s.is_loading = false);
        tracing::info!(tenant_id = %id, "tenant sync requested");
        Ok(())
    }

    /// Deletes a tenant, dropping it from the list and clearing the
    /// current pointer if it was selected.
    ///
    /// # Errors
    /// Any request error. Local state is not touched.
    pub async fn delete_tenant(&self, id: &TenantId) -> Result<(), TenantError> {
        self.update(TenantState::begin);

        self.request::<IgnoredAny>(
            ApiRequest::delete(endpoints::tenant(id)),
            "Failed to delete tenant",
        )
        .await?;

        let was_current = self.update(|s| {
            s.is_loading = false;
            s.tenants.retain(|t| &t.id != id);
            s.is_current(id)
        });
        if was_current {
            self.store_current(None);
        }

        tracing::info!(tenant_id = %id, was_current, "tenant deleted");
        Ok(())
    }

    // -- Selection --------------------------------------------------------

    /// Selects a tenant and navigates to its dashboard.
    ///
    /// The selection is stored before navigating, so the guards of the
    /// destination route observe the new tenant.
    pub async fn switch_tenant(&self, tenant: &Tenant) {
        self.store_current(Some(tenant));

        tokio::task::yield_now().await;

        tracing::info!(tenant_id = %tenant.id, "switched tenant");
        self.session
            .navigator()
            .push(&self.options.dashboard_route(&tenant.id));
    }

    /// Deselects the current tenant and forgets its snapshot.
    pub fn clear_current_tenant(&self) {
        self.store_current(None);
    }

    /// Resets in-memory state. The persisted snapshot is left alone.
    pub fn reset(&self) {
        *self.lock() = TenantState::default();
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Restores the current tenant from the persisted snapshot.
    ///
    /// Idempotent. A snapshot that doesn't parse is discarded.
    pub fn initialize_tenant(&self) {
        let Some(data) = self.session.store().get(keys::CURRENT_TENANT) else {
            return;
        };
        if data.is_empty() {
            return;
        }

        match self.codec.decode::<Tenant>(&data) {
            Ok(tenant) => {
                tracing::debug!(tenant_id = %tenant.id, "current tenant restored");
                self.update(|s| s.current = Some(tenant));
            }
            Err(err) => {
                tracing::warn!(error = %err, "stored tenant snapshot is corrupt, discarding");
                self.store_current(None);
            }
        }
    }

    // -- Scoped requests --------------------------------------------------

    /// The headers that scope a request to the current tenant. Empty when
    /// no tenant is selected.
    pub fn tenant_headers(&self) -> Vec<(String, String)> {
        self.lock()
            .current_id()
            .map(|id| vec![(TENANT_HEADER.to_string(), id.to_string())])
            .unwrap_or_default()
    }

    /// Performs an authenticated request scoped to the current tenant.
    ///
    /// Tenant headers replace any caller header of the same name. The
    /// request is otherwise passed through untouched.
    ///
    /// # Errors
    /// Any error from [`SessionManager::api_request`].
    pub async fn tenant_api_request<R: DeserializeOwned>(
        &self,
        mut request: ApiRequest,
    ) -> Result<R, TenantError> {
        for (name, value) in self.tenant_headers() {
            request.set_header(&name, &value);
        }
        Ok(self.session.api_request(request).await?)
    }

    // -- Internals --------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, TenantState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut TenantState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Runs an authenticated request, recording a failure under
    /// `fallback`.
    async fn request<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        fallback: &str,
    ) -> Result<R, TenantError> {
        match self.session.api_request(request).await {
            Ok(body) => Ok(body),
            Err(err) => {
                let err = TenantError::from(err);
                tracing::error!(error = %err, operation = fallback, "tenant request failed");
                self.record_error(&err, fallback);
                Err(err)
            }
        }
    }

    /// Sets (or clears) the current tenant in memory and in the store.
    fn store_current(&self, tenant: Option<&Tenant>) {
        self.update(|s| s.current = tenant.cloned());
        match tenant {
            Some(tenant) => self.persist_current(tenant),
            None => {
                if let Err(e) = self.session.store().remove(keys::CURRENT_TENANT) {
                    tracing::warn!(error = %e, "removing tenant snapshot failed");
                }
            }
        }
    }

    fn persist_current(&self, tenant: &Tenant) {
        let text = match self.codec.encode(tenant) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant.id, error = %e, "tenant snapshot could not be encoded");
                return;
            }
        };
        if let Err(e) = self.session.store().set(keys::CURRENT_TENANT, &text) {
            tracing::warn!(tenant_id = %tenant.id, error = %e, "persisting tenant snapshot failed");
        }
    }

    fn schedule_reauthentication(&self) {
        let navigator = Arc::clone(self.session.navigator());
        let route = self.options.reauth_route.clone();
        let delay = self.options.reauth_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.assign(&route);
        });
    }

    fn record_error(&self, err: &TenantError, fallback: &str) {
        let message = err.display_message(fallback);
        self.update(|s| {
            s.error = Some(message);
            s.is_loading = false;
        });
    }
}
