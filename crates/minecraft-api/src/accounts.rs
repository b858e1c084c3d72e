//! Claimant implementations, one per account kind
//!
//! GiftCode and GamePass accounts have no Minecraft profile yet, so they
//! claim a name by creating their profile with it. Microsoft accounts already
//! own a profile and claim by renaming it. All three send the bearer token
//! they were constructed with; none of them refresh or validate it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use claimant::{AccountKind, Claimant, Proxy, RawClaimResult};
use common::Secret;
use serde::Serialize;
use tracing::trace;

use crate::constants::{API_BASE_URL, CHANGE_NAME_PATH, CREATE_PROFILE_PATH};
use crate::egress::Egress;

/// Where claim requests go and which clients carry them. Cheap to clone.
#[derive(Clone)]
pub struct Api {
    base_url: String,
    egress: Arc<Egress>,
}

impl Api {
    pub fn new(base_url: impl Into<String>, egress: Arc<Egress>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            egress,
        }
    }

    /// Production endpoint.
    pub fn production(egress: Arc<Egress>) -> Self {
        Self::new(API_BASE_URL, egress)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Rename endpoint for `username`, percent-encoded as one path segment.
    fn rename_url(&self, username: &str) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&self.url(CHANGE_NAME_PATH))
            .map_err(|e| format!("invalid rename url: {e}"))?;
        url.path_segments_mut()
            .map_err(|()| "rename url cannot carry a path".to_string())?
            .push(username);
        Ok(url)
    }
}

#[derive(Serialize)]
struct CreateProfileBody<'a> {
    #[serde(rename = "profileName")]
    profile_name: &'a str,
}

/// Account redeemed from a gift code; claims by creating its profile.
pub struct GiftCodeAccount {
    id: String,
    token: Secret<String>,
    api: Api,
}

impl GiftCodeAccount {
    pub fn new(id: impl Into<String>, token: Secret<String>, api: Api) -> Self {
        Self {
            id: id.into(),
            token,
            api,
        }
    }
}

impl Claimant for GiftCodeAccount {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AccountKind {
        AccountKind::GiftCode
    }

    fn claim<'a>(
        &'a self,
        username: &'a str,
        proxy: Option<&'a Proxy>,
    ) -> Pin<Box<dyn Future<Output = RawClaimResult> + Send + 'a>> {
        Box::pin(create_profile(&self.api, &self.token, username, proxy))
    }
}

/// Game Pass account; claims by creating its profile.
pub struct GamePassAccount {
    id: String,
    token: Secret<String>,
    api: Api,
}

impl GamePassAccount {
    pub fn new(id: impl Into<String>, token: Secret<String>, api: Api) -> Self {
        Self {
            id: id.into(),
            token,
            api,
        }
    }
}

impl Claimant for GamePassAccount {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AccountKind {
        AccountKind::GamePass
    }

    fn claim<'a>(
        &'a self,
        username: &'a str,
        proxy: Option<&'a Proxy>,
    ) -> Pin<Box<dyn Future<Output = RawClaimResult> + Send + 'a>> {
        Box::pin(create_profile(&self.api, &self.token, username, proxy))
    }
}

/// Microsoft account with an existing profile; claims by renaming it.
pub struct MicrosoftAccount {
    id: String,
    token: Secret<String>,
    api: Api,
}

impl MicrosoftAccount {
    pub fn new(id: impl Into<String>, token: Secret<String>, api: Api) -> Self {
        Self {
            id: id.into(),
            token,
            api,
        }
    }
}

impl Claimant for MicrosoftAccount {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AccountKind {
        AccountKind::Microsoft
    }

    fn claim<'a>(
        &'a self,
        username: &'a str,
        proxy: Option<&'a Proxy>,
    ) -> Pin<Box<dyn Future<Output = RawClaimResult> + Send + 'a>> {
        Box::pin(async move {
            let Some(client) = self.api.egress.client_for(proxy) else {
                return unknown_proxy(proxy);
            };
            let url = match self.api.rename_url(username) {
                Ok(url) => url,
                Err(e) => return RawClaimResult::Transport(e),
            };
            let request = client.put(url).bearer_auth(self.token.expose());
            execute(request).await
        })
    }
}

/// Construct the claimant for `kind`.
pub fn build_account(
    kind: AccountKind,
    id: impl Into<String>,
    token: Secret<String>,
    api: Api,
) -> Arc<dyn Claimant> {
    match kind {
        AccountKind::GiftCode => Arc::new(GiftCodeAccount::new(id, token, api)),
        AccountKind::GamePass => Arc::new(GamePassAccount::new(id, token, api)),
        AccountKind::Microsoft => Arc::new(MicrosoftAccount::new(id, token, api)),
    }
}

async fn create_profile(
    api: &Api,
    token: &Secret<String>,
    username: &str,
    proxy: Option<&Proxy>,
) -> RawClaimResult {
    let Some(client) = api.egress.client_for(proxy) else {
        return unknown_proxy(proxy);
    };
    let request = client
        .post(api.url(CREATE_PROFILE_PATH))
        .bearer_auth(token.expose())
        .json(&CreateProfileBody {
            profile_name: username,
        });
    execute(request).await
}

/// Send one request and capture status and body without interpreting them.
async fn execute(request: reqwest::RequestBuilder) -> RawClaimResult {
    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.text().await {
                Ok(body) => {
                    trace!(status, "claim response received");
                    RawClaimResult::Response { status, body }
                }
                Err(e) => RawClaimResult::Transport(format!("reading response body: {e}")),
            }
        }
        Err(e) if e.is_timeout() => RawClaimResult::Timeout,
        Err(e) => RawClaimResult::Transport(e.to_string()),
    }
}

fn unknown_proxy(proxy: Option<&Proxy>) -> RawClaimResult {
    let label = proxy.map(|p| p.to_string()).unwrap_or_default();
    RawClaimResult::Transport(format!("no egress client registered for proxy {label}"))
}
