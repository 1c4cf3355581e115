use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use sha2::{Digest, Sha256};
use url::{form_urlencoded, Url};

use crate::config::Config;
use crate::services::cookies::{build_cookie, SameSite};
use crate::services::redirect::sanitize_return_to;

pub const STATE_COOKIE: &str = "oauth_state";
pub const VERIFIER_COOKIE: &str = "oauth_verifier";
pub const RETURN_TO_COOKIE: &str = "oauth_return_to";
/// Lifetime of the PKCE cookies; the provider round trip must finish within it.
pub const PKCE_COOKIE_MAX_AGE: u64 = 600;

const VERIFIER_LEN: usize = 64;
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OAuthError {
    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),
    #[error("{0}")]
    InitiationFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Apple,
    Facebook,
    Github,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Apple => "apple",
            Provider::Facebook => "facebook",
            Provider::Github => "github",
        }
    }

    fn authorize_endpoint(self) -> &'static str {
        match self {
            Provider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Provider::Apple => "https://appleid.apple.com/auth/authorize",
            Provider::Facebook => "https://www.facebook.com/v19.0/dialog/oauth",
            Provider::Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn scope(self) -> &'static str {
        match self {
            Provider::Google => "openid email profile",
            Provider::Apple => "name email",
            Provider::Facebook => "email public_profile",
            Provider::Github => "read:user user:email",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "apple" => Ok(Provider::Apple),
            "facebook" => Ok(Provider::Facebook),
            "github" => Ok(Provider::Github),
            other => Err(OAuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| UNRESERVED[rng.gen_range(0..UNRESERVED.len())] as char)
            .collect();
        let challenge = code_challenge(&verifier);
        Self { verifier, challenge }
    }
}

/// S256 code challenge: base64url (no padding) of SHA-256(verifier).
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Where to send the browser, plus the cookies that remember the flow.
#[derive(Debug, Clone)]
pub struct Initiation {
    pub provider: Provider,
    pub redirect_url: String,
    pub state: String,
    pub set_cookies: Vec<String>,
}

#[derive(Debug, Clone)]
struct ProviderClient {
    provider: Provider,
    client_id: String,
}

/// Builds provider authorization URLs. The code exchange on the way back is
/// done by the identity backend using the stored verifier.
#[derive(Debug, Clone)]
pub struct OAuthInitiator {
    clients: Vec<ProviderClient>,
    redirect_base: String,
    secure_cookies: bool,
}

impl OAuthInitiator {
    pub fn from_config(config: &Config) -> Self {
        let clients = [
            (Provider::Google, &config.google_client_id),
            (Provider::Apple, &config.apple_client_id),
            (Provider::Facebook, &config.facebook_client_id),
            (Provider::Github, &config.github_client_id),
        ]
        .into_iter()
        .filter_map(|(provider, id)| {
            id.clone().map(|client_id| ProviderClient { provider, client_id })
        })
        .collect();

        Self {
            clients,
            redirect_base: config.oauth_redirect_base.clone(),
            secure_cookies: config.cookie_secure,
        }
    }

    pub fn initiate(&self, provider: Provider, return_to: Option<&str>) -> Result<Initiation, OAuthError> {
        let client = self
            .clients
            .iter()
            .find(|c| c.provider == provider)
            .ok_or_else(|| {
                OAuthError::InitiationFailed(format!("{} sign-in is not configured", provider.as_str()))
            })?;

        let redirect_uri = Url::parse(&self.redirect_base)
            .and_then(|base| base.join(&format!("/auth/callback/{}", provider.as_str())))
            .map_err(|e| OAuthError::InitiationFailed(format!("Invalid OAuth redirect base: {e}")))?;

        let pkce = PkceChallenge::generate();
        let state = random_state();

        let mut url = Url::parse(provider.authorize_endpoint())
            .map_err(|e| OAuthError::InitiationFailed(format!("Invalid authorize endpoint: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &client.client_id)
                .append_pair("redirect_uri", redirect_uri.as_str())
                .append_pair("scope", provider.scope())
                .append_pair("state", &state)
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "S256");
            if provider == Provider::Apple {
                // Apple only returns name/email scopes via form_post.
                query.append_pair("response_mode", "form_post");
            }
        }

        // Lax so the cookies ride along on the provider redirect back to us.
        let mut set_cookies = vec![
            build_cookie(STATE_COOKIE, &state, PKCE_COOKIE_MAX_AGE, SameSite::Lax, self.secure_cookies),
            build_cookie(VERIFIER_COOKIE, &pkce.verifier, PKCE_COOKIE_MAX_AGE, SameSite::Lax, self.secure_cookies),
        ];
        if let Some(target) = sanitize_return_to(return_to) {
            let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
            set_cookies.push(build_cookie(
                RETURN_TO_COOKIE,
                &encoded,
                PKCE_COOKIE_MAX_AGE,
                SameSite::Lax,
                self.secure_cookies,
            ));
        }

        Ok(Initiation {
            provider,
            redirect_url: url.to_string(),
            state,
            set_cookies,
        })
    }
}

fn random_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
