//! OAuth2/OIDC client for the Asgardeo tenant
//!
//! Wraps the authorization-code + PKCE flow, refresh-token renewal, ID token
//! verification and the end-session URL behind one type shared by all
//! portal handlers.

use oauth2::{
    basic::{BasicErrorResponseType, BasicTokenType},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    StandardErrorResponse, StandardRevocableToken, StandardTokenIntrospectionResponse,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

use super::helpers::build_logout_url;
use super::jwt::{IdTokenVerifier, IdentityClaims};
use super::session::{PendingSignIn, TokenSet};
use super::IdpError;
use crate::config::Config;
use crate::secret::Secret;

/// Custom extra fields to capture id_token from OIDC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcTokenFields {
    pub id_token: Option<String>,
}

impl ExtraTokenFields for OidcTokenFields {}

type OidcTokenResponse = StandardTokenResponse<OidcTokenFields, BasicTokenType>;

/// Type alias for our configured OAuth client with OIDC support
type ConfiguredOAuthClient = oauth2::Client<
    StandardErrorResponse<BasicErrorResponseType>,
    OidcTokenResponse,
    StandardTokenIntrospectionResponse<OidcTokenFields, BasicTokenType>,
    StandardRevocableToken,
    StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Used when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Authorization redirect plus the values the callback must check
#[derive(Debug)]
pub struct SignInRequest {
    pub authorize_url: Url,
    pub pending: PendingSignIn,
}

/// Access token ready for an outbound call
#[derive(Debug)]
pub enum AccessToken {
    /// The stored token is still valid
    Current(Secret),
    /// The stored token had expired and was renewed; callers should persist it
    Renewed(TokenSet),
}

impl AccessToken {
    pub fn secret(&self) -> &str {
        match self {
            AccessToken::Current(token) => token.expose(),
            AccessToken::Renewed(tokens) => tokens.access_token.expose(),
        }
    }
}

pub struct IdentityProviderClient {
    oauth: ConfiguredOAuthClient,
    http: reqwest::Client,
    asgardeo_base_url: String,
    portal_public_url: String,
    client_id: String,
    scopes: Vec<String>,
    verifier: IdTokenVerifier,
}

impl IdentityProviderClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Result<Self, IdpError> {
        let base = config.asgardeo_base_url.trim_end_matches('/');

        let auth_url = AuthUrl::new(format!("{}/oauth2/authorize", base))
            .map_err(|e| IdpError::Endpoint(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(format!("{}/oauth2/token", base))
            .map_err(|e| IdpError::Endpoint(format!("Invalid token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| IdpError::Endpoint(format!("Invalid redirect URL: {}", e)))?;

        let mut oauth: ConfiguredOAuthClient =
            oauth2::Client::new(ClientId::new(config.client_id.clone()))
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url);
        if let Some(secret) = &config.client_secret {
            oauth = oauth.set_client_secret(ClientSecret::new(secret.expose().to_string()));
        }

        let verifier = IdTokenVerifier::new(
            base,
            config.client_id.clone(),
            http.clone(),
            config.jwks_cache_ttl_secs,
        );

        Ok(Self {
            oauth,
            http,
            asgardeo_base_url: base.to_string(),
            portal_public_url: config.portal_public_url.clone(),
            client_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
            verifier,
        })
    }

    /// Build the authorization URL with CSRF state and a PKCE challenge
    pub fn sign_in_request(&self) -> SignInRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (authorize_url, csrf_token) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        SignInRequest {
            authorize_url,
            pending: PendingSignIn {
                csrf_state: csrf_token.secret().clone(),
                pkce_verifier: Secret::new(pkce_verifier.secret().clone()),
            },
        }
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: &Secret,
    ) -> Result<TokenSet, IdpError> {
        tracing::info!("Exchanging authorization code for tokens");

        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.expose().to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| IdpError::TokenExchange(e.to_string()))?;

        let tokens = token_set(&response, None);
        tracing::info!(
            has_id_token = tokens.id_token.is_some(),
            has_refresh_token = tokens.refresh_token.is_some(),
            "Successfully obtained access token"
        );
        Ok(tokens)
    }

    /// Renew an expired token set using its refresh token
    pub async fn refresh(&self, current: &TokenSet) -> Result<TokenSet, IdpError> {
        let refresh_token = current
            .refresh_token
            .as_ref()
            .ok_or(IdpError::AccessTokenUnavailable)?;

        let response = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token.expose().to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| IdpError::Refresh(e.to_string()))?;

        tracing::info!("Access token renewed with refresh token");
        Ok(token_set(&response, Some(current)))
    }

    /// Access token for an outbound call, renewed first when expired
    pub async fn access_token(&self, tokens: &TokenSet) -> Result<AccessToken, IdpError> {
        if !tokens.is_expired() {
            return Ok(AccessToken::Current(tokens.access_token.clone()));
        }
        self.refresh(tokens).await.map(AccessToken::Renewed)
    }

    /// Verify and decode the ID token
    pub async fn decode_id_token(&self, id_token: &str) -> anyhow::Result<IdentityClaims> {
        self.verifier.validate_async(id_token).await
    }

    /// Asgardeo end-session URL for sign-out
    pub fn sign_out_url(&self, id_token: Option<&str>) -> String {
        build_logout_url(
            &self.asgardeo_base_url,
            &self.portal_public_url,
            &self.client_id,
            id_token,
        )
    }

    pub fn verifier(&self) -> &IdTokenVerifier {
        &self.verifier
    }
}

/// Convert a token endpoint response, keeping refresh and ID tokens the
/// provider did not re-issue
fn token_set(response: &OidcTokenResponse, previous: Option<&TokenSet>) -> TokenSet {
    let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);

    TokenSet {
        access_token: Secret::new(response.access_token().secret().clone()),
        expires_at: Instant::now() + lifetime,
        refresh_token: response
            .refresh_token()
            .map(|t| Secret::new(t.secret().clone()))
            .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
        id_token: response
            .extra_fields()
            .id_token
            .clone()
            .or_else(|| previous.and_then(|p| p.id_token.clone())),
    }
}
