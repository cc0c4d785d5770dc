use anyhow::{Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Claims read from an Asgardeo ID token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub involvement: Option<String>,
    #[serde(default)]
    pub valid_thru: Option<String>,
    /// Asgardeo sends a bare string when the user holds exactly one role
    #[serde(default, deserialize_with = "one_or_many")]
    pub roles: Vec<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(role)) => vec![role],
        Some(OneOrMany::Many(roles)) => roles,
        None => Vec::new(),
    })
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

struct JwksCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Verifies ID tokens against the tenant's published signing keys
pub struct IdTokenVerifier {
    jwks_url: String,
    /// Asgardeo issues tokens with `{base}/oauth2/token` as issuer
    expected_issuer: String,
    /// The portal's client_id
    expected_audience: String,
    client: reqwest::Client,
    jwks_cache: RwLock<Option<JwksCache>>,
    cache_ttl: Duration,
}

impl IdTokenVerifier {
    pub fn new(
        asgardeo_base_url: &str,
        expected_audience: String,
        client: reqwest::Client,
        jwks_cache_ttl_secs: u64,
    ) -> Self {
        let base = asgardeo_base_url.trim_end_matches('/');
        let jwks_url = format!("{}/oauth2/jwks", base);
        let expected_issuer = format!("{}/oauth2/token", base);

        tracing::info!(
            jwks_url = %jwks_url,
            expected_issuer = %expected_issuer,
            expected_audience = %expected_audience,
            jwks_cache_ttl_secs = jwks_cache_ttl_secs,
            "ID token verifier initialized"
        );

        Self {
            jwks_url,
            expected_issuer,
            expected_audience,
            client,
            jwks_cache: RwLock::new(None),
            cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
        }
    }

    /// Verify and decode an ID token (fetches JWKS if not cached or expired)
    pub async fn validate_async(&self, token: &str) -> Result<IdentityClaims> {
        let header = decode_header(token).context("Invalid token header")?;
        let kid = header.kid.clone().context("Token missing kid")?;

        let decoding_key = match self.get_cached_key(&kid).await? {
            Some(key) => key,
            None => {
                // Provider may have rotated keys since the last fetch
                tracing::warn!(kid = %kid, "Key ID not found in cache, forcing JWKS refresh");
                self.refresh_jwks().await?;

                match self.cached_key(&kid).await {
                    Some(key) => key,
                    None => {
                        tracing::error!(kid = %kid, "Unknown key ID after JWKS refresh");
                        anyhow::bail!("Unknown key ID: {}", kid);
                    }
                }
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.set_issuer(&[&self.expected_issuer]);
        validation.set_audience(&[&self.expected_audience]);

        let token_data = match decode::<IdentityClaims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                // Hash lets operators correlate failures without logging the token
                let token_hash = format!("{:x}", md5::compute(token));
                tracing::error!(
                    error = ?e,
                    kid = %kid,
                    alg = ?header.alg,
                    token_hash = %token_hash,
                    "ID token verification failed"
                );
                anyhow::bail!("Token validation failed: {}", e);
            }
        };

        tracing::info!(
            sub = %token_data.claims.sub,
            roles = ?token_data.claims.roles,
            "ID token verified"
        );

        Ok(token_data.claims)
    }

    /// Check if JWKS is cached (for readiness checks)
    pub async fn is_jwks_cached(&self) -> bool {
        self.jwks_cache.read().await.is_some()
    }

    /// Fetch JWKS ahead of the first sign-in
    pub async fn prefetch_jwks(&self) -> Result<()> {
        tracing::info!("Prefetching JWKS at startup");
        self.refresh_jwks().await
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.jwks_cache.read().await;
        cache.as_ref().and_then(|c| c.keys.get(kid).cloned())
    }

    /// Get cached key, refreshing the whole set first when the TTL has passed
    async fn get_cached_key(&self, kid: &str) -> Result<Option<DecodingKey>> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(jwks_cache) = cache.as_ref() {
                if jwks_cache.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(jwks_cache.keys.get(kid).cloned());
                }
                tracing::info!(
                    elapsed_secs = jwks_cache.fetched_at.elapsed().as_secs(),
                    ttl_secs = self.cache_ttl.as_secs(),
                    "JWKS cache expired, will refresh"
                );
            }
        }

        self.refresh_jwks().await?;
        Ok(self.cached_key(kid).await)
    }

    async fn refresh_jwks(&self) -> Result<()> {
        tracing::info!(url = %self.jwks_url, "Fetching JWKS from Asgardeo");

        let response: JwksResponse = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .context("Failed to fetch JWKS")?
            .error_for_status()
            .context("JWKS endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse JWKS")?;

        let mut keys = HashMap::new();
        for jwk in response.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .context("Failed to create decoding key")?;
            tracing::debug!(kid = %jwk.kid, "Added key to cache");
            keys.insert(jwk.kid, key);
        }

        tracing::info!(key_count = keys.len(), "JWKS fetched successfully");

        let mut cache = self.jwks_cache.write().await;
        *cache = Some(JwksCache {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}
