use std::env;
use std::str::FromStr;

use crate::secret::Secret;

/// Asgardeo tenant the portal and proxy talk to unless overridden
pub const DEFAULT_ASGARDEO_BASE_URL: &str = "https://api.asgardeo.io/t/idcardapp";

/// Scopes requested at sign-in; the last one grants the guest invitation API
pub const DEFAULT_SCOPES: &[&str] = &[
    "openid",
    "profile",
    "email",
    "groups",
    "roles",
    "internal_guest_mgt_invite_add",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

/// Outbound HTTP timeouts shared by the portal and the proxy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpTimeouts {
    pub connect_timeout_secs: u64,
    /// Overall request timeout. None waits on the upstream indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl HttpTimeouts {
    fn from_lookup<F>(var: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            connect_timeout_secs: parse_or(var, "HTTP_CONNECT_TIMEOUT_SECS", 10),
            request_timeout_secs: var("HTTP_REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environment configuration
    pub environment: Environment,

    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Portal public URL (for post-logout redirects)
    pub portal_public_url: String,

    // Asgardeo tenant and OIDC client
    pub asgardeo_base_url: String,
    pub client_id: String,
    pub client_secret: Option<Secret>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,

    // Proxy endpoint used by the manual user creation flow
    pub proxy_create_user_url: String,

    pub http: HttpTimeouts,

    // JWKS cache configuration (in seconds)
    pub jwks_cache_ttl_secs: u64,

    // Portal sessions older than this are purged (in seconds)
    pub session_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables using std::env::var
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match var("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let client_id = required(&var, "CLIENT_ID")?;
        let redirect_uri = required(&var, "REDIRECT_URI")?;

        // Empty secret means a public client (PKCE only)
        let client_secret = var("CLIENT_SECRET")
            .filter(|s| !s.is_empty())
            .map(Secret::new);

        // Portal public URL - derive from REDIRECT_URI by stripping the path
        // e.g., http://localhost:5173/auth/callback -> http://localhost:5173
        let portal_public_url = var("PORTAL_PUBLIC_URL").unwrap_or_else(|| {
            redirect_uri
                .find("://")
                .and_then(|scheme_end| {
                    redirect_uri[scheme_end + 3..]
                        .find('/')
                        .map(|path_start| redirect_uri[..scheme_end + 3 + path_start].to_string())
                })
                .unwrap_or_else(|| redirect_uri.clone())
        });

        let asgardeo_base_url = asgardeo_base_url(&var);

        let scopes = var("OIDC_SCOPES")
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect());

        Ok(Config {
            environment,
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&var, "SERVER_PORT", 5173),
            portal_public_url: portal_public_url.trim_end_matches('/').to_string(),
            asgardeo_base_url,
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            proxy_create_user_url: var("PROXY_CREATE_USER_URL")
                .unwrap_or_else(|| "http://localhost:4000/api/create-user".to_string()),
            http: HttpTimeouts::from_lookup(&var),
            jwks_cache_ttl_secs: parse_or(&var, "JWKS_CACHE_TTL_SECS", 3600),
            session_ttl_secs: parse_or(&var, "SESSION_TTL_SECS", 8 * 3600),
        })
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get cookie security flags based on environment
    pub fn cookie_secure_flag(&self) -> &str {
        if self.is_production() {
            "; Secure"
        } else {
            ""
        }
    }

    /// Asgardeo guest invitation endpoint
    pub fn invite_url(&self) -> String {
        format!("{}/api/asgardeo-guest/v1/users/invite", self.asgardeo_base_url)
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Configuration for the SCIM create-user proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub server_host: String,
    pub server_port: u16,
    pub scim_users_url: String,
    /// Bearer credential attached to every forwarded request
    pub scim_token: Secret,
    /// The single front-end origin allowed by CORS
    pub allowed_origin: String,
    pub http: HttpTimeouts,
}

impl ProxyConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scim_token = var("ASGARDEO_SCIM_TOKEN")
            .filter(|s| !s.is_empty())
            .map(Secret::new)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "ASGARDEO_SCIM_TOKEN is not set. Please set it before running the server."
                )
            })?;

        Ok(ProxyConfig {
            server_host: var("PROXY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&var, "PROXY_PORT", 4000),
            scim_users_url: format!("{}/scim2/Users", asgardeo_base_url(&var)),
            scim_token,
            allowed_origin: var("PROXY_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            http: HttpTimeouts::from_lookup(&var),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn required<F>(var: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    var(key).and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

fn asgardeo_base_url<F>(var: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var("ASGARDEO_BASE_URL")
        .unwrap_or_else(|| DEFAULT_ASGARDEO_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}
