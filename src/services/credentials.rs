use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of ambient credentials (cookies) the export calls need.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Value of the named credential, `None` when unknown or empty
    async fn get_credential(&self, name: &str) -> Option<String>;
}

/// Credentials parsed from a `Cookie` request header.
#[derive(Debug, Clone, Default)]
pub struct CookieJarCredentials {
    cookies: HashMap<String, String>,
}

impl CookieJarCredentials {
    /// Parses `a=1; b=2`. Values keep any `=` they contain; malformed pairs are skipped.
    pub fn from_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { cookies }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for CookieJarCredentials {
    async fn get_credential(&self, name: &str) -> Option<String> {
        self.cookies.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// Reads `SPACE_CREDENTIAL_<NAME>`, the name upper-cased with
/// non-alphanumerics mapped to `_` (`_csrf_token` → `SPACE_CREDENTIAL__CSRF_TOKEN`).
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn env_key(name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("SPACE_CREDENTIAL_{}", suffix)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn get_credential(&self, name: &str) -> Option<String> {
        std::env::var(Self::env_key(name))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

/// Asks each provider in turn; the first non-empty answer wins.
#[derive(Clone, Default)]
pub struct ChainedCredentials {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    pub fn with(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[async_trait]
impl CredentialProvider for ChainedCredentials {
    async fn get_credential(&self, name: &str) -> Option<String> {
        for provider in &self.providers {
            if let Some(value) = provider.get_credential(name).await {
                return Some(value);
            }
        }
        tracing::debug!("Credential '{}' not found in {} provider(s)", name, self.providers.len());
        None
    }
}

/// Factory for the default chain: environment overrides first, then the
/// session cookie header when one is configured.
pub fn create_credentials(cookie_header: Option<&str>) -> Arc<dyn CredentialProvider> {
    let mut chain = ChainedCredentials::default().with(Arc::new(EnvCredentials));
    if let Some(header) = cookie_header {
        let jar = CookieJarCredentials::from_header(header);
        tracing::debug!("Cookie jar holds {} cookie(s)", jar.len());
        chain = chain.with(Arc::new(jar));
    }
    Arc::new(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cookie_jar_parsing() {
        let jar = CookieJarCredentials::from_header(
            "session=abc; _csrf_token=tok=en ; empty=; =nameless; junk",
        );
        assert_eq!(jar.len(), 3);
        assert_eq!(jar.get_credential("session").await.as_deref(), Some("abc"));
        assert_eq!(jar.get_credential("_csrf_token").await.as_deref(), Some("tok=en"));
        assert_eq!(jar.get_credential("empty").await, None);
        assert_eq!(jar.get_credential("missing").await, None);
    }

    #[test]
    fn test_env_key() {
        assert_eq!(EnvCredentials::env_key("_csrf_token"), "SPACE_CREDENTIAL__CSRF_TOKEN");
        assert_eq!(EnvCredentials::env_key("x-token"), "SPACE_CREDENTIAL_X_TOKEN");
    }

    #[tokio::test]
    async fn test_chain_falls_back_in_order() {
        let first = CookieJarCredentials::from_header("a=1");
        let second = CookieJarCredentials::from_header("a=2; b=3");
        let chain = ChainedCredentials::new(vec![Arc::new(first), Arc::new(second)]);

        assert_eq!(chain.get_credential("a").await.as_deref(), Some("1"));
        assert_eq!(chain.get_credential("b").await.as_deref(), Some("3"));
        assert_eq!(chain.get_credential("c").await, None);
    }

    #[tokio::test]
    async fn test_factory_reads_cookie_header() {
        let provider = create_credentials(Some("_unit_test_cookie=xyz"));
        assert_eq!(
            provider.get_credential("_unit_test_cookie").await.as_deref(),
            Some("xyz")
        );
    }
}
