// References:
// - https://developer.x.com/en/docs/authentication/oauth-2-0/authorization-code

const TWITTER_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
const TWITTER_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";
const TWITTER_DEFAULT_SCOPES: &[&str] =
    &["tweet.read", "tweet.write", "users.read", "offline.access"];

/// Endpoint preset for a known provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorization_endpoint: &'static str,
    pub token_endpoint: &'static str,
    pub default_scopes: &'static [&'static str],
}

impl ProviderEndpoints {
    pub const fn twitter() -> Self {
        Self {
            authorization_endpoint: TWITTER_AUTHORIZE_URL,
            token_endpoint: TWITTER_TOKEN_URL,
            default_scopes: TWITTER_DEFAULT_SCOPES,
        }
    }
}
