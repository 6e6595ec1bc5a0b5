//! OAuth 1.0a request signing (HMAC-SHA1), as required for user-context
//! calls to the X API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::SocialCredentials;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use time::OffsetDateTime;

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone)]
pub struct OAuth1 {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl OAuth1 {
    pub fn new(consumer_key: &str, consumer_secret: &str, token: &str, token_secret: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
            token: token.to_string(),
            token_secret: token_secret.to_string(),
        }
    }

    pub fn from_credentials(credentials: &SocialCredentials) -> Self {
        Self::new(
            &credentials.api_key,
            &credentials.api_secret,
            &credentials.access_token,
            &credentials.access_token_secret,
        )
    }

    /// `Authorization` header value for a request. `params` are the query and
    /// form-encoded body parameters; JSON and multipart bodies are not signed.
    pub fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        self.authorization_with(method, url, params, &nonce(), &timestamp)
    }

    fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let mut signed: Vec<(&str, &str)> = oauth_params.clone();
        signed.extend_from_slice(params);
        let signature = self.signature(method, url, &signed);

        oauth_params.push(("oauth_signature", signature.as_str()));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }

    fn signature(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let mut encoded: Vec<(String, String)> =
            params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_url = url.split('?').next().unwrap_or(url);
        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(base_url),
            encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(base_string.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
