use crate::models::{Claims, Id, ServiceError};
use actix_web::{HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};

pub mod locks;
pub mod uploads;

// JWT utility functions
pub mod jwt {
    use super::*;
    use derive_more::Display;

    #[derive(Debug, Display, PartialEq)]
    pub enum TokenError {
        #[display(fmt = "invalid token")]
        InvalidToken,
        #[display(fmt = "token signing failed")]
        Signing,
    }

    impl std::error::Error for TokenError {}

    /// Mints and verifies HS256 bearer tokens carrying `{id, exp}`.
    #[derive(Clone)]
    pub struct TokenService {
        encoding: EncodingKey,
        decoding: DecodingKey,
        ttl: Duration,
    }

    impl TokenService {
        pub fn new(secret: &str, ttl: Duration) -> Self {
            TokenService {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                ttl,
            }
        }

        pub fn default_ttl(&self) -> Duration {
            self.ttl
        }

        pub fn mint(&self, user_id: Id, ttl: Duration) -> Result<String, TokenError> {
            let claims = Claims {
                id: user_id.as_hex(),
                exp: (Utc::now() + ttl).timestamp(),
            };

            encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
                .map_err(|_| TokenError::Signing)
        }

        // Strict: HS256 only, exp required and numeric, no clock-skew allowance
        pub fn verify(&self, token: &str) -> Result<Id, TokenError> {
            let mut validation = Validation::new(Algorithm::HS256);
            validation.leeway = 0;
            validation.set_required_spec_claims(&["exp"]);

            let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
                debug!("🔒 Token rejected: {}", e);
                TokenError::InvalidToken
            })?;

            data.claims.id.parse().map_err(|_| TokenError::InvalidToken)
        }
    }

    // Extract JWT from Authorization header
    pub fn extract_token_from_header(auth_header: &str) -> Result<&str, ServiceError> {
        match auth_header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim()),
            _ => Err(ServiceError::Unauthorized),
        }
    }
}

// Password utility functions
pub mod password {
    use bcrypt::{hash, verify, BcryptError};
    use std::sync::Arc;

    /// bcrypt with a configurable cost. Each hash embeds its own salt.
    #[derive(Clone)]
    pub struct PasswordHasher {
        cost: u32,
        // Verified against when the login name is unknown so both failure paths cost the same
        dummy_hash: Arc<String>,
    }

    impl PasswordHasher {
        pub fn new(cost: u32) -> Result<Self, BcryptError> {
            let dummy_hash = hash("dance-flow-placeholder", cost)?;
            Ok(PasswordHasher {
                cost,
                dummy_hash: Arc::new(dummy_hash),
            })
        }

        pub fn hash(&self, plaintext: &str) -> Result<String, BcryptError> {
            hash(plaintext, self.cost)
        }

        // A malformed stored hash counts as a mismatch
        pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
            verify(plaintext, stored).unwrap_or(false)
        }

        pub fn burn_verify(&self, plaintext: &str) {
            let _ = verify(plaintext, &self.dummy_hash);
        }
    }
}

/// Caller identity placed in request extensions by [`auth_middleware::Authentication`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UserContext {
    pub user_id: Id,
}

pub fn get_user_id_from_request(req: &HttpRequest) -> Result<Id, ServiceError> {
    match req.extensions().get::<UserContext>() {
        Some(context) => Ok(context.user_id),
        None => {
            warn!("⚠️ No user context on request to {}", req.path());
            Err(ServiceError::Unauthorized)
        }
    }
}

// Middleware for JWT authentication
pub mod auth_middleware {
    use super::jwt::{extract_token_from_header, TokenService};
    use super::UserContext;
    use crate::models::ServiceError;
    use actix_web::body::EitherBody;
    use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
    use actix_web::http::header;
    use actix_web::{Error, HttpMessage, ResponseError};
    use futures::future::{ok, Ready};
    use log::debug;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;

    pub struct Authentication {
        tokens: Rc<TokenService>,
    }

    impl Authentication {
        pub fn new(tokens: TokenService) -> Self {
            Authentication { tokens: Rc::new(tokens) }
        }
    }

    impl<S, B> Transform<S, ServiceRequest> for Authentication
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<EitherBody<B>>;
        type Error = Error;
        type Transform = AuthenticationMiddleware<S>;
        type InitError = ();
        type Future = Ready<Result<Self::Transform, Self::InitError>>;

        fn new_transform(&self, service: S) -> Self::Future {
            ok(AuthenticationMiddleware {
                service,
                tokens: Rc::clone(&self.tokens),
            })
        }
    }

    pub struct AuthenticationMiddleware<S> {
        service: S,
        tokens: Rc<TokenService>,
    }

    impl<S> AuthenticationMiddleware<S> {
        fn authenticate(&self, req: &ServiceRequest) -> Result<UserContext, ServiceError> {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .ok_or(ServiceError::Unauthorized)?;
            let auth_str = auth_header.to_str().map_err(|_| ServiceError::Unauthorized)?;
            let token = extract_token_from_header(auth_str)?;
            let user_id = self
                .tokens
                .verify(token)
                .map_err(|_| ServiceError::Unauthorized)?;
            Ok(UserContext { user_id })
        }
    }

    impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<EitherBody<B>>;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

        forward_ready!(service);

        fn call(&self, req: ServiceRequest) -> Self::Future {
            match self.authenticate(&req) {
                Ok(context) => {
                    req.extensions_mut().insert(context);
                    let fut = self.service.call(req);
                    Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
                }
                Err(e) => {
                    debug!("🔒 Rejected unauthenticated request to {}", req.path());
                    let response = req.into_response(e.error_response()).map_into_right_body();
                    Box::pin(async move { Ok(response) })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::jwt::{extract_token_from_header, TokenError, TokenService};
    use super::password::PasswordHasher;
    use super::*;
    use serde_json::json;

    fn tokens() -> TokenService {
        TokenService::new("test-secret", Duration::hours(24))
    }

    #[test]
    fn token_round_trip() {
        let service = tokens();
        let user = Id::new();
        let token = service.mint(user, Duration::hours(1)).unwrap();
        assert_eq!(service.verify(&token).unwrap(), user);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = tokens();
        let token = service.mint(Id::new(), Duration::seconds(-10)).unwrap();
        assert_eq!(service.verify(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let other = TokenService::new("other-secret", Duration::hours(1));
        let token = other.mint(Id::new(), Duration::hours(1)).unwrap();
        assert_eq!(tokens().verify(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let claims = json!({ "id": Id::new().to_string(), "exp": (Utc::now() + Duration::hours(1)).timestamp() });
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(tokens().verify(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn missing_or_textual_exp_is_rejected() {
        let key = EncodingKey::from_secret(b"test-secret");
        let no_exp = encode(&Header::default(), &json!({ "id": Id::new().to_string() }), &key).unwrap();
        assert_eq!(tokens().verify(&no_exp), Err(TokenError::InvalidToken));

        let text_exp = encode(
            &Header::default(),
            &json!({ "id": Id::new().to_string(), "exp": "tomorrow" }),
            &key,
        )
        .unwrap();
        assert_eq!(tokens().verify(&text_exp), Err(TokenError::InvalidToken));
    }

    #[test]
    fn claims_carry_only_id_and_exp() {
        let service = tokens();
        let user = Id::new();
        let token = service.mint(user, Duration::hours(1)).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let data = decode::<serde_json::Value>(&token, &DecodingKey::from_secret(b""), &validation).unwrap();
        let keys: Vec<_> = data.claims.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2, "payload was {}", payload);
        assert_eq!(data.claims["id"], json!(user.to_string()));
    }

    // bcrypt 0.14 keeps its MIN_COST private; this mirrors its value.
    const BCRYPT_MIN_COST: u32 = 4;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(extract_token_from_header("Bearer abc").unwrap(), "abc");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }

    #[test]
    fn password_round_trip() {
        let hasher = PasswordHasher::new(BCRYPT_MIN_COST).unwrap();
        let hashed = hasher.hash("pw12345").unwrap();
        assert!(hashed.len() >= 60);
        assert!(hasher.verify("pw12345", &hashed));
        assert!(!hasher.verify("pw12346", &hashed));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = PasswordHasher::new(BCRYPT_MIN_COST).unwrap();
        let first = hasher.hash("same-password").unwrap();
        let second = hasher.hash("same-password").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify("same-password", &first));
        assert!(hasher.verify("same-password", &second));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = PasswordHasher::new(BCRYPT_MIN_COST).unwrap();
        assert!(!hasher.verify("anything", "not-a-bcrypt-hash"));
    }
}
