use crate::core::AppError;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "X-API-Key";
/// Customer the host store is acting for; only trusted behind a verified key
pub const CUSTOMER_ID_HEADER: &str = "X-Customer-ID";

/// Customer identity vouched for by the host store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedCustomer(pub u64);

impl FromRequest for AuthenticatedCustomer {
    type Error = AppError;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedCustomer>()
                .copied()
                .ok_or_else(|| AppError::unauthorized("Missing X-Customer-ID header")),
        )
    }
}

/// API key check against a single argon2 hash from configuration.
///
/// Used for the admin scope and for host-store routes. A valid key also
/// admits the `X-Customer-ID` header as an [`AuthenticatedCustomer`].
pub struct ApiKeyAuth {
    key_hash: Arc<str>,
}

impl ApiKeyAuth {
    pub fn new(key_hash: impl Into<Arc<str>>) -> Self {
        Self {
            key_hash: key_hash.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddleware {
            service: Rc::new(service),
            key_hash: self.key_hash.clone(),
        }))
    }
}

pub struct ApiKeyAuthMiddleware<S> {
    service: Rc<S>,
    key_hash: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let key_hash = self.key_hash.clone();

        Box::pin(async move {
            let api_key = req
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| Error::from(AppError::unauthorized("Missing X-API-Key header")))?;

            if !verify_api_key(api_key, &key_hash).map_err(Error::from)? {
                warn!(path = %req.path(), "Invalid API key");
                return Err(Error::from(AppError::unauthorized("Invalid API key")));
            }

            if let Some(raw) = req.headers().get(CUSTOMER_ID_HEADER) {
                let customer_id = raw
                    .to_str()
                    .ok()
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .ok_or_else(|| {
                        Error::from(AppError::unauthorized("Invalid X-Customer-ID header"))
                    })?;
                req.extensions_mut().insert(AuthenticatedCustomer(customer_id));
            }

            svc.call(req).await
        })
    }
}

/// Argon2 PHC string for an API key; used to produce `ADMIN_API_KEY_HASH`
/// and `HOST_API_KEY_HASH`
pub fn hash_api_key(api_key: &str) -> crate::core::Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AppError::internal(format!("Failed to build salt: {}", e)))?;

    Argon2::default()
        .hash_password(api_key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash API key: {}", e)))
}

pub fn verify_api_key(api_key: &str, hash: &str) -> crate::core::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("Invalid hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(api_key.as_bytes(), &parsed_hash)
        .is_ok())
}
