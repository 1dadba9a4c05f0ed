use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::LocalBoxFuture;

use crate::{
    auth::{Claims, JwtService},
    errors::{AppError, AppResult},
};

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()))
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let claims = match authenticate(&req) {
                Ok(claims) => claims,
                Err(e) => {
                    log::debug!("Rejected request to {}: {}", req.path(), e);
                    let response = e.error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            req.extensions_mut().insert(claims);

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn authenticate(req: &ServiceRequest) -> AppResult<Claims> {
    let jwt_service = req
        .app_data::<web::Data<JwtService>>()
        .ok_or_else(|| AppError::InternalError("JWT service not configured".to_string()))?;

    let token = bearer_token(req.headers())?;
    jwt_service.validate_token(token)
}

// Extractor for the authenticated learner in handlers
pub struct AuthenticatedUser(pub Claims);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let claims = req
            .extensions()
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()));

        ready(claims.map(AuthenticatedUser))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(req.headers()).unwrap(), "abc.def.ghi");

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcg=="))
            .to_http_request();
        assert!(bearer_token(req.headers()).is_err());

        let req = TestRequest::default().to_http_request();
        assert!(bearer_token(req.headers()).is_err());
    }
}
