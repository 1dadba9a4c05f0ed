use actix_web::{post, web, HttpRequest};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{
    auth::{bearer_token, JwtService},
    graphql::Schema,
};

/// Resolvers read `Claims` from the request data; a missing or invalid token
/// leaves them absent and protected fields answer `UNAUTHORIZED`.
#[post("/graphql")]
pub async fn graphql(
    schema: web::Data<Schema>,
    jwt_service: web::Data<JwtService>,
    http_request: HttpRequest,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();

    if let Ok(token) = bearer_token(http_request.headers()) {
        match jwt_service.validate_token(token) {
            Ok(claims) => request = request.data(claims),
            Err(e) => log::debug!("Ignoring invalid GraphQL bearer token: {}", e),
        }
    }

    schema.execute(request).await.into()
}
