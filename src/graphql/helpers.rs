use async_graphql::{Context, ErrorExtensions};

use crate::{
    app_state::AppState,
    auth::{extract_claims_from_context, Claims},
    errors::AppResult,
};

/// Converts service errors into GraphQL errors that keep their `code` and
/// `retryable` extensions.
pub trait GraphQLResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GraphQLResultExt<T> for AppResult<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

pub fn app_state<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a AppState> {
    ctx.data::<AppState>()
}

/// Shared state plus the caller's claims; fails with `UNAUTHORIZED` when the
/// request carried no valid token.
pub fn authenticated<'a>(ctx: &Context<'a>) -> async_graphql::Result<(&'a AppState, Claims)> {
    let state = app_state(ctx)?;
    let claims = extract_claims_from_context(ctx).gql()?;
    Ok((state, claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn test_gql_keeps_error_code() {
        let result: AppResult<()> = Err(AppError::Locked("topic".to_string()));
        let err = result.gql().unwrap_err();

        let extensions = err.extensions.expect("extensions set");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::String("LOCKED".to_string()))
        );
        assert_eq!(
            extensions.get("retryable"),
            Some(&async_graphql::Value::Boolean(false))
        );
    }
}
