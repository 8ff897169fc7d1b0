//! OpenAPI document for the auth and health endpoints

use crate::auth::{AuthResponse, LoginRequest, ProfileResponse, RegisterRequest};
use crate::error::ApiError;
use crate::handlers::{auth, health};
use moments_core::{Role, UserProfile};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness_check,
        auth::admin_login_handler,
        auth::login_handler,
        auth::register_handler,
        auth::me_handler,
    ),
    components(schemas(
        LoginRequest,
        RegisterRequest,
        AuthResponse,
        ProfileResponse,
        UserProfile,
        Role,
        ApiError,
        health::HealthResponse,
        health::ReadinessResponse,
        health::ReadinessChecks,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Login, registration and session profile"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        for path in ["/api/admin/login", "/api/auth/login", "/api/auth/register", "/api/auth/me"] {
            assert!(json["paths"].get(path).is_some(), "missing {path}");
        }
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
