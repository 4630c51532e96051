use super::handlers::{auth, health, me};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `/` or `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut sokoni_tag = Tag::new("sokoni");
    sokoni_tag.description = Some("Marketplace identity and access API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Signup, sessions, and one-time token flows".to_string());

    let mut me_tag = Tag::new("me");
    me_tag.description = Some("Authenticated self-service".to_string());

    // Set tags on the seed spec before wiring routes; `routes!` only appends to
    // `paths`, leaving `tags` untouched, so the resulting spec is identical.
    let mut openapi = cargo_openapi();
    openapi.tags = Some(vec![sokoni_tag, auth_tag, me_tag]);

    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(health::health))
        .routes(routes!(auth::signup::signup))
        .routes(routes!(auth::session::signin))
        .routes(routes!(auth::session::refresh))
        .routes(routes!(auth::session::signout))
        .routes(routes!(auth::reset::update_password))
        .routes(routes!(auth::reset::forgot_password))
        .routes(routes!(auth::reset::validate_reset_token))
        .routes(routes!(auth::reset::reset_password))
        .routes(routes!(auth::reset::change_password))
        .routes(routes!(auth::verification::verify_email))
        .routes(routes!(auth::magic::send_magic_link))
        .routes(routes!(auth::magic::generate_magic_token))
        .routes(routes!(auth::magic::magic_login))
        .routes(routes!(me::get_me))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_uses_cargo_metadata() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_registers_auth_routes() {
        let spec = openapi();
        for path in [
            "/health",
            "/v1/auth/signup",
            "/v1/auth/signin",
            "/v1/auth/refresh",
            "/v1/auth/signout",
            "/v1/auth/update-password",
            "/v1/auth/forgot-password",
            "/v1/auth/validate-reset-token",
            "/v1/auth/reset-password",
            "/v1/auth/change-password",
            "/v1/auth/verify-email",
            "/v1/auth/send-magic-link",
            "/v1/auth/generate-magic-token",
            "/v1/auth/magic-login",
            "/v1/me",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing path in OpenAPI spec: {path}"
            );
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Sokoni <team@sokoni.dev>"),
            (Some("Team Sokoni"), Some("team@sokoni.dev"))
        );
        assert_eq!(parse_author("Team Sokoni"), (Some("Team Sokoni"), None));
        assert_eq!(parse_author("<team@sokoni.dev>"), (None, Some("team@sokoni.dev")));
    }
}
