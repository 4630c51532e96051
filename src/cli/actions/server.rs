use crate::api::{self, handlers::auth::AuthConfig};
use crate::cli::{actions::Action, commands::INSECURE_DEFAULT_SECRET};
use anyhow::Result;
use secrecy::SecretString;
use tracing::warn;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            secret,
            access_token_ttl,
            refresh_token_ttl,
            frontend_url,
            production,
        } => {
            if secret == INSECURE_DEFAULT_SECRET {
                warn!(
                    "Using the built-in signing secret, issued tokens are forgeable. \
                     Set SOKONI_JWT_SECRET before deploying."
                );
            }

            let config = AuthConfig::new(frontend_url, SecretString::from(secret))
                .with_access_token_ttl(access_token_ttl)
                .with_refresh_token_ttl(refresh_token_ttl)
                .with_production(production);

            api::new(port, dsn, config).await?;
        }
    }

    Ok(())
}
