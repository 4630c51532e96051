pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        secret: String,
        access_token_ttl: String,
        refresh_token_ttl: String,
        frontend_url: String,
        production: bool,
    },
}
