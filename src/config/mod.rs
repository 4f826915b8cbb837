use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Base URL of the payment-initiation gateway; the STK-push route hangs
    /// off it. Defaults to this server's own mock endpoint.
    pub stk_base_url: String,
    pub currency: String,
}

impl AppConfig {
    /// Environment-driven configuration; every key falls back to a local
    /// development default.
    pub fn from_env() -> Self {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let stk_base_url = env::var("STK_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}/api/payments"));
        let currency = env::var("CURRENCY").unwrap_or_else(|_| "KES".to_string());

        Self {
            server: ServerConfig { host, port },
            payments: PaymentsConfig {
                stk_base_url,
                currency,
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
