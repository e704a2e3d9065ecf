use middleware::extractor::ExtractionMiddleware;

pub mod middleware {
    pub mod extractor;
}

/// Verifies the session token of every request with `secret`.
pub fn middleware(secret: &str) -> ExtractionMiddleware {
    ExtractionMiddleware::new(secret.to_string())
}
