//! OpenDAL Operator factory for the catalog backends

use anyhow::{Context, Result};
use opendal::Operator;
use ordrfs_core::config::{expand_tilde, CatalogBackend, CatalogConfig};

/// Build an OpenDAL Operator for the configured catalog backend.
///
/// If `enforce_tls` is true and an `http` backend points at a plaintext
/// endpoint, this returns an error. Otherwise a warning is logged.
pub fn build_operator(cfg: &CatalogConfig) -> Result<Operator> {
    match cfg.backend {
        CatalogBackend::Http => {
            if cfg.endpoint.starts_with("http://") {
                if cfg.enforce_tls {
                    anyhow::bail!(
                        "catalog endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                         Use an HTTPS endpoint or set catalog.enforce_tls = false.",
                        cfg.endpoint
                    );
                }
                tracing::warn!(
                    endpoint = %cfg.endpoint,
                    "catalog endpoint uses plaintext HTTP; account details travel unencrypted"
                );
            }
            finish(opendal::services::Http::default().endpoint(&cfg.endpoint))
        }
        CatalogBackend::Fs => {
            let root = expand_tilde(&cfg.root);
            let root = root
                .to_str()
                .with_context(|| format!("catalog root is not UTF-8: {}", root.display()))?;
            finish(opendal::services::Fs::default().root(root))
        }
        CatalogBackend::Memory => finish(opendal::services::Memory::default()),
    }
}

fn finish<B: opendal::Builder>(builder: B) -> Result<Operator> {
    let op = Operator::new(builder)
        .context("creating OpenDAL catalog operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .finish();
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_operator() {
        let cfg = CatalogConfig {
            backend: CatalogBackend::Memory,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_http_warning_without_enforce_tls() {
        let cfg = CatalogConfig {
            backend: CatalogBackend::Http,
            endpoint: "http://localhost:8080".into(),
            enforce_tls: false,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_http_enforce_tls_rejects_plaintext() {
        let cfg = CatalogConfig {
            backend: CatalogBackend::Http,
            endpoint: "http://insecure:8080".into(),
            enforce_tls: true,
            ..Default::default()
        };
        let result = build_operator(&cfg);
        assert!(result.is_err(), "HTTP + enforce_tls must fail");
        assert!(result.unwrap_err().to_string().contains("enforce_tls"));
    }

    #[test]
    fn test_https_with_enforce_tls() {
        let cfg = CatalogConfig {
            backend: CatalogBackend::Http,
            endpoint: "https://catalog.example.com".into(),
            enforce_tls: true,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }
}
