//! Interface to the external code-analysis service.
//!
//! The engine never talks to the analysis service directly; actions and
//! config responses go through this trait so tests can substitute an
//! in-process double.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Analysis kinds the detached service accepts
const SUPPORTED_ANALYSES: [&str; 4] = ["diagnostics", "hover", "completion", "references"];

/// Operations the scheduler and dispatcher need from the analysis side
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Fetch current diagnostics for a file-like target
    async fn fetch_diagnostics(&self, target: &str) -> Result<Vec<Value>>;

    /// Forward a configuration-change request; fire-and-forget beyond
    /// the action timeout
    async fn configure(&self, params: Value) -> Result<()>;

    /// Re-request a named analysis for a file
    async fn request_analysis(&self, file: &str, kind: &str) -> Result<()>;

    /// Whether the service understands an analysis kind
    fn supports_analysis(&self, kind: &str) -> bool;
}

/// Stand-in used when no analysis service is attached (standalone runs).
///
/// Requests are logged and succeed with empty results, so the rest of
/// the pipeline behaves identically to an attached run.
#[derive(Debug, Default)]
pub struct NullAnalysisService;

#[async_trait]
impl AnalysisService for NullAnalysisService {
    async fn fetch_diagnostics(&self, target: &str) -> Result<Vec<Value>> {
        info!(target = %target, "No analysis service attached, returning empty diagnostics");
        Ok(Vec::new())
    }

    async fn configure(&self, params: Value) -> Result<()> {
        info!(params = %params, "No analysis service attached, dropping configure request");
        Ok(())
    }

    async fn request_analysis(&self, file: &str, kind: &str) -> Result<()> {
        info!(file = %file, kind = %kind, "No analysis service attached, dropping analysis request");
        Ok(())
    }

    fn supports_analysis(&self, kind: &str) -> bool {
        SUPPORTED_ANALYSES.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_service_accepts_everything() {
        let service = NullAnalysisService;
        assert!(service.fetch_diagnostics("src/main.rs").await.unwrap().is_empty());
        assert!(service.configure(serde_json::json!({})).await.is_ok());
        assert!(service.supports_analysis("diagnostics"));
        assert!(!service.supports_analysis("clairvoyance"));
    }
}
