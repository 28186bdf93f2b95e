use serde::{Deserialize, Serialize};

use crate::context::ProcessingContext;
use crate::error::{Error, Result};

/// Where an operation actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Gpu,
}

/// Caller's choice of backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// GPU when available and supported by the operation, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

/// Resolves the backend for one invocation.
///
/// * `gpu_supported` - whether the operation has a GPU implementation for
///   the current parameters (element type, interpolation order, ...)
/// * `op_name` - used in error messages and logs
pub fn select_backend(
    ctx: &ProcessingContext,
    preference: BackendPreference,
    gpu_supported: bool,
    op_name: &str,
) -> Result<Backend> {
    let backend = match preference {
        BackendPreference::Cpu => Backend::Cpu,
        BackendPreference::Gpu => {
            if !ctx.has_gpu() {
                return Err(Error::NoGpuContext);
            }
            if !gpu_supported {
                return Err(Error::Gpu(format!(
                    "{} has no GPU implementation for the requested parameters",
                    op_name
                )));
            }
            Backend::Gpu
        }
        BackendPreference::Auto => {
            if ctx.has_gpu() && gpu_supported {
                Backend::Gpu
            } else {
                Backend::Cpu
            }
        }
    };

    tracing::debug!(op = op_name, ?preference, ?backend, "backend selected");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_without_gpu_uses_cpu() {
        let ctx = ProcessingContext::cpu_only();
        let backend = select_backend(&ctx, BackendPreference::Auto, true, "op").unwrap();
        assert_eq!(backend, Backend::Cpu);
    }

    #[test]
    fn test_forced_cpu() {
        let ctx = ProcessingContext::cpu_only();
        let backend = select_backend(&ctx, BackendPreference::Cpu, true, "op").unwrap();
        assert_eq!(backend, Backend::Cpu);
    }

    #[test]
    fn test_forced_gpu_without_gpu_fails() {
        let ctx = ProcessingContext::cpu_only();
        let err = select_backend(&ctx, BackendPreference::Gpu, true, "op").unwrap_err();
        assert!(matches!(err, Error::NoGpuContext));
    }

    #[test]
    fn test_preference_deserializes_lowercase() {
        let pref: BackendPreference = serde_json::from_str("\"gpu\"").unwrap();
        assert_eq!(pref, BackendPreference::Gpu);
        assert_eq!(BackendPreference::default(), BackendPreference::Auto);
    }
}
