//! Pipeline Configuration
//!
//! Options that change how a template is lowered. Loadable from JSON so the
//! surrounding driver can pass them through unchanged.

use serde::{Deserialize, Serialize};

use crate::constant_pool::POOL_INCLUSION_LENGTH_THRESHOLD_FOR_STRINGS;
use crate::error::{CompilerError, Result};
use crate::template::pipeline::ir::enums::CompatibilityMode;
use crate::template::pipeline::src::compilation::TemplateCompilationMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Whether output must match the legacy template definition builder byte for byte.
    pub compatibility_mode: CompatibilityMode,
    /// Full compilation, or DOM-only output without directive matching support.
    pub compilation_mode: TemplateCompilationMode,
    /// Strings at least this long are hoisted into the constant pool.
    pub pool_string_threshold: usize,
    /// Prefix view function names with the component name.
    pub component_name_in_fn: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            compatibility_mode: CompatibilityMode::TemplateDefinitionBuilder,
            compilation_mode: TemplateCompilationMode::Full,
            pool_string_threshold: POOL_INCLUSION_LENGTH_THRESHOLD_FOR_STRINGS,
            component_name_in_fn: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<PipelineConfig> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| CompilerError::Config(e.to_string()))?;
        if config.pool_string_threshold == 0 {
            return Err(CompilerError::Config(
                "poolStringThreshold must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = PipelineConfig::from_json(r#"{"compatibilityMode": "Full"}"#).unwrap();
        assert_eq!(config.compatibility_mode, CompatibilityMode::Full);
        assert_eq!(config.pool_string_threshold, 50);
        assert!(config.component_name_in_fn);
    }

    #[test]
    fn rejects_zero_threshold() {
        let err = PipelineConfig::from_json(r#"{"poolStringThreshold": 0}"#).unwrap_err();
        assert!(matches!(err, CompilerError::Config(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(PipelineConfig::from_json("{").is_err());
    }
}
