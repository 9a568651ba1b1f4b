//! Configuration types for executors and invokers

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::checker::{AllowAllTypeChecker, SerdeTypeChecker, TypeChecker};

/// Default nesting limit when encoding values
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Which validator guards registration and binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeChecking {
    /// Only types serde can round-trip are accepted
    #[default]
    Strict,
    /// Validation is bypassed entirely
    AllowAll,
}

impl TypeChecking {
    pub fn checker(self) -> Arc<dyn TypeChecker> {
        match self {
            TypeChecking::Strict => Arc::new(SerdeTypeChecker::new()),
            TypeChecking::AllowAll => Arc::new(AllowAllTypeChecker::new()),
        }
    }
}

/// Server side configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub type_checking: TypeChecking,

    /// Maximum nesting of an encoded result before the call fails
    pub max_result_depth: usize,

    /// Attach the cause chain as `data` on wrapped handler failures
    pub include_diagnostics: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            type_checking: TypeChecking::Strict,
            max_result_depth: DEFAULT_MAX_DEPTH,
            include_diagnostics: true,
        }
    }
}

impl ExecutorConfig {
    pub fn with_type_checking(mut self, type_checking: TypeChecking) -> Self {
        self.type_checking = type_checking;
        self
    }

    pub fn with_max_result_depth(mut self, max_result_depth: usize) -> Self {
        self.max_result_depth = max_result_depth;
        self
    }

    pub fn with_diagnostics(mut self, include_diagnostics: bool) -> Self {
        self.include_diagnostics = include_diagnostics;
        self
    }
}

/// Client side configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    pub type_checking: TypeChecking,

    /// Maximum nesting of an encoded parameter
    pub max_param_depth: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            type_checking: TypeChecking::Strict,
            max_param_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl InvokerConfig {
    pub fn with_type_checking(mut self, type_checking: TypeChecking) -> Self {
        self.type_checking = type_checking;
        self
    }

    pub fn with_max_param_depth(mut self, max_param_depth: usize) -> Self {
        self.max_param_depth = max_param_depth;
        self
    }
}
