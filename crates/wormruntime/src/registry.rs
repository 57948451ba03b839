use std::collections::HashMap;
use std::sync::Arc;
use wormcore::{EngineError, Value};

/// Values per port name for one branch
pub type PortValues = HashMap<String, Vec<Value>>;

/// A pure computation step inside a sub-graph
pub trait Operator: Send + Sync {
    /// Type identifier (e.g. "math.add")
    fn op_type(&self) -> &str;

    fn input_ports(&self) -> &[&'static str];

    fn output_ports(&self) -> &[&'static str];

    /// Evaluate one branch
    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String>;
}

/// Factory trait for creating operator instances
pub trait OperatorFactory: Send + Sync {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError>;

    fn op_type(&self) -> &str;

    fn metadata(&self) -> OperatorMetadata {
        OperatorMetadata::default()
    }
}

#[derive(Debug, Clone)]
pub struct OperatorMetadata {
    pub description: String,
    pub category: String,
}

impl Default for OperatorMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Registry of available operator types
pub struct OperatorRegistry {
    factories: HashMap<String, Arc<dyn OperatorFactory>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in operator
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn OperatorFactory>) {
        let op_type = factory.op_type().to_string();
        tracing::debug!("Registering operator: {}", op_type);
        self.factories.insert(op_type, factory);
    }

    pub fn create(
        &self,
        op_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn Operator>, EngineError> {
        let factory = self
            .factories
            .get(op_type)
            .ok_or_else(|| EngineError::UnknownOperator(op_type.to_string()))?;
        factory.create(config)
    }

    pub fn list_op_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn get_metadata(&self, op_type: &str) -> Option<OperatorMetadata> {
        self.factories.get(op_type).map(|f| f.metadata())
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
