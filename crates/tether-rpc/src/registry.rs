//! Handler registry with a one-way `Open -> Locked` lifecycle.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::checker::TypeChecker;
use crate::codec::Codec;
use crate::error::{ConfigurationError, RemoteError, RpcResult};
use crate::interface::{Capability, MethodDescriptor};
use crate::request::split_method;

type MethodInvoker = Arc<dyn Fn(Vec<Value>, &Codec) -> RpcResult<Value> + Send + Sync>;

/// A method bound to its handler instance
pub struct BoundMethod {
    pub interface: &'static str,
    pub descriptor: MethodDescriptor,
    invoker: MethodInvoker,
}

impl BoundMethod {
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn arity(&self) -> usize {
        self.descriptor.arity()
    }

    pub fn invoke(&self, params: Vec<Value>, codec: &Codec) -> RpcResult<Value> {
        (self.invoker)(params, codec)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("interface", &self.interface)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A registered handler: the union of its interfaces' methods and their rendered signatures.
/// Never changes after construction.
#[derive(Debug)]
pub struct HandlerEntry {
    methods: Vec<BoundMethod>,
    signatures: BTreeMap<String, Vec<String>>,
}

impl HandlerEntry {
    /// Validate every interface and bind its methods to `handler`.
    ///
    /// Interfaces keep the order they are given in, and methods keep their declaration order;
    /// an interface listed twice contributes its methods once.
    pub fn new<H>(
        checker: &dyn TypeChecker,
        handler: Arc<H>,
        capabilities: Vec<Capability<H>>,
    ) -> Result<Self, ConfigurationError>
    where
        H: ?Sized + Send + Sync + 'static,
    {
        if capabilities.is_empty() {
            return Err(ConfigurationError::NoInterfaces);
        }
        for capability in &capabilities {
            let descriptor = capability.descriptor();
            checker.check_interface(descriptor).map_err(|source| {
                ConfigurationError::InvalidInterface {
                    interface: descriptor.name.to_string(),
                    source,
                }
            })?;
        }
        Ok(Self::bind(checker, handler, capabilities))
    }

    // Binding without validation, for interfaces known to be valid.
    pub(crate) fn bind<H>(
        checker: &dyn TypeChecker,
        handler: Arc<H>,
        capabilities: Vec<Capability<H>>,
    ) -> Self
    where
        H: ?Sized + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for capability in capabilities {
            let (descriptor, invoke) = capability.into_parts();
            if !seen.insert(descriptor.name) {
                continue;
            }

            for (index, method) in descriptor.methods.into_iter().enumerate() {
                let handler = Arc::clone(&handler);
                let invoker: MethodInvoker =
                    Arc::new(move |params: Vec<Value>, codec: &Codec| {
                        invoke(handler.as_ref(), index, params, codec)
                    });
                methods.push(BoundMethod {
                    interface: descriptor.name,
                    descriptor: method,
                    invoker,
                });
            }
        }

        let mut signatures: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for method in &methods {
            signatures
                .entry(method.name().to_string())
                .or_default()
                .push(method.descriptor.signature(checker));
        }

        Self {
            methods,
            signatures,
        }
    }

    /// First method with this name taking exactly `arity` parameters.
    pub fn resolve(&self, name: &str, arity: usize) -> Option<&BoundMethod> {
        self.methods
            .iter()
            .find(|method| method.name() == name && method.arity() == arity)
    }

    pub fn methods(&self) -> &[BoundMethod] {
        &self.methods
    }

    /// Rendered signatures grouped by method name, sorted by name
    pub fn signatures(&self) -> &BTreeMap<String, Vec<String>> {
        &self.signatures
    }
}

pub type HandlerTable = HashMap<String, Arc<HandlerEntry>>;

enum Lifecycle {
    Open(HandlerTable),
    Locked(Arc<HandlerTable>),
}

/// Handler name to registration, open for registration until the first dispatch.
pub struct Registry {
    lifecycle: RwLock<Lifecycle>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            lifecycle: RwLock::new(Lifecycle::Open(HashMap::new())),
        }
    }

    pub fn insert(&self, name: &str, entry: HandlerEntry) -> Result<(), ConfigurationError> {
        let mut lifecycle = self.lifecycle.write();
        let Lifecycle::Open(table) = &mut *lifecycle else {
            return Err(ConfigurationError::Locked);
        };

        match table.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ConfigurationError::DuplicateHandler(name.to_string())),
            Entry::Vacant(slot) => {
                debug!(
                    handler = name,
                    methods = entry.methods.len(),
                    "registered handler"
                );
                slot.insert(Arc::new(entry));
                Ok(())
            }
        }
    }

    // Registration that cannot collide, used for built-in handlers of a fresh registry.
    pub(crate) fn install(&self, name: &str, entry: HandlerEntry) {
        if let Lifecycle::Open(table) = &mut *self.lifecycle.write() {
            table.insert(name.to_string(), Arc::new(entry));
        }
    }

    /// Freeze the table. The first call performs the transition, later calls return the
    /// same frozen table.
    pub fn lock(&self) -> Arc<HandlerTable> {
        if let Lifecycle::Locked(table) = &*self.lifecycle.read() {
            return Arc::clone(table);
        }

        let mut lifecycle = self.lifecycle.write();
        let table = match &mut *lifecycle {
            Lifecycle::Locked(table) => return Arc::clone(table),
            Lifecycle::Open(table) => Arc::new(std::mem::take(table)),
        };
        info!("locking executor to avoid modification");
        *lifecycle = Lifecycle::Locked(Arc::clone(&table));
        table
    }

    pub fn is_locked(&self) -> bool {
        matches!(&*self.lifecycle.read(), Lifecycle::Locked(_))
    }

    fn with_table<R>(&self, f: impl FnOnce(&HandlerTable) -> R) -> R {
        match &*self.lifecycle.read() {
            Lifecycle::Open(table) => f(table),
            Lifecycle::Locked(table) => f(table.as_ref()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<HandlerEntry>> {
        self.with_table(|table| table.get(name).cloned())
    }

    /// Every `"<handler>.<method>"`, sorted.
    pub fn list_methods(&self) -> Vec<String> {
        self.with_table(|table| {
            table
                .iter()
                .flat_map(|(name, entry)| {
                    entry
                        .signatures
                        .keys()
                        .map(move |method| format!("{name}.{method}"))
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    /// Sorted, distinct signatures of `"<handler>.<method>"`.
    pub fn method_signature(&self, method: &str) -> Result<Vec<String>, RemoteError> {
        let (handler, name) = split_method(method)
            .ok_or_else(|| RemoteError::invalid_params("invalid method name"))?;

        self.with_table(|table| {
            table
                .get(handler)
                .and_then(|entry| entry.signatures.get(name))
                .map(|signatures| {
                    signatures
                        .iter()
                        .cloned()
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect()
                })
                .ok_or_else(|| RemoteError::invalid_params("no such method exists"))
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::SerdeTypeChecker;
    use crate::interface::{InterfaceDescriptor, RpcInterface, Serve};
    use crate::typeinfo::RpcType;
    use serde_json::json;

    struct Counter;

    trait Counting {}

    impl Counting for Counter {}

    impl RpcInterface for dyn Counting {
        fn descriptor() -> InterfaceDescriptor {
            InterfaceDescriptor::new(
                "Counting",
                vec![
                    MethodDescriptor::new("count", vec![], u32::type_info),
                    MethodDescriptor::new("count", vec![u32::type_info], u32::type_info),
                    MethodDescriptor::new("count", vec![String::type_info], u32::type_info),
                ],
            )
        }
    }

    impl<H: Counting + ?Sized> Serve<H> for dyn Counting {
        fn invoke(
            _handler: &H,
            method: usize,
            _params: Vec<Value>,
            _codec: &Codec,
        ) -> RpcResult<Value> {
            Ok(json!(method))
        }
    }

    trait Untyped {}

    impl RpcInterface for dyn Untyped {
        fn descriptor() -> InterfaceDescriptor {
            InterfaceDescriptor::new(
                "Untyped",
                vec![MethodDescriptor::new(
                    "echo",
                    vec![Value::type_info],
                    Value::type_info,
                )],
            )
        }
    }

    impl<H: ?Sized> Serve<H> for dyn Untyped {
        fn invoke(_: &H, _: usize, _: Vec<Value>, _: &Codec) -> RpcResult<Value> {
            Ok(Value::Null)
        }
    }

    fn entry() -> HandlerEntry {
        HandlerEntry::new(
            &SerdeTypeChecker::new(),
            Arc::new(Counter),
            vec![
                Capability::of::<dyn Counting>(),
                Capability::of::<dyn Counting>(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_entry_dedupes_interfaces() {
        let entry = entry();
        assert_eq!(entry.methods().len(), 3);
        assert_eq!(
            entry.signatures().get("count"),
            Some(&vec![
                "int".to_string(),
                "int,int".to_string(),
                "int,string".to_string()
            ])
        );
    }

    #[test]
    fn test_resolution_by_arity_takes_first() {
        let entry = entry();
        let codec = Codec::default();
        let method = entry.resolve("count", 1).unwrap();
        assert_eq!(method.invoke(vec![json!(1)], &codec).unwrap(), json!(1));
        assert!(entry.resolve("count", 2).is_none());
        assert!(entry.resolve("missing", 0).is_none());
    }

    #[test]
    fn test_entry_requires_interfaces() {
        let result =
            HandlerEntry::new(&SerdeTypeChecker::new(), Arc::new(Counter), Vec::new());
        assert!(matches!(result, Err(ConfigurationError::NoInterfaces)));
    }

    #[test]
    fn test_entry_rejects_invalid_interface() {
        let result = HandlerEntry::new(
            &SerdeTypeChecker::new(),
            Arc::new(Counter),
            vec![Capability::of::<dyn Untyped>()],
        );
        match result {
            Err(ConfigurationError::InvalidInterface { interface, source }) => {
                assert_eq!(interface, "Untyped");
                assert!(matches!(source, crate::error::TypeError::InvalidReturn { .. }));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let registry = Registry::new();
        registry.insert("counter", entry()).unwrap();
        assert!(matches!(
            registry.insert("counter", entry()),
            Err(ConfigurationError::DuplicateHandler(name)) if name == "counter"
        ));
        assert_eq!(registry.get("counter").unwrap().methods().len(), 3);
    }

    #[test]
    fn test_lock_is_permanent() {
        let registry = Registry::new();
        registry.insert("a", entry()).unwrap();
        assert!(!registry.is_locked());

        let table = registry.lock();
        assert!(registry.is_locked());
        assert!(table.contains_key("a"));
        assert!(Arc::ptr_eq(&table, &registry.lock()));
        assert!(matches!(
            registry.insert("b", entry()),
            Err(ConfigurationError::Locked)
        ));
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_introspection_queries() {
        let registry = Registry::new();
        registry.insert("b", entry()).unwrap();
        registry.insert("a", entry()).unwrap();
        assert_eq!(registry.list_methods(), vec!["a.count", "b.count"]);
        assert_eq!(
            registry.method_signature("a.count").unwrap(),
            vec!["int", "int,int", "int,string"]
        );
        assert_eq!(
            registry.method_signature("a").unwrap_err(),
            RemoteError::invalid_params("invalid method name")
        );
        assert_eq!(
            registry.method_signature("c.count").unwrap_err(),
            RemoteError::invalid_params("no such method exists")
        );
        assert!(registry.method_signature("a.missing").is_err());
    }
}
