use crate::core::token::TransformerToken;
use crate::domain::model::{ContextId, ScopeKey};
use crate::domain::ports::{ServiceContainer, Transformer, TransformerResolver};
use crate::utils::error::{Result, TransformError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

type ScopedFactory = Arc<dyn Fn(ContextId) -> Arc<dyn Transformer> + Send + Sync>;

#[derive(Clone)]
enum Binding {
    Singleton(Arc<dyn Transformer>),
    /// 每個請求範圍建立一次
    Scoped(ScopedFactory),
}

#[derive(Default)]
struct Module {
    bindings: HashMap<TransformerToken, Binding>,
    resolvers: HashMap<TransformerToken, Arc<dyn TransformerResolver>>,
    children: BTreeMap<ScopeKey, Arc<Module>>,
}

impl Module {
    /// 先找自己，再深度優先找子模組
    fn find_binding(&self, token: &TransformerToken) -> Option<&Binding> {
        self.bindings
            .get(token)
            .or_else(|| self.children.values().find_map(|child| child.find_binding(token)))
    }

    fn find_resolver(&self, token: &TransformerToken) -> Option<&Arc<dyn TransformerResolver>> {
        self.resolvers
            .get(token)
            .or_else(|| self.children.values().find_map(|child| child.find_resolver(token)))
    }
}

/// 模組化的記憶體內 DI 容器
///
/// strict 查找只看目前模組；非 strict 查找會在找不到時改搜尋整棵模組樹。
#[derive(Clone)]
pub struct InMemoryContainer {
    root: Arc<Module>,
    current: Arc<Module>,
    path: Vec<ScopeKey>,
    scoped_instances: Arc<Mutex<HashMap<(ContextId, TransformerToken), Arc<dyn Transformer>>>>,
}

impl InMemoryContainer {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    fn lookup(&self, token: &TransformerToken, strict: bool) -> Option<Binding> {
        match self.current.bindings.get(token) {
            Some(binding) => Some(binding.clone()),
            None if strict => None,
            None => self.root.find_binding(token).cloned(),
        }
    }

    /// 目前快取中的 scoped 實例數
    pub fn scoped_instance_count(&self) -> usize {
        self.scoped_instances.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    fn scope_name(&self) -> String {
        if self.path.is_empty() {
            "root".to_string()
        } else {
            self.path.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
        }
    }
}

#[async_trait]
impl ServiceContainer for InMemoryContainer {
    fn get(&self, token: &TransformerToken, strict: bool) -> Result<Option<Arc<dyn Transformer>>> {
        match self.lookup(token, strict) {
            Some(Binding::Singleton(instance)) => Ok(Some(instance)),
            Some(Binding::Scoped(_)) => Err(TransformError::UnscopedResolution {
                token: token.to_string(),
            }),
            None => {
                tracing::debug!("No binding for {} in scope {}", token, self.scope_name());
                Ok(None)
            }
        }
    }

    async fn resolve(
        &self,
        token: &TransformerToken,
        context_id: ContextId,
        strict: bool,
    ) -> Result<Option<Arc<dyn Transformer>>> {
        let factory = match self.lookup(token, strict) {
            Some(Binding::Singleton(instance)) => return Ok(Some(instance)),
            Some(Binding::Scoped(factory)) => factory,
            None => return Ok(None),
        };

        let mut cache = self.scoped_instances.lock().map_err(|_| TransformError::ConfigError {
            message: "scoped instance cache poisoned".to_string(),
        })?;
        let instance = cache
            .entry((context_id, token.clone()))
            .or_insert_with(|| {
                tracing::debug!("Creating {} for context {}", token, context_id.get());
                factory(context_id)
            })
            .clone();
        Ok(Some(instance))
    }

    fn get_resolver(&self, token: &TransformerToken, strict: bool) -> Option<Arc<dyn TransformerResolver>> {
        match self.current.resolvers.get(token) {
            Some(resolver) => Some(resolver.clone()),
            None if strict => None,
            None => self.root.find_resolver(token).cloned(),
        }
    }

    fn select(&self, scope: &ScopeKey) -> Result<Arc<dyn ServiceContainer>> {
        let child = self
            .current
            .children
            .get(scope)
            .ok_or_else(|| TransformError::ScopeNotFound {
                scope: scope.to_string(),
            })?;

        let mut path = self.path.clone();
        path.push(scope.clone());

        Ok(Arc::new(InMemoryContainer {
            root: self.root.clone(),
            current: child.clone(),
            path,
            scoped_instances: self.scoped_instances.clone(),
        }))
    }

    fn release(&self, context_id: ContextId) {
        match self.scoped_instances.lock() {
            Ok(mut cache) => {
                let before = cache.len();
                cache.retain(|(owner, _), _| *owner != context_id);
                tracing::debug!(
                    "Released {} scoped instance(s) for context {}",
                    before - cache.len(),
                    context_id.get()
                );
            }
            Err(_) => tracing::warn!("⚠️ Scoped instance cache poisoned, context {} not released", context_id.get()),
        }
    }
}

#[derive(Default)]
pub struct ContainerBuilder {
    module: Module,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton<T>(mut self, token: impl Into<TransformerToken>, instance: T) -> Self
    where
        T: Transformer + 'static,
    {
        self.module
            .bindings
            .insert(token.into(), Binding::Singleton(Arc::new(instance)));
        self
    }

    pub fn scoped<F>(mut self, token: impl Into<TransformerToken>, factory: F) -> Self
    where
        F: Fn(ContextId) -> Arc<dyn Transformer> + Send + Sync + 'static,
    {
        self.module
            .bindings
            .insert(token.into(), Binding::Scoped(Arc::new(factory)));
        self
    }

    pub fn resolver<R>(mut self, token: impl Into<TransformerToken>, resolver: R) -> Self
    where
        R: TransformerResolver + 'static,
    {
        self.module.resolvers.insert(token.into(), Arc::new(resolver));
        self
    }

    pub fn module(mut self, scope: impl Into<ScopeKey>, child: ContainerBuilder) -> Self {
        self.module.children.insert(scope.into(), Arc::new(child.module));
        self
    }

    pub fn build(self) -> Arc<InMemoryContainer> {
        let root = Arc::new(self.module);
        Arc::new(InMemoryContainer {
            current: root.clone(),
            root,
            path: Vec::new(),
            scoped_instances: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}
