use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

/// A value produced by evaluating a config source.
///
/// Secondary sources may return anything, so the value is type-erased.
/// Clones share the same allocation; [`ptr_eq`](Self::ptr_eq) tells whether two
/// handles came from the same evaluation.
#[derive(Clone)]
pub struct ConfigValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ConfigValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: any::type_name::<T>(),
        }
    }

    /// Returns the value as `T`, or `None` if it holds another type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Name of the concrete type held, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConfigValue").field(&self.type_name).finish()
    }
}
