use crate::binding::names::exported_name;
use crate::dispatch::{Binding, Handler, IntoReply};
use crate::error::BindingError;

use std::collections::BTreeMap;
use std::sync::Arc;

/// A value exposing its methods and fields as bindings.
///
/// Members are listed by their Rust-side identifier. Only identifiers
/// starting with an uppercase letter are exported, under their lower-camel
/// form; the rest are skipped.
///
/// ```ignore
/// struct Counter { hits: AtomicU64 }
///
/// impl Aggregate for Counter {
///     fn export(self: Arc<Self>, members: &mut Members) {
///         let this = Arc::clone(&self);
///         members.method("Hit", move || {
///             let this = Arc::clone(&this);
///             async move { this.hits.fetch_add(1, Ordering::SeqCst) + 1 }
///         });
///         members.field("Name", || "counter");
///     }
/// }
/// ```
pub trait Aggregate: Send + Sync + 'static {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn export(self: Arc<Self>, members: &mut Members);
}

/// Collector handed to [`Aggregate::export`].
pub struct Members {
    type_name: &'static str,
    exported: BTreeMap<String, Binding>,
    errors: Vec<BindingError>,
}

impl Members {
    pub(crate) fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            exported: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Exposes a method.
    pub fn method<H, P>(&mut self, ident: &str, handler: H) -> &mut Self
    where
        H: Handler<P>,
    {
        let Some(name) = exported_name(ident) else {
            return self;
        };
        match Binding::new(handler) {
            Ok(binding) => {
                self.exported.insert(name, binding);
            }
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Exposes a field as a zero-argument getter.
    pub fn field<T, F>(&mut self, ident: &str, getter: F) -> &mut Self
    where
        F: Fn() -> T + Clone + Send + Sync + 'static,
        T: IntoReply,
    {
        self.method(ident, move || {
            let value = getter();
            async move { value }
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn finish(self) -> Result<BTreeMap<String, Binding>, BindingError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        if self.exported.is_empty() {
            return Err(BindingError::empty_names(format!(
                "{} exports no members",
                self.type_name
            )));
        }
        Ok(self.exported)
    }
}
