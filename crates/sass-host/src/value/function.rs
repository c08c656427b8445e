use super::Value;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A callback that computes a function result without suspending, for use
/// with the synchronous compiler.
pub type FunctionCallback = Arc<dyn Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync>;

/// A callback that may suspend, for use with the asynchronous compiler.
pub type AsyncFunctionCallback =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// A first-class SassScript function value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SassFunction {
    /// Defined in the stylesheet. The ID is only meaningful within the
    /// compilation that produced it, and the value can only be passed back
    /// to that compilation.
    Compiler { id: u32 },
    /// Defined by the host; callable from the stylesheet once returned
    /// from a custom function.
    Host(HostFunction),
}

impl From<SassFunction> for Value {
    fn from(function: SassFunction) -> Self {
        Value::Function(function)
    }
}

/// A host-defined function: a Sass signature plus the callback to run.
///
/// The same type registers compilation-global functions (via
/// `Options::functions`) and builds anonymous function values returned
/// from other functions.
#[derive(Clone)]
pub struct HostFunction {
    signature: String,
    callback: HostCallback,
}

/// The two callback flavors a host function may carry. The synchronous
/// compiler refuses to invoke `Async` callbacks.
#[derive(Clone)]
pub enum HostCallback {
    Sync(FunctionCallback),
    Async(AsyncFunctionCallback),
}

impl HostFunction {
    /// A function whose callback returns its value directly.
    pub fn new<F>(signature: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature: signature.into(),
            callback: HostCallback::Sync(Arc::new(callback)),
        }
    }

    /// A function whose callback returns a future of its value.
    pub fn new_async<F, Fut>(signature: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let callback: AsyncFunctionCallback = Arc::new(move |args| callback(args).boxed());
        Self {
            signature: signature.into(),
            callback: HostCallback::Async(callback),
        }
    }

    /// The Sass signature, e.g. `invert($color, $weight: 100%)`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub(crate) fn callback(&self) -> &HostCallback {
        &self.callback
    }

    // Identity of the callback allocation. Two clones of one HostFunction
    // are the same function; two functions built from identical closures
    // are not.
    pub(crate) fn callback_identity(&self) -> usize {
        match &self.callback {
            HostCallback::Sync(f) => Arc::as_ptr(f) as *const () as usize,
            HostCallback::Async(f) => Arc::as_ptr(f) as *const () as usize,
        }
    }
}

impl std::fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature && self.callback_identity() == other.callback_identity()
    }
}

impl Eq for HostFunction {}

impl Hash for HostFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
        self.callback_identity().hash(state);
    }
}

/// A first-class mixin defined in the stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SassMixin {
    id: u32,
}

impl SassMixin {
    pub(crate) fn new(id: u32) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}
