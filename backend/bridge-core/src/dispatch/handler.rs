use crate::dispatch::args::{Arg, FromArg, Signature};
use crate::dispatch::reply::IntoReply;
use crate::dispatch::{CallFuture, CallOutcome};
use crate::error::{BindingError, CallError};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Results a binding may declare: none, a value, an error, or value and error.
pub const MAX_RESULTS: usize = 2;

/// An async function usable as a binding.
///
/// Implemented for every `Fn(A1, .., An) -> impl Future<Output = R>` with up to
/// six parameters, where each `Ai` is [`FromArg`] and `R` is [`IntoReply`].
/// `Params` only disambiguates the arities.
pub trait Handler<Params>: Clone + Send + Sync + 'static {
    fn signature(&self) -> Signature;

    fn invoke(&self, args: Vec<Arg>) -> CallFuture;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoReply,
            $($ty: FromArg,)*
        {
            fn signature(&self) -> Signature {
                Signature::new(vec![$(<$ty as FromArg>::KIND),*], R::RESULTS)
            }

            fn invoke(&self, args: Vec<Arg>) -> CallFuture {
                let handler = self.clone();
                let arity = <Self as Handler<($($ty,)*)>>::signature(self).arity();
                Box::pin(async move {
                    let actual = args.len();
                    let mut args = args.into_iter().enumerate();
                    $(
                        let $ty = match args.next() {
                            Some((position, arg)) => <$ty as FromArg>::from_arg(position, arg)?,
                            None => return Err(CallError::argument_count(arity, actual)),
                        };
                    )*
                    handler($($ty),*).await.into_reply()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);

type Thunk = Arc<dyn Fn(Vec<Arg>) -> CallFuture + Send + Sync>;

/// A callable registered under a name: its signature plus a type-erased
/// dispatch thunk. Cloning is cheap.
#[derive(Clone)]
pub struct Binding {
    signature: Arc<Signature>,
    thunk: Thunk,
}

impl Binding {
    /// Builds a binding from a typed handler.
    pub fn new<H, P>(handler: H) -> Result<Self, BindingError>
    where
        H: Handler<P>,
    {
        let signature = handler.signature();
        Self::checked(std::any::type_name::<H>(), &signature)?;
        Ok(Self {
            signature: Arc::new(signature),
            thunk: Arc::new(move |args| handler.invoke(args)),
        })
    }

    /// Builds a binding from an explicit descriptor and an untyped thunk.
    ///
    /// The thunk receives arguments already reconstructed according to
    /// `signature` and must produce a single outcome.
    pub fn from_fn<F>(signature: Signature, thunk: F) -> Result<Self, BindingError>
    where
        F: Fn(Vec<Arg>) -> CallFuture + Send + Sync + 'static,
    {
        Self::checked("dynamic binding", &signature)?;
        Ok(Self {
            signature: Arc::new(signature),
            thunk: Arc::new(thunk),
        })
    }

    fn checked(name: &str, signature: &Signature) -> Result<(), BindingError> {
        if signature.results() > MAX_RESULTS {
            return Err(BindingError::too_many_results(name, signature.results()));
        }
        Ok(())
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Runs the binding with already reconstructed arguments.
    pub async fn call(&self, args: Vec<Arg>) -> CallOutcome {
        if args.len() != self.signature.arity() {
            return Err(CallError::argument_count(self.signature.arity(), args.len()));
        }
        (self.thunk)(args).await
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
