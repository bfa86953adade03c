use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::LatheContext;
use crate::error::ExtractResult;
use crate::extractor::FromContext;

/// A function whose parameters can all be extracted from the context.
///
/// Implemented for `async fn`s and closures returning futures with up to
/// twelve [`FromContext`] parameters. `T` is the tuple of parameter types and
/// only disambiguates the blanket implementations.
pub trait FromCtxFn<R, T>: Clone + Send + Sync + 'static {
    /// Extracts the parameters and calls the function.
    ///
    /// Resolves to `Err` without calling it when an extraction fails.
    fn call(self, ctx: Arc<LatheContext>) -> BoxFuture<'static, ExtractResult<R>>;
}

macro_rules! impl_from_ctx_fn {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, R, $($ty,)*> FromCtxFn<R, ($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: Send + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            fn call(self, ctx: Arc<LatheContext>) -> BoxFuture<'static, ExtractResult<R>> {
                $(
                    let $ty = match $ty::from_context(&ctx) {
                        Ok(value) => value,
                        Err(err) => return futures::future::ready(Err(err)).boxed(),
                    };
                )*
                let fut = (self)($($ty,)*);
                async move { Ok(fut.await) }.boxed()
            }
        }
    };
}

impl_from_ctx_fn!();
impl_from_ctx_fn!(T1);
impl_from_ctx_fn!(T1, T2);
impl_from_ctx_fn!(T1, T2, T3);
impl_from_ctx_fn!(T1, T2, T3, T4);
impl_from_ctx_fn!(T1, T2, T3, T4, T5);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6, T7);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_from_ctx_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::error::ExtractError;
    use crate::extractor::Event;
    use crate::testing::{MockApi, context};

    #[tokio::test]
    async fn test_extracts_parameters() {
        let ctx = context(&MockApi::new(), "hi");
        let f = |event: Event| async move { event.text.clone() };
        assert_eq!(FromCtxFn::call(f, ctx).await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_failed_extraction_skips_call() {
        let ctx = context(&MockApi::new(), "hi");
        let f = |_args: Arguments| async move {};
        let result: ExtractResult<()> = FromCtxFn::call(f, ctx).await;
        assert!(matches!(result, Err(ExtractError::NotACommand)));
    }
}
