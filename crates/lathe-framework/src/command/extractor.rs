use std::ops::Deref;

use crate::binder::Arguments;
use crate::context::LatheContext;
use crate::error::{ExtractError, ExtractResult};
use crate::extractor::FromContext;

/// What the command layer leaves in the context after a successful bind.
#[derive(Debug, Clone)]
pub struct BoundCommand {
    /// Display name of the routed command.
    pub name: String,
    pub arguments: Arguments,
}

/// Extracts the bound arguments of the routed command.
///
/// Requires the handler to sit behind [`on_command`](super::on_command).
///
/// ```rust,ignore
/// async fn add(args: Arguments) -> String {
///     format!("hello, {}", args.get::<String>("name").unwrap_or_default())
/// }
/// ```
impl FromContext for Arguments {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self> {
        ctx.bound()
            .map(|bound| bound.arguments)
            .ok_or(ExtractError::NotACommand)
    }
}

/// The display name of the routed command, e.g. `/add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandName(pub String);

impl Deref for CommandName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for CommandName {
    fn from_context(ctx: &LatheContext) -> ExtractResult<Self> {
        ctx.bound()
            .map(|bound| CommandName(bound.name))
            .ok_or(ExtractError::NotACommand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutter::Value;
    use crate::testing::{MockApi, context};

    #[test]
    fn test_arguments_require_bound_command() {
        let ctx = context(&MockApi::new(), "/x");
        assert!(matches!(
            Arguments::from_context(&ctx),
            Err(ExtractError::NotACommand)
        ));

        let mut arguments = Arguments::new();
        arguments.insert("n", Value::Int(1));
        ctx.set_bound(BoundCommand {
            name: "/x".into(),
            arguments,
        });
        assert_eq!(Arguments::from_context(&ctx).unwrap().get::<i64>("n").unwrap(), 1);
        assert_eq!(&*CommandName::from_context(&ctx).unwrap(), "/x");
    }
}
