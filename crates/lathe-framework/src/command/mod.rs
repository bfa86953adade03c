//! Command routing and argument binding.
//!
//! A [`CommandSpec`] describes one command: the prefixes and names that route
//! a message to it and the arguments bound from the rest of the text. It is
//! turned into a tower service with [`on_command`]:
//!
//! ```rust,ignore
//! let add = CommandSpec::builder()
//!     .prefix("/")
//!     .name("add")
//!     .arg("name", TypeTag::Word)
//!     .arg("age", TypeTag::Int)
//!     .build()?;
//!
//! dispatcher.add(on_command(add).handler(|args: Arguments| async move {
//!     format!("{} is {}", args.get::<String>("name")?, args.get::<i64>("age")?)
//! }));
//! ```
//!
//! # Routing
//!
//! The head of a message must match `prefix + name`, case-insensitively by
//! default. Prefixes and names are matched literally unless added through the
//! `raw_*` builder methods, which take regular-expression fragments. Only the
//! head is anchored; the text after it goes to the argument binder.

mod extractor;
mod layer;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::binder::{
    ArgumentOptions, Arguments, CommandTextArgument, CutterRegistry, TypeTag, bind_arguments,
};
use crate::cutter::CutContext;
use crate::error::{CommandError, CommandResult, RegistrationError, RegistrationResult};

pub use extractor::{BoundCommand, CommandName};
pub use layer::{CommandLayer, CommandService, on_command};

/// A registered command: routing grammar plus declared arguments.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    prefixes: Vec<String>,
    names: Vec<String>,
    raw_prefixes: Vec<String>,
    raw_names: Vec<String>,
    case_sensitive: bool,
    arguments: Vec<CommandTextArgument>,
    routing: Regex,
}

impl CommandSpec {
    pub fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn arguments(&self) -> &[CommandTextArgument] {
        &self.arguments
    }

    /// Returns the compiled routing expression.
    pub fn routing(&self) -> &Regex {
        &self.routing
    }

    /// Replaces every name, raw patterns included, and recompiles the
    /// routing expression. On error the spec is left unchanged.
    pub fn set_names<I, S>(&mut self, names: I) -> RegistrationResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let routing = compile_routing(
            &self.prefixes,
            &self.raw_prefixes,
            &names,
            &[],
            self.case_sensitive,
        )?;
        self.names = names;
        self.raw_names.clear();
        self.routing = routing;
        Ok(())
    }

    /// Replaces every prefix, raw patterns included, and recompiles the
    /// routing expression. On error the spec is left unchanged.
    pub fn set_prefixes<I, S>(&mut self, prefixes: I) -> RegistrationResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        let routing = compile_routing(
            &prefixes,
            &[],
            &self.names,
            &self.raw_names,
            self.case_sensitive,
        )?;
        self.prefixes = prefixes;
        self.raw_prefixes.clear();
        self.routing = routing;
        Ok(())
    }

    /// Matches the command head, returning the text after it.
    pub fn match_head<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.routing
            .find(text)
            .filter(|m| m.start() == 0)
            .map(|m| &text[m.end()..])
    }

    /// Binds the text after the head to the declared arguments.
    pub async fn bind(&self, ctx: &CutContext, remainder: &str) -> CommandResult<Arguments> {
        bind_arguments(&self.arguments, ctx, remainder).await
    }

    /// Routes and binds a whole message text.
    pub async fn route(&self, ctx: &CutContext, text: &str) -> CommandResult<Arguments> {
        let Some(remainder) = self.match_head(text) else {
            return Err(CommandError::NotRouted);
        };
        debug!(command = %self.display_name(), "command routed");
        self.bind(ctx, remainder).await
    }

    /// The canonical head, e.g. `/add`.
    pub fn display_name(&self) -> String {
        let prefix = self
            .prefixes
            .first()
            .or(self.raw_prefixes.first())
            .map_or("", String::as_str);
        let name = self
            .names
            .first()
            .or(self.raw_names.first())
            .map_or("", String::as_str);
        format!("{prefix}{name}")
    }

    /// A one-line synopsis such as `/add <name: a single word> <age: an integer>`.
    pub fn usage(&self) -> String {
        std::iter::once(self.display_name())
            .chain(self.arguments.iter().map(CommandTextArgument::usage))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builds a [`CommandSpec`], resolving argument types eagerly.
#[derive(Debug, Default)]
pub struct CommandBuilder {
    prefixes: Vec<String>,
    names: Vec<String>,
    raw_prefixes: Vec<String>,
    raw_names: Vec<String>,
    case_sensitive: bool,
    registry: Option<CutterRegistry>,
    arguments: Vec<PendingArgument>,
}

#[derive(Debug)]
enum PendingArgument {
    Declared {
        name: String,
        tag: TypeTag,
        options: ArgumentOptions,
    },
    Resolved(CommandTextArgument),
}

impl CommandBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds prefixes given as regular-expression fragments.
    pub fn raw_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw_prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Adds names given as regular-expression fragments.
    pub fn raw_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Matches the head case-sensitively (default: `false`).
    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = enabled;
        self
    }

    /// Resolves named types through `registry` instead of the built-ins.
    pub fn registry(mut self, registry: CutterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Declares an argument with default options.
    pub fn arg(self, name: impl Into<String>, tag: impl Into<TypeTag>) -> Self {
        self.arg_with(name, tag, ArgumentOptions::new())
    }

    /// Declares an argument with options.
    pub fn arg_with(
        mut self,
        name: impl Into<String>,
        tag: impl Into<TypeTag>,
        options: ArgumentOptions,
    ) -> Self {
        self.arguments.push(PendingArgument::Declared {
            name: name.into(),
            tag: tag.into(),
            options,
        });
        self
    }

    /// Adds an already resolved argument.
    pub fn argument(mut self, argument: CommandTextArgument) -> Self {
        self.arguments.push(PendingArgument::Resolved(argument));
        self
    }

    pub fn build(self) -> RegistrationResult<CommandSpec> {
        let registry = self.registry.unwrap_or_default();

        let mut arguments: Vec<CommandTextArgument> = Vec::with_capacity(self.arguments.len());
        for pending in self.arguments {
            let argument = match pending {
                PendingArgument::Declared { name, tag, options } => {
                    CommandTextArgument::resolve(name, &tag, options, &registry)?
                }
                PendingArgument::Resolved(argument) => argument,
            };
            if arguments.iter().any(|a| a.name() == argument.name()) {
                return Err(RegistrationError::DuplicateArgument(argument.name().to_string()));
            }
            arguments.push(argument);
        }

        let routing = compile_routing(
            &self.prefixes,
            &self.raw_prefixes,
            &self.names,
            &self.raw_names,
            self.case_sensitive,
        )?;

        Ok(CommandSpec {
            prefixes: self.prefixes,
            names: self.names,
            raw_prefixes: self.raw_prefixes,
            raw_names: self.raw_names,
            case_sensitive: self.case_sensitive,
            arguments,
            routing,
        })
    }
}

/// Joins literal and raw items into one alternation.
///
/// Literal items are escaped and tried longest first so that `/` never
/// shadows `//`; raw fragments keep their order and follow the literals.
fn alternation(literals: &[String], raw: &[String]) -> String {
    let mut literals: Vec<&String> = literals.iter().collect();
    literals.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));

    let mut items: Vec<String> = literals.into_iter().map(|s| regex::escape(s)).collect();
    items.extend(raw.iter().map(|s| format!("(?:{s})")));

    match items.as_slice() {
        [] => String::new(),
        [single] => single.clone(),
        _ => format!("(?:{})", items.join("|")),
    }
}

fn compile_routing(
    prefixes: &[String],
    raw_prefixes: &[String],
    names: &[String],
    raw_names: &[String],
    case_sensitive: bool,
) -> RegistrationResult<Regex> {
    if prefixes.is_empty() && raw_prefixes.is_empty() && names.is_empty() && raw_names.is_empty()
    {
        return Err(RegistrationError::NoRoute);
    }
    let pattern = format!(
        "^{}{}",
        alternation(prefixes, raw_prefixes),
        alternation(names, raw_names)
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| RegistrationError::invalid_pattern(pattern, e))
}
