// Reporter registry - resolves definitions into constructed reporters

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ConfigurationError;
use crate::report::{ConsoleMode, JunitReporter, Reporter, StreamingJsonReporter};
use crate::stateless::{Encoding, StatelessListenerFactory, TracingConsoleLogger};

/// A constructor-style parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Bool(_) => ParamType::Bool,
            Self::Number(_) => ParamType::Number,
            Self::Text(_) => ParamType::Text,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Parameter type used for constructor signature matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Text,
    Number,
    Bool,
}

impl ParamType {
    /// An absent parameter is typed as text
    pub fn of(param: Option<&ParamValue>) -> Self {
        param.map_or(Self::Text, ParamValue::param_type)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

fn describe_signature(types: &[ParamType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Names a reporter variant plus the parameters to construct it with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterDefinition {
    pub identifier: String,
    #[serde(default)]
    pub params: Vec<Option<ParamValue>>,
}

impl ReporterDefinition {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, value: impl Into<ParamValue>) -> Self {
        self.params.push(Some(value.into()));
        self
    }

    pub fn null_param(mut self) -> Self {
        self.params.push(None);
        self
    }

    /// Parameter types after null inference
    pub fn signature(&self) -> Vec<ParamType> {
        self.params.iter().map(|p| ParamType::of(p.as_ref())).collect()
    }
}

/// Positional arguments handed to a reporter constructor
#[derive(Debug, Clone, Copy)]
pub struct ConstructorArgs<'a> {
    params: &'a [Option<ParamValue>],
}

impl<'a> ConstructorArgs<'a> {
    pub fn new(params: &'a [Option<ParamValue>]) -> Self {
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a ParamValue> {
        self.params.get(index).and_then(Option::as_ref)
    }

    /// Text parameter at `index`; `None` when absent
    pub fn text(&self, index: usize) -> Option<&'a str> {
        match self.get(index) {
            Some(ParamValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, index: usize) -> Option<i64> {
        match self.get(index) {
            Some(ParamValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, index: usize) -> Option<bool> {
        match self.get(index) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Text parameter that must be present
    pub fn required_text(&self, index: usize, what: &str) -> anyhow::Result<&'a str> {
        self.text(index)
            .ok_or_else(|| anyhow!("{} must not be null", what))
    }
}

type BuildFn =
    dyn Fn(&ConstructorArgs<'_>) -> anyhow::Result<Box<dyn Reporter>> + Send + Sync;

/// One overload of a reporter variant
#[derive(Clone)]
pub struct ReporterConstructor {
    signature: Vec<ParamType>,
    build: Arc<BuildFn>,
}

impl ReporterConstructor {
    pub fn signature(&self) -> &[ParamType] {
        &self.signature
    }
}

impl fmt::Debug for ReporterConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConstructor")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Turns an identifier plus parameters into a reporter
pub trait ReporterResolver: Send + Sync {
    fn resolve(
        &self,
        identifier: &str,
        params: &[Option<ParamValue>],
    ) -> Result<Box<dyn Reporter>, ConfigurationError>;
}

/// Registry of reporter variants keyed by identifier.
///
/// Each identifier may carry several constructor overloads. Resolution picks
/// the first overload, in registration order, whose signature equals the
/// parameter types of the definition.
pub struct ReporterRegistry {
    constructors: RwLock<HashMap<String, Vec<ReporterConstructor>>>,
}

impl ReporterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the built-in `console`, `file`, `junit` and `json-stream` variants
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&self) {
        use ParamType::Text;

        let stateless = StatelessListenerFactory::default();

        let factory = stateless.clone();
        self.register("console", &[], move |_| {
            Ok(Box::new(
                factory.create_console_listener(Arc::new(TracingConsoleLogger)),
            ))
        });

        let factory = stateless.clone();
        self.register("console", &[Text], move |args| {
            let mode = match args.text(0) {
                Some(mode) => mode.parse::<ConsoleMode>()?,
                None => factory.console_mode(),
            };
            let factory = factory.clone().with_console_mode(mode);
            Ok(Box::new(
                factory.create_console_listener(Arc::new(TracingConsoleLogger)),
            ))
        });

        for signature in [vec![Text], vec![Text, Text], vec![Text, Text, Text]] {
            let factory = stateless.clone();
            self.register("file", &signature, move |args| file_listener(&factory, args));
        }

        self.register("junit", &[Text], |args| {
            let directory = args.required_text(0, "reports directory")?;
            Ok(Box::new(JunitReporter::new(directory)))
        });

        self.register("json-stream", &[Text], |args| {
            let reporter = match args.text(0) {
                Some(path) => StreamingJsonReporter::to_file(Path::new(path))?,
                None => StreamingJsonReporter::stdout(),
            };
            Ok(Box::new(reporter))
        });
    }

    /// Add a constructor overload for `identifier`
    pub fn register<F>(&self, identifier: &str, signature: &[ParamType], build: F)
    where
        F: Fn(&ConstructorArgs<'_>) -> anyhow::Result<Box<dyn Reporter>> + Send + Sync + 'static,
    {
        tracing::debug!(
            "Registering reporter '{}' ({})",
            identifier,
            describe_signature(signature)
        );
        self.constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(identifier.to_string())
            .or_default()
            .push(ReporterConstructor {
                signature: signature.to_vec(),
                build: Arc::new(build),
            });
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(identifier)
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Overloads registered for `identifier`
    pub fn constructors(&self, identifier: &str) -> Vec<ReporterConstructor> {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ReporterResolver for ReporterRegistry {
    fn resolve(
        &self,
        identifier: &str,
        params: &[Option<ParamValue>],
    ) -> Result<Box<dyn Reporter>, ConfigurationError> {
        let signature: Vec<ParamType> = params.iter().map(|p| ParamType::of(p.as_ref())).collect();

        // Clone the build fn out so the lock is not held while constructing
        let build = {
            let constructors = self
                .constructors
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let overloads = constructors.get(identifier).ok_or_else(|| {
                tracing::warn!("No reporter registered as '{}'", identifier);
                ConfigurationError::NotFound {
                    identifier: identifier.to_string(),
                }
            })?;
            overloads
                .iter()
                .find(|c| c.signature == signature)
                .map(|c| Arc::clone(&c.build))
                .ok_or_else(|| ConfigurationError::NoMatchingConstructor {
                    identifier: identifier.to_string(),
                    signature: describe_signature(&signature),
                })?
        };

        build(&ConstructorArgs::new(params)).map_err(|e| {
            tracing::warn!("Reporter '{}' failed to construct: {}", identifier, e);
            ConfigurationError::construction(identifier, e)
        })
    }
}

/// `file(dir [, suffix [, encoding]])`
fn file_listener(
    factory: &StatelessListenerFactory,
    args: &ConstructorArgs<'_>,
) -> anyhow::Result<Box<dyn Reporter>> {
    let directory = args.required_text(0, "reports directory")?;
    let encoding = match args.text(2) {
        Some(name) => name.parse::<Encoding>()?,
        None => factory.encoding(),
    };
    Ok(Box::new(factory.create_file_listener(
        directory,
        args.text(1),
        encoding,
    )))
}
