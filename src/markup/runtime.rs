//! Host runtime
//!
//!     Compiled markup is a template for a host language: `{{ expr }}` outputs a value,
//!     `{% code %}` runs an instruction. The [HostRuntime] trait is the seam between the
//!     compiler and whatever executes that code; [TeraRuntime] runs it with Tera.
//!
//!     Besides the bindings, every render sees a set of named functions. The engine
//!     provides `include`, `object_attributes` and the translation function; callers add
//!     their own through [FunctionRegistry].

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tera::{Context, Tera};

use super::{Bindings, MarkupError};

/// A function callable from template code with named arguments.
pub type HostFunction = Arc<dyn Fn(&HashMap<String, Value>) -> Result<Value, String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, HostFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&HashMap<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&HostFunction> {
        self.functions.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.functions.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HostFunction)> {
        self.functions.iter()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Executes compiled template code.
pub trait HostRuntime: Send + Sync {
    fn execute(
        &self,
        name: &str,
        code: &str,
        bindings: &Bindings,
        functions: &FunctionRegistry,
    ) -> Result<String, MarkupError>;
}

/// Runs compiled templates with Tera. Output is not auto-escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraRuntime;

impl HostRuntime for TeraRuntime {
    fn execute(
        &self,
        name: &str,
        code: &str,
        bindings: &Bindings,
        functions: &FunctionRegistry,
    ) -> Result<String, MarkupError> {
        let render_error = |err: tera::Error| MarkupError::Render {
            name: name.to_string(),
            message: describe(&err),
        };

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        for (function_name, function) in functions.iter() {
            let function = Arc::clone(function);
            tera.register_function(function_name, move |args: &HashMap<String, Value>| {
                function(args).map_err(tera::Error::msg)
            });
        }
        tera.add_raw_template(name, code).map_err(render_error)?;

        let mut context = Context::new();
        for (key, value) in bindings.iter() {
            context.insert(key.as_str(), value);
        }
        tera.render(name, &context).map_err(render_error)
    }
}

/// Flatten a Tera error and its causes into one message.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// `object_attributes(value=...)`: ` class="type_name" id="type_name_<id>"` for an object
/// carrying `type` and `id` fields.
pub fn object_attributes(args: &HashMap<String, Value>) -> Result<Value, String> {
    let value = args
        .get("value")
        .ok_or("object_attributes requires a `value` argument")?;
    let Some(object) = value.as_object() else {
        return Ok(Value::String(String::new()));
    };
    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Ok(Value::String(String::new()));
    };
    let class = snake_case(kind);
    let mut out = format!(" class=\"{class}\"");
    match object.get("id") {
        Some(Value::String(id)) => out.push_str(&format!(" id=\"{class}_{id}\"")),
        Some(Value::Number(id)) => out.push_str(&format!(" id=\"{class}_{id}\"")),
        _ => {}
    }
    Ok(Value::String(out))
}

/// `BlogPost` and `blog-post` both become `blog_post`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if idx > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// Translation fallback: the text itself.
pub fn identity_translation(args: &HashMap<String, Value>) -> Result<Value, String> {
    Ok(args
        .get("text")
        .cloned()
        .unwrap_or_else(|| Value::String(String::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> HashMap<String, Value> {
        HashMap::from([("value".to_string(), value)])
    }

    #[test]
    fn test_tera_runtime_renders_bindings() {
        let mut bindings = Bindings::new();
        bindings.assign("name", "<b>Ada</b>");
        let out = TeraRuntime
            .execute(
                "inline",
                "Hi {{ name }}{% if name %}!{% endif %}",
                &bindings,
                &FunctionRegistry::new(),
            )
            .unwrap();
        assert_eq!(out, "Hi <b>Ada</b>!");
    }

    #[test]
    fn test_tera_runtime_calls_functions() {
        let mut functions = FunctionRegistry::new();
        functions.register("shout", |args| {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(Value::String(text.to_uppercase()))
        });
        let out = TeraRuntime
            .execute(
                "inline",
                "{{ shout(text=\"hey\") }}",
                &Bindings::new(),
                &functions,
            )
            .unwrap();
        assert_eq!(out, "HEY");
    }

    #[test]
    fn test_tera_syntax_error_is_reported() {
        let err = TeraRuntime
            .execute("broken", "{% if %}", &Bindings::new(), &FunctionRegistry::new())
            .unwrap_err();
        assert!(matches!(err, MarkupError::Render { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_object_attributes() {
        let out = object_attributes(&args(json!({"type": "BlogPost", "id": 7}))).unwrap();
        assert_eq!(out, json!(" class=\"blog_post\" id=\"blog_post_7\""));
        let out = object_attributes(&args(json!({"type": "user"}))).unwrap();
        assert_eq!(out, json!(" class=\"user\""));
        assert_eq!(object_attributes(&args(json!(3))).unwrap(), json!(""));
    }

    #[test]
    fn test_identity_translation() {
        let args = HashMap::from([("text".to_string(), json!("Hello"))]);
        assert_eq!(identity_translation(&args).unwrap(), json!("Hello"));
    }
}
