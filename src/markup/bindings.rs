use serde::Serialize;
use serde_json::{Map, Value};

/// Named values handed to the host runtime when a template is rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bindings {
    values: Map<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier value.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Bind any serializable value.
    pub fn assign_serialized<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.assign(name, value))
    }

    /// Merge a set of bindings; later values win.
    pub fn append<I, K>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (name, value) in values {
            self.values.insert(name.into(), value);
        }
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.values.clear();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for Bindings {
    fn from(values: Map<String, Value>) -> Self {
        Bindings { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assign_append_clear() {
        let mut bindings = Bindings::new();
        bindings.assign("a", 1).assign("b", "two");
        bindings.append([("a", json!(10)), ("c", json!([1, 2]))]);
        assert_eq!(bindings.get("a"), Some(&json!(10)));
        assert_eq!(bindings.get("b"), Some(&json!("two")));
        assert_eq!(bindings.len(), 3);
        bindings.clear();
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_assign_serialized() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }
        let mut bindings = Bindings::new();
        bindings
            .assign_serialized("user", &User { name: "ada" })
            .unwrap();
        assert_eq!(bindings.get("user"), Some(&json!({"name": "ada"})));
    }
}
