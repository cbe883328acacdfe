use std::collections::BTreeMap;
use std::fmt;

/// A leaf value that templates can substitute.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A node of a [`ConstantsTree`].
///
/// Sequences are opaque: templating never looks inside them.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Scalar(Scalar),
    Sequence(Vec<Constant>),
    Tree(ConstantsTree),
}

impl Constant {
    /// Converts a YAML value. `null` carries no value and yields `None`.
    pub fn from_yaml(value: serde_yaml::Value) -> Option<Self> {
        use serde_yaml::Value;

        let constant = match value {
            Value::Null => return None,
            Value::Bool(b) => Scalar::Bool(b).into(),
            Value::Number(n) => yaml_number(&n).into(),
            Value::String(s) => Scalar::Text(s).into(),
            Value::Sequence(items) => {
                Self::Sequence(items.into_iter().filter_map(Self::from_yaml).collect())
            }
            Value::Mapping(mapping) => Self::Tree(ConstantsTree::from_yaml_mapping(mapping)),
            Value::Tagged(tagged) => return Self::from_yaml(tagged.value),
        };
        Some(constant)
    }

    /// Converts a JSON value. `null` carries no value and yields `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        let constant = match value {
            Value::Null => return None,
            Value::Bool(b) => Scalar::Bool(b).into(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Integer(i).into(),
                None => match n.as_f64() {
                    Some(x) if n.is_f64() => Scalar::Float(x).into(),
                    _ => Scalar::Text(n.to_string()).into(),
                },
            },
            Value::String(s) => Scalar::Text(s).into(),
            Value::Array(items) => {
                Self::Sequence(items.into_iter().filter_map(Self::from_json).collect())
            }
            Value::Object(map) => {
                let mut tree = ConstantsTree::new();
                for (key, value) in map {
                    if let Some(constant) = Self::from_json(value) {
                        tree.insert(key, constant);
                    }
                }
                Self::Tree(tree)
            }
        };
        Some(constant)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Integer(i)
    } else if n.is_f64() {
        n.as_f64().map_or_else(|| Scalar::Text(n.to_string()), Scalar::Float)
    } else {
        // u64 beyond i64::MAX, e.g. a large snowflake
        Scalar::Text(n.to_string())
    }
}

impl From<Scalar> for Constant {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<ConstantsTree> for Constant {
    fn from(tree: ConstantsTree) -> Self {
        Self::Tree(tree)
    }
}

impl From<String> for Constant {
    fn from(s: String) -> Self {
        Scalar::Text(s).into()
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_owned()).into()
    }
}

impl From<i64> for Constant {
    fn from(i: i64) -> Self {
        Scalar::Integer(i).into()
    }
}

impl From<bool> for Constant {
    fn from(b: bool) -> Self {
        Scalar::Bool(b).into()
    }
}

/// A nested mapping of named constants addressed by dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantsTree {
    entries: BTreeMap<String, Constant>,
}

impl ConstantsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a YAML document. Anything but a mapping at the top
    /// level yields an empty tree.
    pub fn from_yaml(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Mapping(mapping) => Self::from_yaml_mapping(mapping),
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(tagged.value),
            _ => Self::new(),
        }
    }

    fn from_yaml_mapping(mapping: serde_yaml::Mapping) -> Self {
        let mut tree = Self::new();
        for (key, value) in mapping {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            if let Some(constant) = Constant::from_yaml(value) {
                tree.insert(key, constant);
            }
        }
        tree
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Constant>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Constant> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Constant> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Follows `path` through nested trees and returns the scalar leaf at
    /// its end. Paths ending on a subtree, or crossing a sequence, yield
    /// `None`.
    pub fn scalar_at<'p>(&self, path: impl IntoIterator<Item = &'p str>) -> Option<&Scalar> {
        let mut segments = path.into_iter();
        let mut current = self.entries.get(segments.next()?)?;
        for segment in segments {
            match current {
                Constant::Tree(tree) => current = tree.entries.get(segment)?,
                _ => return None,
            }
        }
        current.as_scalar()
    }

    /// Same-shaped tree with every scalar leaf percent-encoded.
    pub fn encoded(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Constant::Scalar(scalar) => Scalar::Text(
                        urlencoding::encode(&scalar.to_string()).into_owned(),
                    )
                    .into(),
                    Constant::Tree(tree) => Constant::Tree(tree.encoded()),
                    Constant::Sequence(items) => Constant::Sequence(items.clone()),
                };
                (key.clone(), value)
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(yaml: &str) -> ConstantsTree {
        ConstantsTree::from_yaml(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_scalar_at_nested_path() {
        let tree = tree(
            r#"
            server:
              name: Acme
              port: 8080
              ratio: 0.5
              open: true
            "#,
        );
        assert_eq!(
            tree.scalar_at(["server", "name"]),
            Some(&Scalar::Text("Acme".into()))
        );
        assert_eq!(tree.scalar_at(["server", "port"]), Some(&Scalar::Integer(8080)));
        assert_eq!(tree.scalar_at(["server", "ratio"]), Some(&Scalar::Float(0.5)));
        assert_eq!(tree.scalar_at(["server", "open"]), Some(&Scalar::Bool(true)));
        assert_eq!(tree.scalar_at(["server"]), None);
        assert_eq!(tree.scalar_at(["server", "missing"]), None);
    }

    #[test]
    fn test_sequences_are_opaque() {
        let tree = tree("a: [1, 2, 3]");
        assert!(matches!(tree.get("a"), Some(Constant::Sequence(items)) if items.len() == 3));
        assert_eq!(tree.scalar_at(["a", "0"]), None);
    }

    #[test]
    fn test_null_leaves_are_dropped() {
        let tree = tree("a: ~\nb: 1");
        assert!(tree.get("a").is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_non_mapping_document_is_empty() {
        assert!(tree("just a string").is_empty());
        assert!(tree("[1, 2]").is_empty());
    }

    #[test]
    fn test_large_unsigned_number_kept_as_text() {
        let tree = tree("id: 18446744073709551615");
        assert_eq!(
            tree.scalar_at(["id"]),
            Some(&Scalar::Text("18446744073709551615".into()))
        );
    }

    #[test]
    fn test_encoded_mirrors_shape() {
        let tree = tree(
            r#"
            raw: "a b&c"
            nested:
              url: "https://x.y/?q=1"
              n: 5
            list: ["a b"]
            "#,
        );
        let encoded = tree.encoded();
        assert_eq!(
            encoded.scalar_at(["raw"]),
            Some(&Scalar::Text("a%20b%26c".into()))
        );
        assert_eq!(
            encoded.scalar_at(["nested", "url"]),
            Some(&Scalar::Text("https%3A%2F%2Fx.y%2F%3Fq%3D1".into()))
        );
        assert_eq!(encoded.scalar_at(["nested", "n"]), Some(&Scalar::Text("5".into())));
        assert_eq!(encoded.get("list"), tree.get("list"));
    }

    #[test]
    fn test_from_json_object() {
        let constant = Constant::from_json(serde_json::json!({"a": {"b": 1.5}, "c": null})).unwrap();
        let Constant::Tree(tree) = constant else {
            panic!("expected tree");
        };
        assert_eq!(tree.scalar_at(["a", "b"]), Some(&Scalar::Float(1.5)));
        assert!(tree.get("c").is_none());
    }
}
