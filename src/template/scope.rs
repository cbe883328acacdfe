use crate::constants::{ConstantsTree, ContextConstants, Namespace, Scalar, StaticConstants};

#[derive(Debug, Clone, Copy)]
struct Layer<'a> {
    /// `None` for authored constants addressed without a prefix.
    namespace: Option<Namespace>,
    raw: &'a ConstantsTree,
    encoded: &'a ConstantsTree,
}

/// The constants visible to one substitution pass.
///
/// A path is resolved by its first segment: `@ENCODED.` switches to the
/// percent-encoded mirror of the rest of the path, another reserved segment
/// selects a derived branch, anything else looks into the authored
/// constants.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    layers: Vec<Layer<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_static(mut self, constants: &'a StaticConstants) -> Self {
        self.layers.push(Layer {
            namespace: None,
            raw: constants.tree(),
            encoded: constants.encoded(),
        });
        self
    }

    #[must_use]
    pub fn with_context(mut self, constants: &'a ContextConstants) -> Self {
        self.layers
            .extend(constants.branches().map(|(namespace, raw, encoded)| Layer {
                namespace: Some(namespace),
                raw,
                encoded,
            }));
        self
    }

    /// Resolves a dotted path to the scalar it names.
    pub fn lookup(&self, path: &str) -> Option<&'a Scalar> {
        let (encoded, path) = match path.split_once('.') {
            Some((first, rest)) if Namespace::parse(first) == Some(Namespace::Encoded) => {
                (true, rest)
            }
            _ => (false, path),
        };

        let mut segments = path.split('.').peekable();
        let namespace = match segments.peek() {
            Some(first) if first.starts_with(crate::constants::RESERVED_PREFIX) => {
                match Namespace::parse(first)? {
                    // the encoded mirror is never encoded twice
                    Namespace::Encoded => return None,
                    ns => {
                        segments.next();
                        Some(ns)
                    }
                }
            }
            _ => None,
        };
        let segments: Vec<&str> = segments.collect();

        self.layers
            .iter()
            .filter(|layer| layer.namespace == namespace)
            .find_map(|layer| {
                let tree = if encoded { layer.encoded } else { layer.raw };
                tree.scalar_at(segments.iter().copied())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ContextConstants;

    #[test]
    fn test_lookup_authored_and_derived() {
        let constants = StaticConstants::from_yaml_str("a:\n  b: x y").unwrap();
        let context = ContextConstants::build(&());
        let scope = Scope::new().with_static(&constants).with_context(&context);

        assert_eq!(scope.lookup("a.b"), Some(&Scalar::Text("x y".into())));
        assert_eq!(scope.lookup("@ENCODED.a.b"), Some(&Scalar::Text("x%20y".into())));
        assert!(scope.lookup("@DATE.YEAR").is_some());
        assert!(scope.lookup("@ENCODED.@DATE.JSON_STRING").is_some());
        assert_eq!(scope.lookup("@ENCODED.@ENCODED.a.b"), None);
        assert_eq!(scope.lookup("@USER.ID"), None);
        assert_eq!(scope.lookup("@ENCODED"), None);
    }

    #[test]
    fn test_derived_branches_do_not_leak_into_authored_paths() {
        let context = ContextConstants::build(&());
        let scope = Scope::new().with_context(&context);
        assert_eq!(scope.lookup("YEAR"), None);
        assert_eq!(scope.lookup("DATE.YEAR"), None);
    }
}
