//! URN naming convention helpers
//!
//! URNs look like `urn:pulumi:<stack>::<project>::<qualified-type>::<name>`,
//! where the qualified type chains parent types with `$`. Only the last link
//! of that chain is the resource's own type. Names may themselves contain
//! `::`, so everything after the type segment belongs to the name.

const SEPARATOR: &str = "::";

/// Type and name parsed out of a URN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrnParts {
    pub resource_type: String,
    pub name: String,
}

/// Parse the type and name out of a URN
///
/// A string that does not follow the convention is taken to be the name
/// itself, with an empty type.
pub fn parse(urn: &str) -> UrnParts {
    let segments: Vec<&str> = urn.splitn(4, SEPARATOR).collect();
    if segments.len() < 4 || !segments[0].starts_with("urn:") {
        return UrnParts {
            resource_type: String::new(),
            name: urn.to_string(),
        };
    }

    let qualified = segments[2];
    let resource_type = qualified.rsplit('$').next().unwrap_or(qualified);

    UrnParts {
        resource_type: resource_type.to_string(),
        name: segments[3].to_string(),
    }
}

/// The stack name embedded in a URN, if it follows the convention
pub fn stack(urn: &str) -> Option<&str> {
    let head = urn.split(SEPARATOR).next()?;
    let mut fields = head.splitn(3, ':');
    match (fields.next(), fields.next(), fields.next()) {
        (Some("urn"), Some(_), Some(stack)) if !stack.is_empty() => Some(stack),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_urn() {
        let parts = parse("urn:pulumi:dev::shop::aws:s3/bucket:Bucket::assets");
        assert_eq!(parts.resource_type, "aws:s3/bucket:Bucket");
        assert_eq!(parts.name, "assets");
    }

    #[test]
    fn test_parse_nested_type_takes_last_link() {
        let parts = parse("urn:pulumi:dev::shop::my:app:Site$aws:s3/bucket:Bucket::site-assets");
        assert_eq!(parts.resource_type, "aws:s3/bucket:Bucket");
        assert_eq!(parts.name, "site-assets");
    }

    #[test]
    fn test_parse_name_containing_separator() {
        let parts = parse("urn:pulumi:dev::shop::kubernetes:core/v1:Namespace::ns::extra");
        assert_eq!(parts.resource_type, "kubernetes:core/v1:Namespace");
        assert_eq!(parts.name, "ns::extra");
    }

    #[test]
    fn test_parse_unconventional_string() {
        let parts = parse("a");
        assert_eq!(parts.resource_type, "");
        assert_eq!(parts.name, "a");
    }

    #[test]
    fn test_stack() {
        assert_eq!(
            stack("urn:pulumi:prod::shop::pulumi:pulumi:Stack::shop-prod"),
            Some("prod")
        );
        assert_eq!(stack("a"), None);
    }
}
