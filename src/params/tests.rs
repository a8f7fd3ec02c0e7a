//! Tests for path parsing and parameter decoding.

#[cfg(test)]
mod tests {
    use crate::params::{decode, ParamMap, ParamValue, PathSegment, PathSpec};

    fn scalar(value: &str) -> ParamValue {
        ParamValue::from(value)
    }

    fn mapping(entries: &[(&str, ParamValue)]) -> ParamValue {
        ParamValue::Mapping(entries.iter().cloned().collect())
    }

    #[test]
    fn test_pattern_segments() {
        let spec = PathSpec::parse("/users/#id/files/*rest", true);
        assert_eq!(
            spec.segments(),
            &[
                PathSegment::Literal("users".to_string()),
                PathSegment::Named("id".to_string()),
                PathSegment::Literal("files".to_string()),
                PathSegment::Wildcard("rest".to_string()),
            ]
        );
    }

    #[test]
    fn test_request_paths_ignore_sigils() {
        let spec = PathSpec::parse("/users/#id/*rest", false);
        assert!(spec.segments().iter().all(|s| matches!(s, PathSegment::Literal(_))));
        assert_eq!(spec.segments()[1].text(), "#id");
        assert_eq!(spec.segments()[1].param_name(), None);
    }

    #[test]
    fn test_empty_path_is_root() {
        assert_eq!(PathSpec::parse("", false), PathSpec::root());
        assert_eq!(PathSpec::parse("/", true), PathSpec::root());
        assert_eq!(PathSpec::parse("///", false).len(), 1);
        assert!(!PathSpec::parse("", false).is_empty());
    }

    #[test]
    fn test_empty_segments_dropped() {
        let spec = PathSpec::parse("//a///b/", false);
        let texts: Vec<&str> = spec.segments().iter().map(|s| s.text()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_by_shape() {
        assert_eq!(scalar("a").merge(scalar("b")), scalar("b"));

        let merged = ParamValue::Sequence(vec![scalar("1")])
            .merge(ParamValue::Sequence(vec![scalar("2")]));
        assert_eq!(merged, ParamValue::Sequence(vec![scalar("1"), scalar("2")]));

        let merged = mapping(&[("x", scalar("1")), ("y", scalar("old"))])
            .merge(mapping(&[("y", scalar("new")), ("z", scalar("3"))]));
        assert_eq!(
            merged,
            mapping(&[("x", scalar("1")), ("y", scalar("new")), ("z", scalar("3"))])
        );

        let merged = mapping(&[("x", scalar("1"))]).merge(ParamValue::Sequence(vec![scalar("2")]));
        assert_eq!(merged, ParamValue::Sequence(vec![scalar("2")]));
    }

    #[test]
    fn test_equality_is_shape_aware() {
        assert_ne!(scalar("1"), ParamValue::Sequence(vec![scalar("1")]));
        assert_ne!(ParamValue::Sequence(vec![]), ParamValue::Mapping(ParamMap::new()));
        assert_eq!(
            mapping(&[("a", scalar("1")), ("b", scalar("2"))]),
            mapping(&[("b", scalar("2")), ("a", scalar("1"))])
        );
        assert_eq!(scalar("x"), "x");
    }

    #[test]
    fn test_mapping_keeps_insertion_order() {
        let map: ParamMap = [("z", scalar("1")), ("a", scalar("2")), ("z", scalar("3"))]
            .into_iter()
            .collect();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(map.get("z"), Some(&scalar("3")));
    }

    #[test]
    fn test_decode_flat_keys_overwrite() {
        let params = decode("a=1&a=2");
        assert_eq!(params.len(), 1);
        assert_eq!(params["a"], scalar("2"));
    }

    #[test]
    fn test_decode_sequence() {
        let params = decode("a[]=1&a[]=2");
        assert_eq!(params["a"], ParamValue::Sequence(vec![scalar("1"), scalar("2")]));
    }

    #[test]
    fn test_decode_mapping() {
        let params = decode("a[x]=1&a[y]=2");
        assert_eq!(params["a"], mapping(&[("x", scalar("1")), ("y", scalar("2"))]));
    }

    #[test]
    fn test_decode_deep_nesting() {
        let params = decode("user[tags][]=a&user[name]=bo");
        let user = &params["user"];
        assert_eq!(user.get("tags"), Some(&ParamValue::Sequence(vec![scalar("a")])));
        assert_eq!(user.get("name"), Some(&scalar("bo")));

        let params = decode("m[][k]=v");
        assert_eq!(
            params["m"],
            ParamValue::Sequence(vec![mapping(&[("k", scalar("v"))])])
        );
    }

    #[test]
    fn test_decode_drops_malformed_brackets() {
        let params = decode("bad[=1&good=2");
        assert_eq!(params.len(), 1);
        assert_eq!(params["good"], scalar("2"));

        let params = decode("a[x=1&b[x]y=2&c[x]=3");
        assert_eq!(params.len(), 1);
        assert_eq!(params["c"], mapping(&[("x", scalar("3"))]));
    }

    #[test]
    fn test_decode_drops_pairs_without_value_separator() {
        let params = decode("flag&q=rust&=orphan");
        assert_eq!(params.len(), 1);
        assert_eq!(params["q"], scalar("rust"));
    }

    #[test]
    fn test_decode_empty_value() {
        let params = decode("empty=&q=a=b");
        assert_eq!(params["empty"], scalar(""));
        assert_eq!(params["q"], scalar("a=b"));
    }

    #[test]
    fn test_decode_percent_encoding() {
        let params = decode("q=hello%20world&list%5B%5D=1&list%5B%5D=2");
        assert_eq!(params["q"], scalar("hello world"));
        assert_eq!(params["list"], ParamValue::Sequence(vec![scalar("1"), scalar("2")]));
    }

    #[test]
    fn test_decode_invalid_utf8_yields_empty() {
        assert!(decode("a=%FF%FE&b=2").is_empty());
    }

    #[test]
    fn test_decode_malformed_escape_yields_empty() {
        assert!(decode("a=%zz&b=2").is_empty());
        assert!(decode("a=100%").is_empty());
        assert!(decode("a=%4&b=2").is_empty());
        assert_eq!(decode("a=%41&b=2")["a"], "A");
    }

    #[test]
    fn test_bracket_value_replaces_flat_value() {
        let params = decode("a=1&a[]=2");
        assert_eq!(params["a"], ParamValue::Sequence(vec![scalar("2")]));

        let params = decode("a[]=1&a=2");
        assert_eq!(params["a"], scalar("2"));
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let params = decode("a[]=1&a[]=2&m[k]=v&s=x");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["a"], serde_json::json!(["1", "2"]));
        assert_eq!(json["m"], serde_json::json!({"k": "v"}));
        assert_eq!(json["s"], serde_json::json!("x"));
    }

    #[test]
    fn test_display() {
        let params = decode("a[]=1&a[]=2");
        assert_eq!(params["a"].to_string(), "[1, 2]");
        assert_eq!(mapping(&[("k", scalar("v"))]).to_string(), "{k: v}");
    }
}
