//! Rendering of sets, maps and the codegen script in iscc syntax.

/// `[N,M] -> ` for a non-empty parameter list, nothing otherwise.
pub fn params_prefix<S: AsRef<str>>(symbols: &[S]) -> String {
    if symbols.is_empty() {
        return String::new();
    }
    let joined: Vec<&str> = symbols.iter().map(AsRef::as_ref).collect();
    format!("[{}] -> ", joined.join(","))
}

/// One disjunct `[input] -> [output] : c_0 and c_1 ...`.
pub fn map_clause(input: &str, output: &str, conditions: &[String]) -> String {
    if conditions.is_empty() {
        format!("[{}] -> [{}]", input, output)
    } else {
        format!("[{}] -> [{}] : {}", input, output, conditions.join(" and "))
    }
}

/// A union map `[params] -> { clause; clause }`.
pub fn union_map<S: AsRef<str>>(symbols: &[S], clauses: &[String]) -> String {
    format!("{}{{ {} }}", params_prefix(symbols), clauses.join("; "))
}

/// Bounds of one domain dimension: `lo <= x <= up and lo <= up`.
pub fn bound_conditions(iterator: &str, lower: &str, upper: &str) -> String {
    format!(
        "{lo} <= {x} <= {up} and {lo} <= {up}",
        lo = lower,
        x = iterator,
        up = upper
    )
}

/// The full iscc program generating code for `domains` under the composition
/// of `maps`.
pub fn codegen_script(
    domains: &[String],
    maps: &[String],
    input_iterators: &str,
    separate: &str,
) -> String {
    let mut script = String::from("# Domains:\n");
    for (i, d) in domains.iter().enumerate() {
        script.push_str(&format!("S{} := {};\n", i + 1, d));
    }
    script.push_str("\n# Transformations:\n");
    for (i, m) in maps.iter().enumerate() {
        script.push_str(&format!("M{} := {};\n", i + 1, m));
    }
    let composed: Vec<String> = (1..=maps.len()).map(|i| format!("M{}", i)).collect();
    let unioned: Vec<String> = (1..=domains.len()).map(|i| format!("S{}", i)).collect();
    script.push_str(&format!(
        "\ncodegen (({})*({})) using {{ [{}] -> separate[{}] }};\n",
        composed.join("."),
        unioned.join("+"),
        input_iterators,
        separate
    ));
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_prefix() {
        assert_eq!(params_prefix::<&str>(&[]), "");
        assert_eq!(params_prefix(&["N", "M"]), "[N,M] -> ");
    }

    #[test]
    fn test_union_map() {
        let a = map_clause("x", "y", &["y = x + 1".to_string()]);
        let b = map_clause("x", "x", &[]);
        assert_eq!(a, "[x] -> [y] : y = x + 1");
        assert_eq!(union_map(&["N"], &[a, b]), "[N] -> { [x] -> [y] : y = x + 1; [x] -> [x] }");
    }

    #[test]
    fn test_codegen_script() {
        let script = codegen_script(
            &["{ S[i] }".to_string(), "{ T[i] }".to_string()],
            &["{ S[i] -> [i] }".to_string(), "{ [i] -> [i] }".to_string()],
            "i",
            "i_c",
        );
        assert!(script.contains("S1 := { S[i] };"));
        assert!(script.contains("M2 := { [i] -> [i] };"));
        assert!(script.contains("codegen ((M1.M2)*(S1+S2)) using { [i] -> separate[i_c] };"));
    }
}
