//! Render a module's backend block back into native configuration syntax.
//!
//! The remote-state guesser synthesizes a throwaway module containing only
//! this block, so candidate binaries can `init` against the real backend
//! without the rest of the configuration.

use serde_json::{Map, Value};

use tfsetup_core::ModuleFacts;

/// Dump the backend block of the given module, or an empty string for a
/// module whose state is local.
#[must_use]
pub fn dump_backend_hcl(facts: &ModuleFacts) -> String {
    let backend_type = facts.backend_type();
    if backend_type == "local" {
        return String::new();
    }

    let mut out = String::new();
    out.push_str("terraform {\n");
    out.push_str(&format!("    backend \"{backend_type}\" {{\n"));
    render_body(&facts.backend_config, 8, &mut out);
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn render_body(config: &Map<String, Value>, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for (key, value) in config {
        match value {
            // One level of nested blocks (e.g. assume_role) round-trips as an
            // array of objects.
            Value::Array(blocks) => {
                for block in blocks {
                    if let Value::Object(entries) = block {
                        out.push_str(&format!("{pad}{key} {{\n"));
                        render_body(entries, indent + 4, out);
                        out.push_str(&format!("{pad}}}\n"));
                    }
                }
            }
            other => {
                out.push_str(&format!("{pad}{key} = {}\n", hcl_value(other)));
            }
        }
    }
}

fn hcl_value(value: &Value) -> String {
    match value {
        Value::String(text) => format!("{text:?}"),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(json: &str) -> ModuleFacts {
        serde_json::from_str(json).expect("valid module facts in test")
    }

    #[test]
    fn local_backend_dumps_nothing() {
        assert_eq!(dump_backend_hcl(&ModuleFacts::default()), "");
        assert_eq!(
            dump_backend_hcl(&facts(r#"{"backend_type": "local", "backend_config": {"path": "x"}}"#)),
            ""
        );
    }

    #[test]
    fn simple_backend_round_trips_keys() {
        let rendered = dump_backend_hcl(&facts(
            r#"{
                "backend_type": "s3",
                "backend_config": {
                    "bucket": "state-bucket",
                    "key": "blah",
                    "region": "eu-west-2",
                    "encrypt": true
                }
            }"#,
        ));

        assert!(rendered.starts_with("terraform {\n    backend \"s3\" {\n"));
        assert!(rendered.contains("        bucket = \"state-bucket\"\n"));
        assert!(rendered.contains("        encrypt = true\n"));
        assert!(rendered.ends_with("    }\n}\n"));
    }

    #[test]
    fn nested_blocks_render_as_blocks_not_assignments() {
        let rendered = dump_backend_hcl(&facts(
            r#"{
                "backend_type": "oss",
                "backend_config": {
                    "access_key": "sausage",
                    "assume_role": [{"role_arn": "acs:ram::1:role/x", "session_name": "hello"}]
                }
            }"#,
        ));

        assert!(rendered.contains("        assume_role {\n"));
        assert!(rendered.contains("            role_arn = \"acs:ram::1:role/x\"\n"));
        assert!(!rendered.contains("assume_role ="));
    }
}
