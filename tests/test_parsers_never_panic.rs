//! Every dialect parser accepts arbitrary text.
//!
//! Inputs are drawn from the characters that drive the scanners (braces,
//! quotes, `::`, keywords, newlines) so malformed but plausible documents
//! dominate over random noise.

use cedar_index::hir::{
    parse_auth_request, parse_entities, parse_policies, parse_policy_json, parse_schema_human, parse_schema_json,
    parse_template_links, split_property_chain, trailing_property_chain,
};
use cedar_index::syntax::EntityNaming;
use cedar_index::{LineCol, LineIndex};
use proptest::prelude::*;

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

fn arb_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("{".to_owned()),
        Just("}".to_owned()),
        Just("[".to_owned()),
        Just("]".to_owned()),
        Just("\"".to_owned()),
        Just("\\".to_owned()),
        Just(":".to_owned()),
        Just("::".to_owned()),
        Just(",".to_owned()),
        Just(";".to_owned()),
        Just("\n".to_owned()),
        Just("//".to_owned()),
        Just("/*".to_owned()),
        Just("@id(\"x\")".to_owned()),
        Just("permit (".to_owned()),
        Just("forbid".to_owned()),
        Just("principal".to_owned()),
        Just("action == Action::\"a\"".to_owned()),
        Just("entity A in [B] {".to_owned()),
        Just("namespace NS {".to_owned()),
        Just("\"entityTypes\"".to_owned()),
        Just("\"uid\"".to_owned()),
        Just("\"type\": \"Record\"".to_owned()),
        Just("é".to_owned()),
        Just("\\\"é".to_owned()),
        Just("principal[\"".to_owned()),
        Just("\"].".to_owned()),
        "[a-zA-Z_ ]{1,8}",
    ]
}

fn arb_document() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_fragment(), 0..40).prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn policy_scanner_never_panics(text in arb_document()) {
        let index = parse_policies(&text);
        for policy in &index.policies {
            prop_assert!(policy.range.start <= policy.range.end);
        }
    }

    #[test]
    fn json_dialects_never_panic(text in arb_document()) {
        parse_schema_json(&text);
        parse_entities(&text, EntityNaming::CEDAR);
        parse_entities(&text, EntityNaming::AVP);
        parse_template_links(&text);
        parse_auth_request(&text);
        parse_policy_json(&text);
    }

    #[test]
    fn human_schema_scanner_never_panics(text in arb_document()) {
        parse_schema_human(&text);
    }

    #[test]
    fn chains_never_panic(text in arb_document()) {
        split_property_chain(&text);
        if let Some(chain) = trailing_property_chain(&text) {
            prop_assert!(text.ends_with(chain));
            split_property_chain(chain);
        }
    }

    #[test]
    fn line_index_round_trips_char_boundaries(text in arb_document()) {
        let index = LineIndex::new(&text);
        for (offset, _) in text.char_indices() {
            let pos = index.line_col((offset as u32).into());
            prop_assert_eq!(index.offset(pos).map(u32::from), Some(offset as u32));
        }
        prop_assert!(index.offset(LineCol::new(index.len() as u32, 0)).is_none());
    }
}
