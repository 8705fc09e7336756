//! Normalisation from raw model JSON to [`ExtractedProduct`].
//!
//! Every rule is independent and lossy in one direction only: a value that
//! cannot be interpreted becomes empty (or `None` for the price), it is never
//! guessed. A product is always produced, whatever the shape of its fields.

use crate::output::{Condition, ExtractedProduct, DEFAULT_CONDITION_KIND};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// One product object as returned by the model. Keys are not guaranteed.
pub type RawProduct = Map<String, Value>;

const BRAND_NAME_KEYS: &[&str] = &["marca_nome", "marca+nome", "nome"];
const BRAND_KEYS: &[&str] = &["marca"];
const PRODUCT_KEYS: &[&str] = &["produto"];
const PRICE_KEY: &str = "preco_brl";
const PRICE_TEXT_KEYS: &[&str] = &["preco_brl_texto", "preco_texto"];
const CONDITIONS_KEY: &str = "condicoes";
const CONDITION_KIND_KEY: &str = "tipo";
const CONDITION_VALUE_KEY: &str = "valor";

/// Normalise every product object in a parsed reply.
///
/// Entries that are not JSON objects carry no fields to read and are skipped.
pub fn normalize_products(raw: &[Value], source_file: &str) -> Vec<ExtractedProduct> {
    raw.iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(normalize_product(map, source_file)),
            other => {
                debug!("{}: skipping non-object product entry {}", source_file, other);
                None
            }
        })
        .collect()
}

/// Normalise a single raw product.
pub fn normalize_product(raw: &RawProduct, source_file: &str) -> ExtractedProduct {
    let price_text = first_text(raw, PRICE_TEXT_KEYS);
    let price_value = parse_price(raw.get(PRICE_KEY), &price_text);

    ExtractedProduct {
        source_file: source_file.to_string(),
        brand_name: first_text(raw, BRAND_NAME_KEYS),
        brand: first_text(raw, BRAND_KEYS),
        product: first_text(raw, PRODUCT_KEYS),
        price_value,
        price_text,
        conditions: normalize_conditions(raw.get(CONDITIONS_KEY)),
    }
}

// ── Text fields ──────────────────────────────────────────────────────────────

/// First non-empty value among `keys`, or `""`.
fn first_text(raw: &RawProduct, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| raw.get(*key).and_then(text_of))
        .unwrap_or_default()
}

/// Strings and numbers are text; `null`, booleans, arrays and objects are not.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Price ────────────────────────────────────────────────────────────────────

/// Inputs available to the price strategies.
struct PriceInputs<'a> {
    /// The `preco_brl` field as sent by the model; never `null`.
    price: &'a Value,
    /// The textual price (`preco_brl_texto` / `preco_texto`).
    text: &'a str,
}

type PriceStrategy = fn(&PriceInputs<'_>) -> Option<f64>;

/// Tried in order; the first `Some` wins.
const PRICE_STRATEGIES: &[PriceStrategy] = &[direct_price, brazilian_price];

/// Parse the price via [`PRICE_STRATEGIES`]; `None` when all of them fail.
///
/// An absent or `null` `preco_brl` is no price at all: the textual price is
/// only consulted once a present value fails direct parsing.
pub fn parse_price(price: Option<&Value>, price_text: &str) -> Option<f64> {
    let price = price.filter(|v| !v.is_null())?;
    let inputs = PriceInputs {
        price,
        text: price_text,
    };
    PRICE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&inputs))
}

/// The price field is already a number, or a plain numeric string.
fn direct_price(inputs: &PriceInputs<'_>) -> Option<f64> {
    let value = match inputs.price {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

static RE_CURRENCY_AND_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"R\$|\s").unwrap());

/// Brazilian formatting: `R$ 1.234,56` → `1234.56`.
///
/// Reads the price field when it holds text, otherwise the textual price.
/// Dots are always grouping separators here, so a dotted decimal string such
/// as `"R$29.90"` reads as `2990`.
fn brazilian_price(inputs: &PriceInputs<'_>) -> Option<f64> {
    let source = text_of(inputs.price).unwrap_or_else(|| inputs.text.to_string());

    let cleaned = RE_CURRENCY_AND_SPACE
        .replace_all(&source, "")
        .replace('.', "")
        .replace(',', ".");

    let value = cleaned.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

// ── Conditions ───────────────────────────────────────────────────────────────

/// A single object becomes a one-element list; anything but an object or an
/// array becomes empty. Non-object list entries are dropped.
pub fn normalize_conditions(raw: Option<&Value>) -> Vec<Condition> {
    let items: &[Value] = match raw {
        Some(Value::Array(items)) => items.as_slice(),
        Some(single @ Value::Object(_)) => std::slice::from_ref(single),
        _ => &[],
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            let kind = map
                .get(CONDITION_KIND_KEY)
                .and_then(text_of)
                .unwrap_or_else(|| DEFAULT_CONDITION_KIND.to_string());
            let value = map
                .get(CONDITION_VALUE_KEY)
                .and_then(text_of)
                .unwrap_or_default();
            Condition { kind, value }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawProduct {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn normalize(value: Value) -> ExtractedProduct {
        normalize_product(&raw(value), "folheto.jpg")
    }

    // ── Brand and name ───────────────────────────────────────────────────

    #[test]
    fn brand_name_prefers_marca_nome() {
        let p = normalize(json!({"marca_nome": "Nescau 2.0", "nome": "Nescau"}));
        assert_eq!(p.brand_name, "Nescau 2.0");
    }

    #[test]
    fn brand_name_falls_back_to_nome() {
        let p = normalize(json!({"nome": "Leite Ninho 380g"}));
        assert_eq!(p.brand_name, "Leite Ninho 380g");
    }

    #[test]
    fn brand_name_skips_empty_values() {
        let p = normalize(json!({"marca_nome": "", "marca+nome": "Omo Lavagem Perfeita"}));
        assert_eq!(p.brand_name, "Omo Lavagem Perfeita");
    }

    #[test]
    fn missing_text_fields_are_empty_strings() {
        let p = normalize(json!({}));
        assert_eq!(p.source_file, "folheto.jpg");
        assert_eq!(p.brand_name, "");
        assert_eq!(p.brand, "");
        assert_eq!(p.product, "");
        assert_eq!(p.price_text, "");
        assert_eq!(p.price_value, None);
        assert!(p.conditions.is_empty());
    }

    #[test]
    fn brand_and_product_are_copied() {
        let p = normalize(json!({"marca": "Ypê", "produto": "Detergente 500ml", "marca_nome": null}));
        assert_eq!(p.brand, "Ypê");
        assert_eq!(p.product, "Detergente 500ml");
        assert_eq!(p.brand_name, "");
    }

    #[test]
    fn numeric_text_fields_are_kept_as_text() {
        let p = normalize(json!({"produto": 500}));
        assert_eq!(p.product, "500");
    }

    #[test]
    fn price_text_falls_back_to_preco_texto() {
        let p = normalize(json!({"preco_texto": "R$ 9,99"}));
        assert_eq!(p.price_text, "R$ 9,99");
    }

    // ── Price ────────────────────────────────────────────────────────────

    #[test]
    fn numeric_price_is_unchanged() {
        assert_eq!(normalize(json!({"preco_brl": 19.9})).price_value, Some(19.9));
        assert_eq!(normalize(json!({"preco_brl": 5})).price_value, Some(5.0));
    }

    #[test]
    fn plain_numeric_string_parses_directly() {
        assert_eq!(normalize(json!({"preco_brl": "29.90"})).price_value, Some(29.90));
    }

    #[test]
    fn brazilian_price_string_is_parsed() {
        assert_eq!(normalize(json!({"preco_brl": "R$ 29,90"})).price_value, Some(29.90));
    }

    #[test]
    fn brazilian_grouping_is_removed() {
        assert_eq!(
            normalize(json!({"preco_brl": "R$ 1.234,56"})).price_value,
            Some(1234.56)
        );
    }

    #[test]
    fn missing_price_ignores_price_text() {
        let p = normalize(json!({"preco_brl_texto": "R$ 4,49"}));
        assert_eq!(p.price_value, None);
        assert_eq!(p.price_text, "R$ 4,49");
    }

    #[test]
    fn null_price_ignores_price_text() {
        let p = normalize(json!({"preco_brl": null, "preco_brl_texto": "R$12,00"}));
        assert_eq!(p.price_value, None);
    }

    #[test]
    fn empty_price_string_falls_back_to_price_text() {
        let p = normalize(json!({"preco_brl": "", "preco_brl_texto": "R$ 12,00"}));
        assert_eq!(p.price_value, Some(12.0));
    }

    #[test]
    fn unparseable_price_is_absent_not_zero() {
        let p = normalize(json!({"preco_brl": "consulte", "preco_brl_texto": "Consulte a loja"}));
        assert_eq!(p.price_value, None);
        assert_eq!(p.price_text, "Consulte a loja");
    }

    #[test]
    fn non_finite_price_is_rejected() {
        assert_eq!(normalize(json!({"preco_brl": "NaN"})).price_value, None);
        assert_eq!(normalize(json!({"preco_brl": "inf"})).price_value, None);
    }

    #[test]
    fn boolean_price_is_absent() {
        assert_eq!(normalize(json!({"preco_brl": true})).price_value, None);
    }

    #[test]
    fn non_breaking_space_is_stripped() {
        assert_eq!(parse_price(Some(&json!("R$\u{a0}7,50")), ""), Some(7.5));
    }

    #[test]
    fn dotted_decimal_text_is_read_as_grouping() {
        assert_eq!(parse_price(Some(&json!("R$29.90")), ""), Some(2990.0));
    }

    // ── Conditions ───────────────────────────────────────────────────────

    #[test]
    fn single_condition_object_is_wrapped() {
        let p = normalize(json!({"condicoes": {"tipo": "desconto", "valor": "10%"}}));
        assert_eq!(p.conditions, vec![Condition::new("desconto", "10%")]);
    }

    #[test]
    fn condition_list_is_kept_in_order() {
        let p = normalize(json!({"condicoes": [
            {"tipo": "desconto", "valor": "10%"},
            {"tipo": "data", "valor": "até 05/01"}
        ]}));
        assert_eq!(
            p.conditions,
            vec![
                Condition::new("desconto", "10%"),
                Condition::new("data", "até 05/01"),
            ]
        );
    }

    #[test]
    fn null_and_scalar_conditions_are_empty() {
        assert!(normalize(json!({"condicoes": null})).conditions.is_empty());
        assert!(normalize(json!({"condicoes": "leve 3 pague 2"})).conditions.is_empty());
        assert!(normalize(json!({"condicoes": 3})).conditions.is_empty());
    }

    #[test]
    fn non_object_condition_entries_are_dropped() {
        let p = normalize(json!({"condicoes": ["texto solto", {"tipo": "outro", "valor": "x"}, null]}));
        assert_eq!(p.conditions, vec![Condition::new("outro", "x")]);
    }

    #[test]
    fn missing_condition_kind_defaults_to_other() {
        let p = normalize(json!({"condicoes": [{"valor": "enquanto durarem os estoques"}, {"tipo": ""}]}));
        assert_eq!(
            p.conditions,
            vec![
                Condition::new("other", "enquanto durarem os estoques"),
                Condition::new("other", ""),
            ]
        );
    }

    // ── Lists ────────────────────────────────────────────────────────────

    #[test]
    fn every_object_yields_one_record() {
        let raw = vec![json!({"nome": "a"}), json!({}), json!({"marca_nome": "c"})];
        let products = normalize_products(&raw, "b.png");
        assert_eq!(products.len(), 3);
        assert!(products.iter().all(|p| p.source_file == "b.png"));
        assert_eq!(products[1].brand_name, "");
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let raw = vec![json!("Nescau"), json!({"nome": "Toddy"}), json!(null)];
        let products = normalize_products(&raw, "b.png");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].brand_name, "Toddy");
    }
}
