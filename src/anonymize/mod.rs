//! Deterministic per-cell anonymization.
//!
//! Every replacement is derived from `keyed_digest(key, value)` where the key
//! is the column's `deterministic_key` or the document salt. The same input
//! under the same key and rule always yields the same output, which keeps
//! joins on masked columns intact across tables and runs.

pub mod digest;
mod mask;
mod synth;

use crate::spec::{
    ColumnRule, ColumnStrategy, MaskPolicy, MaskType, MaskingDefaults, SynthPolicy, SynthType,
};
use crate::store::Value;

pub use digest::{digest, keyed_digest};

/// Applies column rules to values
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'a> {
    defaults: &'a MaskingDefaults,
}

impl<'a> Transformer<'a> {
    pub fn new(defaults: &'a MaskingDefaults) -> Self {
        Self { defaults }
    }

    /// Transform one cell. NULL stays NULL; a missing rule keeps the value.
    pub fn transform(&self, rule: Option<&ColumnRule>, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let Some(rule) = rule else {
            return value.clone();
        };

        match rule.strategy() {
            ColumnStrategy::Mask => match &rule.mask {
                Some(policy) => self.mask(policy, value),
                None => value.clone(),
            },
            ColumnStrategy::Synthesize => match &rule.synth {
                Some(policy) => self.synthesize(policy, value),
                None => value.clone(),
            },
            ColumnStrategy::Keep | ColumnStrategy::Unknown(_) => value.clone(),
        }
    }

    fn digest_of(&self, column_key: Option<&str>, value: &Value) -> String {
        // validation rejects rules without any key; an empty key is the last resort
        let key = self.defaults.effective_key(column_key).unwrap_or_default();
        keyed_digest(key, &value.to_string())
    }

    fn mask(&self, policy: &MaskPolicy, value: &Value) -> Value {
        let key = policy.deterministic_key.as_deref();
        match &policy.kind {
            MaskType::Username => Value::Text(mask::username(&self.digest_of(key, value))),
            MaskType::CategoryMap => Value::Text(mask::category(&self.digest_of(key, value))),
            MaskType::NumericNoise => match value.as_f64() {
                Some(original) => {
                    let digest = self.digest_of(key, value);
                    Value::Float(mask::numeric_noise(
                        original,
                        &digest,
                        policy.percent.unwrap_or(0),
                    ))
                }
                None => value.clone(),
            },
            MaskType::Unknown(_) => value.clone(),
        }
    }

    fn synthesize(&self, policy: &SynthPolicy, value: &Value) -> Value {
        if !policy.kind.is_known() {
            return value.clone();
        }
        let digest = self.digest_of(policy.deterministic_key.as_deref(), value);
        let text = match &policy.kind {
            SynthType::Email => synth::email(
                &digest,
                self.defaults.effective_email_domain(policy.domain.as_deref()),
            ),
            SynthType::PasswordHash => synth::password_hash(&digest),
            SynthType::Address => synth::address(&digest),
            // every card format renders the same masked form
            SynthType::CreditCard => synth::credit_card(&digest),
            SynthType::Unknown(_) => return value.clone(),
        };
        Value::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> MaskingDefaults {
        MaskingDefaults {
            deterministic_salt: Some("s".to_string()),
            email_domain: Some("example.test".to_string()),
            preserve_length: false,
        }
    }

    fn masked(kind: MaskType) -> ColumnRule {
        ColumnRule::masked("c", MaskPolicy::new(kind))
    }

    fn synthesized(kind: SynthType) -> ColumnRule {
        ColumnRule::synthesized("c", SynthPolicy::new(kind))
    }

    #[test]
    fn test_username_with_salt() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let out = transformer.transform(Some(&masked(MaskType::Username)), &Value::text("alice"));
        assert_eq!(out, Value::text("user_5a4427a7"));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let rule = synthesized(SynthType::Email);
        let a = transformer.transform(Some(&rule), &Value::text("bob@corp.com"));
        let b = transformer.transform(Some(&rule), &Value::text("bob@corp.com"));
        assert_eq!(a, b);

        let other = transformer.transform(Some(&rule), &Value::text("carol@corp.com"));
        assert_ne!(a, other);
    }

    #[test]
    fn test_null_is_preserved_for_every_rule() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let rules = vec![
            masked(MaskType::Username),
            masked(MaskType::NumericNoise),
            synthesized(SynthType::Email),
            synthesized(SynthType::CreditCard),
            ColumnRule::keep("c"),
        ];
        for rule in &rules {
            assert_eq!(transformer.transform(Some(rule), &Value::Null), Value::Null);
        }
        assert_eq!(transformer.transform(None, &Value::Null), Value::Null);
    }

    #[test]
    fn test_keep_and_missing_rule_pass_through() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let value = Value::Int(7);
        assert_eq!(transformer.transform(None, &value), value);
        assert_eq!(transformer.transform(Some(&ColumnRule::keep("c")), &value), value);

        let mut unknown = ColumnRule::keep("c");
        unknown.strategy = Some(ColumnStrategy::from("scramble"));
        assert_eq!(transformer.transform(Some(&unknown), &value), value);
    }

    #[test]
    fn test_strategy_without_policy_passes_through() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let mut rule = ColumnRule::keep("c");
        rule.strategy = Some(ColumnStrategy::Mask);
        assert_eq!(transformer.transform(Some(&rule), &Value::text("x")), Value::text("x"));
        rule.strategy = Some(ColumnStrategy::Synthesize);
        assert_eq!(transformer.transform(Some(&rule), &Value::text("x")), Value::text("x"));
    }

    #[test]
    fn test_numeric_noise() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let mut policy = MaskPolicy::new(MaskType::NumericNoise);
        policy.percent = Some(10);
        let rule = ColumnRule::masked("salary", policy);

        assert_eq!(transformer.transform(Some(&rule), &Value::Int(100)), Value::Float(105.0));
        // non-numeric input is left alone
        assert_eq!(
            transformer.transform(Some(&rule), &Value::text("n/a")),
            Value::text("n/a")
        );
    }

    #[test]
    fn test_numeric_noise_without_percent_keeps_magnitude() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let rule = masked(MaskType::NumericNoise);
        assert_eq!(transformer.transform(Some(&rule), &Value::Int(42)), Value::Float(42.0));
    }

    #[test]
    fn test_column_key_overrides_salt() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let mut policy = MaskPolicy::new(MaskType::Username);
        policy.deterministic_key = Some("k".to_string());
        let with_key = ColumnRule::masked("c", policy);

        let a = transformer.transform(Some(&with_key), &Value::text("alice"));
        let b = transformer.transform(Some(&masked(MaskType::Username)), &Value::text("alice"));
        assert_ne!(a, b);
        assert_eq!(
            a,
            Value::Text(format!("user_{}", &keyed_digest("k", "alice")[..8]))
        );
    }

    #[test]
    fn test_email_domains() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let out = transformer.transform(Some(&synthesized(SynthType::Email)), &Value::text("a@b.com"));
        assert_eq!(out, Value::text("usera21806@example.test"));

        let mut policy = SynthPolicy::new(SynthType::Email);
        policy.domain = Some("qa.test".to_string());
        let out = transformer.transform(
            Some(&ColumnRule::synthesized("c", policy)),
            &Value::text("a@b.com"),
        );
        assert_eq!(out, Value::text("usera21806@qa.test"));

        let bare = MaskingDefaults {
            deterministic_salt: Some("s".to_string()),
            ..Default::default()
        };
        let out = Transformer::new(&bare)
            .transform(Some(&synthesized(SynthType::Email)), &Value::text("a@b.com"));
        assert_eq!(out, Value::text("usera21806@dev.local"));
    }

    #[test]
    fn test_synth_formats() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);

        let Value::Text(hash) =
            transformer.transform(Some(&synthesized(SynthType::PasswordHash)), &Value::text("secret"))
        else {
            panic!("expected text");
        };
        assert!(hash.starts_with("$2b$10$"));
        assert!(hash.contains("..."));

        let mut card = SynthPolicy::new(SynthType::CreditCard);
        card.format = Some("amex".to_string());
        assert_eq!(
            transformer.transform(
                Some(&ColumnRule::synthesized("c", card)),
                &Value::text("4111111111111111")
            ),
            Value::text("XXXX-XXXX-XXXX-939a")
        );

        let unknown = synthesized(SynthType::from("iban"));
        assert_eq!(
            transformer.transform(Some(&unknown), &Value::text("DE00")),
            Value::text("DE00")
        );
    }

    #[test]
    fn test_integer_values_are_stringified() {
        let defaults = defaults();
        let transformer = Transformer::new(&defaults);
        let out = transformer.transform(Some(&masked(MaskType::CategoryMap)), &Value::Int(42));
        assert_eq!(
            out,
            Value::Text(format!("masked_{}", &keyed_digest("s", "42")[..6]))
        );
    }
}
