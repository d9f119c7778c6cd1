use std::collections::BTreeMap;

/// Personally-identifying fields, keyed by label (e.g. "name", "email", or a
/// personal-data question's label). Fields the respondent left blank are
/// simply absent; absence is not non-consent.
pub type Pii = BTreeMap<String, String>;

/// The consent envelope: PII passes through unchanged iff the respondent
/// agreed to disclosure, otherwise nothing passes through at all. There is
/// never a partially redacted result.
///
/// Blank values are dropped before the decision, so a consenting respondent
/// who filled nothing in yields `None`. Callers should treat the returned
/// presence as the recorded consent (the stored flag must match it).
pub fn disclose(fields: Pii, agreed: bool) -> Option<Pii> {
    if !agreed {
        return None;
    }
    let cleaned: Pii = fields
        .into_iter()
        .filter_map(|(label, value)| {
            let value = value.trim();
            (!value.is_empty()).then(|| (label, value.to_string()))
        })
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pii(entries: &[(&str, &str)]) -> Pii {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_consent_discloses_nothing() {
        let fields = pii(&[("name", "Alice"), ("email", "alice@example.com")]);
        assert_eq!(disclose(fields, false), None);
    }

    #[test]
    fn consent_discloses_everything_provided() {
        let fields = pii(&[("name", "Alice"), ("department", "Finance")]);
        let disclosed = disclose(fields.clone(), true).unwrap();
        assert_eq!(disclosed, fields);
    }

    #[test]
    fn blank_fields_are_absent_not_redacted() {
        let fields = pii(&[("name", "  Alice  "), ("email", "   ")]);
        let disclosed = disclose(fields, true).unwrap();
        assert_eq!(disclosed, pii(&[("name", "Alice")]));
    }

    #[test]
    fn consent_with_nothing_to_disclose_is_none() {
        assert_eq!(disclose(Pii::new(), true), None);
        assert_eq!(disclose(pii(&[("name", "  ")]), true), None);
    }
}
