/// Property-based tests using proptest
/// Tests invariants of the domain model that should hold for all inputs
use pipedrive_client::models::{Lead, LeadPatch, RemoteId};
use pipedrive_client::validation::is_valid_email;
use pipedrive_client::workflows::minimal_lead_title;
use proptest::prelude::*;
use std::collections::HashSet;

fn remote_id() -> impl Strategy<Value = RemoteId> {
    prop_oneof![
        (0u64..50).prop_map(RemoteId::from),
        "[a-f0-9]{1,3}".prop_map(RemoteId::from),
    ]
}

// Property: email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn well_formed_emails_accepted(
        local in "[a-z][a-z0-9._+-]{0,20}",
        domain in "[a-z][a-z0-9]{0,15}",
        tld in "[a-z]{2,6}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email), "Rejected: {}", email);
    }

    #[test]
    fn emails_without_at_rejected(text in "[a-z0-9.]{0,30}") {
        prop_assert!(!is_valid_email(&text));
    }
}

// Property: a lead needs a person or an organization
proptest! {
    #[test]
    fn lead_validity_matches_references(
        title in "\\PC{0,40}",
        person in proptest::option::of(0u64..1000),
        org in proptest::option::of(0u64..1000)
    ) {
        let mut builder = Lead::builder(title);
        if let Some(p) = person {
            builder = builder.person_id(p);
        }
        if let Some(o) = org {
            builder = builder.organization_id(o);
        }
        prop_assert_eq!(builder.build().is_ok(), person.is_some() || org.is_some());
    }

    #[test]
    fn label_ids_never_duplicate(ids in proptest::collection::vec(remote_id(), 0..30)) {
        let mut lead = Lead::builder("t").person_id(1u64).label_ids(ids.clone()).build().unwrap();
        for id in &ids {
            prop_assert!(!lead.add_label_id(id.clone()));
        }

        let unique: HashSet<_> = lead.label_ids().iter().collect();
        prop_assert_eq!(unique.len(), lead.label_ids().len());
        // First-seen order is kept
        let mut seen = HashSet::new();
        let expected: Vec<_> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        prop_assert_eq!(lead.label_ids(), expected.as_slice());
    }
}

// Property: partial update payloads only carry fields that were set
proptest! {
    #[test]
    fn lead_patch_payload_has_only_set_fields(
        title in proptest::option::of("[a-z ]{1,20}"),
        owner in proptest::option::of(0u64..100),
        labels in proptest::option::of(proptest::collection::vec(remote_id(), 0..5))
    ) {
        let mut patch = LeadPatch::default();
        if let Some(t) = &title {
            patch = patch.title(t.clone());
        }
        if let Some(o) = owner {
            patch = patch.owner_id(o);
        }
        if let Some(l) = &labels {
            patch = patch.label_ids(l.clone());
        }

        let payload = serde_json::to_value(&patch).unwrap();
        let keys: HashSet<&str> = payload
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();

        let mut expected = HashSet::new();
        if title.is_some() { expected.insert("title"); }
        if owner.is_some() { expected.insert("owner_id"); }
        if labels.is_some() { expected.insert("label_ids"); }
        prop_assert_eq!(keys, expected);
    }
}

// Property: minimal lead titles embed the email verbatim
proptest! {
    #[test]
    fn minimal_lead_title_format(prefix in "[A-Za-z]{1,10}", email in "[a-z]{1,8}@[a-z]{1,8}\\.com") {
        let title = minimal_lead_title(&prefix, &email);
        let expected_prefix = format!("{}: ", prefix);
        prop_assert!(title.starts_with(&expected_prefix));
        prop_assert!(title.ends_with(&email));
        prop_assert_eq!(title.len(), prefix.len() + 2 + email.len());
    }
}
