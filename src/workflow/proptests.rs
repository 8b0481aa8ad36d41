//! Property-based tests for the workflow
//!
//! Field resolution invariants over the built-in catalog, plus ordering and
//! isolation of concurrent sessions driven through the engine.

use super::*;
use crate::runtime::testing::{wait_until, RecordingRunner, TestEngine};
use crate::templates::{next_field, TemplateCatalog};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn catalog() -> TemplateCatalog {
    TemplateCatalog::builtin("client")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

const WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// (platform, content type) of any built-in template
fn arb_template_key() -> impl Strategy<Value = (String, String)> {
    let keys: Vec<(String, String)> = catalog()
        .content_types()
        .into_iter()
        .flat_map(|ct| {
            catalog()
                .platforms_for(ct)
                .into_iter()
                .map(|p| (p.to_string(), ct.to_string()))
                .collect::<Vec<_>>()
        })
        .collect();
    proptest::sample::select(keys)
}

/// Texts that the recording runner treats as ordinary turns
fn arb_text() -> impl Strategy<Value = String> {
    "[a-e]{1,6}"
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Once collected, a field is never requested again, and answering every
    /// request terminates without repeats
    #[test]
    fn prop_collected_fields_are_never_requested(
        key in arb_template_key(),
        preset in proptest::collection::vec(any::<bool>(), 8),
    ) {
        let catalog = catalog();
        let template = catalog.lookup(&key.0, &key.1).unwrap();
        let mut ctx = Context::default();
        for (field, collect) in template.fields.iter().zip(preset) {
            if collect {
                ctx.template_data.insert(field.name.clone(), "value".to_string());
            }
        }

        let mut asked = Vec::new();
        while let Some(request) = next_field(template, &ctx) {
            prop_assert!(!ctx.template_data.contains_key(&request.field));
            prop_assert!(!asked.contains(&request.field));
            prop_assert!(asked.len() <= template.fields.len());
            asked.push(request.field.clone());
            ctx.template_data.insert(request.field, "value".to_string());
        }
    }

    /// destination_name is always asked before price_text
    #[test]
    fn prop_destination_name_comes_first(price_known in any::<bool>(), caption in "[a-z ]{0,20}") {
        let catalog = catalog();
        let template = catalog.lookup("instagram", "destination").unwrap();
        let mut ctx = Context::default();
        if price_known {
            ctx.template_data.insert("price_text".to_string(), "$10".to_string());
        }
        ctx.caption = Some(caption);
        let request = next_field(template, &ctx).unwrap();
        prop_assert_eq!(request.field, "destination_name");
        prop_assert_eq!(request.state, WorkflowState::WaitingForDestination);
    }

    /// Field values round-trip through validation unchanged apart from
    /// whitespace, and word limits are enforced exactly
    #[test]
    fn prop_name_limits_are_exact(words in proptest::collection::vec("[a-z]{1,6}", 1..9)) {
        let catalog = catalog();
        let template = catalog.lookup("instagram", "events").unwrap();
        let field = template.field("event_name").unwrap();
        let raw = format!("  {}  ", words.join("   "));
        match crate::templates::validate_field(field, &raw) {
            Ok(value) => {
                prop_assert!(words.len() <= 5);
                prop_assert_eq!(value, words.join(" "));
            }
            Err(_) => prop_assert!(words.len() > 5),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Each user's texts are handled in submission order, never two at once,
    /// however submissions from different users interleave
    #[test]
    fn prop_per_user_fifo(
        submissions in proptest::collection::vec((0usize..4, arb_text()), 1..40),
    ) {
        let rt = runtime();
        let harness = TestEngine::new();
        let runner = Arc::new(RecordingRunner::new(Duration::from_millis(1)));
        let (handled, expected) = rt.block_on(async {
            let engine = harness.engine(runner.clone(), 64);
            for (user, text) in &submissions {
                engine.submit(&format!("user-{user}"), text);
            }
            let total = submissions.len();
            wait_until(WAIT, || runner.calls().len() == total).await;

            let mut handled = Vec::new();
            let mut expected = Vec::new();
            for user in 0..4 {
                let id = format!("user-{user}");
                handled.push(runner.texts_for(&id));
                expected.push(
                    submissions
                        .iter()
                        .filter(|(u, _)| *u == user)
                        .map(|(_, t)| t.clone())
                        .collect::<Vec<_>>(),
                );
            }
            (handled, expected)
        });
        prop_assert_eq!(handled, expected);
        prop_assert!(!runner.overlapped());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Concurrent sessions only ever see values derived from their own input
    #[test]
    fn prop_sessions_are_isolated(users in 2usize..8) {
        let rt = runtime();
        let harness = TestEngine::new();
        let outcome = rt.block_on(async {
            let engine = harness.engine(Arc::new(harness.dispatcher()), 64);
            let script = |i: usize| {
                vec![
                    "hi".to_string(),
                    "events".to_string(),
                    "instagram".to_string(),
                    "done".to_string(),
                    format!("Gala {i}"),
                    format!("Party night {i}"),
                ]
            };
            // Round-robin so every user's turns interleave with the others
            for step in 0..6 {
                for i in 0..users {
                    engine.submit(&format!("user-{i}"), &script(i)[step]);
                }
            }
            wait_until(WAIT, || {
                (0..users).all(|i| {
                    harness.state(&format!("user-{i}")) == WorkflowState::ImageSelection
                })
            })
            .await;
            (0..users)
                .map(|i| harness.context(&format!("user-{i}")))
                .collect::<Vec<_>>()
        });

        for (i, ctx) in outcome.iter().enumerate() {
            let own_name = format!("Gala {i}");
            let own_text = format!("Party night {i}");
            prop_assert_eq!(ctx.template_data.get("event_name"), Some(&own_name));
            prop_assert_eq!(ctx.original_text.as_ref(), Some(&own_text));
            prop_assert_eq!(&ctx.selected_platforms, &vec!["instagram".to_string()]);
        }
    }
}
