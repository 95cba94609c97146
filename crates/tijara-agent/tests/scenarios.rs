// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end turns through the full pipeline over in-memory collaborators.

use serde_json::json;
use tijara_agent::{TurnRequest, TurnStage};
use tijara_core::{
    ConflictType, PatternId, Priority, PrioritySettings, ProductMention, RankedSnippet,
    TijaraError,
};
use tijara_orders::{MARKER_COLLECTING, MARKER_PENDING, OrderDecision, OrderField};
use tijara_test_utils::{ScriptStep, TestHarness, scripted_credential, stored_pattern};
use tracing_test::traced_test;

const FORMAL_PROMPT: &str = "أنت مساعد متجر أحذية. تحدث باللغة العربية الفصحى فقط.";

fn belle_boot() -> RankedSnippet {
    RankedSnippet {
        text: "Belle Boot: بوت جلد طبيعي، أسود وبني، مقاسات 37-42، السعر 1250 جنيه".into(),
        score: 0.92,
        product: Some(ProductMention {
            name: "Belle Boot".into(),
            variant: Some("أسود".into()),
            price: Some(1250.0),
        }),
    }
}

#[tokio::test]
async fn reply_walks_every_stage() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["أهلاً! الحذاء متوفر بمقاس 40."])
        .build()
        .await
        .unwrap();

    let response = harness.send("عندكم مقاس 40؟").await.unwrap();

    assert_eq!(response.content.as_deref(), Some("أهلاً! الحذاء متوفر بمقاس 40."));
    assert_eq!(response.model_used.as_deref(), Some("gemini-2.0-flash"));
    assert_eq!(response.intent, "product_inquiry");
    assert_eq!(
        response.telemetry.stages,
        vec![
            TurnStage::BuildContext,
            TurnStage::EnhancePrompt,
            TurnStage::Generate,
            TurnStage::Optimize,
            TurnStage::Finalize,
        ]
    );
    assert_eq!(response.telemetry.attempts, 1);

    let stores = harness.shutdown().await;
    let memory = stores.memory.interactions().await;
    assert_eq!(memory.len(), 1);
    assert_eq!(memory[0].ai_response, "أهلاً! الحذاء متوفر بمقاس 40.");
    assert_eq!(memory[0].model_used.as_deref(), Some("gemini-2.0-flash"));
}

#[tokio::test]
async fn missing_tenant_id_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = TurnRequest {
        tenant_id: None,
        ..harness.request("السلام عليكم")
    };

    let err = harness.send_request(request).await.unwrap_err();
    assert!(matches!(err, TijaraError::SecurityViolation(_)));
    assert_eq!(harness.stores.provider.call_count().await, 0);
}

#[tokio::test]
async fn missing_base_prompt_is_operator_visible() {
    let harness = TestHarness::builder()
        .without_base_prompt()
        .build()
        .await
        .unwrap();

    let err = harness.send("السلام عليكم").await.unwrap_err();
    assert!(matches!(err, TijaraError::MissingTenantConfig { .. }));
    assert_eq!(harness.stores.provider.call_count().await, 0);
}

#[tokio::test]
#[traced_test]
async fn exhausted_pool_replies_silently() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .stores
        .provider
        .rate_limit_model("gemini-2.0-flash")
        .await;

    let response = harness.send("بكام الجزمة؟").await.unwrap();

    assert!(response.is_silent());
    assert_eq!(response.telemetry.silent_reason, Some("pool_exhausted"));
    assert!(logs_contain("turn failed, replying silently"));
    let stores = harness.shutdown().await;
    assert!(stores.memory.interactions().await.is_empty());
}

#[tokio::test]
#[traced_test]
async fn provider_errors_degrade_after_one_retry() {
    let harness = TestHarness::builder()
        .with_steps(vec![
            ScriptStep::Fail("upstream 500".into()),
            ScriptStep::Fail("upstream 500".into()),
            ScriptStep::Reply("never used".into()),
        ])
        .build()
        .await
        .unwrap();

    let response = harness.send("بكام الجزمة؟").await.unwrap();

    assert!(response.is_silent());
    assert_eq!(response.telemetry.silent_reason, Some("provider"));
    assert_eq!(harness.stores.provider.call_count().await, 2);
    assert!(logs_contain("upstream 500"));
}

#[tokio::test]
async fn rate_limited_model_fails_over_to_next_priority() {
    let harness = TestHarness::builder()
        .with_credentials(vec![
            scripted_credential("cred-a", "model-a", 1),
            scripted_credential("cred-b", "model-b", 2),
        ])
        .with_mock_responses(vec!["متوفر يا فندم"])
        .build()
        .await
        .unwrap();
    harness.stores.provider.rate_limit_model("model-a").await;

    let response = harness.send("عندكم لون بني؟").await.unwrap();

    assert_eq!(response.content.as_deref(), Some("متوفر يا فندم"));
    assert_eq!(response.model_used.as_deref(), Some("model-b"));
    assert_eq!(response.telemetry.attempts, 2);

    let status = harness.runtime().pool().pool_status(&harness.tenant);
    let a = status.iter().find(|s| s.id.as_str() == "cred-a").unwrap();
    let b = status.iter().find(|s| s.id.as_str() == "cred-b").unwrap();
    assert!(a.exhausted_until.is_some());
    assert!(b.exhausted_until.is_none());
}

#[tokio::test]
async fn formal_prompt_keeps_colloquial_words_out() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_base_prompt(FORMAL_PROMPT)
        .with_priority_settings(PrioritySettings {
            prompt_priority: Priority::High,
            enforce_language_style: true,
            ..PrioritySettings::default()
        })
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["كويس", "ازيك"] }),
            0.9,
        ))
        .with_mock_responses(vec!["الحذاء متوفر بمقاسات مختلفة."])
        .build()
        .await
        .unwrap();

    let response = harness.send("هل الحذاء متوفر؟").await.unwrap();

    assert_eq!(response.telemetry.conflicts, vec![ConflictType::LanguageStyle]);
    let calls = harness.stores.provider.calls().await;
    let prompt = &calls[0].prompt;
    assert!(!prompt.contains("كويس"), "prompt leaked a colloquial word: {prompt}");
    assert!(!prompt.contains("ازيك"), "prompt leaked a colloquial word: {prompt}");
    let content = response.content.unwrap();
    assert!(!content.contains("كويس") && !content.contains("ازيك"));

    let stores = harness.shutdown().await;
    let reports = stores.patterns.conflict_reports().await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].resolved);
    assert_eq!(reports[0].patterns_involved, vec![PatternId::from("p-words")]);
}

#[tokio::test]
async fn order_collects_missing_fields_across_turns() {
    let harness = TestHarness::builder()
        .with_snippet("belle", belle_boot())
        .with_mock_responses(vec![
            "أيوه متوفر Belle Boot بالأسود.",
            "سعره 1250 جنيه.",
        ])
        .build()
        .await
        .unwrap();

    harness.send("عندكم Belle Boot اسود؟").await.unwrap();
    harness.send("بكام؟").await.unwrap();

    let confirm = harness.send("تمام هاخده").await.unwrap();
    let Some(OrderDecision::RequestData { missing, .. }) = &confirm.order else {
        panic!("expected a data request, got {:?}", confirm.order);
    };
    assert!(missing.contains(&OrderField::CustomerPhone));
    assert!(confirm.content.as_deref().unwrap_or_default().contains("رقم الموبايل"));
    assert_eq!(confirm.intent, MARKER_COLLECTING);
    assert_eq!(harness.stores.orders.calls(), 0);
    assert_eq!(harness.stores.provider.call_count().await, 2);

    let supply = harness.send("اسمي أحمد، رقمي 0100000000").await.unwrap();
    assert!(matches!(supply.order, Some(OrderDecision::Created { .. })));

    let created = harness.stores.orders.created().await;
    assert_eq!(created.len(), 1);
    let (draft, tenant) = &created[0];
    assert_eq!(tenant.as_str(), "shop-1");
    assert_eq!(draft.product_name.as_deref(), Some("Belle Boot"));
    assert_eq!(draft.customer_name.as_deref(), Some("أحمد"));
    assert_eq!(draft.customer_phone.as_deref(), Some("0100000000"));
    assert_eq!(harness.stores.provider.call_count().await, 2);
}

#[tokio::test]
#[traced_test]
async fn failed_order_stays_pending_and_retries() {
    let harness = TestHarness::builder()
        .with_snippet("belle", belle_boot())
        .build()
        .await
        .unwrap();
    harness.stores.orders.fail_next(1);

    harness.send("عندكم Belle Boot؟").await.unwrap();
    harness
        .send("تمام هاخده، اسمي أحمد، رقمي 0100000000")
        .await
        .unwrap();
    let pending = harness.stores.memory.interactions().await;
    assert_eq!(pending.last().map(|i| i.intent.as_str()), Some(MARKER_PENDING));
    assert!(logs_contain("order service failed"));
    assert!(harness.stores.orders.created().await.is_empty());

    let retry = harness.send("فين الطلب؟").await.unwrap();
    assert!(matches!(retry.order, Some(OrderDecision::Created { .. })));
    assert_eq!(harness.stores.orders.calls(), 2);
    assert_eq!(harness.stores.orders.created().await.len(), 1);
}

#[tokio::test]
async fn pattern_usage_is_recorded_in_one_batch() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["أكيد"] }),
            0.9,
        ))
        .with_pattern(stored_pattern(
            "p-style",
            &tenant,
            "response_style",
            json!({ "targetWordCount": 12, "endsWithQuestion": true }),
            0.8,
        ))
        .with_mock_responses(vec!["الحذاء متوفر بكل المقاسات من 37 لحد 42 وبلونين."])
        .build()
        .await
        .unwrap();

    let response = harness.send("عندكم مقاسات ايه؟").await.unwrap();
    assert_eq!(response.telemetry.patterns_considered.len(), 2);
    assert!(!response.telemetry.patterns_applied.is_empty());

    let stores = harness.shutdown().await;
    let batches = stores.patterns.usage_batches().await;
    assert_eq!(batches.len(), 1, "usage must be written in a single call");
    assert_eq!(batches[0].len(), 2);
    assert_eq!(stores.patterns.performance().await.len(), 2);
}

#[tokio::test]
async fn invalidation_drops_deactivated_patterns() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["أكيد"] }),
            0.9,
        ))
        .build()
        .await
        .unwrap();

    harness.send("عندكم مقاس 38؟").await.unwrap();
    harness
        .stores
        .patterns
        .set_active(&PatternId::from("p-words"), false)
        .await;
    harness.runtime().patterns().invalidate(&tenant);
    harness.send("وعندكم مقاس 39؟").await.unwrap();

    let calls = harness.stores.provider.calls().await;
    assert!(calls[0].prompt.contains("Words that worked well"));
    assert!(!calls[1].prompt.contains("Words that worked well"));
    assert_eq!(harness.stores.patterns.list_calls(), 2);
}

#[tokio::test]
async fn disabled_patterns_are_never_loaded() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_setting("patterns_enabled", "false")
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["أكيد"] }),
            0.9,
        ))
        .build()
        .await
        .unwrap();

    let response = harness.send("عندكم مقاس 38؟").await.unwrap();

    assert!(response.telemetry.patterns_considered.is_empty());
    assert_eq!(harness.stores.patterns.list_calls(), 0);
}

#[tokio::test]
async fn formal_prompt_rewrites_stay_formal() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_base_prompt(FORMAL_PROMPT)
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["جيد"], "failureWords": ["مستحيل", "مفيش"] }),
            0.9,
        ))
        .with_pattern(stored_pattern(
            "p-tone",
            &tenant,
            "emotional_tone",
            json!({ "targetSentiment": 0.8, "openers": [] }),
            0.8,
        ))
        .with_mock_responses(vec!["مستحيل توفيره الآن"])
        .build()
        .await
        .unwrap();

    let response = harness.send("هل يتوفر مقاس 45؟").await.unwrap();

    assert!(response.telemetry.conflicts.is_empty());
    assert_eq!(
        response.content.as_deref(),
        Some("أهلاً وسهلاً بك! جيد، يصعب توفيره الآن")
    );
    assert_eq!(response.telemetry.patterns_applied.len(), 2);
}

#[tokio::test]
async fn usage_success_follows_the_turn_outcome() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_snippet("belle", belle_boot())
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["أكيد"] }),
            0.9,
        ))
        .with_mock_responses(vec!["Belle Boot متوفر بالأسود.", "هنشوف المقاس ونرد عليك."])
        .build()
        .await
        .unwrap();

    // Grounded in a confident snippet with a pleased customer.
    harness.send("شكرا، عندكم Belle Boot؟").await.unwrap();
    // Nothing retrieved, so confidence stays below the success bar.
    harness.send("عندكم مقاس 40؟").await.unwrap();

    let stores = harness.shutdown().await;
    let batches = stores.patterns.usage_batches().await;
    assert_eq!(batches.len(), 2);
    assert!(batches[0][0].successful);
    assert!(!batches[1][0].successful);

    let performance = stores.patterns.performance().await;
    assert_eq!(performance.len(), 1);
    assert_eq!(performance[0].usage_count, 2);
    assert_eq!(performance[0].success_count, 1);
    assert!((performance[0].success_rate - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn silent_turn_counts_against_its_patterns() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["أكيد"] }),
            0.9,
        ))
        .build()
        .await
        .unwrap();
    harness
        .stores
        .provider
        .rate_limit_model("gemini-2.0-flash")
        .await;

    let response = harness.send("بكام الجزمة؟").await.unwrap();
    assert!(response.is_silent());
    assert_eq!(
        response.telemetry.patterns_considered,
        vec![PatternId::from("p-words")]
    );

    let stores = harness.shutdown().await;
    let batches = stores.patterns.usage_batches().await;
    assert_eq!(batches.len(), 1);
    assert!(!batches[0][0].successful);
    assert!(!batches[0][0].applied);
    assert_eq!(stores.patterns.performance().await[0].success_count, 0);
}

#[tokio::test]
#[traced_test]
async fn unsaved_order_state_is_surfaced_to_operators() {
    let harness = TestHarness::builder()
        .with_snippet("belle", belle_boot())
        .build()
        .await
        .unwrap();

    harness.send("عندكم Belle Boot؟").await.unwrap();
    harness.stores.memory.fail_next_appends(2);

    let err = harness.send("تمام هاخده").await.unwrap_err();
    assert!(matches!(err, TijaraError::OrderService { .. }));
    assert!(err.is_operator_visible());
    assert!(logs_contain("order state write failed, retrying once"));
    assert!(logs_contain("turn rejected"));
    assert_eq!(harness.stores.memory.interactions().await.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn order_state_write_is_retried_once() {
    let harness = TestHarness::builder()
        .with_snippet("belle", belle_boot())
        .build()
        .await
        .unwrap();

    harness.send("عندكم Belle Boot؟").await.unwrap();
    harness.stores.memory.fail_next_appends(1);

    let confirm = harness.send("تمام هاخده").await.unwrap();
    assert!(matches!(confirm.order, Some(OrderDecision::RequestData { .. })));
    assert!(logs_contain("order state write failed, retrying once"));
    let memory = harness.stores.memory.interactions().await;
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[1].intent, MARKER_COLLECTING);
}

#[tokio::test]
async fn repeated_conflicts_are_reported_once() {
    let tenant = tijara_core::TenantId::new(tijara_test_utils::TEST_TENANT).unwrap();
    let harness = TestHarness::builder()
        .with_base_prompt(FORMAL_PROMPT)
        .with_pattern(stored_pattern(
            "p-words",
            &tenant,
            "word_usage",
            json!({ "successfulWords": ["كويس", "ازيك"] }),
            0.9,
        ))
        .build()
        .await
        .unwrap();

    let first = harness.send("هل الحذاء متوفر؟").await.unwrap();
    let second = harness.send("وما هي الألوان المتاحة؟").await.unwrap();
    assert_eq!(first.telemetry.conflicts, vec![ConflictType::LanguageStyle]);
    assert_eq!(second.telemetry.conflicts, vec![ConflictType::LanguageStyle]);

    // A pattern change means the next conflict set is reported again.
    harness.runtime().patterns().invalidate(&tenant);
    harness.send("هل يوجد مقاس 41؟").await.unwrap();

    let stores = harness.shutdown().await;
    let reports = stores.patterns.conflict_reports().await;
    assert_eq!(reports.len(), 2);
}
