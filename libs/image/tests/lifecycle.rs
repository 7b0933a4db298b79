//! Integration tests for the image lifecycle protocol.
//!
//! These tests drive the builder, teardown, and scenarios against the mock
//! capability backend and verify the resource-lifecycle discipline: exact
//! population counts, strict reverse-order teardown, and zero leaked
//! objects after every scenario.

use std::sync::Arc;

use kimg_caps::{CapSystem, MockCaps, SizeBits};
use kimg_image::{create_image, destroy_image, scenario, Context, ImageLayout, ScenarioKind};
use rstest::rstest;

async fn context_with(caps: &Arc<MockCaps>, levels: &str) -> Context {
    let layout = ImageLayout::parse(levels).unwrap();
    Context::bootstrap(Arc::clone(caps) as Arc<dyn CapSystem>, layout)
        .await
        .unwrap()
}

fn assert_no_leaks(caps: &MockCaps) {
    // The base image is the only object that outlives a scenario.
    assert_eq!(caps.live_images(), 1);
    assert_eq!(caps.live_regions(), 0);
    assert_eq!(caps.live_address_spaces(), 0);
    assert_eq!(caps.live_channels(), 0);
    assert_eq!(caps.live_threads(), 0);
}

#[tokio::test]
async fn test_population_completeness() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x2,14x1").await;

    let image = create_image(&ctx).await.unwrap();
    assert!(image.is_populated());
    assert_eq!(image.ledger().len(), 3);
    assert_eq!(caps.mapped_count(image.handle()), 3);

    // Mapping order reflects the hierarchy: both size-12 regions, then the
    // size-14 region.
    let sizes: Vec<_> = caps
        .map_sequence()
        .iter()
        .map(|region| caps.region_size(*region).unwrap())
        .collect();
    assert_eq!(
        sizes,
        vec![SizeBits::new(12), SizeBits::new(12), SizeBits::new(14)]
    );

    destroy_image(&ctx, image).await.unwrap();
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_single_level_roundtrip() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x1").await;

    let image = create_image(&ctx).await.unwrap();
    assert_eq!(image.ledger().len(), 1);

    destroy_image(&ctx, image).await.unwrap();
    assert_eq!(caps.unmap_sequence().len(), 1);
    assert_no_leaks(&caps);
}

#[rstest]
#[case("")]
#[case("12x1")]
#[case("12x2,14x1")]
#[case("10x3,12x2,14x1")]
#[tokio::test]
async fn test_teardown_symmetry(#[case] levels: &str) {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, levels).await;

    let image = create_image(&ctx).await.unwrap();
    assert_eq!(image.ledger().len() as u64, ctx.layout().total_regions());

    destroy_image(&ctx, image).await.unwrap();
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_teardown_reverses_population_order() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x2,14x1").await;

    let image = create_image(&ctx).await.unwrap();
    destroy_image(&ctx, image).await.unwrap();

    let mapped = caps.map_sequence();
    let mut expected = mapped.clone();
    expected.reverse();
    assert_eq!(caps.unmap_sequence(), expected);
}

#[tokio::test]
async fn test_zero_levels_yields_valid_image() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "").await;

    let image = create_image(&ctx).await.unwrap();
    assert!(image.is_populated());
    assert!(image.ledger().is_empty());
    assert_eq!(caps.mapped_count(image.handle()), 0);

    destroy_image(&ctx, image).await.unwrap();
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_clone_preserves_destination_population() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x2").await;

    let image = create_image(&ctx).await.unwrap();
    let before = image.ledger().len();

    image.clone_from(&ctx, ctx.base_image()).await.unwrap();
    assert_eq!(image.ledger().len(), before);
    assert_eq!(caps.mapped_count(image.handle()), before);
    assert_eq!(caps.clone_source(image.handle()), Some(ctx.base_image()));

    destroy_image(&ctx, image).await.unwrap();
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_two_images_clone_without_cross_interference() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x1").await;

    let image_a = create_image(&ctx).await.unwrap();
    let image_b = create_image(&ctx).await.unwrap();

    image_b.clone_from(&ctx, image_a.handle()).await.unwrap();
    assert_eq!(caps.mapped_count(image_a.handle()), 1);
    assert_eq!(caps.mapped_count(image_b.handle()), 1);

    destroy_image(&ctx, image_a).await.unwrap();
    // A's destruction leaves B's regions mapped and intact.
    assert_eq!(caps.mapped_count(image_b.handle()), 1);

    destroy_image(&ctx, image_b).await.unwrap();
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_double_bind_rejected() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x1").await;

    let mut image = create_image(&ctx).await.unwrap();
    let first = ctx.caps().allocate_address_space().await.unwrap();
    ctx.caps().assign_addressing_domain(first).await.unwrap();
    image.bind(&ctx, first).await.unwrap();

    let second = ctx.caps().allocate_address_space().await.unwrap();
    ctx.caps().assign_addressing_domain(second).await.unwrap();
    let result = image.bind(&ctx, second).await;
    assert!(matches!(
        result,
        Err(kimg_image::ImageError::AlreadyBound { .. })
    ));

    ctx.caps().release_address_space(first).await;
    ctx.caps().release_address_space(second).await;
    destroy_image(&ctx, image).await.unwrap();
    assert_no_leaks(&caps);
}

#[rstest]
#[case(ScenarioKind::CreateDestroy)]
#[case(ScenarioKind::Clone)]
#[case(ScenarioKind::Bind)]
#[case(ScenarioKind::Execute)]
#[tokio::test]
async fn test_scenario_end_to_end(#[case] kind: ScenarioKind) {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x2,14x1").await;

    kind.run(&ctx).await.unwrap();
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_execute_scenario_consumes_single_signal() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x1").await;

    ScenarioKind::Execute.run(&ctx).await.unwrap();

    // The thread signalled exactly once and the orchestrator consumed it;
    // nothing else was ever sent.
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_all_registered_scenarios_pass() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x2,14x1").await;

    for spec in scenario::all() {
        let report = spec.report(&ctx).await;
        assert!(report.passed, "{} failed: {:?}", report.name, report.error);
    }
    assert_no_leaks(&caps);
}

#[tokio::test]
async fn test_report_serializes() {
    let caps = Arc::new(MockCaps::new());
    let ctx = context_with(&caps, "12x1").await;

    let report = scenario::find("IMG0001").unwrap().report(&ctx).await;
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["name"], "IMG0001");
    assert_eq!(json["passed"], true);
    assert!(json.get("error").is_none());
}
