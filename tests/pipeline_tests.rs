mod common;

use common::{Event, GatedFetcher, RecordingDelegate, TestResult, TINY_PNG, wait_for_state};
use marquee::{
    Anchor, BannerPipeline, DisplayMode, InMemoryFetcher, InlineExecutor, NodeKind, ParseError,
    PipelineError, PipelineState, UiThreadExecutor,
};
use std::sync::Arc;

fn inline_pipeline(
    fetcher: Arc<InMemoryFetcher>,
) -> (Arc<BannerPipeline>, Arc<RecordingDelegate>) {
    let delegate = Arc::new(RecordingDelegate::new());
    let pipeline = Arc::new(BannerPipeline::new(
        fetcher,
        Arc::clone(&delegate) as Arc<dyn marquee::BannerDelegate>,
        Arc::new(InlineExecutor),
    ));
    (pipeline, delegate)
}

#[tokio::test(flavor = "multi_thread")]
async fn renders_simple_banner() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let (pipeline, delegate) = inline_pipeline(Arc::new(InMemoryFetcher::new()));

    pipeline.create("<re-body><re-text>Hi</re-text></re-body>", DisplayMode::Top).await?;

    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(pipeline.display_mode(), Some(DisplayMode::Top));
    assert_eq!(delegate.ready_count(), 1);
    assert_eq!(delegate.failed_count(), 0);

    pipeline
        .with_banner(|root| {
            assert_eq!(root.kind, NodeKind::Container);
            assert!(root.widget.is_some());
            assert!(!root.anchors.is_empty());
            assert_eq!(root.children.len(), 1);
            let text = &root.children[0];
            assert_eq!(text.kind, NodeKind::Text);
            assert_eq!(text.element.text.as_deref(), Some("Hi"));
            assert!(text.widget.is_some());
            assert_ne!(text.widget, root.widget);
        })
        .ok_or("no banner published")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_markup_fails_without_ready_signal() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let (pipeline, delegate) = inline_pipeline(Arc::new(InMemoryFetcher::new()));

    let outcome = pipeline.create("", DisplayMode::Center).await;

    assert!(matches!(outcome, Err(PipelineError::Parse(ParseError::Empty))));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(delegate.ready_count(), 0);
    assert_eq!(delegate.failed_count(), 1);
    assert!(pipeline.with_banner(|_| ()).is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_pipeline_accepts_a_new_run() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let (pipeline, delegate) = inline_pipeline(Arc::new(InMemoryFetcher::new()));

    assert!(pipeline.create("<re-a/><re-b/>", DisplayMode::Center).await.is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);

    pipeline.create("<re-body><re-text>retry</re-text></re-body>", DisplayMode::Center).await?;
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(delegate.ready_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rejects_create_while_run_in_flight() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetcher = Arc::new(GatedFetcher::new());
    let delegate = Arc::new(RecordingDelegate::new());
    let pipeline = Arc::new(BannerPipeline::new(
        Arc::clone(&fetcher) as Arc<dyn marquee::ResourceFetcher>,
        Arc::clone(&delegate) as Arc<dyn marquee::BannerDelegate>,
        Arc::new(InlineExecutor),
    ));

    let first = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            pipeline
                .create("<re-body><re-image src=\"img\"/></re-body>", DisplayMode::Center)
                .await
        })
    };
    wait_for_state(&pipeline, PipelineState::Preparing).await;

    let second = pipeline.create("<re-body/>", DisplayMode::Center).await;
    assert!(matches!(second, Err(PipelineError::AlreadyInProgress)));
    // The rejection is not a run failure and must not signal the delegate.
    assert_eq!(delegate.failed_count(), 0);

    fetcher.release();
    first.await??;
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(delegate.ready_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_image_does_not_fail_the_run() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetcher = Arc::new(InMemoryFetcher::new());
    fetcher.add("good", TINY_PNG.to_vec());
    let (pipeline, delegate) = inline_pipeline(fetcher);

    pipeline
        .create(
            "<re-body>\
               <re-image src=\"good\" width=\"100\"/>\
               <re-image src=\"missing\"/>\
             </re-body>",
            DisplayMode::Center,
        )
        .await?;

    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(delegate.ready_count(), 1);
    assert_eq!(delegate.failed_count(), 0);

    pipeline
        .with_banner(|root| {
            let good = &root.children[0];
            let prepared = good.image.as_ref().expect("good image prepared");
            assert_eq!((prepared.width, prepared.height), (2, 1));
            assert!(good
                .anchors
                .iter()
                .any(|a| matches!(a, Anchor::AspectHeight { width, ratio }
                    if *width == 100.0 && *ratio == 2.0)));

            let missing = &root.children[1];
            assert!(missing.image.is_none());
        })
        .ok_or("no banner published")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn spacer_minimum_and_insets_flow_into_anchors() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let (pipeline, _delegate) = inline_pipeline(Arc::new(InMemoryFetcher::new()));

    pipeline
        .create(
            "<re-body padding=\"10\"><re-text>Hi</re-text><re-spacer/></re-body>",
            DisplayMode::Center,
        )
        .await?;

    pipeline
        .with_banner(|root| {
            let text = &root.children[0];
            let spacer = &root.children[1];

            // The spacer has no explicit height; the injected minimum wins.
            assert!(spacer.anchors.contains(&Anchor::Height(10.0)));
            assert!(spacer.anchors.iter().any(|a| matches!(a,
                Anchor::TopToSibling { sibling, offset }
                    if *sibling == text.id() && *offset == 0.0)));
            // Last child pins to the padded parent bottom.
            assert!(spacer.anchors.contains(&Anchor::BottomToParent(-10.0)));

            // The first child hangs from the padded parent top.
            assert!(text.anchors.contains(&Anchor::TopToParent(10.0)));
        })
        .ok_or("no banner published")?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn clear_resets_to_idle() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let (pipeline, _delegate) = inline_pipeline(Arc::new(InMemoryFetcher::new()));

    pipeline.create("<re-body><re-text>Hi</re-text></re-body>", DisplayMode::Top).await?;
    assert!(pipeline.with_banner(|_| ()).is_some());

    pipeline.clear();
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(pipeline.with_banner(|_| ()).is_none());
    assert_eq!(pipeline.display_mode(), None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn clear_supersedes_in_flight_run() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetcher = Arc::new(GatedFetcher::new());
    let delegate = Arc::new(RecordingDelegate::new());
    let pipeline = Arc::new(BannerPipeline::new(
        Arc::clone(&fetcher) as Arc<dyn marquee::ResourceFetcher>,
        Arc::clone(&delegate) as Arc<dyn marquee::BannerDelegate>,
        Arc::new(InlineExecutor),
    ));

    let run = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            pipeline
                .create("<re-body><re-image src=\"img\"/></re-body>", DisplayMode::Center)
                .await
        })
    };
    wait_for_state(&pipeline, PipelineState::Preparing).await;

    pipeline.clear();
    fetcher.release();

    // The superseded run completes silently.
    run.await??;
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(delegate.ready_count(), 0);
    assert_eq!(delegate.failed_count(), 0);
    assert!(pipeline.with_banner(|_| ()).is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatches_button_action_and_visibility_events() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let (pipeline, delegate) = inline_pipeline(Arc::new(InMemoryFetcher::new()));

    pipeline
        .create(
            "<re-body><re-button href=\"app://promo\">Tap</re-button></re-body>",
            DisplayMode::Center,
        )
        .await?;

    let button_id = pipeline
        .with_banner(|root| {
            let button = &root.children[0];
            assert!(matches!(&button.kind, NodeKind::Button { action: Some(a) }
                if a == "app://promo"));
            button.id()
        })
        .ok_or("no banner published")?;

    pipeline.notify_shown();
    pipeline.dispatch_action(button_id);
    pipeline.notify_closed();

    let events = delegate.events();
    assert!(events.contains(&Event::Shown));
    assert!(events.contains(&Event::Action("app://promo".to_string())));
    assert!(events.contains(&Event::Closed));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn runs_on_a_dedicated_ui_thread() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let delegate = Arc::new(RecordingDelegate::new());
    let pipeline = BannerPipeline::new(
        Arc::new(InMemoryFetcher::new()),
        Arc::clone(&delegate) as Arc<dyn marquee::BannerDelegate>,
        Arc::new(UiThreadExecutor::new()),
    );

    pipeline
        .create(
            "<re-body><re-heading level=\"1\">Big news</re-heading></re-body>",
            DisplayMode::Fullscreen,
        )
        .await?;

    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(
        delegate.events().iter().filter(|e| matches!(e, Event::Ready { mode, .. }
            if *mode == DisplayMode::Fullscreen)).count(),
        1
    );
    pipeline
        .with_banner(|root| {
            assert!(matches!(root.children[0].kind, NodeKind::Heading { level: Some(1) }));
        })
        .ok_or("no banner published")?;
    Ok(())
}
