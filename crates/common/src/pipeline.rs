use rand::seq::SliceRandom;
use std::fmt;
use tracing::{error, info, warn};

use crate::config::PostLimits;
use crate::error::{PipelineError, PipelineResult};
use crate::post::{image_url, ComposedPost};
use crate::stage::{ContentGenerator, LinkSource, PostReceipt, Publisher, TrendSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    TrendsFetched,
    TrendSelected,
    LinkSelected,
    TextGenerated,
    PostComposed,
    ImageUploaded,
    ImageSkipped,
    Posted,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Posted(PostReceipt),
    /// Publishing was skipped; carries the post that would have gone out.
    DryRun { body: String, image_url: String },
}

#[derive(Debug)]
pub struct RunReport {
    /// Last state the run got to before it finished or aborted.
    pub reached: RunState,
    pub result: PipelineResult<RunOutcome>,
}

impl RunReport {
    pub fn final_state(&self) -> RunState {
        match self.result {
            Ok(RunOutcome::Posted(_)) => RunState::Posted,
            Ok(RunOutcome::DryRun { .. }) => self.reached,
            Err(_) => RunState::Aborted,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match &self.result {
            Ok(_) => 0,
            Err(e) => e.exit_code(),
        }
    }
}

pub struct Pipeline {
    trends: Box<dyn TrendSource>,
    links: Box<dyn LinkSource>,
    generator: Box<dyn ContentGenerator>,
    publisher: Box<dyn Publisher>,
    limits: PostLimits,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(
        trends: Box<dyn TrendSource>,
        links: Box<dyn LinkSource>,
        generator: Box<dyn ContentGenerator>,
        publisher: Box<dyn Publisher>,
    ) -> Self {
        Self {
            trends,
            links,
            generator,
            publisher,
            limits: PostLimits::default(),
            dry_run: false,
        }
    }

    pub fn with_limits(mut self, limits: PostLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs every stage once, in order. The first failing stage ends the run.
    pub async fn run(&self) -> RunReport {
        let mut reached = RunState::Idle;
        let result = self.run_stages(&mut reached).await;

        match &result {
            Ok(RunOutcome::Posted(receipt)) => {
                info!("Run finished: posted {}", receipt.post_id);
            }
            Ok(RunOutcome::DryRun { .. }) => info!("Run finished: dry run, nothing posted"),
            Err(e) => error!(kind = e.kind(), state = %reached, "Run aborted: {}", e),
        }

        RunReport { reached, result }
    }

    async fn run_stages(&self, reached: &mut RunState) -> PipelineResult<RunOutcome> {
        let trends = self.trends.fetch_trends().await?;
        if trends.is_empty() {
            return Err(PipelineError::NoTrendsFound);
        }
        advance(reached, RunState::TrendsFetched);
        info!("Trends from {}: {:?}", self.trends.name(), trends);

        let trend = trends
            .choose(&mut rand::thread_rng())
            .ok_or(PipelineError::NoTrendsFound)?;
        advance(reached, RunState::TrendSelected);
        info!("Selected trend: {}", trend);

        let link = self.links.pick_link()?;
        advance(reached, RunState::LinkSelected);
        info!("Selected link: {}", link);

        let text = self.generator.generate(trend).await?;
        if text.trim().is_empty() {
            return Err(PipelineError::Generation(format!(
                "{} returned empty text",
                self.generator.name()
            )));
        }
        advance(reached, RunState::TextGenerated);
        info!("Generated text from {}: {}", self.generator.name(), text);

        let post = ComposedPost::new(&text, &link, trend).fit_to(&self.limits)?;
        let body = post.body();
        let image_url = image_url(trend);
        advance(reached, RunState::PostComposed);
        info!("Hashtag: {}", post.hashtag());
        info!("Image URL: {}", image_url);
        info!("--- FINAL POST ---\n{}\n------------------", body);

        if self.dry_run {
            warn!("Dry run enabled; not publishing");
            return Ok(RunOutcome::DryRun { body, image_url });
        }

        let receipt = self.publisher.publish(&body, Some(&image_url)).await?;
        if receipt.media_id.is_some() {
            advance(reached, RunState::ImageUploaded);
        } else {
            advance(reached, RunState::ImageSkipped);
        }
        advance(reached, RunState::Posted);

        Ok(RunOutcome::Posted(receipt))
    }
}

fn advance(reached: &mut RunState, next: RunState) {
    tracing::debug!("{} -> {}", reached, next);
    *reached = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::stage::StaticLinks;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct FixedTrends(PipelineResult<Vec<String>>);

    #[async_trait]
    impl TrendSource for FixedTrends {
        async fn fetch_trends(&self) -> PipelineResult<Vec<String>> {
            match &self.0 {
                Ok(trends) => Ok(trends.clone()),
                Err(_) => Err(PipelineError::Fetch("connection refused".into())),
            }
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct MissingLinks;

    impl LinkSource for MissingLinks {
        fn links(&self) -> PipelineResult<Vec<String>> {
            Err(PipelineError::LinkStoreMissing(self.origin()))
        }

        fn origin(&self) -> PathBuf {
            PathBuf::from("links.txt")
        }
    }

    struct EchoGenerator {
        fail: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ContentGenerator for EchoGenerator {
        async fn generate(&self, trend: &str) -> PipelineResult<String> {
            self.calls.lock().unwrap().push(trend.to_string());
            if self.fail {
                Err(PipelineError::Generation("quota exceeded".into()))
            } else {
                Ok(format!("Everyone is talking about {}!", trend))
            }
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    #[derive(Default, Clone)]
    struct RecordingPublisher {
        posts: Arc<Mutex<Vec<(String, Option<String>)>>>,
        with_media: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, text: &str, image_url: Option<&str>) -> PipelineResult<PostReceipt> {
            self.posts
                .lock()
                .unwrap()
                .push((text.to_string(), image_url.map(String::from)));
            Ok(PostReceipt {
                post_id: "1850000000000000000".into(),
                media_id: self.with_media.then(|| "710511363345354753".to_string()),
            })
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn pipeline(
        trends: PipelineResult<Vec<String>>,
        links: Box<dyn LinkSource>,
        fail_generation: bool,
        publisher: RecordingPublisher,
    ) -> Pipeline {
        Pipeline::new(
            Box::new(FixedTrends(trends)),
            links,
            Box::new(EchoGenerator {
                fail: fail_generation,
                calls: Arc::default(),
            }),
            Box::new(publisher),
        )
    }

    #[tokio::test]
    async fn test_happy_path_posts_once() {
        let publisher = RecordingPublisher {
            with_media: true,
            ..Default::default()
        };
        let report = pipeline(
            Ok(vec!["Black Friday".into()]),
            Box::new(StaticLinks::new(["https://a.example"])),
            false,
            publisher.clone(),
        )
        .run()
        .await;

        assert_eq!(report.final_state(), RunState::Posted);
        assert_eq!(report.exit_code(), 0);

        let posts = publisher.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].0,
            "Everyone is talking about Black Friday!\n\nhttps://a.example\n\n#BlackFriday"
        );
        assert_eq!(
            posts[0].1.as_deref(),
            Some("https://tse1.mm.bing.net/th?q=Black%20Friday")
        );
    }

    #[tokio::test]
    async fn test_generation_failure_never_publishes() {
        let publisher = RecordingPublisher::default();
        let report = pipeline(
            Ok(vec!["Black Friday".into()]),
            Box::new(StaticLinks::new(["https://a.example"])),
            true,
            publisher.clone(),
        )
        .run()
        .await;

        assert_eq!(report.final_state(), RunState::Aborted);
        assert_eq!(report.reached, RunState::LinkSelected);
        assert!(matches!(report.result, Err(PipelineError::Generation(_))));
        assert!(publisher.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_links() {
        let publisher = RecordingPublisher::default();
        let report = pipeline(
            Err(PipelineError::Fetch(String::new())),
            Box::new(MissingLinks),
            false,
            publisher.clone(),
        )
        .run()
        .await;

        assert_eq!(report.reached, RunState::Idle);
        assert_eq!(report.exit_code(), 3);
        assert!(publisher.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_trends_is_no_trends_found() {
        let report = pipeline(
            Ok(Vec::new()),
            Box::new(StaticLinks::new(["https://a.example"])),
            false,
            RecordingPublisher::default(),
        )
        .run()
        .await;

        assert!(matches!(report.result, Err(PipelineError::NoTrendsFound)));
    }

    #[tokio::test]
    async fn test_missing_links_skips_generation() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let publisher = RecordingPublisher::default();
        let report = Pipeline::new(
            Box::new(FixedTrends(Ok(vec!["WWE".into()]))),
            Box::new(MissingLinks),
            Box::new(EchoGenerator {
                fail: false,
                calls: calls.clone(),
            }),
            Box::new(publisher.clone()),
        )
        .run()
        .await;

        assert_eq!(report.reached, RunState::TrendSelected);
        assert!(matches!(report.result, Err(PipelineError::LinkStoreMissing(_))));
        assert!(calls.lock().unwrap().is_empty());
        assert!(publisher.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_only_receipt_records_image_skipped() {
        let publisher = RecordingPublisher::default();
        let report = pipeline(
            Ok(vec!["WWE".into()]),
            Box::new(StaticLinks::new(["https://a.example"])),
            false,
            publisher,
        )
        .run()
        .await;

        assert_eq!(report.reached, RunState::Posted);
        match report.result {
            Ok(RunOutcome::Posted(receipt)) => assert!(receipt.media_id.is_none()),
            other => panic!("expected a post, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dry_run_composes_without_publishing() {
        let publisher = RecordingPublisher::default();
        let report = pipeline(
            Ok(vec!["Black Friday".into()]),
            Box::new(StaticLinks::new(["https://a.example"])),
            false,
            publisher.clone(),
        )
        .dry_run(true)
        .run()
        .await;

        assert_eq!(report.final_state(), RunState::PostComposed);
        assert_eq!(report.exit_code(), 0);
        assert!(publisher.posts.lock().unwrap().is_empty());
        match report.result {
            Ok(RunOutcome::DryRun { body, .. }) => assert!(body.ends_with("#BlackFriday")),
            other => panic!("expected dry run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlong_post_rejected_before_publish() {
        let publisher = RecordingPublisher::default();
        let report = pipeline(
            Ok(vec!["Black Friday".into()]),
            Box::new(StaticLinks::new(["https://a.example"])),
            false,
            publisher.clone(),
        )
        .with_limits(PostLimits {
            max_chars: 40,
            overflow: OverflowPolicy::Reject,
        })
        .run()
        .await;

        assert_eq!(report.reached, RunState::TextGenerated);
        assert_eq!(report.exit_code(), 7);
        assert!(publisher.posts.lock().unwrap().is_empty());
    }
}
