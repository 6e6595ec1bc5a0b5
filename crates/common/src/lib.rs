pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod post;
pub mod stage;

pub use config::{log_level_from_env, Config, OverflowPolicy, PostLimits, SocialCredentials};
pub use error::{PipelineError, PipelineResult};
pub use http::build_http_client;
pub use pipeline::{Pipeline, RunOutcome, RunReport, RunState};
pub use post::{compose, hashtag, image_url, ComposedPost};
pub use stage::{ContentGenerator, LinkSource, PostReceipt, Publisher, StaticLinks, TrendSource};
