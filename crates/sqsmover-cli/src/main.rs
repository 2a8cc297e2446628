use std::sync::Arc;
use std::time::Duration;

use aws_config::meta::region::RegionProviderChain;
use aws_config::Region;
use clap::Parser;
use sqsmover::{Migrator, MoverConfig, SqsQueue};

const DEFAULT_REGION: &str = "us-west-2";
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

#[tokio::main]
pub async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = Cli::parse().run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "sqsmover")]
#[command(about = "move messages from one aws sqs queue to another", long_about = None)]
pub struct Cli {
    /// The source queue name to move messages from
    #[arg(short, long)]
    source: String,

    /// The destination queue name to move messages to
    #[arg(short, long)]
    destination: String,

    /// AWS region of both queues; defaults to the environment, then us-west-2
    #[arg(short, long)]
    region: Option<String>,

    /// Named profile from the shared AWS config
    #[arg(long)]
    profile: Option<String>,

    /// Most messages to move, 0 moves all of them
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Most move loops to run in parallel
    #[arg(short, long, default_value_t = 10)]
    parallel: usize,

    /// Seconds a received message stays hidden while it is being moved
    #[arg(long, default_value_t = 60)]
    visibility_timeout: u64,

    /// Seconds a receive call waits for messages
    #[arg(long, default_value_t = 10)]
    wait_time: u64,

    /// Group id for messages that have none, needed when moving into a FIFO queue
    #[arg(long)]
    default_group_id: Option<String>,

    /// Use static test credentials against a LocalStack endpoint
    #[arg(long, action)]
    local: bool,

    /// Override the SQS endpoint URL
    #[arg(long)]
    endpoint: Option<String>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let queue = Arc::new(SqsQueue::from_config(self.aws_config().await));
        let migrator = Migrator::new(queue, self.mover_config());

        let report = migrator.migrate(&self.source, &self.destination).await?;

        println!(
            "moved {} messages from {} to {}",
            report.moved, self.source, self.destination
        );
        Ok(())
    }

    fn mover_config(&self) -> MoverConfig {
        MoverConfig {
            visibility_timeout: Duration::from_secs(self.visibility_timeout),
            wait_time: Duration::from_secs(self.wait_time),
            default_group_id: self.default_group_id.clone(),
            ..MoverConfig::default()
                .with_limit(self.limit)
                .with_parallelism(self.parallel)
        }
    }

    async fn aws_config(&self) -> aws_config::SdkConfig {
        let region = RegionProviderChain::first_try(self.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::from_static(DEFAULT_REGION));

        let mut loader =
            aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }

        if self.local {
            loader = loader
                .credentials_provider(aws_sdk_sqs::config::Credentials::new(
                    "test", "test", None, None, "static",
                ))
                .endpoint_url(self.endpoint.as_deref().unwrap_or(LOCALSTACK_ENDPOINT));
        } else if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }
}
