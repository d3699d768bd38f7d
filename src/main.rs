use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use minibroker::application::dto::BrokerStatus;
use minibroker::application::use_cases::TopicManagementUseCase;
use minibroker::{Broker, BrokerConfig, Consumer, PartitionStrategyKind, Producer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON broker config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Partition strategy: round_robin, key_based or random
    #[arg(short, long)]
    strategy: Option<PartitionStrategyKind>,

    /// Topic to create and send to
    #[arg(short, long, default_value = "events")]
    topic: String,

    /// Number of partitions for the topic
    #[arg(short, long, default_value_t = 3)]
    partitions: u32,

    #[arg(long, default_value_t = 1)]
    replication_factor: u32,

    /// Number of concurrent producers
    #[arg(long, default_value_t = 2)]
    producers: usize,

    /// Messages sent by each producer
    #[arg(short, long, default_value_t = 10)]
    messages: usize,

    /// Comma-separated keys cycled through by each producer
    #[arg(short, long, value_delimiter = ',')]
    keys: Vec<String>,

    /// Print the final status as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BrokerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => BrokerConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.partition_strategy = strategy;
    }

    let broker = Arc::new(Broker::builder().config(config).build()?);
    let topics = TopicManagementUseCase::new(broker.clone());
    topics.create_topic(args.topic.clone(), args.partitions, args.replication_factor)?;

    info!(
        "Running {} producers x {} messages against '{}'",
        args.producers, args.messages, args.topic
    );

    let mut handles = Vec::with_capacity(args.producers);
    for p in 0..args.producers {
        let mut producer = Producer::with_broker(broker.clone());
        let topic = args.topic.clone();
        let keys = args.keys.clone();
        let count = args.messages;
        // sends are synchronous and never yield
        handles.push(tokio::task::spawn_blocking(move || {
            for i in 0..count {
                let key = (!keys.is_empty()).then(|| keys[i % keys.len()].as_str());
                producer.send(&topic, format!("producer {} message {}", p, i), key);
            }
            producer
        }));
    }

    for handle in handles {
        let producer = handle.await?;
        info!("{}", producer);
        if producer.sent_messages().len() < args.messages {
            warn!(
                "Producer {} delivered {} of {} messages",
                producer.id,
                producer.sent_messages().len(),
                args.messages
            );
        }
    }

    let mut consumer = Consumer::with_broker(broker.clone(), None);
    consumer.subscribe(&args.topic)?;
    let drained = consumer.poll(usize::MAX);
    info!("{} drained {} messages", consumer, drained.len());

    let status = topics.broker_status();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&broker, &status);
    }

    Ok(())
}

fn print_status(broker: &Broker, status: &BrokerStatus) {
    println!("{}", broker);
    println!("Partition strategy: {}", status.partition_strategy);
    for topic in &status.topics {
        println!("Topic: {}", topic.name);
        println!("Partitions: {}", topic.partition_count);
        println!("Replication Factor: {}", topic.replication_factor);
        for partition in &topic.partitions {
            println!(
                "  Partition {}: {} messages (next offset {})",
                partition.partition_id, partition.message_count, partition.next_offset
            );
        }
        println!("Total Messages: {}", topic.total_messages);
        println!("{}", "-".repeat(50));
    }
}
