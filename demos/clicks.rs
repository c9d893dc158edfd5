use kstream::pipelines::{clicks, devices, shout};
use kstream::Config;
use rdkafka::config::RDKafkaLogLevel;

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "kstream=debug,rdkafka=info");
    }
    env_logger::init();

    let brokers = std::env::var("BOOTSTRAP_SERVERS").unwrap_or_else(|_| "localhost:29092".to_string());
    let config = Config::new()
        .set("bootstrap.servers", &brokers)
        .set("auto.offset.reset", "earliest")
        .set_log_level(RDKafkaLogLevel::Info);

    let which = std::env::args().nth(1).unwrap_or_else(|| "clicks".to_string());
    let res = match which.as_str() {
        "clicks" => clicks::run(&config).await,
        "devices" => devices::run(&config).await,
        "shout" => shout::run(&config).await,
        other => {
            eprintln!("unknown pipeline {:?}, expected clicks, devices or shout", other);
            std::process::exit(2);
        }
    };

    if let Err(e) = res {
        log::error!("{} stopped: {}", which, e);
        std::process::exit(1);
    }
}
