use wayfarer::config::Config;
use wayfarer::engine::Engine;
use wayfarer::error::Error;
use wayfarer::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let engine = Engine::from_config(&config)?;

    serve(engine, config.listen_addr).await
}
