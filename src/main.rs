use quizzy_live::config::Config;
use quizzy_live::{api, bootstrap, init_tracing};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let engine = bootstrap(&config).await;
    let routes = api::routes(engine, &config);

    let (ip, port) = config.bind_address();
    tracing::info!(
        address = %std::net::Ipv4Addr::from(ip),
        port = port,
        base_path = %config.server.base_path,
        "Quizzy live server starting"
    );

    warp::serve(routes).run(config.bind_address()).await;
}
