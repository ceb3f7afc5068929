use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use dotenvy::dotenv;

use stock_chart::{
    config::Config,
    fetch::QuandlClient,
    routes::{self, AppState},
    session::SessionStore,
    templates,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Configuration error: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()));
        }
    };

    let market = match QuandlClient::new(&config.market) {
        Ok(client) => client,
        Err(err) => {
            log::error!("Error building market data client: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()));
        }
    };

    let templates = match templates::load() {
        Ok(tera) => tera,
        Err(err) => {
            log::error!("Error loading templates: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()));
        }
    };

    let state = Data::new(AppState {
        market,
        sessions: SessionStore::new(config.session_ttl),
        templates,
    });

    log::info!(
        "listening on http://{}:{} (market data from {})",
        config.bind_addr,
        config.port,
        config.market.base_url
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure::<QuandlClient>)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
