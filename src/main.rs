use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use coursecert_server::{
    app_state::AppState, config::Config, graphql::create_schema, handlers,
    middleware::RequestIdMiddleware,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    if !cfg!(debug_assertions) {
        config.validate_for_production();
    }

    let app_state = AppState::new(config.clone())
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let sweeper = app_state
        .start_background_tasks()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let schema = create_schema(app_state.clone());
    let jwt_service = web::Data::from(app_state.jwt_service.clone());
    let state = web::Data::new(app_state);
    let allowed_origin = config.cors_allowed_origin.clone();

    log::info!(
        "Starting HTTP server on {}:{}",
        config.web_server_host,
        config.web_server_port
    );

    let result = HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
            None => Cors::permissive(),
        };

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .app_data(state.clone())
            .app_data(jwt_service.clone())
            .app_data(web::Data::new(schema.clone()))
            .configure(handlers::configure)
    })
    .bind((config.web_server_host.as_str(), config.web_server_port))?
    .run()
    .await;

    sweeper.abort();
    result
}
