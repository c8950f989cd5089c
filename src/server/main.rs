// Control Room backend HTTP server. Everything the renderer consumes comes
// through here: live boards, station search, nearby stations, service
// details, geocoding and the Rail Data passthrough proxy.

mod boards_api;
mod geocode_api;
mod health;
mod proxy_api;
mod services_api;
mod stations_api;

use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, middleware, web};
use controlroom::config::Config;
use controlroom::context::AppContext;
use std::sync::Arc;

async fn index(_req: HttpRequest) -> impl Responder {
    HttpResponse::Ok()
        .insert_header(("Content-Type", "text/plain"))
        .body("Control Room rail backend")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();

    log::info!("binding on {}", bind_addr);
    log::info!(
        "providers: signalbox={} darwin={} raildata_departures={} raildata_arrivals={}",
        config.signalbox_enabled(),
        config.darwin_enabled(),
        config.raildata_departures_ready(),
        config.raildata_arrivals_ready()
    );
    if !config.any_provider_configured() {
        log::warn!("no live board provider configured, /boards will return 503");
    }

    let ctx = Arc::new(AppContext::new(config));

    let builder = HttpServer::new(move || {
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Server", "ControlRoom")),
            )
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(Arc::clone(&ctx)))
            .route("/", web::get().to(index))
            .service(boards_api::boards)
            .service(boards_api::live_board)
            .service(stations_api::station_search)
            .service(stations_api::stations_near)
            .service(services_api::service_details)
            .service(geocode_api::geo_search)
            .service(proxy_api::raildata_proxy)
            .service(health::health)
    })
    .workers(4);

    builder.bind(bind_addr.as_str())?.run().await
}
